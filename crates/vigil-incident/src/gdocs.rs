use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info};
use vigil_common::DocumentConfig;
use vigil_core::{DocumentProvider, RemoteDocument};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const USER_AGENT: &str = "vigil-incident";
const NOT_AVAILABLE: &str = "<not available>";

/// Google Drive documents copied from a template. Authenticates with a bearer
/// token taken from the environment variable named in the config.
#[derive(Clone)]
pub struct DriveDocumentProvider {
    client: Client,
    token: String,
    base_url: String,
}

impl DriveDocumentProvider {
    pub fn from_config(config: &DocumentConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("{} is not set; cannot reach Google Drive", config.token_env))?;
        Self::new(token, DRIVE_FILES_URL)
    }

    pub fn new(token: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .with_context(|| "failed to build drive http client")?;
        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl DocumentProvider for DriveDocumentProvider {
    fn blank(&self) -> Box<dyn RemoteDocument> {
        Box::new(DriveDocument {
            provider: self.clone(),
            file_id: None,
        })
    }
}

pub struct DriveDocument {
    provider: DriveDocumentProvider,
    file_id: Option<String>,
}

impl DriveDocument {
    fn copy_template(&self, template_id: &str, title: &str, parent: Option<&str>) -> Result<String> {
        let provider = &self.provider;
        let mut request = serde_json::json!({ "name": title });
        if let Some(parent) = parent {
            request["parents"] = serde_json::json!([parent]);
        }
        let response = provider
            .client
            .post(format!("{}/{template_id}/copy", provider.base_url))
            .query(&[("supportsAllDrives", "true")])
            .header("Authorization", format!("Bearer {}", provider.token))
            .header("User-Agent", USER_AGENT)
            .json(&request)
            .send()
            .with_context(|| format!("drive copy of template {template_id} failed"))?;
        let body: Value = response.error_for_status()?.json()?;
        file_id(&body)
    }

    fn share_with_domain(&self, file_id: &str, domain: &str) -> Result<()> {
        let provider = &self.provider;
        provider
            .client
            .post(format!("{}/{file_id}/permissions", provider.base_url))
            .query(&[("supportsAllDrives", "true")])
            .header("Authorization", format!("Bearer {}", provider.token))
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({
                "type": "domain",
                "role": "writer",
                "domain": domain,
                "allowFileDiscovery": true,
            }))
            .send()
            .with_context(|| format!("drive permission request for {file_id} failed"))?
            .error_for_status()
            .with_context(|| format!("could not share document {file_id} with {domain}"))?;
        Ok(())
    }
}

impl RemoteDocument for DriveDocument {
    fn create_from_template(&mut self, title: &str, config: &DocumentConfig) -> Result<String> {
        let template_id = config
            .template_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("documents.template_id is not configured"))?;
        // A shared drive's id doubles as the id of its root folder.
        let parent = config.folder_id.as_deref().or(config.drive_id.as_deref());

        let id = self.copy_template(template_id, title, parent)?;
        if let Some(domain) = config.share_domain.as_deref() {
            self.share_with_domain(&id, domain)?;
        }
        info!(document_id = %id, %title, "created incident document");
        self.file_id = Some(id.clone());
        Ok(id)
    }

    fn load_by_id(&mut self, id: &str) -> Result<()> {
        let provider = &self.provider;
        let response = provider
            .client
            .get(format!("{}/{id}", provider.base_url))
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .header("Authorization", format!("Bearer {}", provider.token))
            .header("User-Agent", USER_AGENT)
            .send()
            .with_context(|| format!("drive lookup of {id} failed"))?;
        let body: Value = response
            .error_for_status()
            .with_context(|| format!("could not find the document with id {id}"))?
            .json()?;
        let found = file_id(&body)?;
        debug!(document_id = %found, "loaded incident document");
        self.file_id = Some(found);
        Ok(())
    }

    fn url(&self) -> String {
        match &self.file_id {
            Some(id) => document_url(id),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    fn id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }
}

pub fn document_url(id: &str) -> String {
    format!("https://docs.google.com/document/d/{id}/edit")
}

fn file_id(body: &Value) -> Result<String> {
    body.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("drive response carries no file id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_document_has_no_url() {
        let provider =
            DriveDocumentProvider::new("token".to_string(), DRIVE_FILES_URL).expect("client");
        let doc = provider.blank();
        assert_eq!(doc.id(), None);
        assert_eq!(doc.url(), "<not available>");
    }

    #[test]
    fn file_id_is_read_from_drive_response() {
        let body = serde_json::json!({ "kind": "drive#file", "id": "1AbC" });
        assert_eq!(file_id(&body).expect("id"), "1AbC");
        assert!(file_id(&serde_json::json!({ "id": "" })).is_err());
        assert_eq!(
            document_url("1AbC"),
            "https://docs.google.com/document/d/1AbC/edit"
        );
    }

    #[test]
    fn missing_template_is_reported_before_any_request() {
        let provider =
            DriveDocumentProvider::new("token".to_string(), "http://127.0.0.1:9").expect("client");
        let mut doc = provider.blank();
        let err = doc
            .create_from_template("Incident #1", &DocumentConfig::default())
            .expect_err("no template configured");
        assert!(err.to_string().contains("template_id"));
    }
}
