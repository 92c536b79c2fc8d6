use anyhow::Result;
use vigil_common::DocumentConfig;

/// A shareable document living in some external service. Incidents only keep
/// its id; the service owns the document's lifecycle.
pub trait RemoteDocument: Send + Sync {
    /// Creates a new document by copying the configured template and returns its id.
    fn create_from_template(&mut self, title: &str, config: &DocumentConfig) -> Result<String>;
    /// Points this handle at an existing document.
    fn load_by_id(&mut self, id: &str) -> Result<()>;
    fn url(&self) -> String;
    fn id(&self) -> Option<&str>;
}

/// Hands out fresh, unbound document handles.
pub trait DocumentProvider: Send + Sync {
    fn blank(&self) -> Box<dyn RemoteDocument>;

    fn load(&self, id: &str) -> Result<Box<dyn RemoteDocument>> {
        let mut document = self.blank();
        document.load_by_id(id)?;
        Ok(document)
    }
}
