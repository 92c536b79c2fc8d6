use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::document::RemoteDocument;

/// Things that can break from the public point of view.
pub const COMPONENTS: &[&str] = &[
    "Website",
    "Mobile apps",
    "Action API",
    "REST api",
    "Multimedia",
    "Thumbnails",
    "Other",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IncidentError {
    #[error("Severity must be between 1 and 5, got {0}")]
    InvalidSeverity(i64),
    #[error("Unknown component '{0}'")]
    UnknownComponent(String),
    #[error("At least one component is required")]
    NoComponents,
    #[error("Incident #{0} is already closed")]
    AlreadyClosed(i64),
    #[error("unknown incident status '{0}'")]
    UnknownStatus(String),
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Severity(u8);

impl Severity {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Result<Self, IncidentError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(IncidentError::InvalidSeverity(value));
        }
        Ok(Self(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        if self.0 <= 3 { "degraded" } else { "down" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentStatus {
    Open,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, IncidentError> {
        match value.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(IncidentError::UnknownStatus(other.to_string())),
        }
    }
}

/// Flat persisted form of an incident, one-to-one with the `incidents` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRow {
    pub id: i64,
    pub severity: i64,
    pub components: String,
    pub started_at: String,
    pub updated_at: String,
    pub status: String,
    pub description: String,
    pub document_id: Option<String>,
}

pub struct Incident {
    id: i64,
    severity: Severity,
    components: Vec<String>,
    description: String,
    status: IncidentStatus,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    document_id: Option<String>,
    document: Option<Box<dyn RemoteDocument>>,
}

impl fmt::Debug for Incident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incident")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("components", &self.components)
            .field("status", &self.status)
            .field("started_at", &self.started_at)
            .field("updated_at", &self.updated_at)
            .field("document_id", &self.document_id)
            .finish_non_exhaustive()
    }
}

/// Splits a `comma, separated` component list as typed on IRC.
pub fn split_components(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_components<S: AsRef<str>>(components: &[S]) -> Result<Vec<String>, IncidentError> {
    let mut normalized: Vec<String> = Vec::new();
    for component in components {
        let raw = component.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        let known = COMPONENTS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(raw))
            .ok_or_else(|| IncidentError::UnknownComponent(raw.to_string()))?;
        if !normalized.iter().any(|existing| existing == known) {
            normalized.push((*known).to_string());
        }
    }
    if normalized.is_empty() {
        return Err(IncidentError::NoComponents);
    }
    Ok(normalized)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, IncidentError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| IncidentError::InvalidTimestamp {
            value: value.to_string(),
            reason: err.to_string(),
        })
}

impl Incident {
    pub fn new<S: AsRef<str>>(severity: i64, components: &[S]) -> Result<Self, IncidentError> {
        Self::new_at(severity, components, Utc::now())
    }

    pub fn new_at<S: AsRef<str>>(
        severity: i64,
        components: &[S],
        now: DateTime<Utc>,
    ) -> Result<Self, IncidentError> {
        let severity = Severity::new(severity)?;
        let components = normalize_components(components)?;
        Ok(Self {
            id: 0,
            severity,
            components,
            description: String::new(),
            status: IncidentStatus::Open,
            started_at: now,
            updated_at: now,
            document_id: None,
            document: None,
        })
    }

    /// Rebuilds an incident from storage. Components are taken as stored, so a
    /// later whitelist change does not make old rows unreadable.
    pub fn from_row(row: IncidentRow) -> Result<Self, IncidentError> {
        Ok(Self {
            id: row.id,
            severity: Severity::new(row.severity)?,
            components: row
                .components
                .split(", ")
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            description: row.description,
            status: IncidentStatus::parse(&row.status)?,
            started_at: parse_timestamp(&row.started_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            document_id: row.document_id.filter(|id| !id.is_empty()),
            document: None,
        })
    }

    pub fn to_row(&self) -> IncidentRow {
        IncidentRow {
            id: self.id,
            severity: i64::from(self.severity.get()),
            components: self.components.join(", "),
            started_at: self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated_at: self.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            status: self.status.as_str().to_string(),
            description: self.description.clone(),
            document_id: self.document_id.clone(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Called by the store once an insert has succeeded.
    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> IncidentStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == IncidentStatus::Open
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn set_severity(&mut self, severity: i64) -> Result<(), IncidentError> {
        self.severity = Severity::new(severity)?;
        Ok(())
    }

    /// Appends to the description. Every append after the first one gets a
    /// timestamp header line.
    pub fn append_description(&mut self, text: &str, now: DateTime<Utc>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.description.is_empty() {
            self.description = text.to_string();
        } else {
            self.description.push_str(&format!(
                "\n\n--- Update at {} ---\n{}",
                now.format("%Y-%m-%d %H:%M:%S UTC"),
                text
            ));
        }
    }

    pub fn close(&mut self) -> Result<(), IncidentError> {
        if self.status == IncidentStatus::Closed {
            return Err(IncidentError::AlreadyClosed(self.id));
        }
        self.status = IncidentStatus::Closed;
        Ok(())
    }

    /// Reopens a closed incident. Returns whether a transition happened.
    pub fn reopen(&mut self) -> bool {
        if self.status == IncidentStatus::Closed {
            self.status = IncidentStatus::Open;
            return true;
        }
        false
    }

    /// Links a document. Only its id is persisted; the handle itself is kept
    /// for URL lookups while this value lives.
    pub fn attach_document(&mut self, document: Box<dyn RemoteDocument>) {
        self.document_id = document.id().map(str::to_string);
        self.document = Some(document);
    }

    pub fn document_url(&self) -> Option<String> {
        self.document.as_ref().map(|doc| doc.url())
    }

    /// `extended` adds the document link and is reserved for public channels.
    pub fn summarize(&self, extended: bool) -> String {
        if self.status == IncidentStatus::Closed {
            return "Up".to_string();
        }
        let docs = match (extended, self.document_url()) {
            (true, Some(url)) => format!(" - docs at {url}"),
            _ => String::new(),
        };
        format!(
            "{} {} (#{}{})",
            self.components.join(", "),
            self.severity.label(),
            self.id,
            docs
        )
    }

    pub fn details(&self, extended: bool) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Incident #{} [{}] severity {} - {}",
                self.id,
                self.status.as_str(),
                self.severity.get(),
                self.components.join(", ")
            ),
            format!(
                "Started: {} / Last update: {}",
                self.started_at.format("%Y-%m-%d %H:%M UTC"),
                self.updated_at.format("%Y-%m-%d %H:%M UTC")
            ),
        ];
        if let (true, Some(url)) = (extended, self.document_url()) {
            lines.push(format!("Document: {url}"));
        }
        if self.description.is_empty() {
            lines.push("No description yet.".to_string());
        } else {
            lines.extend(self.description.lines().map(str::to_string));
        }
        lines
    }
}
