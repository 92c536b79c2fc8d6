pub mod contact;
pub mod document;
pub mod incident;
pub mod topic;

pub use contact::Contact;
pub use document::{DocumentProvider, RemoteDocument};
pub use incident::{
    COMPONENTS, Incident, IncidentError, IncidentRow, IncidentStatus, Severity, split_components,
};
pub use topic::{STATUS_MARKER, STATUS_UP, render_status, rewrite_topic};
