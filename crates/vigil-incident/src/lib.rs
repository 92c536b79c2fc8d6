pub mod commands;
pub mod gdocs;
pub mod handlers;
pub mod sync;

use tracing::warn;
use vigil_core::Incident;
use vigil_triggers::BotEnv;

pub use commands::incident_commands;
pub use gdocs::{DriveDocument, DriveDocumentProvider};
pub use handlers::{log_topic, store_topic, topic_refused};
pub use sync::{ChannelFailure, SyncReport, TopicError, TopicSynchronizer};

/// Binds the stored document id of `incident` to a live handle, so summaries
/// can show its URL. Lookup failures only cost the link.
pub fn attach_document(env: &BotEnv, incident: &mut Incident) {
    let Some(provider) = env.documents.as_ref() else {
        return;
    };
    if incident.has_document() {
        return;
    }
    let Some(id) = incident.document_id().map(str::to_string) else {
        return;
    };
    match provider.load(&id) {
        Ok(document) => incident.attach_document(document),
        Err(err) => warn!(incident_id = incident.id(), document_id = %id, error = %err, "failed to load incident document"),
    }
}

pub fn attach_documents(env: &BotEnv, incidents: &mut [Incident]) {
    for incident in incidents {
        attach_document(env, incident);
    }
}
