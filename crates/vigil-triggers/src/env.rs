use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vigil_common::VigilConfig;
use vigil_core::DocumentProvider;
use vigil_store::BotStore;

use crate::acl::{AclBackend, AclStore};

/// Everything a handler may reach besides the transport.
pub struct BotEnv {
    pub config: VigilConfig,
    pub store: Arc<BotStore>,
    pub acl: AclStore,
    pub documents: Option<Arc<dyn DocumentProvider>>,
    pub topic_writes: TopicWrites,
}

impl BotEnv {
    pub fn new(config: VigilConfig, store: Arc<BotStore>) -> Self {
        let acl = AclStore::new(store.clone(), config.admins.clone());
        Self {
            config,
            store,
            acl,
            documents: None,
            topic_writes: TopicWrites::default(),
        }
    }

    pub fn with_acl_backend(mut self, backend: Arc<dyn AclBackend>) -> Self {
        self.acl = AclStore::new(backend, self.config.admins.clone());
        self
    }

    pub fn with_documents(mut self, provider: Arc<dyn DocumentProvider>) -> Self {
        self.documents = Some(provider);
        self
    }

    pub fn nick(&self) -> &str {
        &self.config.nick
    }
}

/// Topic writes sent to the server that it has neither echoed nor refused yet,
/// keyed by channel, with the nick whose command caused them.
#[derive(Debug, Default)]
pub struct TopicWrites {
    pending: Mutex<HashMap<String, String>>,
}

impl TopicWrites {
    pub fn record(&self, channel: &str, issuer: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(channel.to_string(), issuer.to_string());
        }
    }

    /// Forgets the write to `channel`, returning who asked for it.
    pub fn settle(&self, channel: &str) -> Option<String> {
        self.pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_writes_are_forgotten() {
        let writes = TopicWrites::default();
        writes.record("#ops", "alice");
        writes.record("#ops", "bob");
        assert_eq!(writes.settle("#ops").as_deref(), Some("bob"));
        assert_eq!(writes.settle("#ops"), None);
        assert_eq!(writes.settle("#status"), None);
    }
}
