use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info};
use vigil_irc::is_channel;
use vigil_store::BotStore;

/// Persistence seam for authorization entries.
pub trait AclBackend: Send + Sync {
    fn identifiers(&self, command: &str) -> Result<Vec<String>>;
    fn exists(&self, command: &str, identifier: &str) -> Result<bool>;
    fn insert(&self, command: &str, identifier: &str) -> Result<()>;
    fn delete(&self, command: &str, identifier: &str) -> Result<bool>;
}

impl AclBackend for BotStore {
    fn identifiers(&self, command: &str) -> Result<Vec<String>> {
        self.acl_identifiers(command)
    }

    fn exists(&self, command: &str, identifier: &str) -> Result<bool> {
        self.acl_exists(command, identifier)
    }

    fn insert(&self, command: &str, identifier: &str) -> Result<()> {
        self.insert_acl(command, identifier)
    }

    fn delete(&self, command: &str, identifier: &str) -> Result<bool> {
        self.delete_acl(command, identifier)
    }
}

#[derive(Debug, Error)]
pub enum AclError {
    #[error("acl entry {identifier} for {command} already exists")]
    AlreadyExists { command: String, identifier: String },
    #[error("acl entry {identifier} for {command} not found")]
    NotFound { command: String, identifier: String },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclListing {
    pub handles: Vec<String>,
    pub channels: Vec<String>,
}

/// Command id to permitted handles and channels. Admins pass every check.
#[derive(Clone)]
pub struct AclStore {
    backend: Arc<dyn AclBackend>,
    admins: Vec<String>,
}

impl AclStore {
    pub fn new(backend: Arc<dyn AclBackend>, admins: Vec<String>) -> Self {
        Self { backend, admins }
    }

    pub fn is_admin(&self, handle: &str) -> bool {
        self.admins.iter().any(|admin| admin == handle)
    }

    /// A failing store denies everyone but admins.
    pub fn check(&self, command: &str, sender: &str, target: &str) -> bool {
        if self.is_admin(sender) {
            return true;
        }
        match self.backend.identifiers(command) {
            Ok(entries) => entries.iter().any(|entry| entry == sender || entry == target),
            Err(err) => {
                error!(command, sender, error = %err, "failed to read acl");
                false
            }
        }
    }

    pub fn add(&self, command: &str, identifier: &str) -> Result<(), AclError> {
        if self.backend.exists(command, identifier)? {
            return Err(AclError::AlreadyExists {
                command: command.to_string(),
                identifier: identifier.to_string(),
            });
        }
        self.backend.insert(command, identifier)?;
        info!(command, identifier, "acl entry added");
        Ok(())
    }

    pub fn remove(&self, command: &str, identifier: &str) -> Result<(), AclError> {
        if !self.backend.delete(command, identifier)? {
            return Err(AclError::NotFound {
                command: command.to_string(),
                identifier: identifier.to_string(),
            });
        }
        info!(command, identifier, "acl entry removed");
        Ok(())
    }

    pub fn list(&self, command: &str) -> Result<AclListing, AclError> {
        let mut handles: BTreeSet<String> = self.admins.iter().cloned().collect();
        let mut channels = BTreeSet::new();
        for identifier in self.backend.identifiers(command)? {
            if is_channel(&identifier) {
                channels.insert(identifier);
            } else {
                handles.insert(identifier);
            }
        }
        Ok(AclListing {
            handles: handles.into_iter().collect(),
            channels: channels.into_iter().collect(),
        })
    }
}
