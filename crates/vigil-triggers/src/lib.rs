pub mod acl;
pub mod builtin;
pub mod command;
pub mod env;
pub mod pattern;
pub mod registry;

pub use acl::{AclBackend, AclError, AclListing, AclStore};
pub use builtin::builtin_commands;
pub use command::{Command, CommandAction, DENIED_REPLY, Invocation, MALFORMED_REPLY, Visibility};
pub use env::{BotEnv, TopicWrites};
pub use pattern::{ArgSpec, CommandPattern, PatternError};
pub use registry::{EventHandler, Handler, Registry, RegistryError};
