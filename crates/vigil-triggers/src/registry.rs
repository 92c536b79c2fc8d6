use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use vigil_irc::{ChatTransport, Message, Trigger, TriggerSink};

use crate::command::Command;
use crate::env::BotEnv;

pub const HELP_ID: &str = "help";

/// Anything the registry can install as a trigger.
pub trait Handler: Send + Sync {
    fn condition(&self, env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool;
    fn action(&self, env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool;

    /// Empty help keeps the handler out of `!help`.
    fn help(&self) -> String {
        String::new()
    }
}

type EventCondition = Box<dyn Fn(&Message) -> bool + Send + Sync>;
type EventAction = Box<dyn Fn(&BotEnv, &dyn ChatTransport, &Message) -> bool + Send + Sync>;

/// Passive hook on raw protocol events, without addressing or ACL checks.
pub struct EventHandler {
    condition: EventCondition,
    action: EventAction,
    help: String,
}

impl EventHandler {
    pub fn new<C, A>(condition: C, action: A) -> Self
    where
        C: Fn(&Message) -> bool + Send + Sync + 'static,
        A: Fn(&BotEnv, &dyn ChatTransport, &Message) -> bool + Send + Sync + 'static,
    {
        Self {
            condition: Box::new(condition),
            action: Box::new(action),
            help: String::new(),
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }
}

impl Handler for EventHandler {
    fn condition(&self, _env: &BotEnv, _transport: &dyn ChatTransport, message: &Message) -> bool {
        (self.condition)(message)
    }

    fn action(&self, env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool {
        (self.action)(env, transport, message)
    }

    fn help(&self) -> String {
        self.help.clone()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("cannot register handler with id '{0}' twice")]
    DuplicateIdentifier(String),
}

/// Handlers by id. Built once at startup and consumed by [`Registry::install_into`].
pub struct Registry {
    env: Arc<BotEnv>,
    handlers: BTreeMap<String, Box<dyn Handler>>,
}

impl Registry {
    pub fn new(env: Arc<BotEnv>) -> Self {
        Self {
            env,
            handlers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, id: &str, handler: Box<dyn Handler>) -> Result<(), RegistryError> {
        if id == HELP_ID || self.handlers.contains_key(id) {
            return Err(RegistryError::DuplicateIdentifier(id.to_string()));
        }
        self.handlers.insert(id.to_string(), handler);
        Ok(())
    }

    pub fn register_command(&mut self, command: Command) -> Result<(), RegistryError> {
        let id = command.id().to_string();
        self.register(&id, Box::new(command))
    }

    /// Stops at the first failure; earlier registrations stay.
    pub fn register_all(
        &mut self,
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<(), RegistryError> {
        for command in commands {
            self.register_command(command)?;
        }
        Ok(())
    }

    pub fn deregister(&mut self, id: &str) {
        self.handlers.remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Lines sent in answer to `!help`.
    pub fn help_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{} - irc bot for handling outages", self.env.nick()),
            String::new(),
            "Available commands:".to_string(),
            format!("{:<16}{}", "!help", "Prints this message"),
        ];
        for (id, handler) in &self.handlers {
            let help = handler.help();
            if !help.is_empty() {
                lines.push(format!("{id:<16}{help}"));
            }
        }
        lines
    }

    /// Installs every handler in id order, then the help trigger.
    pub fn install_into(self, sink: &mut dyn TriggerSink) {
        let help = HelpTrigger {
            lines: self.help_lines(),
        };
        for (id, handler) in self.handlers {
            info!(%id, "registering handler");
            sink.add_trigger(Box::new(InstalledHandler {
                env: self.env.clone(),
                handler,
            }));
        }
        sink.add_trigger(Box::new(help));
    }
}

struct InstalledHandler {
    env: Arc<BotEnv>,
    handler: Box<dyn Handler>,
}

impl Trigger for InstalledHandler {
    fn condition(&self, transport: &dyn ChatTransport, message: &Message) -> bool {
        self.handler.condition(&self.env, transport, message)
    }

    fn action(&self, transport: &dyn ChatTransport, message: &Message) -> bool {
        self.handler.action(&self.env, transport, message)
    }
}

struct HelpTrigger {
    lines: Vec<String>,
}

impl Trigger for HelpTrigger {
    fn condition(&self, transport: &dyn ChatTransport, message: &Message) -> bool {
        if !message.is_privmsg() {
            return false;
        }
        let content = message.content.trim_end();
        if message.is_to_channel() {
            content == format!("{}: !help", transport.nick())
        } else {
            message.to.eq_ignore_ascii_case(transport.nick()) && content == "!help"
        }
    }

    fn action(&self, transport: &dyn ChatTransport, message: &Message) -> bool {
        for line in &self.lines {
            if let Err(err) = transport.reply(message, line) {
                warn!(error = %err, "failed to send help");
                break;
            }
        }
        true
    }
}
