use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};
use vigil_irc::{ChatTransport, Message};

use crate::env::BotEnv;
use crate::pattern::{ArgSpec, CommandPattern, PatternError};
use crate::registry::Handler;

pub const DENIED_REPLY: &str = "You're not allowed to perform this action.";
pub const MALFORMED_REPLY: &str = "The command is not properly formatted.";

/// Business callback; the return value says whether dispatch stops for the line.
pub type CommandAction = Arc<dyn Fn(&Invocation<'_>) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    /// `<nick>: !id` in a channel.
    pub public: bool,
    /// `!id` sent straight to the bot.
    pub private: bool,
}

impl Visibility {
    pub const PUBLIC: Self = Self {
        public: true,
        private: false,
    };
    pub const PRIVATE: Self = Self {
        public: false,
        private: true,
    };
    pub const BOTH: Self = Self {
        public: true,
        private: true,
    };
}

/// A matched, authorized call of a command.
pub struct Invocation<'a> {
    pub transport: &'a dyn ChatTransport,
    pub message: &'a Message,
    pub args: Vec<String>,
    pub env: &'a BotEnv,
}

impl Invocation<'_> {
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map_or("", String::as_str)
    }

    pub fn sender(&self) -> &str {
        &self.message.name
    }

    pub fn is_private(&self) -> bool {
        !self.message.is_to_channel()
    }

    pub fn reply(&self, text: &str) {
        if let Err(err) = self.transport.reply(self.message, text) {
            warn!(target_name = %self.message.reply_target(), error = %err, "failed to send reply");
        }
    }

    /// Sends `text` to the issuer only, even for channel invocations.
    pub fn notify_sender(&self, text: &str) {
        if let Err(err) = self.transport.privmsg(&self.message.name, text) {
            warn!(sender = %self.message.name, error = %err, "failed to notify sender");
        }
    }
}

pub struct Command {
    id: String,
    pattern: CommandPattern,
    help: String,
    visibility: Visibility,
    action: CommandAction,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new<F>(
        id: &str,
        args: &[ArgSpec],
        help: &str,
        visibility: Visibility,
        action: F,
    ) -> Result<Self, PatternError>
    where
        F: Fn(&Invocation<'_>) -> bool + Send + Sync + 'static,
    {
        Ok(Self {
            id: id.to_string(),
            pattern: CommandPattern::new(id, args)?,
            help: help.to_string(),
            visibility,
            action: Arc::new(action),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn usage(&self) -> String {
        self.pattern.usage()
    }

    /// `"<help>. Format: <usage>"`, or empty for commands without help.
    pub fn help_text(&self) -> String {
        if self.help.is_empty() {
            return String::new();
        }
        format!("{}. Format: {}", self.help, self.usage())
    }

    pub fn is_addressed_to(&self, message: &Message, nick: &str) -> bool {
        self.command_text(message, nick).is_some()
    }

    /// The `!id ...` part of an addressed message.
    fn command_text<'m>(&self, message: &'m Message, nick: &str) -> Option<&'m str> {
        if !message.is_privmsg() {
            return None;
        }
        if self.visibility.private && message.to.eq_ignore_ascii_case(nick) {
            let text = message.content.as_str();
            return starts_with_command(text, &self.id).then_some(text);
        }
        if self.visibility.public && message.is_to_channel() {
            let text = message.content.strip_prefix(nick)?.strip_prefix(": ")?;
            return starts_with_command(text, &self.id).then_some(text);
        }
        None
    }

    pub fn authorize(&self, env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool {
        if env.acl.check(&self.id, &message.name, &message.to) {
            return true;
        }
        info!(command = %self.id, sender = %message.name, target_name = %message.to, "denied");
        if let Err(err) = transport.reply(message, DENIED_REPLY) {
            warn!(error = %err, "failed to send denial");
        }
        false
    }

    pub fn execute(&self, env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool {
        let Some(text) = self.command_text(message, transport.nick()) else {
            return false;
        };
        let Some(args) = self.pattern.captures(text) else {
            let diagnosis = self.pattern.diagnose(text);
            for line in [
                MALFORMED_REPLY.to_string(),
                diagnosis,
                format!("Format: {}", self.usage()),
            ] {
                if let Err(err) = transport.reply(message, &line) {
                    warn!(error = %err, "failed to send format help");
                    break;
                }
            }
            return false;
        };
        info!(command = %self.id, sender = %message.name, "executing");
        (self.action)(&Invocation {
            transport,
            message,
            args,
            env,
        })
    }
}

impl Handler for Command {
    fn condition(&self, _env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool {
        self.is_addressed_to(message, transport.nick())
    }

    fn action(&self, env: &BotEnv, transport: &dyn ChatTransport, message: &Message) -> bool {
        self.authorize(env, transport, message) && self.execute(env, transport, message)
    }

    fn help(&self) -> String {
        self.help_text()
    }
}

fn starts_with_command(text: &str, id: &str) -> bool {
    match text.strip_prefix('!').and_then(|t| t.strip_prefix(id)) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(visibility: Visibility) -> Command {
        Command::new(
            "incident",
            &[ArgSpec::named("id", r"\d+")],
            "Shows an incident",
            visibility,
            |_| true,
        )
        .expect("valid command")
    }

    #[test]
    fn private_command_ignores_channel_lines() {
        let cmd = command(Visibility::PRIVATE);
        assert!(cmd.is_addressed_to(&Message::privmsg("bob", "vigil", "!incident 3"), "vigil"));
        assert!(!cmd.is_addressed_to(&Message::privmsg("bob", "#ops", "vigil: !incident 3"), "vigil"));
        assert!(!cmd.is_addressed_to(&Message::privmsg("bob", "#ops", "!incident 3"), "vigil"));
    }

    #[test]
    fn public_command_ignores_private_lines() {
        let cmd = command(Visibility::PUBLIC);
        assert!(cmd.is_addressed_to(&Message::privmsg("bob", "#ops", "vigil: !incident 3"), "vigil"));
        assert!(!cmd.is_addressed_to(&Message::privmsg("bob", "vigil", "!incident 3"), "vigil"));
        assert!(!cmd.is_addressed_to(&Message::privmsg("bob", "#ops", "other: !incident 3"), "vigil"));
    }

    #[test]
    fn id_must_end_at_a_word_boundary() {
        let cmd = command(Visibility::BOTH);
        assert!(!cmd.is_addressed_to(&Message::privmsg("bob", "vigil", "!incidents"), "vigil"));
        assert!(!cmd.is_addressed_to(&Message::privmsg("bob", "vigil", "!incident_close 2"), "vigil"));
        assert!(cmd.is_addressed_to(&Message::privmsg("bob", "vigil", "!incident"), "vigil"));
    }

    #[test]
    fn non_privmsg_lines_are_ignored() {
        let cmd = command(Visibility::BOTH);
        let mut msg = Message::privmsg("bob", "vigil", "!incident 3");
        msg.command = "NOTICE".to_string();
        assert!(!cmd.is_addressed_to(&msg, "vigil"));
    }

    #[test]
    fn help_text_is_empty_without_help() {
        let quiet = Command::new("quiet", &[], "", Visibility::BOTH, |_| true).expect("valid");
        assert_eq!(quiet.help_text(), "");
        assert_eq!(
            command(Visibility::BOTH).help_text(),
            "Shows an incident. Format: !incident <id>"
        );
    }
}
