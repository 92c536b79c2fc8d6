use thiserror::Error;

/// Sent instead of `332` when the channel has no topic: `331 <me> <channel> :No topic is set`.
pub const RPL_NOTOPIC: &str = "331";
/// RFC 1459 numeric sent on JOIN or TOPIC query: `332 <me> <channel> :<topic>`.
pub const RPL_TOPIC: &str = "332";
/// Sent when the bot lacks operator rights to change a `+t` channel topic.
pub const ERR_CHANOPRIVSNEEDED: &str = "482";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("line has a prefix but no command")]
    MissingCommand,
}

/// One inbound protocol line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Raw `nick!user@host` (or server name) prefix.
    pub prefix: Option<String>,
    /// Nick part of the prefix; empty for prefix-less lines.
    pub name: String,
    /// Upper-cased command or numeric.
    pub command: String,
    /// Middle parameters; the trailing parameter lives in `content`.
    pub params: Vec<String>,
    /// First parameter: the channel or nick a PRIVMSG was sent to.
    pub to: String,
    pub content: String,
}

pub fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

impl Message {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();
        if rest.is_empty() {
            return Err(ParseError::Empty);
        }
        // IRCv3 message tags are ignored.
        if rest.starts_with('@') {
            rest = rest
                .split_once(' ')
                .map_or("", |(_, tail)| tail)
                .trim_start();
        }

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (raw_prefix, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
            prefix = Some(raw_prefix.to_string());
            rest = tail.trim_start();
        }

        let (command, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        let mut params = Vec::new();
        let mut trailing = None;
        loop {
            tail = tail.trim_start_matches(' ');
            if tail.is_empty() {
                break;
            }
            if let Some(text) = tail.strip_prefix(':') {
                trailing = Some(text.to_string());
                break;
            }
            let (param, next) = tail.split_once(' ').unwrap_or((tail, ""));
            params.push(param.to_string());
            tail = next;
        }

        let content = match trailing {
            Some(text) => text,
            None if params.len() > 1 => params.pop().unwrap_or_default(),
            None => String::new(),
        };
        let name = prefix
            .as_deref()
            .map(|p| p.split(['!', '@']).next().unwrap_or(p).to_string())
            .unwrap_or_default();
        let to = params.first().cloned().unwrap_or_default();

        Ok(Self {
            prefix,
            name,
            command: command.to_ascii_uppercase(),
            params,
            to,
            content,
        })
    }

    /// Builds a PRIVMSG as the server would deliver it.
    pub fn privmsg(from: &str, to: &str, content: &str) -> Self {
        Self {
            prefix: Some(format!("{from}!{from}@example.invalid")),
            name: from.to_string(),
            command: "PRIVMSG".to_string(),
            params: vec![to.to_string()],
            to: to.to_string(),
            content: content.to_string(),
        }
    }

    pub fn is_privmsg(&self) -> bool {
        self.command == "PRIVMSG"
    }

    pub fn is_to_channel(&self) -> bool {
        is_channel(&self.to)
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Channel replies go back to the channel, private ones to the sender.
    pub fn reply_target(&self) -> &str {
        if self.is_to_channel() {
            &self.to
        } else {
            &self.name
        }
    }

    /// Channel a topic line refers to, for `331`, `332` and `TOPIC`.
    pub fn topic_channel(&self) -> Option<&str> {
        match self.command.as_str() {
            RPL_NOTOPIC | RPL_TOPIC => self.param(1),
            "TOPIC" => self.param(0),
            _ => None,
        }
    }

    /// `(channel, topic)` as the server reports it; a `331` is an empty topic.
    pub fn observed_topic(&self) -> Option<(&str, &str)> {
        let channel = self.topic_channel()?;
        if self.command == RPL_NOTOPIC {
            Some((channel, ""))
        } else {
            Some((channel, self.content.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_privmsg_with_prefix_and_trailing() {
        let msg = Message::parse(":alice!al@host.example PRIVMSG #ops :vigil: !incidents\r\n")
            .expect("parse");
        assert_eq!(msg.prefix.as_deref(), Some("alice!al@host.example"));
        assert_eq!(msg.name, "alice");
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.to, "#ops");
        assert_eq!(msg.content, "vigil: !incidents");
        assert!(msg.is_to_channel());
        assert_eq!(msg.reply_target(), "#ops");
    }

    #[test]
    fn parses_topic_numeric() {
        let msg = Message::parse(":irc.example 332 vigil #ops :Deploys ok | Status: Up")
            .expect("parse");
        assert_eq!(msg.command, RPL_TOPIC);
        assert_eq!(msg.params, vec!["vigil", "#ops"]);
        assert_eq!(msg.topic_channel(), Some("#ops"));
        assert_eq!(msg.content, "Deploys ok | Status: Up");
        assert_eq!(msg.observed_topic(), Some(("#ops", "Deploys ok | Status: Up")));
    }

    #[test]
    fn missing_topic_is_observed_as_empty() {
        let msg = Message::parse(":irc.example 331 vigil #ops :No topic is set").expect("parse");
        assert_eq!(msg.observed_topic(), Some(("#ops", "")));

        let privmsg = Message::privmsg("bob", "#ops", "hi");
        assert_eq!(privmsg.observed_topic(), None);
    }

    #[test]
    fn parses_topic_change_and_ping() {
        let topic = Message::parse(":bob!b@h TOPIC #ops :new topic").expect("parse");
        assert_eq!(topic.topic_channel(), Some("#ops"));
        assert_eq!(topic.content, "new topic");

        let ping = Message::parse("PING :irc.example").expect("parse");
        assert_eq!(ping.prefix, None);
        assert_eq!(ping.command, "PING");
        assert_eq!(ping.content, "irc.example");
    }

    #[test]
    fn last_middle_param_becomes_content_without_trailing() {
        let msg = Message::parse(":bob!b@h privmsg vigil !sing").expect("parse");
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.to, "vigil");
        assert_eq!(msg.content, "!sing");
        assert_eq!(msg.reply_target(), "bob");
    }

    #[test]
    fn skips_tags_and_rejects_garbage() {
        let msg = Message::parse("@time=2026-10-14T10:00:00Z :bob!b@h PRIVMSG #ops :hi")
            .expect("parse");
        assert_eq!(msg.content, "hi");
        assert_eq!(Message::parse("   \r\n"), Err(ParseError::Empty));
        assert_eq!(Message::parse(":lonely.prefix"), Err(ParseError::MissingCommand));
    }
}
