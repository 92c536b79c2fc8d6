use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, warn};

use crate::message::Message;
use crate::transport::{ChatTransport, Trigger, TriggerSet, TriggerSink};

const RPL_WELCOME: &str = "001";
const ERR_NICKNAMEINUSE: &str = "433";
const NICKSERV_PREFIX: &str = "PRIVMSG NickServ :";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// `host:port`
    pub server_address: String,
    pub nick: String,
    /// NickServ password, sent after registration completes.
    pub password: Option<String>,
    pub channels: Vec<String>,
}

/// Writer half of a connection; the only thing triggers get to see.
struct IrcSession {
    nick: String,
    writer: Mutex<TcpStream>,
}

impl ChatTransport for IrcSession {
    fn nick(&self) -> &str {
        &self.nick
    }

    fn send_raw(&self, line: &str) -> Result<()> {
        let line = line.replace(['\r', '\n'], " ");
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("irc writer lock poisoned"))?;
        writer
            .write_all(format!("{line}\r\n").as_bytes())
            .with_context(|| "failed to write to irc server")?;
        writer.flush()?;
        debug!(line = %redact(&line), "sent");
        Ok(())
    }
}

pub struct IrcClient {
    settings: SessionSettings,
    session: IrcSession,
    reader: BufReader<TcpStream>,
    triggers: TriggerSet,
}

impl IrcClient {
    pub fn connect(settings: SessionSettings) -> Result<Self> {
        if settings.nick.trim().is_empty() {
            bail!("irc nick must be set");
        }
        let stream = TcpStream::connect(&settings.server_address)
            .with_context(|| format!("failed to connect to {}", settings.server_address))?;
        let writer = stream
            .try_clone()
            .with_context(|| "failed to clone irc socket")?;
        info!(server = %settings.server_address, nick = %settings.nick, "connected");
        Ok(Self {
            session: IrcSession {
                nick: settings.nick.clone(),
                writer: Mutex::new(writer),
            },
            reader: BufReader::new(stream),
            settings,
            triggers: TriggerSet::new(),
        })
    }

    /// Registers with the server and processes lines until the connection ends.
    pub fn run(mut self) -> Result<()> {
        let nick = self.settings.nick.clone();
        self.session.send_raw(&format!("NICK {nick}"))?;
        self.session.send_raw(&format!("USER {nick} 0 * :{nick}"))?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| "failed to read from irc server")?;
            if read == 0 {
                bail!("connection closed by {}", self.settings.server_address);
            }
            let message = match Message::parse(&line) {
                Ok(message) => message,
                Err(err) => {
                    warn!(error = %err, "ignoring unparseable line");
                    continue;
                }
            };
            self.handle_protocol(&message)?;
            self.triggers.dispatch(&self.session, &message);
        }
    }

    fn handle_protocol(&self, message: &Message) -> Result<()> {
        match message.command.as_str() {
            "PING" => self.session.send_raw(&format!("PONG :{}", message.content))?,
            RPL_WELCOME => {
                if let Some(password) = &self.settings.password {
                    self.session
                        .privmsg("NickServ", &format!("IDENTIFY {password}"))?;
                }
                for channel in &self.settings.channels {
                    self.session.send_raw(&format!("JOIN {channel}"))?;
                    info!(%channel, "joining");
                }
            }
            ERR_NICKNAMEINUSE => bail!("nick {} is already in use", self.settings.nick),
            "ERROR" => warn!(reason = %message.content, "server error"),
            _ => {}
        }
        Ok(())
    }
}

impl TriggerSink for IrcClient {
    fn add_trigger(&mut self, trigger: Box<dyn Trigger>) {
        self.triggers.add_trigger(trigger);
    }
}

/// Masks everything after the NickServ verb (`IDENTIFY`, `SET PASSWORD`, ...).
fn redact(line: &str) -> String {
    let is_nickserv = line
        .get(..NICKSERV_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(NICKSERV_PREFIX));
    if !is_nickserv {
        return line.to_string();
    }
    let mut words = line[NICKSERV_PREFIX.len()..].split_whitespace();
    let kept = match (words.next(), words.next()) {
        (Some(verb), Some(setting)) if verb.eq_ignore_ascii_case("SET") => {
            format!("{verb} {setting}")
        }
        (Some(verb), _) => verb.to_string(),
        (None, _) => String::new(),
    };
    format!("{NICKSERV_PREFIX}{kept} ****")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_nickserv_password() {
        assert_eq!(
            redact("PRIVMSG NickServ :IDENTIFY hunter2"),
            "PRIVMSG NickServ :IDENTIFY ****"
        );
        assert_eq!(
            redact("PRIVMSG NickServ :SET PASSWORD hunter2"),
            "PRIVMSG NickServ :SET PASSWORD ****"
        );
        assert_eq!(
            redact("PRIVMSG nickserv :GHOST vigil hunter2"),
            "PRIVMSG NickServ :GHOST ****"
        );
        assert_eq!(redact("JOIN #ops"), "JOIN #ops");
        assert_eq!(
            redact("PRIVMSG #ops :SET PASSWORD is not a secret here"),
            "PRIVMSG #ops :SET PASSWORD is not a secret here"
        );
    }
}
