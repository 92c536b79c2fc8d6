//! In-memory transport for exercising triggers without a server.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Result, bail};

use crate::message::Message;
use crate::transport::ChatTransport;

#[derive(Debug, Default)]
pub struct MemoryTransport {
    nick: String,
    lines: Mutex<Vec<String>>,
    failing_topics: Mutex<HashSet<String>>,
}

impl MemoryTransport {
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            ..Self::default()
        }
    }

    /// Makes every later topic write to `channel` fail, as a `+t` channel
    /// without operator rights would.
    pub fn fail_topic_for(&self, channel: &str) {
        if let Ok(mut failing) = self.failing_topics.lock() {
            failing.insert(channel.to_string());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }

    /// PRIVMSG texts sent to `target`, in order.
    pub fn messages_to(&self, target: &str) -> Vec<String> {
        self.parsed()
            .into_iter()
            .filter(|m| m.is_privmsg() && m.to == target)
            .map(|m| if m.content == " " { String::new() } else { m.content })
            .collect()
    }

    /// `(channel, topic)` pairs for every TOPIC write that went out.
    pub fn topics(&self) -> Vec<(String, String)> {
        self.topic_lines()
            .filter(|line| line.contains(" :"))
            .filter_map(|line| Message::parse(&line).ok())
            .map(|m| (m.to, m.content))
            .collect()
    }

    /// Channels whose topic was asked for with a bare `TOPIC <channel>`.
    pub fn topic_queries(&self) -> Vec<String> {
        self.topic_lines()
            .filter(|line| !line.contains(" :"))
            .filter_map(|line| line.split_whitespace().nth(1).map(str::to_string))
            .collect()
    }

    fn topic_lines(&self) -> impl Iterator<Item = String> {
        self.lines()
            .into_iter()
            .filter(|line| line.starts_with("TOPIC "))
    }

    fn parsed(&self) -> Vec<Message> {
        self.lines()
            .iter()
            .filter_map(|line| Message::parse(line).ok())
            .collect()
    }
}

impl ChatTransport for MemoryTransport {
    fn nick(&self) -> &str {
        &self.nick
    }

    fn send_raw(&self, line: &str) -> Result<()> {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(_) => bail!("memory transport lock poisoned"),
        }
        Ok(())
    }

    fn set_topic(&self, channel: &str, topic: &str) -> Result<()> {
        let refused = self
            .failing_topics
            .lock()
            .map(|failing| failing.contains(channel))
            .unwrap_or(false);
        if refused {
            bail!("{channel}: you're not channel operator");
        }
        self.send_raw(&format!("TOPIC {channel} :{topic}"))
    }
}
