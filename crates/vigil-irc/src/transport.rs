use anyhow::Result;
use tracing::debug;

use crate::message::Message;

/// Outbound side of a chat session.
pub trait ChatTransport {
    fn nick(&self) -> &str;

    /// Writes one protocol line; the line terminator is added by the transport.
    fn send_raw(&self, line: &str) -> Result<()>;

    /// IRC has no multi-line messages, so each line of `text` is sent on its own.
    fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        for line in text.split('\n') {
            let line = line.trim_end_matches('\r');
            let line = if line.is_empty() { " " } else { line };
            self.send_raw(&format!("PRIVMSG {target} :{line}"))?;
        }
        Ok(())
    }

    fn reply(&self, message: &Message, text: &str) -> Result<()> {
        self.privmsg(message.reply_target(), text)
    }

    fn set_topic(&self, channel: &str, topic: &str) -> Result<()> {
        self.send_raw(&format!("TOPIC {channel} :{topic}"))
    }

    /// Asks the server for the current topic; the answer arrives as `331` or `332`.
    fn query_topic(&self, channel: &str) -> Result<()> {
        self.send_raw(&format!("TOPIC {channel}"))
    }
}

/// A predicate/action pair evaluated against every inbound line.
///
/// `action` returning `true` stops evaluation of later triggers for the line.
pub trait Trigger {
    fn condition(&self, transport: &dyn ChatTransport, message: &Message) -> bool;
    fn action(&self, transport: &dyn ChatTransport, message: &Message) -> bool;
}

pub trait TriggerSink {
    fn add_trigger(&mut self, trigger: Box<dyn Trigger>);
}

/// Triggers in installation order.
#[derive(Default)]
pub struct TriggerSet {
    triggers: Vec<Box<dyn Trigger>>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Runs matching triggers for `message` and returns how many actions ran.
    pub fn dispatch(&self, transport: &dyn ChatTransport, message: &Message) -> usize {
        let mut ran = 0;
        for trigger in &self.triggers {
            if !trigger.condition(transport, message) {
                continue;
            }
            ran += 1;
            if trigger.action(transport, message) {
                debug!(command = %message.command, "trigger consumed message");
                break;
            }
        }
        ran
    }
}

impl TriggerSink for TriggerSet {
    fn add_trigger(&mut self, trigger: Box<dyn Trigger>) {
        self.triggers.push(trigger);
    }
}
