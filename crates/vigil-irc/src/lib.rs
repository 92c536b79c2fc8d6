pub mod client;
pub mod message;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;

pub use client::{IrcClient, SessionSettings};
pub use message::{ERR_CHANOPRIVSNEEDED, Message, ParseError, RPL_NOTOPIC, RPL_TOPIC, is_channel};
pub use transport::{ChatTransport, Trigger, TriggerSet, TriggerSink};
