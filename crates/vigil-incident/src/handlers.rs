use std::thread;

use tracing::{debug, error, info, warn};
use vigil_irc::{ERR_CHANOPRIVSNEEDED, Message};
use vigil_triggers::EventHandler;

use crate::sync::refused_notice;

fn is_topic_line(message: &Message) -> bool {
    message.topic_channel().is_some()
}

fn is_refusal(message: &Message) -> bool {
    message.command == ERR_CHANOPRIVSNEEDED
}

/// Persists topics seen on join (`331`/`332`) and on change (`TOPIC`) without
/// holding up the dispatch loop. A seen topic also confirms any write pending
/// for the channel.
pub fn store_topic() -> EventHandler {
    EventHandler::new(is_topic_line, |env, _transport, message| {
        let Some((channel, topic)) = message.observed_topic() else {
            return false;
        };
        env.topic_writes.settle(channel);
        let store = env.store.clone();
        let channel = channel.to_string();
        let topic = topic.to_string();
        let spawned = thread::Builder::new()
            .name("topic-store".to_string())
            .spawn(move || match store.save_topic(&channel, &topic) {
                Ok(()) => debug!(%channel, "stored observed topic"),
                Err(err) => error!(%channel, error = %err, "failed to store observed topic"),
            });
        if let Err(err) = spawned {
            error!(error = %err, "failed to spawn topic-store thread");
        }
        false
    })
}

/// Rolls back a topic write the server refused: the stored topic is dropped and
/// asked for again, and the nick whose command caused the write is told.
pub fn topic_refused() -> EventHandler {
    EventHandler::new(is_refusal, |env, transport, message| {
        let Some(channel) = message.param(1) else {
            return false;
        };
        match env.store.remove_topic(channel) {
            Ok(_) => debug!(%channel, "dropped refused topic"),
            Err(err) => error!(%channel, error = %err, "failed to drop refused topic"),
        }
        if let Err(err) = transport.query_topic(channel) {
            warn!(%channel, error = %err, "could not ask for the topic");
        }
        if let Some(issuer) = env.topic_writes.settle(channel) {
            if let Err(err) = transport.privmsg(&issuer, &refused_notice(channel)) {
                warn!(%issuer, error = %err, "failed to notify issuer");
            }
        }
        false
    })
}

pub fn log_topic() -> EventHandler {
    EventHandler::new(
        |message| is_topic_line(message) || is_refusal(message),
        |_env, _transport, message| {
            if is_refusal(message) {
                warn!(
                    channel = message.param(1).unwrap_or_default(),
                    reason = %message.content,
                    "topic change refused"
                );
            } else {
                info!(
                    channel = message.topic_channel().unwrap_or_default(),
                    by = %message.name,
                    topic = %message.content,
                    "topic change"
                );
            }
            false
        },
    )
}
