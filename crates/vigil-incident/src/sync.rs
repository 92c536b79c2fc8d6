use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};
use vigil_core::{Incident, render_status, rewrite_topic};
use vigil_irc::ChatTransport;
use vigil_triggers::BotEnv;

#[derive(Debug, Error)]
pub enum TopicError {
    /// No `331`/`332`/`TOPIC` line has been seen for the channel yet.
    #[error("the topic of {0} is not known yet")]
    Unknown(String),
    #[error("could not set the topic of {channel}: {reason}")]
    Write { channel: String, reason: String },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: TopicError,
}

impl ChannelFailure {
    /// Private notice for whoever ran the command.
    pub fn notice(&self) -> String {
        match &self.error {
            TopicError::Unknown(_) => format!(
                "I have not seen the topic of {} yet, so I left it alone. It will be updated on the next incident change.",
                self.channel
            ),
            TopicError::Write { .. } => refused_notice(&self.channel),
            TopicError::Store(_) => format!(
                "Could not update the topic of {}, check the logs.",
                self.channel
            ),
        }
    }
}

pub(crate) fn refused_notice(channel: &str) -> String {
    format!("Could not update the topic of {channel}. Check my permissions please.")
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
    pub failures: Vec<ChannelFailure>,
}

/// Keeps the `| Status: ` segment of every configured channel's topic in line
/// with the open incidents.
///
/// A write that leaves the transport is optimistically persisted; the server
/// can still refuse it with `482`, which `topic_refused` rolls back.
pub struct TopicSynchronizer<'a> {
    env: &'a BotEnv,
    transport: &'a dyn ChatTransport,
    issuer: Option<&'a str>,
}

impl<'a> TopicSynchronizer<'a> {
    pub fn new(env: &'a BotEnv, transport: &'a dyn ChatTransport) -> Self {
        Self {
            env,
            transport,
            issuer: None,
        }
    }

    /// Remembers `issuer` for every write, so a later refusal can be reported.
    pub fn on_behalf_of(mut self, issuer: &'a str) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Fails only when the open incidents cannot be loaded; per-channel
    /// failures land in the report.
    pub fn sync_all(&self) -> anyhow::Result<SyncReport> {
        let mut incidents = self
            .env
            .store
            .open_incidents()
            .with_context(|| "failed to load open incidents")?;
        crate::attach_documents(self.env, &mut incidents);

        let mut report = SyncReport::default();
        for channel in &self.env.config.channels {
            match self.sync_channel(channel, &incidents) {
                Ok(true) => report.written.push(channel.clone()),
                Ok(false) => report.unchanged.push(channel.clone()),
                Err(error) => {
                    warn!(%channel, error = %error, "topic update failed");
                    report.failures.push(ChannelFailure {
                        channel: channel.clone(),
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Returns whether a topic write went out. A channel whose topic was never
    /// observed is not written; the server is asked for it instead.
    pub fn sync_channel(&self, channel: &str, incidents: &[Incident]) -> Result<bool, TopicError> {
        let extended = self.env.config.is_public_channel(channel);
        let summaries: Vec<String> = incidents
            .iter()
            .filter(|incident| incident.is_open())
            .map(|incident| incident.summarize(extended))
            .collect();
        let status = render_status(&summaries);

        let Some(current) = self.env.store.get_topic(channel)? else {
            if let Err(err) = self.transport.query_topic(channel) {
                warn!(%channel, error = %err, "could not ask for the topic");
            }
            return Err(TopicError::Unknown(channel.to_string()));
        };
        let Some(topic) = rewrite_topic(&current, &status) else {
            debug!(%channel, %status, "topic already up to date");
            return Ok(false);
        };

        self.transport
            .set_topic(channel, &topic)
            .map_err(|err| TopicError::Write {
                channel: channel.to_string(),
                reason: format!("{err:#}"),
            })?;
        self.env.store.save_topic(channel, &topic)?;
        if let Some(issuer) = self.issuer {
            self.env.topic_writes.record(channel, issuer);
        }
        info!(%channel, %topic, "topic updated");
        Ok(true)
    }
}
