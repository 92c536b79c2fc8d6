use tracing_subscriber::EnvFilter;

const FALLBACK_LEVEL: &str = "info";

/// Where the active filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    Environment,
    Config,
    Fallback,
}

/// `RUST_LOG` wins over the configured level; a level that does not parse
/// falls back to `info`.
pub fn resolve_filter(env_filter: Option<&str>, log_level: &str) -> (EnvFilter, FilterSource) {
    if let Some(filter) = env_filter.and_then(|raw| EnvFilter::try_new(raw).ok()) {
        return (filter, FilterSource::Environment);
    }
    match EnvFilter::try_new(log_level) {
        Ok(filter) => (filter, FilterSource::Config),
        Err(_) => (EnvFilter::new(FALLBACK_LEVEL), FilterSource::Fallback),
    }
}

/// Installs the global fmt subscriber. Lines from background work carry their
/// thread name (`topic-store`).
pub fn init(log_level: &str) {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, source) = resolve_filter(from_env.as_deref(), log_level);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .is_ok();
    if installed && source == FilterSource::Fallback {
        tracing::warn!(log_level, "unparseable log_level, logging at {FALLBACK_LEVEL}");
    }
}
