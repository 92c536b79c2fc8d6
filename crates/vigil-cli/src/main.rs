use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use vigil_common::{APP_NAME, VigilConfig, logging};
use vigil_contact::contact_commands;
use vigil_incident::{
    DriveDocumentProvider, incident_commands, log_topic, store_topic, topic_refused,
};
use vigil_irc::{IrcClient, SessionSettings};
use vigil_store::BotStore;
use vigil_triggers::{AclStore, BotEnv, Registry, builtin_commands};

#[derive(Debug, Parser)]
#[command(name = "vigil", about = "IRC bot for handling outages", version)]
struct Cli {
    /// Config file; defaults to $VIGIL_CONFIG, then ~/.vigil/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to the configured server and serve commands.
    Run,
    /// Validate local setup and generate default config if missing.
    Doctor,
    /// Authorization list maintenance.
    Acl {
        #[command(subcommand)]
        command: AclCommand,
    },
    /// Print the open incidents.
    Incidents,
}

#[derive(Debug, Subcommand)]
enum AclCommand {
    /// Allow a nick or a #channel to use a command.
    Add { command: String, identifier: String },
    /// Revoke an entry.
    Remove { command: String, identifier: String },
    /// Show who may use a command.
    List { command: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    match cli.command {
        Some(Command::Run) => run(config_path),
        Some(Command::Doctor) => doctor(config_path),
        Some(Command::Acl { command }) => acl(config_path, command),
        Some(Command::Incidents) => incidents(config_path),
        None => {
            println!("{APP_NAME} CLI bootstrap complete.");
            println!("Run `vigil doctor` to generate and validate local config.");
            Ok(())
        }
    }
}

fn load_initialized_config(path: Option<PathBuf>) -> Result<VigilConfig> {
    let (config, _, _) = VigilConfig::load_or_create(path.as_deref())?;
    config.validate()?;
    logging::init(&config.log_level);
    Ok(config)
}

fn open_store(config: &VigilConfig) -> Result<Arc<BotStore>> {
    let store = BotStore::open(&config.db_path)
        .with_context(|| format!("cannot open the database at {}", config.db_path.display()))?;
    Ok(Arc::new(store))
}

fn run(path: Option<PathBuf>) -> Result<()> {
    let config = load_initialized_config(path)?;
    let store = open_store(&config)?;

    let mut env = BotEnv::new(config.clone(), store);
    if config.documents.enabled() {
        match DriveDocumentProvider::from_config(&config.documents) {
            Ok(provider) => env = env.with_documents(Arc::new(provider)),
            Err(err) => warn!(error = %err, "incident documents disabled"),
        }
    }

    let mut registry = Registry::new(Arc::new(env));
    registry.register_all(builtin_commands()?)?;
    registry.register_all(incident_commands()?)?;
    registry.register_all(contact_commands()?)?;
    registry.register("store_topic", Box::new(store_topic()))?;
    registry.register("log_topic", Box::new(log_topic()))?;
    registry.register("topic_refused", Box::new(topic_refused()))?;

    let mut client = IrcClient::connect(SessionSettings {
        server_address: config.server_address(),
        nick: config.nick.clone(),
        password: config.password.clone(),
        channels: config.channels.clone(),
    })?;
    registry.install_into(&mut client);
    info!(channels = ?config.channels, "bot ready");
    client.run()
}

fn doctor(path: Option<PathBuf>) -> Result<()> {
    let (config, path, created) = VigilConfig::load_or_create(path.as_deref())?;
    config.validate()?;
    logging::init(&config.log_level);
    let store = open_store(&config)?;

    println!("{APP_NAME} doctor: OK");
    println!("config: {}", path.display());
    println!("database: {}", store.db_path().display());
    println!("server: {}", config.server_address());
    println!("channels: {}", config.channels.join(", "));
    println!("documents: {}", config.documents.enabled());
    println!("created_config: {created}");
    Ok(())
}

fn acl(path: Option<PathBuf>, command: AclCommand) -> Result<()> {
    let config = load_initialized_config(path)?;
    let acl = AclStore::new(open_store(&config)?, config.admins.clone());

    match command {
        AclCommand::Add {
            command,
            identifier,
        } => {
            acl.add(&command, &identifier)?;
            println!("added: {command} {identifier}");
        }
        AclCommand::Remove {
            command,
            identifier,
        } => {
            acl.remove(&command, &identifier)?;
            println!("removed: {command} {identifier}");
        }
        AclCommand::List { command } => {
            let listing = acl.list(&command)?;
            println!("command: {command}");
            println!("users: {}", listing.handles.join(", "));
            println!("channels: {}", listing.channels.join(", "));
        }
    }
    Ok(())
}

fn incidents(path: Option<PathBuf>) -> Result<()> {
    let config = load_initialized_config(path)?;
    let store = open_store(&config)?;
    let open = store.open_incidents()?;
    println!("open_incidents: {}", open.len());
    for incident in &open {
        println!(
            "- #{} severity={} components={} started_at={}",
            incident.id(),
            incident.severity().get(),
            incident.components().join(", "),
            incident.started_at().to_rfc3339()
        );
    }
    Ok(())
}
