use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use tempfile::TempDir;
use vigil_common::VigilConfig;
use vigil_irc::testing::MemoryTransport;
use vigil_irc::{Message, TriggerSet};
use vigil_store::BotStore;
use vigil_triggers::builtin::sing;
use vigil_triggers::{
    AclBackend, BotEnv, Command, DENIED_REPLY, EventHandler, MALFORMED_REPLY, Registry,
    RegistryError, Visibility, builtin_commands,
};

struct LockedBackend;

impl AclBackend for LockedBackend {
    fn identifiers(&self, _: &str) -> Result<Vec<String>> {
        bail!("database is locked")
    }
    fn exists(&self, _: &str, _: &str) -> Result<bool> {
        bail!("database is locked")
    }
    fn insert(&self, _: &str, _: &str) -> Result<()> {
        bail!("database is locked")
    }
    fn delete(&self, _: &str, _: &str) -> Result<bool> {
        bail!("database is locked")
    }
}

fn config() -> VigilConfig {
    VigilConfig {
        nick: "vigil".to_string(),
        channels: vec!["#ops".to_string()],
        admins: vec!["root".to_string()],
        ..VigilConfig::default()
    }
}

fn env(tmp: &TempDir) -> BotEnv {
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");
    BotEnv::new(config(), Arc::new(store))
}

fn ping(hits: Arc<AtomicUsize>) -> Command {
    Command::new("ping", &[], "Answers pong", Visibility::BOTH, move |inv| {
        hits.fetch_add(1, Ordering::SeqCst);
        inv.reply("pong");
        true
    })
    .expect("valid command")
}

fn installed(registry: Registry) -> TriggerSet {
    let mut triggers = TriggerSet::new();
    registry.install_into(&mut triggers);
    triggers
}

#[test]
fn non_admin_without_acl_entry_is_denied() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry
        .register_all(builtin_commands().expect("builtin commands"))
        .expect("register");
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("bob", "vigil", "!acl_add sing bob"));
    assert_eq!(transport.messages_to("bob"), vec![DENIED_REPLY]);
}

#[test]
fn admin_is_allowed_when_acl_store_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let env = env(&tmp).with_acl_backend(Arc::new(LockedBackend));
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(Arc::new(env));
    registry.register_command(ping(hits.clone())).expect("register");
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!ping"));
    triggers.dispatch(&transport, &Message::privmsg("bob", "vigil", "!ping"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(transport.messages_to("root"), vec!["pong"]);
    assert_eq!(transport.messages_to("bob"), vec![DENIED_REPLY]);
}

#[test]
fn acl_entries_added_by_admin_grant_access() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry
        .register_all(builtin_commands().expect("builtin commands"))
        .expect("register");
    registry.register_command(ping(hits.clone())).expect("register");
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!acl_add ping #ops"));
    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!acl_add ping #ops"));
    assert_eq!(
        transport.messages_to("root"),
        vec!["The ACL was saved.", "This ACL is already present."]
    );

    triggers.dispatch(&transport, &Message::privmsg("bob", "#ops", "vigil: !ping"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(transport.messages_to("#ops"), vec!["pong"]);

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!acl_get ping"));
    let listing = transport.messages_to("root");
    assert_eq!(
        &listing[2..],
        &["ACL for ping", "Users:", "\troot", "Channels:", "\t#ops"]
    );
}

#[test]
fn duplicate_registration_fails_and_second_handler_is_unreachable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry.register_command(ping(first.clone())).expect("first");
    assert_eq!(
        registry.register_command(ping(second.clone())),
        Err(RegistryError::DuplicateIdentifier("ping".to_string()))
    );
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!ping"));
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[test]
fn register_all_keeps_registrations_before_the_failure() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry.register_command(ping(hits.clone())).expect("register");

    let quiet = Command::new("quiet", &[], "", Visibility::BOTH, |_| true).expect("valid");
    let result = registry.register_all(vec![quiet, ping(hits), sing(Duration::ZERO).expect("sing")]);
    assert!(result.is_err());
    assert!(registry.contains("quiet"));
    assert!(!registry.contains("sing"));

    registry.deregister("quiet");
    registry.deregister("quiet");
    assert_eq!(registry.ids(), vec!["ping"]);
}

#[test]
fn help_lists_commands_sorted_and_skips_empty_help() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry
        .register_command(
            Command::new("sing", &[], "", Visibility::PUBLIC, |_| true).expect("valid"),
        )
        .expect("register");
    registry
        .register_all(
            builtin_commands()
                .expect("builtin commands")
                .into_iter()
                .filter(|cmd| cmd.id() != "sing"),
        )
        .expect("register");
    registry
        .register("log_topic", Box::new(EventHandler::new(|_| false, |_, _, _| false)))
        .expect("register");

    let lines = registry.help_lines();
    assert_eq!(lines[0], "vigil - irc bot for handling outages");
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], "Available commands:");
    assert_eq!(lines[3], format!("{:<16}Prints this message", "!help"));
    let ids: Vec<&str> = lines[4..]
        .iter()
        .map(|line| line.split_whitespace().next().unwrap_or(""))
        .collect();
    assert_eq!(ids, vec!["acl_add", "acl_get", "acl_remove", "change_pass"]);
    assert!(lines.iter().any(|line| line.starts_with("acl_get         Gets the defined ACLs")));

    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");
    triggers.dispatch(&transport, &Message::privmsg("bob", "vigil", "!help"));
    assert_eq!(transport.messages_to("bob").len(), 8);
    triggers.dispatch(&transport, &Message::privmsg("bob", "#ops", "vigil: !help"));
    assert_eq!(transport.messages_to("#ops").len(), 8);
    triggers.dispatch(&transport, &Message::privmsg("bob", "#ops", "!help"));
    assert_eq!(transport.messages_to("#ops").len(), 8);
}

#[test]
fn help_id_is_reserved() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    let help = Command::new("help", &[], "mine", Visibility::BOTH, |_| true).expect("valid");
    assert!(registry.register_command(help).is_err());
}

#[test]
fn malformed_invocation_gets_diagnosis_and_usage() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry
        .register_all(builtin_commands().expect("builtin commands"))
        .expect("register");
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!acl_add sing"));
    assert_eq!(
        transport.messages_to("root"),
        vec![
            MALFORMED_REPLY,
            "missing argument <nick_or_chan>",
            "Format: !acl_add <command> <nick_or_chan>",
        ]
    );
}

#[test]
fn sing_is_public_only() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry
        .register_command(sing(Duration::ZERO).expect("sing"))
        .expect("register");
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!sing"));
    assert!(transport.messages_to("root").is_empty());
    triggers.dispatch(&transport, &Message::privmsg("root", "#ops", "vigil: !sing"));
    let lyrics = transport.messages_to("#ops");
    assert_eq!(lyrics.len(), 6);
    assert_eq!(lyrics[0], "Never gonna give you up");
}

#[test]
fn change_pass_messages_nickserv() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut registry = Registry::new(Arc::new(env(&tmp)));
    registry
        .register_all(builtin_commands().expect("builtin commands"))
        .expect("register");
    let triggers = installed(registry);
    let transport = MemoryTransport::new("vigil");

    triggers.dispatch(&transport, &Message::privmsg("root", "vigil", "!change_pass s3cret"));
    assert_eq!(transport.messages_to("NickServ"), vec!["SET PASSWORD s3cret"]);
    assert_eq!(
        transport.messages_to("root"),
        vec!["Password changed. Do not forget to change the configuration too."]
    );
}
