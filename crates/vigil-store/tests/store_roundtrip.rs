use tempfile::tempdir;
use vigil_core::{Contact, Incident, IncidentStatus};
use vigil_store::BotStore;

#[test]
fn new_incident_gets_id_and_shows_up_as_open() {
    let tmp = tempdir().expect("tempdir");
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");

    let mut first = Incident::new(4, &["Website"]).expect("valid incident");
    store.save_incident(&mut first).expect("insert");
    let mut second = Incident::new(2, &["Thumbnails"]).expect("valid incident");
    store.save_incident(&mut second).expect("insert");
    assert!(first.id() > 0);
    assert!(second.id() > first.id());

    first.close().expect("close");
    store.save_incident(&mut first).expect("update");

    let open = store.open_incidents().expect("open incidents");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id(), second.id());

    let closed = store
        .get_incident(first.id())
        .expect("lookup")
        .expect("incident exists");
    assert_eq!(closed.status(), IncidentStatus::Closed);
    assert_eq!(closed.summarize(false), "Up");
}

#[test]
fn missing_incident_is_none() {
    let tmp = tempdir().expect("tempdir");
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");
    assert!(store.get_incident(404).expect("lookup").is_none());
}

#[test]
fn update_of_vanished_row_falls_back_to_insert() {
    let tmp = tempdir().expect("tempdir");
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");

    let mut incident = Incident::new(3, &["Other"]).expect("valid incident");
    incident.set_id(77);
    incident.append_description("seen in eqiad", chrono::Utc::now());
    store.save_incident(&mut incident).expect("save");

    let stored = store
        .get_incident(77)
        .expect("lookup")
        .expect("row inserted under the same id");
    assert_eq!(stored.description(), "seen in eqiad");
}

#[test]
fn topics_upsert_per_channel() {
    let tmp = tempdir().expect("tempdir");
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");

    assert_eq!(store.get_topic("#ops").expect("get"), None);
    store.save_topic("#ops", "first").expect("save");
    store.save_topic("#ops", "second").expect("save again");
    store.save_topic("#status", "other").expect("save other");
    assert_eq!(store.get_topic("#ops").expect("get").as_deref(), Some("second"));
    assert!(store.remove_topic("#ops").expect("remove"));
    assert!(!store.remove_topic("#ops").expect("remove twice"));
    assert_eq!(store.get_topic("#status").expect("get").as_deref(), Some("other"));
}

#[test]
fn acl_rows_are_unique_pairs() {
    let tmp = tempdir().expect("tempdir");
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");

    store.insert_acl("incident_start", "bob").expect("insert");
    store.insert_acl("incident_start", "#ops").expect("insert channel");
    assert!(store.insert_acl("incident_start", "bob").is_err());
    assert!(store.acl_exists("incident_start", "bob").expect("exists"));
    assert_eq!(
        store.acl_identifiers("incident_start").expect("list"),
        vec!["#ops".to_string(), "bob".to_string()]
    );
    assert!(store.delete_acl("incident_start", "bob").expect("delete"));
    assert!(!store.delete_acl("incident_start", "bob").expect("delete twice"));
}

#[test]
fn contacts_are_upserted_by_name() {
    let tmp = tempdir().expect("tempdir");
    let store = BotStore::open(&tmp.path().join("vigil.db")).expect("open store");

    store
        .save_contact(&Contact::new("alice", "+390612345", "alice@example.org"))
        .expect("insert");
    store
        .save_contact(&Contact::new("alice", "+14155550100", "alice@example.com"))
        .expect("update");
    let alice = store.get_contact("alice").expect("get").expect("exists");
    assert_eq!(alice.pretty(), "alice: +14155550100 (alice@example.com)");
    assert!(store.remove_contact("alice").expect("remove"));
    assert!(store.get_contact("alice").expect("get").is_none());
}

#[test]
fn reopening_database_keeps_rows_and_skips_applied_migrations() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("vigil.db");
    {
        let store = BotStore::open(&db).expect("open store");
        store.save_topic("#ops", "kept").expect("save");
    }
    let store = BotStore::open(&db).expect("reopen store");
    assert_eq!(store.get_topic("#ops").expect("get").as_deref(), Some("kept"));
}
