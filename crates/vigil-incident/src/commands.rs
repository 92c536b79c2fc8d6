use chrono::Utc;
use tracing::{error, info, warn};
use vigil_core::{Incident, split_components};
use vigil_triggers::{ArgSpec, Command, Invocation, PatternError, Visibility};

use crate::{attach_document, attach_documents};
use crate::sync::TopicSynchronizer;

const SAVE_FAILED: &str = "Error saving the incident, check the logs.";
const LOAD_FAILED: &str = "Could not load the incident, check the logs.";
const NOT_FOUND: &str = "Incident not found.";

pub fn incident_commands() -> Result<Vec<Command>, PatternError> {
    Ok(vec![
        Command::new(
            "incident_start",
            &[
                ArgSpec::named("severity", r"\d+"),
                ArgSpec::rest("components_comma_sep", r".+"),
            ],
            "Start an incident",
            Visibility::PUBLIC,
            start_incident,
        )?,
        Command::new(
            "incident_update",
            &[
                ArgSpec::named("id", r"\d+"),
                ArgSpec::named("what", r"severity|description"),
                ArgSpec::rest("value", r".+"),
            ],
            "Update an incident. You can update either severity or the incident description",
            Visibility::PUBLIC,
            update_incident,
        )?,
        Command::new(
            "incident_close",
            &[ArgSpec::named("id", r"\d+")],
            "Closes an incident",
            Visibility::PUBLIC,
            close_incident,
        )?,
        Command::new(
            "incidents",
            &[],
            "Lists the open incidents",
            Visibility::BOTH,
            list_incidents,
        )?,
        Command::new(
            "incident_details",
            &[ArgSpec::named("id", r"\d+")],
            "Shows everything known about an incident",
            Visibility::BOTH,
            incident_details,
        )?,
    ])
}

/// Private answers always carry document links; channel answers only in
/// public channels.
fn extended(inv: &Invocation<'_>) -> bool {
    inv.is_private() || inv.env.config.is_public_channel(&inv.message.to)
}

fn start_incident(inv: &Invocation<'_>) -> bool {
    let Ok(severity) = inv.arg(0).parse::<i64>() else {
        inv.reply("Couldn't parse severity. It's supposed to be a number between 1 and 5.");
        return true;
    };
    let components = split_components(inv.arg(1));
    let mut incident = match Incident::new(severity, &components) {
        Ok(incident) => incident,
        Err(err) => {
            inv.reply(&format!("Invalid parameters: {err}"));
            return true;
        }
    };
    if let Err(err) = inv.env.store.save_incident(&mut incident) {
        error!(operation = "incident_start", error = %err, "failed to save incident");
        inv.reply(SAVE_FAILED);
        return true;
    }
    info!(incident_id = incident.id(), sender = %inv.sender(), "incident started");

    create_document(inv, &mut incident);
    sync_topics(inv);
    inv.reply(&format!("Incident saved: {}", incident.summarize(extended(inv))));
    true
}

/// Document creation failures are reported and the incident stays as saved.
fn create_document(inv: &Invocation<'_>, incident: &mut Incident) {
    let config = &inv.env.config.documents;
    let Some(provider) = inv.env.documents.as_ref().filter(|_| config.enabled()) else {
        return;
    };
    let title = format!(
        "Incident #{}: {} {}",
        incident.id(),
        incident.components().join(", "),
        incident.started_at().format("%Y-%m-%d")
    );
    let mut document = provider.blank();
    if let Err(err) = document.create_from_template(&title, config) {
        warn!(incident_id = incident.id(), error = %err, "failed to create incident document");
        inv.reply("Could not create the incident document, check the logs.");
        return;
    }
    incident.attach_document(document);
    if let Err(err) = inv.env.store.save_incident(incident) {
        error!(incident_id = incident.id(), error = %err, "failed to link incident document");
        inv.reply(SAVE_FAILED);
    }
}

fn update_incident(inv: &Invocation<'_>) -> bool {
    let Some(mut incident) = load_incident(inv) else {
        return true;
    };
    attach_document(inv.env, &mut incident);
    let reopened = incident.reopen();
    match inv.arg(1) {
        "severity" => {
            let Ok(severity) = inv.arg(2).trim().parse::<i64>() else {
                inv.reply("Couldn't parse severity. It's supposed to be a number between 1 and 5.");
                return true;
            };
            if let Err(err) = incident.set_severity(severity) {
                inv.reply(&format!("Invalid parameters: {err}"));
                return true;
            }
        }
        _ => incident.append_description(inv.arg(2), Utc::now()),
    }
    if let Err(err) = inv.env.store.save_incident(&mut incident) {
        error!(incident_id = incident.id(), operation = "incident_update", error = %err, "failed to save incident");
        inv.reply(SAVE_FAILED);
        return true;
    }
    if reopened {
        inv.reply(&format!(
            "Incident #{} was closed and has been reopened.",
            incident.id()
        ));
    }
    sync_topics(inv);
    inv.reply(&format!("Incident updated: {}", incident.summarize(extended(inv))));
    true
}

fn close_incident(inv: &Invocation<'_>) -> bool {
    let Some(mut incident) = load_incident(inv) else {
        return true;
    };
    if let Err(err) = incident.close() {
        info!(incident_id = incident.id(), "close of a closed incident");
        inv.reply(&err.to_string());
        return true;
    }
    if let Err(err) = inv.env.store.save_incident(&mut incident) {
        error!(incident_id = incident.id(), operation = "incident_close", error = %err, "failed to save incident");
        inv.reply("Could not close the incident, see logs for details.");
        return true;
    }
    sync_topics(inv);
    inv.reply(&format!("Incident closed: {}", incident.id()));
    true
}

fn list_incidents(inv: &Invocation<'_>) -> bool {
    let mut incidents = match inv.env.store.open_incidents() {
        Ok(incidents) => incidents,
        Err(err) => {
            error!(operation = "incidents", error = %err, "failed to load open incidents");
            inv.reply("Could not load the open incidents, check the logs.");
            return true;
        }
    };
    if incidents.is_empty() {
        inv.reply("No open incidents.");
        return true;
    }
    attach_documents(inv.env, &mut incidents);
    let extended = extended(inv);
    for incident in &incidents {
        inv.reply(&incident.summarize(extended));
    }
    true
}

fn incident_details(inv: &Invocation<'_>) -> bool {
    let Some(mut incident) = load_incident(inv) else {
        return true;
    };
    attach_document(inv.env, &mut incident);
    for line in incident.details(extended(inv)) {
        inv.reply(&line);
    }
    true
}

/// Loads the incident named by the first argument, replying on failure.
fn load_incident(inv: &Invocation<'_>) -> Option<Incident> {
    let Ok(id) = inv.arg(0).parse::<i64>() else {
        inv.reply("Couldn't parse the incident id.");
        return None;
    };
    match inv.env.store.get_incident(id) {
        Ok(Some(incident)) => Some(incident),
        Ok(None) => {
            info!(incident_id = id, "incident not found");
            inv.reply(NOT_FOUND);
            None
        }
        Err(err) => {
            error!(incident_id = id, error = %err, "failed to load incident");
            inv.reply(LOAD_FAILED);
            None
        }
    }
}

/// Per-channel topic failures are reported to the issuer privately.
fn sync_topics(inv: &Invocation<'_>) {
    let sender = inv.sender();
    let synchronizer = TopicSynchronizer::new(inv.env, inv.transport).on_behalf_of(sender);
    match synchronizer.sync_all() {
        Ok(report) => {
            for failure in &report.failures {
                inv.notify_sender(&failure.notice());
            }
        }
        Err(err) => {
            error!(error = %err, "topic sync aborted");
            inv.notify_sender("Could not update the channel topics, check the logs.");
        }
    }
}
