//! On-call contact book, reachable in private only.

use tracing::{error, info};
use vigil_core::Contact;
use vigil_triggers::{ArgSpec, Command, Invocation, PatternError, Visibility};

const NOT_FOUND: &str = "Couldn't find the contact you searched for";

pub fn contact_commands() -> Result<Vec<Command>, PatternError> {
    let name = ArgSpec::named("name", r"\w+");
    Ok(vec![
        Command::new(
            "contact_add",
            &[
                name,
                ArgSpec::named("intl_phone", r"\+\d{5,15}"),
                ArgSpec::named("email", r"[^@\s]+@[^@\s]+"),
            ],
            "Add a contact (privmsg only)",
            Visibility::PRIVATE,
            add_contact,
        )?,
        Command::new(
            "contact_get",
            &[name],
            "Gets information about a contact (privmsg only)",
            Visibility::PRIVATE,
            get_contact,
        )?,
        Command::new(
            "contact_remove",
            &[name],
            "Removes a contact (privmsg only)",
            Visibility::PRIVATE,
            remove_contact,
        )?,
    ])
}

fn add_contact(inv: &Invocation<'_>) -> bool {
    let contact = Contact::new(inv.arg(0), inv.arg(1), inv.arg(2));
    match inv.env.store.save_contact(&contact) {
        Ok(()) => {
            info!(contact = %contact.name, sender = %inv.sender(), "contact saved");
            inv.reply("Contact added successfully.");
        }
        Err(err) => {
            error!(contact = %contact.name, error = %err, "failed to save contact");
            inv.reply("Trouble saving the contact, please try again later.");
        }
    }
    true
}

fn get_contact(inv: &Invocation<'_>) -> bool {
    let name = inv.arg(0);
    match inv.env.store.get_contact(name) {
        Ok(Some(contact)) if contact.phone.is_empty() => inv.reply("No phone data for the contact"),
        Ok(Some(contact)) => inv.reply(&contact.pretty()),
        Ok(None) => {
            info!(contact = name, "contact not found");
            inv.reply(NOT_FOUND);
        }
        Err(err) => {
            error!(contact = name, error = %err, "failed to load contact");
            inv.reply("Couldn't load the contact, check logs for the error.");
        }
    }
    true
}

fn remove_contact(inv: &Invocation<'_>) -> bool {
    let name = inv.arg(0);
    match inv.env.store.remove_contact(name) {
        Ok(true) => {
            info!(contact = name, sender = %inv.sender(), "contact removed");
            inv.reply("Contact successfully removed.");
        }
        Ok(false) => {
            info!(contact = name, "contact not found");
            inv.reply(NOT_FOUND);
        }
        Err(err) => {
            error!(contact = name, error = %err, "failed to remove contact");
            inv.reply("Couldn't remove contact, check logs for the error.");
        }
    }
    true
}
