use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::acl::AclError;
use crate::command::{Command, Invocation, Visibility};
use crate::pattern::{ArgSpec, PatternError};

pub const SING_INTERVAL: Duration = Duration::from_millis(800);

const LYRICS: [&str; 6] = [
    "Never gonna give you up",
    "Never gonna let you down",
    "Never gonna run around and desert you",
    "Never gonna make you cry",
    "Never gonna say goodbye",
    "Never gonna tell a lie and hurt you",
];

const ACL_ARGS: [ArgSpec; 2] = [
    ArgSpec::named("command", r"\S+"),
    ArgSpec::named("nick_or_chan", r"\S+"),
];

/// Chat commands that ship with every bot.
pub fn builtin_commands() -> Result<Vec<Command>, PatternError> {
    Ok(vec![
        sing(SING_INTERVAL)?,
        Command::new(
            "acl_add",
            &ACL_ARGS,
            "Adds the ability for a command to be used by a single user or in a channel",
            Visibility::PRIVATE,
            acl_add,
        )?,
        Command::new(
            "acl_remove",
            &ACL_ARGS,
            "Removes a user from the ACL",
            Visibility::PRIVATE,
            acl_remove,
        )?,
        Command::new(
            "acl_get",
            &[ArgSpec::named("command", r"\S+")],
            "Gets the defined ACLs for a command",
            Visibility::PRIVATE,
            acl_get,
        )?,
        Command::new(
            "change_pass",
            &[ArgSpec::named("password", r"\S+")],
            "Changes the nickserv password",
            Visibility::PRIVATE,
            change_pass,
        )?,
    ])
}

pub fn sing(interval: Duration) -> Result<Command, PatternError> {
    Command::new(
        "sing",
        &[],
        "Sings for you a nice tune",
        Visibility::PUBLIC,
        move |inv: &Invocation<'_>| {
            for line in LYRICS {
                inv.reply(line);
                thread::sleep(interval);
            }
            true
        },
    )
}

fn acl_add(inv: &Invocation<'_>) -> bool {
    let (command, identifier) = (inv.arg(0), inv.arg(1));
    match inv.env.acl.add(command, identifier) {
        Ok(()) => {
            inv.reply("The ACL was saved.");
            true
        }
        Err(AclError::AlreadyExists { .. }) => {
            inv.reply("This ACL is already present.");
            false
        }
        Err(err) => {
            error!(command, identifier, error = %err, "failed to save acl");
            inv.reply("Couldn't save the new ACL.");
            false
        }
    }
}

fn acl_remove(inv: &Invocation<'_>) -> bool {
    let (command, identifier) = (inv.arg(0), inv.arg(1));
    match inv.env.acl.remove(command, identifier) {
        Ok(()) => {
            inv.reply("The ACL was successfully removed.");
            true
        }
        Err(AclError::NotFound { .. }) => {
            info!(command, identifier, "acl entry not present");
            inv.reply("This ACL is not present.");
            false
        }
        Err(err) => {
            error!(command, identifier, error = %err, "failed to remove acl");
            inv.reply("Couldn't remove the ACL.");
            false
        }
    }
}

fn acl_get(inv: &Invocation<'_>) -> bool {
    let command = inv.arg(0);
    let listing = match inv.env.acl.list(command) {
        Ok(listing) => listing,
        Err(err) => {
            error!(command, error = %err, "failed to read acl");
            inv.reply("Could not fetch the requested ACL, check the logs.");
            return true;
        }
    };
    inv.reply(&format!("ACL for {command}"));
    inv.reply("Users:");
    for handle in &listing.handles {
        inv.reply(&format!("\t{handle}"));
    }
    inv.reply("Channels:");
    for channel in &listing.channels {
        inv.reply(&format!("\t{channel}"));
    }
    true
}

fn change_pass(inv: &Invocation<'_>) -> bool {
    let password = inv.arg(0);
    if let Err(err) = inv
        .transport
        .privmsg("NickServ", &format!("SET PASSWORD {password}"))
    {
        warn!(error = %err, "failed to reach NickServ");
        inv.reply("Couldn't reach NickServ, the password was not changed.");
        return false;
    }
    info!(sender = %inv.sender(), "nickserv password changed");
    inv.reply("Password changed. Do not forget to change the configuration too.");
    false
}
