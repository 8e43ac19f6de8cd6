//! Admin text commands
//!
//! Parses `/command` messages and maps each one onto a single policy
//! operation. Permission checks (platform-admin only) happen in the
//! daemon before `execute` is called.

use std::fmt::Write;

use tokio::sync::Mutex;

use crate::policy::{ChatId, PolicyState, UserId};

/// A parsed administrative command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Show current ledger records for the chat
    Status,
    /// Audit report of users seen within the trailing default window
    CheckDuplicates,
    /// Remove a user's ledger record
    Reset(UserId),
    /// Add a user to the custom-admin list
    AddAdmin(UserId),
    /// Remove a user from the custom-admin list
    RemoveAdmin(UserId),
    /// List custom admins
    ListAdmins,
    /// Set a per-user cooldown override (0 = unlimited)
    SetCooldown(UserId, u64),
    /// Remove a per-user cooldown override
    ResetCooldown(UserId),
    /// List cooldown overrides
    ListCooldowns,
    /// Show the command reference
    Help,
}

/// Parse a message text as an admin command
///
/// Returns `None` when the text is not a command addressed to us
/// (including unknown commands, which may belong to another bot in the
/// chat). A known command with malformed arguments yields `Err` with a
/// usage string to reply with.
#[must_use]
pub fn parse(text: &str) -> Option<Result<AdminCommand, String>> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    if !head.starts_with('/') {
        return None;
    }
    // strip the optional @BotName suffix used in groups
    let name = head[1..].split('@').next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let user_arg = |usage: &str| -> Result<UserId, String> {
        args.first()
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| format!("Usage: {usage}"))
    };

    let cmd = match name {
        "status" => Ok(AdminCommand::Status),
        "check_duplicates" => Ok(AdminCommand::CheckDuplicates),
        "reset" => user_arg("/reset <user_id>").map(AdminCommand::Reset),
        "addadmin" => user_arg("/addadmin <user_id>").map(AdminCommand::AddAdmin),
        "removeadmin" => user_arg("/removeadmin <user_id>").map(AdminCommand::RemoveAdmin),
        "listadmins" => Ok(AdminCommand::ListAdmins),
        "setcooldown" => {
            let usage = "Usage: /setcooldown <user_id> <seconds>";
            match (
                args.first().and_then(|a| a.parse::<UserId>().ok()),
                args.get(1).and_then(|a| a.parse::<u64>().ok()),
            ) {
                (Some(user), Some(secs)) => Ok(AdminCommand::SetCooldown(user, secs)),
                _ => Err(usage.to_string()),
            }
        }
        "resetcooldown" => user_arg("/resetcooldown <user_id>").map(AdminCommand::ResetCooldown),
        "listcooldowns" => Ok(AdminCommand::ListCooldowns),
        "help" => Ok(AdminCommand::Help),
        _ => return None,
    };
    Some(cmd)
}

/// Execute a command against the shared policy state, returning the
/// reply text
///
/// Persistence failures never fail the command: the in-memory change
/// stands and the reply carries a durability note.
pub async fn execute(
    cmd: AdminCommand,
    chat: ChatId,
    state: &Mutex<PolicyState>,
    default_cooldown: u64,
    now: i64,
) -> String {
    let mut state = state.lock().await;
    match cmd {
        AdminCommand::Status => {
            let snapshot = state.ledger.snapshot(chat);
            if snapshot.is_empty() {
                return "No messages recorded.".to_string();
            }
            let mut out = String::from("Message records:\n");
            for (user, ts) in &snapshot {
                let ago = format_hm(now.saturating_sub(*ts).unsigned_abs());
                let _ = writeln!(out, "- user {user}: {ago} ago");
            }
            let _ = write!(out, "Total: {} users", snapshot.len());
            out
        }
        AdminCommand::CheckDuplicates => {
            let recent = state.ledger.recent_activity(chat, default_cooldown, now);
            if recent.is_empty() {
                return "No users posted within the current window.".to_string();
            }
            let mut out = String::from("Users seen within the current window:\n");
            for (user, ts) in recent {
                let ago = format_hm(now.saturating_sub(ts).unsigned_abs());
                let _ = writeln!(out, "- user {user}: {ago} ago");
            }
            out.truncate(out.trim_end().len());
            out
        }
        AdminCommand::Reset(user) => match state.ledger.reset_user(chat, user) {
            Ok(true) => format!("Reset cooldown for user {user}."),
            Ok(false) => format!("User {user} has no record."),
            Err(e) => durability_note(format!("Reset cooldown for user {user}."), &e),
        },
        AdminCommand::AddAdmin(user) => match state.overlays.add_custom_admin(chat, user) {
            Ok(true) => format!("User {user} added as custom admin."),
            Ok(false) => format!("User {user} is already a custom admin."),
            Err(e) => durability_note(format!("User {user} added as custom admin."), &e),
        },
        AdminCommand::RemoveAdmin(user) => match state.overlays.remove_custom_admin(chat, user) {
            Ok(true) => format!("User {user} removed from custom admins."),
            Ok(false) => format!("User {user} is not a custom admin."),
            Err(e) => durability_note(format!("User {user} removed from custom admins."), &e),
        },
        AdminCommand::ListAdmins => {
            let admins = state.overlays.list_custom_admins(chat);
            if admins.is_empty() {
                return "No custom admins.".to_string();
            }
            let list: Vec<String> = admins.iter().map(|u| format!("- {u}")).collect();
            format!("Custom admins:\n{}", list.join("\n"))
        }
        AdminCommand::SetCooldown(user, secs) => {
            let outcome = state.overlays.set_cooldown(chat, user, secs);
            let base = if secs == 0 {
                format!("User {user} now has unlimited messaging (green card).")
            } else {
                format!("Cooldown for user {user} set to {}.", format_hm(secs))
            };
            match outcome {
                Ok(()) => base,
                Err(e) => durability_note(base, &e),
            }
        }
        AdminCommand::ResetCooldown(user) => match state.overlays.reset_cooldown(chat, user) {
            Ok(true) => format!(
                "Cooldown for user {user} reverted to the default ({}).",
                format_hm(default_cooldown)
            ),
            Ok(false) => format!("User {user} has no cooldown override."),
            Err(e) => durability_note(format!("Cooldown for user {user} reverted."), &e),
        },
        AdminCommand::ListCooldowns => {
            let overrides = state.overlays.list_cooldowns(chat);
            if overrides.is_empty() {
                return "No cooldown overrides.".to_string();
            }
            let mut out = String::from("Cooldown overrides:\n");
            for (user, secs) in overrides {
                if secs == 0 {
                    let _ = writeln!(out, "- user {user}: unlimited");
                } else {
                    let _ = writeln!(out, "- user {user}: {}", format_hm(secs));
                }
            }
            out.truncate(out.trim_end().len());
            out
        }
        AdminCommand::Help => HELP_TEXT.to_string(),
    }
}

/// Command reference shown by /help
pub const HELP_TEXT: &str = "\
Topic Warden: one message per user per cooldown window.

Admin commands:
/status - current message records
/check_duplicates - users seen within the current window
/reset <user_id> - clear a user's record
/addadmin <user_id> - exempt a user permanently
/removeadmin <user_id> - revoke a custom admin
/listadmins - list custom admins
/setcooldown <user_id> <seconds> - per-user cooldown (0 = unlimited)
/resetcooldown <user_id> - revert to the default cooldown
/listcooldowns - list cooldown overrides
/help - this message";

/// Render a duration as `XhYm` / `Xm` / `Xs`
#[must_use]
pub fn format_hm(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

fn durability_note(base: String, e: &crate::Error) -> String {
    tracing::warn!(error = %e, "command applied but state write failed");
    format!("{base} (warning: state write failed, change may not survive a restart)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("/status"), Some(Ok(AdminCommand::Status)));
        assert_eq!(parse("/help"), Some(Ok(AdminCommand::Help)));
        assert_eq!(
            parse("/check_duplicates"),
            Some(Ok(AdminCommand::CheckDuplicates))
        );
    }

    #[test]
    fn parses_bot_suffix_and_args() {
        assert_eq!(
            parse("/reset@TopicWardenBot 12345"),
            Some(Ok(AdminCommand::Reset(12345)))
        );
        assert_eq!(
            parse("/setcooldown 42 60"),
            Some(Ok(AdminCommand::SetCooldown(42, 60)))
        );
    }

    #[test]
    fn malformed_args_yield_usage() {
        assert!(matches!(parse("/reset"), Some(Err(_))));
        assert!(matches!(parse("/setcooldown 42"), Some(Err(_))));
        assert!(matches!(parse("/setcooldown abc 60"), Some(Err(_))));
    }

    #[test]
    fn non_commands_and_unknown_commands_are_ignored() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("/unknowncmd"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_hm(86_400), "24h 0m");
        assert_eq!(format_hm(3_661), "1h 1m");
        assert_eq!(format_hm(120), "2m");
        assert_eq!(format_hm(59), "59s");
        assert_eq!(format_hm(0), "0s");
    }
}
