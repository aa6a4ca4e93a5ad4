//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending messages to the
//! companion.

use crate::types::PersonaField;

/// A parsed chat command.
///
/// These commands control the session and are not sent as chat messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Log in as the given email; the password is prompted for.
    Login(String),

    /// Register the given email; the password is prompted for.
    Register(String),

    /// Toggle between the login and registration forms.
    Switch,

    /// Log out and forget the stored session.
    Logout,

    /// Reload the conversation from the server.
    History,

    /// Reload and show the companion persona.
    Persona,

    /// Open the persona settings form.
    Settings,

    /// Change one field of the settings form.
    Edit(PersonaField, String),

    /// Save the settings form.
    Save,

    /// Close the settings form without saving.
    Cancel,

    /// Show who is logged in.
    WhoAmI,

    /// Query the backend health endpoint.
    Health,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use companion::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/login me@example.com").is_some());
/// assert!(parse_command("Hello, Alex!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "login" => match argument {
            Some(email) => ChatCommand::Login(email.to_string()),
            None => ChatCommand::Invalid("/login requires an email".to_string()),
        },
        "register" => match argument {
            Some(email) => ChatCommand::Register(email.to_string()),
            None => ChatCommand::Invalid("/register requires an email".to_string()),
        },
        "switch" => ChatCommand::Switch,
        "logout" => ChatCommand::Logout,
        "history" => ChatCommand::History,
        "persona" => ChatCommand::Persona,
        "settings" => ChatCommand::Settings,
        "name" | "relationship" | "personality" => parse_edit_command(&command, argument),
        "save" => ChatCommand::Save,
        "cancel" => ChatCommand::Cancel,
        "whoami" => ChatCommand::WhoAmI,
        "health" => ChatCommand::Health,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_edit_command(command: &str, argument: Option<&str>) -> ChatCommand {
    let field = match command.parse::<PersonaField>() {
        Ok(field) => field,
        Err(err) => return ChatCommand::Invalid(err),
    };
    match argument {
        Some(value) if value.chars().count() > field.max_len() => ChatCommand::Invalid(format!(
            "/{field} must be at most {} characters",
            field.max_len()
        )),
        Some(value) => ChatCommand::Edit(field, value.to_string()),
        None => ChatCommand::Invalid(format!("/{field} requires a value")),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /login <email>         Log in (the password is prompted for)
  /register <email>      Create an account (the password is prompted for)
  /switch                Toggle between the login and registration forms
  /logout                Log out and forget the stored session
  /history               Reload the conversation from the server
  /persona               Show the companion persona
  /settings              Edit the companion persona
  /name <value>          Set the companion's name (max 50 characters)
  /relationship <value>  Set the relationship (max 100 characters)
  /personality <value>   Set the personality (max 500 characters)
  /save                  Save the persona settings
  /cancel                Close the persona settings without saving
  /whoami                Show who is logged in
  /health                Check the backend
  /help                  Show this help message
  /quit                  Exit the chat

Anything else is sent to your companion.  Ctrl-C abandons a pending reply."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_auth_commands() {
        assert_eq!(
            parse_command("/login   a@b.com "),
            Some(ChatCommand::Login("a@b.com".to_string()))
        );
        assert_eq!(
            parse_command("/REGISTER a@b.com"),
            Some(ChatCommand::Register("a@b.com".to_string()))
        );
        assert_eq!(
            parse_command("/login"),
            Some(ChatCommand::Invalid("/login requires an email".to_string()))
        );
        assert_eq!(parse_command("/switch"), Some(ChatCommand::Switch));
        assert_eq!(parse_command("/logout"), Some(ChatCommand::Logout));
        assert_eq!(parse_command("/whoami"), Some(ChatCommand::WhoAmI));
    }

    #[test]
    fn parse_persona_edits() {
        assert_eq!(
            parse_command("/name Nova"),
            Some(ChatCommand::Edit(PersonaField::Name, "Nova".to_string()))
        );
        assert_eq!(
            parse_command("/personality Calm and curious."),
            Some(ChatCommand::Edit(
                PersonaField::Personality,
                "Calm and curious.".to_string()
            ))
        );
        assert_eq!(
            parse_command("/relationship"),
            Some(ChatCommand::Invalid(
                "/relationship requires a value".to_string()
            ))
        );
        let long = format!("/name {}", "x".repeat(51));
        assert_eq!(
            parse_command(&long),
            Some(ChatCommand::Invalid(
                "/name must be at most 50 characters".to_string()
            ))
        );
    }

    #[test]
    fn parse_settings_flow() {
        assert_eq!(parse_command("/settings"), Some(ChatCommand::Settings));
        assert_eq!(parse_command("/save"), Some(ChatCommand::Save));
        assert_eq!(parse_command("/cancel"), Some(ChatCommand::Cancel));
        assert_eq!(parse_command("/persona"), Some(ChatCommand::Persona));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model x"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert!(parse_command("Hello there").is_none());
        assert!(parse_command("").is_none());
        assert!(parse_command("  not a /command").is_none());
    }

    #[test]
    fn help_text_not_empty() {
        assert!(help_text().contains("/login"));
        assert!(help_text().contains("/settings"));
    }
}
