use anyhow::{anyhow, Result};

use crate::game::Gender;

pub const MAX_NAME_LENGTH: usize = 20;
pub const MAX_COMMAND_LENGTH: usize = 1000;
pub const MAX_TOKEN_LENGTH: usize = 64;

pub fn validate_player_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("The name is empty"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(anyhow!("The name is too long (max {} characters)", MAX_NAME_LENGTH));
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(anyhow!("The name cannot contain line breaks"));
    }

    Ok(name.to_string())
}

pub fn validate_command_text(text: &str) -> Result<String> {
    let text = text.trim();

    if text.is_empty() {
        return Err(anyhow!("The command is empty"));
    }

    if text.chars().count() > MAX_COMMAND_LENGTH {
        return Err(anyhow!("The command is too long (max {} characters)", MAX_COMMAND_LENGTH));
    }

    Ok(text.to_string())
}

/// Session tokens look like `<unix time>-<number>`.
pub fn validate_session_token(token: &str) -> Result<String> {
    let token = token.trim();

    if token.is_empty() {
        return Err(anyhow!("Incorrect game id"));
    }

    if token.len() > MAX_TOKEN_LENGTH {
        return Err(anyhow!("Game id is too long"));
    }

    if !token.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return Err(anyhow!("Game id can only contain digits and '-'"));
    }

    Ok(token.to_string())
}

/// Gender codes of the web join form: g(irl), b(oy), a(ll), n(one).
pub fn parse_web_gender_code(code: &str) -> Result<Gender> {
    match code.trim() {
        "g" => Ok(Gender::FEMALE),
        "b" => Ok(Gender::MALE),
        "a" => Ok(Gender::BOTH),
        "n" => Ok(Gender::NONE),
        _ => Err(anyhow!("Incorrect gender code")),
    }
}

/// Gender argument of the `/gender` bot command.
pub fn parse_gender_name(value: &str) -> Result<Gender> {
    match value.trim().to_lowercase().as_str() {
        "f" | "female" => Ok(Gender::FEMALE),
        "m" | "male" => Ok(Gender::MALE),
        "b" | "both" => Ok(Gender::BOTH),
        "n" | "none" => Ok(Gender::NONE),
        _ => Err(anyhow!("Use one of: female, male, both, none")),
    }
}

pub fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::FEMALE => "female",
        Gender::MALE => "male",
        Gender::BOTH => "both",
        _ => "none",
    }
}
