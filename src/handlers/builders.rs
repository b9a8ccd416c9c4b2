//! Mutating handlers applied to the account under construction.
//!
//! Every handler validates the raw client value before touching the
//! target. A rejected value leaves the target unchanged and produces a
//! message the player sees next to the step.

use regex::Regex;
use std::sync::LazyLock;

use super::table::{BuildError, Mutator};
use crate::account::{Character, CharacterClass, ConstructionTarget, CLOAK_COLORS, HAIR_COLORS};
use crate::config::ServerConfig;

/// Handlers registered by [`HandlerTable::builtin`](super::HandlerTable::builtin).
pub const CATALOG: &[(&str, Mutator)] = &[
    ("setLogin", set_login),
    ("setPassword", set_password),
    ("setEmail", set_email),
    ("setPlayerName", set_player_name),
    ("setFullPlayerName", set_full_player_name),
    ("setPlayerPast", set_player_past),
    ("setPlayerPastOption", set_player_past_option),
    ("setWotCharacterClass", set_character_class),
    ("setWotCharacterRank", set_character_rank),
    ("setHairColor", set_hair_color),
    ("setCloakColor", set_cloak_color),
    ("setSpecialCharacter", set_special_character),
];

static LOGIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{3,20}$").expect("LOGIN_REGEX must compile")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("EMAIL_REGEX must compile")
});

const MAX_PLAYER_NAME: usize = 30;
const MIN_FULL_NAME: usize = 5;
const MAX_FULL_NAME: usize = 30;
const MAX_PAST: usize = 2000;
const MIN_PASSWORD: usize = 4;
const MAX_PASSWORD: usize = 64;
const MAX_EMAIL: usize = 100;

/// Class choices that only route the wizard and set nothing.
const ROUTING_CLASSES: &[&str] = &["Darkfriend", "Special Characters"];

fn set_login(_: &ServerConfig, target: &mut ConstructionTarget, data: &str) -> Result<(), BuildError> {
    let login = data.trim();
    if !LOGIN_REGEX.is_match(login) {
        return Err(BuildError::rejected(
            "Your login should have 3 to 20 letters, digits, '-' or '_' !",
        ));
    }
    target.login = Some(login.to_string());
    Ok(())
}

fn set_password(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let len = data.chars().count();
    if data.trim().is_empty() || !(MIN_PASSWORD..=MAX_PASSWORD).contains(&len) {
        return Err(BuildError::rejected(format!(
            "Your password should have {} to {} characters !",
            MIN_PASSWORD, MAX_PASSWORD
        )));
    }
    target.password = Some(data.to_string());
    Ok(())
}

fn set_email(_: &ServerConfig, target: &mut ConstructionTarget, data: &str) -> Result<(), BuildError> {
    let email = data.trim();
    if email.len() > MAX_EMAIL || !EMAIL_REGEX.is_match(email) {
        return Err(BuildError::rejected("Invalid email address !"));
    }
    target.email = Some(email.to_string());
    Ok(())
}

fn set_player_name(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let name = data.trim();
    if name.is_empty() {
        return Err(BuildError::rejected("Please enter a nickname !"));
    }
    if name.chars().count() > MAX_PLAYER_NAME {
        return Err(BuildError::rejected(
            "Your nickname should have less than 30 letters !",
        ));
    }
    target.profile.player_name = Some(name.to_string());
    Ok(())
}

fn set_full_player_name(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let name = data.trim();
    let len = name.chars().count();
    if len < MIN_FULL_NAME {
        return Err(BuildError::rejected(
            "Your full name should have at least 5 letters !",
        ));
    }
    if len > MAX_FULL_NAME {
        return Err(BuildError::rejected(
            "Your full name should have less than 30 letters !",
        ));
    }
    target.profile.full_player_name = Some(name.to_string());
    Ok(())
}

fn set_player_past(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    if data.chars().count() > MAX_PAST {
        return Err(BuildError::rejected(
            "Your past should have less than 2000 letters !",
        ));
    }
    target.profile.player_past = Some(data.to_string());
    Ok(())
}

/// `"true"` means the player will write the past later.
fn set_player_past_option(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    if data == "true" {
        target.profile.player_past = Some(String::new());
    }
    Ok(())
}

fn set_character_class(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    if ROUTING_CLASSES.contains(&data) {
        return Ok(());
    }
    let class = CharacterClass::from_display_name(data)
        .ok_or_else(|| BuildError::rejected("Unknown character class !"))?;
    target.profile.character = Some(Character::new(class));
    Ok(())
}

fn set_character_rank(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let character = target
        .character_mut()
        .ok_or_else(|| BuildError::rejected("No character created !"))?;
    if !character.class.has_rank(data) {
        return Err(BuildError::rejected(
            "Unknown rank for this character class !",
        ));
    }
    character.rank = Some(data.to_string());
    Ok(())
}

fn set_hair_color(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let character = target
        .character_mut()
        .ok_or_else(|| BuildError::rejected("No character created !"))?;
    if !character.class.is_human() {
        return Err(BuildError::rejected("Your character is not Human !"));
    }
    if !HAIR_COLORS.contains(&data) {
        return Err(BuildError::rejected("Unknown hair color !"));
    }
    character.hair_color = Some(data.to_string());
    Ok(())
}

fn set_cloak_color(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let character = target
        .character_mut()
        .ok_or_else(|| BuildError::rejected("No character created !"))?;
    if character.class != CharacterClass::Warder {
        return Err(BuildError::rejected("Your character is not a Warder !"));
    }
    if !character.can_wear_cloak() || !CLOAK_COLORS.contains(&data) {
        return Err(BuildError::rejected(format!(
            "Failed to set cloak color : {}",
            data
        )));
    }
    character.cloak_color = Some(data.to_string());
    Ok(())
}

fn set_special_character(
    config: &ServerConfig,
    target: &mut ConstructionTarget,
    data: &str,
) -> Result<(), BuildError> {
    let keys = &config.special_keys;
    let matches = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.is_empty() && k == data);

    if matches(&keys.shaitan) {
        target.profile.character = Some(Character::with_rank(
            CharacterClass::DarkOne,
            "Great Lord of the Dark",
        ));
        target.profile.player_name = Some("Great Lord Of the Dark".to_string());
        target.profile.full_player_name = Some("Shai'tan".to_string());
        target.profile.player_past = Some("SERVE ME OR DIE !".to_string());
    } else if matches(&keys.amyrlin) {
        target.profile.character = Some(Character::with_rank(CharacterClass::AesSedai, "Amyrlin"));
    } else if matches(&keys.chronicles) {
        target.profile.character = Some(Character::with_rank(
            CharacterClass::AesSedai,
            "Keeper of the Chronicles",
        ));
    } else if matches(&keys.mhael) {
        target.profile.character = Some(Character::with_rank(CharacterClass::Ashaman, "M'Hael"));
    } else {
        return Err(BuildError::rejected("Wrong Special Character Key !"));
    }
    Ok(())
}
