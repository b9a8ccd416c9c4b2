//! Zero-argument handlers used by templating markers.

use super::table::Informer;
use crate::account::ConstructionTarget;
use crate::config::ServerConfig;

/// Handlers registered by [`HandlerTable::builtin`](super::HandlerTable::builtin).
pub const CATALOG: &[(&str, Informer)] = &[
    ("getServerName", server_name),
    ("getAdminEmail", admin_email),
    ("getAccountSummary", account_summary),
];

fn server_name(config: &ServerConfig, _: &ConstructionTarget) -> Option<String> {
    Some(config.symbolic_name.clone())
}

fn admin_email(config: &ServerConfig, _: &ConstructionTarget) -> Option<String> {
    Some(config.admin_email.clone())
}

/// Summary shown on the confirmation step. `None` until a character
/// exists.
fn account_summary(_: &ServerConfig, target: &ConstructionTarget) -> Option<String> {
    let character = target.character()?;
    let name = target.profile.player_name.as_deref().unwrap_or("");
    let rank = character.rank.as_deref().unwrap_or("unknown");
    Some(format!(
        "Player Name : {}\nPlayer Class : {} ({})\nPlayer Rank : {}",
        name,
        character.class,
        character.community_name(),
        rank
    ))
}
