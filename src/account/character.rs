//! Character classes, ranks, and cosmetic catalogs.
//!
//! Every player picks one [`CharacterClass`]. A class owns a fixed list of
//! ranks; the player may choose one of them through the wizard, except for
//! the top ranks, which only special-character keys grant. Humans also
//! carry a hair colour, and Warders of high enough rank a cloak colour.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hair colours a human character may have.
pub const HAIR_COLORS: &[&str] = &["bald", "golden", "brown", "black", "gray", "white", "reddish"];

/// Cloak colours a Warder may wear.
pub const CLOAK_COLORS: &[&str] = &["gray", "blue", "yellow", "red", "green", "brown", "black"];

/// Warder ranks allowed to choose a cloak colour.
pub const CLOAK_RANKS: &[&str] = &["Warder", "Blade Master"];

/// The communities a character can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    AesSedai,
    Warder,
    ChildrenOfTheLight,
    WolfBrother,
    Ashaman,
    Aiel,
    DarkOne,
}

impl CharacterClass {
    /// Classes a player can pick from the class selection step.
    pub const SELECTABLE: &'static [CharacterClass] = &[
        Self::AesSedai,
        Self::Warder,
        Self::ChildrenOfTheLight,
        Self::WolfBrother,
        Self::Ashaman,
        Self::Aiel,
    ];

    /// Look up a selectable class by the name shown to players.
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::SELECTABLE
            .iter()
            .copied()
            .find(|class| class.display_name() == name)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AesSedai => "Aes Sedai",
            Self::Warder => "Warder",
            Self::ChildrenOfTheLight => "Children of the Light",
            Self::WolfBrother => "Wolf Brother",
            Self::Ashaman => "Asha'man",
            Self::Aiel => "Aiel",
            Self::DarkOne => "Dark One",
        }
    }

    /// All ranks of the class, lowest first.
    pub fn ranks(&self) -> &'static [&'static str] {
        match self {
            Self::AesSedai => &[
                "Stilled",
                "Novice",
                "Accepted",
                "Blue Ajah",
                "Green Ajah",
                "Yellow Ajah",
                "Red Ajah",
                "Brown Ajah",
                "White Ajah",
                "Gray Ajah",
                "Keeper of the Chronicles",
                "Amyrlin",
                "Black Ajah",
            ],
            Self::Warder => &["Youngling", "Tower Guard", "Warder", "Blade Master"],
            Self::ChildrenOfTheLight => &["Soldier of the Light"],
            Self::WolfBrother => &["Wolf Friend"],
            Self::Ashaman => &["Soldier", "Dedicated", "Asha'man", "M'Hael"],
            Self::Aiel => &["Aiel Warrior"],
            Self::DarkOne => &["Great Lord of the Dark"],
        }
    }

    pub fn has_rank(&self, rank: &str) -> bool {
        self.ranks().contains(&rank)
    }

    /// Whether characters of this class have a human appearance.
    pub fn is_human(&self) -> bool {
        !matches!(self, Self::DarkOne)
    }

    /// Name of the community the character belongs to, which for
    /// Warders depends on their rank.
    pub fn community_name(&self, rank: Option<&str>) -> &'static str {
        match (self, rank) {
            (Self::Warder, Some("Tower Guard")) => "Tar Valon Army",
            _ => self.display_name(),
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A chosen character class with its per-class attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub class: CharacterClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloak_color: Option<String>,
}

impl Character {
    pub fn new(class: CharacterClass) -> Self {
        Self {
            class,
            rank: None,
            hair_color: None,
            cloak_color: None,
        }
    }

    /// A character created with a fixed rank, bypassing rank selection.
    pub fn with_rank(class: CharacterClass, rank: &str) -> Self {
        Self {
            rank: Some(rank.to_string()),
            ..Self::new(class)
        }
    }

    pub fn community_name(&self) -> &'static str {
        self.class.community_name(self.rank.as_deref())
    }

    /// Whether the character may choose a cloak colour.
    pub fn can_wear_cloak(&self) -> bool {
        self.class == CharacterClass::Warder
            && self
                .rank
                .as_deref()
                .is_some_and(|rank| CLOAK_RANKS.contains(&rank))
    }
}
