use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a player, independent of their current name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Game mode as numbered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
    /// A number outside the host's mapping.
    Unknown,
}

impl GameMode {
    pub fn from_id(id: i32) -> Self {
        match id {
            0 => Self::Survival,
            1 => Self::Creative,
            2 => Self::Adventure,
            3 => Self::Spectator,
            _ => Self::Unknown,
        }
    }

    pub fn id(self) -> Option<i32> {
        match self {
            Self::Survival => Some(0),
            Self::Creative => Some(1),
            Self::Adventure => Some(2),
            Self::Spectator => Some(3),
            Self::Unknown => None,
        }
    }
}

/// How a record names the world its player was last in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum WorldReference {
    ByUuid(Uuid),
    ByLegacyDimensionId(i32),
}

impl WorldReference {
    /// Combine the two signed halves stored in a record.
    pub fn from_uuid_halves(most: i64, least: i64) -> Self {
        let bits = ((most as u64 as u128) << 64) | (least as u64 as u128);
        Self::ByUuid(Uuid::from_u128(bits))
    }
}

impl fmt::Display for WorldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByUuid(uuid) => write!(f, "world {}", uuid.hyphenated()),
            Self::ByLegacyDimensionId(id) => write!(f, "dimension {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn raised(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }
}

/// Everything the reconciler needs to place one player's marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub identity: PlayerId,
    pub display_name: Option<String>,
    pub world_ref: WorldReference,
    pub position: Position,
    pub game_mode: GameMode,
    pub last_seen_epoch_millis: i64,
}

impl PlayerState {
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }
}
