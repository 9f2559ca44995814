//! Recovering a [`PlayerState`] from a decoded record.
//!
//! Records written by different game versions carry different world fields.
//! Newer records store the world as two `Long` halves of a UUID; older ones
//! only carry an integer `Dimension`. Records written during the migration
//! window carry both, and the UUID wins.

use thiserror::Error;

use crate::state::{GameMode, PlayerId, PlayerState, Position, WorldReference};
use crate::tag::{TagKind, TagValue};

pub const POSITION_KEY: &str = "Pos";
pub const GAME_MODE_KEY: &str = "playerGameType";
pub const WORLD_UUID_MOST_KEY: &str = "WorldUUIDMost";
pub const WORLD_UUID_LEAST_KEY: &str = "WorldUUIDLeast";
pub const DIMENSION_KEY: &str = "Dimension";

/// Reason a decoded record could not be turned into a [`PlayerState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("record has no position")]
    MissingPosition,
    #[error("record has no game mode")]
    MissingGameMode,
    #[error("record has neither world uuid nor dimension")]
    MissingWorldInfo,
    #[error("position is {found}, expected a list of 3 doubles")]
    CorruptPosition { found: String },
    #[error("game mode is {found}, expected an int")]
    CorruptGameMode { found: String },
    #[error("world field {field} is {found}")]
    CorruptWorldInfo { field: &'static str, found: String },
}

impl ResolveError {
    /// Record field the failure is about, for log lines.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingPosition | Self::CorruptPosition { .. } => POSITION_KEY,
            Self::MissingGameMode | Self::CorruptGameMode { .. } => GAME_MODE_KEY,
            Self::MissingWorldInfo => DIMENSION_KEY,
            Self::CorruptWorldInfo { field, .. } => *field,
        }
    }
}

/// Extract a player's state from `tree`.
///
/// The record carries no trustworthy identity or name, so the identity comes
/// from the caller (usually the record's file name) and `display_name` is left
/// for the caller to fill.
pub fn resolve_player_state(
    tree: &TagValue,
    last_seen_epoch_millis: i64,
    fallback_identity: PlayerId,
) -> Result<PlayerState, ResolveError> {
    let position = resolve_position(tree)?;
    let game_mode = resolve_game_mode(tree)?;
    let world_ref = resolve_world(tree)?;

    Ok(PlayerState {
        identity: fallback_identity,
        display_name: None,
        world_ref,
        position,
        game_mode,
        last_seen_epoch_millis,
    })
}

fn resolve_position(tree: &TagValue) -> Result<Position, ResolveError> {
    let value = tree.get(POSITION_KEY).ok_or(ResolveError::MissingPosition)?;
    let corrupt = || ResolveError::CorruptPosition {
        found: value.describe(),
    };

    let list = value.as_list().ok_or_else(corrupt)?;
    if list.kind() != TagKind::Double {
        return Err(corrupt());
    }
    match list.items() {
        [x, y, z] => {
            let (x, y, z) = (
                x.as_double().ok_or_else(corrupt)?,
                y.as_double().ok_or_else(corrupt)?,
                z.as_double().ok_or_else(corrupt)?,
            );
            Ok(Position::new(x, y, z))
        }
        _ => Err(corrupt()),
    }
}

fn resolve_game_mode(tree: &TagValue) -> Result<GameMode, ResolveError> {
    match tree.get(GAME_MODE_KEY) {
        None => Err(ResolveError::MissingGameMode),
        Some(TagValue::Int(id)) => Ok(GameMode::from_id(*id)),
        Some(other) => Err(ResolveError::CorruptGameMode {
            found: other.describe(),
        }),
    }
}

fn resolve_world(tree: &TagValue) -> Result<WorldReference, ResolveError> {
    let most = tree.get(WORLD_UUID_MOST_KEY);
    let least = tree.get(WORLD_UUID_LEAST_KEY);

    if let (Some(most), Some(least)) = (most, least) {
        return match (most, least) {
            (TagValue::Long(most), TagValue::Long(least)) => {
                Ok(WorldReference::from_uuid_halves(*most, *least))
            }
            (TagValue::Long(_), other) => Err(ResolveError::CorruptWorldInfo {
                field: WORLD_UUID_LEAST_KEY,
                found: other.describe(),
            }),
            (other, _) => Err(ResolveError::CorruptWorldInfo {
                field: WORLD_UUID_MOST_KEY,
                found: other.describe(),
            }),
        };
    }

    match tree.get(DIMENSION_KEY) {
        Some(TagValue::Int(dimension)) => Ok(WorldReference::ByLegacyDimensionId(*dimension)),
        Some(other) => Err(ResolveError::CorruptWorldInfo {
            field: DIMENSION_KEY,
            found: other.describe(),
        }),
        None => Err(ResolveError::MissingWorldInfo),
    }
}
