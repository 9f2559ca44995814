//! Player record decoding for offline player markers.
//!
//! Turns the per-player binary records a game server keeps on disk into
//! [`PlayerState`] values: [`RecordDecoder`] produces a [`TagValue`] tree and
//! [`resolve_player_state`] interprets it across record generations. Nothing in
//! this crate knows about maps or markers.

mod decode;
mod resolve;
mod source;
mod state;
mod tag;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use decode::{decode_record, DecodeError, RecordDecoder, MAX_DEPTH};
pub use resolve::{
    resolve_player_state, ResolveError, DIMENSION_KEY, GAME_MODE_KEY, POSITION_KEY,
    WORLD_UUID_LEAST_KEY, WORLD_UUID_MOST_KEY,
};
pub use source::{
    player_id_from_path, read_record, PlayerDataDir, RecordSource, RECORD_EXTENSION,
};
pub use state::{GameMode, PlayerId, PlayerState, Position, WorldReference};
pub use tag::{TagKind, TagList, TagValue};

pub use uuid::Uuid;
