//! Contracts the hosting server and the map renderer fulfil.
//!
//! The core never reaches for global registries: every capability it needs is
//! one of these traits, passed in explicitly. All calls happen on the host's
//! main execution context.

use std::fmt;

use player_record::{PlayerId, PlayerState, Uuid, WorldReference};

use crate::marker::{MarkerRecord, MarkerSetConfig};

/// A live world known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldHandle {
    pub uuid: Uuid,
    pub name: String,
}

/// Resolves record world references to live worlds.
pub trait WorldLookup {
    fn resolve_uuid(&self, uuid: Uuid) -> Option<WorldHandle>;

    /// First live world with the given legacy dimension id. Several worlds
    /// can share an id; which one wins is up to the host's iteration order.
    fn resolve_legacy_dimension(&self, dimension: i32) -> Option<WorldHandle>;

    fn resolve(&self, reference: &WorldReference) -> Option<WorldHandle> {
        match reference {
            WorldReference::ByUuid(uuid) => self.resolve_uuid(*uuid),
            WorldReference::ByLegacyDimensionId(dimension) => {
                self.resolve_legacy_dimension(*dimension)
            }
        }
    }
}

/// A fixed, ordered world list.
#[derive(Debug, Clone, Default)]
pub struct StaticWorlds {
    worlds: Vec<(WorldHandle, i32)>,
}

impl StaticWorlds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_world(mut self, handle: WorldHandle, legacy_dimension: i32) -> Self {
        self.worlds.push((handle, legacy_dimension));
        self
    }
}

impl WorldLookup for StaticWorlds {
    fn resolve_uuid(&self, uuid: Uuid) -> Option<WorldHandle> {
        self.worlds
            .iter()
            .find(|(handle, _)| handle.uuid == uuid)
            .map(|(handle, _)| handle.clone())
    }

    fn resolve_legacy_dimension(&self, dimension: i32) -> Option<WorldHandle> {
        let found = self
            .worlds
            .iter()
            .find(|(_, id)| *id == dimension)
            .map(|(handle, _)| handle.clone());
        if found.is_none() {
            tracing::debug!(
                target: "offline_markers::worlds",
                dimension,
                "world.unresolved=legacy_dimension"
            );
        }
        found
    }
}

/// A player the host has ever seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPlayer {
    pub identity: PlayerId,
    pub name: Option<String>,
    pub last_seen_epoch_millis: i64,
    pub online: bool,
}

/// The host's player registry.
pub trait PlayerDirectory {
    /// Every known player, online or not.
    fn known_players(&self) -> Vec<KnownPlayer>;

    /// Live state of an online player.
    fn current_state(&self, player: PlayerId) -> Option<PlayerState>;

    /// Name from secondary rosters (whitelist, ban list, operators) for
    /// players the main registry has no name for.
    fn roster_name(&self, _player: PlayerId) -> Option<String> {
        None
    }

    /// Registry name, else roster name.
    fn display_name(&self, player: &KnownPlayer) -> Option<String> {
        player
            .name
            .clone()
            .or_else(|| self.roster_name(player.identity))
    }
}

/// Id of a rendered map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(pub String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A marker set on one map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerSetHandle {
    pub map: MapId,
    pub set_id: String,
}

/// The renderer's marker store.
///
/// `put` overwrites any marker under the same key and `remove` of an absent
/// key is a no-op; the reconciler relies on both.
pub trait MarkerStore {
    /// Whether the renderer is loaded. Nothing else is called when it is not.
    fn is_available(&self) -> bool;

    /// Whether the player allows being shown on the map.
    fn player_visible(&self, player: PlayerId) -> bool;

    /// Maps rendering `world`; empty when the world is not rendered.
    fn maps_for_world(&self, world: &WorldHandle) -> Vec<MapId>;

    fn all_maps(&self) -> Vec<MapId>;

    fn find_marker_set(&self, map: &MapId, set_id: &str) -> Option<MarkerSetHandle>;

    fn create_marker_set(
        &mut self,
        map: &MapId,
        set_id: &str,
        config: &MarkerSetConfig,
    ) -> MarkerSetHandle;

    /// Address of the player's head icon in `map`'s storage.
    fn player_icon(&mut self, player: PlayerId, map: &MapId) -> String;

    fn put(&mut self, set: &MarkerSetHandle, key: &str, marker: MarkerRecord);

    /// Returns whether a marker was removed.
    fn remove(&mut self, set: &MarkerSetHandle, key: &str) -> bool;
}

/// The marker set `set_id` on `map`, created from `config` if missing.
pub fn ensure_marker_set<S: MarkerStore + ?Sized>(
    store: &mut S,
    map: &MapId,
    set_id: &str,
    config: &MarkerSetConfig,
) -> MarkerSetHandle {
    match store.find_marker_set(map, set_id) {
        Some(handle) => handle,
        None => {
            tracing::debug!(
                target: "offline_markers::reconcile",
                map = %map,
                set_id,
                "marker_set.created"
            );
            store.create_marker_set(map, set_id, config)
        }
    }
}
