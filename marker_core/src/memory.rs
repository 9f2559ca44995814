//! In-memory marker store for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};

use player_record::PlayerId;

use crate::host::{MapId, MarkerSetHandle, MarkerStore, WorldHandle};
use crate::marker::{MarkerRecord, MarkerSetConfig};

/// A marker set and its markers, keyed by player.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMarkerSet {
    pub config: MarkerSetConfig,
    pub markers: BTreeMap<String, MarkerRecord>,
}

/// Marker sets per map, with the renderer's switches exposed for tests.
#[derive(Debug, Clone)]
pub struct MemoryMarkerStore {
    available: bool,
    maps: Vec<(WorldHandle, MapId)>,
    hidden_players: BTreeSet<PlayerId>,
    sets: BTreeMap<(MapId, String), MemoryMarkerSet>,
    writes: usize,
}

impl Default for MemoryMarkerStore {
    fn default() -> Self {
        Self {
            available: true,
            maps: Vec::new(),
            hidden_players: BTreeSet::new(),
            sets: BTreeMap::new(),
            writes: 0,
        }
    }
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rendered map of `world`.
    pub fn with_map(mut self, world: WorldHandle, map: MapId) -> Self {
        self.maps.push((world, map));
        self
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn hide_player(&mut self, player: PlayerId) {
        self.hidden_players.insert(player);
    }

    pub fn marker_set(&self, map: &MapId, set_id: &str) -> Option<&MemoryMarkerSet> {
        self.sets.get(&(map.clone(), set_id.to_string()))
    }

    /// Every marker of `player`, with the map it sits on.
    pub fn markers_for(&self, player: PlayerId) -> Vec<(MapId, MarkerRecord)> {
        let key = player.to_string();
        self.sets
            .iter()
            .filter_map(|((map, _), set)| {
                set.markers
                    .get(&key)
                    .map(|marker| (map.clone(), marker.clone()))
            })
            .collect()
    }

    pub fn marker_count(&self) -> usize {
        self.sets.values().map(|set| set.markers.len()).sum()
    }

    /// Set creations, puts and effective removes so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Copy of all marker sets, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<(MapId, String), MemoryMarkerSet> {
        self.sets.clone()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn player_visible(&self, player: PlayerId) -> bool {
        !self.hidden_players.contains(&player)
    }

    fn maps_for_world(&self, world: &WorldHandle) -> Vec<MapId> {
        self.maps
            .iter()
            .filter(|(handle, _)| handle.uuid == world.uuid)
            .map(|(_, map)| map.clone())
            .collect()
    }

    fn all_maps(&self) -> Vec<MapId> {
        self.maps.iter().map(|(_, map)| map.clone()).collect()
    }

    fn find_marker_set(&self, map: &MapId, set_id: &str) -> Option<MarkerSetHandle> {
        self.marker_set(map, set_id).map(|_| MarkerSetHandle {
            map: map.clone(),
            set_id: set_id.to_string(),
        })
    }

    fn create_marker_set(
        &mut self,
        map: &MapId,
        set_id: &str,
        config: &MarkerSetConfig,
    ) -> MarkerSetHandle {
        self.writes += 1;
        self.sets
            .entry((map.clone(), set_id.to_string()))
            .or_insert_with(|| MemoryMarkerSet {
                config: config.clone(),
                markers: BTreeMap::new(),
            });
        MarkerSetHandle {
            map: map.clone(),
            set_id: set_id.to_string(),
        }
    }

    fn player_icon(&mut self, player: PlayerId, map: &MapId) -> String {
        format!("{map}/{player}.png")
    }

    /// Puts into a set that was never created are dropped.
    fn put(&mut self, set: &MarkerSetHandle, key: &str, marker: MarkerRecord) {
        let Some(entry) = self.sets.get_mut(&(set.map.clone(), set.set_id.clone())) else {
            return;
        };
        self.writes += 1;
        entry.markers.insert(key.to_string(), marker);
    }

    fn remove(&mut self, set: &MarkerSetHandle, key: &str) -> bool {
        let removed = self
            .sets
            .get_mut(&(set.map.clone(), set.set_id.clone()))
            .and_then(|entry| entry.markers.remove(key))
            .is_some();
        if removed {
            self.writes += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_record::{GameMode, PlayerState, Position, Uuid, WorldReference};

    fn marker() -> MarkerRecord {
        MarkerRecord::for_player(&PlayerState {
            identity: PlayerId::from_u128(1),
            display_name: None,
            world_ref: WorldReference::ByLegacyDimensionId(0),
            position: Position::new(0.0, 0.0, 0.0),
            game_mode: GameMode::Survival,
            last_seen_epoch_millis: 0,
        })
    }

    #[test]
    fn put_requires_a_created_set() {
        let world = WorldHandle {
            uuid: Uuid::from_u128(1),
            name: "world".to_string(),
        };
        let map = MapId::new("world");
        let mut store = MemoryMarkerStore::new().with_map(world, map.clone());
        let handle = MarkerSetHandle {
            map: map.clone(),
            set_id: "offline-players".to_string(),
        };

        store.put(&handle, "key", marker());
        assert_eq!(store.marker_count(), 0);
        assert_eq!(store.write_count(), 0);
        assert!(store.find_marker_set(&map, "offline-players").is_none());

        let config = MarkerSetConfig {
            label: "Offline Players".to_string(),
            toggleable: true,
            default_hidden: false,
        };
        let created = store.create_marker_set(&map, "offline-players", &config);
        store.put(&created, "key", marker());
        assert_eq!(store.marker_count(), 1);
    }
}
