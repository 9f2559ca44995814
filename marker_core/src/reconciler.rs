//! Keeps one marker per (player, rendered map) in the renderer's store.
//!
//! Every write is idempotent: `put` overwrites by player key and removing an
//! absent key is a no-op, so any operation here can be re-run after a partial
//! failure without coordination.

use std::sync::Arc;

use player_record::{
    DecodeError, PlayerId, PlayerState, RecordDecoder, ResolveError, WorldReference,
};
use thiserror::Error;

use crate::host::{ensure_marker_set, MapId, MarkerStore, PlayerDirectory, WorldLookup};
use crate::marker::{marker_label, MarkerRecord, MARKER_SET_ID};
use crate::policy_config::PolicyConfig;

/// Why a single player was skipped. Never aborts a batch.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no record on disk")]
    MissingRecord,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("{0} is not loaded")]
    WorldNotFound(WorldReference),
    #[error("host has no live state for an online player")]
    NoLiveState,
}

impl RecordError {
    /// Short category for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRecord => "missing_record",
            Self::Decode(DecodeError::Io(_)) => "io",
            Self::Decode(_) => "decode",
            Self::Resolve(_) => "resolve",
            Self::WorldNotFound(_) => "world_not_found",
            Self::NoLiveState => "no_live_state",
        }
    }

    /// Record field involved, when the failure is about one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Resolve(err) => Some(err.field()),
            _ => None,
        }
    }
}

/// Failure of a reconciliation operation. Each is logged where it is raised.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The map renderer is not loaded; nothing was written.
    #[error("map renderer is not loaded")]
    HostUnavailable,
    #[error("player {player}: {source}")]
    Player {
        player: PlayerId,
        #[source]
        source: RecordError,
    },
}

impl ReconcileError {
    /// Only a missing renderer stops a whole pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HostUnavailable)
    }
}

/// What [`MarkerReconciler::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added { maps: usize },
    HiddenByHost,
    HiddenGameMode,
    NoRenderedMaps,
}

/// Applies marker policy and writes to the renderer's store.
#[derive(Debug, Clone)]
pub struct MarkerReconciler {
    policy: Arc<PolicyConfig>,
    decoder: RecordDecoder,
}

impl MarkerReconciler {
    pub fn new(policy: Arc<PolicyConfig>) -> Self {
        Self {
            policy,
            decoder: RecordDecoder::default(),
        }
    }

    pub fn with_decoder(mut self, decoder: RecordDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn replace_policy(&mut self, policy: Arc<PolicyConfig>) {
        self.policy = policy;
    }

    pub(crate) fn decoder(&self) -> &RecordDecoder {
        &self.decoder
    }

    /// Add or overwrite the player's marker on each of `maps`, the rendered
    /// maps of the player's world.
    pub fn upsert<S: MarkerStore + ?Sized>(
        &self,
        store: &mut S,
        player: &PlayerState,
        maps: &[MapId],
    ) -> Result<UpsertOutcome, ReconcileError> {
        ensure_available(store, "add")?;

        if !store.player_visible(player.identity) {
            tracing::debug!(
                target: "offline_markers::reconcile",
                player = %player.identity,
                "marker.skipped=hidden_by_host"
            );
            return Ok(UpsertOutcome::HiddenByHost);
        }
        if self.policy.hides(player.game_mode) {
            tracing::debug!(
                target: "offline_markers::reconcile",
                player = %player.identity,
                game_mode = ?player.game_mode,
                "marker.skipped=hidden_game_mode"
            );
            return Ok(UpsertOutcome::HiddenGameMode);
        }
        if maps.is_empty() {
            tracing::debug!(
                target: "offline_markers::reconcile",
                player = %player.identity,
                world = %player.world_ref,
                "marker.skipped=no_rendered_maps"
            );
            return Ok(UpsertOutcome::NoRenderedMaps);
        }

        let template = MarkerRecord::for_player(player);
        let set_config = self.policy.marker_set_config();
        for map in maps {
            let set = ensure_marker_set(store, map, MARKER_SET_ID, &set_config);
            let icon = store.player_icon(player.identity, map);
            store.put(&set, &template.key, template.clone().with_icon(icon));
        }

        tracing::info!(
            target: "offline_markers::reconcile",
            player = %player.identity,
            label = %marker_label(player),
            maps = maps.len(),
            "marker.added"
        );
        Ok(UpsertOutcome::Added { maps: maps.len() })
    }

    /// Remove the player's marker from each of `maps`. Returns how many
    /// markers were actually removed.
    pub fn remove<S: MarkerStore + ?Sized>(
        &self,
        store: &mut S,
        player: PlayerId,
        maps: &[MapId],
    ) -> Result<usize, ReconcileError> {
        ensure_available(store, "remove")?;

        let key = player.to_string();
        let mut removed = 0;
        for map in maps {
            if let Some(set) = store.find_marker_set(map, MARKER_SET_ID) {
                if store.remove(&set, &key) {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            tracing::info!(
                target: "offline_markers::reconcile",
                player = %player,
                maps = removed,
                "marker.removed"
            );
        } else {
            tracing::debug!(
                target: "offline_markers::reconcile",
                player = %player,
                "marker.remove_noop"
            );
        }
        Ok(removed)
    }

    /// Remove the player's marker from every map the store knows.
    pub fn remove_everywhere<S: MarkerStore + ?Sized>(
        &self,
        store: &mut S,
        player: PlayerId,
    ) -> Result<usize, ReconcileError> {
        ensure_available(store, "remove")?;
        let maps = store.all_maps();
        self.remove(store, player, &maps)
    }

    /// A player came online: the renderer shows them live, so their offline
    /// marker goes away.
    pub fn handle_join<S: MarkerStore + ?Sized>(
        &self,
        store: &mut S,
        player: PlayerId,
    ) -> Result<usize, ReconcileError> {
        self.remove_everywhere(store, player)
    }

    /// A player went offline: place a marker from their live state.
    pub fn handle_quit<S, D, W>(
        &self,
        store: &mut S,
        directory: &D,
        worlds: &W,
        player: PlayerId,
    ) -> Result<UpsertOutcome, ReconcileError>
    where
        S: MarkerStore + ?Sized,
        D: PlayerDirectory + ?Sized,
        W: WorldLookup + ?Sized,
    {
        ensure_available(store, "add")?;

        let state = match directory.current_state(player) {
            Some(state) if state.display_name.is_some() => state,
            Some(state) => {
                let name = directory.roster_name(player);
                state.with_display_name(name)
            }
            None => {
                let err = RecordError::NoLiveState;
                log_player_failure(player, None, &err);
                return Err(ReconcileError::Player {
                    player,
                    source: err,
                });
            }
        };
        self.place(store, worlds, &state).map_err(|err| {
            if let ReconcileError::Player { source, .. } = &err {
                log_player_failure(player, state.display_name.as_deref(), source);
            }
            err
        })
    }

    /// Resolve the player's world, then upsert on its maps.
    pub(crate) fn place<S, W>(
        &self,
        store: &mut S,
        worlds: &W,
        state: &PlayerState,
    ) -> Result<UpsertOutcome, ReconcileError>
    where
        S: MarkerStore + ?Sized,
        W: WorldLookup + ?Sized,
    {
        let world = worlds
            .resolve(&state.world_ref)
            .ok_or(ReconcileError::Player {
                player: state.identity,
                source: RecordError::WorldNotFound(state.world_ref),
            })?;
        let maps = store.maps_for_world(&world);
        self.upsert(store, state, &maps)
    }
}

fn ensure_available<S: MarkerStore + ?Sized>(
    store: &S,
    operation: &'static str,
) -> Result<(), ReconcileError> {
    if store.is_available() {
        Ok(())
    } else {
        tracing::error!(
            target: "offline_markers::reconcile",
            operation,
            "renderer.unavailable"
        );
        Err(ReconcileError::HostUnavailable)
    }
}

/// The single log line for a skipped player.
pub(crate) fn log_player_failure(player: PlayerId, name: Option<&str>, err: &RecordError) {
    tracing::warn!(
        target: "offline_markers::reconcile",
        player = %player,
        name = name.unwrap_or(""),
        kind = err.kind(),
        field = err.field().unwrap_or(""),
        error = %err,
        "player.skipped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{StaticWorlds, WorldHandle};
    use crate::memory::MemoryMarkerStore;
    use player_record::{GameMode, Position, Uuid};

    const WORLD: u128 = 0x1111_0000_0000_0000_2222;

    fn reconciler() -> MarkerReconciler {
        MarkerReconciler::new(Arc::new(PolicyConfig::default()))
    }

    fn overworld() -> WorldHandle {
        WorldHandle {
            uuid: Uuid::from_u128(WORLD),
            name: "world".to_string(),
        }
    }

    fn store() -> MemoryMarkerStore {
        MemoryMarkerStore::new()
            .with_map(overworld(), MapId::new("world"))
            .with_map(overworld(), MapId::new("world_flat"))
    }

    fn state(id: u128, position: Position, game_mode: GameMode) -> PlayerState {
        PlayerState {
            identity: PlayerId::from_u128(id),
            display_name: Some(format!("player{id}")),
            world_ref: WorldReference::ByUuid(Uuid::from_u128(WORLD)),
            position,
            game_mode,
            last_seen_epoch_millis: 1_000,
        }
    }

    fn maps() -> Vec<MapId> {
        vec![MapId::new("world"), MapId::new("world_flat")]
    }

    #[test]
    fn upsert_creates_set_and_one_marker_per_map() {
        let mut store = store();
        let player = state(1, Position::new(1.0, 2.0, 3.0), GameMode::Survival);

        let outcome = reconciler().upsert(&mut store, &player, &maps()).unwrap();
        assert_eq!(outcome, UpsertOutcome::Added { maps: 2 });

        for map in maps() {
            let set = store.marker_set(&map, MARKER_SET_ID).expect("set created");
            assert_eq!(set.config.label, "Offline Players");
            assert!(set.config.toggleable);
            assert!(!set.config.default_hidden);
            assert_eq!(set.markers.len(), 1);
            let marker = set.markers.get(&player.identity.to_string()).unwrap();
            assert_eq!(marker.icon_ref, format!("{}/{}.png", map, player.identity));
        }
    }

    #[test]
    fn second_upsert_overwrites_instead_of_duplicating() {
        let mut store = store();
        let reconciler = reconciler();
        let first = state(1, Position::new(1.0, 2.0, 3.0), GameMode::Survival);
        let second = state(1, Position::new(10.0, 20.0, 30.0), GameMode::Survival);

        reconciler.upsert(&mut store, &first, &maps()).unwrap();
        reconciler.upsert(&mut store, &second, &maps()).unwrap();

        let markers = store.markers_for(first.identity);
        assert_eq!(markers.len(), 2);
        for (_, marker) in markers {
            assert_eq!(marker.position, Position::new(10.0, 21.8, 30.0));
        }
    }

    #[test]
    fn existing_set_keeps_its_presentation() {
        let mut store = store();
        let custom = crate::marker::MarkerSetConfig {
            label: "Custom".to_string(),
            toggleable: false,
            default_hidden: true,
        };
        store.create_marker_set(&MapId::new("world"), MARKER_SET_ID, &custom);

        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Creative);
        reconciler().upsert(&mut store, &player, &maps()).unwrap();

        let set = store
            .marker_set(&MapId::new("world"), MARKER_SET_ID)
            .unwrap();
        assert_eq!(set.config, custom);
        assert_eq!(set.markers.len(), 1);
    }

    #[test]
    fn hidden_game_mode_never_produces_a_marker() {
        let mut store = store();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Spectator);
        let outcome = reconciler().upsert(&mut store, &player, &maps()).unwrap();
        assert_eq!(outcome, UpsertOutcome::HiddenGameMode);
        assert!(store.markers_for(player.identity).is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn unknown_game_mode_is_shown_unless_configured() {
        let mut store = store();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Unknown);
        let outcome = reconciler().upsert(&mut store, &player, &maps()).unwrap();
        assert_eq!(outcome, UpsertOutcome::Added { maps: 2 });

        let mut policy = PolicyConfig::default();
        policy.hidden_game_modes.insert(GameMode::Unknown);
        let strict = MarkerReconciler::new(Arc::new(policy));
        let other = state(2, Position::new(0.0, 0.0, 0.0), GameMode::Unknown);
        assert_eq!(
            strict.upsert(&mut store, &other, &maps()).unwrap(),
            UpsertOutcome::HiddenGameMode
        );
    }

    #[test]
    fn host_hidden_player_is_skipped() {
        let mut store = store();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Survival);
        store.hide_player(player.identity);
        let outcome = reconciler().upsert(&mut store, &player, &maps()).unwrap();
        assert_eq!(outcome, UpsertOutcome::HiddenByHost);
        assert!(store.markers_for(player.identity).is_empty());
    }

    #[test]
    fn no_maps_means_no_marker() {
        let mut store = store();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Survival);
        let outcome = reconciler().upsert(&mut store, &player, &[]).unwrap();
        assert_eq!(outcome, UpsertOutcome::NoRenderedMaps);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn upsert_then_remove_leaves_nothing() {
        let mut store = store();
        let reconciler = reconciler();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Survival);
        reconciler.upsert(&mut store, &player, &maps()).unwrap();

        assert_eq!(reconciler.remove(&mut store, player.identity, &maps()).unwrap(), 2);
        assert!(store.markers_for(player.identity).is_empty());
        assert_eq!(reconciler.remove(&mut store, player.identity, &maps()).unwrap(), 0);
    }

    #[test]
    fn removing_a_never_added_player_changes_nothing() {
        let mut store = store();
        let reconciler = reconciler();
        let kept = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Survival);
        reconciler.upsert(&mut store, &kept, &maps()).unwrap();
        let before = store.snapshot();

        let removed = reconciler
            .remove_everywhere(&mut store, PlayerId::from_u128(99))
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn unavailable_renderer_aborts_without_writes() {
        let mut store = store();
        store.set_available(false);
        let reconciler = reconciler();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Survival);

        let err = reconciler.upsert(&mut store, &player, &maps()).unwrap_err();
        assert!(matches!(err, ReconcileError::HostUnavailable));
        assert!(err.is_fatal());
        assert!(matches!(
            reconciler.remove_everywhere(&mut store, player.identity),
            Err(ReconcileError::HostUnavailable)
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn place_reports_unknown_world_per_player() {
        let mut store = store();
        let worlds = StaticWorlds::new();
        let player = state(1, Position::new(0.0, 0.0, 0.0), GameMode::Survival);

        let err = reconciler().place(&mut store, &worlds, &player).unwrap_err();
        assert!(!err.is_fatal());
        match err {
            ReconcileError::Player { player: id, source } => {
                assert_eq!(id, player.identity);
                assert_eq!(source.kind(), "world_not_found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
