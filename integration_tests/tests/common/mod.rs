#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use marker_core::memory::MemoryMarkerStore;
use marker_core::{
    KnownPlayer, MapId, PlayerDirectory, StaticWorlds, WorldHandle, POLICY_CONFIG_ENV,
};
use player_record::{PlayerDataDir, PlayerId, PlayerState, Uuid, WorldReference};

static INIT: Once = Once::new();
static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

pub const OVERWORLD_MOST: i64 = 0x5ec7_10a8_7b4e_4f1c;
pub const OVERWORLD_LEAST: i64 = -0x6d2b_33c1_0a9e_77f0;
pub const NETHER_MOST: i64 = 0x1b0e_9f33_2c4d_4a10;
pub const NETHER_LEAST: i64 = 0x7e21_55aa_0b3c_9d01;

pub const HOUR: i64 = 60 * 60 * 1000;
pub const NOW: i64 = 1_700_000_000_000;

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_policy_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test policy config at {}",
            config_path.display()
        );

        std::env::set_var(POLICY_CONFIG_ENV, &config_path);
    });
}

fn uuid_of(most: i64, least: i64) -> Uuid {
    match WorldReference::from_uuid_halves(most, least) {
        WorldReference::ByUuid(uuid) => uuid,
        other => panic!("unexpected {other:?}"),
    }
}

pub fn overworld() -> WorldHandle {
    WorldHandle {
        uuid: uuid_of(OVERWORLD_MOST, OVERWORLD_LEAST),
        name: "world".to_string(),
    }
}

pub fn nether() -> WorldHandle {
    WorldHandle {
        uuid: uuid_of(NETHER_MOST, NETHER_LEAST),
        name: "world_nether".to_string(),
    }
}

/// Overworld is legacy dimension 0, nether is -1.
pub fn worlds() -> StaticWorlds {
    StaticWorlds::new()
        .with_world(overworld(), 0)
        .with_world(nether(), -1)
}

/// Two maps render the overworld, one renders the nether.
pub fn renderer() -> MemoryMarkerStore {
    MemoryMarkerStore::new()
        .with_map(overworld(), MapId::new("world"))
        .with_map(overworld(), MapId::new("world_flat"))
        .with_map(nether(), MapId::new("world_nether"))
}

/// Host player registry backed by plain vectors.
#[derive(Debug, Default)]
pub struct TestDirectory {
    pub players: Vec<KnownPlayer>,
    pub live: Vec<PlayerState>,
    pub rosters: Vec<(PlayerId, String)>,
}

impl TestDirectory {
    pub fn offline(mut self, player: PlayerId, name: Option<&str>, last_seen: i64) -> Self {
        self.players.push(KnownPlayer {
            identity: player,
            name: name.map(str::to_string),
            last_seen_epoch_millis: last_seen,
            online: false,
        });
        self
    }

    pub fn online(mut self, state: PlayerState) -> Self {
        self.players.push(KnownPlayer {
            identity: state.identity,
            name: state.display_name.clone(),
            last_seen_epoch_millis: state.last_seen_epoch_millis,
            online: true,
        });
        self.live.push(state);
        self
    }

    pub fn roster(mut self, player: PlayerId, name: &str) -> Self {
        self.rosters.push((player, name.to_string()));
        self
    }
}

impl PlayerDirectory for TestDirectory {
    fn known_players(&self) -> Vec<KnownPlayer> {
        self.players.clone()
    }

    fn current_state(&self, player: PlayerId) -> Option<PlayerState> {
        self.live
            .iter()
            .find(|state| state.identity == player)
            .cloned()
    }

    fn roster_name(&self, player: PlayerId) -> Option<String> {
        self.rosters
            .iter()
            .find(|(id, _)| *id == player)
            .map(|(_, name)| name.clone())
    }
}

/// A fresh player data folder under the system temp dir.
pub struct TempPlayerData {
    pub dir: PlayerDataDir,
}

impl TempPlayerData {
    pub fn new(label: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "offline_markers_{label}_{}_{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).expect("create temp player data");
        Self {
            dir: PlayerDataDir::new(root),
        }
    }

    pub fn write(&self, player: PlayerId, bytes: &[u8]) {
        fs::write(self.dir.record_path(player), bytes).expect("write record");
    }
}

impl Drop for TempPlayerData {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(self.dir.path());
    }
}

pub fn player(id: u128) -> PlayerId {
    PlayerId::from_u128(id)
}
