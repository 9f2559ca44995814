//! Where record bytes come from.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::decode::{DecodeError, RecordDecoder};
use crate::state::PlayerId;
use crate::tag::TagValue;

/// Extension of per-player record files.
pub const RECORD_EXTENSION: &str = "dat";

/// Provides the raw record of a player, if one exists.
pub trait RecordSource {
    type Reader: Read;

    /// Whether the source can serve records at all. A sweep over an
    /// unavailable source has nothing to do.
    fn is_available(&self) -> bool {
        true
    }

    /// Open the record for `player`. `Ok(None)` means the player has no record.
    fn open_record(&self, player: PlayerId) -> io::Result<Option<Self::Reader>>;
}

/// Decode the record of `player` from `source`, one record at a time.
pub fn read_record<S: RecordSource + ?Sized>(
    source: &S,
    decoder: &RecordDecoder,
    player: PlayerId,
) -> Result<Option<TagValue>, DecodeError> {
    match source.open_record(player).map_err(DecodeError::Io)? {
        Some(reader) => decoder.decode(reader).map(Some),
        None => Ok(None),
    }
}

/// The `playerdata` directory of a world folder, holding `<uuid>.dat` files.
#[derive(Debug, Clone)]
pub struct PlayerDataDir {
    root: PathBuf,
}

impl PlayerDataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Records live in `playerdata/` under the main world's folder.
    pub fn for_world_folder(world_folder: &Path) -> Self {
        Self::new(world_folder.join("playerdata"))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn record_path(&self, player: PlayerId) -> PathBuf {
        self.root.join(format!("{}.{}", player, RECORD_EXTENSION))
    }

    /// Identities of every record file in the directory, sorted. Files whose
    /// stem is not a UUID (backups, `.dat_old`) are ignored.
    pub fn list_players(&self) -> io::Result<Vec<PlayerId>> {
        let mut players = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(player) = player_id_from_path(&path) {
                players.push(player);
            }
        }
        players.sort();
        Ok(players)
    }
}

impl RecordSource for PlayerDataDir {
    type Reader = BufReader<File>;

    fn is_available(&self) -> bool {
        self.exists()
    }

    fn open_record(&self, player: PlayerId) -> io::Result<Option<Self::Reader>> {
        match File::open(self.record_path(player)) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Records already held in memory, keyed by player.
impl RecordSource for BTreeMap<PlayerId, Vec<u8>> {
    type Reader = Cursor<Vec<u8>>;

    fn open_record(&self, player: PlayerId) -> io::Result<Option<Self::Reader>> {
        Ok(self.get(&player).cloned().map(Cursor::new))
    }
}

/// Parse the identity encoded in a record's file stem.
pub fn player_id_from_path(path: &Path) -> Option<PlayerId> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse().ok())
}
