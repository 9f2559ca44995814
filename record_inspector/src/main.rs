use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use marker_core::{load_policy_config, MarkerRecord, MARKER_SET_ID};
use player_record::{
    player_id_from_path, resolve_player_state, PlayerDataDir, PlayerState, RecordDecoder,
    RECORD_EXTENSION,
};
use tracing::{info, warn};

mod report;

use report::{render_tree, verdict, Preview};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect offline player records and marker previews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump the decoded tag tree of one record.
    Decode { file: PathBuf },
    /// Print the resolved player state of a record, or of every record in a
    /// player data folder, as JSON lines.
    Resolve {
        path: PathBuf,
        /// Last-seen time in epoch millis; defaults to the file's mtime.
        #[arg(long)]
        last_seen: Option<i64>,
    },
    /// Show the marker a record would produce and whether policy allows it.
    Preview {
        path: PathBuf,
        /// Policy file; the builtin policy is used when omitted.
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Display name to put on the marker.
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        last_seen: Option<i64>,
        /// Reference time for expiry, in epoch millis; defaults to now.
        #[arg(long)]
        now: Option<i64>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let decoder = RecordDecoder::default();
    match cli.command {
        Command::Decode { file } => {
            let tree = decoder
                .decode(BufReader::new(open_record_file(&file)?))
                .wrap_err_with(|| format!("decoding {}", file.display()))?;
            print!("{}", render_tree(&tree));
        }
        Command::Resolve { path, last_seen } => {
            for file in record_files(&path)? {
                match load_state(&decoder, &file, last_seen) {
                    Ok(state) => println!("{}", serde_json::to_string(&state)?),
                    Err(err) => warn!(file = %file.display(), error = %err, "record.skipped"),
                }
            }
        }
        Command::Preview {
            path,
            policy,
            name,
            last_seen,
            now,
        } => {
            let (policy, metadata) = load_policy_config(policy.as_deref());
            match metadata.path() {
                Some(path) => info!(path = %path.display(), "policy.source=file"),
                None => info!("policy.source=builtin"),
            }
            let now = now.unwrap_or_else(now_epoch_millis);
            for file in record_files(&path)? {
                let state = match load_state(&decoder, &file, last_seen) {
                    Ok(state) => state.with_display_name(name.clone()),
                    Err(err) => {
                        warn!(file = %file.display(), error = %err, "record.skipped");
                        continue;
                    }
                };
                let preview = Preview {
                    verdict: verdict(&policy, &state, now),
                    marker_set: MARKER_SET_ID,
                    marker: MarkerRecord::for_player(&state),
                };
                println!("{}", serde_json::to_string_pretty(&preview)?);
            }
        }
    }
    Ok(())
}

/// A single record file, or every record in a player data folder.
fn record_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let dir = PlayerDataDir::new(path);
    let players = dir
        .list_players()
        .wrap_err_with(|| format!("listing {}", path.display()))?;
    info!(
        dir = %path.display(),
        records = players.len(),
        extension = RECORD_EXTENSION,
        "player_data.listed"
    );
    Ok(players
        .into_iter()
        .map(|player| dir.record_path(player))
        .collect())
}

fn load_state(decoder: &RecordDecoder, file: &Path, last_seen: Option<i64>) -> Result<PlayerState> {
    let player = player_id_from_path(file)
        .ok_or_else(|| eyre!("{} is not named after a player id", file.display()))?;
    let tree = decoder
        .decode(BufReader::new(open_record_file(file)?))
        .wrap_err_with(|| format!("decoding {}", file.display()))?;
    let last_seen = match last_seen {
        Some(millis) => millis,
        None => modified_epoch_millis(file)?,
    };
    Ok(resolve_player_state(&tree, last_seen, player)?)
}

fn open_record_file(file: &Path) -> Result<File> {
    File::open(file).wrap_err_with(|| format!("opening {}", file.display()))
}

fn modified_epoch_millis(file: &Path) -> Result<i64> {
    let modified = fs::metadata(file)?.modified()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH)?;
    Ok(since_epoch.as_millis() as i64)
}

fn now_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failure_names_the_file() {
        let missing = Path::new("/nonexistent/playerdata/069a79f4-44e9-4726-a5be-fca90e38aaf5.dat");
        let err = open_record_file(missing).unwrap_err();
        assert!(format!("{err:#}").contains("opening /nonexistent/playerdata/"));

        let err = load_state(&RecordDecoder::default(), missing, Some(0)).unwrap_err();
        assert!(format!("{err:#}").contains(missing.to_str().unwrap()));
    }
}
