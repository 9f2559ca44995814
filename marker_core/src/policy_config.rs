//! Marker policy configuration.
//!
//! Loaded from `policy_config.json` with support for an environment variable
//! override; the builtin copy is used when no override is set or it fails to
//! load.

use std::{
    collections::BTreeSet,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use player_record::GameMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marker::MarkerSetConfig;

pub const BUILTIN_POLICY_CONFIG: &str = include_str!("data/policy_config.json");

/// Environment variable naming an override config file.
pub const POLICY_CONFIG_ENV: &str = "OFFLINE_MARKERS_CONFIG_PATH";

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Which offline players get markers and how the marker set is presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub marker_set_label: String,
    pub toggleable: bool,
    pub default_hidden: bool,
    /// Players unseen for longer than this get no new marker. `0` disables
    /// expiry.
    pub expire_after_hours: i64,
    pub hidden_game_modes: BTreeSet<GameMode>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            marker_set_label: "Offline Players".to_string(),
            toggleable: true,
            default_hidden: false,
            expire_after_hours: 0,
            hidden_game_modes: BTreeSet::from([GameMode::Spectator]),
        }
    }
}

impl PolicyConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_POLICY_CONFIG)
                .expect("builtin policy config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| PolicyConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = PolicyConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn hides(&self, mode: GameMode) -> bool {
        self.hidden_game_modes.contains(&mode)
    }

    /// True when expiry is enabled and the player was last seen longer ago
    /// than the threshold.
    pub fn is_expired(&self, last_seen_epoch_millis: i64, now_epoch_millis: i64) -> bool {
        if self.expire_after_hours <= 0 {
            return false;
        }
        let threshold = self.expire_after_hours.saturating_mul(MILLIS_PER_HOUR);
        now_epoch_millis.saturating_sub(last_seen_epoch_millis) > threshold
    }

    pub fn marker_set_config(&self) -> MarkerSetConfig {
        MarkerSetConfig {
            label: self.marker_set_label.clone(),
            toggleable: self.toggleable,
            default_hidden: self.default_hidden,
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyConfigError {
    #[error("failed to parse policy config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read policy config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Metadata about where the active policy came from.
#[derive(Debug, Clone)]
pub struct PolicyConfigMetadata {
    path: Option<PathBuf>,
}

impl PolicyConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// `None` when the builtin copy is in use.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the policy from `OFFLINE_MARKERS_CONFIG_PATH`, falling back to the
/// builtin copy.
pub fn load_policy_config_from_env() -> (Arc<PolicyConfig>, PolicyConfigMetadata) {
    let override_path = env::var(POLICY_CONFIG_ENV).ok().map(PathBuf::from);
    load_policy_config(override_path.as_deref())
}

pub fn load_policy_config(path: Option<&Path>) -> (Arc<PolicyConfig>, PolicyConfigMetadata) {
    if let Some(path) = path {
        match PolicyConfig::from_file(path) {
            Ok(config) => {
                tracing::info!(
                    target: "offline_markers::config",
                    path = %path.display(),
                    "policy_config.loaded=file"
                );
                return (
                    Arc::new(config),
                    PolicyConfigMetadata::new(Some(path.to_path_buf())),
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "offline_markers::config",
                    path = %path.display(),
                    error = %err,
                    "policy_config.load_failed"
                );
            }
        }
    }

    let config = PolicyConfig::builtin();
    tracing::info!(
        target: "offline_markers::config",
        "policy_config.loaded=builtin"
    );
    (config, PolicyConfigMetadata::new(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_matches_defaults() {
        let builtin = PolicyConfig::builtin();
        assert_eq!(*builtin, PolicyConfig::default());
        assert!(builtin.hides(GameMode::Spectator));
        assert!(!builtin.hides(GameMode::Survival));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            PolicyConfig::from_json_str(r#"{ "hidden_game_modes": ["creative", "unknown"] }"#)
                .expect("parse");
        assert!(config.hides(GameMode::Creative));
        assert!(config.hides(GameMode::Unknown));
        assert!(!config.hides(GameMode::Spectator));
        assert_eq!(config.marker_set_label, "Offline Players");
        assert!(config.toggleable);
    }

    #[test]
    fn unknown_game_mode_name_is_a_parse_error() {
        let err = PolicyConfig::from_json_str(r#"{ "hidden_game_modes": ["hardcore"] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn expiry_disabled_when_zero_or_negative() {
        let mut config = PolicyConfig::default();
        assert!(!config.is_expired(0, i64::MAX));
        config.expire_after_hours = -5;
        assert!(!config.is_expired(0, i64::MAX));
    }

    #[test]
    fn expiry_threshold_is_exclusive() {
        let config = PolicyConfig {
            expire_after_hours: 2,
            ..PolicyConfig::default()
        };
        let now = 10 * MILLIS_PER_HOUR;
        assert!(!config.is_expired(now - 2 * MILLIS_PER_HOUR, now));
        assert!(config.is_expired(now - 2 * MILLIS_PER_HOUR - 1, now));
        assert!(!config.is_expired(now + 1000, now));
    }

    #[test]
    fn missing_override_falls_back_to_builtin() {
        let (config, metadata) =
            load_policy_config(Some(Path::new("/nonexistent/offline_markers.json")));
        assert!(metadata.path().is_none());
        assert_eq!(*config, PolicyConfig::default());
    }

    #[test]
    fn read_error_names_the_path() {
        let err = PolicyConfig::from_file(Path::new("/nonexistent/policy.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/policy.json"));
    }
}
