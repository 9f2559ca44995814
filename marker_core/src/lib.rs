//! Offline player markers for a web map renderer.
//!
//! [`MarkerReconciler`] keeps exactly one marker per offline player on every
//! rendered map of the player's last world. Host capabilities (player
//! registry, world lookup, marker store) come in through the traits in
//! [`host`]; records are read through [`player_record::RecordSource`].

pub mod host;
mod marker;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
mod policy_config;
mod reconciler;
mod sweep;

pub use host::{
    ensure_marker_set, KnownPlayer, MapId, MarkerSetHandle, MarkerStore, PlayerDirectory,
    StaticWorlds, WorldHandle, WorldLookup,
};
pub use marker::{
    format_last_seen, marker_detail, marker_label, MarkerRecord, MarkerSetConfig, HEAD_HEIGHT,
    MARKER_SET_ID, OFFLINE_STYLE_CLASS, UNKNOWN_NAME,
};
pub use policy_config::{
    load_policy_config, load_policy_config_from_env, PolicyConfig, PolicyConfigError,
    PolicyConfigMetadata, BUILTIN_POLICY_CONFIG, POLICY_CONFIG_ENV,
};
pub use reconciler::{MarkerReconciler, ReconcileError, RecordError, UpsertOutcome};
pub use sweep::SweepReport;
