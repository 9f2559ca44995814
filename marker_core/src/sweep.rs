//! Startup sweep: one marker for every offline player with a record on disk.

use player_record::{read_record, resolve_player_state, PlayerState, RecordSource};
use serde::Serialize;

use crate::host::{KnownPlayer, MarkerStore, PlayerDirectory, WorldLookup};
use crate::reconciler::{
    log_player_failure, MarkerReconciler, ReconcileError, RecordError, UpsertOutcome,
};

/// Per-outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub considered: usize,
    pub added: usize,
    pub online: usize,
    pub expired: usize,
    pub hidden_by_host: usize,
    pub hidden_game_mode: usize,
    pub unmapped: usize,
    pub missing_record: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record_outcome(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Added { .. } => self.added += 1,
            UpsertOutcome::HiddenByHost => self.hidden_by_host += 1,
            UpsertOutcome::HiddenGameMode => self.hidden_game_mode += 1,
            UpsertOutcome::NoRenderedMaps => self.unmapped += 1,
        }
    }

    /// Players that ended up without a marker for any reason.
    pub fn skipped(&self) -> usize {
        self.considered - self.added
    }
}

impl MarkerReconciler {
    /// Place a marker for every known offline player.
    ///
    /// Records are decoded one at a time; a player whose record is missing or
    /// unusable is logged once and skipped. Only an unavailable renderer
    /// aborts the sweep.
    pub fn sweep_offline<S, D, W, R>(
        &self,
        store: &mut S,
        directory: &D,
        worlds: &W,
        records: &R,
        now_epoch_millis: i64,
    ) -> Result<SweepReport, ReconcileError>
    where
        S: MarkerStore + ?Sized,
        D: PlayerDirectory + ?Sized,
        W: WorldLookup + ?Sized,
        R: RecordSource + ?Sized,
    {
        let mut report = SweepReport::default();
        if !store.is_available() {
            tracing::error!(
                target: "offline_markers::sweep",
                "sweep.aborted=renderer_unavailable"
            );
            return Err(ReconcileError::HostUnavailable);
        }
        if !records.is_available() {
            tracing::warn!(
                target: "offline_markers::sweep",
                "sweep.skipped=no_player_data"
            );
            return Ok(report);
        }

        for known in directory.known_players() {
            report.considered += 1;
            if known.online {
                report.online += 1;
                continue;
            }
            if self
                .policy()
                .is_expired(known.last_seen_epoch_millis, now_epoch_millis)
            {
                tracing::debug!(
                    target: "offline_markers::sweep",
                    player = %known.identity,
                    last_seen = known.last_seen_epoch_millis,
                    "sweep.player_skipped=expired"
                );
                report.expired += 1;
                continue;
            }

            let name = directory.display_name(&known);
            let state = match self.load_state(records, &known, name.clone()) {
                Ok(state) => state,
                Err(err) => {
                    log_player_failure(known.identity, name.as_deref(), &err);
                    match err {
                        RecordError::MissingRecord => report.missing_record += 1,
                        _ => report.failed += 1,
                    }
                    continue;
                }
            };

            match self.place(store, worlds, &state) {
                Ok(outcome) => report.record_outcome(outcome),
                Err(ReconcileError::Player { player, source }) => {
                    log_player_failure(player, name.as_deref(), &source);
                    report.failed += 1;
                }
                Err(fatal) => return Err(fatal),
            }
        }

        tracing::info!(
            target: "offline_markers::sweep",
            considered = report.considered,
            added = report.added,
            online = report.online,
            expired = report.expired,
            hidden = report.hidden_by_host + report.hidden_game_mode,
            unmapped = report.unmapped,
            missing_record = report.missing_record,
            failed = report.failed,
            "sweep.completed"
        );
        Ok(report)
    }

    fn load_state<R: RecordSource + ?Sized>(
        &self,
        records: &R,
        known: &KnownPlayer,
        name: Option<String>,
    ) -> Result<PlayerState, RecordError> {
        let tree = read_record(records, self.decoder(), known.identity)?
            .ok_or(RecordError::MissingRecord)?;
        let state = resolve_player_state(&tree, known.last_seen_epoch_millis, known.identity)?;
        Ok(state.with_display_name(name))
    }
}
