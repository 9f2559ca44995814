use std::fmt::Write as _;

use marker_core::{MarkerRecord, PolicyConfig};
use player_record::{PlayerState, TagValue};
use serde::Serialize;

/// Indented dump of a decoded tree, one tag per line.
pub fn render_tree(root: &TagValue) -> String {
    let mut out = String::new();
    write_tag(&mut out, "", root, 0);
    out
}

fn write_tag(out: &mut String, name: &str, value: &TagValue, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = if name.is_empty() {
        String::new()
    } else {
        format!("{name}: ")
    };
    match value {
        TagValue::Compound(entries) => {
            let _ = writeln!(out, "{indent}{label}{}", value.describe());
            for (key, child) in entries {
                write_tag(out, key, child, depth + 1);
            }
        }
        TagValue::List(list) => {
            let _ = writeln!(out, "{indent}{label}{}", value.describe());
            for (index, item) in list.items().iter().enumerate() {
                write_tag(out, &format!("[{index}]"), item, depth + 1);
            }
        }
        TagValue::Int(v) => {
            let _ = writeln!(out, "{indent}{label}int {v}");
        }
        TagValue::Long(v) => {
            let _ = writeln!(out, "{indent}{label}long {v}");
        }
        TagValue::Double(v) => {
            let _ = writeln!(out, "{indent}{label}double {v}");
        }
        TagValue::Other { payload, .. } => {
            let _ = writeln!(
                out,
                "{indent}{label}{} ({} bytes)",
                value.describe(),
                payload.len()
            );
        }
    }
}

/// Whether the current policy would give a player a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Shown,
    HiddenGameMode,
    Expired,
}

pub fn verdict(policy: &PolicyConfig, state: &PlayerState, now_epoch_millis: i64) -> Verdict {
    if policy.is_expired(state.last_seen_epoch_millis, now_epoch_millis) {
        Verdict::Expired
    } else if policy.hides(state.game_mode) {
        Verdict::HiddenGameMode
    } else {
        Verdict::Shown
    }
}

#[derive(Debug, Serialize)]
pub struct Preview<'a> {
    pub verdict: Verdict,
    pub marker_set: &'a str,
    pub marker: MarkerRecord,
}
