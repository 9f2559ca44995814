//! Marker records written to the renderer's marker store.

use chrono::DateTime;
use player_record::{PlayerState, Position};
use serde::Serialize;

/// Id of the marker set holding offline players on every map.
pub const MARKER_SET_ID: &str = "offline-players";

/// Vertical offset from feet to head, matching the renderer's own markers for
/// online players.
pub const HEAD_HEIGHT: f64 = 1.8;

pub const OFFLINE_STYLE_CLASS: &str = "bmopm-offline-player";

pub const UNKNOWN_NAME: &str = "[Unknown]";

/// Presentation of a marker set, applied only when the set is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerSetConfig {
    pub label: String,
    pub toggleable: bool,
    pub default_hidden: bool,
}

/// One point marker, keyed by player identity within a map's marker set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerRecord {
    pub key: String,
    pub label: String,
    pub detail_html: String,
    /// Icon address; icons are stored per map, so this differs between maps.
    pub icon_ref: String,
    pub icon_anchor: (i32, i32),
    pub position: Position,
    pub style_classes: Vec<String>,
}

impl MarkerRecord {
    /// Marker for `state` without an icon.
    pub fn for_player(state: &PlayerState) -> Self {
        Self {
            key: state.identity.to_string(),
            label: marker_label(state),
            detail_html: marker_detail(state),
            icon_ref: String::new(),
            // Centered by the stylesheet.
            icon_anchor: (0, 0),
            position: state.position.raised(HEAD_HEIGHT),
            style_classes: vec![OFFLINE_STYLE_CLASS.to_string()],
        }
    }

    pub fn with_icon(mut self, icon_ref: String) -> Self {
        self.icon_ref = icon_ref;
        self
    }
}

/// The display name, else the textual identity.
pub fn marker_label(state: &PlayerState) -> String {
    match &state.display_name {
        Some(name) => name.clone(),
        None => state.identity.to_string(),
    }
}

pub fn marker_detail(state: &PlayerState) -> String {
    let name = state
        .display_name
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    format!(
        "{name} <i>(offline)</i><br><bmopm-datetime data-timestamp={ms}>{when}</bmopm-datetime>",
        ms = state.last_seen_epoch_millis,
        when = format_last_seen(state.last_seen_epoch_millis),
    )
}

/// UTC rendering of a last-seen timestamp; the web client replaces it with
/// local time.
pub fn format_last_seen(epoch_millis: i64) -> String {
    match DateTime::from_timestamp_millis(epoch_millis) {
        Some(time) => time.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => epoch_millis.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_record::{GameMode, PlayerId, WorldReference};

    fn state(name: Option<&str>) -> PlayerState {
        PlayerState {
            identity: PlayerId::from_u128(0x069a79f4_44e9_4726_a5be_fca90e38aaf5),
            display_name: name.map(str::to_string),
            world_ref: WorldReference::ByLegacyDimensionId(0),
            position: Position::new(12.0, 64.0, -8.0),
            game_mode: GameMode::Survival,
            last_seen_epoch_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn named_player_detail() {
        insta::assert_snapshot!(
            marker_detail(&state(Some("Notch"))),
            @"Notch <i>(offline)</i><br><bmopm-datetime data-timestamp=1700000000000>2023-11-14 22:13 UTC</bmopm-datetime>"
        );
    }

    #[test]
    fn unnamed_player_uses_identity_and_unknown() {
        let unnamed = state(None);
        assert_eq!(
            marker_label(&unnamed),
            "069a79f4-44e9-4726-a5be-fca90e38aaf5"
        );
        insta::assert_snapshot!(
            marker_detail(&unnamed),
            @"[Unknown] <i>(offline)</i><br><bmopm-datetime data-timestamp=1700000000000>2023-11-14 22:13 UTC</bmopm-datetime>"
        );
    }

    #[test]
    fn marker_sits_at_head_height() {
        let marker = MarkerRecord::for_player(&state(Some("Notch")));
        assert_eq!(marker.position, Position::new(12.0, 65.8, -8.0));
        assert_eq!(marker.label, "Notch");
        assert_eq!(marker.key, "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert_eq!(marker.style_classes, vec![OFFLINE_STYLE_CLASS.to_string()]);
        assert!(marker.icon_ref.is_empty());
    }

    #[test]
    fn names_are_escaped_in_detail_only() {
        let odd = state(Some("<b>&"));
        assert_eq!(marker_label(&odd), "<b>&");
        assert!(marker_detail(&odd).starts_with("&lt;b&gt;&amp; <i>"));
    }

    #[test]
    fn out_of_range_timestamp_falls_back_to_millis() {
        assert_eq!(format_last_seen(i64::MAX), i64::MAX.to_string());
        assert_eq!(format_last_seen(0), "1970-01-01 00:00 UTC");
    }
}
