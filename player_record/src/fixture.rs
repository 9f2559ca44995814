//! Record builders for tests and benchmarks.
//!
//! Compiled only for this crate's tests or with the `fixtures` feature; the
//! production path never writes records.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::resolve::{
    DIMENSION_KEY, GAME_MODE_KEY, POSITION_KEY, WORLD_UUID_LEAST_KEY, WORLD_UUID_MOST_KEY,
};
use crate::tag::{TagKind, TagList, TagValue};

/// Build a compound from `(name, value)` pairs.
pub fn compound<'a>(entries: impl IntoIterator<Item = (&'a str, TagValue)>) -> TagValue {
    TagValue::Compound(
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

/// Build a list of doubles.
pub fn doubles(values: &[f64]) -> TagValue {
    let items = values.iter().copied().map(TagValue::Double).collect();
    TagValue::List(TagList::new(TagKind::Double, items).expect("doubles are homogeneous"))
}

/// A string tag, carried as an undecoded payload.
pub fn string(value: &str) -> TagValue {
    TagValue::Other {
        kind: TagKind::String,
        payload: value.as_bytes().to_vec(),
    }
}

/// World identity variants found across record generations.
#[derive(Debug, Clone, Copy)]
pub enum FixtureWorld {
    Uuid { most: i64, least: i64 },
    LegacyDimension(i32),
    Both { most: i64, least: i64, dimension: i32 },
    Missing,
}

/// A plausible player record with the given position, game mode and world.
pub fn player_tree(position: [f64; 3], game_mode: i32, world: FixtureWorld) -> TagValue {
    let mut entries = vec![
        (POSITION_KEY, doubles(&position)),
        (GAME_MODE_KEY, TagValue::Int(game_mode)),
        ("DataVersion", TagValue::Int(3465)),
        ("Rotation", rotation()),
        ("Inventory", TagValue::List(TagList::empty(TagKind::Compound))),
        (
            "abilities",
            compound([("mayfly", byte(0)), ("flying", byte(0))]),
        ),
    ];
    match world {
        FixtureWorld::Uuid { most, least } => {
            entries.push((WORLD_UUID_MOST_KEY, TagValue::Long(most)));
            entries.push((WORLD_UUID_LEAST_KEY, TagValue::Long(least)));
        }
        FixtureWorld::LegacyDimension(dimension) => {
            entries.push((DIMENSION_KEY, TagValue::Int(dimension)));
        }
        FixtureWorld::Both {
            most,
            least,
            dimension,
        } => {
            entries.push((WORLD_UUID_MOST_KEY, TagValue::Long(most)));
            entries.push((WORLD_UUID_LEAST_KEY, TagValue::Long(least)));
            entries.push((DIMENSION_KEY, TagValue::Int(dimension)));
        }
        FixtureWorld::Missing => {}
    }
    compound(entries)
}

/// Gzip-compressed bytes of [`player_tree`], as the game stores them.
pub fn player_record_bytes(position: [f64; 3], game_mode: i32, world: FixtureWorld) -> Vec<u8> {
    gzip(&encode_record("", &player_tree(position, game_mode, world)))
}

fn byte(value: i8) -> TagValue {
    TagValue::Other {
        kind: TagKind::Byte,
        payload: value.to_be_bytes().to_vec(),
    }
}

fn rotation() -> TagValue {
    let items = [90.0f32, 0.0]
        .iter()
        .map(|angle| TagValue::Other {
            kind: TagKind::Float,
            payload: angle.to_be_bytes().to_vec(),
        })
        .collect();
    TagValue::List(TagList::new(TagKind::Float, items).expect("floats are homogeneous"))
}

/// Encode `root` as a named root tag.
pub fn encode_record(root_name: &str, root: &TagValue) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(root.kind().as_u8());
    write_name(&mut out, root_name);
    write_payload(&mut out, root);
    out
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("in-memory gzip write");
    encoder.finish().expect("in-memory gzip finish")
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(&(name.len() as u16).to_be_bytes());
    out.extend_from_slice(name.as_bytes());
}

fn write_payload(out: &mut Vec<u8>, value: &TagValue) {
    match value {
        TagValue::Compound(entries) => {
            for (name, child) in entries {
                out.push(child.kind().as_u8());
                write_name(out, name);
                write_payload(out, child);
            }
            out.push(TagKind::End.as_u8());
        }
        TagValue::List(list) => {
            out.push(list.kind().as_u8());
            out.extend_from_slice(&(list.len() as i32).to_be_bytes());
            for item in list.items() {
                write_payload(out, item);
            }
        }
        TagValue::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        TagValue::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        TagValue::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
        TagValue::Other { kind, payload } => {
            match kind {
                TagKind::String => {
                    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
                }
                TagKind::ByteArray => {
                    out.extend_from_slice(&(payload.len() as i32).to_be_bytes());
                }
                TagKind::IntArray => {
                    out.extend_from_slice(&((payload.len() / 4) as i32).to_be_bytes());
                }
                TagKind::LongArray => {
                    out.extend_from_slice(&((payload.len() / 8) as i32).to_be_bytes());
                }
                _ => {}
            }
            out.extend_from_slice(payload);
        }
    }
}
