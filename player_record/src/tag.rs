//! In-memory tree for decoded player records.
//!
//! Only the shapes needed to recover a player's position, game mode and world
//! are modeled structurally. Every other kind is kept as raw payload bytes in
//! [`TagValue::Other`] so the tree stays faithful to the record without being
//! interpreted.

use std::collections::BTreeMap;
use std::fmt;

/// Wire identifier of a tag kind.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Convert from the wire byte, returning `None` for unassigned kinds.
    pub fn from_u8(value: u8) -> Option<Self> {
        let kind = match value {
            0 => Self::End,
            1 => Self::Byte,
            2 => Self::Short,
            3 => Self::Int,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::ByteArray,
            8 => Self::String,
            9 => Self::List,
            10 => Self::Compound,
            11 => Self::IntArray,
            12 => Self::LongArray,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::ByteArray => "byte_array",
            Self::String => "string",
            Self::List => "list",
            Self::Compound => "compound",
            Self::IntArray => "int_array",
            Self::LongArray => "long_array",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list whose elements all share one declared kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TagList {
    kind: TagKind,
    items: Vec<TagValue>,
}

impl TagList {
    /// Build a list, rejecting elements whose kind differs from `kind`.
    pub fn new(kind: TagKind, items: Vec<TagValue>) -> Option<Self> {
        if items.iter().all(|item| item.kind() == kind) {
            Some(Self { kind, items })
        } else {
            None
        }
    }

    pub fn empty(kind: TagKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    /// Element kind declared by the record, also meaningful for empty lists.
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn items(&self) -> &[TagValue] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // Callers guarantee `item.kind() == self.kind`.
    pub(crate) fn push_unchecked(&mut self, item: TagValue) {
        debug_assert_eq!(item.kind(), self.kind);
        self.items.push(item);
    }
}

/// One decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Compound(BTreeMap<String, TagValue>),
    List(TagList),
    Int(i32),
    Long(i64),
    Double(f64),
    /// Kinds that are carried through undecoded. `payload` holds the value
    /// bytes without any length prefix.
    Other { kind: TagKind, payload: Vec<u8> },
}

impl TagValue {
    pub fn kind(&self) -> TagKind {
        match self {
            Self::Compound(_) => TagKind::Compound,
            Self::List(_) => TagKind::List,
            Self::Int(_) => TagKind::Int,
            Self::Long(_) => TagKind::Long,
            Self::Double(_) => TagKind::Double,
            Self::Other { kind, .. } => *kind,
        }
    }

    /// Look up a named child when `self` is a compound.
    pub fn get(&self, name: &str) -> Option<&TagValue> {
        match self {
            Self::Compound(entries) => entries.get(name),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&BTreeMap<String, TagValue>> {
        match self {
            Self::Compound(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TagList> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// Short human-readable shape, used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::List(list) => format!("list<{}>[{}]", list.kind(), list.len()),
            Self::Compound(entries) => format!("compound{{{}}}", entries.len()),
            other => other.kind().to_string(),
        }
    }
}
