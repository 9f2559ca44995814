//! Binary record decoding.
//!
//! A record is a big-endian tree: one named root compound, where every entry
//! is `kind byte + u16-prefixed name + payload` and the payload shape follows
//! from the kind. Records written by the game are usually gzip-compressed;
//! those are inflated before parsing.

use std::collections::BTreeMap;
use std::io::{self, Read};

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::tag::{TagKind, TagList, TagValue};

/// Nesting limit for compounds and lists.
pub const MAX_DEPTH: usize = 512;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Error returned when a record cannot be turned into a [`TagValue`] tree.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read record: {0}")]
    Io(#[source] io::Error),
    #[error("failed to inflate compressed record: {0}")]
    Compression(#[source] io::Error),
    #[error("record truncated after {offset} bytes while reading {context}")]
    Truncated {
        offset: usize,
        context: &'static str,
    },
    #[error("malformed record header: {detail}")]
    MalformedHeader { detail: String },
    #[error("unknown tag kind {kind} at offset {offset}")]
    UnknownTagKind { kind: u8, offset: usize },
    #[error("end tag used as a value at offset {offset}")]
    MisplacedEnd { offset: usize },
    #[error("negative length {length} at offset {offset}")]
    NegativeLength { length: i32, offset: usize },
    #[error("tag nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
}

/// Decodes one record into a tag tree without interpreting field names.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder {
    max_depth: usize,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Read the whole stream and decode it.
    pub fn decode<R: Read>(&self, mut reader: R) -> Result<TagValue, DecodeError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).map_err(DecodeError::Io)?;
        self.decode_bytes(&raw)
    }

    /// Decode an in-memory record, inflating it first if it is gzip-framed.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<TagValue, DecodeError> {
        if bytes.starts_with(&GZIP_MAGIC) {
            let mut inflated = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut inflated)
                .map_err(|err| match err.kind() {
                    io::ErrorKind::UnexpectedEof => DecodeError::Truncated {
                        offset: bytes.len(),
                        context: "compressed stream",
                    },
                    _ => DecodeError::Compression(err),
                })?;
            return self.parse(&inflated);
        }
        self.parse(bytes)
    }

    fn parse(&self, bytes: &[u8]) -> Result<TagValue, DecodeError> {
        let mut parser = Parser {
            bytes,
            offset: 0,
            max_depth: self.max_depth,
        };

        let root_kind = match bytes.first() {
            Some(kind) => *kind,
            None => {
                return Err(DecodeError::MalformedHeader {
                    detail: "record is empty".to_string(),
                })
            }
        };
        if root_kind != TagKind::Compound.as_u8() {
            return Err(DecodeError::MalformedHeader {
                detail: format!("root tag kind {root_kind} is not a compound"),
            });
        }
        parser.offset = 1;
        let _root_name = parser.read_name()?;
        parser.read_payload(TagKind::Compound, 0)
    }
}

/// Decode a record with the default limits.
pub fn decode_record<R: Read>(reader: R) -> Result<TagValue, DecodeError> {
    RecordDecoder::default().decode(reader)
}

struct Parser<'a> {
    bytes: &'a [u8],
    offset: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::Truncated {
                offset: self.bytes.len(),
                context,
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let slice = self.take(N, context)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_kind(&mut self, context: &'static str) -> Result<TagKind, DecodeError> {
        let offset = self.offset;
        let [raw] = self.array::<1>(context)?;
        TagKind::from_u8(raw).ok_or(DecodeError::UnknownTagKind { kind: raw, offset })
    }

    fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = u16::from_be_bytes(self.array("tag name length")?) as usize;
        let raw = self.take(len, "tag name")?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    fn read_length(&mut self, context: &'static str) -> Result<usize, DecodeError> {
        let offset = self.offset;
        let length = i32::from_be_bytes(self.array(context)?);
        usize::try_from(length).map_err(|_| DecodeError::NegativeLength { length, offset })
    }

    fn read_array_payload(
        &mut self,
        element_size: usize,
        context: &'static str,
    ) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_length(context)?;
        let byte_len = len.checked_mul(element_size).ok_or(DecodeError::Truncated {
            offset: self.bytes.len(),
            context,
        })?;
        Ok(self.take(byte_len, context)?.to_vec())
    }

    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > self.max_depth {
            Err(DecodeError::DepthExceeded {
                limit: self.max_depth,
            })
        } else {
            Ok(())
        }
    }

    fn read_payload(&mut self, kind: TagKind, depth: usize) -> Result<TagValue, DecodeError> {
        let value = match kind {
            TagKind::End => {
                return Err(DecodeError::MisplacedEnd {
                    offset: self.offset,
                })
            }
            TagKind::Int => TagValue::Int(i32::from_be_bytes(self.array("int")?)),
            TagKind::Long => TagValue::Long(i64::from_be_bytes(self.array("long")?)),
            TagKind::Double => TagValue::Double(f64::from_be_bytes(self.array("double")?)),
            TagKind::Byte => other(kind, self.take(1, "byte")?),
            TagKind::Short => other(kind, self.take(2, "short")?),
            TagKind::Float => other(kind, self.take(4, "float")?),
            TagKind::String => {
                let len = u16::from_be_bytes(self.array("string length")?) as usize;
                other(kind, self.take(len, "string")?)
            }
            TagKind::ByteArray => TagValue::Other {
                kind,
                payload: self.read_array_payload(1, "byte array")?,
            },
            TagKind::IntArray => TagValue::Other {
                kind,
                payload: self.read_array_payload(4, "int array")?,
            },
            TagKind::LongArray => TagValue::Other {
                kind,
                payload: self.read_array_payload(8, "long array")?,
            },
            TagKind::List => {
                self.check_depth(depth)?;
                let element_kind = self.read_kind("list element kind")?;
                let len = self.read_length("list length")?;
                let mut list = TagList::empty(element_kind);
                // Never trust the prefix for allocation beyond what is left.
                let capacity = list_capacity(len, self.remaining(), element_kind);
                let mut items = Vec::with_capacity(capacity);
                for _ in 0..len {
                    items.push(self.read_payload(element_kind, depth + 1)?);
                }
                for item in items {
                    list.push_unchecked(item);
                }
                TagValue::List(list)
            }
            TagKind::Compound => {
                self.check_depth(depth)?;
                let mut entries = BTreeMap::new();
                loop {
                    let entry_kind = self.read_kind("compound entry kind")?;
                    if entry_kind == TagKind::End {
                        break;
                    }
                    let name = self.read_name()?;
                    let value = self.read_payload(entry_kind, depth + 1)?;
                    // Later duplicates replace earlier ones, keeping keys unique.
                    entries.insert(name, value);
                }
                TagValue::Compound(entries)
            }
        };
        Ok(value)
    }
}

/// Elements worth reserving for a list: no more than `remaining` bytes could
/// hold.
fn list_capacity(len: usize, remaining: usize, kind: TagKind) -> usize {
    len.min(remaining / min_encoded_size(kind))
}

/// Fewest payload bytes one value of `kind` occupies.
fn min_encoded_size(kind: TagKind) -> usize {
    match kind {
        TagKind::End | TagKind::Byte | TagKind::Compound => 1,
        TagKind::Short | TagKind::String => 2,
        TagKind::Int
        | TagKind::Float
        | TagKind::ByteArray
        | TagKind::IntArray
        | TagKind::LongArray => 4,
        TagKind::List => 5,
        TagKind::Long | TagKind::Double => 8,
    }
}

fn other(kind: TagKind, payload: &[u8]) -> TagValue {
    TagValue::Other {
        kind,
        payload: payload.to_vec(),
    }
}
