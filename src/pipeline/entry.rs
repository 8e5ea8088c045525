//! Cache entry layout.
//!
//! ```text
//! +------+-----+-----+---------+----------------+------+---------+
//! | 0x00 | 'Q' | 'F' | version | representation | kind | payload |
//! +------+-----+-----+---------+----------------+------+---------+
//! ```
//!
//! JSON documents never start with `0x00` and neither do protobuf messages
//! (field number 0 is reserved), so a tagged entry cannot be confused with
//! a bare body. Bare bodies written without the header are still readable;
//! their representation is sniffed from the first byte.

use bytes::{BufMut, Bytes, BytesMut};

use crate::api::Representation;
use crate::pipeline::classify::ResponseKind;

const MAGIC: [u8; 3] = [0x00, b'Q', b'F'];
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 3;

const REPR_JSON: u8 = 0;
const REPR_PROTOBUF: u8 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("cache entry header truncated")]
    Truncated,

    #[error("unsupported cache entry version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown representation tag {0}")]
    UnknownRepresentation(u8),

    #[error("unknown response kind tag {0}")]
    UnknownKind(u8),
}

/// A decoded cache value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Kind recorded at write time; `None` for bare entries.
    pub kind: Option<ResponseKind>,
    pub representation: Representation,
    pub payload: Bytes,
}

impl CacheEntry {
    pub fn new(kind: ResponseKind, representation: Representation, payload: Bytes) -> Self {
        Self {
            kind: Some(kind),
            representation,
            payload,
        }
    }

    /// Serialize with the header. Bare entries are written tagged as uncacheable.
    pub fn encode(&self) -> Bytes {
        let repr = match self.representation {
            Representation::Json => REPR_JSON,
            Representation::Protobuf => REPR_PROTOBUF,
        };
        let kind = self.kind.unwrap_or(ResponseKind::Uncacheable);

        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_slice(&MAGIC);
        buf.put_u8(VERSION);
        buf.put_u8(repr);
        buf.put_u8(kind as u8);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    pub fn decode(raw: Bytes) -> Result<Self, EntryError> {
        if raw.first() != Some(&MAGIC[0]) {
            return Ok(Self {
                kind: None,
                representation: Representation::sniff(&raw),
                payload: raw,
            });
        }

        if raw.len() < HEADER_LEN || raw[..MAGIC.len()] != MAGIC {
            return Err(EntryError::Truncated);
        }

        let version = raw[3];
        if version != VERSION {
            return Err(EntryError::UnsupportedVersion(version));
        }

        let representation = match raw[4] {
            REPR_JSON => Representation::Json,
            REPR_PROTOBUF => Representation::Protobuf,
            other => return Err(EntryError::UnknownRepresentation(other)),
        };

        let kind = ResponseKind::from_u8(raw[5]).ok_or(EntryError::UnknownKind(raw[5]))?;

        Ok(Self {
            kind: Some(kind),
            representation,
            payload: raw.slice(HEADER_LEN..),
        })
    }

    /// Size of the encoded entry for a payload of `payload_len` bytes.
    pub fn encoded_len(payload_len: usize) -> usize {
        HEADER_LEN + payload_len
    }
}
