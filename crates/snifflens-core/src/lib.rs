//! SniffLens core library for decoding captured game-protocol traffic.
//!
//! This crate implements the decoding engine used by the handler catalogues:
//! packet feeds hand raw payloads to the dispatcher, which resolves a decode
//! routine per opcode, direction and client build, runs it over a bit-level
//! wire reader, and collects the result into an ordered field capture.
//! Decoding is payload-oriented and side-effect free apart from the shared
//! record store; all I/O stays behind the `PacketFeed` seam. Wire
//! conventions (bit order, packed identifiers, alignment) are captured in
//! the reader so routines stay minimal and uniform.
//!
//! Invariants:
//! - Captured fields appear in exact wire order, with stable index paths.
//! - A failing packet never aborts a batch; it is downgraded in place.
//! - Byte reads on an unaligned cursor fail loudly, never silently realign.
//! - Routines never branch on the client build; version drift lives in the
//!   registry as separate registrations.
//!
//! Version française (résumé):
//! Cette crate fournit le moteur de décodage : flux de paquets -> résolution
//! par opcode/version -> lecteur binaire (bits et octets) -> capture ordonnée
//! des champs. Les erreurs restent locales au paquet, le registre est figé au
//! démarrage et partagé sans verrou. Voir `DecodeContext` pour l'API des
//! routines.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//!
//! use snifflens_core::{
//!     BuildId, DecodeContext, Decoder, Direction, MemoryStore, ParseStatus, RawPacket,
//!     RegistryBuilder, RouteKey, VersionRange, WireError,
//! };
//!
//! fn ping(ctx: &mut DecodeContext) -> Result<(), WireError> {
//!     ctx.read_u32("Token")?;
//!     Ok(())
//! }
//!
//! let mut routes = RegistryBuilder::new();
//! routes.register(
//!     RouteKey::new(0x0042, Direction::ClientToServer),
//!     VersionRange::since(BuildId(19033)),
//!     "CMSG_PING",
//!     ping,
//! );
//! let decoder = Decoder::new(
//!     routes.freeze()?,
//!     RegistryBuilder::new().freeze()?,
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! let decoded = decoder.decode(RawPacket {
//!     opcode: 0x0042,
//!     direction: Direction::ClientToServer,
//!     build: BuildId(19033),
//!     sequence: 0,
//!     timestamp: None,
//!     payload: vec![7, 0, 0, 0],
//! });
//! assert_eq!(decoded.status, ParseStatus::Success);
//! assert_eq!(decoded.opcode_name.as_deref(), Some("CMSG_PING"));
//! # Ok::<(), snifflens_core::RegistryError>(())
//! ```

use serde::{Deserialize, Serialize};

mod decode;
mod dispatch;
mod feed;
mod registry;
mod store;
mod wire;

pub use decode::{DecodeContext, EmbeddedRow, FieldSink};
pub use dispatch::{BatchOptions, BatchReport, BatchSummary, CancelToken, Decoder};
pub use feed::{FeedError, MemoryFeed, PacketFeed};
pub use registry::{
    DecodeFn, Handler, Registry, RegistryBuilder, RegistryError, RouteKey, TableKey, VersionRange,
};
pub use store::{MemoryStore, RecordStore};
pub use wire::{PacketReader, WireError};

/// Direction a packet travelled on the wire.
///
/// # Examples
/// ```
/// use snifflens_core::Direction;
///
/// assert_ne!(Direction::ClientToServer, Direction::ServerToClient);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client_to_server"),
            Direction::ServerToClient => write!(f, "server_to_client"),
        }
    }
}

/// Ordinal client build number.
///
/// Builds only need to be ordered; the mapping from release strings to
/// ordinals is supplied by a [`BuildCatalog`] implementation.
///
/// # Examples
/// ```
/// use snifflens_core::BuildId;
///
/// assert!(BuildId(19033) < BuildId(19103));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct BuildId(pub u32);

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps client release strings to ordinal build identifiers.
///
/// Implemented by the handler catalogue; the engine itself only compares
/// ordinals.
pub trait BuildCatalog {
    fn resolve(&self, version: &str) -> Option<BuildId>;
}

/// A captured packet as handed over by the capture collaborator.
///
/// Immutable once constructed. `sequence` is the capture-order index used to
/// keep batch output in the original order.
///
/// # Examples
/// ```
/// use snifflens_core::{BuildId, Direction, RawPacket};
///
/// let raw = RawPacket {
///     opcode: 0x0361,
///     direction: Direction::ServerToClient,
///     build: BuildId(19033),
///     sequence: 12,
///     timestamp: Some(1_700_000_000.25),
///     payload: vec![0x01, 0x02],
/// };
/// assert_eq!(raw.payload.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPacket {
    /// Wire opcode as transmitted.
    pub opcode: u32,
    /// Travel direction.
    pub direction: Direction,
    /// Client build the capture was taken against.
    pub build: BuildId,
    /// Capture-order index.
    pub sequence: u64,
    /// Capture timestamp in epoch seconds, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Opaque payload bytes, serialized as lowercase hex.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

/// A single decoded value.
///
/// `Enum` keeps the raw integer next to an optional label so unknown values
/// survive decoding unchanged. `Raw32` is the generic-fallback cell: four
/// bytes with no schema, displayed as both integer and float.
///
/// # Examples
/// ```
/// use snifflens_core::FieldValue;
///
/// let value = FieldValue::Enum { raw: 4, label: Some("healer".to_string()) };
/// assert_eq!(value.to_string(), "healer (4)");
/// assert_eq!(FieldValue::Raw32(0x3f80_0000).to_string(), "1065353216 / 1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f32),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    Text(String),
    Guid(#[serde(with = "guid_hex")] u128),
    Time(i64),
    Vec2 { x: f32, y: f32 },
    Vec3 { x: f32, y: f32, z: f32 },
    Enum { raw: u64, label: Option<String> },
    Raw32(u32),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Uint(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            FieldValue::Text(text) => write!(f, "{text}"),
            FieldValue::Guid(v) => write!(f, "{v:#034x}"),
            FieldValue::Time(v) => write!(f, "{v}"),
            FieldValue::Vec2 { x, y } => write!(f, "({x}, {y})"),
            FieldValue::Vec3 { x, y, z } => write!(f, "({x}, {y}, {z})"),
            FieldValue::Enum { raw, label } => match label {
                Some(label) => write!(f, "{label} ({raw})"),
                None => write!(f, "{raw}"),
            },
            FieldValue::Raw32(v) => write!(f, "{v} / {}", f32::from_bits(*v)),
        }
    }
}

/// One captured field in wire order.
///
/// `path` holds loop indices for repeated and nested groups, outermost
/// first; flat fields carry an empty path.
///
/// # Examples
/// ```
/// use snifflens_core::{FieldRecord, FieldValue};
///
/// let record = FieldRecord {
///     name: "SpellId".to_string(),
///     path: vec![2, 0],
///     value: FieldValue::Int(118),
/// };
/// assert_eq!(record.path, vec![2, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Field name as named by the decode routine.
    pub name: String,
    /// Loop indices, outermost first; empty for flat fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<u32>,
    /// Decoded value.
    pub value: FieldValue,
}

/// Outcome classification of a single decode.
///
/// # Examples
/// ```
/// use snifflens_core::ParseStatus;
///
/// assert_ne!(ParseStatus::Success, ParseStatus::WithErrors);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// Routine finished and consumed the payload exactly.
    Success,
    /// Routine finished but bytes were left over, here or in an embedded
    /// payload.
    WithErrors,
    /// No routine matched, or the routine failed mid-read.
    NotParsed,
}

/// Decode result for one packet.
///
/// Fields read before a failure are kept, so a `NotParsed` packet still
/// shows how far the routine got.
///
/// # Examples
/// ```
/// use snifflens_core::{BuildId, DecodedPacket, Direction, ParseStatus, RawPacket};
///
/// let decoded = DecodedPacket {
///     source: RawPacket {
///         opcode: 1,
///         direction: Direction::ClientToServer,
///         build: BuildId(19033),
///         sequence: 0,
///         timestamp: None,
///         payload: vec![],
///     },
///     opcode_name: None,
///     status: ParseStatus::NotParsed,
///     fields: vec![],
///     trailing_bytes: 0,
///     diagnostic: Some("no handler".to_string()),
/// };
/// assert_eq!(decoded.status, ParseStatus::NotParsed);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedPacket {
    /// The packet this result was decoded from.
    pub source: RawPacket,
    /// Resolved handler name, absent when no handler matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcode_name: Option<String>,
    /// Outcome classification.
    pub status: ParseStatus,
    /// Captured fields in wire order.
    pub fields: Vec<FieldRecord>,
    /// Unconsumed bytes left at the end of the outer payload.
    pub trailing_bytes: usize,
    /// Human-readable note for non-success outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

// Payload bytes travel as lowercase hex strings in JSON.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let mut text = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            text.push_str(&format!("{byte:02x}"));
        }
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd hex string length"));
        }
        (0..text.len())
            .step_by(2)
            .map(|i| {
                text.get(i..i + 2)
                    .ok_or_else(|| serde::de::Error::custom("invalid hex string"))
                    .and_then(|pair| {
                        u8::from_str_radix(pair, 16).map_err(serde::de::Error::custom)
                    })
            })
            .collect()
    }
}

mod guid_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#034x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        let digits = text
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("guid must start with 0x"))?;
        u128::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
    }
}
