//! The index catalog: five total orderings over the datom components, each
//! reachable by a one-byte namespace tag at the front of every key.

pub mod codec;

pub use codec::{
    decode_datom, encode_component_value, encode_datom_component, encode_key, encode_prefix, encode_prefix_range,
    encode_value, index_range, prefix_end, KeyPart,
};

use crate::datom::Pos;
use crate::error::CodecError;

/// One of the five index orderings. The component order determines which
/// query patterns the index can answer with a prefix scan; see the module
/// docs of `codec` for the key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// Entity, attribute, value, tx: entity-centric reads.
    Eavt,
    /// Attribute, entity, value, tx: all (E, V) pairs of one attribute.
    Aevt,
    /// Attribute, value, entity, tx: equality and ranges on (A, V).
    Avet,
    /// Value, attribute, entity, tx: reverse lookup on reference values.
    Vaet,
    /// Tx, attribute, entity, value: history and time-range scans.
    Taev,
}

impl IndexType {
    pub const ALL: [IndexType; 5] = [IndexType::Eavt, IndexType::Aevt, IndexType::Avet, IndexType::Vaet, IndexType::Taev];

    /// The one-byte physical namespace tag prefixed to every key.
    pub fn tag(self) -> u8 {
        match self {
            IndexType::Eavt => 0,
            IndexType::Aevt => 1,
            IndexType::Avet => 2,
            IndexType::Vaet => 3,
            IndexType::Taev => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(IndexType::Eavt),
            1 => Ok(IndexType::Aevt),
            2 => Ok(IndexType::Avet),
            3 => Ok(IndexType::Vaet),
            4 => Ok(IndexType::Taev),
            other => Err(CodecError::UnknownIndexTag(other)),
        }
    }

    /// Datom components in this index's key order.
    pub fn components(self) -> [Pos; 4] {
        match self {
            IndexType::Eavt => [Pos::E, Pos::A, Pos::V, Pos::Tx],
            IndexType::Aevt => [Pos::A, Pos::E, Pos::V, Pos::Tx],
            IndexType::Avet => [Pos::A, Pos::V, Pos::E, Pos::Tx],
            IndexType::Vaet => [Pos::V, Pos::A, Pos::E, Pos::Tx],
            IndexType::Taev => [Pos::Tx, Pos::A, Pos::E, Pos::V],
        }
    }
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexType::Eavt => f.write_str("EAVT"),
            IndexType::Aevt => f.write_str("AEVT"),
            IndexType::Avet => f.write_str("AVET"),
            IndexType::Vaet => f.write_str("VAET"),
            IndexType::Taev => f.write_str("TAEV"),
        }
    }
}
