//! Order-preserving key codec.
//!
//! Every key is `index tag (1) ++ component ++ component ++ ...` with the
//! components in the index's order. Component encodings:
//!
//! - entity: the 20 identity bytes, fixed width;
//! - attribute: `namespace 0x00 name 0x00` (segments never contain NUL);
//! - tx: big-endian u64;
//! - value: a single type-tag byte followed by an order-preserving body.
//!
//! Value bodies: signed integers and instants are sign-flipped big-endian so
//! negatives collate before positives; floats get the IEEE-754 bit flip
//! (positives: flip the sign bit; negatives: flip everything; NaN collates
//! last); strings and byte arrays escape 0x00 as 0x00 0xFF and close with a
//! bare 0x00 terminator so variable-width bodies stay self-terminating
//! inside composite keys.
//!
//! Byte order equals semantic order within one value type. Decoding is the
//! exact inverse of encoding and fails with `CodecError` on any length or
//! tag inconsistency.

use crate::datom::{Datom, Pos};
use crate::error::CodecError;
use crate::identity::Identity;
use crate::keyword::Keyword;
use crate::value::Value;

use super::IndexType;

const TAG_BOOL: u8 = 0x08;
const TAG_INT: u8 = 0x10;
const TAG_FLOAT: u8 = 0x18;
const TAG_STR: u8 = 0x20;
const TAG_INSTANT: u8 = 0x28;
const TAG_REF: u8 = 0x30;
const TAG_KEYWORD: u8 = 0x38;
const TAG_BYTES: u8 = 0x40;

/// A constant occupying one key component, used to build scan prefixes.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
    Entity(Identity),
    Attribute(Keyword),
    Value(Value),
    Tx(u64),
}

impl KeyPart {
    pub fn pos(&self) -> Pos {
        match self {
            KeyPart::Entity(_) => Pos::E,
            KeyPart::Attribute(_) => Pos::A,
            KeyPart::Value(_) => Pos::V,
            KeyPart::Tx(_) => Pos::Tx,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            KeyPart::Entity(_) => "entity",
            KeyPart::Attribute(_) => "attribute",
            KeyPart::Value(_) => "value",
            KeyPart::Tx(_) => "tx",
        }
    }
}

fn pos_name(pos: Pos) -> &'static str {
    match pos {
        Pos::E => "entity",
        Pos::A => "attribute",
        Pos::V => "value",
        Pos::Tx => "tx",
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn flip_i64(v: i64) -> u64 { (v as u64) ^ (1 << 63) }

fn unflip_i64(raw: u64) -> i64 { (raw ^ (1 << 63)) as i64 }

fn flip_f64(v: f64) -> u64 {
    if v.is_nan() {
        return u64::MAX;
    }
    let bits = v.to_bits();
    if bits >> 63 == 0 {
        bits ^ (1 << 63)
    } else {
        !bits
    }
}

fn unflip_f64(raw: u64) -> f64 {
    if raw >> 63 != 0 {
        f64::from_bits(raw ^ (1 << 63))
    } else {
        f64::from_bits(!raw)
    }
}

fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xFF);
        } else {
            out.push(b);
        }
    }
    out.push(0x00);
}

pub(crate) fn encode_value_into(out: &mut Vec<u8>, v: &Value) {
    match v {
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(*b as u8);
        }
        Value::Int(i) => {
            out.push(TAG_INT);
            out.extend_from_slice(&flip_i64(*i).to_be_bytes());
        }
        Value::Float(x) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&flip_f64(*x).to_be_bytes());
        }
        Value::Str(s) => {
            out.push(TAG_STR);
            escape_into(out, s.as_bytes());
        }
        Value::Instant(nanos) => {
            out.push(TAG_INSTANT);
            out.extend_from_slice(&flip_i64(*nanos).to_be_bytes());
        }
        Value::Ref(id) => {
            out.push(TAG_REF);
            out.extend_from_slice(id.as_bytes());
        }
        Value::Keyword(k) => {
            out.push(TAG_KEYWORD);
            k.encode_into(out);
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            escape_into(out, b);
        }
    }
}

/// Encode one value: type tag plus order-preserving body.
pub fn encode_value(v: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value_into(&mut out, v);
    out
}

fn encode_component_into(out: &mut Vec<u8>, datom: &Datom, pos: Pos) {
    match pos {
        Pos::E => out.extend_from_slice(datom.e.as_bytes()),
        Pos::A => datom.a.encode_into(out),
        Pos::V => encode_value_into(out, &datom.v),
        Pos::Tx => out.extend_from_slice(&datom.tx.to_be_bytes()),
    }
}

/// Encode a full index key for a datom: tag byte plus all four components
/// in the index's order. Injective: distinct datoms get distinct keys.
pub fn encode_key(index: IndexType, datom: &Datom) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.push(index.tag());
    for pos in index.components() {
        encode_component_into(&mut out, datom, pos);
    }
    out
}

/// The byte form of one datom component, as it appears inside a key at the
/// given position. Used for hash-join probe keys and bound-range tightening.
pub fn encode_datom_component(datom: &Datom, pos: Pos) -> Vec<u8> {
    let mut out = Vec::new();
    encode_component_into(&mut out, datom, pos);
    out
}

/// The byte form a bound value takes at a pattern position, or None when the
/// value's type cannot occupy that position (such bindings match nothing).
pub fn encode_component_value(pos: Pos, value: &Value) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match (pos, value) {
        (Pos::E, Value::Ref(id)) => out.extend_from_slice(id.as_bytes()),
        (Pos::A, Value::Keyword(k)) => k.encode_into(&mut out),
        (Pos::V, v) => encode_value_into(&mut out, v),
        (Pos::Tx, Value::Int(i)) if *i >= 0 => out.extend_from_slice(&(*i as u64).to_be_bytes()),
        _ => return None,
    }
    Some(out)
}

/// Encode a scan prefix: the index tag plus the given leading components.
/// Parts must appear in the index's component order starting at the first
/// component.
pub fn encode_prefix(index: IndexType, parts: &[KeyPart]) -> Result<Vec<u8>, CodecError> {
    let components = index.components();
    if parts.len() > components.len() {
        return Err(CodecError::TooManyParts);
    }
    let mut out = Vec::with_capacity(64);
    out.push(index.tag());
    for (part, pos) in parts.iter().zip(components) {
        if part.pos() != pos {
            return Err(CodecError::PartMismatch { expected: pos_name(pos), got: part.kind() });
        }
        match part {
            KeyPart::Entity(id) => out.extend_from_slice(id.as_bytes()),
            KeyPart::Attribute(k) => k.encode_into(&mut out),
            KeyPart::Value(v) => encode_value_into(&mut out, v),
            KeyPart::Tx(tx) => out.extend_from_slice(&tx.to_be_bytes()),
        }
    }
    Ok(out)
}

/// The exclusive upper bound of a prefix scan: the bytewise successor of
/// `start` (increment with carry). If no successor exists the bound rolls
/// over to `start` padded with 0xFF bytes; unreachable for well-formed keys
/// because they begin with an index tag of at most 4.
pub fn prefix_end(start: &[u8]) -> Vec<u8> {
    let mut end = start.to_vec();
    for i in (0..end.len()).rev() {
        if end[i] != 0xFF {
            end[i] += 1;
            end.truncate(i + 1);
            return end;
        }
    }
    end.extend_from_slice(&[0xFF; 8]);
    end
}

/// `[start, end)` covering every key whose leading components equal `parts`.
pub fn encode_prefix_range(index: IndexType, parts: &[KeyPart]) -> Result<(Vec<u8>, Vec<u8>), CodecError> {
    let start = encode_prefix(index, parts)?;
    let end = prefix_end(&start);
    Ok((start, end))
}

/// The range spanning one whole index namespace.
pub fn index_range(index: IndexType) -> (Vec<u8>, Vec<u8>) {
    (vec![index.tag()], vec![index.tag() + 1])
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self { Self { bytes, at: 0 } }

    fn byte(&mut self, what: &'static str) -> Result<u8, CodecError> {
        let b = *self.bytes.get(self.at).ok_or(CodecError::Truncated(what))?;
        self.at += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        if self.at + n > self.bytes.len() {
            return Err(CodecError::Truncated(what));
        }
        let slice = &self.bytes[self.at..self.at + n];
        self.at += n;
        Ok(slice)
    }

    fn u64_be(&mut self, what: &'static str) -> Result<u64, CodecError> {
        let slice = self.take(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(slice);
        Ok(u64::from_be_bytes(raw))
    }

    /// Read an escaped, 0x00-terminated body and undo the escaping.
    fn unescape(&mut self, what: &'static str) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        loop {
            let b = self.byte(what)?;
            if b != 0x00 {
                out.push(b);
                continue;
            }
            match self.bytes.get(self.at) {
                Some(&0xFF) => {
                    self.at += 1;
                    out.push(0x00);
                }
                _ => return Ok(out),
            }
        }
    }

    /// Read a raw NUL-terminated segment (keyword namespaces and names never
    /// contain NUL, so no escaping applies).
    fn segment(&mut self, what: &'static str) -> Result<&'a [u8], CodecError> {
        let from = self.at;
        loop {
            let b = self.byte(what)?;
            if b == 0x00 {
                return Ok(&self.bytes[from..self.at - 1]);
            }
        }
    }

    fn entity(&mut self) -> Result<Identity, CodecError> {
        let slice = self.take(Identity::LEN, "entity")?;
        let mut bytes = [0u8; Identity::LEN];
        bytes.copy_from_slice(slice);
        Ok(Identity::from_bytes(bytes))
    }

    fn keyword(&mut self) -> Result<Keyword, CodecError> {
        let ns = self.segment("keyword namespace")?;
        let name = self.segment("keyword name")?;
        let ns = std::str::from_utf8(ns).map_err(|_| CodecError::InvalidUtf8("keyword"))?;
        let name = std::str::from_utf8(name).map_err(|_| CodecError::InvalidUtf8("keyword"))?;
        Keyword::new(ns, name).map_err(|_| CodecError::Malformed("keyword"))
    }

    fn value(&mut self) -> Result<Value, CodecError> {
        let tag = self.byte("value tag")?;
        match tag {
            TAG_BOOL => match self.byte("bool")? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(CodecError::Malformed("bool")),
            },
            TAG_INT => Ok(Value::Int(unflip_i64(self.u64_be("int")?))),
            TAG_FLOAT => Ok(Value::Float(unflip_f64(self.u64_be("float")?))),
            TAG_STR => {
                let body = self.unescape("string")?;
                Ok(Value::Str(String::from_utf8(body).map_err(|_| CodecError::InvalidUtf8("string"))?))
            }
            TAG_INSTANT => Ok(Value::Instant(unflip_i64(self.u64_be("instant")?))),
            TAG_REF => Ok(Value::Ref(self.entity()?)),
            TAG_KEYWORD => Ok(Value::Keyword(self.keyword()?)),
            TAG_BYTES => Ok(Value::Bytes(self.unescape("bytes")?)),
            other => Err(CodecError::UnknownValueTag(other)),
        }
    }

    fn done(&self) -> bool { self.at == self.bytes.len() }
}

/// Decode a full index key back into its datom. The polarity flag is not
/// part of the key; callers that track it (the store keeps it in the value
/// slot) overwrite `added` after decoding.
pub fn decode_datom(index: IndexType, key: &[u8]) -> Result<Datom, CodecError> {
    let mut r = Reader::new(key);
    let tag = r.byte("index tag")?;
    if tag != index.tag() {
        return Err(CodecError::UnknownIndexTag(tag));
    }

    let mut e = None;
    let mut a = None;
    let mut v = None;
    let mut tx = None;
    for pos in index.components() {
        match pos {
            Pos::E => e = Some(r.entity()?),
            Pos::A => a = Some(r.keyword()?),
            Pos::V => v = Some(r.value()?),
            Pos::Tx => tx = Some(r.u64_be("tx")?),
        }
    }
    if !r.done() {
        return Err(CodecError::TrailingBytes);
    }

    // All four components are present in every index order, so the unwraps
    // above are guarded by construction; expressed without unwrap anyway.
    match (e, a, v, tx) {
        (Some(e), Some(a), Some(v), Some(tx)) => Ok(Datom::new(e, a, v, tx)),
        _ => Err(CodecError::Malformed("key")),
    }
}
