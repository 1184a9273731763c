use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum KeywordError {
    #[error("keyword segment is empty")]
    EmptySegment,
    #[error("keyword segment contains a reserved character: {0:?}")]
    ReservedCharacter(char),
    #[error("not a keyword literal: {0:?}")]
    BadLiteral(String),
}

/// A namespaced symbol such as `:price/symbol`.
///
/// Keywords are Arc-backed: clones share one allocation, so a keyword that
/// appears in every datom of a scan costs one heap object no matter how many
/// tuples carry it. Two keywords are equal iff their canonical strings are
/// equal; ordering is namespace-major, then local name, which matches the
/// collation of the encoded byte form used inside index keys.
#[derive(Clone)]
pub struct Keyword(Arc<Inner>);

struct Inner {
    namespace: String,
    name: String,
    canonical: String,
}

impl Keyword {
    /// Build a keyword from namespace and local name. Segments may not be
    /// empty and may not contain `/` or NUL (NUL delimits segments in the
    /// encoded byte form).
    pub fn new(namespace: &str, name: &str) -> Result<Self, KeywordError> {
        check_segment(namespace)?;
        check_segment(name)?;
        Ok(Self(Arc::new(Inner {
            namespace: namespace.to_string(),
            name: name.to_string(),
            canonical: format!(":{}/{}", namespace, name),
        })))
    }

    /// Parse a canonical literal of the form `:namespace/name`.
    pub fn parse(literal: &str) -> Result<Self, KeywordError> {
        let body = literal.strip_prefix(':').ok_or_else(|| KeywordError::BadLiteral(literal.to_string()))?;
        let (ns, name) = body.split_once('/').ok_or_else(|| KeywordError::BadLiteral(literal.to_string()))?;
        Self::new(ns, name)
    }

    pub fn namespace(&self) -> &str { &self.0.namespace }

    pub fn name(&self) -> &str { &self.0.name }

    /// The canonical string form, `:namespace/name`.
    pub fn canonical(&self) -> &str { &self.0.canonical }

    /// The encoded byte form: `namespace 0x00 name 0x00`. Collates by
    /// namespace, then name. Segments never contain NUL, so the form is
    /// self-terminating inside composite keys.
    pub fn encoded(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.namespace.len() + self.0.name.len() + 2);
        self.encode_into(&mut out);
        out
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.namespace.as_bytes());
        out.push(0x00);
        out.extend_from_slice(self.0.name.as_bytes());
        out.push(0x00);
    }
}

fn check_segment(segment: &str) -> Result<(), KeywordError> {
    if segment.is_empty() {
        return Err(KeywordError::EmptySegment);
    }
    for c in segment.chars() {
        if c == '/' || c == '\0' {
            return Err(KeywordError::ReservedCharacter(c));
        }
    }
    Ok(())
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) || self.0.canonical == other.0.canonical }
}

impl Eq for Keyword {}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) { self.0.canonical.hash(state) }
}

impl PartialOrd for Keyword {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Keyword {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.namespace.cmp(&other.0.namespace).then_with(|| self.0.name.cmp(&other.0.name))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0.canonical) }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0.canonical) }
}
