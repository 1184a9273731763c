use std::fmt;

/// A 20-byte content-addressed entity handle.
///
/// Identities constructed from the same label are always byte-identical, so
/// labels can be used as stable entity names across processes without any
/// coordination. Ordering and equality are plain byte comparison, which is
/// also the order identities collate under inside index keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity([u8; Identity::LEN]);

impl Identity {
    pub const LEN: usize = 20;

    /// Derive an identity from a printable label. Deterministic: the label is
    /// hashed with blake3 and truncated to 20 bytes.
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..Self::LEN]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self { Self(bytes) }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] { &self.0 }

    pub fn to_bytes(&self) -> [u8; Self::LEN] { self.0 }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}
