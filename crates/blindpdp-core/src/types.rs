use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SlotVector: fixed-width numeric encoding consumed by the backend
// ---------------------------------------------------------------------------

/// Ordered batch of plaintext slots, one lane per slot of a ciphertext.
///
/// Character codes are strictly positive, so 0 marks an unused slot. A
/// zero slot in a *difference* vector means the two operands agree at
/// that position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotVector(Vec<u64>);

impl SlotVector {
    /// All-zero vector of the given capacity.
    pub fn zeroed(capacity: usize) -> Self {
        Self(vec![0; capacity])
    }

    pub fn from_values(values: Vec<u64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.0
    }

    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }

    /// True when every slot in `[0, prefix_len)` is zero.
    ///
    /// Slots beyond the vector's length count as zero.
    pub fn is_zero_prefix(&self, prefix_len: usize) -> bool {
        self.0.iter().take(prefix_len).all(|&v| v == 0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }
}

// ---------------------------------------------------------------------------
// PatternId: opaque identifier handed out by the ciphertext store
// ---------------------------------------------------------------------------

/// Opaque identifier for a stored pattern. Carries no information about the
/// literal it stands for beyond its allocation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(String);

impl PatternId {
    pub const PREFIX: &'static str = "ciphertext_";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_index(index: u64) -> Self {
        Self(format!("{}{}", Self::PREFIX, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatternId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_prefix() {
        let v = SlotVector::from_values(vec![0, 0, 7, 0]);
        assert!(v.is_zero_prefix(0));
        assert!(v.is_zero_prefix(2));
        assert!(!v.is_zero_prefix(3));
        assert!(!v.is_zero());
        assert!(SlotVector::zeroed(8).is_zero());
    }

    #[test]
    fn test_zero_prefix_past_end() {
        let v = SlotVector::from_values(vec![0, 0]);
        assert!(v.is_zero_prefix(10));
    }

    #[test]
    fn test_pattern_id_from_index() {
        let id = PatternId::from_index(4);
        assert_eq!(id.as_str(), "ciphertext_4");
        assert_eq!(id.to_string(), "ciphertext_4");
    }

    #[test]
    fn test_pattern_id_serde_transparent() {
        let id = PatternId::from_index(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ciphertext_1\"");
        let back: PatternId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
