use blindpdp_core::{HomomorphicBackend, PatternId, SlotVector};

use crate::codec;
use crate::error::MatchResult;
use crate::store::{CiphertextStore, StoredPattern};

/// Store-and-compare capability consumed by the policy layer.
///
/// Every `*_match` operation returns `Ok(false)` for an identifier the store
/// has never issued. Errors are reserved for queries that cannot be encoded
/// and for backend failures.
pub trait EncryptedMatcher: Send + Sync {
    fn store(&self, pattern: &str) -> MatchResult<PatternId>;

    /// Equal literal, same length.
    fn exact_match(&self, id: &PatternId, text: &str) -> MatchResult<bool>;

    /// `text` is a prefix of the stored literal.
    fn prefix_match(&self, id: &PatternId, text: &str) -> MatchResult<bool>;

    /// `text` occurs somewhere in the stored literal.
    fn substring_match(&self, id: &PatternId, text: &str) -> MatchResult<bool>;

    /// The stored literal ends in the wildcard marker and `text` starts with
    /// everything before it.
    fn wildcard_prefix_match(&self, id: &PatternId, text: &str) -> MatchResult<bool>;
}

impl<B: HomomorphicBackend> CiphertextStore<B> {
    /// Subtract, relinearize, decrypt.
    fn difference(&self, ciphertext: &B::Ciphertext, query: &SlotVector) -> MatchResult<SlotVector> {
        let diff = self.backend.subtract_plain(ciphertext, query)?;
        let diff = self.backend.relinearize(&diff, &self.keys.relin)?;
        if self.config.noise_diagnostics {
            let budget = self.backend.noise_budget(&diff, &self.keys.secret)?;
            tracing::trace!(noise_budget_bits = budget, "difference ciphertext");
        }
        Ok(self.backend.decrypt(&diff, &self.keys.secret)?)
    }

    /// Exact comparison against an entry without touching the lock. The
    /// zero check only covers `[0, query_len)`, so the length comparison is
    /// what separates "abc" from "abcd".
    pub(crate) fn exact_match_entry(
        &self,
        entry: &StoredPattern<B::Ciphertext>,
        query: &SlotVector,
        query_len: usize,
    ) -> MatchResult<bool> {
        if entry.length != query_len {
            return Ok(false);
        }
        let Some(rotation0) = entry.rotations.first() else {
            return Ok(false);
        };
        Ok(self.difference(rotation0, query)?.is_zero_prefix(query_len))
    }

    pub fn exact_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        let query = self.encode(text)?;
        let state = self.read()?;
        let Some(&slot) = state.by_id.get(id) else {
            return Ok(false);
        };
        self.exact_match_entry(&state.entries[slot], &query, codec::char_len(text))
    }

    pub fn prefix_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        let query = self.encode(text)?;
        let state = self.read()?;
        let Some(rotation0) = state
            .by_id
            .get(id)
            .and_then(|&slot| state.entries[slot].rotations.first())
        else {
            return Ok(false);
        };
        Ok(self
            .difference(rotation0, &query)?
            .is_zero_prefix(codec::char_len(text)))
    }

    /// Probes rotations in ascending offset order and stops at the first hit.
    pub fn substring_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        let query = self.encode(text)?;
        let query_len = codec::char_len(text);
        let state = self.read()?;
        let Some(&slot) = state.by_id.get(id) else {
            return Ok(false);
        };
        for rotation in &state.entries[slot].rotations {
            if self.difference(rotation, &query)?.is_zero_prefix(query_len) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Compares against the continuation over `stored length - marker length`
    /// slots.
    pub fn wildcard_prefix_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        let query = self.encode(text)?;
        let state = self.read()?;
        let Some(&slot) = state.by_id.get(id) else {
            return Ok(false);
        };
        let entry = &state.entries[slot];
        let Some(continuation) = entry.continuation.as_ref() else {
            return Ok(false);
        };
        let compare_len = entry.length.saturating_sub(continuation.marker_len);
        Ok(self
            .difference(&continuation.ciphertext, &query)?
            .is_zero_prefix(compare_len))
    }
}

impl<B: HomomorphicBackend> EncryptedMatcher for CiphertextStore<B> {
    fn store(&self, pattern: &str) -> MatchResult<PatternId> {
        self.store_pattern(pattern)
    }

    fn exact_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        CiphertextStore::exact_match(self, id, text)
    }

    fn prefix_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        CiphertextStore::prefix_match(self, id, text)
    }

    fn substring_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        CiphertextStore::substring_match(self, id, text)
    }

    fn wildcard_prefix_match(&self, id: &PatternId, text: &str) -> MatchResult<bool> {
        CiphertextStore::wildcard_prefix_match(self, id, text)
    }
}
