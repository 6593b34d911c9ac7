use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use blindpdp_core::{HomomorphicBackend, KeySet, PatternId, SerializedSize, SlotVector};

use crate::codec;
use crate::error::{MatchError, MatchResult};

/// Marker that turns the text before it into a wildcard continuation.
pub const DEFAULT_WILDCARD_MARKER: &str = "/**";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub wildcard_marker: String,
    /// Log noise budgets and ciphertext sizes at `trace` level. Costs one
    /// extra decryption per ciphertext inspected.
    pub noise_diagnostics: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            wildcard_marker: DEFAULT_WILDCARD_MARKER.to_string(),
            noise_diagnostics: false,
        }
    }
}

/// Encryption of a literal's text before its wildcard marker.
pub(crate) struct WildcardContinuation<C> {
    pub(crate) ciphertext: C,
    pub(crate) marker_len: usize,
}

pub(crate) struct StoredPattern<C> {
    pub(crate) id: PatternId,
    /// Character length of the original literal.
    pub(crate) length: usize,
    /// One ciphertext per suffix offset; rotation 0 is the full literal.
    pub(crate) rotations: Vec<C>,
    pub(crate) continuation: Option<WildcardContinuation<C>>,
}

pub(crate) struct StoreState<C> {
    pub(crate) entries: Vec<StoredPattern<C>>,
    pub(crate) by_id: HashMap<PatternId, usize>,
    next_index: u64,
}

/// Append-only store of encrypted literals.
///
/// Entries are never mutated or evicted. `store` encrypts outside the lock
/// and then dedups and inserts under a single write lock, so one literal
/// never ends up under two identifiers and readers never observe a partial
/// rotation sequence.
pub struct CiphertextStore<B: HomomorphicBackend> {
    pub(crate) backend: Arc<B>,
    pub(crate) keys: Arc<KeySet<B>>,
    pub(crate) config: StoreConfig,
    pub(crate) state: RwLock<StoreState<B::Ciphertext>>,
}

impl<B: HomomorphicBackend> CiphertextStore<B> {
    pub fn new(backend: Arc<B>, keys: Arc<KeySet<B>>, config: StoreConfig) -> MatchResult<Self> {
        if config.wildcard_marker.is_empty() {
            return Err(MatchError::Config("wildcard marker must not be empty".into()));
        }
        Ok(Self {
            backend,
            keys,
            config,
            state: RwLock::new(StoreState {
                entries: Vec::new(),
                by_id: HashMap::new(),
                next_index: 0,
            }),
        })
    }

    /// Store with freshly generated key material.
    pub fn with_generated_keys(backend: Arc<B>, config: StoreConfig) -> MatchResult<Self> {
        let keys = Arc::new(KeySet::generate(backend.as_ref())?);
        Self::new(backend, keys, config)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn keys(&self) -> &KeySet<B> {
        &self.keys
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn read(&self) -> MatchResult<RwLockReadGuard<'_, StoreState<B::Ciphertext>>> {
        self.state
            .read()
            .map_err(|_| MatchError::Internal("ciphertext store lock poisoned".into()))
    }

    fn write(&self) -> MatchResult<RwLockWriteGuard<'_, StoreState<B::Ciphertext>>> {
        self.state
            .write()
            .map_err(|_| MatchError::Internal("ciphertext store lock poisoned".into()))
    }

    pub(crate) fn encode(&self, text: &str) -> MatchResult<SlotVector> {
        codec::encode(text, self.backend.batch_capacity(), self.backend.plain_modulus())
    }

    fn encrypt(&self, slots: &SlotVector) -> MatchResult<B::Ciphertext> {
        let ct = self.backend.encrypt(slots, &self.keys.public)?;
        if self.config.noise_diagnostics {
            let budget = self.backend.noise_budget(&ct, &self.keys.secret)?;
            tracing::trace!(
                noise_budget_bits = budget,
                serialized_size = ct.serialized_size(),
                "fresh ciphertext"
            );
        }
        Ok(ct)
    }

    /// Encrypt `pattern` and return its identifier, reusing the identifier of
    /// an equal literal stored earlier.
    pub fn store_pattern(&self, pattern: &str) -> MatchResult<PatternId> {
        let chars: Vec<char> = pattern.chars().collect();
        let capacity = self.backend.batch_capacity();
        let modulus = self.backend.plain_modulus();

        let full = codec::encode_chars(&chars, capacity, modulus)?;
        let mut rotations = Vec::with_capacity(chars.len().max(1));
        rotations.push(self.encrypt(&full)?);
        for st in 1..chars.len() {
            let suffix = codec::encode_chars(&chars[st..], capacity, modulus)?;
            rotations.push(self.encrypt(&suffix)?);
        }

        let continuation = match pattern.find(self.config.wildcard_marker.as_str()) {
            Some(pos) => {
                let head = self.encode(&pattern[..pos])?;
                Some(WildcardContinuation {
                    ciphertext: self.encrypt(&head)?,
                    marker_len: codec::char_len(&self.config.wildcard_marker),
                })
            }
            None => None,
        };

        let mut state = self.write()?;
        for entry in &state.entries {
            if self.exact_match_entry(entry, &full, chars.len())? {
                tracing::debug!(id = %entry.id, "literal already stored, reusing identifier");
                return Ok(entry.id.clone());
            }
        }

        state.next_index += 1;
        let id = PatternId::from_index(state.next_index);
        let slot = state.entries.len();
        state.by_id.insert(id.clone(), slot);
        state.entries.push(StoredPattern {
            id: id.clone(),
            length: chars.len(),
            rotations,
            continuation,
        });
        tracing::debug!(
            id = %id,
            rotations = chars.len().max(1),
            wildcard = state.entries[slot].continuation.is_some(),
            "stored encrypted literal"
        );
        Ok(id)
    }

    /// Number of distinct stored literals.
    pub fn len(&self) -> MatchResult<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> MatchResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, id: &PatternId) -> MatchResult<bool> {
        Ok(self.read()?.by_id.contains_key(id))
    }

    /// Character length of the literal stored under `id`.
    pub fn pattern_len(&self, id: &PatternId) -> MatchResult<Option<usize>> {
        let state = self.read()?;
        Ok(state.by_id.get(id).map(|&i| state.entries[i].length))
    }

    /// Number of rotation ciphertexts stored under `id`.
    pub fn rotation_count(&self, id: &PatternId) -> MatchResult<Option<usize>> {
        let state = self.read()?;
        Ok(state.by_id.get(id).map(|&i| state.entries[i].rotations.len()))
    }

    pub fn has_continuation(&self, id: &PatternId) -> MatchResult<bool> {
        let state = self.read()?;
        Ok(state
            .by_id
            .get(id)
            .is_some_and(|&i| state.entries[i].continuation.is_some()))
    }

    /// Identifiers in allocation order.
    pub fn ids(&self) -> MatchResult<Vec<PatternId>> {
        Ok(self.read()?.entries.iter().map(|e| e.id.clone()).collect())
    }
}
