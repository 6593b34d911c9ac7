use crate::error::CoreResult;
use crate::types::SlotVector;

// ---------------------------------------------------------------------------
// SerializedSize: size probe for ciphertexts and key material
// ---------------------------------------------------------------------------

pub trait SerializedSize {
    /// Length in bytes of the value's serialized form.
    fn serialized_size(&self) -> usize;
}

// ---------------------------------------------------------------------------
// HomomorphicBackend: additively-homomorphic, batched encryption capability
//
// The matching engine consumes this as an opaque capability. It never looks
// inside a ciphertext; everything it learns comes from decrypting a
// difference.
// ---------------------------------------------------------------------------

pub trait HomomorphicBackend: Send + Sync {
    type Ciphertext: Clone + Send + Sync + SerializedSize;
    type SecretKey: Send + Sync + SerializedSize;
    type PublicKey: Send + Sync + SerializedSize;
    type RelinKeys: Send + Sync + SerializedSize;

    fn generate_keys(&self) -> CoreResult<(Self::SecretKey, Self::PublicKey, Self::RelinKeys)>;

    fn encrypt(&self, slots: &SlotVector, public_key: &Self::PublicKey)
        -> CoreResult<Self::Ciphertext>;

    fn decrypt(
        &self,
        ciphertext: &Self::Ciphertext,
        secret_key: &Self::SecretKey,
    ) -> CoreResult<SlotVector>;

    /// Homomorphically subtract a plaintext slot vector, slot by slot.
    fn subtract_plain(
        &self,
        ciphertext: &Self::Ciphertext,
        slots: &SlotVector,
    ) -> CoreResult<Self::Ciphertext>;

    /// Bring a ciphertext back to its canonical two-component form.
    fn relinearize(
        &self,
        ciphertext: &Self::Ciphertext,
        relin_keys: &Self::RelinKeys,
    ) -> CoreResult<Self::Ciphertext>;

    /// Number of independent slots per ciphertext.
    fn batch_capacity(&self) -> usize;

    /// Every slot value must be strictly below this modulus.
    fn plain_modulus(&self) -> u64;

    /// Remaining noise headroom in bits. Diagnostic only.
    fn noise_budget(
        &self,
        ciphertext: &Self::Ciphertext,
        secret_key: &Self::SecretKey,
    ) -> CoreResult<u32>;
}

/// Key material produced by [`HomomorphicBackend::generate_keys`], established
/// once and shared read-only afterwards.
pub struct KeySet<B: HomomorphicBackend + ?Sized> {
    pub secret: B::SecretKey,
    pub public: B::PublicKey,
    pub relin: B::RelinKeys,
}

impl<B: HomomorphicBackend + ?Sized> KeySet<B> {
    pub fn generate(backend: &B) -> CoreResult<Self> {
        let (secret, public, relin) = backend.generate_keys()?;
        Ok(Self {
            secret,
            public,
            relin,
        })
    }
}
