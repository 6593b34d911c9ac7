use std::sync::{Mutex, MutexGuard};

use blindpdp_core::{CoreError, CoreResult, HomomorphicBackend, SlotVector};
use fhe::bfv::{Encoding, Plaintext, PublicKey, RelinearizationKey, SecretKey};
use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::ciphertext::BfvCiphertext;
use crate::keys::{BfvPublicKey, BfvRelinKeys, BfvSecretKey};
use crate::params::BfvParameters;

fn backend_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::Backend(e.to_string())
}

/// BFV backend over the `fhe` crate, with slot batching. Parameters are
/// fixed at construction; the RNG is the only mutable state and sits
/// behind a mutex so every operation is callable through `&self`.
pub struct BfvBackend {
    params: BfvParameters,
    rng: Mutex<ChaCha20Rng>,
}

impl BfvBackend {
    pub fn new(params: BfvParameters) -> CoreResult<Self> {
        Ok(Self {
            params,
            rng: Mutex::new(ChaCha20Rng::from_os_rng()),
        })
    }

    /// Backend with a deterministic RNG. Never use a fixed seed outside
    /// tests and reproducible diagnostics.
    pub fn with_seed(params: BfvParameters, seed: u64) -> CoreResult<Self> {
        Ok(Self {
            params,
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        })
    }

    pub fn params(&self) -> &BfvParameters {
        &self.params
    }

    fn rng(&self) -> CoreResult<MutexGuard<'_, ChaCha20Rng>> {
        self.rng
            .lock()
            .map_err(|e| CoreError::Backend(format!("rng lock poisoned: {}", e)))
    }

    fn check_degree(&self, degree: usize) -> CoreResult<()> {
        if degree != self.params.poly_degree() {
            return Err(CoreError::KeyMismatch);
        }
        Ok(())
    }

    /// Batch-encode after range-checking every slot.
    fn encode(&self, slots: &SlotVector) -> CoreResult<Plaintext> {
        let n = self.params.poly_degree();
        let t = self.params.plain_modulus();
        if slots.len() > n {
            return Err(CoreError::CapacityExceeded {
                len: slots.len(),
                capacity: n,
            });
        }
        if let Some(&value) = slots.as_slice().iter().find(|&&v| v >= t) {
            return Err(CoreError::SlotOutOfRange { value, modulus: t });
        }
        Plaintext::try_encode(slots.as_slice(), Encoding::simd(), self.params.fhe())
            .map_err(backend_err)
    }
}

impl HomomorphicBackend for BfvBackend {
    type Ciphertext = BfvCiphertext;
    type SecretKey = BfvSecretKey;
    type PublicKey = BfvPublicKey;
    type RelinKeys = BfvRelinKeys;

    fn generate_keys(&self) -> CoreResult<(BfvSecretKey, BfvPublicKey, BfvRelinKeys)> {
        let degree = self.params.poly_degree();
        let mut rng = self.rng()?;

        let secret = SecretKey::random(self.params.fhe(), &mut *rng);
        let public = PublicKey::new(&secret, &mut *rng);
        let relin = RelinearizationKey::new(&secret, &mut *rng).map_err(backend_err)?;

        tracing::debug!(
            poly_degree = degree,
            plain_modulus = self.params.plain_modulus(),
            modulus_bits = self.params.ciphertext_modulus_bits(),
            "generated BFV key material"
        );

        Ok((
            BfvSecretKey {
                inner: secret,
                degree,
            },
            BfvPublicKey {
                inner: public,
                degree,
            },
            BfvRelinKeys {
                inner: relin,
                degree,
            },
        ))
    }

    fn encrypt(&self, slots: &SlotVector, public_key: &BfvPublicKey) -> CoreResult<BfvCiphertext> {
        self.check_degree(public_key.degree())?;
        let plaintext = self.encode(slots)?;
        let mut rng = self.rng()?;
        let ciphertext = public_key
            .inner
            .try_encrypt(&plaintext, &mut *rng)
            .map_err(backend_err)?;
        Ok(BfvCiphertext::fresh(ciphertext, self.params.poly_degree()))
    }

    fn decrypt(
        &self,
        ciphertext: &BfvCiphertext,
        secret_key: &BfvSecretKey,
    ) -> CoreResult<SlotVector> {
        self.check_degree(secret_key.degree())?;
        self.check_degree(ciphertext.degree())?;
        let plaintext = secret_key
            .inner
            .try_decrypt(&ciphertext.inner)
            .map_err(backend_err)?;
        let values = Vec::<u64>::try_decode(&plaintext, Encoding::simd()).map_err(backend_err)?;
        Ok(SlotVector::from_values(values))
    }

    fn subtract_plain(
        &self,
        ciphertext: &BfvCiphertext,
        slots: &SlotVector,
    ) -> CoreResult<BfvCiphertext> {
        self.check_degree(ciphertext.degree())?;
        let plaintext = self.encode(slots)?;
        Ok(BfvCiphertext {
            inner: &ciphertext.inner - &plaintext,
            parts: ciphertext.parts,
            degree: ciphertext.degree,
        })
    }

    fn relinearize(
        &self,
        ciphertext: &BfvCiphertext,
        relin_keys: &BfvRelinKeys,
    ) -> CoreResult<BfvCiphertext> {
        match ciphertext.size() {
            2 => Ok(ciphertext.clone()),
            3 => {
                self.check_degree(ciphertext.degree())?;
                self.check_degree(relin_keys.degree())?;
                let mut inner = ciphertext.inner.clone();
                relin_keys.inner.relinearizes(&mut inner).map_err(backend_err)?;
                Ok(BfvCiphertext::fresh(inner, ciphertext.degree))
            }
            other => Err(CoreError::Backend(format!(
                "cannot relinearize ciphertext of size {}",
                other
            ))),
        }
    }

    fn batch_capacity(&self) -> usize {
        self.params.poly_degree()
    }

    fn plain_modulus(&self) -> u64 {
        self.params.plain_modulus()
    }

    fn noise_budget(&self, ciphertext: &BfvCiphertext, secret_key: &BfvSecretKey) -> CoreResult<u32> {
        self.check_degree(secret_key.degree())?;
        self.check_degree(ciphertext.degree())?;
        // SAFETY: `measure_noise` is only variable-time in the noise value.
        // The result feeds diagnostics, never a decision.
        let noise_bits = unsafe { secret_key.inner.measure_noise(&ciphertext.inner) }
            .map_err(backend_err)? as u32;
        let t_bits = 64 - self.params.plain_modulus().leading_zeros();
        Ok(self
            .params
            .ciphertext_modulus_bits()
            .saturating_sub(t_bits)
            .saturating_sub(noise_bits)
            .saturating_sub(1))
    }
}
