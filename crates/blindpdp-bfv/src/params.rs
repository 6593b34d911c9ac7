use std::sync::Arc;

use blindpdp_core::{CoreError, CoreResult};
use fhe::bfv::{BfvParametersBuilder, Encoding, Plaintext};
use fhe_traits::FheEncoder;

pub const DEFAULT_POLY_DEGREE: usize = 4096;

/// `18·2^16 + 1`: prime, above every Unicode scalar value, and congruent to
/// 1 mod `2n` for every supported degree, so slot batching is available.
pub const DEFAULT_PLAIN_MODULUS: u64 = 1_179_649;

pub const MIN_POLY_DEGREE: usize = 16;
pub const MAX_POLY_DEGREE: usize = 32768;
pub const MAX_PLAIN_MODULUS: u64 = 1 << 30;

/// Ciphertext modulus chain for a ring degree, in bits per prime.
///
/// Degrees of 4096 and above follow the usual 128-bit security table.
/// Smaller rings get two 40-bit primes: enough headroom for a 21-bit
/// plaintext, but not secure. Use them for tests only.
pub fn moduli_sizes(poly_degree: usize) -> Vec<usize> {
    match poly_degree {
        0..=2048 => vec![40, 40],
        4096 => vec![36, 36, 37],
        8192 => vec![43, 43, 44, 44, 44],
        16384 => vec![48; 9],
        _ => vec![55; 16],
    }
}

/// Validated BFV parameter set, wrapping the `fhe` parameters it was
/// built into.
#[derive(Debug, Clone)]
pub struct BfvParameters {
    poly_degree: usize,
    plain_modulus: u64,
    inner: Arc<fhe::bfv::BfvParameters>,
}

impl BfvParameters {
    pub fn new(poly_degree: usize, plain_modulus: u64) -> CoreResult<Self> {
        if !poly_degree.is_power_of_two()
            || !(MIN_POLY_DEGREE..=MAX_POLY_DEGREE).contains(&poly_degree)
        {
            return Err(CoreError::InvalidParameters(format!(
                "poly_degree must be a power of two in [{}, {}], got {}",
                MIN_POLY_DEGREE, MAX_POLY_DEGREE, poly_degree
            )));
        }
        if plain_modulus < 2 || plain_modulus > MAX_PLAIN_MODULUS {
            return Err(CoreError::InvalidParameters(format!(
                "plain_modulus must be in [2, 2^30], got {}",
                plain_modulus
            )));
        }

        let inner = BfvParametersBuilder::new()
            .set_degree(poly_degree)
            .set_plaintext_modulus(plain_modulus)
            .set_moduli_sizes(&moduli_sizes(poly_degree))
            .build_arc()
            .map_err(|e| CoreError::InvalidParameters(e.to_string()))?;

        // Batching needs a prime t with t = 1 mod 2n.
        Plaintext::try_encode(&[0u64][..], Encoding::simd(), &inner).map_err(|_| {
            CoreError::InvalidParameters(format!(
                "plain_modulus {} does not support slot batching at degree {}",
                plain_modulus, poly_degree
            ))
        })?;

        Ok(Self {
            poly_degree,
            plain_modulus,
            inner,
        })
    }

    pub fn poly_degree(&self) -> usize {
        self.poly_degree
    }

    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    /// Total bit length of the ciphertext modulus chain.
    pub fn ciphertext_modulus_bits(&self) -> u32 {
        self.inner
            .moduli()
            .iter()
            .map(|q| 64 - q.leading_zeros())
            .sum()
    }

    pub(crate) fn fhe(&self) -> &Arc<fhe::bfv::BfvParameters> {
        &self.inner
    }
}
