//! Additively homomorphic, slot-batched BFV backend.
//!
//! Implements the `HomomorphicBackend` capability over the `fhe` crate.
//! Plaintexts are batch-encoded one value per slot, so subtracting an
//! encoded literal acts lane by lane and the difference decrypts to the
//! slot-wise difference of the two literals.
//!
//! Only encryption, plaintext subtraction and decryption are on the
//! matching path. `relinearize` still accepts the three-component form so
//! the capability contract holds for any ciphertext the scheme produces.

pub mod backend;
pub mod ciphertext;
pub mod keys;
pub mod params;

pub use backend::BfvBackend;
pub use ciphertext::BfvCiphertext;
pub use keys::{BfvPublicKey, BfvRelinKeys, BfvSecretKey};
pub use params::BfvParameters;
