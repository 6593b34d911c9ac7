//! Encrypted attribute matching.
//!
//! Literals are encoded one character per slot, encrypted once per suffix
//! offset, and kept in an append-only [`CiphertextStore`]. Every comparison
//! is the same protocol: encode the query, subtract it homomorphically from
//! a stored ciphertext, relinearize, decrypt, and look for zeros in the
//! difference. Nothing else about a stored literal is ever revealed.
//!
//! - [`codec`]: literal to slot vector
//! - [`store`]: identifier allocation, rotations, wildcard continuations, dedup
//! - [`engine`]: exact, prefix, substring and wildcard-prefix matching

pub mod codec;
pub mod engine;
pub mod error;
pub mod store;

pub use engine::EncryptedMatcher;
pub use error::{MatchError, MatchResult};
pub use store::{CiphertextStore, StoreConfig, DEFAULT_WILDCARD_MARKER};
