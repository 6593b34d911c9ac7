use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("slot vector of length {len} exceeds batch capacity {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("slot value {value} is not below the plaintext modulus {modulus}")]
    SlotOutOfRange { value: u64, modulus: u64 },

    #[error("key material does not belong to this backend")]
    KeyMismatch,
}

pub type CoreResult<T> = Result<T, CoreError>;
