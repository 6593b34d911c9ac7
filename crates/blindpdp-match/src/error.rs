use thiserror::Error;

/// Errors raised by encoding, storing and matching.
///
/// An unknown identifier is not an error: every matching operation reports
/// it as "no match".
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("literal of {len} characters exceeds batch capacity {capacity}")]
    EncodingOverflow { len: usize, capacity: usize },

    #[error("character at position {position} cannot be encoded")]
    InvalidCharacter { position: usize },

    #[error("backend error: {0}")]
    Backend(#[from] blindpdp_core::CoreError),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type MatchResult<T> = Result<T, MatchError>;
