use std::path::PathBuf;
use thiserror::Error;

/// Errors from policy document handling and evaluation.
///
/// Display strings name files and identifiers but never attribute values.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("document parse error: {0}")]
    DocumentParse(String),

    #[error("document read error: {0}")]
    DocumentRead(String),

    #[error("document write error: {0}")]
    DocumentWrite(String),

    #[error("matching error: {0}")]
    Match(#[from] blindpdp_match::MatchError),

    #[error("audit sink error: {0}")]
    AuditSink(String),

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
