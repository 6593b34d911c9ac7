use thiserror::Error;

/// Error type for the blindpdp root crate, aggregating errors from the
/// library crates.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("policy error: {0}")]
    Policy(#[from] blindpdp_policy::PolicyError),

    #[error("matching error: {0}")]
    Match(#[from] blindpdp_match::MatchError),

    #[error("backend error: {0}")]
    Core(#[from] blindpdp_core::CoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for RootError {
    fn from(e: toml::de::Error) -> Self {
        RootError::Config(format!("TOML parse error: {}", e))
    }
}

pub type RootResult<T> = Result<T, RootError>;
