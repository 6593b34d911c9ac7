use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use blindpdp_bfv::params::{DEFAULT_PLAIN_MODULUS, DEFAULT_POLY_DEGREE};
use blindpdp_bfv::BfvParameters;
use blindpdp_match::{StoreConfig, DEFAULT_WILDCARD_MARKER};
use blindpdp_policy::CnfMode;

use crate::error::{RootError, RootResult};

/// Every Unicode scalar value must fit below the plaintext modulus.
const MAX_CHAR_CODE: u64 = 0x10FFFF;

/// Encryption backend parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Ring degree; also the number of slots, so the longest literal.
    #[serde(default = "default_poly_degree")]
    pub poly_degree: usize,

    #[serde(default = "default_plain_modulus")]
    pub plain_modulus: u64,

    /// Fixed RNG seed. Reproducible runs only; leave unset otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Log noise budgets and ciphertext sizes at trace level.
    #[serde(default)]
    pub noise_diagnostics: bool,
}

fn default_poly_degree() -> usize {
    DEFAULT_POLY_DEGREE
}

fn default_plain_modulus() -> u64 {
    DEFAULT_PLAIN_MODULUS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            poly_degree: default_poly_degree(),
            plain_modulus: default_plain_modulus(),
            seed: None,
            noise_diagnostics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchingConfig {
    #[serde(default = "default_wildcard_marker")]
    pub wildcard_marker: String,
}

fn default_wildcard_marker() -> String {
    DEFAULT_WILDCARD_MARKER.to_string()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            wildcard_marker: default_wildcard_marker(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConfig {
    #[serde(default)]
    pub cnf_mode: CnfMode,
}

/// Top-level configuration for the blindpdp binary.
///
/// Loaded from a TOML file (typically `~/.blindpdp/config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootConfig {
    /// Directory holding policy, request and encrypted policy documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File name prefix of encrypted policies.
    #[serde(default = "default_encrypted_prefix")]
    pub encrypted_prefix: String,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./TestData")
}

fn default_encrypted_prefix() -> String {
    "encr_".to_string()
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            encrypted_prefix: default_encrypted_prefix(),
            backend: BackendConfig::default(),
            matching: MatchingConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl RootConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> RootResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: RootConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RootError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> RootResult<()> {
        self.backend_params()?;
        if self.backend.plain_modulus <= MAX_CHAR_CODE {
            return Err(RootError::Config(format!(
                "plain_modulus must exceed {:#X}, got {}",
                MAX_CHAR_CODE, self.backend.plain_modulus
            )));
        }
        if self.matching.wildcard_marker.is_empty() {
            return Err(RootError::Config("wildcard_marker must not be empty".into()));
        }
        if self.encrypted_prefix.is_empty() {
            return Err(RootError::Config("encrypted_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Backend parameters built from `[backend]`.
    pub fn backend_params(&self) -> RootResult<BfvParameters> {
        BfvParameters::new(self.backend.poly_degree, self.backend.plain_modulus)
            .map_err(|e| RootError::Config(e.to_string()))
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".blindpdp/config.toml")
    }

    /// `<data_dir>/<name>.json`, for plaintext policies and request documents.
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    /// `<data_dir>/<prefix><name>.json`
    pub fn encrypted_policy_path(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.json", self.encrypted_prefix, name))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            wildcard_marker: self.matching.wildcard_marker.clone(),
            noise_diagnostics: self.backend.noise_diagnostics,
        }
    }
}
