//! blindpdp root library
//!
//! Configuration, error handling, and the orchestration layer that ties the
//! encryption backend, the ciphertext store and the policy evaluator to the
//! documents in the data directory.
//!
//! # Architecture
//!
//! [`PdpService`] owns the single [`CiphertextStore`] for the process and a
//! [`ResourceIndex`] of every policy encrypted through it. Ciphertexts live
//! in memory only, so an encrypted policy file is only decidable by the
//! process that wrote it; the registry tracks which ones those are.

pub mod config;
pub mod error;

pub use config::{BackendConfig, MatchingConfig, PolicyConfig, RootConfig};
pub use error::{RootError, RootResult};

use std::path::PathBuf;
use std::sync::Arc;

use blindpdp_bfv::BfvBackend;
use blindpdp_core::{HomomorphicBackend, PatternId, SerializedSize, SlotVector};
use blindpdp_match::CiphertextStore;
use blindpdp_policy::{
    document, encrypt_policy, AuditSink, Evaluation, PolicyAuditEvent, PolicyDocument,
    PolicyError, PolicyEvaluator, ResourceIndex, TracingAuditSink,
};
use tracing::{debug, info};

/// Result of encrypting one policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionReport {
    pub policy: String,
    pub output_path: PathBuf,
    pub identifiers: Vec<PatternId>,
}

/// Backend and store figures for the `diagnostics` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub poly_degree: usize,
    pub plain_modulus: u64,
    pub batch_capacity: usize,
    pub stored_literals: usize,
    pub registered_policies: usize,
    pub fresh_ciphertext_bytes: usize,
    pub fresh_noise_budget_bits: u32,
    pub public_key_bytes: usize,
    pub relin_key_bytes: usize,
}

/// The policy decision point.
pub struct PdpService {
    config: RootConfig,
    store: CiphertextStore<BfvBackend>,
    registry: ResourceIndex,
    audit_sink: Box<dyn AuditSink>,
}

impl PdpService {
    /// Validate `config`, build the backend and generate fresh keys.
    pub fn new(config: RootConfig) -> RootResult<Self> {
        Self::with_audit_sink(config, Box::new(TracingAuditSink))
    }

    pub fn with_audit_sink(config: RootConfig, audit_sink: Box<dyn AuditSink>) -> RootResult<Self> {
        config.validate()?;

        let params = config.backend_params()?;
        let backend = match config.backend.seed {
            Some(seed) => BfvBackend::with_seed(params, seed)?,
            None => BfvBackend::new(params)?,
        };
        let store = CiphertextStore::with_generated_keys(Arc::new(backend), config.store_config())?;

        info!(
            data_dir = %config.data_dir.display(),
            poly_degree = config.backend.poly_degree,
            plain_modulus = config.backend.plain_modulus,
            seeded = config.backend.seed.is_some(),
            cnf_mode = ?config.policy.cnf_mode,
            "policy decision point initialized"
        );

        Ok(Self {
            config,
            store,
            registry: ResourceIndex::new(),
            audit_sink,
        })
    }

    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    pub fn store(&self) -> &CiphertextStore<BfvBackend> {
        &self.store
    }

    pub fn registry(&self) -> &ResourceIndex {
        &self.registry
    }

    /// Encrypt `<name>.json` into `encr_<name>.json` and register it.
    pub fn encrypt_policy(&mut self, name: &str) -> RootResult<EncryptionReport> {
        let policy = document::read_policy(&self.config.document_path(name))?;
        let encrypted = encrypt_policy(&policy, &self.store)?;

        let output_path = self.config.encrypted_policy_path(name);
        document::write_policy(&encrypted.document, &output_path)?;
        self.registry.register(name, encrypted.resource_ids.clone());
        self.audit_sink
            .emit(&PolicyAuditEvent::policy_encrypted(name))
            .map_err(|e| {
                PolicyError::AuditSink(format!("failed to emit encryption audit: {}", e))
            })?;

        info!(
            policy = name,
            output = %output_path.display(),
            identifiers = encrypted.resource_ids.len(),
            "policy registered"
        );
        Ok(EncryptionReport {
            policy: name.to_string(),
            output_path,
            identifiers: encrypted.resource_ids,
        })
    }

    /// Raw text of the encrypted policy `encr_<name>.json`.
    pub fn get_policy(&self, name: &str) -> RootResult<String> {
        Ok(document::read_raw(&self.config.encrypted_policy_path(name))?)
    }

    /// Raw text of the request or attribute document `<name>.json`.
    pub fn get_attribute(&self, name: &str) -> RootResult<String> {
        Ok(document::read_raw(&self.config.document_path(name))?)
    }

    /// Decide the request `<request>.json` against every registered policy.
    pub fn check_access(&self, request: &str) -> RootResult<Evaluation> {
        let names: Vec<String> = self.registry.policy_names().map(String::from).collect();
        self.check_access_with(request, &names)
    }

    /// Decide the request `<request>.json` against the named registered
    /// policies, in the order given.
    pub fn check_access_with(&self, request: &str, policies: &[String]) -> RootResult<Evaluation> {
        let attributes = document::read_request(&self.config.document_path(request))?;

        let mut documents: Vec<PolicyDocument> = Vec::with_capacity(policies.len());
        for name in policies {
            if !self.registry.contains(name) {
                return Err(PolicyError::UnknownPolicy(name.clone()).into());
            }
            let mut policy = document::read_policy(&self.config.encrypted_policy_path(name))?;
            if policy.name.is_none() {
                policy.name = Some(name.clone());
            }
            debug!(policy = %name, rules = policy.decision_rules.len(), "loaded encrypted policy");
            documents.push(policy);
        }

        let evaluator = PolicyEvaluator::new(&self.store, self.audit_sink.as_ref())
            .with_cnf_mode(self.config.policy.cnf_mode);
        Ok(evaluator.evaluate(&attributes, &documents)?)
    }

    /// Registered policies referencing a literal that contains `substring`.
    pub fn find_policies(&self, substring: &str) -> RootResult<Vec<String>> {
        let found = self
            .registry
            .find_policies_by_substring(substring, &self.store)?;
        info!(matches = found.len(), "resource substring search finished");
        Ok(found)
    }

    pub fn diagnostics(&self) -> RootResult<Diagnostics> {
        let backend = self.store.backend();
        let keys = self.store.keys();
        let probe = backend.encrypt(&SlotVector::zeroed(backend.batch_capacity()), &keys.public)?;
        Ok(Diagnostics {
            poly_degree: backend.params().poly_degree(),
            plain_modulus: backend.plain_modulus(),
            batch_capacity: backend.batch_capacity(),
            stored_literals: self.store.len()?,
            registered_policies: self.registry.len(),
            fresh_ciphertext_bytes: probe.serialized_size(),
            fresh_noise_budget_bits: backend.noise_budget(&probe, &keys.secret)?,
            public_key_bytes: keys.public.serialized_size(),
            relin_key_bytes: keys.relin.serialized_size(),
        })
    }
}
