//! Policy decision point over encrypted attribute values.
//!
//! Policies are XACML-style documents: each decision rule carries an effect
//! and a CNF condition of attribute matchers. [`transform::encrypt_policy`]
//! swaps every recognized attribute literal for an opaque store identifier;
//! [`evaluator::PolicyEvaluator`] then decides requests against the
//! encrypted documents without ever comparing plaintext.
//!
//! Key features:
//! - Pure policy transform (the plaintext document is never mutated)
//! - Exact and wildcard-continuation matching for resource paths
//! - Deny-overrides combining across every matched rule of every policy
//! - Configurable CNF semantics (flattened AND, or AND of ORs)
//! - Substring search over a per-policy resource index

pub mod document;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod transform;
pub mod types;

pub use evaluator::{
    combine_effects, AuditSink, InMemoryAuditSink, PolicyEvaluator, TracingAuditSink,
};
pub use error::{PolicyError, PolicyResult};
pub use index::ResourceIndex;
pub use transform::{encrypt_policy, EncryptedPolicy};
pub use types::{
    AttributeMatcher, CnfMode, Decision, DecisionRule, Effect, Evaluation, MatchedRule,
    PolicyAuditEvent, PolicyAuditEventKind, PolicyDocument, RecognizedAttribute,
    RequestAttribute, RequestAttributes,
};
