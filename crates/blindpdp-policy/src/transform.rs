use blindpdp_core::PatternId;
use blindpdp_match::EncryptedMatcher;

use crate::error::PolicyResult;
use crate::types::PolicyDocument;

/// An encrypted policy and the identifiers it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPolicy {
    pub document: PolicyDocument,
    /// Distinct identifiers in the order the transform first stored them.
    pub resource_ids: Vec<PatternId>,
}

/// Store the first value of every recognized matcher and return a copy of
/// `policy` with those values replaced by their identifiers.
///
/// `policy` itself is left untouched. Unrecognized attributes and matchers
/// without values are copied as-is.
pub fn encrypt_policy(
    policy: &PolicyDocument,
    matcher: &dyn EncryptedMatcher,
) -> PolicyResult<EncryptedPolicy> {
    let mut document = policy.clone();
    let mut resource_ids: Vec<PatternId> = Vec::new();

    for rule in &mut document.decision_rules {
        for attribute in rule.cnf_condition.iter_mut().flatten() {
            let Some(recognized) = attribute.recognized() else {
                continue;
            };
            let Some(value) = attribute.attribute_value_included_in.first_mut() else {
                tracing::warn!(
                    attribute = %recognized,
                    rule = rule.id.as_deref().unwrap_or(""),
                    "matcher has no values, leaving it unencrypted"
                );
                continue;
            };
            let id = matcher.store(value)?;
            tracing::debug!(
                attribute = %recognized,
                value = %value,
                id = %id,
                "stored attribute value"
            );
            *value = id.to_string();
            if !resource_ids.contains(&id) {
                resource_ids.push(id);
            }
        }
    }

    tracing::info!(
        policy = document.name.as_deref().unwrap_or(""),
        identifiers = resource_ids.len(),
        "policy encrypted"
    );
    Ok(EncryptedPolicy {
        document,
        resource_ids,
    })
}
