use blindpdp_core::PatternId;
use blindpdp_match::EncryptedMatcher;

use crate::error::PolicyResult;

/// Policy name to the identifiers its encrypted form references, in
/// registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    policies: Vec<(String, Vec<PatternId>)>,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the identifiers of `policy`. Re-registering a policy replaces
    /// its identifiers but keeps its original position.
    pub fn register(&mut self, policy: &str, ids: Vec<PatternId>) {
        let mut deduped: Vec<PatternId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        match self.policies.iter_mut().find(|(name, _)| name == policy) {
            Some((_, existing)) => *existing = deduped,
            None => self.policies.push((policy.to_string(), deduped)),
        }
    }

    pub fn get(&self, policy: &str) -> Option<&[PatternId]> {
        self.policies
            .iter()
            .find(|(name, _)| name == policy)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn contains(&self, policy: &str) -> bool {
        self.get(policy).is_some()
    }

    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies holding at least one literal that contains `substring`.
    ///
    /// Policies are reported in registration order; a policy's remaining
    /// identifiers are skipped after its first hit.
    pub fn find_policies_by_substring(
        &self,
        substring: &str,
        matcher: &dyn EncryptedMatcher,
    ) -> PolicyResult<Vec<String>> {
        let mut found = Vec::new();
        for (name, ids) in &self.policies {
            for id in ids {
                if matcher.substring_match(id, substring)? {
                    tracing::debug!(policy = %name, id = %id, "resource substring hit");
                    found.push(name.clone());
                    break;
                }
            }
        }
        Ok(found)
    }
}
