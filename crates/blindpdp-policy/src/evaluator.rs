use std::sync::Mutex;

use blindpdp_core::PatternId;
use blindpdp_match::EncryptedMatcher;

use crate::error::{PolicyError, PolicyResult};
use crate::types::{
    AttributeMatcher, CnfMode, Decision, DecisionRule, Effect, Evaluation, MatchedRule,
    PolicyAuditEvent, PolicyAuditEventKind, PolicyDocument, RecognizedAttribute,
    RequestAttributes,
};

// ---------------------------------------------------------------------------
// AuditSink trait
// ---------------------------------------------------------------------------

/// Receives one event per completed evaluation.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &PolicyAuditEvent) -> Result<(), String>;
}

/// In-memory audit sink for testing.
#[derive(Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<PolicyAuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PolicyAuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: &PolicyAuditEvent) -> Result<(), String> {
        self.events
            .lock()
            .map_err(|_| "audit sink lock poisoned".to_string())?
            .push(event.clone());
        Ok(())
    }
}

/// Writes audit events to the `blindpdp::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &PolicyAuditEvent) -> Result<(), String> {
        tracing::info!(
            target: "blindpdp::audit",
            kind = ?event.event_kind,
            timestamp = %event.timestamp.to_rfc3339(),
            policies = ?event.policy_names,
            decision = event.decision_summary.as_deref().unwrap_or(""),
            matched_rules = ?event.matched_rule_ids,
            "audit"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Combining
// ---------------------------------------------------------------------------

/// Deny-overrides over the effects of matched rules: no effects gives
/// `NotApplicable`, any `Deny` gives `Deny`, otherwise `Permit`.
pub fn combine_effects<I>(effects: I) -> Decision
where
    I: IntoIterator<Item = Effect>,
{
    let mut permit = true;
    let mut any_matched = false;
    for effect in effects {
        any_matched = true;
        permit &= effect == Effect::Permit;
    }
    match (any_matched, permit) {
        (false, _) => Decision::NotApplicable,
        (true, true) => Decision::Permit,
        (true, false) => Decision::Deny,
    }
}

// ---------------------------------------------------------------------------
// PolicyEvaluator
// ---------------------------------------------------------------------------

/// Decides requests against encrypted policies.
///
/// Request values stay plaintext; they are re-encoded and compared against
/// the stored ciphertexts that the policies' identifiers refer to.
pub struct PolicyEvaluator<'a> {
    matcher: &'a dyn EncryptedMatcher,
    audit_sink: &'a dyn AuditSink,
    cnf_mode: CnfMode,
}

impl<'a> PolicyEvaluator<'a> {
    pub fn new(matcher: &'a dyn EncryptedMatcher, audit_sink: &'a dyn AuditSink) -> Self {
        Self {
            matcher,
            audit_sink,
            cnf_mode: CnfMode::default(),
        }
    }

    pub fn with_cnf_mode(mut self, cnf_mode: CnfMode) -> Self {
        self.cnf_mode = cnf_mode;
        self
    }

    pub fn cnf_mode(&self) -> CnfMode {
        self.cnf_mode
    }

    /// Evaluate every rule of every policy and combine the matched rules
    /// with deny-overrides.
    pub fn evaluate(
        &self,
        request: &RequestAttributes,
        policies: &[PolicyDocument],
    ) -> PolicyResult<Evaluation> {
        let mut matched_rules = Vec::new();
        for policy in policies {
            let policy_name = policy.name.clone().unwrap_or_default();
            for rule in &policy.decision_rules {
                if self.rule_matches(rule, request)? {
                    tracing::debug!(
                        policy = %policy_name,
                        rule = rule.rule_id(),
                        effect = %rule.effect,
                        "rule matched"
                    );
                    matched_rules.push(MatchedRule {
                        policy: policy_name.clone(),
                        rule_id: rule.rule_id().to_string(),
                        effect: rule.effect,
                    });
                }
            }
        }

        let decision = combine_effects(matched_rules.iter().map(|r| r.effect));
        let evaluation = Evaluation {
            decision,
            matched_rules,
        };
        tracing::info!(
            decision = %evaluation.decision,
            policies = policies.len(),
            matched_rules = evaluation.matched_rules.len(),
            "access evaluated"
        );
        self.emit_evaluation_audit(policies, &evaluation)?;
        Ok(evaluation)
    }

    /// Whether `rule`'s condition holds for `request`. A rule with no
    /// applicable matcher holds.
    pub fn rule_matches(
        &self,
        rule: &DecisionRule,
        request: &RequestAttributes,
    ) -> PolicyResult<bool> {
        match self.cnf_mode {
            CnfMode::Flattened => {
                for attribute in rule.cnf_condition.iter().flatten() {
                    if let Some(false) = self.matcher_result(attribute, request)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            CnfMode::ClauseOr => {
                for clause in &rule.cnf_condition {
                    let mut applicable = false;
                    let mut satisfied = false;
                    for attribute in clause {
                        match self.matcher_result(attribute, request)? {
                            Some(true) => {
                                satisfied = true;
                                break;
                            }
                            Some(false) => applicable = true,
                            None => {}
                        }
                    }
                    if applicable && !satisfied {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// `None` when the matcher does not apply: unrecognized attribute, or
    /// the request carries no value for it.
    fn matcher_result(
        &self,
        attribute: &AttributeMatcher,
        request: &RequestAttributes,
    ) -> PolicyResult<Option<bool>> {
        let Some(recognized) = attribute.recognized() else {
            return Ok(None);
        };
        let Some(value) = request.get(recognized) else {
            return Ok(None);
        };
        let Some(stored) = attribute.first_value() else {
            tracing::warn!(attribute = %recognized, "matcher has no identifier");
            return Ok(Some(false));
        };
        let id = PatternId::from(stored);
        let result = match recognized {
            RecognizedAttribute::ResourcePath => {
                self.matcher.exact_match(&id, value)?
                    || self.matcher.wildcard_prefix_match(&id, value)?
            }
            RecognizedAttribute::Principal | RecognizedAttribute::Action => {
                self.matcher.exact_match(&id, value)?
            }
        };
        tracing::debug!(
            attribute = %recognized,
            id = %id,
            value = %value,
            result,
            "matcher evaluated"
        );
        Ok(Some(result))
    }

    fn emit_evaluation_audit(
        &self,
        policies: &[PolicyDocument],
        evaluation: &Evaluation,
    ) -> PolicyResult<()> {
        let event = PolicyAuditEvent {
            event_kind: PolicyAuditEventKind::EvaluationCompleted,
            timestamp: chrono::Utc::now(),
            policy_names: policies
                .iter()
                .map(|p| p.name.clone().unwrap_or_default())
                .collect(),
            decision_summary: Some(evaluation.decision.to_string()),
            matched_rule_ids: evaluation
                .matched_rule_ids()
                .into_iter()
                .map(String::from)
                .collect(),
        };
        self.audit_sink.emit(&event).map_err(|e| {
            PolicyError::AuditSink(format!("failed to emit evaluation audit: {}", e))
        })
    }
}
