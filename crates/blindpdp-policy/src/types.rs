use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Policy documents
// ---------------------------------------------------------------------------

/// A policy as read from and written to disk.
///
/// The same type carries plaintext and encrypted policies; after
/// [`crate::transform::encrypt_policy`] the first value of every recognized
/// matcher is a store identifier instead of a literal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub decision_rules: Vec<DecisionRule>,
}

impl PolicyDocument {
    /// Iterate over every matcher of every rule, in document order.
    pub fn matchers(&self) -> impl Iterator<Item = &AttributeMatcher> {
        self.decision_rules
            .iter()
            .flat_map(|rule| rule.cnf_condition.iter().flatten())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Permit,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Permit => write!(f, "Permit"),
            Effect::Deny => write!(f, "Deny"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Clauses of attribute matchers.
    #[serde(default)]
    pub cnf_condition: Vec<Vec<AttributeMatcher>>,
}

impl DecisionRule {
    /// Rule id for logs and decisions, empty when the document has none.
    pub fn rule_id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMatcher {
    pub attribute_name: String,
    /// Only the first value takes part in matching.
    #[serde(default)]
    pub attribute_value_included_in: Vec<String>,
}

impl AttributeMatcher {
    pub fn new(attribute_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            attribute_value_included_in: vec![value.into()],
        }
    }

    pub fn first_value(&self) -> Option<&str> {
        self.attribute_value_included_in.first().map(String::as_str)
    }

    pub fn recognized(&self) -> Option<RecognizedAttribute> {
        RecognizedAttribute::from_name(&self.attribute_name)
    }
}

// ---------------------------------------------------------------------------
// Recognized attributes
// ---------------------------------------------------------------------------

/// Attribute names the transform encrypts and the evaluator matches.
/// Anything else is carried through untouched and ignored at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognizedAttribute {
    ResourcePath,
    Principal,
    Action,
}

impl RecognizedAttribute {
    pub const ALL: [RecognizedAttribute; 3] = [
        RecognizedAttribute::ResourcePath,
        RecognizedAttribute::Principal,
        RecognizedAttribute::Action,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecognizedAttribute::ResourcePath => "resource.azure.path",
            RecognizedAttribute::Principal => "principal.microsoft.id",
            RecognizedAttribute::Action => "resource.azure.dataAction",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }
}

impl fmt::Display for RecognizedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAttribute {
    pub attribute_name: String,
    pub attribute_value_includes: String,
}

/// Plaintext attributes of an access request. Never encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestAttributes {
    #[serde(default)]
    pub attributes: Vec<RequestAttribute>,
}

impl RequestAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: RecognizedAttribute, value: impl Into<String>) -> Self {
        self.attributes.push(RequestAttribute {
            attribute_name: attribute.name().to_string(),
            attribute_value_includes: value.into(),
        });
        self
    }

    /// Value of a recognized attribute. A later entry with the same name
    /// replaces an earlier one.
    pub fn get(&self, attribute: RecognizedAttribute) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.attribute_name == attribute.name())
            .map(|a| a.attribute_value_includes.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Permit => write!(f, "Permit"),
            Decision::Deny => write!(f, "Deny"),
            Decision::NotApplicable => write!(f, "Not Applicable"),
        }
    }
}

/// A rule whose condition held for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub policy: String,
    pub rule_id: String,
    pub effect: Effect,
}

/// Outcome of one evaluation: the combined decision and the rules behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub matched_rules: Vec<MatchedRule>,
}

impl Evaluation {
    pub fn matched_rule_ids(&self) -> Vec<&str> {
        self.matched_rules.iter().map(|r| r.rule_id.as_str()).collect()
    }
}

/// How the clauses of a rule's CNF condition are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CnfMode {
    /// Every applicable matcher of every clause must hold.
    #[default]
    Flattened,
    /// Every clause with an applicable matcher must have one that holds.
    ClauseOr,
}

// ---------------------------------------------------------------------------
// Audit types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyAuditEventKind {
    EvaluationCompleted,
    PolicyEncrypted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyAuditEvent {
    pub event_kind: PolicyAuditEventKind,
    pub timestamp: DateTime<Utc>,
    pub policy_names: Vec<String>,
    pub decision_summary: Option<String>,
    pub matched_rule_ids: Vec<String>,
}

impl PolicyAuditEvent {
    /// Record of one policy being encrypted and registered.
    pub fn policy_encrypted(policy: &str) -> Self {
        Self {
            event_kind: PolicyAuditEventKind::PolicyEncrypted,
            timestamp: Utc::now(),
            policy_names: vec![policy.to_string()],
            decision_summary: None,
            matched_rule_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_policy() -> PolicyDocument {
        PolicyDocument {
            name: Some("policy1".into()),
            id: Some("p-1".into()),
            description: None,
            version: 2,
            decision_rules: vec![DecisionRule {
                kind: Some("DecisionRule".into()),
                effect: Effect::Permit,
                id: Some("r-1".into()),
                updated_at: None,
                cnf_condition: vec![vec![
                    AttributeMatcher::new("resource.azure.path", "/a/b/**"),
                    AttributeMatcher::new("resource.azure.dataAction", "read"),
                ]],
            }],
        }
    }

    #[test]
    fn test_policy_json_uses_camel_case_and_omits_none() {
        let json = serde_json::to_string(&make_policy()).unwrap();
        assert!(json.contains("\"decisionRules\""));
        assert!(json.contains("\"cnfCondition\""));
        assert!(json.contains("\"attributeValueIncludedIn\""));
        assert!(!json.contains("description"));
        assert!(!json.contains("updatedAt"));
    }

    #[test]
    fn test_policy_json_roundtrip() {
        let policy = make_policy();
        let json = serde_json::to_string_pretty(&policy).unwrap();
        let back: PolicyDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_parse_minimal_policy() {
        let json = r#"{"decisionRules":[{"effect":"Deny","cnfCondition":[[{"attributeName":"x"}]]}]}"#;
        let policy: PolicyDocument = serde_json::from_str(json).unwrap();
        assert_eq!(policy.version, 0);
        assert_eq!(policy.decision_rules[0].effect, Effect::Deny);
        assert_eq!(policy.decision_rules[0].rule_id(), "");
        assert!(policy.matchers().all(|m| m.first_value().is_none()));
    }

    #[test]
    fn test_unknown_effect_rejected() {
        let json = r#"{"decisionRules":[{"effect":"Maybe"}]}"#;
        assert!(serde_json::from_str::<PolicyDocument>(json).is_err());
    }

    #[test]
    fn test_recognized_attribute_names() {
        for attr in RecognizedAttribute::ALL {
            assert_eq!(RecognizedAttribute::from_name(attr.name()), Some(attr));
        }
        assert_eq!(RecognizedAttribute::from_name("resource.azure.tag"), None);
    }

    #[test]
    fn test_request_later_value_wins() {
        let request = RequestAttributes::new()
            .with(RecognizedAttribute::Action, "read")
            .with(RecognizedAttribute::Action, "write");
        assert_eq!(request.get(RecognizedAttribute::Action), Some("write"));
        assert_eq!(request.get(RecognizedAttribute::Principal), None);
    }

    #[test]
    fn test_request_json_shape() {
        let json = r#"{"attributes":[{"attributeName":"principal.microsoft.id","attributeValueIncludes":"u-1"}]}"#;
        let request: RequestAttributes = serde_json::from_str(json).unwrap();
        assert_eq!(request.get(RecognizedAttribute::Principal), Some("u-1"));
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Permit.to_string(), "Permit");
        assert_eq!(Decision::Deny.to_string(), "Deny");
        assert_eq!(Decision::NotApplicable.to_string(), "Not Applicable");
    }

    #[test]
    fn test_cnf_mode_serde() {
        assert_eq!(serde_json::to_string(&CnfMode::ClauseOr).unwrap(), "\"clause_or\"");
        assert_eq!(CnfMode::default(), CnfMode::Flattened);
    }

    #[test]
    fn test_policy_encrypted_event() {
        let event = PolicyAuditEvent::policy_encrypted("policy1");
        assert_eq!(event.event_kind, PolicyAuditEventKind::PolicyEncrypted);
        assert_eq!(event.policy_names, vec!["policy1".to_string()]);
        assert!(event.decision_summary.is_none());
        assert!(event.matched_rule_ids.is_empty());
    }
}
