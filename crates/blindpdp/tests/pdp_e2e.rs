//! End-to-end: policies are encrypted from disk, persisted, and decided
//! against plaintext requests through `PdpService`.
//!
//! Fixtures are the documents shipped in `TestData/`:
//!
//! - policy1 permits `read` under `/subscriptions/s1/**`
//! - policy2 denies `u-mallory` under `/subscriptions/s1/rg-secret/**`
//! - policy3 permits `write` on exactly `/subscriptions/s2/logs`
//!
//! - request1: u-alice reads in rg-secret
//! - request2: u-mallory reads in rg-secret
//! - request3: u-alice reads under an unrelated subscription
//! - request4: u-logger writes the s2 log container

use std::path::PathBuf;
use std::sync::Arc;

use blindpdp::{PdpService, RootConfig, RootError};
use blindpdp_policy::{
    AuditSink, CnfMode, Decision, InMemoryAuditSink, PolicyAuditEvent, PolicyAuditEventKind,
    PolicyError,
};

const FIXTURES: [(&str, &str); 7] = [
    ("policy1", include_str!("../../../TestData/policy1.json")),
    ("policy2", include_str!("../../../TestData/policy2.json")),
    ("policy3", include_str!("../../../TestData/policy3.json")),
    ("request1", include_str!("../../../TestData/request1.json")),
    ("request2", include_str!("../../../TestData/request2.json")),
    ("request3", include_str!("../../../TestData/request3.json")),
    ("request4", include_str!("../../../TestData/request4.json")),
];

struct SharedSink(Arc<InMemoryAuditSink>);

impl AuditSink for SharedSink {
    fn emit(&self, event: &PolicyAuditEvent) -> Result<(), String> {
        self.0.emit(event)
    }
}

fn make_config(name: &str) -> RootConfig {
    let data_dir: PathBuf =
        std::env::temp_dir().join(format!("blindpdp-e2e-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();
    for (file, contents) in FIXTURES {
        std::fs::write(data_dir.join(format!("{}.json", file)), contents).unwrap();
    }

    let mut config = RootConfig {
        data_dir,
        ..RootConfig::default()
    };
    config.backend.poly_degree = 256;
    config.backend.seed = Some(2021);
    config
}

fn make_service(name: &str) -> (PdpService, Arc<InMemoryAuditSink>) {
    let sink = Arc::new(InMemoryAuditSink::new());
    let service =
        PdpService::with_audit_sink(make_config(name), Box::new(SharedSink(sink.clone())))
            .unwrap();
    (service, sink)
}

fn encrypt_all(service: &mut PdpService) {
    for name in ["policy1", "policy2", "policy3"] {
        service.encrypt_policy(name).unwrap();
    }
}

fn cleanup(service: &PdpService) {
    let _ = std::fs::remove_dir_all(&service.config().data_dir);
}

#[test]
fn encrypted_policies_hide_recognized_values() {
    let (mut service, _) = make_service("hidden");
    encrypt_all(&mut service);

    let encrypted = service.get_policy("policy1").unwrap();
    assert!(!encrypted.contains("/subscriptions"));
    assert!(!encrypted.contains("\"read\""));
    assert!(encrypted.contains("ciphertext_"));
    assert!(encrypted.contains("rule-read-s1"));

    // Unrecognized attributes pass through.
    let encrypted = service.get_policy("policy3").unwrap();
    assert!(encrypted.contains("\"audit\""));

    // The plaintext document is untouched on disk.
    let plain = std::fs::read_to_string(service.config().document_path("policy1")).unwrap();
    assert!(plain.contains("/subscriptions/s1/**"));

    cleanup(&service);
}

#[test]
fn re_encrypting_reuses_identifiers() {
    let (mut service, _) = make_service("dedup");
    let first = service.encrypt_policy("policy1").unwrap();
    let third = service.encrypt_policy("policy3").unwrap();

    assert_eq!(first.identifiers.len(), 2);
    assert_eq!(third.identifiers.len(), 2);
    assert_eq!(service.store().len().unwrap(), 4);

    let again = service.encrypt_policy("policy1").unwrap();
    assert_eq!(again.identifiers, first.identifiers);
    assert_eq!(service.store().len().unwrap(), 4);
    assert_eq!(service.registry().len(), 2);

    cleanup(&service);
}

#[test]
fn permit_when_only_permit_rules_match() {
    let (mut service, _) = make_service("permit");
    encrypt_all(&mut service);

    let evaluation = service.check_access("request1").unwrap();
    assert_eq!(evaluation.decision, Decision::Permit);
    assert_eq!(evaluation.matched_rule_ids(), vec!["rule-read-s1"]);

    let evaluation = service.check_access("request4").unwrap();
    assert_eq!(evaluation.decision, Decision::Permit);
    assert_eq!(evaluation.matched_rule_ids(), vec!["rule-write-logs"]);

    cleanup(&service);
}

#[test]
fn deny_overrides_permit() {
    let (mut service, _) = make_service("deny");
    encrypt_all(&mut service);

    let evaluation = service.check_access("request2").unwrap();
    assert_eq!(evaluation.decision, Decision::Deny);
    assert_eq!(
        evaluation.matched_rule_ids(),
        vec!["rule-read-s1", "rule-deny-mallory"]
    );

    cleanup(&service);
}

#[test]
fn not_applicable_when_nothing_matches() {
    let (mut service, _) = make_service("na");
    encrypt_all(&mut service);

    let evaluation = service.check_access("request3").unwrap();
    assert_eq!(evaluation.decision, Decision::NotApplicable);
    assert_eq!(evaluation.decision.to_string(), "Not Applicable");

    cleanup(&service);
}

#[test]
fn check_access_against_selected_policies() {
    let (mut service, _) = make_service("selected");
    encrypt_all(&mut service);

    let evaluation = service
        .check_access_with("request2", &["policy1".to_string()])
        .unwrap();
    assert_eq!(evaluation.decision, Decision::Permit);

    cleanup(&service);
}

#[test]
fn every_evaluation_is_audited() {
    let (mut service, sink) = make_service("audit");
    encrypt_all(&mut service);
    sink.clear();

    service.check_access("request1").unwrap();
    service.check_access("request2").unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| e.event_kind == PolicyAuditEventKind::EvaluationCompleted));
    assert_eq!(events[1].decision_summary.as_deref(), Some("Deny"));
    assert_eq!(
        events[0].policy_names,
        vec!["policy1".to_string(), "policy2".to_string(), "policy3".to_string()]
    );

    cleanup(&service);
}

#[test]
fn every_encryption_is_audited() {
    let (mut service, sink) = make_service("audit-encrypt");
    encrypt_all(&mut service);
    service.encrypt_policy("policy1").unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 4);
    assert!(events
        .iter()
        .all(|e| e.event_kind == PolicyAuditEventKind::PolicyEncrypted));
    let names: Vec<&str> = events.iter().map(|e| e.policy_names[0].as_str()).collect();
    assert_eq!(names, vec!["policy1", "policy2", "policy3", "policy1"]);

    // A failed encryption is not audited.
    assert!(service.encrypt_policy("policy9").is_err());
    assert_eq!(sink.events().len(), 4);

    cleanup(&service);
}

#[test]
fn find_policies_by_resource_substring() {
    let (mut service, _) = make_service("find");
    encrypt_all(&mut service);

    assert_eq!(
        service.find_policies("rg-secret").unwrap(),
        vec!["policy2".to_string()]
    );
    assert_eq!(
        service.find_policies("logs").unwrap(),
        vec!["policy3".to_string()]
    );
    assert_eq!(
        service.find_policies("subscriptions").unwrap(),
        vec![
            "policy1".to_string(),
            "policy2".to_string(),
            "policy3".to_string()
        ]
    );
    assert!(service.find_policies("tenant").unwrap().is_empty());

    cleanup(&service);
}

#[test]
fn missing_documents_are_reported() {
    let (mut service, _) = make_service("missing");

    assert!(matches!(
        service.encrypt_policy("policy9"),
        Err(RootError::Policy(PolicyError::DocumentNotFound(_)))
    ));
    assert!(matches!(
        service.get_policy("policy1"),
        Err(RootError::Policy(PolicyError::DocumentNotFound(_)))
    ));
    assert!(matches!(
        service.check_access("request9"),
        Err(RootError::Policy(PolicyError::DocumentNotFound(_)))
    ));
    assert!(service.get_attribute("request1").unwrap().contains("u-alice"));

    cleanup(&service);
}

#[test]
fn clause_or_mode_from_config() {
    let mut config = make_config("clause-or");
    std::fs::write(
        config.document_path("either"),
        r#"{
  "name": "either",
  "decisionRules": [
    {
      "effect": "Permit",
      "id": "read-or-write",
      "cnfCondition": [
        [
          { "attributeName": "resource.azure.dataAction", "attributeValueIncludedIn": ["read"] },
          { "attributeName": "resource.azure.dataAction", "attributeValueIncludedIn": ["write"] }
        ],
        [
          { "attributeName": "resource.azure.path", "attributeValueIncludedIn": ["/subscriptions/s2/**"] }
        ]
      ]
    }
  ]
}"#,
    )
    .unwrap();

    let mut flattened = PdpService::new(config.clone()).unwrap();
    flattened.encrypt_policy("either").unwrap();
    assert_eq!(
        flattened.check_access("request4").unwrap().decision,
        Decision::NotApplicable
    );

    config.policy.cnf_mode = CnfMode::ClauseOr;
    let mut clause_or = PdpService::new(config).unwrap();
    clause_or.encrypt_policy("either").unwrap();
    assert_eq!(
        clause_or.check_access("request4").unwrap().decision,
        Decision::Permit
    );
    assert_eq!(
        clause_or.check_access("request3").unwrap().decision,
        Decision::NotApplicable
    );

    cleanup(&clause_or);
}
