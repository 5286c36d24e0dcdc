mod common;

use async_trait::async_trait;
use common::*;
use octofhir_conformance::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_conformant_condition_yields_only_retained_structural_messages() {
    let classifier = create_test_classifier();
    let structural = vec![
        ValidationMessage::info("Condition: validated"),
        ValidationMessage::warning("Condition.code: Best practice recommendation"),
        ValidationMessage::warning("Condition.code: Unknown CodeSystem 'http://snomed.info/sct'"),
        ValidationMessage::error("Condition/cond-1: Condition.onset[x]: Rule con-4 failed"),
    ];

    let report = classifier
        .classify(&condition("active", "problem-list-item"), CONDITION_PROFILE, &structural)
        .await
        .unwrap();

    assert_eq!(report, vec![structural[2].clone(), structural[3].clone()]);
}

#[tokio::test]
async fn test_structural_terminology_error_is_replaced_by_binding_error() {
    let classifier = create_test_classifier();
    let structural = vec![ValidationMessage::error(
        "Condition/cond-1: Condition.clinicalStatus: None of the codings provided are in the value set 'Condition Clinical Status Codes'",
    )];

    let report = classifier
        .classify(&condition("bogus", "problem-list-item"), CONDITION_PROFILE, &structural)
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report[0].message_type(), MessageType::Error);
    assert_eq!(
        report[0].message(),
        format!(
            "Condition/cond-1 at Condition.clinicalStatus with code `{CLINICAL_STATUS_CS}|bogus` is not in {CLINICAL_STATUS_VS}"
        )
    );
}

#[tokio::test]
async fn test_code_outside_two_member_value_set() {
    let vs = "http://example.org/ValueSet/ab";
    let mut terminology = InMemoryTerminologyService::new();
    terminology.add_codes(vs, &[("A", Some("http://example.org/cs")), ("B", Some("http://example.org/cs"))]);
    let catalog = InMemoryBindingCatalog::new()
        .with_profile(
            ProfileMetadata::new("http://example.org/StructureDefinition/ab")
                .with_binding(BindingDefinition::required(vs, "code").with_type(CodedType::Coding)),
        )
        .unwrap();
    let classifier = MessageClassifier::new(
        &ClassifierConfig::default(),
        Arc::new(catalog),
        Arc::new(terminology),
    )
    .unwrap();

    let resource = json!({
        "resourceType": "Basic",
        "id": "b1",
        "code": {"system": "http://example.org/cs", "code": "C"}
    });
    let report = classifier
        .classify(&resource, "http://example.org/StructureDefinition/ab", &[])
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert!(report[0].is_error());
    assert!(report[0].message().contains("`http://example.org/cs|C`"));
    assert!(report[0].message().ends_with(vs));
}

#[tokio::test]
async fn test_unknown_value_set_is_reported_as_warning() {
    let classifier = create_test_classifier();
    let report = classifier
        .classify(&patient_with_race("female", "2106-3"), PATIENT_PROFILE, &[])
        .await
        .unwrap();

    assert_eq!(
        report,
        vec![ValidationMessage::warning(format!("Unknown ValueSet: {RACE_VS}"))]
    );
}

#[tokio::test]
async fn test_bindings_report_in_catalog_order() {
    let classifier = create_test_classifier();
    let report = classifier
        .classify(&patient_with_race("robot", "2106-3"), PATIENT_PROFILE, &[])
        .await
        .unwrap();

    assert_eq!(report.len(), 2);
    assert!(report[0].is_error());
    assert!(report[0].message().contains("Patient/85 at Patient.gender"));
    assert_eq!(report[1].message_type(), MessageType::Warning);
}

#[tokio::test]
async fn test_unknown_profile_contributes_no_binding_messages() {
    let classifier = create_test_classifier();
    let structural = vec![ValidationMessage::error("Patient/85: Patient: Rule us-core-6 failed")];

    let report = classifier
        .classify(
            &condition("bogus", "bogus"),
            "http://example.org/StructureDefinition/not-loaded",
            &structural,
        )
        .await
        .unwrap();

    assert_eq!(report, structural);
}

#[tokio::test]
async fn test_classification_is_idempotent() {
    let classifier = create_test_classifier();
    let resource = condition("bogus", "encounter-diagnosis");
    let structural = vec![
        ValidationMessage::warning("Condition.code: Unknown ValueSet 'http://x'"),
        ValidationMessage::info("done"),
    ];

    let first = classifier
        .classify(&resource, CONDITION_PROFILE, &structural)
        .await
        .unwrap();
    let second = classifier
        .classify(&resource, CONDITION_PROFILE, &structural)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

struct UnavailableService {
    calls: AtomicUsize,
}

#[async_trait]
impl TerminologyService for UnavailableService {
    async fn check_membership(
        &self,
        _code: &str,
        _system: Option<&str>,
        _value_set_url: &str,
    ) -> TerminologyResult<MembershipOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TerminologyError::ServiceUnavailable {
            message: "connection refused".to_string(),
        })
    }
}

#[tokio::test]
async fn test_service_fault_fails_classification() {
    let service = Arc::new(UnavailableService {
        calls: AtomicUsize::new(0),
    });
    let classifier = MessageClassifier::new(
        &ClassifierConfig::default(),
        Arc::new(create_test_catalog()),
        service.clone(),
    )
    .unwrap();

    let result = classifier
        .classify(&condition("active", "problem-list-item"), CONDITION_PROFILE, &[])
        .await;

    let err = result.unwrap_err();
    assert!(err.is_service_fault());
    assert!(matches!(
        err,
        ConformanceError::Terminology(TerminologyError::ServiceUnavailable { .. })
    ));
    assert!(service.calls.load(Ordering::SeqCst) >= 1);
}

struct StalledService;

#[async_trait]
impl TerminologyService for StalledService {
    async fn check_membership(
        &self,
        _code: &str,
        _system: Option<&str>,
        _value_set_url: &str,
    ) -> TerminologyResult<MembershipOutcome> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(MembershipOutcome::Member)
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_service_times_out() {
    let config = ClassifierConfig::default()
        .with_terminology_timeout(Duration::from_millis(250))
        .with_cache(None);
    let classifier = MessageClassifier::new(
        &config,
        Arc::new(create_test_catalog()),
        Arc::new(StalledService),
    )
    .unwrap();

    let err = classifier
        .classify(&condition("active", "problem-list-item"), CONDITION_PROFILE, &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConformanceError::Terminology(TerminologyError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_batch_isolates_failures_per_request() {
    let classifier = create_test_classifier();
    let requests = vec![
        ClassificationRequest::new(condition("active", "problem-list-item"), CONDITION_PROFILE, Vec::new()),
        ClassificationRequest::new(condition("bogus", "problem-list-item"), CONDITION_PROFILE, Vec::new()),
        ClassificationRequest::new(
            patient_with_race("male", "2106-3"),
            PATIENT_PROFILE,
            vec![ValidationMessage::info("ignored")],
        ),
    ];

    let outcomes = classifier.classify_batch(requests).await;

    let counts: Vec<usize> = outcomes
        .iter()
        .map(|outcome| outcome.result.as_ref().unwrap().len())
        .collect();
    assert_eq!(counts, vec![0, 1, 1]);
    assert_eq!(
        outcomes.iter().map(|o| o.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}
