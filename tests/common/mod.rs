use octofhir_conformance::*;
use serde_json::{Value, json};
use std::sync::Arc;

pub const CONDITION_PROFILE: &str =
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-condition";
pub const PATIENT_PROFILE: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-patient";

pub const CLINICAL_STATUS_VS: &str = "http://hl7.org/fhir/ValueSet/condition-clinical";
pub const CLINICAL_STATUS_CS: &str = "http://terminology.hl7.org/CodeSystem/condition-clinical";
pub const CATEGORY_VS: &str = "http://hl7.org/fhir/us/core/ValueSet/us-core-condition-category";
pub const CATEGORY_CS: &str = "http://terminology.hl7.org/CodeSystem/condition-category";
pub const GENDER_VS: &str = "http://hl7.org/fhir/ValueSet/administrative-gender";
pub const RACE_VS: &str = "http://hl7.org/fhir/us/core/ValueSet/omb-race-category";
pub const RACE_EXTENSION: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-race";
pub const CDC_RACE_CS: &str = "urn:oid:2.16.840.1.113883.6.238";

#[allow(dead_code)]
pub fn create_test_catalog() -> InMemoryBindingCatalog {
    InMemoryBindingCatalog::new()
        .with_profile(
            ProfileMetadata::new(CONDITION_PROFILE)
                .with_binding(
                    BindingDefinition::required(CLINICAL_STATUS_VS, "clinicalStatus")
                        .with_type(CodedType::CodeableConcept),
                )
                .with_binding(
                    BindingDefinition::required(CATEGORY_VS, "category")
                        .with_type(CodedType::CodeableConcept),
                )
                .with_binding(
                    BindingDefinition::new(
                        BindingStrength::Extensible,
                        "http://hl7.org/fhir/us/core/ValueSet/us-core-condition-code",
                        "code",
                    )
                    .with_type(CodedType::CodeableConcept),
                ),
        )
        .and_then(|catalog| {
            catalog.with_profile(
                ProfileMetadata::new(PATIENT_PROFILE)
                    .with_binding(
                        BindingDefinition::required(GENDER_VS, "gender")
                            .with_type(CodedType::Code)
                            .with_system("http://hl7.org/fhir/administrative-gender"),
                    )
                    .with_binding(
                        BindingDefinition::required(RACE_VS, "valueCoding")
                            .with_type(CodedType::Coding)
                            .with_extension(RACE_EXTENSION)
                            .with_extension("ombCategory"),
                    ),
            )
        })
        .unwrap()
}

/// Terminology with every value set above except the race categories.
#[allow(dead_code)]
pub fn create_test_terminology() -> InMemoryTerminologyService {
    let mut service = InMemoryTerminologyService::new();
    service.add_codes(
        CLINICAL_STATUS_VS,
        &[
            ("active", Some(CLINICAL_STATUS_CS)),
            ("recurrence", Some(CLINICAL_STATUS_CS)),
            ("relapse", Some(CLINICAL_STATUS_CS)),
            ("inactive", Some(CLINICAL_STATUS_CS)),
            ("remission", Some(CLINICAL_STATUS_CS)),
            ("resolved", Some(CLINICAL_STATUS_CS)),
        ],
    );
    service.add_codes(
        CATEGORY_VS,
        &[
            ("problem-list-item", Some(CATEGORY_CS)),
            ("encounter-diagnosis", Some(CATEGORY_CS)),
        ],
    );
    service.add_codes(
        GENDER_VS,
        &[
            ("male", Some("http://hl7.org/fhir/administrative-gender")),
            ("female", Some("http://hl7.org/fhir/administrative-gender")),
            ("other", Some("http://hl7.org/fhir/administrative-gender")),
            ("unknown", Some("http://hl7.org/fhir/administrative-gender")),
        ],
    );
    service.add_code_system(CDC_RACE_CS);
    service
}

#[allow(dead_code)]
pub fn create_test_classifier() -> MessageClassifier {
    MessageClassifier::new(
        &ClassifierConfig::default(),
        Arc::new(create_test_catalog()),
        Arc::new(create_test_terminology()),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn condition(clinical_status: &str, category: &str) -> Value {
    json!({
        "resourceType": "Condition",
        "id": "cond-1",
        "clinicalStatus": {"coding": [{"system": CLINICAL_STATUS_CS, "code": clinical_status}]},
        "category": [{"coding": [{"system": CATEGORY_CS, "code": category}]}],
        "code": {"coding": [{"system": "http://snomed.info/sct", "code": "44054006"}]},
        "subject": {"reference": "Patient/85"}
    })
}

#[allow(dead_code)]
pub fn patient_with_race(gender: &str, race_code: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "id": "85",
        "gender": gender,
        "extension": [{
            "url": RACE_EXTENSION,
            "extension": [
                {"url": "ombCategory", "valueCoding": {"system": CDC_RACE_CS, "code": race_code}},
                {"url": "text", "valueString": "Mixed"}
            ]
        }]
    })
}
