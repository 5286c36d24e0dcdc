//! Merging of structural validator messages and binding validator findings.

use futures::StreamExt;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;

use crate::binding::BindingCatalog;
use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::filter::MessageFilter;
use crate::message::ValidationMessage;
use crate::terminology::{CachedTerminologyService, TerminologyService};
use crate::validator::TerminologyBindingValidator;

/// One resource/profile pair to classify.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub resource: Value,
    pub profile_url: String,
    pub structural_messages: Vec<ValidationMessage>,
}

impl ClassificationRequest {
    pub fn new(
        resource: Value,
        profile_url: impl Into<String>,
        structural_messages: Vec<ValidationMessage>,
    ) -> Self {
        Self {
            resource,
            profile_url: profile_url.into(),
            structural_messages,
        }
    }
}

/// Result for the request at `index` of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub result: Result<Vec<ValidationMessage>>,
}

/// Produces the reported message set for one resource validated against one profile.
///
/// Cheap to clone; all collaborators are shared read-only.
#[derive(Clone)]
pub struct MessageClassifier {
    filter: Arc<MessageFilter>,
    catalog: Arc<dyn BindingCatalog>,
    binding_validator: Arc<TerminologyBindingValidator>,
    max_concurrent_validations: usize,
}

impl MessageClassifier {
    /// Build a classifier from configuration. The terminology service is
    /// wrapped in a cache when `config.cache` is set.
    pub fn new(
        config: &ClassifierConfig,
        catalog: Arc<dyn BindingCatalog>,
        terminology: Arc<dyn TerminologyService>,
    ) -> Result<Self> {
        config.validate()?;

        let terminology: Arc<dyn TerminologyService> = match &config.cache {
            Some(cache) => Arc::new(CachedTerminologyService::new(terminology, cache.clone())),
            None => terminology,
        };

        Ok(Self::from_parts(
            MessageFilter::from_config(config)?,
            catalog,
            TerminologyBindingValidator::new(terminology, config.terminology_timeout),
            config.max_concurrent_validations,
        ))
    }

    pub fn from_parts(
        filter: MessageFilter,
        catalog: Arc<dyn BindingCatalog>,
        binding_validator: TerminologyBindingValidator,
        max_concurrent_validations: usize,
    ) -> Self {
        Self {
            filter: Arc::new(filter),
            catalog,
            binding_validator: Arc::new(binding_validator),
            max_concurrent_validations: max_concurrent_validations.max(1),
        }
    }

    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    /// Filter the structural messages, then append the findings of every
    /// required binding on the profile.
    ///
    /// An unknown profile URL contributes no binding findings. Terminology
    /// service faults abort the classification and are returned as errors.
    pub async fn classify(
        &self,
        resource: &Value,
        profile_url: &str,
        structural_messages: &[ValidationMessage],
    ) -> Result<Vec<ValidationMessage>> {
        let mut messages = self.filter.retain(structural_messages);
        messages.extend(self.binding_messages(resource, profile_url).await?);
        Ok(messages)
    }

    /// Findings of the binding validator alone, in catalog binding order.
    pub async fn binding_messages(
        &self,
        resource: &Value,
        profile_url: &str,
    ) -> Result<Vec<ValidationMessage>> {
        let Some(metadata) = self.catalog.metadata_for(profile_url) else {
            tracing::debug!("No binding metadata for {}", profile_url);
            return Ok(Vec::new());
        };

        let evaluations = metadata
            .required_bindings()
            .map(|binding| self.binding_validator.validate(resource, binding));
        let per_binding = try_join_all(evaluations).await?;

        Ok(per_binding.into_iter().flatten().collect())
    }

    /// Classify many requests with at most `max_concurrent_validations` in
    /// flight. Each request gets its own result; outcomes are returned in
    /// request order.
    pub async fn classify_batch(&self, requests: Vec<ClassificationRequest>) -> Vec<BatchOutcome> {
        tracing::info!(
            "Classifying {} resources with concurrency {}",
            requests.len(),
            self.max_concurrent_validations
        );

        let mut outcomes: Vec<BatchOutcome> = futures::stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move {
                let result = self
                    .classify(
                        &request.resource,
                        &request.profile_url,
                        &request.structural_messages,
                    )
                    .await;
                BatchOutcome { index, result }
            })
            .buffer_unordered(self.max_concurrent_validations)
            .collect()
            .await;

        outcomes.sort_by_key(|outcome| outcome.index);

        let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();
        tracing::info!(
            "Classified {} resources ({} failed)",
            outcomes.len(),
            failed
        );

        outcomes
    }
}

impl std::fmt::Debug for MessageClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageClassifier")
            .field("filter", &self.filter)
            .field("binding_validator", &self.binding_validator)
            .field("max_concurrent_validations", &self.max_concurrent_validations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingDefinition, BindingStrength, CodedType, InMemoryBindingCatalog, ProfileMetadata};
    use crate::message::MessageType;
    use crate::terminology::InMemoryTerminologyService;
    use serde_json::json;

    const PROFILE: &str = "http://hl7.org/fhir/us/core/StructureDefinition/us-core-observation-lab";
    const STATUS_VS: &str = "http://hl7.org/fhir/ValueSet/observation-status";

    fn classifier() -> MessageClassifier {
        let catalog = InMemoryBindingCatalog::new()
            .with_profile(
                ProfileMetadata::new(PROFILE)
                    .with_binding(
                        BindingDefinition::required(STATUS_VS, "status").with_type(CodedType::Code),
                    )
                    .with_binding(BindingDefinition::new(
                        BindingStrength::Extensible,
                        "http://example.org/vs/never-checked",
                        "code",
                    )),
            )
            .unwrap();

        let mut terminology = InMemoryTerminologyService::new();
        terminology.add_codes(STATUS_VS, &[("final", None), ("preliminary", None)]);

        MessageClassifier::new(
            &ClassifierConfig::default(),
            Arc::new(catalog),
            Arc::new(terminology),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_profile_returns_filtered_structural_messages() {
        let structural = vec![
            ValidationMessage::info("ok"),
            ValidationMessage::error("Observation: Observation.subject: minimum required = 1"),
        ];
        let resource = json!({"resourceType": "Observation", "status": "bogus"});

        let messages = classifier()
            .classify(&resource, "http://example.org/unknown-profile", &structural)
            .await
            .unwrap();
        assert_eq!(messages, vec![structural[1].clone()]);
    }

    #[tokio::test]
    async fn test_only_required_bindings_are_evaluated() {
        let resource = json!({
            "resourceType": "Observation",
            "id": "lab",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "1234-5"}]}
        });
        let messages = classifier().classify(&resource, PROFILE, &[]).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_binding_messages_follow_structural_messages() {
        let structural = vec![ValidationMessage::warning(
            "Observation.code: Unknown CodeSystem 'http://loinc.org'",
        )];
        let resource = json!({"resourceType": "Observation", "id": "lab", "status": "bogus"});

        let messages = classifier()
            .classify(&resource, PROFILE, &structural)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], structural[0]);
        assert_eq!(messages[1].message_type(), MessageType::Error);
        assert!(messages[1].message().contains("bogus"));
    }

    #[tokio::test]
    async fn test_classify_batch_keeps_request_order() {
        let requests = (0..8)
            .map(|i| {
                let status = if i % 2 == 0 { "final" } else { "bogus" };
                ClassificationRequest::new(
                    json!({"resourceType": "Observation", "id": format!("o{i}"), "status": status}),
                    PROFILE,
                    Vec::new(),
                )
            })
            .collect();

        let outcomes = classifier().classify_batch(requests).await;
        assert_eq!(outcomes.len(), 8);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            let messages = outcome.result.as_ref().unwrap();
            assert_eq!(messages.len(), i % 2);
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ClassifierConfig::default().with_max_concurrent_validations(0);
        let result = MessageClassifier::new(
            &config,
            Arc::new(InMemoryBindingCatalog::new()),
            Arc::new(InMemoryTerminologyService::new()),
        );
        assert!(result.is_err());
    }
}
