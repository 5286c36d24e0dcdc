//! Required terminology binding validation.
//!
//! The structural validator does not check that coded values come from the
//! value sets bound with `required` strength. [`TerminologyBindingValidator`]
//! re-checks every coded value at a binding's path against the terminology
//! service and reports:
//!
//! - one `error` per coded value that is not a member of the value set
//! - one `warning` per unknown value set / code system reported by the service
//!
//! Service faults (including timeouts) are returned as [`TerminologyError`]
//! and are never turned into messages.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::binding::{BindingDefinition, CodedValue, Coding, extract_coded_values};
use crate::message::ValidationMessage;
use crate::terminology::{
    MembershipOutcome, TerminologyResult, TerminologyService, UnknownTerminology,
};
use crate::utils::async_helpers::with_timeout;

/// Outcome for one coded value, folded over its codings
enum ValueVerdict {
    Conforms,
    NotMember,
    Unknown(UnknownTerminology),
}

pub struct TerminologyBindingValidator {
    terminology: Arc<dyn TerminologyService>,
    timeout: Duration,
}

impl TerminologyBindingValidator {
    pub fn new(terminology: Arc<dyn TerminologyService>, timeout: Duration) -> Self {
        Self {
            terminology,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate every coded value in `resource` at the binding's path.
    ///
    /// The binding's strength is not consulted; callers select which
    /// bindings to evaluate. Messages follow extraction order.
    pub async fn validate(
        &self,
        resource: &Value,
        binding: &BindingDefinition,
    ) -> TerminologyResult<Vec<ValidationMessage>> {
        let value_set = binding.value_set_url();
        let values = extract_coded_values(resource, binding);

        let mut messages = Vec::new();
        let mut reported_unknown = HashSet::new();

        for value in &values {
            match self.evaluate(value, value_set).await? {
                ValueVerdict::Conforms => {}
                ValueVerdict::NotMember => {
                    messages.push(ValidationMessage::error(not_member_message(
                        resource, value, value_set,
                    )));
                }
                ValueVerdict::Unknown(unknown) => {
                    if reported_unknown.insert(unknown.message().to_string()) {
                        tracing::warn!(
                            "Terminology data incomplete at {}: {}",
                            value.location,
                            unknown.message()
                        );
                        messages.push(ValidationMessage::warning(unknown.message()));
                    }
                    // Every further lookup against an unknown value set fails the same way
                    if matches!(unknown, UnknownTerminology::ValueSet { .. }) {
                        break;
                    }
                }
            }
        }

        Ok(messages)
    }

    async fn evaluate(&self, value: &CodedValue, value_set: &str) -> TerminologyResult<ValueVerdict> {
        let mut unknown = None;

        for coding in &value.codings {
            match self.check(coding, value_set).await? {
                MembershipOutcome::Member => return Ok(ValueVerdict::Conforms),
                MembershipOutcome::NotMember => {}
                MembershipOutcome::Unknown(found) => {
                    let value_set_unknown = matches!(found, UnknownTerminology::ValueSet { .. });
                    unknown.get_or_insert(found);
                    if value_set_unknown {
                        break;
                    }
                }
            }
        }

        Ok(match unknown {
            Some(found) => ValueVerdict::Unknown(found),
            None => ValueVerdict::NotMember,
        })
    }

    async fn check(&self, coding: &Coding, value_set: &str) -> TerminologyResult<MembershipOutcome> {
        with_timeout(
            self.terminology
                .check_membership(&coding.code, coding.system.as_deref(), value_set),
            self.timeout,
            value_set,
        )
        .await
    }
}

impl std::fmt::Debug for TerminologyBindingValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminologyBindingValidator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn not_member_message(resource: &Value, value: &CodedValue, value_set: &str) -> String {
    let resource_type = resource
        .get("resourceType")
        .and_then(|v| v.as_str())
        .unwrap_or("Resource");
    let subject = match resource.get("id").and_then(|v| v.as_str()) {
        Some(id) => format!("{resource_type}/{id}"),
        None => resource_type.to_string(),
    };

    let codes = value
        .codings
        .iter()
        .map(|coding| {
            format!(
                "`{}|{}`",
                coding.system.as_deref().unwrap_or("the declared CodeSystem"),
                coding.code
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{subject} at {} with code {codes} is not in {value_set}",
        value.location
    )
}
