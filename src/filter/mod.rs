//! Suppression of structural validator noise.
//!
//! A [`MessageFilter`] is an ordered list of [`SuppressionRule`]s combined
//! with logical OR: a message is suppressed when any rule matches it. The
//! standard rule set is, in order:
//!
//! 1. [`InformationalRule`] - all `info` messages
//! 2. [`UnlistedWarningRule`] - warnings not matching the inclusion allow-list
//! 3. [`SuiteFilterRule`] - suite-supplied patterns, any severity
//! 4. [`StructuralTerminologyErrorRule`] - structural "Unknown Code" /
//!    "None of the codings provided" errors
//!
//! Each message is judged on its own; the result never depends on other
//! messages in the same report.

use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::message::ValidationMessage;

mod rules;

pub use rules::{
    InformationalRule, PredicateRule, STRUCTURAL_TERMINOLOGY_ERRORS, StructuralTerminologyErrorRule,
    SuiteFilterRule, SuppressionRule, UnlistedWarningRule, WARNING_INCLUSION_FILTERS,
};

#[derive(Debug, Default)]
pub struct MessageFilter {
    rules: Vec<Box<dyn SuppressionRule>>,
}

impl MessageFilter {
    /// An empty filter suppresses nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard rule set with the given suite filter patterns.
    pub fn standard<I, S>(suite_filters: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::new()
            .with_rule(InformationalRule)
            .with_rule(UnlistedWarningRule::default())
            .with_rule(SuiteFilterRule::new(suite_filters)?)
            .with_rule(StructuralTerminologyErrorRule::default()))
    }

    /// Compile the standard rule set from configuration.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Ok(Self::new()
            .with_rule(InformationalRule)
            .with_rule(UnlistedWarningRule::new(&config.warning_inclusion_filters)?)
            .with_rule(SuiteFilterRule::new(config.effective_suite_filters())?)
            .with_rule(StructuralTerminologyErrorRule::default()))
    }

    /// Append a rule; existing rules are unaffected.
    pub fn with_rule(mut self, rule: impl SuppressionRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_tags(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.tag()).collect()
    }

    /// First rule, in order, that suppresses `message`.
    pub fn matching_rule(&self, message: &ValidationMessage) -> Option<&dyn SuppressionRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map(|rule| rule.as_ref())
    }

    pub fn should_suppress(&self, message: &ValidationMessage) -> bool {
        self.matching_rule(message).is_some()
    }

    /// Messages that survive filtering, in their original order.
    pub fn retain(&self, messages: &[ValidationMessage]) -> Vec<ValidationMessage> {
        messages
            .iter()
            .filter(|message| match self.matching_rule(message) {
                Some(rule) => {
                    tracing::debug!("Suppressed by {}: {}", rule.tag(), message);
                    false
                }
                None => true,
            })
            .cloned()
            .collect()
    }
}
