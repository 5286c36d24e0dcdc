//! Built-in suppression rules.

use regex::RegexSet;
use std::fmt;
use std::sync::LazyLock;

use crate::error::Result;
use crate::message::{MessageType, ValidationMessage};

/// Default allow-list of warning texts that are reported instead of suppressed
pub const WARNING_INCLUSION_FILTERS: &[&str] = &["Unknown CodeSystem", "Unknown ValueSet"];

/// Structural validator terminology errors that duplicate binding validator findings
pub const STRUCTURAL_TERMINOLOGY_ERRORS: &[&str] = &[
    r"\A\S+: \S+: Unknown Code",
    r"\A\S+: \S+: None of the codings provided are in the value set",
];

static WARNING_INCLUSIONS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(WARNING_INCLUSION_FILTERS).expect("warning inclusion patterns compile")
});

static STRUCTURAL_TERMINOLOGY_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(STRUCTURAL_TERMINOLOGY_ERRORS).expect("structural terminology patterns compile")
});

/// A single, independently testable suppression predicate.
pub trait SuppressionRule: Send + Sync + fmt::Debug {
    /// Short identifier used in logs
    fn tag(&self) -> &str;

    /// Whether `message` should be suppressed by this rule
    fn matches(&self, message: &ValidationMessage) -> bool;
}

/// Suppresses every `info` message.
#[derive(Debug, Default, Clone, Copy)]
pub struct InformationalRule;

impl SuppressionRule for InformationalRule {
    fn tag(&self) -> &str {
        "informational"
    }

    fn matches(&self, message: &ValidationMessage) -> bool {
        message.message_type() == MessageType::Info
    }
}

/// Suppresses warnings unless their text matches one of the inclusion patterns.
#[derive(Debug, Clone)]
pub struct UnlistedWarningRule {
    inclusions: RegexSet,
}

impl UnlistedWarningRule {
    pub fn new<I, S>(inclusions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            inclusions: RegexSet::new(inclusions)?,
        })
    }
}

impl Default for UnlistedWarningRule {
    fn default() -> Self {
        Self {
            inclusions: WARNING_INCLUSIONS.clone(),
        }
    }
}

impl SuppressionRule for UnlistedWarningRule {
    fn tag(&self) -> &str {
        "unlisted-warning"
    }

    fn matches(&self, message: &ValidationMessage) -> bool {
        message.message_type() == MessageType::Warning && !self.inclusions.is_match(message.message())
    }
}

/// Suppresses any message, of any severity, whose text matches a suite-supplied pattern.
#[derive(Debug, Clone)]
pub struct SuiteFilterRule {
    patterns: RegexSet,
}

impl SuiteFilterRule {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl SuppressionRule for SuiteFilterRule {
    fn tag(&self) -> &str {
        "suite-filter"
    }

    fn matches(&self, message: &ValidationMessage) -> bool {
        self.patterns.is_match(message.message())
    }
}

/// Suppresses structural validator errors about codes outside a value set;
/// the binding validator reports those with the correct severity.
#[derive(Debug, Clone)]
pub struct StructuralTerminologyErrorRule {
    patterns: RegexSet,
}

impl Default for StructuralTerminologyErrorRule {
    fn default() -> Self {
        Self {
            patterns: STRUCTURAL_TERMINOLOGY_PATTERNS.clone(),
        }
    }
}

impl SuppressionRule for StructuralTerminologyErrorRule {
    fn tag(&self) -> &str {
        "structural-terminology-error"
    }

    fn matches(&self, message: &ValidationMessage) -> bool {
        message.is_error() && self.patterns.is_match(message.message())
    }
}

/// A rule backed by an arbitrary predicate, for suite-specific additions.
pub struct PredicateRule {
    tag: String,
    predicate: Box<dyn Fn(&ValidationMessage) -> bool + Send + Sync>,
}

impl PredicateRule {
    pub fn new<F>(tag: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ValidationMessage) -> bool + Send + Sync + 'static,
    {
        Self {
            tag: tag.into(),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for PredicateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRule")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl SuppressionRule for PredicateRule {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn matches(&self, message: &ValidationMessage) -> bool {
        (self.predicate)(message)
    }
}
