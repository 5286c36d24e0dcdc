use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConformanceError, Result};
use crate::filter::WARNING_INCLUSION_FILTERS;
use crate::terminology::TerminologyCacheConfig;
use crate::utils::duration_millis;

/// US Core Implementation Guide version whose suite filters apply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum UsCoreVersion {
    #[default]
    #[serde(rename = "3.1.1")]
    V311,
    #[serde(rename = "4.0.0")]
    V400,
}

impl UsCoreVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsCoreVersion::V311 => "3.1.1",
            UsCoreVersion::V400 => "4.0.0",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim_start_matches(['v', 'V']) {
            "3.1.1" | "3" | "us_core_3" => Some(UsCoreVersion::V311),
            "4.0.0" | "4" | "us_core_4" => Some(UsCoreVersion::V400),
            _ => None,
        }
    }

    /// Structural validator messages the US Core suite treats as noise
    pub fn message_filters(&self) -> Vec<String> {
        let mut filters: Vec<String> = US_CORE_MESSAGE_FILTERS
            .iter()
            .map(|pattern| pattern.to_string())
            .collect();
        if *self == UsCoreVersion::V400 {
            filters.extend(
                US_CORE_4_MESSAGE_FILTERS
                    .iter()
                    .map(|pattern| pattern.to_string()),
            );
        }
        filters
    }
}

impl std::fmt::Display for UsCoreVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const US_CORE_MESSAGE_FILTERS: &[&str] = &[
    r"Sub-extension url 'introspect' is not defined by the Extension http://fhir-registry\.smarthealthit\.org/StructureDefinition/oauth-uris",
    r"Sub-extension url 'revoke' is not defined by the Extension http://fhir-registry\.smarthealthit\.org/StructureDefinition/oauth-uris",
    // Invalid invariant in FHIR v4.0.1
    r"Observation\.effective\.ofType\(Period\): .*vs-1:",
    // Invalid invariant in US Core v3.1.1
    r"Observation\.effective\.ofType\(Period\): .*us-core-1:",
    r"\A\S+: \S+: URL value '.*' does not resolve",
];

const US_CORE_4_MESSAGE_FILTERS: &[&str] = &[r"Provenance\.agent\[\d*\]: Rule provenance-1"];

/// SMART App Launch version the surrounding suite runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SmartAppLaunchVersion {
    #[default]
    #[serde(rename = "1.0.0")]
    V1,
    #[serde(rename = "2.0.0")]
    V2,
}

impl SmartAppLaunchVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmartAppLaunchVersion::V1 => "1.0.0",
            SmartAppLaunchVersion::V2 => "2.0.0",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim_start_matches(['v', 'V']) {
            "1.0.0" | "1" | "smart_app_launch_1" => Some(SmartAppLaunchVersion::V1),
            "2.0.0" | "2" | "smart_app_launch_2" => Some(SmartAppLaunchVersion::V2),
            _ => None,
        }
    }
}

impl std::fmt::Display for SmartAppLaunchVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release toggles for the surrounding certification suite. Each one gates
/// the newer version choice it names.
///
/// Passed in explicitly; the library never reads them from the process
/// environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SuiteFeatures {
    #[serde(default)]
    pub us_core_v4: bool,
    #[serde(default)]
    pub smart_v2: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub features: SuiteFeatures,
    #[serde(default)]
    pub us_core_version: UsCoreVersion,
    #[serde(default)]
    pub smart_app_launch_version: SmartAppLaunchVersion,
    #[serde(default = "default_warning_inclusion_filters")]
    pub warning_inclusion_filters: Vec<String>,
    /// Ordered suite-specific noise patterns; `None` uses the presets of
    /// `us_core_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_filters: Option<Vec<String>>,
    #[serde(with = "duration_millis", default = "default_terminology_timeout")]
    pub terminology_timeout: Duration,
    #[serde(default = "default_max_concurrent_validations")]
    pub max_concurrent_validations: usize,
    /// `None` disables caching of terminology outcomes
    #[serde(default = "default_cache")]
    pub cache: Option<TerminologyCacheConfig>,
}

fn default_warning_inclusion_filters() -> Vec<String> {
    WARNING_INCLUSION_FILTERS
        .iter()
        .map(|pattern| pattern.to_string())
        .collect()
}

fn default_terminology_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_concurrent_validations() -> usize {
    num_cpus::get() * 2
}

fn default_cache() -> Option<TerminologyCacheConfig> {
    Some(TerminologyCacheConfig::default())
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::for_us_core(UsCoreVersion::V311)
    }
}

impl ClassifierConfig {
    /// Configuration using the suite filters of the given US Core version.
    /// Selecting 4.0.0 also enables the `us_core_v4` feature.
    pub fn for_us_core(version: UsCoreVersion) -> Self {
        Self {
            features: SuiteFeatures {
                us_core_v4: version == UsCoreVersion::V400,
                smart_v2: false,
            },
            us_core_version: version,
            smart_app_launch_version: SmartAppLaunchVersion::default(),
            warning_inclusion_filters: default_warning_inclusion_filters(),
            suite_filters: None,
            terminology_timeout: default_terminology_timeout(),
            max_concurrent_validations: default_max_concurrent_validations(),
            cache: default_cache(),
        }
    }

    pub fn with_features(mut self, features: SuiteFeatures) -> Self {
        self.features = features;
        self
    }

    /// Switch US Core version. Unless suite filters were set explicitly,
    /// that version's presets apply.
    pub fn with_us_core_version(mut self, version: UsCoreVersion) -> Self {
        self.us_core_version = version;
        self
    }

    pub fn with_smart_app_launch_version(mut self, version: SmartAppLaunchVersion) -> Self {
        self.smart_app_launch_version = version;
        self
    }

    /// Replace the version presets with an explicit pattern list
    pub fn with_suite_filters(mut self, suite_filters: Vec<String>) -> Self {
        self.suite_filters = Some(suite_filters);
        self
    }

    /// Suite filter patterns in effect: the explicit list when set,
    /// otherwise the presets of `us_core_version`.
    pub fn effective_suite_filters(&self) -> Vec<String> {
        match &self.suite_filters {
            Some(filters) => filters.clone(),
            None => self.us_core_version.message_filters(),
        }
    }

    pub fn with_terminology_timeout(mut self, timeout: Duration) -> Self {
        self.terminology_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_validations(mut self, max: usize) -> Self {
        self.max_concurrent_validations = max;
        self
    }

    pub fn with_cache(mut self, cache: Option<TerminologyCacheConfig>) -> Self {
        self.cache = cache;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.us_core_version == UsCoreVersion::V400 && !self.features.us_core_v4 {
            return Err(ConformanceError::configuration(
                "US Core 4.0.0 requires the us_core_v4 feature",
            ));
        }
        if self.smart_app_launch_version == SmartAppLaunchVersion::V2 && !self.features.smart_v2 {
            return Err(ConformanceError::configuration(
                "SMART App Launch 2.0.0 requires the smart_v2 feature",
            ));
        }
        if self.max_concurrent_validations == 0 {
            return Err(ConformanceError::configuration(
                "max_concurrent_validations must be at least 1",
            ));
        }
        if self.terminology_timeout.is_zero() {
            return Err(ConformanceError::configuration(
                "terminology_timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
