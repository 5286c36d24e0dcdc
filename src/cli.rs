//! Command implementations behind the `g10-classify` binary.

use clap::Args;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::binding::InMemoryBindingCatalog;
use crate::classifier::MessageClassifier;
use crate::config::{ClassifierConfig, SmartAppLaunchVersion, SuiteFeatures, UsCoreVersion};
use crate::error::{ConformanceError, Result};
use crate::filter::MessageFilter;
use crate::message::ValidationMessage;
use crate::terminology::InMemoryTerminologyService;

/// Suite options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// US Core version whose suite filters apply (3.1.1, 4.0.0)
    #[arg(long, default_value = "3.1.1")]
    pub us_core_version: String,
    /// SMART App Launch version (1.0.0, 2.0.0)
    #[arg(long, default_value = "1.0.0")]
    pub smart_app_launch_version: String,
    /// Enable US Core 4.0.0 support
    #[arg(long)]
    pub us_core_4: bool,
    /// Enable SMART App Launch 2.0.0 support
    #[arg(long)]
    pub smart_2: bool,
}

impl Default for SuiteArgs {
    fn default() -> Self {
        Self {
            us_core_version: UsCoreVersion::default().to_string(),
            smart_app_launch_version: SmartAppLaunchVersion::default().to_string(),
            us_core_4: false,
            smart_2: false,
        }
    }
}

/// Inputs of the `classify` subcommand
#[derive(Debug, Clone)]
pub struct ClassifyInputs<'a> {
    pub resource: &'a Path,
    pub profile: &'a str,
    pub messages: Option<&'a Path>,
    pub catalog: &'a Path,
    pub terminology: &'a Path,
    pub timeout: Duration,
}

/// Messages left after a command ran
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub messages: Vec<ValidationMessage>,
}

impl Report {
    /// A report passes when no `error` message remains
    pub fn passed(&self) -> bool {
        !self.messages.iter().any(|message| message.is_error())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }
}

pub fn build_config(suite: &SuiteArgs) -> Result<ClassifierConfig> {
    let us_core = UsCoreVersion::parse_str(&suite.us_core_version).ok_or_else(|| {
        ConformanceError::configuration(format!(
            "Unsupported US Core version: {}",
            suite.us_core_version
        ))
    })?;
    let smart = SmartAppLaunchVersion::parse_str(&suite.smart_app_launch_version).ok_or_else(|| {
        ConformanceError::configuration(format!(
            "Unsupported SMART App Launch version: {}",
            suite.smart_app_launch_version
        ))
    })?;

    let config = ClassifierConfig::default()
        .with_features(SuiteFeatures {
            us_core_v4: suite.us_core_4,
            smart_v2: suite.smart_2,
        })
        .with_us_core_version(us_core)
        .with_smart_app_launch_version(smart);
    config.validate()?;
    Ok(config)
}

pub fn load_messages(path: &Path) -> Result<Vec<ValidationMessage>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn run_filter(messages: &Path, suite: &SuiteArgs) -> Result<Report> {
    let config = build_config(suite)?;
    let filter = MessageFilter::from_config(&config)?;
    Ok(Report {
        messages: filter.retain(&load_messages(messages)?),
    })
}

pub async fn run_classify(inputs: &ClassifyInputs<'_>, suite: &SuiteArgs) -> Result<Report> {
    let config = build_config(suite)?.with_terminology_timeout(inputs.timeout);

    let catalog = InMemoryBindingCatalog::from_path(inputs.catalog)?;
    let terminology = InMemoryTerminologyService::from_path(inputs.terminology)?;
    let classifier = MessageClassifier::new(&config, Arc::new(catalog), Arc::new(terminology))?;

    let resource: Value = serde_json::from_str(&std::fs::read_to_string(inputs.resource)?)?;
    let structural = match inputs.messages {
        Some(path) => load_messages(path)?,
        None => Vec::new(),
    };

    let messages = classifier
        .classify(&resource, inputs.profile, &structural)
        .await?;
    Ok(Report { messages })
}
