//! # OctoFHIR Conformance
//!
//! Validator message classification and required terminology binding
//! checks for FHIR API certification testing.
//!
//! ## Features
//!
//! - **Message filtering**: ordered, composable suppression rules for
//!   structural validator noise
//! - **Binding validation**: re-checks coded values against value sets bound
//!   with `required` strength
//! - **Unknown terminology handling**: incomplete terminology data becomes
//!   `warning` messages instead of failures
//! - **Concurrency**: bindings and resources are evaluated concurrently with
//!   a bounded worker pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octofhir_conformance::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let catalog = InMemoryBindingCatalog::from_path("us-core-bindings.json")?;
//! let terminology = InMemoryTerminologyService::from_path("terminology.json")?;
//!
//! let classifier = MessageClassifier::new(
//!     &ClassifierConfig::default(),
//!     Arc::new(catalog),
//!     Arc::new(terminology),
//! )?;
//!
//! let resource: serde_json::Value = serde_json::from_str("{}")?;
//! let structural: Vec<ValidationMessage> = Vec::new();
//! let report = classifier
//!     .classify(
//!         &resource,
//!         "http://hl7.org/fhir/us/core/StructureDefinition/us-core-patient",
//!         &structural,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod message;
pub mod terminology;
pub mod utils;
pub mod validator;

pub use binding::{
    BindingCatalog, BindingDefinition, BindingStrength, CodedType, CodedValue, Coding,
    InMemoryBindingCatalog, ProfileMetadata, extract_coded_values,
};
pub use classifier::{BatchOutcome, ClassificationRequest, MessageClassifier};
pub use config::{ClassifierConfig, SmartAppLaunchVersion, SuiteFeatures, UsCoreVersion};
pub use error::Result;
pub use error::ConformanceError;
pub use filter::{
    InformationalRule, MessageFilter, PredicateRule, StructuralTerminologyErrorRule,
    SuiteFilterRule, SuppressionRule, UnlistedWarningRule,
};
pub use message::{MessageType, ValidationMessage};
pub use terminology::{
    CacheStats, CachedTerminologyService, InMemoryTerminologyService, MembershipOutcome,
    TerminologyCacheConfig, TerminologyError, TerminologyErrorCode, TerminologyResult,
    TerminologyService, UnknownTerminology,
};
pub use validator::TerminologyBindingValidator;
