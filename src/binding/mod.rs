//! Profile binding metadata.
//!
//! Each known profile carries an ordered list of terminology bindings, as
//! published in the test suite's profile metadata. The catalog is read-only
//! once built and is shared across concurrent classifications.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use url::Url;

use crate::error::{ConformanceError, Result};

pub mod path;

pub use path::{Coding, CodedValue, extract_coded_values};

/// FHIR binding strength levels. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum BindingStrength {
    /// Code MUST be from the value set
    Required,
    /// Code SHOULD be from the value set, but others allowed with text
    Extensible,
    /// Code SHOULD be from the value set for interoperability
    Preferred,
    /// Value set is just an example
    Example,
}

impl BindingStrength {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "required" => Some(BindingStrength::Required),
            "extensible" => Some(BindingStrength::Extensible),
            "preferred" => Some(BindingStrength::Preferred),
            "example" => Some(BindingStrength::Example),
            _ => None,
        }
    }
}

impl TryFrom<String> for BindingStrength {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse_str(&value).ok_or_else(|| format!("unknown binding strength '{value}'"))
    }
}

/// FHIR datatype of a bound element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodedType {
    #[serde(rename = "code", alias = "string", alias = "uri")]
    Code,
    Coding,
    CodeableConcept,
    Quantity,
}

/// A single terminology binding on a profile element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingDefinition {
    pub strength: BindingStrength,
    /// Canonical URL of the bound value set, optionally `|version` suffixed
    pub value_set: String,
    /// Code system implied for bare `code` elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Dot-separated element path relative to the resource (or to the
    /// innermost extension when `extensions` is set)
    pub path: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<CodedType>,
    /// Extension URL chain leading to the bound element
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

impl BindingDefinition {
    pub fn new(
        strength: BindingStrength,
        value_set: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            strength,
            value_set: value_set.into(),
            system: None,
            path: path.into(),
            element_type: None,
            extensions: Vec::new(),
        }
    }

    pub fn required(value_set: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(BindingStrength::Required, value_set, path)
    }

    pub fn with_type(mut self, element_type: CodedType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_extension(mut self, url: impl Into<String>) -> Self {
        self.extensions.push(url.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.strength == BindingStrength::Required
    }

    /// Value set URL with any `|version` suffix removed
    pub fn value_set_url(&self) -> &str {
        self.value_set
            .split('|')
            .next()
            .unwrap_or(&self.value_set)
    }
}

/// Binding metadata for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub profile_url: String,
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
}

impl ProfileMetadata {
    pub fn new(profile_url: impl Into<String>) -> Self {
        Self {
            profile_url: profile_url.into(),
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, binding: BindingDefinition) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Bindings with `required` strength, in declaration order
    pub fn required_bindings(&self) -> impl Iterator<Item = &BindingDefinition> {
        self.bindings.iter().filter(|binding| binding.is_required())
    }
}

/// Source of profile binding metadata, looked up by exact profile URL.
pub trait BindingCatalog: Send + Sync {
    /// `None` when the profile is not known; this is not an error.
    fn metadata_for(&self, profile_url: &str) -> Option<Arc<ProfileMetadata>>;
}

/// Catalog held in memory, keyed by exact profile URL.
#[derive(Debug, Default)]
pub struct InMemoryBindingCatalog {
    profiles: papaya::HashMap<String, Arc<ProfileMetadata>>,
}

impl InMemoryBindingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert metadata, rejecting profile URLs that do not parse or are
    /// already registered.
    pub fn insert(&self, metadata: ProfileMetadata) -> Result<()> {
        Url::parse(&metadata.profile_url)?;

        let profiles = self.profiles.pin();
        if profiles.contains_key(&metadata.profile_url) {
            return Err(ConformanceError::catalog(format!(
                "Duplicate profile metadata for {}",
                metadata.profile_url
            )));
        }
        profiles.insert(metadata.profile_url.clone(), Arc::new(metadata));
        Ok(())
    }

    pub fn with_profile(self, metadata: ProfileMetadata) -> Result<Self> {
        self.insert(metadata)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Load from a JSON array of [`ProfileMetadata`] objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<ProfileMetadata> = serde_json::from_str(json)?;
        let catalog = Self::new();
        for metadata in entries {
            catalog.insert(metadata)?;
        }
        tracing::debug!("Loaded binding metadata for {} profiles", catalog.len());
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl BindingCatalog for InMemoryBindingCatalog {
    fn metadata_for(&self, profile_url: &str) -> Option<Arc<ProfileMetadata>> {
        self.profiles.pin().get(profile_url).cloned()
    }
}
