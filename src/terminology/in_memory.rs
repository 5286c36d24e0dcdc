use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::{MembershipOutcome, TerminologyResult, TerminologyService, UnknownTerminology};
use crate::error::Result;

#[derive(Debug, Default)]
struct ValueSetCodes {
    /// (system, code) pairs; a `None` system matches any coding system
    codes: HashSet<(Option<String>, String)>,
    systems: HashSet<String>,
}

/// A simple in-memory terminology service.
///
/// Holds expanded value sets as flat `(system, code)` sets plus the list of
/// code systems the dataset knows about. Useful for tests, local fixtures
/// and small certification datasets.
#[derive(Debug, Default)]
pub struct InMemoryTerminologyService {
    value_sets: HashMap<String, ValueSetCodes>,
    code_systems: HashSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TerminologyFixture {
    #[serde(default)]
    value_sets: HashMap<String, Vec<FixtureCode>>,
    #[serde(default)]
    code_systems: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureCode {
    code: String,
    #[serde(default)]
    system: Option<String>,
}

impl InMemoryTerminologyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a code to a value set. A code added with a system also registers
    /// that system as known.
    pub fn add_code(&mut self, value_set_url: &str, code: &str, system: Option<&str>) {
        let vs = self
            .value_sets
            .entry(value_set_url.to_string())
            .or_default();
        vs.codes
            .insert((system.map(|s| s.to_string()), code.to_string()));
        if let Some(system) = system {
            vs.systems.insert(system.to_string());
            self.code_systems.insert(system.to_string());
        }
    }

    /// Add multiple codes to a value set
    pub fn add_codes(&mut self, value_set_url: &str, codes: &[(&str, Option<&str>)]) {
        for (code, system) in codes {
            self.add_code(value_set_url, code, *system);
        }
    }

    /// Register a value set with no members, so lookups against it answer
    /// `NotMember` instead of `Unknown`.
    pub fn add_empty_value_set(&mut self, value_set_url: &str) {
        self.value_sets
            .entry(value_set_url.to_string())
            .or_default();
    }

    /// Register a code system as known without adding any codes
    pub fn add_code_system(&mut self, system: &str) {
        self.code_systems.insert(system.to_string());
    }

    pub fn value_set_count(&self) -> usize {
        self.value_sets.len()
    }

    /// Load from a JSON document of the form
    /// `{"valueSets": {"<url>": [{"system": "...", "code": "..."}]}, "codeSystems": ["<url>"]}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let fixture: TerminologyFixture = serde_json::from_str(json)?;
        let mut service = Self::new();

        for (url, codes) in &fixture.value_sets {
            service.add_empty_value_set(url);
            for entry in codes {
                service.add_code(url, &entry.code, entry.system.as_deref());
            }
        }
        for system in &fixture.code_systems {
            service.add_code_system(system);
        }

        tracing::debug!(
            "Loaded {} value sets and {} code systems",
            service.value_sets.len(),
            service.code_systems.len()
        );

        Ok(service)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[async_trait]
impl TerminologyService for InMemoryTerminologyService {
    async fn check_membership(
        &self,
        code: &str,
        system: Option<&str>,
        value_set_url: &str,
    ) -> TerminologyResult<MembershipOutcome> {
        let Some(vs) = self.value_sets.get(value_set_url) else {
            return Ok(MembershipOutcome::Unknown(UnknownTerminology::value_set(
                value_set_url,
            )));
        };

        let Some(system) = system else {
            // Loose matching: a bare code matches the code under any system
            let found = vs.codes.iter().any(|(_, c)| c == code);
            return Ok(if found {
                MembershipOutcome::Member
            } else {
                MembershipOutcome::NotMember
            });
        };

        if !self.code_systems.contains(system) && !vs.systems.contains(system) {
            return Ok(MembershipOutcome::Unknown(UnknownTerminology::code_system(
                system,
            )));
        }

        let qualified = (Some(system.to_string()), code.to_string());
        let unqualified = (None, code.to_string());
        if vs.codes.contains(&qualified) || vs.codes.contains(&unqualified) {
            Ok(MembershipOutcome::Member)
        } else {
            Ok(MembershipOutcome::NotMember)
        }
    }
}
