//! Label → fact text lookup.
//!
//! Persisted as a JSON object keyed by the stringified label
//! (`{"0": "...", "7": "..."}`). Loaded once at startup and read-only
//! afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::artifact::{load_json, ArtifactError};
use crate::pipeline::ClassifyError;

const ARTIFACT: &str = "fact table";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactTable {
    facts: BTreeMap<u8, String>,
}

impl FactTable {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw: HashMap<String, String> = load_json(path)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| ArtifactError::invalid(ARTIFACT, e.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u8, S)>,
        S: Into<String>,
    {
        Self {
            facts: entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    fn from_raw(raw: HashMap<String, String>) -> Result<Self, ArtifactError> {
        let mut facts = BTreeMap::new();
        for (key, fact) in raw {
            let label: u8 = key.trim().parse().map_err(|_| {
                ArtifactError::invalid(ARTIFACT, format!("key {key:?} is not a label"))
            })?;
            if facts.insert(label, fact).is_some() {
                return Err(ArtifactError::invalid(
                    ARTIFACT,
                    format!("label {label} appears more than once"),
                ));
            }
        }
        if facts.is_empty() {
            return Err(ArtifactError::invalid(ARTIFACT, "no facts"));
        }
        Ok(Self { facts })
    }

    pub fn lookup(&self, label: u8) -> Result<&str, ClassifyError> {
        self.facts
            .get(&label)
            .map(String::as_str)
            .ok_or(ClassifyError::UnknownLabel(label))
    }

    /// Every label the classifier can emit must have a fact.
    pub fn validate_labels(&self, labels: &[u8]) -> Result<(), ClassifyError> {
        match labels.iter().find(|l| !self.facts.contains_key(*l)) {
            Some(&missing) => Err(ClassifyError::UnknownLabel(missing)),
            None => Ok(()),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = u8> + '_ {
        self.facts.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
