use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{EntityCategory, Importance, Pathology, ScoreDirection};

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference data load failed ({0}): {1}")]
    Load(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    Parse(String, String),

    #[error("Invalid pattern '{name}' in {category}: {reason}")]
    InvalidPattern {
        name: String,
        category: EntityCategory,
        reason: String,
    },

    #[error("Invalid scale {0}: {1}")]
    InvalidScale(String, String),
}

/// One entry of a category pattern library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub category: EntityCategory,
    /// Regular expression. A `value` named group captures a numeric score.
    pub pattern: String,
    /// Fixed mention name. When absent, the normalized matched text is used.
    #[serde(default)]
    pub label: Option<String>,
    pub confidence: f32,
    /// Pathologies this pattern targets. Empty means general.
    #[serde(default)]
    pub pathologies: Vec<Pathology>,
}

impl PatternSpec {
    pub fn new(category: EntityCategory, pattern: &str, confidence: f32) -> Self {
        Self {
            category,
            pattern: pattern.to_string(),
            label: None,
            confidence,
            pathologies: Vec::new(),
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn for_pathologies(mut self, pathologies: &[Pathology]) -> Self {
        self.pathologies = pathologies.to_vec();
        self
    }

    pub fn is_general(&self) -> bool {
        self.pathologies.is_empty()
    }

    /// Display name used in error messages and logs.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.pattern)
    }
}

/// A preferred term and the surface forms that canonicalize to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymGroup {
    pub preferred: String,
    pub synonyms: Vec<String>,
}

/// Canonicalization lookup: normalized surface form to preferred term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SynonymGroup>", into = "Vec<SynonymGroup>")]
pub struct SynonymTable {
    groups: Vec<SynonymGroup>,
    index: HashMap<String, usize>,
}

impl From<Vec<SynonymGroup>> for SynonymTable {
    fn from(groups: Vec<SynonymGroup>) -> Self {
        let mut index = HashMap::new();
        for (i, group) in groups.iter().enumerate() {
            index.insert(normalize_term(&group.preferred), i);
            for synonym in &group.synonyms {
                index.entry(normalize_term(synonym)).or_insert(i);
            }
        }
        Self { groups, index }
    }
}

impl From<SynonymTable> for Vec<SynonymGroup> {
    fn from(table: SynonymTable) -> Self {
        table.groups
    }
}

impl SynonymTable {
    /// Preferred term for a surface form, if the table knows it.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.index
            .get(&normalize_term(name))
            .map(|&i| self.groups[i].preferred.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Lowercase, keep alphanumerics, collapse everything else to single spaces.
/// Hyphens and slashes separate words ("triple-h" and "triple h" agree).
pub fn normalize_term(term: &str) -> String {
    term.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A functional-status scale: range and which direction is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleDefinition {
    /// Key matching the functional-score pattern label ("gcs", "mrs").
    pub name: String,
    pub display: String,
    pub min: f64,
    pub max: f64,
    pub direction: ScoreDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleTable {
    pub scales: Vec<ScaleDefinition>,
}

impl ScaleTable {
    pub fn get(&self, name: &str) -> Option<&ScaleDefinition> {
        let key = normalize_term(name);
        self.scales.iter().find(|s| normalize_term(&s.name) == key)
    }

    pub fn validate(&self) -> Result<(), ReferenceError> {
        for scale in &self.scales {
            if !(scale.max > scale.min) {
                return Err(ReferenceError::InvalidScale(
                    scale.name.clone(),
                    format!("max ({}) must exceed min ({})", scale.max, scale.min),
                ));
            }
        }
        Ok(())
    }
}

/// A prophylactic agent and the complications it is expected to prevent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphylaxisRule {
    pub agent: String,
    pub expected_complications: Vec<String>,
    /// Response window in days; falls back to the pipeline default.
    #[serde(default)]
    pub window_days: Option<i64>,
}

/// Adverse effects to look for after an intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideEffectRule {
    pub intervention: String,
    pub adverse_effects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolRequirement {
    /// One of the agents given for at least `min_days` days.
    MedicationCourse { agents: Vec<String>, min_days: i64 },
    /// One of the procedures performed within `hours` of ictus (or admission).
    ProcedureWithin { procedures: Vec<String>, hours: i64 },
    /// At least one of the imaging studies performed.
    ImagingPerformed { studies: Vec<String> },
    /// At least one of the scales documented.
    ScoreDocumented { scales: Vec<String> },
    /// When one of the complications occurs, one of the procedures follows it.
    ConditionalProcedure {
        if_complications: Vec<String>,
        procedures: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolItem {
    pub id: String,
    pub description: String,
    pub importance: Importance,
    pub requirement: ProtocolRequirement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolChecklist {
    pub pathology: Pathology,
    pub items: Vec<ProtocolItem>,
}
