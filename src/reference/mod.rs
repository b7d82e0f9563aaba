//! Immutable clinical reference data consumed by the pipeline.
//!
//! Everything the heuristics need beyond the notes themselves: pattern
//! libraries, synonym table, functional scales, prophylaxis and side-effect
//! rules, protocol checklists and the pipeline thresholds. Built once, then
//! shared read-only (it is `Send + Sync`).

pub mod builtin;
pub mod patterns;
pub mod types;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::models::Pathology;
use crate::pipeline_config::PipelineSettings;

pub use patterns::{CompiledPattern, PatternLibrary};
pub use types::*;

#[derive(Debug, Clone)]
pub struct ClinicalReference {
    pub settings: PipelineSettings,
    pub patterns: PatternLibrary,
    pub synonyms: SynonymTable,
    pub scales: ScaleTable,
    pub prophylaxis: Vec<ProphylaxisRule>,
    pub side_effects: Vec<SideEffectRule>,
    pub protocols: Vec<ProtocolChecklist>,
}

impl ClinicalReference {
    /// Bundled tables with default settings.
    pub fn builtin() -> Result<Self, ReferenceError> {
        Ok(Self {
            settings: PipelineSettings::default(),
            patterns: PatternLibrary::compile(builtin::patterns())?,
            synonyms: builtin::synonyms(),
            scales: builtin::scales(),
            prophylaxis: builtin::prophylaxis(),
            side_effects: builtin::side_effects(),
            protocols: builtin::protocols(),
        })
    }

    /// Load reference data from a directory of JSON files.
    ///
    /// Each file is optional; a missing file falls back to the bundled table.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(dir: &Path) -> Result<Self, ReferenceError> {
        let settings = read_optional(dir, "settings.json")?.unwrap_or_default();
        let pattern_specs = read_optional(dir, "patterns.json")?.unwrap_or_else(builtin::patterns);
        let synonyms = read_optional(dir, "synonyms.json")?.unwrap_or_else(builtin::synonyms);
        let scales: ScaleTable = read_optional(dir, "scales.json")?.unwrap_or_else(builtin::scales);
        scales.validate()?;
        let prophylaxis = read_optional(dir, "prophylaxis.json")?.unwrap_or_else(builtin::prophylaxis);
        let side_effects =
            read_optional(dir, "side_effects.json")?.unwrap_or_else(builtin::side_effects);
        let protocols = read_optional(dir, "protocols.json")?.unwrap_or_else(builtin::protocols);

        let reference = Self {
            settings,
            patterns: PatternLibrary::compile(pattern_specs)?,
            synonyms,
            scales,
            prophylaxis,
            side_effects,
            protocols,
        };
        tracing::debug!(
            dir = %dir.display(),
            patterns = reference.patterns.len(),
            synonym_groups = reference.synonyms.len(),
            "Loaded clinical reference"
        );
        Ok(reference)
    }

    /// Preferred term when the synonym table knows the name, else the normalized name.
    pub fn canonical_name(&self, name: &str) -> String {
        self.synonyms
            .canonical(name)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_term(name))
    }

    /// Whether two names denote the same concept after canonicalization.
    pub fn same_concept(&self, a: &str, b: &str) -> bool {
        let (a, b) = (self.canonical_name(a), self.canonical_name(b));
        !a.is_empty() && a == b
    }

    pub fn prophylaxis_for(&self, name: &str) -> Option<&ProphylaxisRule> {
        self.prophylaxis
            .iter()
            .find(|rule| self.same_concept(&rule.agent, name))
    }

    pub fn side_effects_for(&self, name: &str) -> Option<&SideEffectRule> {
        self.side_effects
            .iter()
            .find(|rule| self.same_concept(&rule.intervention, name))
    }

    pub fn protocol_for(&self, pathology: Pathology) -> Option<&ProtocolChecklist> {
        self.protocols.iter().find(|c| c.pathology == pathology)
    }
}

fn read_optional<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>, ReferenceError> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(&path)
        .map_err(|e| ReferenceError::Load(path.display().to_string(), e.to_string()))?;
    let parsed =
        serde_json::from_str(&json).map_err(|e| ReferenceError::Parse(file.into(), e.to_string()))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityCategory;

    #[test]
    fn builtin_reference_loads() {
        let reference = ClinicalReference::builtin().unwrap();
        assert!(!reference.patterns.is_empty());
        assert!(reference.protocol_for(Pathology::Sah).is_some());
        assert_eq!(reference.settings, PipelineSettings::default());
    }

    #[test]
    fn empty_dir_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ClinicalReference::load(dir.path()).unwrap();
        let builtin = ClinicalReference::builtin().unwrap();
        assert_eq!(loaded.patterns.len(), builtin.patterns.len());
        assert_eq!(loaded.synonyms.len(), builtin.synonyms.len());
    }

    #[test]
    fn files_override_individual_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"merge_threshold": 0.9}"#).unwrap();
        std::fs::write(
            dir.path().join("patterns.json"),
            r#"[{"category": "complication", "pattern": "(?i)\\bmeningitis\\b", "confidence": 0.8}]"#,
        )
        .unwrap();

        let loaded = ClinicalReference::load(dir.path()).unwrap();
        assert!((loaded.settings.merge_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(loaded.settings.negation_window_tokens, 6);
        assert_eq!(loaded.patterns.len(), 1);
        assert_eq!(
            loaded.patterns.for_category(EntityCategory::Complication, None).count(),
            1
        );
        // Untouched tables keep their bundled contents
        assert!(loaded.prophylaxis_for("nimodipine").is_some());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("synonyms.json"), "{not json").unwrap();
        let err = ClinicalReference::load(dir.path()).unwrap_err();
        assert!(matches!(err, ReferenceError::Parse(ref f, _) if f == "synonyms.json"));
    }

    #[test]
    fn invalid_pattern_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("patterns.json"),
            r#"[{"category": "outcome", "pattern": "(unclosed", "confidence": 0.5}]"#,
        )
        .unwrap();
        let err = ClinicalReference::load(dir.path()).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidPattern { .. }));
    }

    #[test]
    fn prophylaxis_lookup_uses_synonyms() {
        let reference = ClinicalReference::builtin().unwrap();
        assert_eq!(reference.prophylaxis_for("Keppra").unwrap().agent, "levetiracetam");
        assert!(reference.prophylaxis_for("induced hypertension").is_none());
        assert!(reference.side_effects_for("Triple-H therapy").is_some());
    }

    #[test]
    fn reference_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClinicalReference>();
    }
}
