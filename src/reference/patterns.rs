use regex::Regex;

use crate::models::{EntityCategory, Pathology};

use super::types::{PatternSpec, ReferenceError};

/// A pattern spec with its compiled regex.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub spec: PatternSpec,
    pub regex: Regex,
}

impl CompiledPattern {
    pub fn compile(spec: PatternSpec) -> Result<Self, ReferenceError> {
        let regex = Regex::new(&spec.pattern).map_err(|e| ReferenceError::InvalidPattern {
            name: spec.display_name().to_string(),
            category: spec.category,
            reason: e.to_string(),
        })?;
        Ok(Self { spec, regex })
    }

    /// Whether this pattern is scanned for the given hint.
    /// No hint scans everything; a hint scans general patterns plus its own.
    pub fn applies_to(&self, hint: Option<Pathology>) -> bool {
        match hint {
            None => true,
            Some(p) => self.spec.is_general() || self.spec.pathologies.contains(&p),
        }
    }
}

/// Category pattern library. Immutable once compiled.
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: Vec<CompiledPattern>,
}

impl PatternLibrary {
    /// Compile every spec; the first invalid regex aborts the load.
    pub fn compile(specs: Vec<PatternSpec>) -> Result<Self, ReferenceError> {
        let patterns = specs
            .into_iter()
            .map(CompiledPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Copy of this library extended with call-time learned patterns.
    /// Learned patterns that fail to compile are skipped, never fatal.
    pub fn with_learned(&self, learned: &[PatternSpec]) -> Self {
        let mut patterns = self.patterns.clone();
        for spec in learned {
            match CompiledPattern::compile(spec.clone()) {
                Ok(compiled) => patterns.push(compiled),
                Err(e) => tracing::warn!(error = %e, "Skipping learned pattern"),
            }
        }
        Self { patterns }
    }

    pub fn for_category(
        &self,
        category: EntityCategory,
        hint: Option<Pathology>,
    ) -> impl Iterator<Item = &CompiledPattern> {
        self.patterns
            .iter()
            .filter(move |p| p.spec.category == category && p.applies_to(hint))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
