//! Command-line front end: read a `PipelineInput` as JSON, run the pipeline,
//! print the `PipelineOutput` as JSON on stdout. Logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use crate::config;
use crate::models::Pathology;
use crate::pipeline::{run_pipeline, run_pipeline_with_classifier, KeywordPathologyClassifier, PipelineInput};
use crate::reference::{ClinicalReference, ReferenceError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read {0}: {1}")]
    Read(String, #[source] std::io::Error),

    #[error("Invalid input JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

#[derive(Parser, Debug)]
#[command(name = "clinical-narrative")]
#[command(version = config::APP_VERSION)]
#[command(about = "Structure clinical notes into entities, a causal timeline and outcome analyses", long_about = None)]
pub struct Cli {
    /// Pipeline input JSON file ('-' or omitted for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Reference directory with JSON table overrides
    #[arg(short, long)]
    pub config_dir: Option<PathBuf>,

    /// Pathology hint, overrides the one in the input
    #[arg(short, long)]
    pub pathology: Option<Pathology>,

    /// Detect a pathology hint from the notes when none is given
    #[arg(long)]
    pub detect_pathology: bool,

    /// Single-line JSON output
    #[arg(long)]
    pub compact: bool,
}

impl Cli {
    /// Load reference data: `--config-dir`, else the default directory when it
    /// exists, else the bundled tables.
    pub fn reference(&self) -> Result<ClinicalReference, CliError> {
        if let Some(dir) = &self.config_dir {
            return Ok(ClinicalReference::load(dir)?);
        }
        match config::default_reference_dir() {
            Some(dir) if dir.is_dir() => Ok(ClinicalReference::load(&dir)?),
            _ => Ok(ClinicalReference::builtin()?),
        }
    }

    pub fn read_input(&self) -> Result<PipelineInput, CliError> {
        let json = match self.input.as_deref() {
            Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
                .map_err(|e| CliError::Read(path.display().to_string(), e))?,
            _ => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| CliError::Read("stdin".into(), e))?;
                buf
            }
        };
        parse_input(&json, self.pathology)
    }

    /// Run end to end and return the rendered output JSON.
    pub fn execute(&self) -> Result<String, CliError> {
        let reference = self.reference()?;
        let input = self.read_input()?;
        render(&input, &reference, self.detect_pathology, self.compact)
    }
}

/// Parse input JSON, applying a hint override.
pub fn parse_input(json: &str, pathology: Option<Pathology>) -> Result<PipelineInput, CliError> {
    let mut input: PipelineInput = serde_json::from_str(json)?;
    if pathology.is_some() {
        input.pathology_hint = pathology;
    }
    Ok(input)
}

pub fn render(
    input: &PipelineInput,
    reference: &ClinicalReference,
    detect_pathology: bool,
    compact: bool,
) -> Result<String, CliError> {
    let output = if detect_pathology {
        run_pipeline_with_classifier(input, reference, &KeywordPathologyClassifier)
    } else {
        run_pipeline(input, reference)
    };
    let json = if compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    Ok(json)
}
