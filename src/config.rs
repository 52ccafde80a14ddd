//! Pipeline Configuration
//!
//! Paths, programs and cluster resources for the two job stages. Every field
//! has a default, so an empty file (or no file at all) reproduces the
//! standard layout:
//!
//! ```yaml
//! genes: candidate_genes.csv
//! gene_column: name
//! candidates: steps/cds_data/*.phylib
//! tree_suffix: .nw
//! analysis_dir: steps/codeml
//! summary_dir: steps/summary
//! require_tree_files: false
//! account: simons
//! analysis:
//!   program: python scripts/codeml.py
//!   cores: 1
//!   walltime: "02:00:00"
//!   memory: 8g
//!   delay_secs: 5
//! parse:
//!   program: python scripts/parse_codeml.py
//!   walltime: "00:10:00"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GraphError, Result};
use crate::genes::allowlist::DEFAULT_NAME_COLUMN;
use crate::workflow::model::Resources;

static WALLTIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+:[0-5]\d:[0-5]\d$").expect("walltime regex is valid")
});

static MEMORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+(\.\d+)?[kmgt]b?$").expect("memory regex is valid")
});

/// Returns true for walltimes of the form `HH:MM:SS`.
pub fn is_valid_walltime(walltime: &str) -> bool {
    WALLTIME_RE.is_match(walltime)
}

/// Returns true for memory sizes like `8g`, `512m` or `1.5GB`.
pub fn is_valid_memory(memory: &str) -> bool {
    MEMORY_RE.is_match(memory)
}

/// Program and resources of one job stage.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Command prefix; job arguments are appended to it
    pub program: String,

    pub cores: usize,

    /// Wall-clock limit as `HH:MM:SS`
    pub walltime: String,

    pub memory: String,

    /// Seconds to sleep after the program exits
    pub delay_secs: u64,
}

/// Stage fields as written in a configuration file. Missing fields fall
/// back to the stage's own defaults.
#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct StageOverride {
    program: Option<String>,
    cores: Option<usize>,
    walltime: Option<String>,
    memory: Option<String>,
    delay_secs: Option<u64>,
}

impl StageOverride {
    fn apply(self, mut stage: StageConfig) -> StageConfig {
        if let Some(program) = self.program {
            stage.program = program;
        }
        if let Some(cores) = self.cores {
            stage.cores = cores;
        }
        if let Some(walltime) = self.walltime {
            stage.walltime = walltime;
        }
        if let Some(memory) = self.memory {
            stage.memory = memory;
        }
        if let Some(delay_secs) = self.delay_secs {
            stage.delay_secs = delay_secs;
        }
        stage
    }
}

fn analysis_stage<'de, D>(deserializer: D) -> std::result::Result<StageConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let stage = Option::<StageOverride>::deserialize(deserializer)?;
    Ok(stage.unwrap_or_default().apply(StageConfig::analysis()))
}

fn parse_stage<'de, D>(deserializer: D) -> std::result::Result<StageConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let stage = Option::<StageOverride>::deserialize(deserializer)?;
    Ok(stage.unwrap_or_default().apply(StageConfig::parse()))
}

fn default_memory() -> String {
    "8g".to_string()
}

impl StageConfig {
    /// Defaults for the codeml analysis stage.
    pub fn analysis() -> Self {
        Self {
            program: "python scripts/codeml.py".to_string(),
            cores: 1,
            walltime: "02:00:00".to_string(),
            memory: default_memory(),
            delay_secs: 5,
        }
    }

    /// Defaults for the output parsing stage.
    pub fn parse() -> Self {
        Self {
            program: "python scripts/parse_codeml.py".to_string(),
            cores: 1,
            walltime: "00:10:00".to_string(),
            memory: default_memory(),
            delay_secs: 0,
        }
    }

    /// Resource request for jobs of this stage.
    pub fn resources(&self, account: Option<&str>) -> Resources {
        Resources {
            cores: self.cores,
            walltime: self.walltime.clone(),
            memory: self.memory.clone(),
            account: account.map(str::to_string),
        }
    }

    fn validate(&self, stage: &str) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(GraphError::Config(format!("{}: program is empty", stage)));
        }
        if self.cores == 0 {
            return Err(GraphError::Config(format!("{}: cores must be at least 1", stage)));
        }
        if !is_valid_walltime(&self.walltime) {
            return Err(GraphError::Config(format!(
                "{}: walltime '{}' is not HH:MM:SS",
                stage, self.walltime
            )));
        }
        if !is_valid_memory(&self.memory) {
            return Err(GraphError::Config(format!(
                "{}: memory '{}' is not a size like 8g",
                stage, self.memory
            )));
        }
        Ok(())
    }
}

/// Complete configuration of a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Gene allowlist table (may also be given on the command line)
    pub genes: Option<PathBuf>,

    /// Column of the allowlist holding gene names
    pub gene_column: String,

    /// Glob pattern for alignment files
    pub candidates: String,

    /// Extension of the tree file next to each alignment
    pub tree_suffix: String,

    /// Root for per-gene codeml output directories
    pub analysis_dir: String,

    /// Directory for parsed summaries
    pub summary_dir: String,

    /// Fail while building if a tree file is missing
    pub require_tree_files: bool,

    /// Cluster account charged for all jobs
    pub account: Option<String>,

    #[serde(deserialize_with = "analysis_stage")]
    pub analysis: StageConfig,

    #[serde(deserialize_with = "parse_stage")]
    pub parse: StageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            genes: None,
            gene_column: DEFAULT_NAME_COLUMN.to_string(),
            candidates: "steps/cds_data/*.phylib".to_string(),
            tree_suffix: ".nw".to_string(),
            analysis_dir: "steps/codeml".to_string(),
            summary_dir: "steps/summary".to_string(),
            require_tree_files: false,
            account: None,
            analysis: StageConfig::analysis(),
            parse: StageConfig::parse(),
        }
    }
}

impl PipelineConfig {
    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.candidates.trim().is_empty() {
            return Err(GraphError::Config("candidates pattern is empty".to_string()));
        }
        if self.gene_column.trim().is_empty() {
            return Err(GraphError::Config("gene_column is empty".to_string()));
        }
        if self.analysis_dir == self.summary_dir {
            return Err(GraphError::Config(format!(
                "analysis_dir and summary_dir are both '{}'",
                self.analysis_dir
            )));
        }
        self.analysis.validate("analysis")?;
        self.parse.validate("parse")?;
        Ok(())
    }
}

/// Loads and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|e| {
        GraphError::Config(format!("failed to read '{}': {}", path.display(), e))
    })?;

    let config = parse_config(&content)?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

/// Parses and validates configuration YAML.
pub fn parse_config(yaml: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = if yaml.trim().is_empty() {
        PipelineConfig::default()
    } else {
        serde_yaml::from_str(yaml)
            .map_err(|e| GraphError::Config(format!("invalid configuration: {}", e)))?
    };

    config.validate()?;
    Ok(config)
}
