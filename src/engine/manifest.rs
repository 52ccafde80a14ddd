//! Workflow Manifest
//!
//! Writes all registered jobs into a single YAML or JSON document that a
//! workflow engine can load.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use super::JobSink;
use crate::error::{GraphError, Result};
use crate::workflow::Job;
use crate::{APP_NAME, VERSION};

/// Serialization format of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl FromStr for ManifestFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "json" => Ok(ManifestFormat::Json),
            other => Err(GraphError::Config(format!("unknown manifest format '{}'", other))),
        }
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    generator: &'a str,
    version: &'a str,
    generated_at: DateTime<Utc>,
    jobs: &'a [Job],
}

/// Writes a manifest file when the graph is complete.
pub struct ManifestSink {
    path: PathBuf,
    format: ManifestFormat,
    jobs: Vec<Job>,
}

impl ManifestSink {
    pub fn new(path: impl Into<PathBuf>, format: ManifestFormat) -> Self {
        Self {
            path: path.into(),
            format,
            jobs: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the manifest without writing it.
    pub fn render(&self) -> Result<String> {
        let manifest = Manifest {
            generator: APP_NAME,
            version: VERSION,
            generated_at: Utc::now(),
            jobs: &self.jobs,
        };

        let text = match self.format {
            ManifestFormat::Yaml => serde_yaml::to_string(&manifest)?,
            ManifestFormat::Json => serde_json::to_string_pretty(&manifest)?,
        };
        Ok(text)
    }
}

impl JobSink for ManifestSink {
    fn register(&mut self, job: &Job) -> Result<()> {
        self.jobs.push(job.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let text = self.render()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, text)?;

        info!("Wrote {} jobs to {}", self.jobs.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::submit;
    use crate::workflow::{JobGraph, JobKind, Resources};
    use tempfile::tempdir;

    fn graph() -> JobGraph {
        let mut graph = JobGraph::new();
        graph
            .add_job(
                Job::new("codeml_A", JobKind::Analysis, "A", "python scripts/codeml.py a\nsleep 5")
                    .with_inputs(vec!["d/A.phylib".into(), "d/A.nw".into()])
                    .with_outputs(vec!["c/A/A.txt".into(), "c/A/A.ctl".into()])
                    .with_resources(Resources::new(1, "02:00:00", "8g").with_account("simons")),
            )
            .unwrap();
        graph
            .add_job(
                Job::new("parse_A", JobKind::Parse, "A", "python scripts/parse_codeml.py b")
                    .with_inputs(vec!["c/A/A.txt".into()])
                    .with_outputs(vec!["s/A.txt".into()])
                    .with_resources(Resources::new(1, "00:10:00", "8g")),
            )
            .unwrap();
        graph.link("codeml_A", "parse_A").unwrap();
        graph
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("yaml".parse::<ManifestFormat>().unwrap(), ManifestFormat::Yaml);
        assert_eq!("YML".parse::<ManifestFormat>().unwrap(), ManifestFormat::Yaml);
        assert_eq!("json".parse::<ManifestFormat>().unwrap(), ManifestFormat::Json);
        assert!("xml".parse::<ManifestFormat>().is_err());
    }

    #[test]
    fn test_json_manifest_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/jobs.json");

        let mut sink = ManifestSink::new(&path, ManifestFormat::Json);
        submit(&graph(), &mut sink).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["generator"], APP_NAME);
        let jobs = value["jobs"].as_array().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0]["name"], "codeml_A");
        assert_eq!(jobs[0]["kind"], "analysis");
        assert_eq!(jobs[0]["resources"]["account"], "simons");
        assert_eq!(jobs[1]["previous"][0], "codeml_A");
        assert!(jobs[1]["resources"].get("account").is_none());
    }

    #[test]
    fn test_yaml_manifest_jobs_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.yaml");

        let mut sink = ManifestSink::new(&path, ManifestFormat::Yaml);
        submit(&graph(), &mut sink).unwrap();

        #[derive(serde::Deserialize)]
        struct Loaded {
            jobs: Vec<Job>,
        }
        let loaded: Loaded = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.jobs, graph().jobs);
    }
}
