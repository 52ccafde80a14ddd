//! Job Graph Model
//!
//! Core data structures for declared cluster jobs and their dependencies.
//! Dependencies are explicit edges (`previous`/`next`); the validator also
//! checks that each edge is backed by a shared file path.
//!
//! # Example
//!
//! ```
//! use codeml_graph::workflow::{Job, JobGraph, JobKind, Resources};
//!
//! let resources = Resources::new(1, "02:00:00", "8g");
//! let mut graph = JobGraph::new();
//! graph.add_job(
//!     Job::new("codeml_A", JobKind::Analysis, "A", "python scripts/codeml.py ...")
//!         .with_inputs(vec!["steps/cds_data/A.phylib".into(), "steps/cds_data/A.nw".into()])
//!         .with_outputs(vec!["steps/codeml/A/A.txt".into(), "steps/codeml/A/A.ctl".into()])
//!         .with_resources(resources.clone()),
//! ).unwrap();
//! graph.add_job(
//!     Job::new("parse_A", JobKind::Parse, "A", "python scripts/parse_codeml.py ...")
//!         .with_inputs(vec!["steps/codeml/A/A.txt".into()])
//!         .with_outputs(vec!["steps/summary/A.txt".into()])
//!         .with_resources(resources),
//! ).unwrap();
//! graph.link("codeml_A", "parse_A").unwrap();
//!
//! assert_eq!(graph.root_jobs().len(), 1);
//! assert_eq!(graph.get_job("parse_A").unwrap().previous, vec!["codeml_A"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Which stage of the pipeline a job belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// codeml run on one alignment
    Analysis,
    /// Summary extraction from a codeml output file
    Parse,
}

impl JobKind {
    /// Prefix of job names of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            JobKind::Analysis => "codeml",
            JobKind::Parse => "parse",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Analysis => write!(f, "analysis"),
            JobKind::Parse => write!(f, "parse"),
        }
    }
}

/// Cluster resources requested by a job. Enforced by the engine, not here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    pub cores: usize,
    /// Wall-clock limit as `HH:MM:SS`
    pub walltime: String,
    /// Memory limit such as `8g`
    pub memory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl Resources {
    pub fn new(cores: usize, walltime: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cores,
            walltime: walltime.into(),
            memory: memory.into(),
            account: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new(1, "01:00:00", "1g")
    }
}

/// Normalizes a gene identifier into a job-name tag (`-` becomes `_`).
///
/// ```
/// use codeml_graph::workflow::model::job_tag;
///
/// assert_eq!(job_tag("GENE-1"), "GENE_1");
/// ```
pub fn job_tag(gene: &str) -> String {
    gene.replace('-', "_")
}

/// Name of the job of `kind` for `gene`, e.g. `codeml_GENE_1`.
pub fn job_name(kind: JobKind, gene: &str) -> String {
    format!("{}_{}", kind.prefix(), job_tag(gene))
}

/// A single declared cluster job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Job {
    /// Unique name within the graph
    pub name: String,

    pub kind: JobKind,

    /// Gene identifier this job belongs to
    pub gene: String,

    /// Files the job reads
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Files the job writes; the first one is the primary output
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub resources: Resources,

    /// Shell command text
    pub command: String,

    /// Names of jobs that must finish first
    #[serde(default)]
    pub previous: Vec<String>,

    /// Names of jobs waiting on this one (populated by [`JobGraph::link`])
    #[serde(default)]
    pub next: Vec<String>,
}

impl Job {
    pub fn new(
        name: impl Into<String>,
        kind: JobKind,
        gene: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            kind,
            gene: gene.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            resources: Resources::default(),
            command: command.into(),
            previous: Vec::new(),
            next: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// The first declared output.
    pub fn primary_output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }
}

/// Ordered collection of jobs with explicit dependency edges.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JobGraph {
    pub jobs: Vec<Job>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Adds a job; names must be unique.
    pub fn add_job(&mut self, job: Job) -> Result<()> {
        if self.jobs.iter().any(|j| j.name == job.name) {
            return Err(GraphError::DuplicateJob(job.name));
        }
        self.jobs.push(job);
        Ok(())
    }

    /// Records that `downstream` must wait for `upstream`.
    pub fn link(&mut self, upstream: &str, downstream: &str) -> Result<()> {
        for name in [upstream, downstream] {
            if self.get_job(name).is_none() {
                return Err(GraphError::InvalidGraph(format!("Job '{}' not found", name)));
            }
        }

        if let Some(job) = self.get_job_mut(upstream) {
            if !job.next.iter().any(|n| n == downstream) {
                job.next.push(downstream.to_string());
            }
        }
        if let Some(job) = self.get_job_mut(downstream) {
            if !job.previous.iter().any(|p| p == upstream) {
                job.previous.push(upstream.to_string());
            }
        }
        Ok(())
    }

    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn get_job_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.name == name)
    }

    /// Jobs of one kind, in insertion order.
    pub fn jobs_of(&self, kind: JobKind) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(move |j| j.kind == kind)
    }

    pub fn analysis_jobs(&self) -> Vec<&Job> {
        self.jobs_of(JobKind::Analysis).collect()
    }

    pub fn parse_jobs(&self) -> Vec<&Job> {
        self.jobs_of(JobKind::Parse).collect()
    }

    /// Returns jobs with no dependencies (entry points).
    pub fn root_jobs(&self) -> Vec<&Job> {
        self.jobs.iter().filter(|j| j.previous.is_empty()).collect()
    }

    /// Returns jobs nothing depends on (exit points).
    pub fn leaf_jobs(&self) -> Vec<&Job> {
        self.jobs.iter().filter(|j| j.next.is_empty()).collect()
    }

    /// Finds the job declaring `path` as an output.
    pub fn producer_of(&self, path: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.outputs.iter().any(|o| o == path))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
