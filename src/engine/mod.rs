//! Engine Binding
//!
//! Hands a validated job graph to an external workflow engine. Every engine
//! is reached through a [`JobSink`], which receives one registration call
//! per job in dependency order.
//!
//! # Sinks
//!
//! - [`MemorySink`]: keeps registered jobs in memory
//! - [`manifest::ManifestSink`]: writes a YAML or JSON workflow manifest
//! - [`slurm::ScriptSink`]: writes SLURM batch scripts plus a submit script

pub mod manifest;
pub mod slurm;

use log::{debug, info, warn};

use crate::error::{GraphError, Result};
use crate::workflow::{validate_graph, Job, JobGraph};

pub use manifest::{ManifestFormat, ManifestSink};
pub use slurm::ScriptSink;

/// Receives job declarations for an external engine.
pub trait JobSink {
    /// Registers one job. Called after all of the job's dependencies.
    fn register(&mut self, job: &Job) -> Result<()>;

    /// Called once after the last job was registered.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects registered jobs in registration order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub jobs: Vec<Job>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.name.as_str()).collect()
    }
}

impl JobSink for MemorySink {
    fn register(&mut self, job: &Job) -> Result<()> {
        self.jobs.push(job.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Validates `graph` and registers every job with `sink`.
///
/// Jobs are registered in topological order. If validation fails nothing is
/// registered. Returns the number of registered jobs.
pub fn submit<S: JobSink + ?Sized>(graph: &JobGraph, sink: &mut S) -> Result<usize> {
    let order = validate_graph(graph)?;

    if order.is_empty() {
        warn!("Job graph is empty; nothing to register");
    }

    for name in &order {
        let job = graph
            .get_job(name)
            .ok_or_else(|| GraphError::InvalidGraph(format!("Job '{}' not found", name)))?;
        debug!("Registering job {}", job.name);
        sink.register(job)?;
    }

    sink.finish()?;

    info!("Registered {} jobs", order.len());
    Ok(order.len())
}
