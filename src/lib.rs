//! codeml-graph - Job Graph Generator for codeml Pipelines
//!
//! Declares the cluster jobs of a codeml selection analysis: for every
//! allowlisted gene alignment, one codeml analysis job and one job parsing
//! its output. The jobs are handed to an external workflow engine, which
//! schedules and runs them.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`paths`]: Path derivation (directory, base name and suffix overrides)
//! - [`genes`]: Gene allowlist loading and candidate file selection
//! - [`workflow`]: Job graph model, builder and validation
//! - [`engine`]: Registration of jobs with external engines
//! - [`config`]: Pipeline configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use codeml_graph::config::PipelineConfig;
//! use codeml_graph::engine::{submit, ManifestFormat, ManifestSink};
//! use codeml_graph::genes::load_gene_set;
//! use codeml_graph::workflow::GraphBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let genes = load_gene_set("candidate_genes.csv", &config.gene_column)?;
//!
//!     let graph = GraphBuilder::new(&config).build(&genes)?;
//!
//!     let mut sink = ManifestSink::new("jobs.yaml", ManifestFormat::Yaml);
//!     submit(&graph, &mut sink)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod genes;
pub mod paths;
pub mod workflow;

// Re-export commonly used types
pub use config::{load_config, PipelineConfig};
pub use engine::{submit, JobSink};
pub use error::{GraphError, Result};
pub use workflow::{GraphBuilder, Job, JobGraph};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "codeml-graph";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "codeml-graph");
    }

    #[test]
    fn test_module_exports_job() {
        let job = Job::new("codeml_A", workflow::JobKind::Analysis, "A", "run");
        assert_eq!(job.name, "codeml_A");
    }

    #[test]
    fn test_module_exports_graph_builder() {
        let config = PipelineConfig::default();
        let graph = GraphBuilder::new(&config)
            .dry_run(true)
            .build_from_files(&[], &genes::GeneSet::default())
            .unwrap();
        assert!(graph.is_empty());
    }
}
