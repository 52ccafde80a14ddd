//! Job Graph Module
//!
//! Provides data structures and utilities for declaring, validating and
//! ordering the cluster jobs of a codeml run.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Job, JobGraph)
//! - [`builder`]: Builds the analysis and parse layers from selected genes
//! - [`validator`]: Validation rules, edge checks and topological ordering

pub mod builder;
pub mod model;
pub mod validator;

pub use builder::{AnalysisPaths, GraphBuilder};
pub use model::{job_name, job_tag, Job, JobGraph, JobKind, Resources};
pub use validator::{topological_order, validate_graph, ValidationError};
