//! Gene Selection
//!
//! Decides which gene alignments take part in a run.
//!
//! - [`allowlist`]: Loads the set of gene names to analyze
//! - [`candidates`]: Discovers alignment files and filters them by the allowlist

pub mod allowlist;
pub mod candidates;

pub use allowlist::{load_gene_set, GeneSet};
pub use candidates::{discover_candidates, select_candidates, Candidate};
