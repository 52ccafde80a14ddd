//! Candidate Discovery
//!
//! Alignment files are found with a glob pattern and kept only when their
//! identifier (file name without directory or extension) is allowlisted.

use glob::glob;
use log::{debug, info, warn};

use super::allowlist::GeneSet;
use crate::error::Result;
use crate::paths::identifier_of;

/// An alignment file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path of the alignment file as discovered
    pub path: String,
    /// Gene identifier derived from the file name
    pub gene: String,
}

impl Candidate {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let gene = identifier_of(&path);
        Self { path, gene }
    }
}

/// Lists files matching `pattern`.
///
/// Paths that are not valid UTF-8 are skipped with a warning, since they
/// cannot be written into job commands.
pub fn discover_candidates(pattern: &str) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in glob(pattern)? {
        let path = entry?;
        match path.to_str() {
            Some(p) => files.push(p.to_string()),
            None => warn!("Skipping non UTF-8 path: {}", path.display()),
        }
    }

    info!("Found {} candidate files matching {}", files.len(), pattern);
    Ok(files)
}

/// Keeps the files whose identifier is in `genes`.
///
/// The result is sorted by identifier (then path) so that job order does not
/// depend on directory listing order.
pub fn select_candidates(files: &[String], genes: &GeneSet) -> Vec<Candidate> {
    let mut selected: Vec<Candidate> = files
        .iter()
        .map(|f| Candidate::new(f.as_str()))
        .filter(|c| {
            let keep = genes.contains(&c.gene);
            if !keep {
                debug!("Skipping {} ('{}' not in allowlist)", c.path, c.gene);
            }
            keep
        })
        .collect();

    selected.sort_by(|a, b| a.gene.cmp(&b.gene).then_with(|| a.path.cmp(&b.path)));

    info!(
        "Selected {} of {} candidate files ({} genes allowlisted)",
        selected.len(),
        files.len(),
        genes.len()
    );
    selected
}
