//! Gene Allowlist
//!
//! The genes under analysis come from a table with a header row. The column
//! holding gene names is `name` unless configured otherwise.
//!
//! Supported formats, chosen by file extension:
//! - `.tsv` / `.tab`: tab-separated table
//! - `.txt` / `.list`: one gene per line, `#` starts a comment
//! - anything else: comma-separated table

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, info, warn};

use crate::error::{GraphError, Result};

/// Default column holding gene names.
pub const DEFAULT_NAME_COLUMN: &str = "name";

/// Immutable set of gene names selected for analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneSet {
    names: HashSet<String>,
}

impl GeneSet {
    /// Builds a set from names; blank names are dropped and whitespace trimmed.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.names.contains(gene)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Loads the gene allowlist from `path`.
///
/// # Arguments
///
/// * `path` - Table or list file
/// * `column` - Header of the column holding gene names (tables only)
pub fn load_gene_set(path: impl AsRef<Path>, column: &str) -> Result<GeneSet> {
    let path = path.as_ref();
    info!("Loading gene allowlist from: {}", path.display());

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let genes = match extension.as_str() {
        "txt" | "list" => read_list(path)?,
        "tsv" | "tab" => read_table(path, b'\t', column)?,
        _ => read_table(path, b',', column)?,
    };

    if genes.is_empty() {
        warn!("Gene allowlist {} is empty; no jobs will be declared", path.display());
    }

    info!("Loaded {} genes", genes.len());
    Ok(genes)
}

fn read_list(path: &Path) -> Result<GeneSet> {
    let content = fs::read_to_string(path)?;
    let names = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .filter(|line| !line.trim().is_empty());
    Ok(GeneSet::from_names(names))
}

fn read_table(path: &Path, delimiter: u8, column: &str) -> Result<GeneSet> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let index = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| GraphError::Allowlist {
            path: path.to_path_buf(),
            message: format!(
                "no column '{}' (found: {})",
                column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        })?;

    debug!("Reading gene names from column {} ('{}')", index, column);

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            names.push(value.to_string());
        }
    }

    Ok(GeneSet::from_names(names))
}
