//! Path Transformer
//!
//! A path is split into `(directory, base, extension)`; any of the three can
//! be overridden before the parts are joined again. Suffixes can also be
//! rewritten with a regular expression anchored at the end of the joined
//! path, which must match exactly once.
//!
//! # Example
//!
//! ```
//! use codeml_graph::paths::{transform, SuffixRule};
//!
//! let tree = transform("steps/cds_data/BRCA2.phylib", None, None, &SuffixRule::replace(".nw")).unwrap();
//! assert_eq!(tree, "steps/cds_data/BRCA2.nw");
//!
//! let out = transform(
//!     "steps/cds_data/BRCA2.phylib",
//!     Some("steps/codeml/BRCA2"),
//!     None,
//!     &SuffixRule::replace(".txt"),
//! )
//! .unwrap();
//! assert_eq!(out, "steps/codeml/BRCA2/BRCA2.txt");
//! ```

use log::debug;
use regex::Regex;

use crate::error::{GraphError, Result};

/// A path split into directory, base name and extension.
///
/// The extension keeps its leading dot (`.phylib`). A file name whose only
/// dots are leading dots (`.bashrc`) has no extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    /// Everything before the last `/` (trailing slashes trimmed)
    pub dir: String,
    /// File name without extension
    pub stem: String,
    /// Extension including the dot, or empty
    pub ext: String,
}

impl PathSpec {
    /// Splits a path into its three parts.
    pub fn parse(path: &str) -> Self {
        let (dir, name) = match path.rfind('/') {
            Some(idx) => {
                let head = &path[..=idx];
                let trimmed = head.trim_end_matches('/');
                // A root-only head ("/", "//") stays as-is
                let dir = if trimmed.is_empty() { head } else { trimmed };
                (dir, &path[idx + 1..])
            }
            None => ("", path),
        };

        let (stem, ext) = split_extension(name);

        Self {
            dir: dir.to_string(),
            stem: stem.to_string(),
            ext: ext.to_string(),
        }
    }

    /// File name part (`stem + ext`).
    pub fn file_name(&self) -> String {
        format!("{}{}", self.stem, self.ext)
    }

    /// Joins the parts back into a path string.
    pub fn compose(&self) -> String {
        join_path(&self.dir, &self.file_name())
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// How the suffix of a transformed path is derived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuffixRule {
    /// Keep the original extension
    #[default]
    Keep,
    /// Replace the extension with a literal (empty removes it)
    Replace(String),
    /// Substitute `pattern` at the end of the whole joined path.
    ///
    /// The replacement uses regex group syntax (`$1`, `${name}`).
    Substitute { pattern: String, replacement: String },
}

impl SuffixRule {
    pub fn replace(suffix: impl Into<String>) -> Self {
        SuffixRule::Replace(suffix.into())
    }

    pub fn substitute(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        SuffixRule::Substitute {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Derives a new path from `path`.
///
/// # Arguments
///
/// * `path` - The source path
/// * `directory` - Replacement directory; `Some("")` drops the directory
/// * `basename` - Replacement base name (without extension)
/// * `suffix` - How the extension is derived
///
/// # Errors
///
/// Returns [`GraphError::PathRule`] if a [`SuffixRule::Substitute`] pattern
/// does not match exactly once at the end of the joined path, and
/// [`GraphError::InvalidPattern`] if the pattern does not compile.
pub fn transform(
    path: &str,
    directory: Option<&str>,
    basename: Option<&str>,
    suffix: &SuffixRule,
) -> Result<String> {
    let mut spec = PathSpec::parse(path);

    if let SuffixRule::Replace(ext) = suffix {
        spec.ext = ext.clone();
    }
    if let Some(dir) = directory {
        spec.dir = dir.to_string();
    }
    if let Some(base) = basename {
        spec.stem = base.to_string();
    }

    let composed = spec.compose();

    match suffix {
        SuffixRule::Substitute {
            pattern,
            replacement,
        } => substitute_at_end(&composed, pattern, replacement),
        _ => Ok(composed),
    }
}

fn substitute_at_end(path: &str, pattern: &str, replacement: &str) -> Result<String> {
    let anchored = Regex::new(&format!("(?:{})$", pattern)).map_err(|source| {
        GraphError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;

    let matches = anchored.find_iter(path).count();
    if matches != 1 {
        return Err(GraphError::PathRule {
            path: path.to_string(),
            pattern: pattern.to_string(),
            matches,
        });
    }

    let result = anchored.replace(path, replacement).into_owned();
    debug!("Substituted '{}' in {} -> {}", pattern, path, result);
    Ok(result)
}

/// Builder-style wrapper around [`transform`] for rules applied repeatedly.
///
/// ```
/// use codeml_graph::paths::PathTransform;
///
/// let to_control = PathTransform::new()
///     .with_directory("steps/codeml/LAS1L")
///     .with_suffix(".ctl");
/// assert_eq!(
///     to_control.apply("steps/cds_data/LAS1L.phylib").unwrap(),
///     "steps/codeml/LAS1L/LAS1L.ctl"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTransform {
    directory: Option<String>,
    basename: Option<String>,
    suffix: SuffixRule,
}

impl PathTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, dir: impl Into<String>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    pub fn with_basename(mut self, base: impl Into<String>) -> Self {
        self.basename = Some(base.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = SuffixRule::Replace(suffix.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.suffix = SuffixRule::substitute(pattern, replacement);
        self
    }

    pub fn apply(&self, path: &str) -> Result<String> {
        transform(
            path,
            self.directory.as_deref(),
            self.basename.as_deref(),
            &self.suffix,
        )
    }
}

/// Identifier of a file: its name with directory and extension stripped.
///
/// ```
/// use codeml_graph::paths::identifier_of;
///
/// assert_eq!(identifier_of("steps/cds_data/GENE-1.phylib"), "GENE-1");
/// ```
pub fn identifier_of(path: &str) -> String {
    PathSpec::parse(path).stem
}

/// File name of a path (directory stripped, extension kept).
pub fn file_name_of(path: &str) -> String {
    PathSpec::parse(path).file_name()
}

/// Joins a directory and a name with a single `/`.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}
