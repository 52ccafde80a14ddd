//! Path Manipulation
//!
//! Derives job input/output paths from candidate file paths by swapping
//! directory, base name or suffix.
//!
//! - [`transform`](mod@transform): [`PathSpec`], [`SuffixRule`] and the transform operation

pub mod transform;

pub use transform::{
    file_name_of, identifier_of, join_path, transform, PathSpec, PathTransform, SuffixRule,
};
