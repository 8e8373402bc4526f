//! Transformation module.
//!
//! - Parent key: the per-row rewrite and comparison flag
//! - Pipeline: parse → validate → transform for one uploaded file

pub mod parent_key;
pub mod pipeline;

pub use parent_key::{transform_row, transform_rows};
pub use pipeline::*;
