//! Scanpath construction and MultiMatch comparison.
//!
//! - [`vector`] turns ordered fixations into ten-feature [`ScanpathVector`]s.
//! - [`multimatch`] aligns two scanpaths along the cheapest path of a grid
//!   graph and reports five similarity dimensions plus their weighted mean.
//! - [`dynamic`] repeats the comparison over sliding frame windows.
pub mod dynamic;
pub mod multimatch;
pub mod vector;

pub use multimatch::{multimatch, Alignment, MultiMatchResult, MultiMatchWeights};
pub use vector::{scanpath_from_points, scanpath_from_records, ScanpathVector};
