//! Run reports emitted by the pipeline and the binaries.
//!
//! [`ProcessReport`] describes one processed recording: its input size, the
//! segmentation outcome and a [`TimingBreakdown`] of every stage. Reports are
//! plain serde structures written as JSON with
//! [`write_json_file`](crate::image::io::write_json_file).

pub mod report;
pub mod timing;

pub use report::{InputDescriptor, ProcessReport};
pub use timing::{StageTiming, TimingBreakdown};
