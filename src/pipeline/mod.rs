//! Pipeline coordinator: frame sources, change detection, the bounded frame
//! queue and the processing loop.

pub mod differ;
pub mod processor;
pub mod queue;
pub mod runner;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use differ::FrameDiffer;
pub use processor::HandProcessor;
pub use queue::{PauseSignal, StopSignal};
pub use runner::{run_batch, run_live, RunSummary};
pub use source::{DirectorySource, FrameSource, VideoFileSource};
