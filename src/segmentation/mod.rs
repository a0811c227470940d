pub mod context;
pub mod machine;

pub use machine::{CompletedHand, HandSegmenter, SegmentEvent};
