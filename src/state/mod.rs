pub mod builder;
pub mod observed;

pub use builder::FrameStateBuilder;
pub use observed::ObservedState;
