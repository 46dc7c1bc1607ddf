//! Local model handle and device selection.

pub mod classifier;
pub mod device;

pub use classifier::{LeafClassifier, ModelStatus};
pub use device::Device;
