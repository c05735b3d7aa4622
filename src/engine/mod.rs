//! Classification pipeline
//!
//! - Device registry with accelerator filtering
//! - Model loading with soft reshape fallback
//! - Planar RGB preprocessing straight into the input tensor
//! - Single-pass inference with leftmost argmax

pub mod device;
pub mod loader;
pub mod postprocess;
pub mod preprocess;
pub mod session;

pub use device::DeviceRegistry;
pub use loader::{LoadOutcome, LoadStatus, ModelLoader};
pub use session::{InferenceSession, Resolution};
