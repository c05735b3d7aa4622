//! OpenVINO Image Classification Library
//!
//! Loads a classification model onto a selected device and classifies RGBA
//! frames handed over by a host application, either through the owned
//! [`Classifier`] or the C boundary in [`ffi`].

pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod runtime;
pub mod service;
pub mod utils;

pub use config::Config;
pub use engine::{LoadOutcome, LoadStatus, Resolution};
pub use error::{ClassifierError, ErrorKind, LoadError, RuntimeError};
pub use service::{Classifier, Prediction};
