//! Inference runtime seam
//!
//! The pipeline talks to the inference engine only through these traits:
//! - [`InferenceRuntime`]: device discovery, model parsing, reshape, compile
//! - [`CompiledArtifact`]: a device-bound model that hands out requests and
//!   describes its output
//! - [`InferRequest`]: an execution context owning the resident input tensor
//!
//! [`OpenVinoRuntime`] is the production implementation.

pub mod ov;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;

use crate::error::RuntimeError;

pub use self::ov::OpenVinoRuntime;

/// Hints applied to every compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileHints {
    /// Aggregating device that runs over the priority list (e.g. `MULTI`)
    pub execution_device: String,
    pub performance_mode: String,
    pub inference_precision: String,
}

impl Default for CompileHints {
    fn default() -> Self {
        Self {
            execution_device: "MULTI".to_string(),
            performance_mode: "LATENCY".to_string(),
            inference_precision: "f32".to_string(),
        }
    }
}

pub trait InferenceRuntime {
    type Model;
    type Compiled: CompiledArtifact<Request = Self::Request>;
    type Request: InferRequest;

    /// All backends the engine reports, in engine order.
    fn available_devices(&self) -> Result<Vec<String>, RuntimeError>;

    fn set_cache_dir(&mut self, device: &str, dir: &Path) -> Result<(), RuntimeError>;

    fn read_model(&mut self, path: &Path) -> Result<Self::Model, RuntimeError>;

    /// Reshape the model's single input to NCHW `shape`.
    fn reshape(&mut self, model: &mut Self::Model, shape: [usize; 4]) -> Result<(), RuntimeError>;

    fn compile(
        &mut self,
        model: &Self::Model,
        priorities: &[&str],
        hints: &CompileHints,
    ) -> Result<Self::Compiled, RuntimeError>;
}

pub trait CompiledArtifact {
    type Request: InferRequest;

    fn create_request(&mut self) -> Result<Self::Request, RuntimeError>;

    fn output_count(&self) -> Result<usize, RuntimeError>;

    /// Dimensions of the single output; unresolved dimensions read as zero.
    fn output_shape(&self) -> Result<Vec<usize>, RuntimeError>;
}

pub trait InferRequest {
    /// NCHW dimensions of the bound input tensor.
    fn input_shape(&self) -> Result<[usize; 4], RuntimeError>;

    fn input_data(&self) -> Result<&[f32], RuntimeError>;

    fn input_data_mut(&mut self) -> Result<&mut [f32], RuntimeError>;

    fn infer(&mut self) -> Result<(), RuntimeError>;

    fn output_data(&self) -> Result<Vec<f32>, RuntimeError>;
}

/// Convert engine dimensions to an NCHW array.
pub(crate) fn nchw(dims: &[i64]) -> Result<[usize; 4], RuntimeError> {
    let as_usize = |d: &i64| usize::try_from(*d).unwrap_or(0);
    match dims {
        [n, c, h, w] => Ok([as_usize(n), as_usize(c), as_usize(h), as_usize(w)]),
        _ => Err(RuntimeError::Shape(dims.iter().map(as_usize).collect())),
    }
}
