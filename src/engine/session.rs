//! Inference session
//!
//! A compiled model plus its request and resident input tensor. Sessions are
//! only built by the loader, which guarantees the input shape, class count
//! and compiled artifact agree.

use tracing::debug;

use super::postprocess::argmax;
use super::preprocess::rgba_to_planar;
use crate::error::{ClassifierError, RuntimeError};
use crate::runtime::{CompiledArtifact, InferRequest};

/// Input width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

pub struct InferenceSession<C, Q> {
    // Kept alive for as long as the request bound to it
    #[allow(dead_code)]
    compiled: C,
    request: Q,
    resolution: Resolution,
    class_count: usize,
    scores: Vec<f32>,
}

impl<C, Q> InferenceSession<C, Q>
where
    C: CompiledArtifact<Request = Q>,
    Q: InferRequest,
{
    pub(crate) fn new(compiled: C, request: Q, resolution: Resolution, class_count: usize) -> Self {
        Self {
            compiled,
            request,
            resolution,
            class_count,
            scores: Vec::new(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Scores from the most recent successful forward pass
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn request(&self) -> &Q {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Q {
        &mut self.request
    }

    /// Write an RGBA frame into the resident input tensor
    pub fn preprocess(&mut self, pixels: &[u8]) -> Result<(), ClassifierError> {
        let Resolution { width, height } = self.resolution;
        let input = self.request.input_data_mut()?;
        rgba_to_planar(pixels, width, height, input)
    }

    /// Run the forward pass on the current input and return the top class
    pub fn execute(&mut self) -> Result<usize, ClassifierError> {
        self.request.infer()?;

        let output = self.request.output_data()?;
        if output.len() < self.class_count {
            return Err(RuntimeError::Shape(vec![output.len()]).into());
        }

        let scores = &output[..self.class_count];
        let class_idx = argmax(scores).ok_or(RuntimeError::Shape(vec![0]))?;
        debug!("Predicted class {} of {}", class_idx, self.class_count);

        self.scores = scores.to_vec();
        Ok(class_idx)
    }

    /// Preprocess a frame and classify it
    pub fn classify(&mut self, pixels: &[u8]) -> Result<usize, ClassifierError> {
        self.preprocess(pixels)?;
        self.execute()
    }
}
