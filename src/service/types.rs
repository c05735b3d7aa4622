//! Service layer types

/// Top class of one classified frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    /// Softmax probability of `class_index` over the raw scores
    pub confidence: f32,
}
