//! Output postprocessing

/// Prediction reported before any inference has succeeded
pub const NOT_READY: i32 = -1;

/// Prediction reported when a forward pass fails
pub const INFERENCE_FAILED: i32 = -2;

/// Index of the maximum score; ties go to the lowest index.
///
/// NaN scores never win. Returns `None` for an empty slice.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let mut best_idx = 0;
    let mut best = f32::NAN;
    for (idx, &score) in scores.iter().enumerate() {
        if (best.is_nan() && !score.is_nan()) || score > best {
            best_idx = idx;
            best = score;
        }
    }
    Some(best_idx)
}

/// Softmax function
pub fn softmax(x: &[f32]) -> Vec<f32> {
    let max_val = x.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Vec<f32> = x.iter().map(|v| (v - max_val).exp()).collect();
    let sum: f32 = exp_vals.iter().sum();
    exp_vals.iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[1.0, 5.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
    }

    #[test]
    fn test_argmax_ties_take_first() {
        assert_eq!(argmax(&[0.2, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5, 0.5]), Some(0));
    }

    #[test]
    fn test_argmax_edge_cases() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, 0.3, f32::NAN]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), Some(0));
        assert_eq!(argmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]), Some(0));
    }

    #[test]
    fn test_softmax() {
        let result = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = result.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(result[2] > result[1]);
        assert!(result[1] > result[0]);
    }

    #[test]
    fn test_sentinels_are_distinct() {
        assert_ne!(NOT_READY, INFERENCE_FAILED);
        assert!(NOT_READY < 0 && INFERENCE_FAILED < 0);
    }
}
