use crate::entities::SmoothedSignal;
use crate::error::{DomainError, Result};

/// Exponentially-weighted moving average seeded from the first sample.
///
/// acc = α·s + (1−α)·acc for every sample after the first.
pub fn ewma(samples: &[f64], alpha: f64) -> Result<f64> {
    let (first, rest) = samples
        .split_first()
        .ok_or(DomainError::InsufficientData {
            required: 1,
            actual: 0,
        })?;
    Ok(rest
        .iter()
        .fold(*first, |acc, s| alpha * s + (1.0 - alpha) * acc))
}

/// Smooths the last `window` samples of a series.
pub fn smooth_window(samples: &[f64], window: usize, alpha: f64) -> Result<SmoothedSignal> {
    let start = samples.len().saturating_sub(window);
    let basis = &samples[start..];
    Ok(SmoothedSignal {
        value: ewma(basis, alpha)?,
        basis: basis.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_insufficient() {
        assert_eq!(
            ewma(&[], 0.4),
            Err(DomainError::InsufficientData {
                required: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_single_sample_is_unchanged() {
        assert_eq!(ewma(&[412.5], 0.4), Ok(412.5));
    }

    #[test]
    fn test_two_samples() {
        let result = ewma(&[10.0, 20.0], 0.2).unwrap();
        assert!((result - (0.2 * 20.0 + 0.8 * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn test_window_uses_latest_samples() {
        let samples = [1000.0, 1.0, 2.0, 3.0];
        let smoothed = smooth_window(&samples, 3, 0.4).unwrap();
        assert_eq!(smoothed.basis, 3);
        let expected = ewma(&[1.0, 2.0, 3.0], 0.4).unwrap();
        assert_eq!(smoothed.value, expected);
    }

    #[test]
    fn test_window_larger_than_series() {
        let smoothed = smooth_window(&[5.0, 7.0], 6, 0.4).unwrap();
        assert_eq!(smoothed.basis, 2);
    }
}
