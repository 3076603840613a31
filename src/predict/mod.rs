//! Holding-duration prediction interface.
//!
//! The trained regression model lives in an external prediction service;
//! the lending workflow calls it with a prepared feature vector when a loan
//! is recorded and stores the predicted holding days alongside the lending
//! record. This crate only defines the seam: feature-vector construction
//! and the model itself are the service's concern.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when requesting a prediction.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The feature vector did not match what the model expects
    #[error("Invalid feature vector: {0}")]
    InvalidFeatures(String),

    /// The prediction service failed or was unreachable
    #[error("Prediction service error: {0}")]
    ServiceError(String),
}

/// Result type for prediction operations.
pub type PredictResult<T> = Result<T, PredictError>;

/// Trait for holding-duration predictors.
///
/// Implementations wrap whatever serving mechanism the deployment uses;
/// callers treat the model as a black box.
#[async_trait]
pub trait HoldingPredictor: Send + Sync {
    /// Predict how many days a member will hold a book.
    ///
    /// # Arguments
    /// * `features` - The prepared feature vector, in the model's order
    ///
    /// # Errors
    /// Returns `PredictError` if the features are rejected or the service
    /// call fails; the caller surfaces the outcome as-is.
    async fn predict_holding_days(&self, features: &[f64]) -> PredictResult<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPredictor {
        expected_len: usize,
        days: f64,
    }

    #[async_trait]
    impl HoldingPredictor for FixedPredictor {
        async fn predict_holding_days(&self, features: &[f64]) -> PredictResult<f64> {
            if features.len() != self.expected_len {
                return Err(PredictError::InvalidFeatures(format!(
                    "expected {} features, got {}",
                    self.expected_len,
                    features.len()
                )));
            }
            Ok(self.days)
        }
    }

    #[tokio::test]
    async fn test_predictor_behind_dyn_handle() {
        let predictor: Box<dyn HoldingPredictor> = Box::new(FixedPredictor {
            expected_len: 4,
            days: 12.5,
        });

        let days = predictor
            .predict_holding_days(&[250.0, 1.0, 0.0, 3.0])
            .await
            .unwrap();
        assert!((days - 12.5).abs() < f64::EPSILON);

        assert!(matches!(
            predictor.predict_holding_days(&[1.0]).await.unwrap_err(),
            PredictError::InvalidFeatures(_)
        ));
    }
}
