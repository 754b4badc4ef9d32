//! Reconstruction-based anomaly detection.
//!
//! An autoencoder is trained to reconstruct normal (synthetic) feature
//! vectors; at inference time the mean-squared reconstruction error is the
//! anomaly score. A score at or above the configured threshold flags the flow
//! as anomalous. The threshold is a tunable constant — configuration, not a
//! statistically fitted cutoff.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::features::FEATURE_DIM;
use crate::nn::{Loss, Mlp, OutputActivation};

/// Encoder widths after the input layer; the decoder mirrors them back out.
const ENCODER: [usize; 3] = [16, 8, 4];
const LEARNING_RATE: f64 = 0.001;

/// Autoencoder anomaly scorer.
///
/// Architecture: encoder 8 → 16 → 8 → 4 (ReLU), decoder 4 → 8 → 16 → 8
/// (ReLU, ReLU, sigmoid). Optimized with Adam against reconstruction MSE.
pub struct AnomalyDetector {
    net: Mlp,
    threshold: f64,
}

impl AnomalyDetector {
    pub fn new<R: Rng + ?Sized>(threshold: f64, rng: &mut R) -> Self {
        let dims = [
            FEATURE_DIM,
            ENCODER[0],
            ENCODER[1],
            ENCODER[2],
            ENCODER[1],
            ENCODER[0],
            FEATURE_DIM,
        ];
        AnomalyDetector {
            net: Mlp::new(&dims, OutputActivation::Sigmoid, rng),
            threshold,
        }
    }

    /// The configured anomaly threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fit the autoencoder to reconstruct `features` (input and target alike).
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        features: &Array2<f64>,
        epochs: usize,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<(), String> {
        self.net.fit(
            features,
            features,
            Loss::MeanSquaredError,
            epochs,
            batch_size,
            LEARNING_RATE,
            0.0,
            rng,
        )?;
        log::info!("anomaly detector trained on {} samples", features.nrows());
        Ok(())
    }

    /// Reconstruct a feature vector through the bottleneck.
    pub fn reconstruct(&self, features: &Array1<f64>) -> Array1<f64> {
        self.net.forward_one(features)
    }

    /// Mean-squared reconstruction error: the anomaly score.
    pub fn reconstruction_error(&self, features: &Array1<f64>) -> f64 {
        let rec = self.reconstruct(features);
        let dim = features.len().max(1) as f64;
        features
            .iter()
            .zip(rec.iter())
            .map(|(&x, &r)| (x - r) * (x - r))
            .sum::<f64>()
            / dim
    }

    /// Whether `score` crosses the threshold. A score exactly at the
    /// threshold counts as anomalous.
    pub fn is_anomaly(&self, score: f64) -> bool {
        score >= self.threshold
    }
}
