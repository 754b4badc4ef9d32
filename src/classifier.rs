//! Categorical traffic classifier: feature vector → probability distribution
//! over the eight traffic categories.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::features::FEATURE_DIM;
use crate::flow::{TrafficCategory, CATEGORY_COUNT};
use crate::nn::{Loss, Mlp, OutputActivation};

/// Hidden layer widths, input to output.
const HIDDEN: [usize; 3] = [64, 32, 16];
const LEARNING_RATE: f64 = 0.001;
/// Drop probability between hidden layers, training only.
const DROPOUT: f64 = 0.2;

/// Feed-forward softmax classifier over [`TrafficCategory`].
///
/// Architecture: 8 → 64 → 32 → 16 → 8, ReLU hidden activations with dropout
/// during training, softmax output. Optimized with Adam against categorical
/// cross-entropy.
pub struct TrafficClassifier {
    net: Mlp,
}

impl TrafficClassifier {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let dims = [
            FEATURE_DIM,
            HIDDEN[0],
            HIDDEN[1],
            HIDDEN[2],
            CATEGORY_COUNT,
        ];
        TrafficClassifier {
            net: Mlp::new(&dims, OutputActivation::Softmax, rng),
        }
    }

    /// Fit the classifier on a labeled corpus.
    ///
    /// `labels[i]` is the category index of `features` row `i`. Shuffles and
    /// minibatches every epoch.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        features: &Array2<f64>,
        labels: &[usize],
        epochs: usize,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<(), String> {
        if labels.len() != features.nrows() {
            return Err(format!(
                "label count {} does not match sample count {}",
                labels.len(),
                features.nrows()
            ));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= CATEGORY_COUNT) {
            return Err(format!("label index {bad} out of range"));
        }

        // One-hot targets.
        let mut targets = Array2::zeros((labels.len(), CATEGORY_COUNT));
        for (i, &label) in labels.iter().enumerate() {
            targets[[i, label]] = 1.0;
        }

        self.net.fit(
            features,
            &targets,
            Loss::CrossEntropy,
            epochs,
            batch_size,
            LEARNING_RATE,
            DROPOUT,
            rng,
        )?;
        log::info!("classifier trained on {} samples", labels.len());
        Ok(())
    }

    /// Output distribution for one feature vector. Sums to 1.
    pub fn probabilities(&self, features: &Array1<f64>) -> Array1<f64> {
        self.net.forward_one(features)
    }

    /// Predicted category and its probability.
    ///
    /// Ties break toward the first maximum in category order. Returns `None`
    /// if the network produces a non-finite distribution.
    pub fn predict(&self, features: &Array1<f64>) -> Option<(TrafficCategory, f64)> {
        let probs = self.probabilities(features);
        if probs.iter().any(|p| !p.is_finite()) {
            return None;
        }
        let idx = argmax(probs.as_slice()?)?;
        let category = TrafficCategory::from_index(idx)?;
        Some((category, probs[idx]))
    }
}

/// Index of the first maximum in `values`.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;
    use crate::flow::TrafficCategory;
    use crate::synth::SyntheticFlowGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn argmax_first_maximum_wins_ties() {
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), Some(0));
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[0.0, 0.0, 1.0]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn untrained_predict_is_a_valid_distribution() {
        let mut rng = StdRng::seed_from_u64(10);
        let c = TrafficClassifier::new(&mut rng);
        let x = Array1::from(vec![0.5; FEATURE_DIM]);
        let (cat, conf) = c.predict(&x).unwrap();
        assert!(TrafficCategory::ALL.contains(&cat));
        assert!(conf >= 0.0 && conf <= 1.0);
        let probs = c.probabilities(&x);
        assert!((probs.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn train_rejects_bad_labels() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut c = TrafficClassifier::new(&mut rng);
        let x = Array2::zeros((4, FEATURE_DIM));
        assert!(c.train(&x, &[0, 1], 1, 2, &mut rng).is_err());
        assert!(c
            .train(&x, &[0, 1, 2, CATEGORY_COUNT], 1, 2, &mut rng)
            .is_err());
    }

    #[test]
    fn learns_to_separate_synthetic_categories() {
        let mut rng = StdRng::seed_from_u64(12);
        let gen = SyntheticFlowGenerator::new();

        // Balanced corpus over all eight categories.
        let n = 640;
        let mut features = Array2::zeros((n, FEATURE_DIM));
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let cat = TrafficCategory::ALL[i % CATEGORY_COUNT];
            let flow = gen.generate(cat, &mut rng);
            features.row_mut(i).assign(&extract(&flow, &mut rng));
            labels.push(cat.index());
        }

        let mut c = TrafficClassifier::new(&mut rng);
        c.train(&features, &labels, 60, 32, &mut rng).unwrap();

        // Accuracy on fresh flows must beat chance (1/8) by a wide margin.
        let mut hits = 0;
        let trials = 160;
        for i in 0..trials {
            let cat = TrafficCategory::ALL[i % CATEGORY_COUNT];
            let flow = gen.generate(cat, &mut rng);
            let x = extract(&flow, &mut rng);
            let (pred, _) = c.predict(&x).unwrap();
            if pred == cat {
                hits += 1;
            }
        }
        let accuracy = hits as f64 / trials as f64;
        assert!(accuracy > 0.5, "accuracy {accuracy} not above chance");
    }
}
