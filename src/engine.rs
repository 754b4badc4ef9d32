//! The classification engine: orchestrates normalization, model inference,
//! bounded history retention, and aggregate statistics.
//!
//! # Lifecycle
//!
//! `initializing → ready`, exactly once. [`ClassificationEngine::new`] returns
//! immediately and trains both models on a background thread against a
//! synthetic corpus. Until training completes, [`classify`] follows a defined
//! degraded-mode contract (category `unknown`, zero confidence, no history
//! mutation) rather than blocking or failing. If training fails the engine
//! stays permanently not ready — `is_ready` never turning true is the signal.
//!
//! [`classify`]: ClassificationEngine::classify

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyDetector;
use crate::classifier::TrafficClassifier;
use crate::features::{extract, FEATURE_DIM};
use crate::flow::{FlowDescriptor, TrafficCategory, CATEGORY_COUNT};
use crate::synth::SyntheticFlowGenerator;

/// Construction-time configuration. All knobs are fixed constants in the
/// reference design; they are exposed here for testability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synthetic training corpus size.
    pub training_samples: usize,
    /// Training epochs for both models.
    pub epochs: usize,
    /// Minibatch size.
    pub batch_size: usize,
    /// Reconstruction-error cutoff; a score >= this is anomalous.
    pub anomaly_threshold: f64,
    /// Maximum retained classification results.
    pub history_capacity: usize,
    /// Seed for every stochastic path (corpus, weights, shuffling, dropout,
    /// noise feature). `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            training_samples: 1000,
            epochs: 50,
            batch_size: 32,
            anomaly_threshold: 0.1,
            history_capacity: 100,
            seed: None,
        }
    }
}

/// Outcome of classifying one flow.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub category: TrafficCategory,
    /// Probability of the chosen category, in [0, 1].
    pub confidence: f64,
    pub is_anomaly: bool,
    /// Mean-squared reconstruction error, non-negative.
    pub anomaly_score: f64,
    /// The originating descriptor.
    pub flow: FlowDescriptor,
}

/// Aggregates over the retained history. Always recomputed on demand; never
/// persisted independently.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrafficStats {
    pub total: usize,
    /// Only categories actually present in the history appear here.
    pub by_category: HashMap<TrafficCategory, usize>,
    pub anomalies: usize,
    /// Mean confidence across retained results; 0 when the history is empty.
    pub avg_confidence: f64,
}

struct Models {
    classifier: TrafficClassifier,
    detector: AnomalyDetector,
}

struct Shared {
    config: EngineConfig,
    models: RwLock<Option<Models>>,
    ready: AtomicBool,
    ready_gate: Mutex<bool>,
    ready_cv: Condvar,
    history: Mutex<VecDeque<ClassificationResult>>,
    /// RNG for the per-classify noise feature, separate from the training RNG
    /// so inference draws never perturb training reproducibility.
    noise_rng: Mutex<StdRng>,
}

/// The component callers interact with. Cheap to clone (shared state behind
/// an [`Arc`]); model weights are owned exclusively by the engine and never
/// exposed.
#[derive(Clone)]
pub struct ClassificationEngine {
    shared: Arc<Shared>,
}

impl ClassificationEngine {
    /// Construct the engine and start training in the background.
    ///
    /// Returns immediately; poll [`is_ready`](Self::is_ready) or block on
    /// [`wait_ready`](Self::wait_ready) before expecting real
    /// classifications.
    pub fn new(config: EngineConfig) -> Self {
        let (train_rng, noise_rng) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };

        let shared = Arc::new(Shared {
            config,
            models: RwLock::new(None),
            ready: AtomicBool::new(false),
            ready_gate: Mutex::new(false),
            ready_cv: Condvar::new(),
            history: Mutex::new(VecDeque::new()),
            noise_rng: Mutex::new(noise_rng),
        });

        let worker = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("flowsense-train".into())
            .spawn(move || match train_models(&worker.config, train_rng) {
                Ok(models) => {
                    *worker
                        .models
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Some(models);
                    worker.ready.store(true, Ordering::Release);
                    let mut gate = worker
                        .ready_gate
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    *gate = true;
                    worker.ready_cv.notify_all();
                    log::info!("engine ready: both models trained");
                }
                Err(e) => {
                    // Fatal for this engine instance: it stays initializing
                    // forever and is_ready never turns true.
                    log::error!("training failed, engine will not become ready: {e:#}");
                }
            });
        if let Err(e) = spawned {
            log::error!("could not spawn training thread: {e}");
        }

        ClassificationEngine { shared }
    }

    /// The configuration this engine was constructed with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Whether both models finished training.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Block until the engine is ready or `timeout` elapses. Returns the
    /// readiness state on return.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut gate = self
            .shared
            .ready_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*gate {
            let now = Instant::now();
            if now >= deadline {
                return *gate;
            }
            let (g, wait) = self
                .shared
                .ready_cv
                .wait_timeout(gate, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            gate = g;
            if wait.timed_out() {
                return *gate;
            }
        }
        true
    }

    /// Classify one flow.
    ///
    /// Before readiness, and on any internal inference failure, this returns
    /// the degraded default result (category `unknown`, confidence 0, not
    /// anomalous) without touching history — a defined contract, not an
    /// error. Failures are logged, never propagated.
    pub fn classify(&self, flow: &FlowDescriptor) -> ClassificationResult {
        if !self.is_ready() {
            return Self::default_result(flow);
        }

        let features = {
            let mut rng = self
                .shared
                .noise_rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            extract(flow, &mut *rng)
        };

        let guard = self
            .shared
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(models) = guard.as_ref() else {
            return Self::default_result(flow);
        };

        let Some((category, confidence)) = models.classifier.predict(&features) else {
            log::warn!("classifier produced no usable prediction, returning default result");
            return Self::default_result(flow);
        };
        let anomaly_score = models.detector.reconstruction_error(&features);
        if !anomaly_score.is_finite() {
            log::warn!("non-finite anomaly score, returning default result");
            return Self::default_result(flow);
        }
        let is_anomaly = models.detector.is_anomaly(anomaly_score);
        drop(guard);

        let result = ClassificationResult {
            category,
            confidence,
            is_anomaly,
            anomaly_score,
            flow: flow.clone(),
        };

        // Prepend and cap under one lock acquisition so concurrent calls
        // never interleave partial updates or overflow the capacity.
        let mut history = self
            .shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        history.push_front(result.clone());
        history.truncate(self.shared.config.history_capacity);
        drop(history);

        result
    }

    /// Up to `limit` most-recent results (all when `None`), most-recent
    /// first, as an owned snapshot.
    pub fn history(&self, limit: Option<usize>) -> Vec<ClassificationResult> {
        let history = self
            .shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let take = limit.unwrap_or(history.len());
        history.iter().take(take).cloned().collect()
    }

    /// Aggregates recomputed from the current history.
    pub fn statistics(&self) -> TrafficStats {
        let history = self
            .shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        compute_stats(&history)
    }

    /// Drop all retained results. Model state is untouched.
    pub fn clear_history(&self) {
        self.shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn default_result(flow: &FlowDescriptor) -> ClassificationResult {
        ClassificationResult {
            category: TrafficCategory::Unknown,
            confidence: 0.0,
            is_anomaly: false,
            anomaly_score: 0.0,
            flow: flow.clone(),
        }
    }
}

/// Pure stats computation over a history snapshot.
fn compute_stats(history: &VecDeque<ClassificationResult>) -> TrafficStats {
    let total = history.len();
    if total == 0 {
        return TrafficStats::default();
    }
    let mut by_category: HashMap<TrafficCategory, usize> = HashMap::new();
    let mut anomalies = 0;
    let mut confidence_sum = 0.0;
    for result in history {
        *by_category.entry(result.category).or_insert(0) += 1;
        if result.is_anomaly {
            anomalies += 1;
        }
        confidence_sum += result.confidence;
    }
    TrafficStats {
        total,
        by_category,
        anomalies,
        avg_confidence: confidence_sum / total as f64,
    }
}

/// Build the synthetic corpus and fit both models. Runs once, on the
/// training thread.
fn train_models(config: &EngineConfig, mut rng: StdRng) -> Result<Models> {
    ensure!(
        config.training_samples > 0,
        "training corpus size must be nonzero"
    );
    ensure!(config.batch_size > 0, "batch size must be nonzero");
    ensure!(config.epochs > 0, "epoch count must be nonzero");

    let generator = SyntheticFlowGenerator::new();
    let n = config.training_samples;
    let mut features = Array2::zeros((n, FEATURE_DIM));
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        // Labels sampled uniformly over the eight categories.
        let category = TrafficCategory::ALL[rng.gen_range(0..CATEGORY_COUNT)];
        let flow = generator.generate(category, &mut rng);
        features.row_mut(i).assign(&extract(&flow, &mut rng));
        labels.push(category.index());
    }
    log::debug!("built synthetic training corpus: {n} labeled flows");

    let mut classifier = TrafficClassifier::new(&mut rng);
    classifier
        .train(&features, &labels, config.epochs, config.batch_size, &mut rng)
        .map_err(anyhow::Error::msg)
        .context("classifier training")?;

    // The autoencoder reconstructs the same corpus it never classifies.
    let mut detector = AnomalyDetector::new(config.anomaly_threshold, &mut rng);
    detector
        .train(&features, config.epochs, config.batch_size, &mut rng)
        .map_err(anyhow::Error::msg)
        .context("anomaly detector training")?;

    Ok(Models {
        classifier,
        detector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::flow::Protocol;

    fn flow() -> FlowDescriptor {
        FlowDescriptor {
            timestamp: Utc::now(),
            packet_size: 1200,
            protocol: Protocol::Https,
            src_port: 50000,
            dst_port: 443,
            bytes_per_sec: 500_000.0,
            packets_per_sec: 200.0,
            duration_secs: 30.0,
        }
    }

    fn result(category: TrafficCategory, confidence: f64, is_anomaly: bool) -> ClassificationResult {
        ClassificationResult {
            category,
            confidence,
            is_anomaly,
            anomaly_score: if is_anomaly { 0.5 } else { 0.01 },
            flow: flow(),
        }
    }

    #[test]
    fn default_config_matches_reference_values() {
        let c = EngineConfig::default();
        assert_eq!(c.training_samples, 1000);
        assert_eq!(c.epochs, 50);
        assert_eq!(c.batch_size, 32);
        assert_eq!(c.anomaly_threshold, 0.1);
        assert_eq!(c.history_capacity, 100);
        assert_eq!(c.seed, None);
    }

    #[test]
    fn stats_of_empty_history_are_zeroed() {
        let stats = compute_stats(&VecDeque::new());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.anomalies, 0);
        assert_eq!(stats.avg_confidence, 0.0);
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn stats_aggregate_counts_and_confidence() {
        let mut history = VecDeque::new();
        history.push_front(result(TrafficCategory::Web, 0.8, false));
        history.push_front(result(TrafficCategory::Web, 0.6, true));
        history.push_front(result(TrafficCategory::Gaming, 1.0, false));

        let stats = compute_stats(&history);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_category[&TrafficCategory::Web], 2);
        assert_eq!(stats.by_category[&TrafficCategory::Gaming], 1);
        assert!(!stats.by_category.contains_key(&TrafficCategory::Voip));
        assert_eq!(stats.anomalies, 1);
        assert!((stats.avg_confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn category_counts_sum_to_total() {
        let mut history = VecDeque::new();
        for i in 0..17 {
            let cat = TrafficCategory::ALL[i % CATEGORY_COUNT];
            history.push_front(result(cat, 0.5, i % 3 == 0));
        }
        let stats = compute_stats(&history);
        assert_eq!(stats.by_category.values().sum::<usize>(), stats.total);
    }

    #[test]
    fn failed_training_leaves_engine_permanently_unready() {
        // Zero corpus size makes training fail immediately.
        let engine = ClassificationEngine::new(EngineConfig {
            training_samples: 0,
            ..EngineConfig::default()
        });
        assert!(!engine.wait_ready(Duration::from_millis(200)));
        assert!(!engine.is_ready());

        let r = engine.classify(&flow());
        assert_eq!(r.category, TrafficCategory::Unknown);
        assert_eq!(r.confidence, 0.0);
        assert!(!r.is_anomaly);
        assert_eq!(r.anomaly_score, 0.0);
        assert!(engine.history(None).is_empty());
    }

    #[test]
    fn degraded_result_carries_the_descriptor() {
        let f = flow();
        let r = ClassificationEngine::default_result(&f);
        assert_eq!(r.flow, f);
    }
}
