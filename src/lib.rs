//! Traffic classification and anomaly scoring core for the netops dashboard.
//!
//! `flowsense` ingests descriptors of network flows, assigns each one of
//! eight traffic categories with a confidence score, and separately scores
//! the flow for anomalousness with a reconstruction-based detector. The
//! dashboard screens that display the results (and persist incident records)
//! live elsewhere; this crate is the library they call.
//!
//! # Architecture
//!
//! A [`ClassificationEngine`] is constructed with an [`EngineConfig`] and
//! trains its two models in the background:
//!
//! 1. **Synthetic corpus** — [`synth::SyntheticFlowGenerator`] samples
//!    labeled flows from per-category range profiles; [`features::extract`]
//!    normalizes each into an 8-dimensional feature vector (the eighth
//!    dimension is uniform noise, present to match training dimensionality).
//! 2. **Classifier** — a feed-forward softmax network
//!    ([`classifier::TrafficClassifier`], 8→64→32→16→8) trained with Adam on
//!    categorical cross-entropy.
//! 3. **Anomaly detector** — an autoencoder
//!    ([`anomaly::AnomalyDetector`], 8→16→8→4→8→16→8) trained to reconstruct
//!    the same corpus; mean-squared reconstruction error is the anomaly
//!    score, compared against a fixed threshold.
//!
//! Until training completes, [`ClassificationEngine::classify`] follows a
//! degraded-mode contract (category `unknown`, zero confidence, no history
//! mutation) instead of blocking. Once ready, every successful call is
//! recorded in a bounded most-recent-first history from which
//! [`ClassificationEngine::statistics`] derives aggregates on demand.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use chrono::Utc;
//! use flowsense::{ClassificationEngine, EngineConfig, FlowDescriptor, Protocol};
//!
//! let engine = ClassificationEngine::new(EngineConfig::default());
//! engine.wait_ready(Duration::from_secs(30));
//!
//! let flow = FlowDescriptor {
//!     timestamp: Utc::now(),
//!     packet_size: 1400,
//!     protocol: Protocol::Https,
//!     src_port: 52_114,
//!     dst_port: 443,
//!     bytes_per_sec: 1_200_000.0,
//!     packets_per_sec: 300.0,
//!     duration_secs: 45.0,
//! };
//! let result = engine.classify(&flow);
//! println!("{} ({:.0}%)", result.category, result.confidence * 100.0);
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ClassificationEngine`] | Top-level coordinator — owns models, history, and stats |
//! | [`EngineConfig`] | Construction-time knobs (corpus size, epochs, threshold, …) |
//! | [`FlowDescriptor`] | One observed flow, supplied by the caller |
//! | [`ClassificationResult`] | Category, confidence, and anomaly score per flow |
//! | [`TrafficStats`] | On-demand aggregates over the retained history |
//!
//! # Determinism
//!
//! The training corpus is synthetic and every stochastic path (generator,
//! weight init, shuffling, dropout, the noise feature) draws from a single
//! seedable source: set [`EngineConfig::seed`] and two engines produce
//! identical models and identical classifications. The crate makes no claim
//! of predictive fidelity on real-world traffic.

pub mod anomaly;
pub mod classifier;
pub mod engine;
pub mod features;
pub mod flow;
mod nn;
pub mod synth;

pub use engine::{ClassificationEngine, ClassificationResult, EngineConfig, TrafficStats};
pub use features::FEATURE_DIM;
pub use flow::{FlowDescriptor, Protocol, TrafficCategory, CATEGORY_COUNT};
pub use synth::SyntheticFlowGenerator;
