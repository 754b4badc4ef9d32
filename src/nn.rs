//! Minimal dense-network plumbing shared by the classifier and the
//! autoencoder: fully-connected layers, ReLU hidden activations, a softmax or
//! sigmoid output head, inverted dropout, and Adam.
//!
//! This is deliberately small — two fixed feed-forward architectures over an
//! 8-dimensional input. Batches are `ndarray` matrices with one row per
//! sample.

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

/// Activation applied by the final layer.
#[derive(Clone, Copy, Debug)]
pub(crate) enum OutputActivation {
    /// Row-normalized probabilities (classifier head).
    Softmax,
    /// Elementwise sigmoid (autoencoder reconstruction head).
    Sigmoid,
}

/// Loss minimized by [`Mlp::fit`].
#[derive(Clone, Copy, Debug)]
pub(crate) enum Loss {
    CrossEntropy,
    MeanSquaredError,
}

/// One fully-connected layer with its Adam moment estimates.
struct Dense {
    w: Array2<f64>,
    b: Array1<f64>,
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

impl Dense {
    fn new<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Self {
        // Xavier-uniform initialization.
        let scale = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let w = Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-scale..scale));
        Dense {
            w,
            b: Array1::zeros(fan_out),
            m_w: Array2::zeros((fan_in, fan_out)),
            v_w: Array2::zeros((fan_in, fan_out)),
            m_b: Array1::zeros(fan_out),
            v_b: Array1::zeros(fan_out),
        }
    }

    fn affine(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.w) + &self.b
    }

    fn adam_step(&mut self, dw: &Array2<f64>, db: &Array1<f64>, lr: f64, t: u64) {
        self.m_w = &self.m_w * BETA1 + &(dw * (1.0 - BETA1));
        self.v_w = &self.v_w * BETA2 + &(dw.mapv(|g| g * g) * (1.0 - BETA2));
        self.m_b = &self.m_b * BETA1 + &(db * (1.0 - BETA1));
        self.v_b = &self.v_b * BETA2 + &(db.mapv(|g| g * g) * (1.0 - BETA2));

        let c1 = 1.0 - BETA1.powi(t as i32);
        let c2 = 1.0 - BETA2.powi(t as i32);

        let step_w = self.m_w.mapv(|m| m / c1) / self.v_w.mapv(|v| (v / c2).sqrt() + ADAM_EPS);
        self.w = &self.w - &(step_w * lr);
        let step_b = self.m_b.mapv(|m| m / c1) / self.v_b.mapv(|v| (v / c2).sqrt() + ADAM_EPS);
        self.b = &self.b - &(step_b * lr);
    }
}

/// Feed-forward network: ReLU hidden layers, one output head.
pub(crate) struct Mlp {
    layers: Vec<Dense>,
    output: OutputActivation,
    /// Adam timestep, shared across layers.
    step: u64,
}

impl Mlp {
    /// Build a network with the given layer widths, e.g. `[8, 64, 32, 16, 8]`.
    /// All layers but the last use ReLU; the last uses `output`.
    pub fn new<R: Rng + ?Sized>(dims: &[usize], output: OutputActivation, rng: &mut R) -> Self {
        debug_assert!(dims.len() >= 2, "network needs at least one layer");
        let layers = dims
            .windows(2)
            .map(|pair| Dense::new(pair[0], pair[1], rng))
            .collect();
        Mlp {
            layers,
            output,
            step: 0,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.w.nrows()).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.w.ncols()).unwrap_or(0)
    }

    /// Inference forward pass (no dropout).
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = self.layers.len();
        let mut a = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&a);
            a = if i + 1 < n {
                z.mapv(|v| v.max(0.0))
            } else {
                self.apply_output(z)
            };
        }
        a
    }

    /// Inference forward pass for a single sample.
    pub fn forward_one(&self, x: &Array1<f64>) -> Array1<f64> {
        let batch = x.clone().insert_axis(Axis(0));
        self.forward(&batch).remove_axis(Axis(0))
    }

    fn apply_output(&self, z: Array2<f64>) -> Array2<f64> {
        match self.output {
            OutputActivation::Softmax => softmax_rows(z),
            OutputActivation::Sigmoid => z.mapv(sigmoid),
        }
    }

    /// Minibatch training with per-epoch shuffling.
    ///
    /// `dropout` is the drop probability applied after each hidden ReLU
    /// (inverted dropout, training only; pass 0.0 to disable).
    #[allow(clippy::too_many_arguments)]
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        inputs: &Array2<f64>,
        targets: &Array2<f64>,
        loss: Loss,
        epochs: usize,
        batch_size: usize,
        lr: f64,
        dropout: f64,
        rng: &mut R,
    ) -> Result<(), String> {
        let n = inputs.nrows();
        if n == 0 {
            return Err("training set is empty".to_string());
        }
        if targets.nrows() != n {
            return Err(format!(
                "input/target row mismatch: {} vs {}",
                n,
                targets.nrows()
            ));
        }
        if inputs.ncols() != self.input_dim() {
            return Err(format!(
                "input dim {} does not match network input {}",
                inputs.ncols(),
                self.input_dim()
            ));
        }
        if targets.ncols() != self.output_dim() {
            return Err(format!(
                "target dim {} does not match network output {}",
                targets.ncols(),
                self.output_dim()
            ));
        }
        if batch_size == 0 {
            return Err("batch size must be nonzero".to_string());
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(format!("dropout rate {dropout} outside [0, 1)"));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        for epoch in 0..epochs {
            indices.shuffle(rng);
            let mut epoch_loss = 0.0;
            let mut batches = 0usize;
            for chunk in indices.chunks(batch_size) {
                let xb = Array2::from_shape_fn((chunk.len(), inputs.ncols()), |(r, c)| {
                    inputs[[chunk[r], c]]
                });
                let yb = Array2::from_shape_fn((chunk.len(), targets.ncols()), |(r, c)| {
                    targets[[chunk[r], c]]
                });
                epoch_loss += self.train_batch(&xb, &yb, loss, lr, dropout, rng);
                batches += 1;
            }
            if (epoch + 1) % 10 == 0 || epoch + 1 == epochs {
                log::debug!(
                    "epoch {}/{}: mean batch loss {:.6}",
                    epoch + 1,
                    epochs,
                    epoch_loss / batches.max(1) as f64
                );
            }
        }
        Ok(())
    }

    /// One forward/backward pass over a batch. Returns the batch loss.
    fn train_batch<R: Rng + ?Sized>(
        &mut self,
        xb: &Array2<f64>,
        yb: &Array2<f64>,
        loss: Loss,
        lr: f64,
        dropout: f64,
        rng: &mut R,
    ) -> f64 {
        let n_layers = self.layers.len();
        let batch = xb.nrows() as f64;

        // ---- Forward, caching activations and hidden-layer gates ----
        // gates[i] combines the ReLU derivative with the dropout mask for
        // hidden layer i, so backprop is a single elementwise multiply.
        let mut acts: Vec<Array2<f64>> = Vec::with_capacity(n_layers + 1);
        let mut gates: Vec<Option<Array2<f64>>> = Vec::with_capacity(n_layers);
        acts.push(xb.clone());
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(acts.last().expect("activation stack is never empty"));
            if i + 1 < n_layers {
                let mut a = z.mapv(|v| v.max(0.0));
                let mut gate = a.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                if dropout > 0.0 {
                    let keep = 1.0 - dropout;
                    let mask = Array2::from_shape_fn(a.raw_dim(), |_| {
                        if rng.gen::<f64>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    });
                    a = a * &mask;
                    gate = gate * &mask;
                }
                gates.push(Some(gate));
                acts.push(a);
            } else {
                gates.push(None);
                acts.push(self.apply_output(z));
            }
        }
        let out = acts.last().expect("forward pass produced no output");

        // ---- Loss and output-layer delta ----
        let (loss_val, mut delta) = match loss {
            Loss::CrossEntropy => {
                // Softmax + cross-entropy collapse to (p - y) / batch.
                let l = -(yb * &out.mapv(|p| p.max(1e-12).ln())).sum() / batch;
                (l, (out - yb) / batch)
            }
            Loss::MeanSquaredError => {
                let dim = out.ncols() as f64;
                let diff = out - yb;
                let l = diff.mapv(|d| d * d).sum() / (batch * dim);
                let grad = &diff * (2.0 / (batch * dim));
                // Through the sigmoid head: a * (1 - a).
                let dsig = out.mapv(|a| a * (1.0 - a));
                (l, grad * &dsig)
            }
        };

        // ---- Backward + Adam ----
        self.step += 1;
        for i in (0..n_layers).rev() {
            let dw = acts[i].t().dot(&delta);
            let db = delta.sum_axis(Axis(0));
            if i > 0 {
                let back = delta.dot(&self.layers[i].w.t());
                delta = match &gates[i - 1] {
                    Some(gate) => back * gate,
                    None => back,
                };
            }
            self.layers[i].adam_step(&dw, &db, lr, self.step);
        }
        loss_val
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Row-wise softmax with max subtraction for numerical stability.
fn softmax_rows(mut z: Array2<f64>) -> Array2<f64> {
    for mut row in z.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        } else {
            let uniform = 1.0 / row.len() as f64;
            row.fill(uniform);
        }
    }
    z
}
