//! Content and interaction-sequence scorers.
//!
//! Each scorer is a small dense network mapping a fixed-shape feature input
//! to a deception probability in [0, 1]. Inference and training are async so
//! a heavier model runtime can be swapped in behind the same contract; the
//! math itself is plain `Vec<f32>` arithmetic.
//!
//! A scorer instance is not reentrant: callers must not run two concurrent
//! `predict`/`train` calls against the same instance without external
//! locking. `dispose` releases the weight buffers exactly once; any use
//! afterwards is a fatal contract violation and panics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ModelError;
use crate::features::INTERACTION_FEATURES;

const HIDDEN_UNITS: usize = 16;
const DEFAULT_LEARNING_RATE: f32 = 0.05;

/// Accuracy and mean binary-cross-entropy loss over a labeled set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub mean_loss: f64,
}

/// One-hidden-layer dense net with a sigmoid head.
#[derive(Debug, Clone)]
struct DenseNet {
    input_dim: usize,
    w1: Vec<f32>, // HIDDEN_UNITS x input_dim, row-major
    b1: Vec<f32>,
    w2: Vec<f32>, // HIDDEN_UNITS
    b2: f32,
}

impl DenseNet {
    fn new(input_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = 1.0 / (input_dim as f32).sqrt();
        let w1 = (0..HIDDEN_UNITS * input_dim)
            .map(|_| rng.random_range(-scale..scale))
            .collect();
        let w2 = (0..HIDDEN_UNITS)
            .map(|_| rng.random_range(-scale..scale))
            .collect();
        Self {
            input_dim,
            w1,
            b1: vec![0.0; HIDDEN_UNITS],
            w2,
            b2: 0.0,
        }
    }

    fn hidden(&self, input: &[f32]) -> Vec<f32> {
        (0..HIDDEN_UNITS)
            .map(|j| {
                let row = &self.w1[j * self.input_dim..(j + 1) * self.input_dim];
                let z: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + self.b1[j];
                z.max(0.0)
            })
            .collect()
    }

    fn forward(&self, input: &[f32]) -> f64 {
        let hidden = self.hidden(input);
        let z: f32 = hidden
            .iter()
            .zip(&self.w2)
            .map(|(h, w)| h * w)
            .sum::<f32>()
            + self.b2;
        sigmoid(f64::from(z))
    }

    /// One SGD step on binary cross-entropy; returns the sample loss.
    fn train_step(&mut self, input: &[f32], label: f64, lr: f32) -> f64 {
        let hidden = self.hidden(input);
        let p = {
            let z: f32 = hidden
                .iter()
                .zip(&self.w2)
                .map(|(h, w)| h * w)
                .sum::<f32>()
                + self.b2;
            sigmoid(f64::from(z))
        };
        let loss = bce(p, label);

        let delta_out = (p - label) as f32;
        let w2_before: Vec<f32> = self.w2.clone();
        for j in 0..HIDDEN_UNITS {
            self.w2[j] -= lr * delta_out * hidden[j];
        }
        self.b2 -= lr * delta_out;
        for j in 0..HIDDEN_UNITS {
            if hidden[j] <= 0.0 {
                continue; // relu gate
            }
            let delta_h = delta_out * w2_before[j];
            let row = &mut self.w1[j * self.input_dim..(j + 1) * self.input_dim];
            for (w, x) in row.iter_mut().zip(input) {
                *w -= lr * delta_h * x;
            }
            self.b1[j] -= lr * delta_h;
        }
        loss
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn bce(p: f64, label: f64) -> f64 {
    let p = p.clamp(1e-7, 1.0 - 1e-7);
    -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
}

/// Shared scorer body; the public types fix the input shape.
#[derive(Debug)]
struct ScorerInner {
    name: &'static str,
    net: Option<DenseNet>,
}

impl ScorerInner {
    fn new(name: &'static str, input_dim: usize, seed: u64) -> Self {
        Self {
            name,
            net: Some(DenseNet::new(input_dim, seed)),
        }
    }

    fn net(&self) -> &DenseNet {
        self.net
            .as_ref()
            .unwrap_or_else(|| panic!("{} used after dispose", self.name))
    }

    fn net_mut(&mut self) -> &mut DenseNet {
        let name = self.name;
        self.net
            .as_mut()
            .unwrap_or_else(|| panic!("{name} used after dispose"))
    }

    fn check_dim(&self, got: usize) -> Result<(), ModelError> {
        let expected = self.net().input_dim;
        if got == expected {
            Ok(())
        } else {
            Err(ModelError::Dimension { expected, got })
        }
    }

    fn predict(&self, input: &[f32]) -> Result<f64, ModelError> {
        self.check_dim(input.len())?;
        Ok(self.net().forward(input))
    }

    fn train(
        &mut self,
        samples: &[Vec<f32>],
        labels: &[f64],
        epochs: usize,
    ) -> Result<f64, ModelError> {
        if samples.is_empty() || samples.len() != labels.len() {
            return Err(ModelError::InvalidTrainingSet);
        }
        for sample in samples {
            self.check_dim(sample.len())?;
        }
        let mut mean_loss = 0.0;
        for _ in 0..epochs.max(1) {
            let mut total = 0.0;
            for (sample, &label) in samples.iter().zip(labels) {
                total += self
                    .net_mut()
                    .train_step(sample, label, DEFAULT_LEARNING_RATE);
            }
            mean_loss = total / samples.len() as f64;
        }
        tracing::debug!(scorer = self.name, mean_loss, "training pass finished");
        Ok(mean_loss)
    }

    fn evaluate(&self, samples: &[Vec<f32>], labels: &[f64]) -> Result<Evaluation, ModelError> {
        if samples.is_empty() || samples.len() != labels.len() {
            return Err(ModelError::InvalidTrainingSet);
        }
        let mut correct = 0usize;
        let mut total_loss = 0.0;
        for (sample, &label) in samples.iter().zip(labels) {
            let p = self.predict(sample)?;
            total_loss += bce(p, label);
            if (p >= 0.5) == (label >= 0.5) {
                correct += 1;
            }
        }
        Ok(Evaluation {
            accuracy: correct as f64 / samples.len() as f64,
            mean_loss: total_loss / samples.len() as f64,
        })
    }

    fn dispose(&mut self) {
        assert!(
            self.net.take().is_some(),
            "{} disposed twice",
            self.name
        );
        tracing::debug!(scorer = self.name, "disposed");
    }
}

/// Estimates deception probability from a content feature vector.
#[derive(Debug)]
pub struct ContentScorer {
    inner: ScorerInner,
}

impl ContentScorer {
    #[must_use]
    pub fn new(vector_len: usize, seed: u64) -> Self {
        Self {
            inner: ScorerInner::new("content scorer", vector_len, seed),
        }
    }

    pub async fn predict(&self, features: &[f32]) -> Result<f64, ModelError> {
        self.inner.predict(features)
    }

    pub async fn predict_batch(&self, batch: &[Vec<f32>]) -> Result<Vec<f64>, ModelError> {
        batch.iter().map(|f| self.inner.predict(f)).collect()
    }

    /// Run `epochs` passes of SGD; returns the final mean loss.
    pub async fn train(
        &mut self,
        samples: &[Vec<f32>],
        labels: &[f64],
        epochs: usize,
    ) -> Result<f64, ModelError> {
        self.inner.train(samples, labels, epochs)
    }

    pub async fn evaluate(
        &self,
        samples: &[Vec<f32>],
        labels: &[f64],
    ) -> Result<Evaluation, ModelError> {
        self.inner.evaluate(samples, labels)
    }

    /// Release the weight buffers. Call exactly once; any predict or train
    /// after this panics.
    pub fn dispose(&mut self) {
        self.inner.dispose();
    }
}

/// Estimates deception probability from vectorized interaction history.
#[derive(Debug)]
pub struct SequenceScorer {
    inner: ScorerInner,
    sequence_len: usize,
}

impl SequenceScorer {
    #[must_use]
    pub fn new(sequence_len: usize, seed: u64) -> Self {
        Self {
            inner: ScorerInner::new(
                "sequence scorer",
                sequence_len * INTERACTION_FEATURES,
                seed,
            ),
            sequence_len,
        }
    }

    pub async fn predict(&self, rows: &[[f32; INTERACTION_FEATURES]]) -> Result<f64, ModelError> {
        self.inner.predict(&self.flatten(rows))
    }

    pub async fn predict_batch(
        &self,
        batch: &[Vec<[f32; INTERACTION_FEATURES]>],
    ) -> Result<Vec<f64>, ModelError> {
        batch
            .iter()
            .map(|rows| self.inner.predict(&self.flatten(rows)))
            .collect()
    }

    pub async fn train(
        &mut self,
        samples: &[Vec<[f32; INTERACTION_FEATURES]>],
        labels: &[f64],
        epochs: usize,
    ) -> Result<f64, ModelError> {
        let flat: Vec<Vec<f32>> = samples.iter().map(|rows| self.flatten(rows)).collect();
        self.inner.train(&flat, labels, epochs)
    }

    pub async fn evaluate(
        &self,
        samples: &[Vec<[f32; INTERACTION_FEATURES]>],
        labels: &[f64],
    ) -> Result<Evaluation, ModelError> {
        let flat: Vec<Vec<f32>> = samples.iter().map(|rows| self.flatten(rows)).collect();
        self.inner.evaluate(&flat, labels)
    }

    /// Release the weight buffers. Call exactly once.
    pub fn dispose(&mut self) {
        self.inner.dispose();
    }

    fn flatten(&self, rows: &[[f32; INTERACTION_FEATURES]]) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.sequence_len * INTERACTION_FEATURES);
        for row in rows.iter().take(self.sequence_len) {
            flat.extend_from_slice(row);
        }
        flat.resize(self.sequence_len * INTERACTION_FEATURES, 0.0);
        flat
    }
}
