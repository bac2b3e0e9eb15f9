//! Inference and evaluation.

use std::collections::BTreeMap;

use burn::prelude::*;
use burn::tensor::activation::softmax;
use ndarray::{Array2, Array3};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TrainError};
use crate::losses::CrossEntropyLoss;
use tsformer_analysis::calculate_metrics;
use tsformer_core::SeriesClassifier;
use tsformer_data::{LabelEncoder, SeriesDataLoader, SeriesDataset};

/// Model output over a whole loader, in loader order.
#[derive(Debug, Clone)]
pub struct Predictions {
    /// Predicted class index per sample.
    pub classes: Vec<usize>,
    /// Softmax probabilities `(N, n_classes)`.
    pub probabilities: Array2<f32>,
    /// Mean cross-entropy when the loader carries labels.
    pub loss: Option<f32>,
}

fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrainError::ShapeMismatch(format!("{:?}", e)))
}

/// Run `model` over every batch of `loader`.
///
/// # Errors
///
/// Returns an error if a batch cannot be built.
pub fn predict<B, M>(model: &M, loader: &SeriesDataLoader, device: &B::Device) -> Result<Predictions>
where
    B: Backend,
    M: SeriesClassifier<B>,
{
    let n_classes = model.n_classes();
    let loss_fn = CrossEntropyLoss::new();

    let mut probabilities = Vec::with_capacity(loader.len() * n_classes);
    let mut weighted_loss = 0.0f32;
    let mut labeled = 0usize;

    for batch in loader.iter::<B>(device) {
        let batch = batch?;
        let n = batch.len();
        let logits = model.forward(batch.x);

        if let Some(targets) = batch.targets {
            let loss = loss_fn.forward(logits.clone(), targets);
            weighted_loss += loss.into_scalar().elem::<f32>() * n as f32;
            labeled += n;
        }
        probabilities.extend(to_vec(softmax(logits, 1))?);
    }

    let n = probabilities.len() / n_classes.max(1);
    let probabilities = Array2::from_shape_vec((n, n_classes), probabilities)
        .map_err(|e| TrainError::ShapeMismatch(e.to_string()))?;

    let classes = probabilities
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
                .0
        })
        .collect();

    debug!("predicted {} samples", n);
    Ok(Predictions {
        classes,
        probabilities,
        loss: (labeled > 0).then(|| weighted_loss / labeled as f32),
    })
}

/// Outcome of evaluating a classifier on labeled data.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Mean cross-entropy.
    pub loss: f32,
    /// Fraction of correct predictions.
    pub accuracy: f32,
    /// True labels in their original values.
    pub y_true: Vec<i64>,
    /// Predicted labels in their original values.
    pub predictions: Vec<i64>,
    /// Class probabilities `(N, n_classes)`.
    #[serde(skip)]
    pub probabilities: Array2<f32>,
    /// Metric keys from [`calculate_metrics`].
    pub metrics: BTreeMap<String, f32>,
}

impl EvaluationReport {
    /// Flatten `loss`, `accuracy` and the metric keys into one map.
    pub fn to_map(&self) -> BTreeMap<String, f32> {
        let mut map = self.metrics.clone();
        map.insert("loss".to_string(), self.loss);
        map.insert("accuracy".to_string(), self.accuracy);
        map
    }
}

/// Evaluate `model` on `(x, y)`, where `y` holds original label values.
///
/// `label` prefixes the metric keys.
///
/// # Errors
///
/// Returns an error if a label is unknown to `labels`, the shapes disagree, or
/// the model predicts a class index the encoder does not know.
pub fn evaluate_classifier<B, M>(
    model: &M,
    x: &Array3<f32>,
    y: &[i64],
    labels: &LabelEncoder,
    batch_size: usize,
    device: &B::Device,
    label: &str,
) -> Result<EvaluationReport>
where
    B: Backend,
    M: SeriesClassifier<B>,
{
    let encoded = labels.transform(y)?;
    let dataset = SeriesDataset::from_arrays(x.clone(), Some(encoded))?;
    let loader = SeriesDataLoader::builder(dataset)
        .batch_size(batch_size)
        .shuffle(false)
        .build()?;

    let preds = predict::<B, M>(model, &loader, device)?;
    let predictions = labels.inverse_transform(&preds.classes)?;

    let correct = y.iter().zip(&predictions).filter(|(t, p)| t == p).count();
    let accuracy = if y.is_empty() { 0.0 } else { correct as f32 / y.len() as f32 };
    let metrics = calculate_metrics(y, &predictions, label)?;

    Ok(EvaluationReport {
        loss: preds.loss.unwrap_or(0.0),
        accuracy,
        y_true: y.to_vec(),
        predictions,
        probabilities: preds.probabilities,
        metrics,
    })
}
