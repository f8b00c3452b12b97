use crate::encoding::EncodedRow;
use crate::features::FeatureColumn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("Scorer returned {actual} probabilities for {expected} rows")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Model references unknown feature column '{0}'")]
    UnknownColumn(String),
    #[error("Model failure: {0}")]
    Model(String),
}

/// Preference probability model, consumed as a black box.
///
/// Implementations receive every leg row of one request in a single call and must return one
/// probability per row, in input order. They are shared across worker threads.
pub trait Scorer: Send + Sync {
    fn score(&self, rows: &[EncodedRow]) -> Result<Vec<f64>, ScoreError>;
}

/// Clamp a raw model output into `0.0..=1.0`; non-finite values become `0.0`.
pub fn sanitise(probability: f64) -> f64 {
    if !probability.is_finite() {
        return 0.0;
    }
    probability.clamp(0.0, 1.0)
}

/// On-disk form of [`LogisticScorer`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

/// `sigmoid(intercept + Σ weight · feature)` over the encoded row.
#[derive(Debug, Clone)]
pub struct LogisticScorer {
    intercept: f64,
    weights: [f64; FeatureColumn::COUNT],
}

impl LogisticScorer {
    pub fn new(intercept: f64, weights: [f64; FeatureColumn::COUNT]) -> Self {
        Self { intercept, weights }
    }

    fn probability(&self, row: &EncodedRow) -> f64 {
        let logit = self.intercept
            + row
                .as_slice()
                .iter()
                .zip(self.weights.iter())
                .map(|(x, w)| x * w)
                .sum::<f64>();
        1.0 / (1.0 + (-logit).exp())
    }
}

impl TryFrom<LogisticModel> for LogisticScorer {
    type Error = ScoreError;

    fn try_from(model: LogisticModel) -> Result<Self, Self::Error> {
        let mut weights = [0.0; FeatureColumn::COUNT];
        for (name, weight) in model.weights {
            let column = name
                .parse::<FeatureColumn>()
                .map_err(|_| ScoreError::UnknownColumn(name.clone()))?;
            weights[column.index()] = weight;
        }
        Ok(Self::new(model.intercept, weights))
    }
}

impl Scorer for LogisticScorer {
    fn score(&self, rows: &[EncodedRow]) -> Result<Vec<f64>, ScoreError> {
        Ok(rows.iter().map(|r| self.probability(r)).collect())
    }
}
