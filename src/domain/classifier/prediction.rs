//! Prediction result and logit reduction

use serde::{Deserialize, Serialize};

use super::label::TumorClass;
use crate::domain::DomainError;

/// Outcome of classifying a single image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted category
    pub class: TumorClass,
    /// Probability of `class` as a percentage, rounded to two decimals
    pub confidence: f64,
}

impl Prediction {
    /// Build a prediction from an externally supplied confidence percentage.
    ///
    /// The confidence must lie in [0, 100]; it is rounded to two decimals.
    pub fn new(class: TumorClass, confidence: f64) -> Result<Self, DomainError> {
        if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
            return Err(DomainError::validation(format!(
                "Confidence {} is outside [0, 100]",
                confidence
            )));
        }

        Ok(Self {
            class,
            confidence: round_percent(confidence),
        })
    }

    /// Reduce raw classifier scores to a prediction.
    ///
    /// Applies softmax over the scores, picks the most probable class (first
    /// index wins on ties) and reports its probability as a percentage.
    pub fn from_logits(logits: &[f32]) -> Result<Self, DomainError> {
        if logits.len() != TumorClass::COUNT {
            return Err(DomainError::inference(format!(
                "Expected {} logits, got {}",
                TumorClass::COUNT,
                logits.len()
            )));
        }

        let probabilities = softmax(logits);
        let (index, probability) = argmax(&probabilities)
            .ok_or_else(|| DomainError::inference("Logits contain no finite value"))?;

        let class = TumorClass::from_index(index)
            .ok_or_else(|| DomainError::inference(format!("No class for index {}", index)))?;

        Ok(Self {
            class,
            confidence: round_percent(probability as f64 * 100.0),
        })
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest element; the first occurrence wins ties.
/// NaN entries are never selected.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }

        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }

    best
}

fn round_percent(value: f64) -> f64 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 100.0)
}
