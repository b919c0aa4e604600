/// Classification metrics over one batch
///
/// Precision and recall are computed for the positive class (label 1).
/// When no example is predicted positive, or none is truly positive, the
/// corresponding denominator is zero and the f64 division propagates NaN;
/// the undefined value is never coerced to zero.
use serde::Serialize;

/// Accuracy, precision and recall for one batch of predictions
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BatchMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Index of the maximum score, ties broken by the lowest index
pub fn argmax_row(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// Compute batch metrics from per-example class scores and true labels
pub fn compute(scores: &[Vec<f32>], labels: &[u32]) -> BatchMetrics {
    debug_assert_eq!(scores.len(), labels.len());

    let mut correct = 0usize;
    let mut true_positive = 0usize;
    let mut predicted_positive = 0usize;
    let mut actual_positive = 0usize;

    for (row, &label) in scores.iter().zip(labels.iter()) {
        let predicted = argmax_row(row) as u32;
        if predicted == label {
            correct += 1;
        }
        if predicted == 1 {
            predicted_positive += 1;
            if label == 1 {
                true_positive += 1;
            }
        }
        if label == 1 {
            actual_positive += 1;
        }
    }

    BatchMetrics {
        accuracy: correct as f64 / labels.len() as f64,
        precision: true_positive as f64 / predicted_positive as f64,
        recall: true_positive as f64 / actual_positive as f64,
    }
}
