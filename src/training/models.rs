//! Model trait and evaluation metrics

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary confusion counts, positive class = churn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.true_positive += 1,
                (false, true) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
                (true, false) => cm.false_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Metrics for model evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    /// Precision of the churn class
    pub precision: f64,
    /// Recall of the churn class
    pub recall: f64,
    /// F1 score of the churn class
    pub f1_score: f64,
    /// AUC-ROC; `None` when only one class is present
    pub auc_roc: Option<f64>,
    pub log_loss: Option<f64>,
    pub confusion: ConfusionMatrix,
    /// Training time in seconds
    pub training_time_secs: f64,
    pub n_features: usize,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute classification metrics from labels, hard predictions and optional probabilities
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: Option<&Array1<f64>>,
    ) -> Self {
        let confusion = ConfusionMatrix::from_predictions(y_true, y_pred);
        let n = confusion.total();
        let tp = confusion.true_positive as f64;

        let accuracy = if n > 0 {
            (confusion.true_positive + confusion.true_negative) as f64 / n as f64
        } else {
            0.0
        };
        let precision = ratio(tp, tp + confusion.false_positive as f64);
        let recall = ratio(tp, tp + confusion.false_negative as f64);

        Self {
            accuracy,
            precision,
            recall,
            f1_score: harmonic_mean(precision, recall),
            auc_roc: y_prob.and_then(|p| roc_auc(y_true, p)),
            log_loss: y_prob.and_then(|p| log_loss(y_true, p)),
            confusion,
            training_time_secs: 0.0,
            n_features: 0,
            n_samples: n,
        }
    }
}

/// Per-class precision / recall / F1 / support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Classification report over the two churn classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let (tn, fp, fn_, tp) = (
            cm.true_negative as f64,
            cm.false_positive as f64,
            cm.false_negative as f64,
            cm.true_positive as f64,
        );

        let class = |label: &str, hit: f64, wrong_pred: f64, missed: f64, support: usize| {
            let precision = ratio(hit, hit + wrong_pred);
            let recall = ratio(hit, hit + missed);
            ClassMetrics {
                label: label.to_string(),
                precision,
                recall,
                f1_score: harmonic_mean(precision, recall),
                support,
            }
        };

        let classes = vec![
            class("Not Churn", tn, fn_, fp, cm.true_negative + cm.false_positive),
            class("Churn", tp, fp, fn_, cm.true_positive + cm.false_negative),
        ];

        let total = cm.total();
        let average = |label: &str, weight: &dyn Fn(&ClassMetrics) -> f64| {
            let norm: f64 = classes.iter().map(|c| weight(c)).sum();
            let avg = |field: fn(&ClassMetrics) -> f64| {
                if norm > 0.0 {
                    classes.iter().map(|c| field(c) * weight(c)).sum::<f64>() / norm
                } else {
                    0.0
                }
            };
            ClassMetrics {
                label: label.to_string(),
                precision: avg(|c| c.precision),
                recall: avg(|c| c.recall),
                f1_score: avg(|c| c.f1_score),
                support: total,
            }
        };

        let macro_avg = average("macro avg", &|_| 1.0);
        let weighted_avg = average("weighted avg", &|c| c.support as f64);

        Self {
            accuracy: if total > 0 { (tn + tp) / total as f64 } else { 0.0 },
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for c in [&self.macro_avg, &self.weighted_avg] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        Ok(())
    }
}

/// Trait for binary classifiers
pub trait Model: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Hard 0/1 predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Probability of the positive class
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    /// Input width the model was fitted on
    fn n_features(&self) -> usize;
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn harmonic_mean(p: f64, r: f64) -> f64 {
    if p + r > 0.0 {
        2.0 * p * r / (p + r)
    } else {
        0.0
    }
}

/// Rank-based ROC AUC with average ranks for tied scores
fn roc_auc(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Option<f64> {
    let mut scored: Vec<(f64, bool)> = y_prob
        .iter()
        .zip(y_true.iter())
        .map(|(p, t)| (*p, *t > 0.5))
        .collect();
    let n_pos = scored.iter().filter(|(_, t)| *t).count();
    let n_neg = scored.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < scored.len() {
        let mut j = i;
        while j + 1 < scored.len() && scored[j + 1].0 == scored[i].0 {
            j += 1;
        }
        // 1-based ranks i+1 ..= j+1 share their average
        let avg_rank = (i + j + 2) as f64 / 2.0;
        rank_sum += avg_rank * scored[i..=j].iter().filter(|(_, t)| *t).count() as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

fn log_loss(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Option<f64> {
    if y_true.is_empty() {
        return None;
    }
    let eps = 1e-15;
    let total: f64 = y_true
        .iter()
        .zip(y_prob.iter())
        .map(|(t, p)| {
            let p = p.clamp(eps, 1.0 - eps);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    Some(total / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_pred, None);

        assert_eq!(metrics.accuracy, 0.75);
        assert_eq!(metrics.precision, 0.75);
        assert_eq!(metrics.recall, 0.75);
        assert_eq!(metrics.f1_score, 0.75);
        assert_eq!(
            metrics.confusion,
            ConfusionMatrix {
                true_negative: 3,
                false_positive: 1,
                false_negative: 1,
                true_positive: 3,
            }
        );
        assert!(metrics.auc_roc.is_none());
    }

    #[test]
    fn test_roc_auc() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let perfect = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y_true, &perfect), Some(1.0));

        let scores = array![0.1, 0.4, 0.35, 0.8];
        assert_eq!(roc_auc(&y_true, &scores), Some(0.75));

        let tied = array![0.5, 0.5, 0.5, 0.5];
        assert_eq!(roc_auc(&y_true, &tied), Some(0.5));

        assert_eq!(roc_auc(&array![1.0, 1.0], &array![0.2, 0.3]), None);
    }

    #[test]
    fn test_log_loss() {
        let y_true = array![1.0, 0.0];
        let y_prob = array![0.5, 0.5];
        let loss = log_loss(&y_true, &y_prob).unwrap();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_classification_report() {
        let cm = ConfusionMatrix {
            true_negative: 8,
            false_positive: 2,
            false_negative: 1,
            true_positive: 4,
        };
        let report = ClassificationReport::from_confusion(&cm);

        assert_eq!(report.classes[0].label, "Not Churn");
        assert_eq!(report.classes[0].support, 10);
        assert!((report.classes[0].precision - 8.0 / 9.0).abs() < 1e-12);
        assert!((report.classes[1].recall - 0.8).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 15);
        assert!((report.accuracy - 0.8).abs() < 1e-12);

        let text = report.to_string();
        assert!(text.contains("weighted avg"));
        assert!(text.contains("Churn"));
    }
}
