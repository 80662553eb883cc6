//! Test-set evaluation: confusion matrix and per-class report

use std::fmt;

/// Predicted class per row of a flattened `[rows, num_classes]` matrix
pub fn argmax_classes(probs: &[f32], num_classes: usize) -> Vec<usize> {
    probs.chunks(num_classes).map(argmax).collect()
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Confusion matrix with actual classes on rows, predicted on columns
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    classes: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(classes: &[String]) -> Self {
        ConfusionMatrix {
            classes: classes.to_vec(),
            counts: vec![vec![0; classes.len()]; classes.len()],
        }
    }

    /// Build from parallel slices of class indices
    pub fn from_predictions(classes: &[String], y_true: &[usize], y_pred: &[usize]) -> Self {
        let mut matrix = Self::new(classes);
        for (actual, predicted) in y_true.iter().zip(y_pred.iter()) {
            matrix.record(*actual, *predicted);
        }
        matrix
    }

    pub fn record(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of samples with this actual class
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// Number of samples predicted as this class
    pub fn predicted_count(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.num_classes()).map(|i| self.counts[i][i]).sum();
        correct as f64 / total as f64
    }

    pub fn precision(&self, class: usize) -> f64 {
        let predicted = self.predicted_count(class);
        if predicted == 0 {
            0.0
        } else {
            self.counts[class][class] as f64 / predicted as f64
        }
    }

    pub fn recall(&self, class: usize) -> f64 {
        let support = self.support(class);
        if support == 0 {
            0.0
        } else {
            self.counts[class][class] as f64 / support as f64
        }
    }

    pub fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.len())
            .max()
            .unwrap_or(0)
            .max(6)
            + 2;

        writeln!(f, "Confusion matrix (rows: actual, columns: predicted)")?;
        write!(f, "{:>width$}", "")?;
        for class in &self.classes {
            write!(f, "{:>width$}", class)?;
        }
        writeln!(f)?;

        for (i, class) in self.classes.iter().enumerate() {
            write!(f, "{:>width$}", class)?;
            for j in 0..self.num_classes() {
                write!(f, "{:>width$}", self.counts[i][j])?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Per-class precision/recall/f1 for one class
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics with macro and support-weighted averages
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub rows: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub total_support: usize,
}

impl ClassificationReport {
    pub fn from_matrix(matrix: &ConfusionMatrix) -> Self {
        let rows = matrix
            .classes()
            .iter()
            .enumerate()
            .map(|(i, label)| ClassMetrics {
                label: label.clone(),
                precision: matrix.precision(i),
                recall: matrix.recall(i),
                f1: matrix.f1(i),
                support: matrix.support(i),
            })
            .collect();

        ClassificationReport {
            rows,
            accuracy: matrix.accuracy(),
            total_support: matrix.total(),
        }
    }

    /// Unweighted mean of (precision, recall, f1)
    pub fn macro_avg(&self) -> (f64, f64, f64) {
        if self.rows.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let n = self.rows.len() as f64;
        let p = self.rows.iter().map(|r| r.precision).sum::<f64>() / n;
        let r = self.rows.iter().map(|r| r.recall).sum::<f64>() / n;
        let f1 = self.rows.iter().map(|r| r.f1).sum::<f64>() / n;
        (p, r, f1)
    }

    /// Support-weighted mean of (precision, recall, f1)
    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        if self.total_support == 0 {
            return (0.0, 0.0, 0.0);
        }
        let total = self.total_support as f64;
        let p = self
            .rows
            .iter()
            .map(|r| r.precision * r.support as f64)
            .sum::<f64>()
            / total;
        let r = self
            .rows
            .iter()
            .map(|r| r.recall * r.support as f64)
            .sum::<f64>()
            / total;
        let f1 = self.rows.iter().map(|r| r.f1 * r.support as f64).sum::<f64>() / total;
        (p, r, f1)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.label.len())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        writeln!(
            f,
            "{:>width$}{:>11}{:>11}{:>11}{:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for row in &self.rows {
            writeln!(
                f,
                "{:>width$}{:>11.4}{:>11.4}{:>11.4}{:>10}",
                row.label, row.precision, row.recall, row.f1, row.support
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}{:>11}{:>11}{:>11.4}{:>10}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;

        let (mp, mr, mf) = self.macro_avg();
        writeln!(
            f,
            "{:>width$}{:>11.4}{:>11.4}{:>11.4}{:>10}",
            "macro avg", mp, mr, mf, self.total_support
        )?;

        let (wp, wr, wf) = self.weighted_avg();
        writeln!(
            f,
            "{:>width$}{:>11.4}{:>11.4}{:>11.4}{:>10}",
            "weighted avg", wp, wr, wf, self.total_support
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_argmax_classes() {
        let probs = [0.1, 0.7, 0.2, 0.6, 0.3, 0.1];
        assert_eq!(argmax_classes(&probs, 3), vec![1, 0]);
    }

    #[test]
    fn test_matrix_counts_and_accuracy() {
        let classes = classes(&["curl", "press", "squat"]);
        let y_true = [0, 0, 1, 1, 2];
        let y_pred = [0, 1, 1, 1, 2];
        let matrix = ConfusionMatrix::from_predictions(&classes, &y_true, &y_pred);

        assert_eq!(matrix.count(0, 0), 1);
        assert_eq!(matrix.count(0, 1), 1);
        assert_eq!(matrix.count(1, 1), 2);
        assert_eq!(matrix.count(2, 2), 1);
        assert_eq!(matrix.total(), 5);
        assert!((matrix.accuracy() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_precision_recall_f1() {
        let classes = classes(&["curl", "press", "squat"]);
        let y_true = [0, 0, 1, 1, 2];
        let y_pred = [0, 1, 1, 1, 2];
        let matrix = ConfusionMatrix::from_predictions(&classes, &y_true, &y_pred);

        assert!((matrix.recall(0) - 0.5).abs() < 1e-9);
        assert!((matrix.precision(1) - 2.0 / 3.0).abs() < 1e-9);
        assert!((matrix.recall(1) - 1.0).abs() < 1e-9);
        assert!((matrix.f1(1) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_unpredicted_class_scores_zero() {
        let classes = classes(&["curl", "press"]);
        let y_true = [0, 1, 1];
        let y_pred = [0, 0, 0];
        let matrix = ConfusionMatrix::from_predictions(&classes, &y_true, &y_pred);

        assert_eq!(matrix.predicted_count(1), 0);
        assert_eq!(matrix.precision(1), 0.0);
        assert_eq!(matrix.recall(1), 0.0);
        assert_eq!(matrix.f1(1), 0.0);
    }

    #[test]
    fn test_report_averages() {
        let classes = classes(&["curl", "press"]);
        let y_true = [0, 0, 0, 1];
        let y_pred = [0, 0, 1, 1];
        let matrix = ConfusionMatrix::from_predictions(&classes, &y_true, &y_pred);
        let report = ClassificationReport::from_matrix(&matrix);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.total_support, 4);
        assert!((report.accuracy - 0.75).abs() < 1e-9);

        // precision: curl 1.0, press 0.5; recall: curl 2/3, press 1.0
        let (mp, mr, _) = report.macro_avg();
        assert!((mp - 0.75).abs() < 1e-9);
        assert!((mr - (2.0 / 3.0 + 1.0) / 2.0).abs() < 1e-9);

        let (wp, _, _) = report.weighted_avg();
        assert!((wp - (1.0 * 3.0 + 0.5 * 1.0) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_includes_class_rows() {
        let classes = classes(&["curl", "press"]);
        let matrix = ConfusionMatrix::from_predictions(&classes, &[0, 1], &[0, 1]);
        let report = ClassificationReport::from_matrix(&matrix);

        let matrix_text = matrix.to_string();
        assert!(matrix_text.contains("curl"));
        assert!(matrix_text.contains("press"));

        let report_text = report.to_string();
        assert!(report_text.contains("precision"));
        assert!(report_text.contains("macro avg"));
        assert!(report_text.contains("weighted avg"));
    }
}
