//! Flat metric maps for evaluation summaries.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::report::classification_report;

fn key(label: &str, name: &str) -> String {
    if label.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", label, name)
    }
}

/// Accuracy, macro and weighted precision/recall/F1 and per-class F1.
///
/// Keys are prefixed with `label` (e.g. `"test_f1_macro"`); an empty label
/// leaves them bare. Per-class F1 appears as `f1_class_<label value>`.
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
///
/// # Example
///
/// ```rust
/// use tsformer_analysis::calculate_metrics;
///
/// let m = calculate_metrics(&[0, 1, 1], &[0, 1, 0], "test").unwrap();
/// assert!(m.contains_key("test_accuracy"));
/// assert!(m.contains_key("test_f1_class_1"));
/// ```
pub fn calculate_metrics(y_true: &[i64], y_pred: &[i64], label: &str) -> Result<BTreeMap<String, f32>> {
    let report = classification_report(y_true, y_pred)?;

    let mut metrics = BTreeMap::new();
    metrics.insert(key(label, "accuracy"), report.accuracy);
    metrics.insert(key(label, "precision_macro"), report.macro_precision);
    metrics.insert(key(label, "recall_macro"), report.macro_recall);
    metrics.insert(key(label, "f1_macro"), report.macro_f1);
    metrics.insert(key(label, "precision_weighted"), report.weighted_precision);
    metrics.insert(key(label, "recall_weighted"), report.weighted_recall);
    metrics.insert(key(label, "f1_weighted"), report.weighted_f1);
    for class in &report.classes {
        metrics.insert(
            key(label, &format!("f1_class_{}", class.class)),
            class.f1_score,
        );
    }
    Ok(metrics)
}

/// Render a metric map as aligned `name: value` lines.
pub fn format_metrics_summary(metrics: &BTreeMap<String, f32>) -> String {
    let width = metrics.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::from("Metrics summary\n");
    out.push_str(&"-".repeat(width + 10));
    out.push('\n');
    for (name, value) in metrics {
        out.push_str(&format!("{:<width$}  {:.4}\n", name, value, width = width));
    }
    out
}

/// Print a metric map to stdout.
pub fn print_metrics_summary(metrics: &BTreeMap<String, f32>) {
    println!("{}", format_metrics_summary(metrics));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_prefixed() {
        let m = calculate_metrics(&[0, 1, 0, 1], &[0, 1, 1, 1], "val").unwrap();
        for k in [
            "val_accuracy",
            "val_precision_macro",
            "val_recall_macro",
            "val_f1_macro",
            "val_precision_weighted",
            "val_recall_weighted",
            "val_f1_weighted",
            "val_f1_class_0",
            "val_f1_class_1",
        ] {
            assert!(m.contains_key(k), "missing {}", k);
        }
        assert!((m["val_accuracy"] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_empty_label_keys() {
        let m = calculate_metrics(&[2, 2], &[2, 2], "").unwrap();
        assert_eq!(m["accuracy"], 1.0);
        assert_eq!(m["f1_class_2"], 1.0);
    }

    #[test]
    fn test_summary_lines() {
        let m = calculate_metrics(&[0, 1], &[0, 1], "test").unwrap();
        let text = format_metrics_summary(&m);
        assert!(text.contains("test_accuracy"));
        assert!(text.contains("1.0000"));
    }
}
