//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the scoring/training code stays clean and testable
//! - output changes are localized (important for golden tests)

use std::path::Path;

use crate::app::pipeline::ScoreOutcome;
use crate::domain::{ApplicantRecord, FEATURE_LABELS, RiskLabel};
use crate::fit::TrainingReport;
use crate::io::UpdateSummary;
use crate::plot::{Bar, render_bar_chart};
use crate::report::DashboardSummary;

/// Verdict block printed by `risk score`.
pub fn format_score(outcome: &ScoreOutcome, saved_to: Option<&Path>) -> String {
    let mut out = String::new();
    let p = &outcome.prediction;

    out.push_str("=== risk - applicant verdict ===\n");
    for (label, value) in FEATURE_LABELS.iter().zip(outcome.vector.iter()) {
        out.push_str(&format!("{label:<22} {}\n", fmt_num(*value)));
    }
    out.push_str(&format!(
        "{:<22} {} / {}\n",
        "(grade / home)", outcome.input.loan_grade, outcome.input.home_ownership
    ));
    out.push('\n');

    let marker = match p.label {
        RiskLabel::High => "!!",
        RiskLabel::Low => "ok",
    };
    out.push_str(&format!(
        "[{marker}] {}  (loan_status={}, p(default)={:.4})\n",
        p.label, p.loan_status, p.probability
    ));

    match saved_to {
        Some(path) => out.push_str(&format!("Saved to {}\n", path.display())),
        None => out.push_str("Not saved (--no-save)\n"),
    }
    out
}

/// Summary printed after `risk train`.
pub fn format_training_report(report: &TrainingReport, model_path: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== risk - training ===\n");
    out.push_str(&format!(
        "Rows: total={} | labeled={} | skipped={}\n",
        report.rows_total, report.rows_labeled, report.rows_skipped
    ));
    out.push_str(&format!(
        "Classes: current={} | default={}\n",
        report.class_counts[0], report.class_counts[1]
    ));
    out.push_str(&format!("Split: train={} | test={}\n", report.n_train, report.n_test));
    let f = &report.forest;
    out.push_str(&format!(
        "Forest: {} trees | {} nodes | {} leaves | max depth {} | max_features {}\n",
        f.n_trees, f.n_nodes, f.n_leaves, f.max_depth, f.max_features
    ));

    match &report.metrics {
        Some(m) => {
            out.push_str(&format!("\nModel accuracy: {:.4}\n", m.accuracy));
            out.push_str(&format!(
                "Precision: {} | Recall: {} | F1: {}\n",
                fmt_opt(m.precision),
                fmt_opt(m.recall),
                fmt_opt(m.f1)
            ));
            let c = &m.confusion;
            out.push_str("Confusion matrix (rows = actual, cols = predicted):\n");
            out.push_str(&format!("{:>10} {:>8} {:>8}\n", "", "0", "1"));
            out.push_str(&format!("{:>10} {:>8} {:>8}\n", "0", c.true_negative, c.false_positive));
            out.push_str(&format!("{:>10} {:>8} {:>8}\n", "1", c.false_negative, c.true_positive));
        }
        None => out.push_str("\nNo held-out rows; accuracy not computed.\n"),
    }

    out.push_str("\nFeature importance:\n");
    let mut ranked = report.importances.clone();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for fi in &ranked {
        out.push_str(&format!("  {:<24} {:.4}\n", fi.feature, fi.importance));
    }

    out.push_str(&format!("\nModel written to {}\n", model_path.display()));
    out
}

/// The three dashboard charts as text.
pub fn format_dashboard(summary: &DashboardSummary, width: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Dataset: {} | rows={} | parsed={} | unparseable={}\n",
        summary.dataset, summary.total_rows, summary.parsed_rows, summary.row_errors
    ));
    if let Some(m) = &summary.model {
        out.push_str(&format!(
            "Model: {} trees | trained {} on {} rows | accuracy {}\n",
            m.n_trees,
            m.trained_at.format("%Y-%m-%d %H:%M UTC"),
            m.n_train,
            fmt_opt(m.accuracy)
        ));
    }
    out.push('\n');

    let c = &summary.classes;
    let mut class_bars = vec![
        Bar::new("0 current", c.current as f64, c.current.to_string()),
        Bar::new("1 default", c.default as f64, c.default.to_string()),
    ];
    if c.unscored > 0 {
        class_bars.push(Bar::new("unscored", c.unscored as f64, c.unscored.to_string()));
    }
    out.push_str(&render_bar_chart("Loan status distribution", &class_bars, width));
    out.push('\n');

    let l = &summary.labels;
    let label_bars: Vec<Bar> = [RiskLabel::Low, RiskLabel::High]
        .into_iter()
        .map(|label| {
            let n = match label {
                RiskLabel::Low => l.low,
                RiskLabel::High => l.high,
            };
            Bar::new(label.as_str(), n as f64, format!("{n} ({:.1}%)", l.percent(label)))
        })
        .collect();
    let label_title = if l.unlabeled > 0 {
        format!("Risk label distribution ({} rows unlabeled)", l.unlabeled)
    } else {
        "Risk label distribution".to_string()
    };
    out.push_str(&render_bar_chart(&label_title, &label_bars, width));
    out.push('\n');

    if summary.importances.is_empty() {
        out.push_str("Feature importance\n  (no model loaded)\n");
    } else {
        let bars: Vec<Bar> = summary
            .importances
            .iter()
            .map(|fi| Bar::new(fi.feature, fi.importance, format!("{:.4}", fi.importance)))
            .collect();
        out.push_str(&render_bar_chart("Feature importance (ascending)", &bars, width));
    }

    out
}

/// Table of recent dataset rows.
pub fn format_recent(records: &[&ApplicantRecord]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:>10} {:>9} {:>6} {:<5} {:<9} {:>6} {:<10} {:>7} {:<9}\n",
            "age", "income", "loan", "rate", "grade", "home", "status", "label", "p", "source"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:->4} {:->10} {:->9} {:->6} {:-<5} {:-<9} {:->6} {:-<10} {:->7} {:-<9}\n",
            "", "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in records {
        out.push_str(
            format!(
                "{:>4} {:>10} {:>9} {:>6} {:<5} {:<9} {:>6} {:<10} {:>7} {:<9}\n",
                r.age,
                fmt_num(r.annual_income),
                fmt_num(r.loan_amount),
                format!("{:.2}", r.interest_rate),
                r.loan_grade.letter(),
                r.home_ownership.label(),
                r.loan_status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                truncate(r.risk_label.map(|l| l.as_str()).unwrap_or("-"), 10),
                r.risk_probability.map(|p| format!("{p:.4}")).unwrap_or_else(|| "-".to_string()),
                r.source.as_str(),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub fn format_rescore(summary: &UpdateSummary, dataset: &Path) -> String {
    format!(
        "Rescored {} rows in {} ({} missing loan_status filled with predictions)\n",
        summary.rows_updated,
        dataset.display(),
        summary.status_filled
    )
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "n/a".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
