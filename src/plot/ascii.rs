//! ASCII/Unicode bar charts for terminal output.
//!
//! This is intentionally "dumb" (fixed-width bars), optimized for:
//! - quick visual checks in a terminal or a piped log
//! - deterministic output (helpful for golden tests)

/// One horizontal bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    /// Text printed after the bar (count, percentage, ...).
    pub annotation: String,
}

impl Bar {
    pub fn new(label: impl Into<String>, value: f64, annotation: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value,
            annotation: annotation.into(),
        }
    }
}

const FULL: char = '█';
/// Eighth-block glyphs for the fractional tail of a bar.
const PARTIAL: [char; 8] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'];

/// Render `bars` scaled so the largest value spans `width` columns.
pub fn render_bar_chart(title: &str, bars: &[Bar], width: usize) -> String {
    let width = width.max(5);
    let label_w = bars.iter().map(|b| b.label.chars().count()).max().unwrap_or(0);
    let max = bars
        .iter()
        .map(|b| b.value)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    if bars.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    for b in bars {
        let bar = bar_glyphs(b.value, max, width);
        let pad = width - bar.chars().count();
        let line = format!(
            "{:<label_w$} │{bar}{} {}",
            b.label,
            " ".repeat(pad),
            b.annotation,
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn bar_glyphs(value: f64, max: f64, width: usize) -> String {
    if !(value.is_finite() && value > 0.0 && max > 0.0) {
        return String::new();
    }
    let eighths = ((value / max).min(1.0) * (width * 8) as f64).round() as usize;
    let mut s: String = std::iter::repeat_n(FULL, eighths / 8).collect();
    let rem = eighths % 8;
    if rem > 0 {
        s.push(PARTIAL[rem]);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_the_largest_value() {
        let bars = vec![Bar::new("current", 30.0, "30"), Bar::new("default", 15.0, "15")];
        let chart = render_bar_chart("Loan status", &bars, 10);
        let expected = "Loan status\n\
                        current │██████████ 30\n\
                        default │█████      15\n";
        assert_eq!(chart, expected);
    }

    #[test]
    fn fractional_tail_uses_eighth_blocks() {
        assert_eq!(bar_glyphs(1.0, 8.0, 1), "▏");
        assert_eq!(bar_glyphs(0.5, 1.0, 3), "█▌");
        assert_eq!(bar_glyphs(0.0, 1.0, 3), "");
        assert_eq!(bar_glyphs(f64::NAN, 1.0, 3), "");
    }

    #[test]
    fn empty_chart_says_so() {
        let chart = render_bar_chart("Empty", &[], 10);
        assert!(chart.contains("(no data)"));
    }
}
