//! Plotters-powered feature-importance chart widget for Ratatui.
//!
//! Horizontal bars, one per feature, drawn bottom-up in the order given (the
//! caller passes them ascending, so the most important feature ends on top).
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; all values are computed outside `render`.
pub struct ImportancePlottersChart<'a> {
    /// `(feature, importance)` pairs, bottom bar first.
    pub bars: &'a [(&'a str, f64)],
    /// Bar highlighted in a second color (usually the top feature).
    pub highlight: Option<usize>,
}

impl<'a> Widget for ImportancePlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area; show a hint instead.
        if area.width < 24 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }
        if self.bars.is_empty() {
            return;
        }

        let n = self.bars.len() as f64;
        let max = self
            .bars
            .iter()
            .map(|(_, v)| *v)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        // Leave room right of the longest bar for its label.
        let x_max = if max > 0.0 { max * 1.9 } else { 1.0 };

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(0.0..x_max, 0.0..n)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .disable_y_axis()
                .x_labels(4)
                .x_label_formatter(&|v| format!("{v:.2}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            let bar_color = RGBColor(0, 255, 255); // cyan
            let top_color = RGBColor(255, 215, 0); // gold

            chart.draw_series(self.bars.iter().enumerate().map(|(i, &(_, v))| {
                let y = i as f64;
                let color = if Some(i) == self.highlight { top_color } else { bar_color };
                Rectangle::new([(0.0, y + 0.2), (v.max(0.0), y + 0.8)], color.filled())
            }))?;

            chart.draw_series(self.bars.iter().enumerate().map(|(i, &(name, v))| {
                Text::new(
                    format!("{name} {v:.3}"),
                    (v.max(0.0) + x_max * 0.02, i as f64 + 0.5),
                    ("sans-serif", 10).into_font().color(&WHITE),
                )
            }))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn draws_bars_into_the_buffer() {
        let bars = [("loan_grade", 0.1), ("person_income", 0.3), ("loan_int_rate", 0.6)];
        let area = Rect::new(0, 0, 60, 14);
        let mut buf = Buffer::empty(area);
        ImportancePlottersChart {
            bars: &bars,
            highlight: Some(2),
        }
        .render(area, &mut buf);
        assert!(rendered_text(&buf).chars().any(|c| !c.is_whitespace()));
    }

    #[test]
    fn tiny_area_shows_a_hint() {
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        ImportancePlottersChart {
            bars: &[("person_age", 1.0)],
            highlight: None,
        }
        .render(area, &mut buf);
        assert!(rendered_text(&buf).starts_with("Chart area too small"));
    }
}
