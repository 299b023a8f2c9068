//! Plotters-powered monthly payments chart widget for Ratatui.
//!
//! Plotters output is drawn into the Ratatui buffer through
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; all series and bounds are computed by the caller.
///
/// X values are month indices, Y values are amounts in the base currency.
pub struct BagPlottersChart<'a> {
    /// The bag's own monthly payments.
    pub baseline: &'a [(f64, f64)],
    /// Baseline plus the simulated purchases, if any amount is set.
    pub forecast: Option<&'a [(f64, f64)]>,
    /// Baseline monthly average.
    pub average: Option<f64>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: String,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for BagPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(&self.y_label)
                .x_labels(6)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let baseline_color = RGBColor(0, 255, 255); // cyan
            let forecast_color = RGBColor(255, 255, 0); // yellow
            let average_color = RGBColor(128, 128, 128);

            if let Some(avg) = self.average {
                chart.draw_series(LineSeries::new([(x0, avg), (x1, avg)], &average_color))?;
            }

            if let Some(forecast) = self.forecast {
                chart.draw_series(LineSeries::new(forecast.iter().copied(), &forecast_color))?;
            }

            chart.draw_series(LineSeries::new(self.baseline.iter().copied(), &baseline_color))?;
            // `Circle` radii come out huge through this backend; a pixel marks each month.
            chart.draw_series(self.baseline.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
