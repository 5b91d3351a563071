//! Plotters-powered trial chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; series and bounds are computed outside `render`.
pub struct TrialChart<'a> {
    /// Fitted ber curve (empty when the trial has no fit).
    pub fit: &'a [(f64, f64)],
    /// Internal temperature `T_I`.
    pub internal: &'a [(f64, f64)],
    /// Surface temperature `T_S`.
    pub surface: &'a [(f64, f64)],
    /// Time bounds (s).
    pub x_bounds: [f64; 2],
    /// Temperature bounds (°C).
    pub y_bounds: [f64; 2],
}

impl Widget for TrialChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Panel too small (resize or press Enter to zoom).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc("t (s)")
                .y_desc("T (C)")
                .x_labels(5)
                .y_labels(4)
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            let internal_color = RGBColor(255, 200, 0);
            let surface_color = RGBColor(255, 80, 80);
            let fit_color = RGBColor(0, 255, 255);

            chart.draw_series(LineSeries::new(self.internal.iter().copied(), &internal_color))?;
            chart.draw_series(LineSeries::new(self.surface.iter().copied(), &surface_color))?;
            // A diverging model value would wreck the line; skip non-finite samples.
            chart.draw_series(LineSeries::new(
                self.fit.iter().copied().filter(|(x, y)| x.is_finite() && y.is_finite()),
                &fit_color,
            ))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
