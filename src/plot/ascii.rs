//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! A figure is a vertical stack of panels, one per trial. Each panel draws:
//! - the fitted ber curve: `-` line
//! - internal temperature `T_I`: `o`
//! - surface temperature `T_S`: `s`

use crate::domain::{FitFile, FitResult, Trial};
use crate::models::BerModel;

/// How a series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    /// Connected with straight segments.
    Line,
    /// One glyph per sample.
    Points,
}

/// A named data series.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub glyph: char,
    pub style: SeriesStyle,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn line(label: impl Into<String>, glyph: char, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            glyph,
            style: SeriesStyle::Line,
            points,
        }
    }

    pub fn points(label: impl Into<String>, glyph: char, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            glyph,
            style: SeriesStyle::Points,
            points,
        }
    }
}

/// Series for one trial panel: fitted curve (if any), `T_I` and `T_S`.
pub fn trial_series(trial: &Trial, fit: Option<&FitResult>, curve_points: usize) -> Vec<Series> {
    let mut out = Vec::with_capacity(3);
    if let (Some(fit), Some((t0, t1))) = (fit, trial.time_range()) {
        out.push(Series::line(
            "ber fit",
            '-',
            BerModel::sample_curve(&fit.params, t0, t1, curve_points),
        ));
    }
    out.push(Series::points(
        "T_I",
        'o',
        trial.t.iter().copied().zip(trial.t_internal.iter().copied()).collect(),
    ));
    out.push(Series::points(
        "T_S",
        's',
        trial.t.iter().copied().zip(trial.t_surface.iter().copied()).collect(),
    ));
    out
}

/// Render one panel per `(trial, fit)` pair, stacked vertically.
pub fn render_figure(panels: &[(&Trial, Option<&FitResult>)], width: usize, height: usize) -> String {
    panels
        .iter()
        .map(|(trial, fit)| {
            let series = trial_series(trial, *fit, width.max(2));
            render_panel(&trial.label, &series, width, height)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a saved fit file (curve only, no samples).
pub fn render_fit_file(curve: &FitFile, width: usize, height: usize) -> String {
    let points = curve
        .grid
        .t
        .iter()
        .copied()
        .zip(curve.grid.y.iter().copied())
        .collect();
    render_panel(&curve.label, &[Series::line("ber fit", '-', points)], width, height)
}

/// Render a single panel with a title, the plot grid and a legend line.
pub fn render_panel(title: &str, series: &[Series], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = || series.iter().flat_map(|s| s.points.iter().copied());
    let (x_min, x_max) = axis_range(all().map(|(x, _)| x)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = axis_range(all().map(|(_, y)| y)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so sample glyphs overlay them.
    for s in series.iter().filter(|s| s.style == SeriesStyle::Line) {
        draw_curve(&mut grid, &s.points, x_min, x_max, y_min, y_max, s.glyph);
    }
    for s in series.iter().filter(|s| s.style == SeriesStyle::Points) {
        for &(x, y) in &s.points {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = s.glyph;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{title}: t=[{x_min:.3}, {x_max:.3}] | T=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    let legend: Vec<String> = series.iter().map(|s| format!("{} {}", s.glyph, s.label)).collect();
    out.push_str(&legend.join("  "));
    out.push('\n');
    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    glyph: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        // A non-finite model value breaks the line instead of pinning it to an edge.
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, glyph);
        } else if grid[row][col] == ' ' {
            grid[row][col] = glyph;
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
