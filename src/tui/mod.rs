//! Ratatui-based trial viewer.
//!
//! One stacked panel per trial showing `T_I`, `T_S` and the fitted ber curve.
//! `↑/↓` selects a trial, `Enter` toggles a full-screen view of it, `q`/`Esc` quits.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::domain::{FitResult, Trial};
use crate::error::AppError;
use crate::models::BerModel;

mod plotters_chart;

use plotters_chart::TrialChart;

const CURVE_POINTS: usize = 200;

/// One trial to display, with its fit if there is one.
#[derive(Debug, Clone)]
pub struct TrialPanel {
    pub trial: Trial,
    pub fit: Option<FitResult>,
}

/// Series and bounds for one panel.
#[derive(Debug, Clone, PartialEq)]
struct PanelData {
    fit: Vec<(f64, f64)>,
    internal: Vec<(f64, f64)>,
    surface: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Start the viewer.
pub fn run(panels: Vec<TrialPanel>) -> Result<(), AppError> {
    if panels.is_empty() {
        return Err(AppError::input("Nothing to display: no fitted trials."));
    }
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::input(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(panels);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::input(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::input(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    panels: Vec<TrialPanel>,
    data: Vec<PanelData>,
    selected: usize,
    zoomed: bool,
}

impl App {
    fn new(panels: Vec<TrialPanel>) -> Self {
        let data = panels.iter().map(|p| panel_data(&p.trial, p.fit.as_ref())).collect();
        Self {
            panels,
            data,
            selected: 0,
            zoomed: false,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::input(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::input(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::input(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the viewer should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(self.panels.len().saturating_sub(1)),
            KeyCode::Enter => self.zoomed = !self.zoomed,
            _ => {}
        }
        false
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        if self.zoomed {
            self.draw_panel(frame, chunks[0], self.selected);
        } else {
            let n = self.panels.len() as u32;
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints((0..n).map(|_| Constraint::Ratio(1, n)))
                .split(chunks[0]);
            for (i, area) in rows.iter().enumerate() {
                self.draw_panel(frame, *area, i);
            }
        }
        self.draw_footer(frame, chunks[1]);
    }

    fn draw_panel(&self, frame: &mut ratatui::Frame<'_>, area: Rect, index: usize) {
        let panel = &self.panels[index];
        let border = if index == self.selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .title(panel_title(panel))
            .borders(Borders::ALL)
            .border_style(border);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let data = &self.data[index];
        frame.render_widget(
            TrialChart {
                fit: &data.fit,
                internal: &data.internal,
                surface: &data.surface,
                x_bounds: data.x_bounds,
                y_bounds: data.y_bounds,
            },
            inner,
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let line = Line::from(vec![
            Span::styled("T_I", Style::default().fg(Color::Rgb(255, 200, 0))),
            Span::raw("  "),
            Span::styled("T_S", Style::default().fg(Color::Rgb(255, 80, 80))),
            Span::raw("  "),
            Span::styled("ber fit", Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::styled("↑/↓ select  Enter zoom  q quit", Style::default().fg(Color::Gray)),
        ]);
        frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
    }
}

fn panel_title(panel: &TrialPanel) -> String {
    match &panel.fit {
        Some(fit) => format!(
            " {} | A={:.4} f={:.4e} offset={:.3} | rmse={:.4} ",
            panel.trial.label, fit.params.amplitude, fit.params.frequency, fit.params.offset, fit.quality.rmse
        ),
        None => format!(" {} | not fitted ", panel.trial.label),
    }
}

fn panel_data(trial: &Trial, fit: Option<&FitResult>) -> PanelData {
    let internal: Vec<(f64, f64)> = trial.t.iter().copied().zip(trial.t_internal.iter().copied()).collect();
    let surface: Vec<(f64, f64)> = trial.t.iter().copied().zip(trial.t_surface.iter().copied()).collect();
    let (x0, x1) = trial.time_range().unwrap_or((0.0, 1.0));
    let fit_curve = fit
        .map(|f| BerModel::sample_curve(&f.params, x0, x1, CURVE_POINTS))
        .unwrap_or_default();

    let (mut y0, mut y1) = trial.temperature_range().unwrap_or((0.0, 1.0));
    for &(_, y) in fit_curve.iter().filter(|(_, y)| y.is_finite()) {
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    let pad = ((y1 - y0) * 0.05).max(1e-9);

    PanelData {
        fit: fit_curve,
        internal,
        surface,
        x_bounds: [x0, x1],
        y_bounds: [y0 - pad, y1 + pad],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParameters, FitQuality};
    use nalgebra::Matrix3;

    fn trial(label: &str) -> Trial {
        Trial::new(label, vec![0.0, 1.0, 2.0], vec![20.0, 22.0, 25.0], vec![20.0, 80.0, 2.0]).unwrap()
    }

    fn fit(params: FitParameters) -> FitResult {
        FitResult {
            params,
            covariance: Matrix3::zeros(),
            std_errors: [0.0; 3],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                n: 3,
                evaluations: 1,
            },
            termination: "test".to_string(),
        }
    }

    #[test]
    fn bounds_cover_samples_and_fit() {
        // ber(0) = 1 so the curve starts at 1 + 100, above every sample
        let data = panel_data(&trial("a"), Some(&fit(FitParameters::new(1.0, 1.0, 100.0))));
        assert_eq!(data.x_bounds, [0.0, 2.0]);
        assert!(data.y_bounds[0] < 2.0);
        assert!(data.y_bounds[1] > 101.0);
        assert_eq!(data.fit.len(), CURVE_POINTS);
        assert_eq!(data.internal[2], (2.0, 25.0));
    }

    #[test]
    fn unfitted_panel_has_no_curve() {
        let data = panel_data(&trial("a"), None);
        assert!(data.fit.is_empty());
        assert_eq!(data.surface.len(), 3);
    }

    #[test]
    fn keys_select_zoom_and_quit() {
        let panels = vec![
            TrialPanel { trial: trial("a"), fit: None },
            TrialPanel { trial: trial("b"), fit: None },
        ];
        let mut app = App::new(panels);
        assert!(!app.handle_key(KeyCode::Down));
        assert!(!app.handle_key(KeyCode::Down));
        assert_eq!(app.selected, 1);
        assert!(!app.handle_key(KeyCode::Up));
        assert_eq!(app.selected, 0);
        assert!(!app.handle_key(KeyCode::Enter));
        assert!(app.zoomed);
        assert!(app.handle_key(KeyCode::Esc));
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
