//! Terminal spinner for grid searches.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::fit::SearchProgress;

/// Spinner frames; the trailing blank is shown once the search finishes.
pub const TICK_CHARS: &str = "/—\\| ";

/// Rotating spinner plus a position bar on stderr. Hidden automatically when
/// stderr is not a terminal.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(total: usize, label: &str) -> Self {
        Self::with_bar(ProgressBar::new(total.max(1) as u64), label)
    }

    fn with_bar(bar: ProgressBar, label: &str) -> Self {
        let style = ProgressStyle::with_template("{spinner} {msg} {bar:40.cyan/blue} {pos}/{len} | ETA {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars(TICK_CHARS);
        bar.set_style(style);
        bar.set_message(format!("grid search {label}"));
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { bar }
    }
}

impl SearchProgress for Spinner {
    fn on_point(&self, _done: usize, _total: usize) {
        // Workers may finish out of order.
        self.bar.inc(1);
    }

    fn on_finish(&self, _total: usize) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_frames_rotate_through_slash_dash_backslash_pipe() {
        let frames: Vec<char> = TICK_CHARS.chars().collect();
        assert_eq!(frames, vec!['/', '—', '\\', '|', ' ']);
    }

    #[test]
    fn spinner_counts_points_and_finishes() {
        let spinner = Spinner::with_bar(ProgressBar::hidden(), "trial2");
        spinner.bar.set_length(3);
        spinner.on_point(1, 3);
        spinner.on_point(2, 3);
        assert_eq!(spinner.bar.position(), 2);
        assert!(!spinner.bar.is_finished());
        spinner.on_finish(3);
        assert!(spinner.bar.is_finished());
    }
}
