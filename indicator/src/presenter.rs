//! Presentation collaborators
//!
//! A presenter receives one [`Indication`] per render tick together with the
//! ordered band labels and is responsible for everything visual.

use owo_colors::OwoColorize;
use std::io::{self, Write};
use tracing::{debug, info};

/// Result of one render tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indication {
    pub band_index: usize,
    pub saturated: bool,
    /// Clamped friction value the band was derived from
    pub primary: f64,
}

pub trait Presenter: Send {
    fn present(&mut self, indication: Indication, labels: &[String]) -> io::Result<()>;

    /// Called once when the render loop stops
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn present(&mut self, indication: Indication, labels: &[String]) -> io::Result<()> {
        (**self).present(indication, labels)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Band column on a terminal, highest band on top
///
/// The active band is red, or green while the saturation flag is raised;
/// inactive bands are cyan.
pub struct TerminalPresenter<W: Write + Send> {
    out: W,
    color: bool,
    clear: bool,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color, true)
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W, color: bool, clear: bool) -> Self {
        Self { out, color, clear }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, line: String, active: bool, saturated: bool) -> String {
        if !self.color {
            return line;
        }
        match (active, saturated) {
            (true, true) => line.green().bold().to_string(),
            (true, false) => line.red().bold().to_string(),
            (false, _) => line.cyan().to_string(),
        }
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn present(&mut self, indication: Indication, labels: &[String]) -> io::Result<()> {
        let mut frame = String::new();
        if self.clear {
            frame.push_str(CLEAR_SCREEN);
        }

        for (index, label) in labels.iter().enumerate().rev() {
            let active = index == indication.band_index;
            let marker = if active { "[x]" } else { "[ ]" };
            let line = self.paint(format!("{marker} {label}"), active, indication.saturated);
            frame.push_str(&line);
            frame.push('\n');
        }

        frame.push_str(&format!("mu = {:.2}", indication.primary));
        if indication.saturated {
            frame.push_str("  (saturated)");
        }
        frame.push('\n');

        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Headless presenter: logs changes at info and every tick at debug
#[derive(Debug, Default)]
pub struct LogPresenter {
    last: Option<(usize, bool)>,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, indication: Indication, labels: &[String]) -> io::Result<()> {
        let label = labels
            .get(indication.band_index)
            .map(String::as_str)
            .unwrap_or("?");
        let current = (indication.band_index, indication.saturated);

        if self.last != Some(current) {
            info!(
                band = indication.band_index,
                label = %label,
                saturated = indication.saturated,
                mu = indication.primary,
                "Friction band changed"
            );
            self.last = Some(current);
        } else {
            debug!(
                band = indication.band_index,
                saturated = indication.saturated,
                mu = indication.primary,
                "Friction band unchanged"
            );
        }
        Ok(())
    }
}
