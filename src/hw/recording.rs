//! In-memory peripherals that remember everything written to them.
//!
//! Each recorder hands out a cloneable probe sharing its state, so a test can box the recorder
//! into a controller and still inspect the grid, tones and lights afterwards.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{Annunciator, COLUMNS, Display, Glyph, Indicator, ROWS};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct Grid {
    cells: [[char; COLUMNS]; ROWS],
    col: usize,
    row: usize,
    history: Vec<String>,
}

impl Grid {
    fn put(&mut self, c: char) {
        if self.col < COLUMNS && self.row < ROWS {
            self.cells[self.row][self.col] = c;
        }
        self.col += 1;
    }

    fn rows(&self) -> [String; ROWS] {
        [
            self.cells[0].iter().collect(),
            self.cells[1].iter().collect(),
        ]
    }
}

/// Display that keeps a 16x2 character buffer.
#[derive(Debug, Clone)]
pub struct RecordingDisplay {
    grid: Arc<Mutex<Grid>>,
}

impl Default for RecordingDisplay {
    fn default() -> Self {
        Self {
            grid: Arc::new(Mutex::new(Grid {
                cells: [[' '; COLUMNS]; ROWS],
                col: 0,
                row: 0,
                history: Vec::new(),
            })),
        }
    }
}

impl RecordingDisplay {
    /// Fresh, blank display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of one row, trailing spaces included.
    pub fn row(&self, row: usize) -> String {
        lock(&self.grid).rows()[row.min(ROWS - 1)].clone()
    }

    /// Both rows joined with a newline, trimmed on the right.
    pub fn text(&self) -> String {
        let rows = lock(&self.grid).rows();
        format!("{}\n{}", rows[0].trim_end(), rows[1].trim_end())
    }

    /// Whether any frame presented so far contained `needle`.
    pub fn ever_showed(&self, needle: &str) -> bool {
        let grid = lock(&self.grid);
        grid.history.iter().any(|frame| frame.contains(needle))
            || grid.rows().iter().any(|row| row.contains(needle))
    }
}

impl Display for RecordingDisplay {
    fn clear(&mut self) {
        let mut grid = lock(&self.grid);
        grid.cells = [[' '; COLUMNS]; ROWS];
        grid.col = 0;
        grid.row = 0;
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        let mut grid = lock(&self.grid);
        grid.col = usize::from(col);
        grid.row = usize::from(row);
    }

    fn print(&mut self, text: &str) {
        let mut grid = lock(&self.grid);
        for c in text.chars() {
            grid.put(c);
        }
    }

    fn write_glyph(&mut self, glyph: Glyph) {
        lock(&self.grid).put(glyph.as_char());
    }

    fn refresh(&mut self) {
        let mut grid = lock(&self.grid);
        let [top, bottom] = grid.rows();
        let frame = format!("{top}\n{bottom}");
        if grid.history.last() != Some(&frame) {
            grid.history.push(frame);
        }
    }
}

/// One tone request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneRecord {
    /// Requested frequency.
    pub frequency_hz: u32,
    /// Requested duration.
    pub duration_ms: u32,
}

#[derive(Debug, Default)]
struct Outputs {
    tones: Vec<ToneRecord>,
    indicators: HashMap<Indicator, bool>,
    indicator_switches: HashMap<Indicator, usize>,
    actuator: Vec<bool>,
}

/// Annunciator that logs tones and tracks light/actuator state.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnnunciator {
    outputs: Arc<Mutex<Outputs>>,
}

impl RecordingAnnunciator {
    /// Fresh recorder with every output off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tone requested so far.
    pub fn tones(&self) -> Vec<ToneRecord> {
        lock(&self.outputs).tones.clone()
    }

    /// Current state of one indicator.
    pub fn indicator(&self, indicator: Indicator) -> bool {
        lock(&self.outputs)
            .indicators
            .get(&indicator)
            .copied()
            .unwrap_or(false)
    }

    /// How many times an indicator was switched on.
    pub fn switched_on(&self, indicator: Indicator) -> usize {
        lock(&self.outputs)
            .indicator_switches
            .get(&indicator)
            .copied()
            .unwrap_or(0)
    }

    /// Actuator commands in order.
    pub fn actuator_history(&self) -> Vec<bool> {
        lock(&self.outputs).actuator.clone()
    }

    /// Forget recorded tones, keeping light state.
    pub fn clear_tones(&self) {
        lock(&self.outputs).tones.clear();
    }
}

impl Annunciator for RecordingAnnunciator {
    fn emit_tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        lock(&self.outputs).tones.push(ToneRecord {
            frequency_hz,
            duration_ms,
        });
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        let mut outputs = lock(&self.outputs);
        let was_on = outputs.indicators.insert(indicator, on).unwrap_or(false);
        if on && !was_on {
            *outputs.indicator_switches.entry(indicator).or_default() += 1;
        }
    }

    fn set_actuator(&mut self, on: bool) {
        lock(&self.outputs).actuator.push(on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::Panel;

    #[test]
    fn panel_lines_are_padded_and_clipped() {
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let probe = display.clone();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        panel.line(0, "A VERY LONG LINE THAT OVERFLOWS");
        panel.centered(1, "MID");
        assert_eq!(probe.row(0), "A VERY LONG LINE");
        assert_eq!(probe.row(1), "      MID       ");

        panel.line(0, "SHORT");
        assert_eq!(probe.row(0).trim_end(), "SHORT");
    }

    #[test]
    fn muted_panel_drops_tones_but_keeps_lights() {
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let probe = annunciator.clone();
        let mut panel = Panel::new(&mut display, &mut annunciator, false);

        panel.tone(700, 50);
        panel.indicator(Indicator::Red, true);
        assert!(probe.tones().is_empty());
        assert!(probe.indicator(Indicator::Red));

        panel.silence();
        assert!(!probe.indicator(Indicator::Red));
        assert_eq!(probe.switched_on(Indicator::Red), 1);
    }
}
