//! Console stand-ins for the box hardware, used by the binary.
//!
//! The display is drawn to stdout as a framed 16x2 grid. Stdin lines are keypad presses
//! (`0`-`9`, `a`-`d`, `*`, `#`) or hold toggles (`+k`/`-k` keypad device key, `+a`/`-a` team A,
//! `+b`/`-b` team B). Tones and the actuator are reported through tracing.

use std::{
    io::{self, Write},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

use super::{
    Annunciator, COLUMNS, Display, Glyph, Indicator, ROWS,
    input::{HoldInput, InputFeeder, Key},
};

const MIN_REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// Display that redraws the grid on stdout.
///
/// Frames are rate limited so the game loop does not flood the terminal; a frame following
/// `clear()` is always drawn so menu screens show up immediately.
pub struct TerminalDisplay {
    cells: [[char; COLUMNS]; ROWS],
    col: usize,
    row: usize,
    cleared: bool,
    last_frame: Option<String>,
    last_drawn_at: Option<Instant>,
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self {
            cells: [[' '; COLUMNS]; ROWS],
            col: 0,
            row: 0,
            cleared: false,
            last_frame: None,
            last_drawn_at: None,
        }
    }
}

impl TerminalDisplay {
    /// Blank terminal display.
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, c: char) {
        if self.col < COLUMNS && self.row < ROWS {
            self.cells[self.row][self.col] = c;
        }
        self.col += 1;
    }

    fn frame(&self) -> String {
        let border = "-".repeat(COLUMNS);
        let top: String = self.cells[0].iter().collect();
        let bottom: String = self.cells[1].iter().collect();
        format!("+{border}+\n|{top}|\n|{bottom}|\n+{border}+")
    }
}

impl Display for TerminalDisplay {
    fn clear(&mut self) {
        self.cells = [[' '; COLUMNS]; ROWS];
        self.col = 0;
        self.row = 0;
        self.cleared = true;
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.col = usize::from(col);
        self.row = usize::from(row);
    }

    fn print(&mut self, text: &str) {
        for c in text.chars() {
            self.put(c);
        }
    }

    fn write_glyph(&mut self, glyph: Glyph) {
        self.put(glyph.as_char());
    }

    fn refresh(&mut self) {
        let frame = self.frame();
        if self.last_frame.as_deref() == Some(frame.as_str()) {
            return;
        }
        let now = Instant::now();
        let due = self
            .last_drawn_at
            .is_none_or(|at| now.duration_since(at) >= MIN_REDRAW_INTERVAL);
        if !(due || self.cleared) {
            return;
        }

        let mut stdout = io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{frame}").and_then(|()| stdout.flush()) {
            warn!(error = %err, "failed to draw display frame");
        }
        self.last_frame = Some(frame);
        self.last_drawn_at = Some(now);
        self.cleared = false;
    }
}

/// Annunciator that reports outputs through tracing.
#[derive(Debug, Default)]
pub struct TerminalAnnunciator {
    indicators: [bool; 3],
}

impl TerminalAnnunciator {
    /// All outputs off.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Annunciator for TerminalAnnunciator {
    fn emit_tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        debug!(frequency_hz, duration_ms, "tone");
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        let slot = &mut self.indicators[indicator as usize];
        if *slot != on {
            *slot = on;
            debug!(?indicator, on, "indicator");
        }
    }

    fn set_actuator(&mut self, on: bool) {
        info!(on, "actuator");
    }
}

/// One parsed stdin line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCommand {
    /// A keypad press.
    Press(Key),
    /// A hold input changed state.
    Hold {
        /// Which input.
        input: HoldInput,
        /// New state.
        held: bool,
    },
}

/// Parse a stdin line into a command; blank or unknown lines yield `None`.
pub fn parse_command(line: &str) -> Option<TerminalCommand> {
    let line = line.trim();
    let mut chars = line.chars();
    let first = chars.next()?;
    let rest = chars.as_str();

    if let ('+' | '-', Some(target)) = (first, rest.chars().next()) {
        if rest.chars().count() != 1 {
            return None;
        }
        let input = match target.to_ascii_lowercase() {
            'k' => HoldInput::Keypad,
            'a' => HoldInput::TeamA,
            'b' => HoldInput::TeamB,
            _ => return None,
        };
        return Some(TerminalCommand::Hold {
            input,
            held: first == '+',
        });
    }

    if rest.is_empty() {
        Key::from_char(first).map(TerminalCommand::Press)
    } else {
        None
    }
}

/// Forward stdin lines to `feeder` until stdin closes. Dropping the feeder at the end closes the
/// controller's input.
pub fn spawn_stdin_reader(feeder: InputFeeder) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(TerminalCommand::Press(key)) => {
                        if !feeder.press(key) {
                            break;
                        }
                    }
                    Some(TerminalCommand::Hold { input, held }) => feeder.set_held(input, held),
                    None => {
                        if !line.trim().is_empty() {
                            warn!(%line, "unrecognised input line");
                        }
                    }
                },
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
        info!("stdin closed; releasing input device");
    })
}
