//! Collaborator contracts for the physical box: character display, tone/indicator outputs and
//! the keypad/hold inputs.
//!
//! The core only talks to these traits. `terminal` drives them from a console for the binary and
//! `recording` captures everything in memory for tests.

pub mod input;
pub mod recording;
pub mod terminal;

/// Number of character columns on the display.
pub const COLUMNS: usize = 16;
/// Number of character rows on the display.
pub const ROWS: usize = 2;

/// Custom glyphs preloaded into the display's character generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// One fifth of a cell filled (leftmost pixel column).
    Bar1,
    /// Two fifths of a cell filled.
    Bar2,
    /// Three fifths of a cell filled.
    Bar3,
    /// Four fifths of a cell filled.
    Bar4,
    /// Whole cell filled.
    Bar5,
    /// Arrow pointing up, used by menus.
    UpArrow,
    /// Arrow pointing down, used by menus.
    DownArrow,
}

impl Glyph {
    /// Bar glyph for `fifths` filled pixel columns, `None` for an empty cell.
    pub fn bar(fifths: u8) -> Option<Glyph> {
        match fifths {
            0 => None,
            1 => Some(Glyph::Bar1),
            2 => Some(Glyph::Bar2),
            3 => Some(Glyph::Bar3),
            4 => Some(Glyph::Bar4),
            _ => Some(Glyph::Bar5),
        }
    }

    /// Closest printable character, used by text-only displays.
    pub fn as_char(self) -> char {
        match self {
            Glyph::Bar1 => '▏',
            Glyph::Bar2 => '▎',
            Glyph::Bar3 => '▍',
            Glyph::Bar4 => '▋',
            Glyph::Bar5 => '█',
            Glyph::UpArrow => '↑',
            Glyph::DownArrow => '↓',
        }
    }
}

/// The three indicator lights on the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Red light: armed device, team B.
    Red,
    /// Green light: preparing device, team A.
    Green,
    /// Status light: neutralize actions.
    Status,
}

impl Indicator {
    /// Every indicator, in wiring order.
    pub const ALL: [Indicator; 3] = [Indicator::Red, Indicator::Green, Indicator::Status];
}

/// Character grid display.
pub trait Display {
    /// Blank the whole grid and home the cursor.
    fn clear(&mut self);
    /// Move the cursor; out-of-range positions are clamped by the implementation.
    fn set_cursor(&mut self, col: u8, row: u8);
    /// Print text at the cursor, advancing it.
    fn print(&mut self, text: &str);
    /// Write one custom glyph at the cursor, advancing it.
    fn write_glyph(&mut self, glyph: Glyph);
    /// Present the current frame. Hardware displays are always live, so the default is a no-op.
    fn refresh(&mut self) {}
}

/// Buzzer, indicator lights and external actuator.
pub trait Annunciator {
    /// Start a tone; fire-and-forget, a newer tone may cut an older one short.
    fn emit_tone(&mut self, frequency_hz: u32, duration_ms: u32);
    /// Switch one indicator light.
    fn set_indicator(&mut self, indicator: Indicator, on: bool);
    /// Switch the external actuator (relay).
    fn set_actuator(&mut self, on: bool);
}

/// Borrowed view over the output peripherals for the duration of one operation.
///
/// Applies the audio-enabled setting so callers never check it themselves.
pub struct Panel<'a> {
    display: &'a mut dyn Display,
    annunciator: &'a mut dyn Annunciator,
    sound_enabled: bool,
}

impl<'a> Panel<'a> {
    /// Wrap the peripherals.
    pub fn new(
        display: &'a mut dyn Display,
        annunciator: &'a mut dyn Annunciator,
        sound_enabled: bool,
    ) -> Self {
        Self {
            display,
            annunciator,
            sound_enabled,
        }
    }

    /// Whether tones are emitted at all.
    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    /// Blank the display.
    pub fn clear(&mut self) {
        self.display.clear();
    }

    /// Overwrite a whole row, padding with spaces so no stale characters survive.
    pub fn line(&mut self, row: u8, text: &str) {
        let padded: String = text
            .chars()
            .chain(std::iter::repeat(' '))
            .take(COLUMNS)
            .collect();
        self.display.set_cursor(0, row);
        self.display.print(&padded);
    }

    /// Overwrite a whole row with `text` centered.
    pub fn centered(&mut self, row: u8, text: &str) {
        let len = text.chars().count().min(COLUMNS);
        let indent = (COLUMNS - len) / 2;
        self.line(row, &format!("{:indent$}{text}", ""));
    }

    /// Write a row made of optional glyphs; `None` cells are blanked.
    pub fn glyph_row(&mut self, row: u8, cells: &[Option<Glyph>]) {
        self.display.set_cursor(0, row);
        for cell in cells.iter().take(COLUMNS) {
            match cell {
                Some(glyph) => self.display.write_glyph(*glyph),
                None => self.display.print(" "),
            }
        }
        let written = cells.len().min(COLUMNS);
        if written < COLUMNS {
            self.display.print(&" ".repeat(COLUMNS - written));
        }
    }

    /// Write a single glyph at a position.
    pub fn glyph_at(&mut self, col: u8, row: u8, glyph: Glyph) {
        self.display.set_cursor(col, row);
        self.display.write_glyph(glyph);
    }

    /// Present the frame on displays that buffer.
    pub fn refresh(&mut self) {
        self.display.refresh();
    }

    /// Emit a tone unless audio is disabled.
    pub fn tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        if self.sound_enabled {
            self.annunciator.emit_tone(frequency_hz, duration_ms);
        }
    }

    /// Switch one indicator.
    pub fn indicator(&mut self, indicator: Indicator, on: bool) {
        self.annunciator.set_indicator(indicator, on);
    }

    /// Switch every indicator off.
    pub fn silence(&mut self) {
        for indicator in Indicator::ALL {
            self.annunciator.set_indicator(indicator, false);
        }
    }

    /// Switch the external actuator.
    pub fn actuator(&mut self, on: bool) {
        self.annunciator.set_actuator(on);
    }
}
