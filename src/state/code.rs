//! Eight-symbol code capture and comparison.
//!
//! [`CodeEntry`] collects one symbol per position, either blocking on keys (untimed) or racing a
//! per-position deadline (timed). A non-digit key or a missed deadline records
//! [`CodeSymbol::Invalid`], which never matches a stored digit.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Duration, Instant};

use crate::hw::{Panel, input::Key};

/// Number of symbols in a code.
pub const CODE_LENGTH: usize = 8;
/// Character echoed for positions already entered.
const MASK: char = '*';
/// Column where the echoed code starts on the second row.
const ECHO_COL: usize = 4;

/// One captured position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSymbol {
    /// A digit key.
    Digit(u8),
    /// A non-digit key or a timed-out position.
    Invalid,
}

/// A complete code of [`CODE_LENGTH`] symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeBuffer([CodeSymbol; CODE_LENGTH]);

impl CodeBuffer {
    /// Wrap a full set of symbols.
    pub fn new(symbols: [CodeSymbol; CODE_LENGTH]) -> Self {
        Self(symbols)
    }

    /// The symbols in entry order.
    pub fn symbols(&self) -> &[CodeSymbol; CODE_LENGTH] {
        &self.0
    }

    /// Position-by-position equality; every position must match.
    pub fn matches(&self, other: &CodeBuffer) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(true, |equal, (a, b)| equal & (a == b))
    }

    /// Whether every position holds a digit.
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|s| matches!(s, CodeSymbol::Digit(_)))
    }
}

/// Error returned when a stored code is not eight digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a code is exactly 8 digits")]
pub struct InvalidCode;

/// The code that unlocks the objective device: eight digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoredCode(CodeBuffer);

impl StoredCode {
    /// Whether an entered buffer unlocks this code.
    pub fn accepts(&self, entered: &CodeBuffer) -> bool {
        self.0.matches(entered)
    }

    /// The code as a buffer.
    pub fn buffer(&self) -> &CodeBuffer {
        &self.0
    }
}

impl TryFrom<CodeBuffer> for StoredCode {
    type Error = InvalidCode;

    fn try_from(buffer: CodeBuffer) -> Result<Self, Self::Error> {
        if buffer.is_complete() {
            Ok(Self(buffer))
        } else {
            Err(InvalidCode)
        }
    }
}

impl FromStr for StoredCode {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<CodeSymbol> = s
            .chars()
            .map(|c| c.to_digit(10).map(|d| CodeSymbol::Digit(d as u8)))
            .collect::<Option<_>>()
            .ok_or(InvalidCode)?;
        let symbols: [CodeSymbol; CODE_LENGTH] = digits.try_into().map_err(|_| InvalidCode)?;
        Ok(Self(CodeBuffer(symbols)))
    }
}

impl TryFrom<String> for StoredCode {
    type Error = InvalidCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StoredCode> for String {
    fn from(code: StoredCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for StoredCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.0.symbols() {
            match symbol {
                CodeSymbol::Digit(d) => write!(f, "{d}")?,
                CodeSymbol::Invalid => write!(f, "?")?,
            }
        }
        Ok(())
    }
}

/// Progress of a capture after one step.
#[derive(Debug)]
pub enum EntryStep {
    /// More positions to fill; the entry is handed back.
    Pending(CodeEntry),
    /// All positions filled.
    Complete(CodeBuffer),
}

/// A code being typed.
#[derive(Debug, Clone)]
pub struct CodeEntry {
    symbols: Vec<CodeSymbol>,
    per_position: Option<Duration>,
    position_started: Instant,
    last_echo: Option<char>,
}

impl CodeEntry {
    /// Capture that waits indefinitely for each key.
    pub fn untimed(now: Instant) -> Self {
        Self {
            symbols: Vec::with_capacity(CODE_LENGTH),
            per_position: None,
            position_started: now,
            last_echo: None,
        }
    }

    /// Capture where each position gives up after `per_position`.
    pub fn timed(per_position: Duration, now: Instant) -> Self {
        Self {
            per_position: Some(per_position),
            ..Self::untimed(now)
        }
    }

    /// Positions filled so far.
    pub fn filled(&self) -> usize {
        self.symbols.len()
    }

    /// Draw the prompt and the echo row.
    pub fn render(&self, prompt: &str, panel: &mut Panel<'_>) {
        panel.centered(0, prompt);
        let mut echo: String = " ".repeat(ECHO_COL);
        let filled = self.symbols.len();
        for index in 0..filled {
            if index + 1 == filled {
                echo.push(self.last_echo.unwrap_or(MASK));
            } else {
                echo.push(MASK);
            }
        }
        echo.extend(std::iter::repeat_n('_', CODE_LENGTH - filled));
        panel.line(1, &echo);
    }

    /// Feed at most one key observed at `now`.
    pub fn step(mut self, now: Instant, key: Option<Key>) -> EntryStep {
        match key {
            Some(key) => {
                let symbol = key
                    .digit()
                    .map(CodeSymbol::Digit)
                    .unwrap_or(CodeSymbol::Invalid);
                self.push(symbol, Some(key.as_char()), now);
            }
            None => {
                if let Some(limit) = self.per_position {
                    if now.saturating_duration_since(self.position_started) >= limit {
                        self.push(CodeSymbol::Invalid, None, now);
                    }
                }
            }
        }

        if self.symbols.len() == CODE_LENGTH {
            let mut symbols = [CodeSymbol::Invalid; CODE_LENGTH];
            symbols.copy_from_slice(&self.symbols);
            EntryStep::Complete(CodeBuffer(symbols))
        } else {
            EntryStep::Pending(self)
        }
    }

    fn push(&mut self, symbol: CodeSymbol, echo: Option<char>, now: Instant) {
        self.symbols.push(symbol);
        self.last_echo = echo;
        self.position_started = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::recording::{RecordingAnnunciator, RecordingDisplay};

    fn buffer(code: &str) -> CodeBuffer {
        *code.parse::<StoredCode>().unwrap().buffer()
    }

    fn type_code(entry: CodeEntry, keys: &[Key], now: Instant) -> EntryStep {
        let mut step = EntryStep::Pending(entry);
        for key in keys {
            let EntryStep::Pending(entry) = step else {
                panic!("entry completed early");
            };
            step = entry.step(now, Some(*key));
        }
        step
    }

    fn digits(code: &str) -> Vec<Key> {
        code.chars().filter_map(Key::from_char).collect()
    }

    #[test]
    fn identical_codes_match() {
        let samples = ["00000000", "12345678", "99999999", "31415926"];
        for sample in samples {
            assert!(buffer(sample).matches(&buffer(sample)));
        }
        let with_invalid = CodeBuffer::new([CodeSymbol::Invalid; CODE_LENGTH]);
        assert!(with_invalid.matches(&with_invalid));
    }

    #[test]
    fn any_single_difference_fails() {
        let base = buffer("12345678");
        for position in 0..CODE_LENGTH {
            let mut symbols = *base.symbols();
            symbols[position] = match symbols[position] {
                CodeSymbol::Digit(d) => CodeSymbol::Digit((d + 1) % 10),
                CodeSymbol::Invalid => CodeSymbol::Digit(0),
            };
            assert!(!base.matches(&CodeBuffer::new(symbols)));

            let mut symbols = *base.symbols();
            symbols[position] = CodeSymbol::Invalid;
            assert!(!base.matches(&CodeBuffer::new(symbols)));
        }
    }

    #[test]
    fn stored_code_parsing() {
        assert!("1234567".parse::<StoredCode>().is_err());
        assert!("123456789".parse::<StoredCode>().is_err());
        assert!("1234a678".parse::<StoredCode>().is_err());
        let code: StoredCode = "00451200".parse().unwrap();
        assert_eq!(code.to_string(), "00451200");

        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"00451200\"");
        assert!(serde_json::from_str::<StoredCode>("\"12\"").is_err());
    }

    #[test]
    fn untimed_entry_collects_eight_keys() {
        let now = Instant::now();
        let step = type_code(CodeEntry::untimed(now), &digits("12345678"), now);
        let EntryStep::Complete(entered) = step else {
            panic!("expected a complete code");
        };
        let stored: StoredCode = "12345678".parse().unwrap();
        assert!(stored.accepts(&entered));

        // Untimed capture never gives up on its own.
        let EntryStep::Pending(entry) =
            CodeEntry::untimed(now).step(now + Duration::from_secs(3_600), None)
        else {
            panic!("untimed entry must wait");
        };
        assert_eq!(entry.filled(), 0);
    }

    #[test]
    fn non_digit_keys_are_recorded_as_invalid() {
        let now = Instant::now();
        let mut keys = digits("1234567");
        keys.push(Key::Star);
        let EntryStep::Complete(entered) = type_code(CodeEntry::untimed(now), &keys, now) else {
            panic!("expected a complete code");
        };
        assert_eq!(entered.symbols()[7], CodeSymbol::Invalid);
        assert!(!entered.is_complete());
    }

    #[test]
    fn timed_entry_skips_positions_on_deadline() {
        let start = Instant::now();
        let per_position = Duration::from_secs(2);
        let mut step = EntryStep::Pending(CodeEntry::timed(per_position, start));
        let mut now = start;

        for _ in 0..CODE_LENGTH {
            let EntryStep::Pending(entry) = step else {
                panic!("entry completed early");
            };
            let EntryStep::Pending(entry) = entry.step(now + Duration::from_millis(1_999), None)
            else {
                panic!("deadline fired early");
            };
            now += per_position;
            step = entry.step(now, None);
        }

        let EntryStep::Complete(entered) = step else {
            panic!("expected a complete code");
        };
        assert!(entered.symbols().iter().all(|s| *s == CodeSymbol::Invalid));
    }

    #[test]
    fn echo_masks_earlier_positions() {
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let screen = display.clone();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);
        let now = Instant::now();

        let EntryStep::Pending(entry) = type_code(CodeEntry::untimed(now), &digits("947"), now)
        else {
            panic!("entry completed early");
        };
        entry.render("ENTER CODE", &mut panel);
        assert_eq!(screen.row(0).trim(), "ENTER CODE");
        assert_eq!(screen.row(1).trim(), "**7_____");
    }
}
