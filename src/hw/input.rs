//! Keypad events and held-input flags crossing from the device driver into the session loop.
//!
//! Discrete key presses are queued on an mpsc channel. Held inputs are a single
//! [`HoldSnapshot`] published through a watch channel: the driver only writes it, the loop only
//! reads it, once per tick.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::ControllerError;

/// Keys of the 4x4 keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Numeric key `0`..=`9`.
    Digit(u8),
    /// `A`: previous / yes / restart.
    A,
    /// `B`: next / no / back to menu.
    B,
    /// `C`: cancel or erase.
    C,
    /// `D`: confirm, and the device key in the armed modes.
    D,
    /// `*`
    Star,
    /// `#`
    Hash,
}

impl Key {
    /// Map a keypad legend to a key (case-insensitive).
    pub fn from_char(c: char) -> Option<Key> {
        match c.to_ascii_lowercase() {
            '0'..='9' => c.to_digit(10).map(|d| Key::Digit(d as u8)),
            'a' => Some(Key::A),
            'b' => Some(Key::B),
            'c' => Some(Key::C),
            'd' => Some(Key::D),
            '*' => Some(Key::Star),
            '#' => Some(Key::Hash),
            _ => None,
        }
    }

    /// The legend printed on the key.
    pub fn as_char(self) -> char {
        match self {
            Key::Digit(d) => char::from(b'0' + d.min(9)),
            Key::A => 'A',
            Key::B => 'B',
            Key::C => 'C',
            Key::D => 'D',
            Key::Star => '*',
            Key::Hash => '#',
        }
    }

    /// Numeric value for digit keys.
    pub fn digit(self) -> Option<u8> {
        match self {
            Key::Digit(d) => Some(d),
            _ => None,
        }
    }
}

/// Inputs that report a continuous held/released state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldInput {
    /// The keypad device key (`D`) held down.
    Keypad,
    /// Team A's capture button.
    TeamA,
    /// Team B's capture button.
    TeamB,
}

/// Consistent view of every held input at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldSnapshot {
    keypad: bool,
    team_a: bool,
    team_b: bool,
}

impl HoldSnapshot {
    /// Whether `input` is currently held.
    pub fn is_held(&self, input: HoldInput) -> bool {
        match input {
            HoldInput::Keypad => self.keypad,
            HoldInput::TeamA => self.team_a,
            HoldInput::TeamB => self.team_b,
        }
    }

    /// Copy of this snapshot with `input` set to `held`.
    pub fn with(mut self, input: HoldInput, held: bool) -> Self {
        match input {
            HoldInput::Keypad => self.keypad = held,
            HoldInput::TeamA => self.team_a = held,
            HoldInput::TeamB => self.team_b = held,
        }
        self
    }
}

/// Create a connected feeder/handle pair.
pub fn channel() -> (InputFeeder, InputHandle) {
    let (keys_tx, keys_rx) = mpsc::unbounded_channel();
    let (holds_tx, holds_rx) = watch::channel(HoldSnapshot::default());
    (
        InputFeeder {
            keys: keys_tx,
            holds: Arc::new(holds_tx),
        },
        InputHandle {
            keys: keys_rx,
            holds: holds_rx,
        },
    )
}

/// Producer side, owned by whatever drives the physical inputs.
#[derive(Clone)]
pub struct InputFeeder {
    keys: mpsc::UnboundedSender<Key>,
    holds: Arc<watch::Sender<HoldSnapshot>>,
}

impl InputFeeder {
    /// Queue a key press. Returns `false` once the controller has gone away.
    pub fn press(&self, key: Key) -> bool {
        self.keys.send(key).is_ok()
    }

    /// Publish the held state of one input.
    pub fn set_held(&self, input: HoldInput, held: bool) {
        self.holds
            .send_modify(|snapshot| *snapshot = snapshot.with(input, held));
    }

    /// Shorthand for `set_held(input, true)`.
    pub fn hold(&self, input: HoldInput) {
        self.set_held(input, true);
    }

    /// Shorthand for `set_held(input, false)`.
    pub fn release(&self, input: HoldInput) {
        self.set_held(input, false);
    }
}

/// Consumer side, owned by the session loop.
pub struct InputHandle {
    keys: mpsc::UnboundedReceiver<Key>,
    holds: watch::Receiver<HoldSnapshot>,
}

impl InputHandle {
    /// Next queued key without waiting.
    pub fn poll_event(&mut self) -> Result<Option<Key>, ControllerError> {
        match self.keys.try_recv() {
            Ok(key) => Ok(Some(key)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(ControllerError::InputClosed),
        }
    }

    /// Wait for the next key press.
    pub async fn wait_event(&mut self) -> Result<Key, ControllerError> {
        self.keys.recv().await.ok_or(ControllerError::InputClosed)
    }

    /// Snapshot of the held inputs for this tick.
    pub fn holds(&self) -> HoldSnapshot {
        *self.holds.borrow()
    }

    /// Discard key presses queued before a new screen took over.
    pub fn drain(&mut self) {
        while self.keys.try_recv().is_ok() {}
    }
}
