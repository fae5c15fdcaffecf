pub mod clock;
pub mod code;
pub mod cues;
pub mod hold;
pub mod objective;
pub mod outcome;
pub mod zone;

use tokio::time::Instant;

use crate::{
    config::Settings,
    hw::{
        Indicator, Panel,
        input::{HoldInput, HoldSnapshot, Key},
    },
};

pub use self::objective::{ArmedObjective, ObjectivePhase, ObjectiveVariant};
pub use self::outcome::{Outcome, ZoneTotals};
pub use self::zone::{ZoneControl, ZoneState};

/// Entries of the mode selection menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    /// Arm the device once; defenders win by disarming it.
    SearchAndDestroy,
    /// Arm and disarm repeatedly until the game clock or the device runs out.
    Sabotage,
    /// Capture and hold a zone; the longest holder wins.
    Domination,
    /// Edit persistent settings.
    Configuration,
}

impl GameMode {
    /// Menu order.
    pub const ALL: [GameMode; 4] = [
        GameMode::SearchAndDestroy,
        GameMode::Sabotage,
        GameMode::Domination,
        GameMode::Configuration,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            GameMode::SearchAndDestroy => "SEARCH&DESTROY",
            GameMode::Sabotage => "SABOTAGE",
            GameMode::Domination => "DOMINATION",
            GameMode::Configuration => "CONFIGURATION",
        }
    }

    /// Whether the mode uses the objective device.
    pub fn uses_device(self) -> bool {
        matches!(self, GameMode::SearchAndDestroy | GameMode::Sabotage)
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    /// Next entry, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous entry, wrapping around.
    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// The two teams of the zone-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    /// Team A, green light.
    A,
    /// Team B, red light.
    B,
}

impl Team {
    /// Short name used on the display.
    pub fn label(self) -> &'static str {
        match self {
            Team::A => "TEAM A",
            Team::B => "TEAM B",
        }
    }

    /// The team's light.
    pub fn indicator(self) -> Indicator {
        match self {
            Team::A => Indicator::Green,
            Team::B => Indicator::Red,
        }
    }

    /// The team's capture button.
    pub fn input(self) -> HoldInput {
        match self {
            Team::A => HoldInput::TeamA,
            Team::B => HoldInput::TeamB,
        }
    }
}

/// Everything a mode machine sees in one loop iteration.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// The single monotonic time sample for this iteration.
    pub now: Instant,
    /// At most one key pressed since the previous iteration.
    pub key: Option<Key>,
    /// Held inputs as of this iteration.
    pub holds: HoldSnapshot,
}

/// Inputs that went from released to held between two snapshots.
pub(crate) fn newly_held(
    previous: HoldSnapshot,
    current: HoldSnapshot,
) -> impl Iterator<Item = HoldInput> {
    [HoldInput::Keypad, HoldInput::TeamA, HoldInput::TeamB]
        .into_iter()
        .filter(move |input| current.is_held(*input) && !previous.is_held(*input))
}

/// The machine running the current session.
#[derive(Debug)]
pub enum ActiveMode {
    /// Search & Destroy or Sabotage.
    Objective(ArmedObjective),
    /// Domination.
    Zone(ZoneControl),
}

impl ActiveMode {
    /// Start the machine for `mode` with its clock starting at `now`.
    ///
    /// Returns `None` for [`GameMode::Configuration`], which is not a game.
    pub fn start(mode: GameMode, settings: &Settings, now: Instant) -> Option<Self> {
        match mode {
            GameMode::SearchAndDestroy => Some(ActiveMode::Objective(ArmedObjective::new(
                ObjectiveVariant::SearchAndDestroy,
                settings,
                now,
            ))),
            GameMode::Sabotage => Some(ActiveMode::Objective(ArmedObjective::new(
                ObjectiveVariant::Sabotage,
                settings,
                now,
            ))),
            GameMode::Domination => Some(ActiveMode::Zone(ZoneControl::new(settings, now))),
            GameMode::Configuration => None,
        }
    }

    /// Run one iteration; `Some` ends the session.
    pub fn tick(&mut self, tick: &Tick, panel: &mut Panel<'_>) -> Option<Outcome> {
        match self {
            ActiveMode::Objective(machine) => machine.tick(tick, panel),
            ActiveMode::Zone(machine) => machine.tick(tick, panel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_wraps_in_both_directions() {
        assert_eq!(GameMode::Configuration.next(), GameMode::SearchAndDestroy);
        assert_eq!(GameMode::SearchAndDestroy.previous(), GameMode::Configuration);
        assert_eq!(GameMode::Sabotage.next(), GameMode::Domination);
    }

    #[test]
    fn only_fresh_presses_count() {
        let idle = HoldSnapshot::default();
        let a = idle.with(HoldInput::TeamA, true);
        let ab = a.with(HoldInput::TeamB, true);

        assert_eq!(newly_held(idle, a).collect::<Vec<_>>(), vec![HoldInput::TeamA]);
        assert_eq!(newly_held(a, ab).collect::<Vec<_>>(), vec![HoldInput::TeamB]);
        assert_eq!(newly_held(ab, ab).count(), 0);
    }

    #[test]
    fn configuration_is_not_a_game() {
        let now = Instant::now();
        assert!(ActiveMode::start(GameMode::Configuration, &Settings::default(), now).is_none());
        assert!(matches!(
            ActiveMode::start(GameMode::Domination, &Settings::default(), now),
            Some(ActiveMode::Zone(_))
        ));
    }
}
