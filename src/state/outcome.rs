//! Session results and zone control totals.

use tokio::time::Duration;

use crate::state::Team;

/// Control time accumulated by each team over a zone-control session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneTotals {
    /// Team A's settled control time.
    pub team_a: Duration,
    /// Team B's settled control time.
    pub team_b: Duration,
}

impl ZoneTotals {
    /// Control time of one team.
    pub fn of(&self, team: Team) -> Duration {
        match team {
            Team::A => self.team_a,
            Team::B => self.team_b,
        }
    }

    /// Team with the greater total. Team A must be strictly ahead; a tie goes to team B.
    pub fn winner(&self) -> Team {
        if self.team_a > self.team_b {
            Team::A
        } else {
            Team::B
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The objective device ran out while armed.
    Detonated,
    /// The game clock ran out before the device was armed.
    TimedOut,
    /// The device was disarmed (Search & Destroy).
    Disarmed,
    /// The zone-control clock ran out.
    ZoneWinner {
        /// Team with the most control time.
        team: Team,
        /// Both teams' control time.
        totals: ZoneTotals,
    },
}

impl Outcome {
    /// Two display lines announcing the result.
    pub fn headline(&self) -> (&'static str, &'static str) {
        match self {
            Outcome::Detonated => ("DEVICE EXPLODED", "GAME OVER"),
            Outcome::TimedOut => ("TIME OUT", "GAME OVER"),
            Outcome::Disarmed => ("DEVICE DISARMED", "DEFENDERS WIN"),
            Outcome::ZoneWinner { team: Team::A, .. } => ("TEAM A WINS", "GAME OVER"),
            Outcome::ZoneWinner { team: Team::B, .. } => ("TEAM B WINS", "GAME OVER"),
        }
    }

    /// Whether the result gets the descending sweep and the actuator pulse.
    pub fn is_blast(&self) -> bool {
        matches!(self, Outcome::Detonated | Outcome::TimedOut)
    }

    /// Control totals to show before the replay prompt, for zone results.
    pub fn zone_totals(&self) -> Option<ZoneTotals> {
        match self {
            Outcome::ZoneWinner { totals, .. } => Some(*totals),
            _ => None,
        }
    }
}
