//! Zone-control (Domination) mode.

use tokio::time::{Duration, Instant};
use tracing::info;

use crate::{
    config::Settings,
    hw::{
        Panel,
        input::{HoldInput, HoldSnapshot},
    },
    state::{
        Outcome, Team, Tick, ZoneTotals,
        clock::{Remaining, SessionClock, duration_ms, format_elapsed},
        cues::{CueScheduler, TONE_CONFIRM, ZONE_HELD},
        hold::{HoldAction, HoldKind, HoldStep},
        newly_held,
    },
};

/// How long each of the two alternating screens stays up.
const VIEW_INTERVAL_MS: u64 = 3_000;
const CONFIRM_TONE_MS: u32 = 200;

/// Who holds the zone and how long each team has held it.
///
/// Totals are only settled when control changes hands or the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneState {
    holder: Option<(Team, Instant)>,
    totals: ZoneTotals,
}

impl ZoneState {
    /// Neutral zone with nothing accumulated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder, if any.
    pub fn holder(&self) -> Option<Team> {
        self.holder.map(|(team, _)| team)
    }

    /// Give the zone to `team` from `now`. Only a neutral zone can be captured.
    pub fn capture(&mut self, team: Team, now: Instant) -> bool {
        if self.holder.is_some() {
            return false;
        }
        self.holder = Some((team, now));
        true
    }

    /// Return the zone to neutral, settling the holder's interval.
    pub fn neutralize(&mut self, now: Instant) -> Option<(Team, Duration)> {
        let (team, since) = self.holder.take()?;
        let held = now.saturating_duration_since(since);
        match team {
            Team::A => self.totals.team_a += held,
            Team::B => self.totals.team_b += held,
        }
        Some((team, held))
    }

    /// Settle any open interval at the end of the session and return the totals.
    pub fn finalize(&mut self, now: Instant) -> ZoneTotals {
        self.neutralize(now);
        self.totals
    }

    /// Settled control time of one team.
    pub fn total(&self, team: Team) -> Duration {
        self.totals.of(team)
    }

    /// Current holder and how long it has held the zone this time.
    pub fn live_control(&self, now: Instant) -> Option<(Team, Duration)> {
        self.holder
            .map(|(team, since)| (team, now.saturating_duration_since(since)))
    }
}

/// State machine of one zone-control session.
#[derive(Debug)]
pub struct ZoneControl {
    game: SessionClock,
    action_seconds: u32,
    zone: ZoneState,
    hold: Option<HoldAction>,
    blink: Option<CueScheduler>,
    last_holds: HoldSnapshot,
}

impl ZoneControl {
    /// Start a session whose game clock begins at `now`.
    pub fn new(settings: &Settings, now: Instant) -> Self {
        info!(game_minutes = settings.game_minutes, "zone session started");
        Self {
            game: SessionClock::start(settings.game_minutes, now),
            action_seconds: settings.action_seconds,
            zone: ZoneState::new(),
            hold: None,
            blink: None,
            last_holds: HoldSnapshot::default(),
        }
    }

    /// The zone as it stands.
    pub fn zone(&self) -> &ZoneState {
        &self.zone
    }

    /// Run one iteration. Returns the winner on the tick the game clock runs out.
    pub fn tick(&mut self, tick: &Tick, panel: &mut Panel<'_>) -> Option<Outcome> {
        let now = tick.now;
        let remaining = self.game.remaining(now);
        let expired = remaining.is_expired();
        let previous_holds = std::mem::replace(&mut self.last_holds, tick.holds);

        if let Some(action) = self.hold.take() {
            let held = tick.holds.is_held(action.input());
            match action.step(now, held, expired, remaining, self.action_seconds, panel) {
                HoldStep::Holding(action) => {
                    self.hold = Some(action);
                    return None;
                }
                HoldStep::Completed(kind) => self.apply(kind, now, panel),
                HoldStep::Cancelled => panel.clear(),
                HoldStep::Expired => {}
            }
        }

        if expired {
            return Some(self.finish(now, panel));
        }

        if let Some(input) = newly_held(previous_holds, tick.holds).find(|i| *i != HoldInput::Keypad)
        {
            let kind = match (self.zone.holder(), input) {
                (Some(_), _) => HoldKind::Neutralize,
                (None, HoldInput::TeamA) => HoldKind::CaptureA,
                (None, _) => HoldKind::CaptureB,
            };
            if let Some(blink) = self.blink.as_mut() {
                blink.silence(panel);
            }
            panel.clear();
            self.hold = Some(HoldAction::begin(kind, input, now));
            return None;
        }

        self.render(now, remaining, panel);
        if let (Some(blink), Some((_, held_for))) =
            (self.blink.as_mut(), self.zone.live_control(now))
        {
            blink.step(duration_ms(held_for), remaining, panel);
        }
        None
    }

    fn apply(&mut self, kind: HoldKind, now: Instant, panel: &mut Panel<'_>) {
        let team = match kind {
            HoldKind::CaptureA => Team::A,
            HoldKind::CaptureB => Team::B,
            HoldKind::Neutralize => {
                if let Some((team, held)) = self.zone.neutralize(now) {
                    info!(
                        team = team.label(),
                        held_ms = duration_ms(held),
                        total_ms = duration_ms(self.zone.total(team)),
                        "zone neutralized"
                    );
                }
                self.blink = None;
                panel.clear();
                return;
            }
            HoldKind::Arm | HoldKind::Disarm => return,
        };

        if self.zone.capture(team, now) {
            info!(team = team.label(), "zone captured");
            self.blink = Some(CueScheduler::new(&ZONE_HELD, team.indicator()));
            panel.tone(TONE_CONFIRM, CONFIRM_TONE_MS);
        }
        panel.clear();
    }

    fn render(&self, now: Instant, remaining: Remaining, panel: &mut Panel<'_>) {
        let view = self.game.elapsed_ms(now) / VIEW_INTERVAL_MS % 2;
        if view == 0 {
            panel.centered(0, "GAME TIME");
            panel.centered(1, &remaining.to_string());
            return;
        }
        match self.zone.live_control(now) {
            Some((team, held)) => {
                panel.centered(0, &format!("ZONE: {}", team.label()));
                panel.centered(1, &format_elapsed(held));
            }
            None => {
                panel.centered(0, "ZONE NEUTRAL");
                panel.centered(1, "HOLD TO CAPTURE");
            }
        }
    }

    fn finish(&mut self, now: Instant, panel: &mut Panel<'_>) -> Outcome {
        if let Some(blink) = self.blink.as_mut() {
            blink.silence(panel);
        }
        panel.silence();
        let totals = self.zone.finalize(now);
        let team = totals.winner();
        info!(
            winner = team.label(),
            team_a_ms = duration_ms(totals.team_a),
            team_b_ms = duration_ms(totals.team_b),
            "zone session over"
        );
        Outcome::ZoneWinner { team, totals }
    }
}
