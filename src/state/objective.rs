//! Armed-objective modes: Search & Destroy and Sabotage.
//!
//! The machine starts in [`ObjectivePhase::Preparing`] with the game clock running. Arming, by
//! hold or by code, moves it to [`ObjectivePhase::Armed`] where the device countdown governs.
//! Disarming either ends the session (Search & Destroy) or returns to preparing (Sabotage).

use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    hw::{
        Indicator, Panel,
        input::{HoldInput, HoldSnapshot, Key},
    },
    state::{
        Outcome, Tick,
        clock::{Remaining, SessionClock, duration_ms},
        code::{CodeBuffer, CodeEntry, EntryStep, StoredCode},
        cues::{ARMED, CueScheduler, PREPARING, TONE_CONFIRM, TONE_ERROR},
        hold::{HoldAction, HoldKind, HoldStep},
        newly_held,
    },
};

/// How long the wrong-code screen stays up.
const REJECTION_SCREEN: Duration = Duration::from_millis(1_500);
/// Length of the tone played on a rejected code.
const REJECTION_TONE_MS: u32 = 500;
/// Length of the tone played when the device arms or disarms.
const CONFIRM_TONE_MS: u32 = 200;

/// The two armed-objective rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectiveVariant {
    /// The first successful disarm ends the session.
    SearchAndDestroy,
    /// A successful disarm returns the device to preparing.
    Sabotage,
}

/// Device phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectivePhase {
    /// Waiting to be armed; the game clock governs.
    Preparing,
    /// Counting down to detonation; the device clock governs.
    Armed,
}

#[derive(Debug)]
enum Interaction {
    Idle,
    Holding(HoldAction),
    Entering(CodeEntry),
    Rejected { until: Instant },
}

/// State machine of one armed-objective session.
#[derive(Debug)]
pub struct ArmedObjective {
    variant: ObjectiveVariant,
    phase: ObjectivePhase,
    game: SessionClock,
    bomb: Duration,
    action_seconds: u32,
    code: Option<StoredCode>,
    /// Armed time consumed by earlier arming cycles; the device clock is never reset.
    device_spent: Duration,
    phase_started: Instant,
    interaction: Interaction,
    cues: CueScheduler,
    last_holds: HoldSnapshot,
}

impl ArmedObjective {
    /// Start a session whose game clock begins at `now`.
    pub fn new(variant: ObjectiveVariant, settings: &Settings, now: Instant) -> Self {
        info!(
            ?variant,
            game_minutes = settings.game_minutes,
            bomb_minutes = settings.bomb_minutes,
            code = settings.active_code().is_some(),
            "objective session started"
        );
        Self {
            variant,
            phase: ObjectivePhase::Preparing,
            game: SessionClock::start(settings.game_minutes, now),
            bomb: Duration::from_secs(u64::from(settings.bomb_minutes) * 60),
            action_seconds: settings.action_seconds,
            code: settings.active_code().copied(),
            device_spent: Duration::ZERO,
            phase_started: now,
            interaction: Interaction::Idle,
            cues: CueScheduler::new(&PREPARING, Indicator::Green),
            last_holds: HoldSnapshot::default(),
        }
    }

    /// Which rule set is running.
    pub fn variant(&self) -> ObjectiveVariant {
        self.variant
    }

    /// Current device phase.
    pub fn phase(&self) -> ObjectivePhase {
        self.phase
    }

    /// The game clock.
    pub fn game_clock(&self) -> &SessionClock {
        &self.game
    }

    /// Device time left at `now`, counting every earlier arming cycle.
    pub fn device_remaining(&self, now: Instant) -> Remaining {
        let armed_now = match self.phase {
            ObjectivePhase::Armed => now.saturating_duration_since(self.phase_started),
            ObjectivePhase::Preparing => Duration::ZERO,
        };
        Remaining::between(self.bomb, self.device_spent + armed_now)
    }

    fn governing_remaining(&self, now: Instant) -> Remaining {
        match self.phase {
            ObjectivePhase::Preparing => self.game.remaining(now),
            ObjectivePhase::Armed => self.device_remaining(now),
        }
    }

    fn phase_elapsed_ms(&self, now: Instant) -> u64 {
        duration_ms(now.saturating_duration_since(self.phase_started))
    }

    /// Run one iteration. Returns the outcome on the tick the session ends.
    pub fn tick(&mut self, tick: &Tick, panel: &mut Panel<'_>) -> Option<Outcome> {
        let now = tick.now;
        let remaining = self.governing_remaining(now);
        let expired = remaining.is_expired();
        let previous_holds = std::mem::replace(&mut self.last_holds, tick.holds);

        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Holding(action) => {
                let held = tick.holds.is_held(action.input());
                match action.step(now, held, expired, remaining, self.action_seconds, panel) {
                    HoldStep::Holding(action) => {
                        self.interaction = Interaction::Holding(action);
                        return None;
                    }
                    HoldStep::Completed(_) => return self.action_succeeded(now, panel),
                    HoldStep::Cancelled => panel.clear(),
                    HoldStep::Expired => {}
                }
            }
            Interaction::Entering(entry) if !expired => match entry.step(now, tick.key) {
                EntryStep::Pending(entry) => {
                    entry.render(self.code_prompt(), panel);
                    self.interaction = Interaction::Entering(entry);
                    self.cues.step(self.phase_elapsed_ms(now), remaining, panel);
                    return None;
                }
                EntryStep::Complete(entered) => return self.check_code(&entered, now, panel),
            },
            Interaction::Rejected { until } if !expired && now < until => {
                self.interaction = Interaction::Rejected { until };
                self.cues.step(self.phase_elapsed_ms(now), remaining, panel);
                return None;
            }
            Interaction::Rejected { .. } if !expired => panel.clear(),
            _ => {}
        }

        if expired {
            return Some(self.expire(now, panel));
        }

        if self.code.is_some() {
            if tick.key == Some(Key::D) {
                debug!(phase = ?self.phase, "code entry started");
                let per_position = Duration::from_secs(u64::from(self.action_seconds));
                let entry = CodeEntry::timed(per_position, now);
                entry.render(self.code_prompt(), panel);
                self.interaction = Interaction::Entering(entry);
                return None;
            }
        } else if newly_held(previous_holds, tick.holds).any(|input| input == HoldInput::Keypad) {
            self.cues.silence(panel);
            panel.clear();
            self.interaction =
                Interaction::Holding(HoldAction::begin(self.hold_kind(), HoldInput::Keypad, now));
            return None;
        }

        self.render_status(remaining, panel);
        self.cues.step(self.phase_elapsed_ms(now), remaining, panel);
        None
    }

    fn hold_kind(&self) -> HoldKind {
        match self.phase {
            ObjectivePhase::Preparing => HoldKind::Arm,
            ObjectivePhase::Armed => HoldKind::Disarm,
        }
    }

    fn code_prompt(&self) -> &'static str {
        match self.phase {
            ObjectivePhase::Preparing => "ARM CODE",
            ObjectivePhase::Armed => "DISARM CODE",
        }
    }

    fn render_status(&self, remaining: Remaining, panel: &mut Panel<'_>) {
        let (heading, hint) = match (self.phase, self.code.is_some()) {
            (ObjectivePhase::Preparing, false) => ("GAME", "HOLD D TO ARM"),
            (ObjectivePhase::Preparing, true) => ("GAME", "D: ARM CODE"),
            (ObjectivePhase::Armed, false) => ("BOMB", "HOLD D TO DISARM"),
            (ObjectivePhase::Armed, true) => ("BOMB", "D: DISARM CODE"),
        };
        panel.centered(0, &format!("{heading} {}", short_time(remaining)));
        panel.centered(1, hint);
    }

    fn check_code(
        &mut self,
        entered: &CodeBuffer,
        now: Instant,
        panel: &mut Panel<'_>,
    ) -> Option<Outcome> {
        let accepted = self.code.as_ref().is_some_and(|code| code.accepts(entered));
        if accepted {
            info!(phase = ?self.phase, "code accepted");
            return self.action_succeeded(now, panel);
        }

        warn!(phase = ?self.phase, "wrong code entered");
        panel.clear();
        panel.centered(0, "ERROR CODE");
        panel.tone(TONE_ERROR, REJECTION_TONE_MS);
        self.interaction = Interaction::Rejected {
            until: now + REJECTION_SCREEN,
        };
        None
    }

    fn action_succeeded(&mut self, now: Instant, panel: &mut Panel<'_>) -> Option<Outcome> {
        self.cues.silence(panel);
        panel.clear();
        panel.tone(TONE_CONFIRM, CONFIRM_TONE_MS);

        match (self.phase, self.variant) {
            (ObjectivePhase::Preparing, _) => {
                self.enter(ObjectivePhase::Armed, now);
                info!(
                    device_remaining_ms = self.device_remaining(now).millis(),
                    "device armed"
                );
                None
            }
            (ObjectivePhase::Armed, ObjectiveVariant::SearchAndDestroy) => {
                info!(
                    device_remaining_ms = self.device_remaining(now).millis(),
                    "device disarmed"
                );
                Some(Outcome::Disarmed)
            }
            (ObjectivePhase::Armed, ObjectiveVariant::Sabotage) => {
                self.device_spent += now.saturating_duration_since(self.phase_started);
                self.enter(ObjectivePhase::Preparing, now);
                info!(
                    device_remaining_ms = self.device_remaining(now).millis(),
                    game_remaining_ms = self.game.remaining(now).millis(),
                    "device disarmed, back to preparing"
                );
                None
            }
        }
    }

    fn enter(&mut self, phase: ObjectivePhase, now: Instant) {
        self.phase = phase;
        self.phase_started = now;
        self.cues = match phase {
            ObjectivePhase::Preparing => CueScheduler::new(&PREPARING, Indicator::Green),
            ObjectivePhase::Armed => CueScheduler::new(&ARMED, Indicator::Red),
        };
    }

    fn expire(&mut self, now: Instant, panel: &mut Panel<'_>) -> Outcome {
        self.cues.silence(panel);
        let outcome = match self.phase {
            ObjectivePhase::Preparing => Outcome::TimedOut,
            ObjectivePhase::Armed => Outcome::Detonated,
        };
        info!(
            ?outcome,
            game_elapsed_ms = self.game.elapsed_ms(now),
            "objective session over"
        );
        outcome
    }
}

/// `MM:SS` of a countdown, or `HH:MM` once an hour or more is left.
fn short_time(remaining: Remaining) -> String {
    let fields = remaining.fields();
    if fields.hours > 0 {
        format!("{:02}:{:02}", fields.hours, fields.minutes)
    } else {
        format!("{:02}:{:02}", fields.minutes, fields.seconds)
    }
}
