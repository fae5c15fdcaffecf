//! Time-derived light and tone cues.
//!
//! A [`CueProfile`] lists windows inside the 1000 ms cycle. [`due`] is a pure function of the
//! phase-relative elapsed time and the time left, and [`CueScheduler`] fires each due window once
//! per cycle so a fast polling loop does not restart the same tone on every tick.

use tokio::time::Duration;

use crate::{
    hw::{Indicator, Panel},
    state::clock::Remaining,
};

/// Low alarm tone.
pub const TONE_ALARM_LOW: u32 = 700;
/// High alarm tone.
pub const TONE_ALARM_HIGH: u32 = 2_600;
/// Confirmation tone (armed, captured, code accepted).
pub const TONE_CONFIRM: u32 = 1_330;
/// Error tone.
pub const TONE_ERROR: u32 = 100;
/// Default tone length.
pub const TONE_MS: u32 = 50;

const CYCLE_MS: u64 = 1_000;

/// One window of the 1000 ms cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueWindow {
    /// First millisecond of the window within the cycle.
    pub start_ms: u64,
    /// Last millisecond of the window within the cycle, inclusive.
    pub end_ms: u64,
    /// Indicator state to apply, if any.
    pub light: Option<bool>,
    /// Tone frequency to emit, if any.
    pub tone_hz: Option<u32>,
    /// Only active while fewer whole minutes than this are left.
    pub below_minutes: Option<u64>,
}

impl CueWindow {
    const fn light(start_ms: u64, end_ms: u64, on: bool, tone_hz: Option<u32>) -> Self {
        Self {
            start_ms,
            end_ms,
            light: Some(on),
            tone_hz,
            below_minutes: None,
        }
    }

    const fn alert(start_ms: u64, end_ms: u64, tone_hz: u32, below_minutes: u64) -> Self {
        Self {
            start_ms,
            end_ms,
            light: None,
            tone_hz: Some(tone_hz),
            below_minutes: Some(below_minutes),
        }
    }
}

/// Windows plus tone-length escalation for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueProfile {
    /// Windows, ordered and non-overlapping.
    pub windows: &'static [CueWindow],
    /// Tone length outside the final stretch.
    pub tone_ms: u32,
    /// Tone length inside the final stretch.
    pub final_tone_ms: u32,
    /// How close to zero the final stretch starts.
    pub final_stretch: Duration,
}

/// Device waiting to be armed: slow green heartbeat, high ticks in the last minute.
pub static PREPARING: CueProfile = CueProfile {
    windows: &[
        CueWindow::light(0, 50, true, None),
        CueWindow::light(90, 130, false, None),
        CueWindow::alert(490, 530, TONE_ALARM_HIGH, 1),
    ],
    tone_ms: TONE_MS,
    final_tone_ms: 300,
    final_stretch: Duration::from_secs(10),
};

/// Armed device: red heartbeat with a beep, extra beeps under four and two minutes.
pub static ARMED: CueProfile = CueProfile {
    windows: &[
        CueWindow::light(0, 40, true, Some(TONE_ALARM_LOW)),
        CueWindow::light(180, 220, false, None),
        CueWindow::alert(240, 280, TONE_ALARM_LOW, 2),
        CueWindow::alert(490, 530, TONE_ALARM_LOW, 4),
        CueWindow::alert(740, 780, TONE_ALARM_LOW, 2),
    ],
    tone_ms: TONE_MS,
    final_tone_ms: 300,
    final_stretch: Duration::from_secs(10),
};

/// Hold in progress: start-of-second and mid-second alarm tones.
pub static HOLDING: CueProfile = CueProfile {
    windows: &[
        CueWindow::light(0, 40, true, Some(TONE_ALARM_LOW)),
        CueWindow::light(480, 520, false, Some(TONE_ALARM_HIGH)),
    ],
    tone_ms: TONE_MS,
    final_tone_ms: TONE_MS,
    final_stretch: Duration::ZERO,
};

/// Zone held by a team: silent blink of the team's light.
pub static ZONE_HELD: CueProfile = CueProfile {
    windows: &[
        CueWindow::light(0, 60, true, None),
        CueWindow::light(500, 540, false, None),
    ],
    tone_ms: TONE_MS,
    final_tone_ms: TONE_MS,
    final_stretch: Duration::ZERO,
};

/// A window that is active at the sampled instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    /// Index of the window in its profile.
    pub window: usize,
    /// Cycle number the window belongs to.
    pub cycle: u64,
    /// Indicator state to apply.
    pub light: Option<bool>,
    /// Tone to emit as `(frequency, duration)`.
    pub tone: Option<(u32, u32)>,
}

/// Windows of `profile` active at `phase_elapsed_ms` with `remaining` left on the governing clock.
pub fn due(profile: &CueProfile, phase_elapsed_ms: u64, remaining: Remaining) -> Vec<Cue> {
    let cycle = phase_elapsed_ms / CYCLE_MS;
    let offset = phase_elapsed_ms % CYCLE_MS;
    let minutes_left = remaining.whole_minutes();
    let tone_ms = if remaining.millis() < duration_millis(profile.final_stretch) {
        profile.final_tone_ms
    } else {
        profile.tone_ms
    };

    profile
        .windows
        .iter()
        .enumerate()
        .filter(|(_, w)| (w.start_ms..=w.end_ms).contains(&offset))
        .filter(|(_, w)| w.below_minutes.is_none_or(|limit| minutes_left < limit))
        .map(|(window, w)| Cue {
            window,
            cycle,
            light: w.light,
            tone: w.tone_hz.map(|hz| (hz, tone_ms)),
        })
        .collect()
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Fires due windows on a panel, once per window per cycle.
#[derive(Debug, Clone)]
pub struct CueScheduler {
    profile: &'static CueProfile,
    indicator: Indicator,
    fired: Vec<Option<u64>>,
}

impl CueScheduler {
    /// Scheduler for `profile` driving `indicator`.
    pub fn new(profile: &'static CueProfile, indicator: Indicator) -> Self {
        Self {
            profile,
            indicator,
            fired: vec![None; profile.windows.len()],
        }
    }

    /// Indicator driven by this scheduler.
    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    /// Apply every window that is due and has not fired in this cycle yet.
    pub fn step(&mut self, phase_elapsed_ms: u64, remaining: Remaining, panel: &mut Panel<'_>) {
        for cue in due(self.profile, phase_elapsed_ms, remaining) {
            let slot = &mut self.fired[cue.window];
            if *slot == Some(cue.cycle) {
                continue;
            }
            *slot = Some(cue.cycle);

            if let Some(on) = cue.light {
                panel.indicator(self.indicator, on);
            }
            if let Some((hz, ms)) = cue.tone {
                panel.tone(hz, ms);
            }
        }
    }

    /// Switch the indicator off and forget what fired.
    pub fn silence(&mut self, panel: &mut Panel<'_>) {
        panel.indicator(self.indicator, false);
        self.fired.iter_mut().for_each(|slot| *slot = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::recording::{RecordingAnnunciator, RecordingDisplay};

    fn remaining_minutes(minutes: u32) -> Remaining {
        Remaining::from_elapsed(minutes, 0)
    }

    #[test]
    fn windows_are_ordered_and_disjoint() {
        for profile in [&PREPARING, &ARMED, &HOLDING, &ZONE_HELD] {
            for pair in profile.windows.windows(2) {
                assert!(pair[0].start_ms <= pair[0].end_ms);
                assert!(pair[0].end_ms < pair[1].start_ms);
            }
            assert!(profile.windows.iter().all(|w| w.end_ms < CYCLE_MS));
        }
    }

    #[test]
    fn heartbeat_repeats_every_cycle() {
        let plenty = remaining_minutes(30);
        assert_eq!(due(&ARMED, 20, plenty)[0].light, Some(true));
        assert_eq!(due(&ARMED, 5_020, plenty)[0].cycle, 5);
        assert_eq!(due(&ARMED, 200, plenty)[0].light, Some(false));
        assert!(due(&ARMED, 600, plenty).is_empty());
    }

    #[test]
    fn urgency_windows_open_below_their_thresholds() {
        assert!(due(&ARMED, 500, remaining_minutes(5)).is_empty());
        assert_eq!(due(&ARMED, 500, remaining_minutes(3)).len(), 1);
        assert!(due(&ARMED, 250, remaining_minutes(3)).is_empty());
        assert!(due(&ARMED, 250, remaining_minutes(2)).is_empty());
        assert_eq!(due(&ARMED, 250, Remaining::from_elapsed(2, 1)).len(), 1);
    }

    #[test]
    fn tones_lengthen_in_the_final_stretch() {
        let early = due(&ARMED, 10, Remaining::from_elapsed(1, 0));
        assert_eq!(early[0].tone, Some((TONE_ALARM_LOW, TONE_MS)));

        let late = due(&ARMED, 10, Remaining::from_elapsed(1, 55_000));
        assert_eq!(late[0].tone, Some((TONE_ALARM_LOW, 300)));
    }

    #[test]
    fn scheduler_fires_each_window_once_per_cycle() {
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let probe = annunciator.clone();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);
        let mut scheduler = CueScheduler::new(&HOLDING, Indicator::Red);
        let plenty = remaining_minutes(10);

        for elapsed in (0..3_000).step_by(5) {
            scheduler.step(elapsed, plenty, &mut panel);
        }

        let tones = probe.tones();
        assert_eq!(tones.len(), 6);
        assert_eq!(
            tones.iter().filter(|t| t.frequency_hz == TONE_ALARM_HIGH).count(),
            3
        );
        assert_eq!(probe.switched_on(Indicator::Red), 3);
        assert!(!probe.indicator(Indicator::Red));
    }
}
