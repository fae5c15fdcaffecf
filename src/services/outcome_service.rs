use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use crate::{
    config::Settings,
    error::ControllerError,
    hw::{
        Panel,
        input::{InputHandle, Key},
    },
    state::{Outcome, Team, ZoneTotals, clock::format_elapsed},
};

/// Sweep start frequency.
const SWEEP_FROM_HZ: u32 = 1_000;
/// Sweep end frequency.
const SWEEP_TO_HZ: u32 = 200;
const SWEEP_STEP_HZ: usize = 10;
const SWEEP_STEP: Duration = Duration::from_millis(20);
/// How long the headline and the totals screens stay up.
const RESULT_PAUSE: Duration = Duration::from_secs(3);

/// What the players picked on the replay prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayChoice {
    /// Play the same mode again with the same settings.
    Restart,
    /// Go back to the mode menu.
    Menu,
}

/// Announce `outcome`, run its effects and ask whether to play again.
pub async fn resolve(
    outcome: &Outcome,
    settings: &Settings,
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
) -> Result<ReplayChoice, ControllerError> {
    info!(?outcome, "resolving outcome");
    panel.silence();

    let (top, bottom) = outcome.headline();
    panel.clear();
    panel.centered(0, top);
    panel.centered(1, bottom);
    panel.refresh();

    if outcome.is_blast() {
        sweep(panel).await;
        if settings.relay_enabled {
            pulse_actuator(panel, settings.relay_duration()).await;
        }
    }
    sleep(RESULT_PAUSE).await;

    if let Some(totals) = outcome.zone_totals() {
        show_totals(panel, &totals);
        sleep(RESULT_PAUSE).await;
    }

    input.drain();
    replay_prompt(input, panel).await
}

/// Descending tone sweep; skipped entirely when audio is off.
async fn sweep(panel: &mut Panel<'_>) {
    if !panel.sound_enabled() {
        return;
    }
    let step_ms = u32::try_from(SWEEP_STEP.as_millis()).unwrap_or(u32::MAX);
    for hz in (SWEEP_TO_HZ..=SWEEP_FROM_HZ).rev().step_by(SWEEP_STEP_HZ) {
        panel.tone(hz, step_ms);
        sleep(SWEEP_STEP).await;
    }
}

async fn pulse_actuator(panel: &mut Panel<'_>, duration: Duration) {
    info!(duration_ms = duration.as_millis() as u64, "actuator on");
    panel.actuator(true);
    sleep(duration).await;
    panel.actuator(false);
    debug!("actuator off");
}

fn show_totals(panel: &mut Panel<'_>, totals: &ZoneTotals) {
    panel.clear();
    for (row, team) in [(0, Team::A), (1, Team::B)] {
        let line = format!("{} {}", team.label(), format_elapsed(totals.of(team)));
        panel.centered(row, &line);
    }
    panel.refresh();
}

async fn replay_prompt(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
) -> Result<ReplayChoice, ControllerError> {
    panel.clear();
    panel.centered(0, "PLAY AGAIN?");
    panel.centered(1, "A:YES  B:MENU");
    panel.refresh();

    loop {
        let choice = match input.wait_event().await? {
            Key::A | Key::D => ReplayChoice::Restart,
            Key::B | Key::C => ReplayChoice::Menu,
            key => {
                debug!(?key, "ignored on replay prompt");
                continue;
            }
        };
        info!(?choice, "replay choice");
        return Ok(choice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{
        Indicator,
        input,
        recording::{RecordingAnnunciator, RecordingDisplay},
    };

    #[tokio::test(start_paused = true)]
    async fn blast_sweeps_and_pulses_the_relay() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let screen = display.clone();
        let mut annunciator = RecordingAnnunciator::new();
        let probe = annunciator.clone();
        let settings = Settings {
            relay_enabled: true,
            relay_seconds: 2,
            ..Settings::default()
        };
        let mut panel = Panel::new(&mut display, &mut annunciator, true);
        panel.indicator(Indicator::Red, true);

        let script = tokio::spawn(async move {
            sleep(Duration::from_secs(10)).await;
            feeder.press(Key::B);
        });
        let started = tokio::time::Instant::now();
        let choice = resolve(&Outcome::Detonated, &settings, &mut input, &mut panel)
            .await
            .unwrap();
        script.await.unwrap();

        assert_eq!(choice, ReplayChoice::Menu);
        assert!(screen.ever_showed("DEVICE EXPLODED"));
        assert!(!probe.indicator(Indicator::Red));
        let tones: Vec<u32> = probe.tones().iter().map(|t| t.frequency_hz).collect();
        assert_eq!(tones.first(), Some(&1_000));
        assert_eq!(tones.last(), Some(&200));
        assert_eq!(tones.len(), 81);
        assert!(tones.windows(2).all(|pair| pair[0] > pair[1]));
        assert_eq!(probe.actuator_history(), vec![true, false]);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn muted_blast_skips_the_sweep() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let probe = annunciator.clone();
        let mut panel = Panel::new(&mut display, &mut annunciator, false);

        let script = tokio::spawn(async move {
            sleep(Duration::from_secs(10)).await;
            feeder.press(Key::A);
        });
        let choice = resolve(&Outcome::TimedOut, &Settings::default(), &mut input, &mut panel)
            .await
            .unwrap();
        script.await.unwrap();

        assert_eq!(choice, ReplayChoice::Restart);
        assert!(probe.tones().is_empty());
        assert!(probe.actuator_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zone_result_shows_both_totals() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let screen = display.clone();
        let mut annunciator = RecordingAnnunciator::new();
        let probe = annunciator.clone();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);
        let outcome = Outcome::ZoneWinner {
            team: Team::A,
            totals: ZoneTotals {
                team_a: Duration::from_secs(95),
                team_b: Duration::from_secs(30),
            },
        };

        let script = tokio::spawn(async move {
            sleep(Duration::from_secs(10)).await;
            feeder.press(Key::Hash);
            feeder.press(Key::D);
        });
        let choice = resolve(&outcome, &Settings::default(), &mut input, &mut panel)
            .await
            .unwrap();
        script.await.unwrap();

        assert_eq!(choice, ReplayChoice::Restart);
        assert!(screen.ever_showed("TEAM A WINS"));
        assert!(screen.ever_showed("TEAM A 01:35"));
        assert!(screen.ever_showed("TEAM B 00:30"));
        assert!(screen.ever_showed("PLAY AGAIN?"));
        assert!(probe.tones().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_pressed_during_the_announcement_are_dropped() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        feeder.press(Key::A);
        let script = tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            feeder.press(Key::B);
        });
        let choice = resolve(&Outcome::Disarmed, &Settings::default(), &mut input, &mut panel)
            .await
            .unwrap();
        script.await.unwrap();

        assert_eq!(choice, ReplayChoice::Menu);
    }
}
