use std::ops::RangeInclusive;

use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, info};
use validator::Validate;

use crate::{
    config::Settings,
    error::ControllerError,
    hw::{
        COLUMNS, Glyph, Panel,
        input::{InputHandle, Key},
    },
    state::{
        GameMode,
        code::{CodeEntry, EntryStep, StoredCode},
        cues::{TONE_CONFIRM, TONE_ERROR, TONE_MS},
    },
};

/// How long confirmation and error messages stay up.
pub const MESSAGE_PAUSE: Duration = Duration::from_millis(1_500);
const ERROR_TONE_MS: u32 = 300;

/// Show the mode menu starting at `current` until one entry is confirmed.
pub async fn select_mode(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
    current: GameMode,
) -> Result<GameMode, ControllerError> {
    let mut selected = current;
    loop {
        panel.clear();
        panel.centered(0, selected.label());
        panel.line(1, "A/B MOVE  D: OK");
        panel.glyph_at(COLUMNS as u8 - 1, 0, Glyph::UpArrow);
        panel.glyph_at(COLUMNS as u8 - 1, 1, Glyph::DownArrow);
        panel.refresh();

        match input.wait_event().await? {
            Key::A => selected = selected.previous(),
            Key::B => selected = selected.next(),
            Key::D => {
                panel.tone(TONE_CONFIRM, TONE_MS);
                info!(mode = ?selected, "mode selected");
                return Ok(selected);
            }
            Key::Digit(d @ 1..=4) => {
                selected = GameMode::ALL[usize::from(d) - 1];
                panel.tone(TONE_CONFIRM, TONE_MS);
                info!(mode = ?selected, "mode selected");
                return Ok(selected);
            }
            key => debug!(?key, "ignored in mode menu"),
        }
    }
}

/// Collect the per-session settings for `mode`, starting from `settings`.
///
/// Returns `None` when the user backs out to the mode menu.
pub async fn quick_config(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
    mode: GameMode,
    settings: &Settings,
) -> Result<Option<Settings>, ControllerError> {
    let mut next = settings.clone();

    let Some(game_minutes) =
        read_number(input, panel, "GAME MINUTES", next.game_minutes, 1..=999).await?
    else {
        return Ok(None);
    };
    next.game_minutes = game_minutes;

    if mode.uses_device() {
        let Some(bomb_minutes) =
            read_number(input, panel, "BOMB MINUTES", next.bomb_minutes, 1..=999).await?
        else {
            return Ok(None);
        };
        next.bomb_minutes = bomb_minutes;
    }

    let Some(action_seconds) =
        read_number(input, panel, "ACTION SECONDS", next.action_seconds, 1..=99).await?
    else {
        return Ok(None);
    };
    next.action_seconds = action_seconds;

    if mode.uses_device() {
        let Some(code_enabled) = ask_yes_no(input, panel, "ENABLE CODE?").await? else {
            return Ok(None);
        };
        next.code_enabled = code_enabled;
        if code_enabled {
            next.code = Some(capture_code(input, panel).await?);
        }
    }

    next.validate()?;
    info!(
        ?mode,
        game_minutes = next.game_minutes,
        bomb_minutes = next.bomb_minutes,
        action_seconds = next.action_seconds,
        code_enabled = next.code_enabled,
        "quick configuration done"
    );
    Ok(Some(next))
}

/// Edit the persistent device options. Returns `None` when the user backs out.
pub async fn configuration_menu(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
    settings: &Settings,
) -> Result<Option<Settings>, ControllerError> {
    let mut next = settings.clone();

    let Some(sound_enabled) = ask_yes_no(input, panel, "SOUND ON?").await? else {
        return Ok(None);
    };
    next.sound_enabled = sound_enabled;

    let Some(relay_enabled) = ask_yes_no(input, panel, "RELAY ON?").await? else {
        return Ok(None);
    };
    next.relay_enabled = relay_enabled;

    if relay_enabled {
        let Some(relay_seconds) =
            read_number(input, panel, "RELAY SECONDS", next.relay_seconds, 1..=60).await?
        else {
            return Ok(None);
        };
        next.relay_seconds = relay_seconds;
    }

    next.validate()?;
    Ok(Some(next))
}

/// Numeric field editor.
///
/// Digits append, `C` erases the last digit (or backs out when the field is empty), `D`
/// confirms. Confirming an empty field keeps `current`. Values outside `range` re-prompt.
pub async fn read_number(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
    prompt: &str,
    current: u32,
    range: RangeInclusive<u32>,
) -> Result<Option<u32>, ControllerError> {
    let width = range.end().to_string().len();
    let mut digits = String::new();

    loop {
        panel.clear();
        panel.centered(0, prompt);
        let shown = if digits.is_empty() {
            format!("[{current}]")
        } else {
            format!("{digits}_")
        };
        panel.centered(1, &shown);
        panel.refresh();

        match input.wait_event().await? {
            Key::Digit(d) if digits.len() < width => digits.push(char::from(b'0' + d)),
            Key::Digit(_) => panel.tone(TONE_ERROR, TONE_MS),
            Key::C if digits.is_empty() => return Ok(None),
            Key::C => {
                digits.pop();
            }
            Key::D => {
                let value = if digits.is_empty() {
                    Some(current)
                } else {
                    digits.parse::<u32>().ok()
                };
                match value.filter(|v| range.contains(v)) {
                    Some(value) => {
                        panel.tone(TONE_CONFIRM, TONE_MS);
                        return Ok(Some(value));
                    }
                    None => {
                        debug!(prompt, entered = %digits, "value out of range");
                        show_error(
                            panel,
                            &format!("{}-{}", range.start(), range.end()),
                        )
                        .await;
                        digits.clear();
                    }
                }
            }
            key => debug!(?key, "ignored in numeric entry"),
        }
    }
}

/// Yes/no question: `A` yes, `B` no, `C` backs out.
pub async fn ask_yes_no(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
    prompt: &str,
) -> Result<Option<bool>, ControllerError> {
    panel.clear();
    panel.centered(0, prompt);
    panel.centered(1, "A:YES  B:NO");
    panel.refresh();

    loop {
        match input.wait_event().await? {
            Key::A => {
                panel.tone(TONE_CONFIRM, TONE_MS);
                return Ok(Some(true));
            }
            Key::B => {
                panel.tone(TONE_CONFIRM, TONE_MS);
                return Ok(Some(false));
            }
            Key::C => return Ok(None),
            key => debug!(?key, "ignored in yes/no prompt"),
        }
    }
}

/// Untimed capture of a new code. Anything but eight digits starts over.
pub async fn capture_code(
    input: &mut InputHandle,
    panel: &mut Panel<'_>,
) -> Result<StoredCode, ControllerError> {
    loop {
        let mut entry = CodeEntry::untimed(Instant::now());
        panel.clear();
        entry.render("NEW CODE", panel);
        panel.refresh();

        let entered = loop {
            let key = input.wait_event().await?;
            match entry.step(Instant::now(), Some(key)) {
                EntryStep::Pending(pending) => {
                    pending.render("NEW CODE", panel);
                    panel.refresh();
                    entry = pending;
                }
                EntryStep::Complete(buffer) => break buffer,
            }
        };

        match StoredCode::try_from(entered) {
            Ok(code) => {
                panel.clear();
                panel.centered(0, "CODE SAVED");
                panel.refresh();
                panel.tone(TONE_CONFIRM, TONE_MS);
                sleep(MESSAGE_PAUSE).await;
                info!("new code captured");
                return Ok(code);
            }
            Err(err) => {
                debug!(error = %err, "code capture rejected");
                show_error(panel, "DIGITS ONLY").await;
            }
        }
    }
}

async fn show_error(panel: &mut Panel<'_>, detail: &str) {
    panel.clear();
    panel.centered(0, "INVALID");
    panel.centered(1, detail);
    panel.refresh();
    panel.tone(TONE_ERROR, ERROR_TONE_MS);
    sleep(MESSAGE_PAUSE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{
        input::{self, InputFeeder},
        recording::{RecordingAnnunciator, RecordingDisplay},
    };

    fn press_all(feeder: &InputFeeder, keys: &str) {
        for key in keys.chars().filter_map(Key::from_char) {
            assert!(feeder.press(key));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn menu_cycles_and_confirms() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        press_all(&feeder, "bbad");
        let mode = select_mode(&mut input, &mut panel, GameMode::SearchAndDestroy)
            .await
            .unwrap();
        assert_eq!(mode, GameMode::Sabotage);

        press_all(&feeder, "3");
        let mode = select_mode(&mut input, &mut panel, GameMode::SearchAndDestroy)
            .await
            .unwrap();
        assert_eq!(mode, GameMode::Domination);
    }

    #[tokio::test(start_paused = true)]
    async fn numeric_entry_erases_and_rejects_out_of_range() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let screen = display.clone();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        // "0" is out of range, then "19", erase, "5" confirms 15.
        press_all(&feeder, "0d19c5d");
        let value = read_number(&mut input, &mut panel, "GAME MINUTES", 45, 1..=999)
            .await
            .unwrap();
        assert_eq!(value, Some(15));
        assert!(screen.ever_showed("1-999"));

        press_all(&feeder, "d");
        let value = read_number(&mut input, &mut panel, "GAME MINUTES", 45, 1..=999)
            .await
            .unwrap();
        assert_eq!(value, Some(45));

        press_all(&feeder, "c");
        let value = read_number(&mut input, &mut panel, "GAME MINUTES", 45, 1..=999)
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_config_for_an_armed_mode_captures_a_code() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        // game 20, bomb 2, action 3, code yes, a typo'd code then a good one.
        press_all(&feeder, "20d2d3da1234*678");
        press_all(&feeder, "87654321");
        let settings = quick_config(&mut input, &mut panel, GameMode::Sabotage, &Settings::default())
            .await
            .unwrap()
            .expect("configuration confirmed");

        assert_eq!(settings.game_minutes, 20);
        assert_eq!(settings.bomb_minutes, 2);
        assert_eq!(settings.action_seconds, 3);
        assert!(settings.code_enabled);
        assert_eq!(settings.code.map(|c| c.to_string()).as_deref(), Some("87654321"));
    }

    #[tokio::test(start_paused = true)]
    async fn quick_config_for_zone_control_skips_device_fields() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        press_all(&feeder, "5d10d");
        let settings =
            quick_config(&mut input, &mut panel, GameMode::Domination, &Settings::default())
                .await
                .unwrap()
                .expect("configuration confirmed");

        assert_eq!(settings.game_minutes, 5);
        assert_eq!(settings.bomb_minutes, Settings::default().bomb_minutes);
        assert_eq!(settings.action_seconds, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_menu_sets_relay() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);

        press_all(&feeder, "ba8d");
        let settings = configuration_menu(&mut input, &mut panel, &Settings::default())
            .await
            .unwrap()
            .expect("configuration confirmed");
        assert!(!settings.sound_enabled);
        assert!(settings.relay_enabled);
        assert_eq!(settings.relay_seconds, 8);

        press_all(&feeder, "c");
        let backed_out = configuration_menu(&mut input, &mut panel, &Settings::default())
            .await
            .unwrap();
        assert!(backed_out.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_input_stops_waiting() {
        let (feeder, mut input) = input::channel();
        let mut display = RecordingDisplay::new();
        let mut annunciator = RecordingAnnunciator::new();
        let mut panel = Panel::new(&mut display, &mut annunciator, true);
        drop(feeder);

        let result = select_mode(&mut input, &mut panel, GameMode::Domination).await;
        assert!(matches!(result, Err(ControllerError::InputClosed)));
    }
}
