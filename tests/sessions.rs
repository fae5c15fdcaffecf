use std::{sync::Arc, time::Duration};

use field_objective::{
    config::Settings,
    dao::settings_store::{ConfigStore, JsonFileStore, MemoryStore},
    error::ControllerError,
    hw::{
        Indicator,
        input::{self, HoldInput, InputFeeder, Key},
        recording::{RecordingAnnunciator, RecordingDisplay},
    },
    services::session_service::Controller,
};
use tokio::time::sleep;

struct Bench {
    controller: Controller,
    feeder: InputFeeder,
    display: RecordingDisplay,
    annunciator: RecordingAnnunciator,
}

fn bench(store: Arc<dyn ConfigStore + Send + Sync>) -> Bench {
    let (feeder, input) = input::channel();
    let display = RecordingDisplay::new();
    let annunciator = RecordingAnnunciator::new();
    let controller = Controller::new(
        store,
        input,
        Box::new(display.clone()),
        Box::new(annunciator.clone()),
    )
    .unwrap();
    Bench {
        controller,
        feeder,
        display,
        annunciator,
    }
}

fn type_keys(feeder: &InputFeeder, keys: &str) {
    for key in keys.chars().filter_map(Key::from_char) {
        assert!(feeder.press(key));
    }
}

#[tokio::test(start_paused = true)]
async fn domination_session_from_menu_to_result() {
    let store = Arc::new(MemoryStore::new());
    let Bench {
        mut controller,
        feeder,
        display,
        annunciator,
    } = bench(store.clone());

    let script = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        // Domination, one minute of game time, default action seconds.
        type_keys(&feeder, "31dd");
        // The game clock starts after the six second countdown.
        sleep(Duration::from_secs(8)).await;
        feeder.hold(HoldInput::TeamA);
        sleep(Duration::from_secs(6)).await;
        feeder.release(HoldInput::TeamA);
        sleep(Duration::from_secs(70)).await;
        type_keys(&feeder, "b");
        sleep(Duration::from_secs(1)).await;
    });

    let result = controller.run().await;
    script.await.unwrap();

    assert!(matches!(result, Err(ControllerError::InputClosed)));
    assert!(display.ever_showed("TEAM A TAKING"));
    assert!(display.ever_showed("ZONE: TEAM A"));
    assert!(display.ever_showed("TEAM A WINS"));
    assert!(display.ever_showed("TEAM A 00:5"));
    assert!(display.ever_showed("TEAM B 00:00"));
    assert!(annunciator.switched_on(Indicator::Green) > 10);
    assert_eq!(store.stored().map(|s| s.game_minutes), Some(1));
}

#[tokio::test(start_paused = true)]
async fn coded_search_and_destroy_with_restart() {
    let store = Arc::new(MemoryStore::with(Settings::default()));
    let Bench {
        mut controller,
        feeder,
        display,
        annunciator,
    } = bench(store.clone());

    let script = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        // Search & Destroy: 10 game minutes, 1 bomb minute, 2 action seconds, code 11223344.
        type_keys(&feeder, "1");
        type_keys(&feeder, "10d1d2d");
        type_keys(&feeder, "a11223344");
        sleep(Duration::from_secs(10)).await;

        // Wrong last digit, then the right code arms.
        type_keys(&feeder, "d11223340");
        sleep(Duration::from_secs(3)).await;
        type_keys(&feeder, "d11223344");
        sleep(Duration::from_secs(2)).await;

        // Holding does nothing while a code is required; the code disarms.
        feeder.hold(HoldInput::Keypad);
        sleep(Duration::from_secs(3)).await;
        feeder.release(HoldInput::Keypad);
        type_keys(&feeder, "d11223344");
        sleep(Duration::from_secs(5)).await;

        // Play again, then pull the plug mid-session.
        type_keys(&feeder, "a");
        sleep(Duration::from_secs(10)).await;
    });

    let result = controller.run().await;
    script.await.unwrap();

    assert!(matches!(result, Err(ControllerError::InputClosed)));
    assert!(display.ever_showed("CODE SAVED"));
    assert!(display.ever_showed("ERROR CODE"));
    assert!(display.ever_showed("DISARM CODE"));
    assert!(display.ever_showed("DEVICE DISARMED"));
    assert!(!display.ever_showed("DISARMING"));
    assert!(!display.ever_showed("DEVICE EXPLODED"));
    assert!(annunciator.actuator_history().is_empty());

    let saved = store.stored().unwrap();
    assert!(saved.code_enabled);
    assert_eq!(saved.code.map(|c| c.to_string()).as_deref(), Some("11223344"));
    assert_eq!(saved.bomb_minutes, 1);
}

#[tokio::test(start_paused = true)]
async fn sabotage_detonation_fires_the_relay() {
    let store = Arc::new(MemoryStore::with(Settings {
        relay_enabled: true,
        relay_seconds: 3,
        ..Settings::default()
    }));
    let Bench {
        mut controller,
        feeder,
        display,
        annunciator,
    } = bench(store);

    let script = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        // Sabotage: 5 game minutes, 1 bomb minute, 1 action second, no code.
        type_keys(&feeder, "25d1d1db");
        sleep(Duration::from_secs(8)).await;
        feeder.hold(HoldInput::Keypad);
        sleep(Duration::from_secs(2)).await;
        feeder.release(HoldInput::Keypad);
        sleep(Duration::from_secs(75)).await;
        type_keys(&feeder, "c");
        sleep(Duration::from_secs(1)).await;
    });

    let result = controller.run().await;
    script.await.unwrap();

    assert!(matches!(result, Err(ControllerError::InputClosed)));
    assert!(display.ever_showed("ARMING"));
    assert!(display.ever_showed("DEVICE EXPLODED"));
    assert_eq!(annunciator.actuator_history(), vec![true, false]);
    let tones = annunciator.tones();
    assert!(tones.iter().any(|t| t.frequency_hz == 1_000));
    assert!(tones.iter().any(|t| t.frequency_hz == 200));
}

#[tokio::test(start_paused = true)]
async fn configuration_menu_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let Bench {
        mut controller,
        feeder,
        ..
    } = bench(Arc::new(JsonFileStore::new(&path)));
    assert_eq!(controller.settings(), &Settings::default());

    let script = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        // Configuration: sound off, relay on for 7 seconds.
        type_keys(&feeder, "4ba7d");
        sleep(Duration::from_secs(1)).await;
    });
    let result = controller.run().await;
    script.await.unwrap();
    assert!(matches!(result, Err(ControllerError::InputClosed)));

    let reopened = bench(Arc::new(JsonFileStore::new(&path)));
    let settings = reopened.controller.settings();
    assert!(!settings.sound_enabled);
    assert!(settings.relay_enabled);
    assert_eq!(settings.relay_seconds, 7);
}
