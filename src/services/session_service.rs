use std::sync::Arc;

use tokio::time::{Duration, Instant, sleep};
use tracing::{Instrument, info, info_span, trace, warn};
use uuid::Uuid;

use crate::{
    config::Settings,
    dao::settings_store::ConfigStore,
    error::ControllerError,
    hw::{Annunciator, Display, Panel, input::InputHandle},
    services::{
        menu_service,
        outcome_service::{self, ReplayChoice},
    },
    state::{ActiveMode, GameMode, Outcome, Tick, cues::TONE_CONFIRM},
};

/// Pause between two iterations of the session loop.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);
/// Seconds counted down before the game clock starts.
const COUNTDOWN_SECONDS: u32 = 5;
const SPLASH: Duration = Duration::from_secs(1);
const COUNTDOWN_TONE_MS: u32 = 100;

/// Owns the peripherals and settings and runs menus and sessions one after another.
pub struct Controller {
    store: Arc<dyn ConfigStore + Send + Sync>,
    settings: Settings,
    input: InputHandle,
    display: Box<dyn Display + Send>,
    annunciator: Box<dyn Annunciator + Send>,
}

impl Controller {
    /// Load the settings from `store`, writing defaults on first run.
    pub fn new(
        store: Arc<dyn ConfigStore + Send + Sync>,
        input: InputHandle,
        display: Box<dyn Display + Send>,
        annunciator: Box<dyn Annunciator + Send>,
    ) -> Result<Self, ControllerError> {
        let settings = store.load_or_init()?;
        info!(?settings, "settings loaded");
        Ok(Self {
            store,
            settings,
            input,
            display,
            annunciator,
        })
    }

    /// Settings currently in effect.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn io(&mut self) -> (&mut InputHandle, Panel<'_>) {
        let panel = Panel::new(
            &mut *self.display,
            &mut *self.annunciator,
            self.settings.sound_enabled,
        );
        (&mut self.input, panel)
    }

    /// Mode menu, configuration and sessions until the input device goes away.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        let mut selected = GameMode::SearchAndDestroy;
        loop {
            {
                let (input, mut panel) = self.io();
                panel.silence();
                input.drain();
                selected = menu_service::select_mode(input, &mut panel, selected).await?;
            }

            if selected == GameMode::Configuration {
                self.configure().await?;
                continue;
            }

            let current = self.settings.clone();
            let (input, mut panel) = self.io();
            let Some(settings) =
                menu_service::quick_config(input, &mut panel, selected, &current).await?
            else {
                continue;
            };
            self.apply_settings(settings)?;

            while self.play(selected).await? == ReplayChoice::Restart {}
        }
    }

    async fn configure(&mut self) -> Result<(), ControllerError> {
        let current = self.settings.clone();
        let (input, mut panel) = self.io();
        if let Some(settings) = menu_service::configuration_menu(input, &mut panel, &current).await?
        {
            self.apply_settings(settings)?;
        }
        Ok(())
    }

    fn apply_settings(&mut self, settings: Settings) -> Result<(), ControllerError> {
        if settings != self.settings {
            self.store.save(&settings)?;
            info!(?settings, "settings saved");
        }
        self.settings = settings;
        Ok(())
    }

    /// One session of `mode`: countdown, game loop, outcome and replay prompt.
    pub async fn play(&mut self, mode: GameMode) -> Result<ReplayChoice, ControllerError> {
        let session_id = Uuid::new_v4();
        let span = info_span!("session", %session_id, ?mode);
        async move {
            self.countdown().await;
            let Some(machine) = ActiveMode::start(mode, &self.settings, Instant::now()) else {
                warn!("mode has no game to play");
                return Ok(ReplayChoice::Menu);
            };
            let outcome = self.run_mode(machine).await?;

            let settings = self.settings.clone();
            let (input, mut panel) = self.io();
            outcome_service::resolve(&outcome, &settings, input, &mut panel).await
        }
        .instrument(span)
        .await
    }

    async fn countdown(&mut self) {
        {
            let (_, mut panel) = self.io();
            panel.silence();
            panel.clear();
            panel.centered(0, "READY");
            panel.refresh();
        }
        sleep(SPLASH).await;

        for second in (1..=COUNTDOWN_SECONDS).rev() {
            {
                let (_, mut panel) = self.io();
                panel.centered(0, "STARTING IN");
                panel.centered(1, &second.to_string());
                panel.refresh();
                panel.tone(TONE_CONFIRM, COUNTDOWN_TONE_MS);
            }
            sleep(Duration::from_secs(1)).await;
        }

        let (input, mut panel) = self.io();
        panel.clear();
        panel.refresh();
        input.drain();
        info!("game clock started");
    }

    /// Tick `machine` until it produces an outcome.
    async fn run_mode(&mut self, mut machine: ActiveMode) -> Result<Outcome, ControllerError> {
        loop {
            let now = Instant::now();
            let (input, mut panel) = self.io();
            let key = input.poll_event()?;
            let holds = input.holds();
            if key.is_some() {
                trace!(?key, "key polled");
            }

            let outcome = machine.tick(&Tick { now, key, holds }, &mut panel);
            panel.refresh();
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
            sleep(TICK_INTERVAL).await;
        }
    }
}
