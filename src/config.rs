//! Game settings collected before a session, plus where they are persisted on disk.

use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::state::code::StoredCode;

/// Default location on disk of the persisted settings.
const DEFAULT_CONFIG_PATH: &str = "config/settings.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FIELD_OBJECTIVE_CONFIG_PATH";

/// Settings read by the game modes. Read-only while a session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_code_presence"))]
pub struct Settings {
    /// Length of the game clock.
    #[validate(range(min = 1, max = 999))]
    pub game_minutes: u32,
    /// Length of the objective device countdown once armed.
    #[validate(range(min = 1, max = 999))]
    pub bomb_minutes: u32,
    /// How long an input must be held to arm, disarm, capture or neutralize.
    #[validate(range(min = 1, max = 99))]
    pub action_seconds: u32,
    /// Whether tones are emitted.
    pub sound_enabled: bool,
    /// Whether the external actuator fires on detonation and timeout.
    pub relay_enabled: bool,
    /// How long the actuator stays on.
    #[validate(range(min = 1, max = 60))]
    pub relay_seconds: u32,
    /// Whether arming and disarming require the code instead of a hold.
    pub code_enabled: bool,
    /// The code to type when `code_enabled` is set.
    pub code: Option<StoredCode>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game_minutes: 45,
            bomb_minutes: 10,
            action_seconds: 5,
            sound_enabled: true,
            relay_enabled: false,
            relay_seconds: 5,
            code_enabled: false,
            code: None,
        }
    }
}

impl Settings {
    /// Hold duration as a [`Duration`].
    pub fn action_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.action_seconds.max(1)))
    }

    /// Actuator pulse as a [`Duration`].
    pub fn relay_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.relay_seconds))
    }

    /// The code to check, if code entry is in effect.
    pub fn active_code(&self) -> Option<&StoredCode> {
        if self.code_enabled {
            self.code.as_ref()
        } else {
            None
        }
    }
}

fn validate_code_presence(settings: &Settings) -> Result<(), ValidationError> {
    if settings.code_enabled && settings.code.is_none() {
        let mut err = ValidationError::new("code_missing");
        err.message = Some("code entry is enabled but no code is stored".into());
        return Err(err);
    }
    Ok(())
}

/// Resolve the settings path taking the environment override into account.
pub fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
