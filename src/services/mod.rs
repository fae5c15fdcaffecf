/// Mode menu, quick configuration and the settings menu.
pub mod menu_service;
/// Outcome announcement, effects and the replay prompt.
pub mod outcome_service;
/// Top-level controller loop and the per-session tick loop.
pub mod session_service;
