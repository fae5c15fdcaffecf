//! Field objective controller: game clock, hold-to-act actions, code authentication and the
//! armed-objective and zone-control game modes, driven by one cooperative polling loop.

/// Game settings and where they live on disk.
pub mod config;
/// Settings persistence.
pub mod dao;
/// Controller-level errors.
pub mod error;
/// Peripheral contracts and their terminal and in-memory implementations.
pub mod hw;
/// Menus, outcome resolution and the session loop.
pub mod services;
/// Synchronous game core.
pub mod state;
