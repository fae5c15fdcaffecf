/// Persistent settings store: trait plus JSON-file and in-memory backends.
pub mod settings_store;
/// Storage error shared by every backend.
pub mod storage;
