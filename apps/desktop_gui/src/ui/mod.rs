//! UI layer: app shell and panels.

pub mod app;

pub use app::{ModerationGuiApp, PersistedDesktopSettings, SETTINGS_STORAGE_KEY};
