// ── Shared cached state ──

mod settings;

pub use settings::SettingsCache;
