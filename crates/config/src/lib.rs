// Configuration loading

pub mod settings;

pub use settings::{
    ConfigError, CourtSettings, DisplaySettings, HexbinSettings, Settings, StorageSettings,
    CONFIG_ENV,
};
