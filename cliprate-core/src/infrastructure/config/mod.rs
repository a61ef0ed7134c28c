pub mod loader;
pub mod settings;

pub use loader::{load_config, load_questionnaire_fields, load_rating_scales};
pub use settings::{AppConfig, PathsConfig, SettingsConfig, StorageMode};
