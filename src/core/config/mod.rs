pub mod data;
pub mod io;

pub use data::{path_display, Config, SettingError, DEFAULT_BASE_URL, SETTING_KEYS};
pub use io::ConfigError;
