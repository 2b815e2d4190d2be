//! Config loading: built-in defaults, optional user TOML, env overrides.

mod load;
mod merge;
mod schema;

pub use load::{ConfigError, config_path, load, load_or_default, load_user_config};
pub use merge::{apply_env_overrides, merge_layers};
pub use schema::{
    Config, ConfigLayer, DownloadConfig, DownloadOverride, LogFormat, LoggingConfig,
    LoggingOverride, UploadConfig, UploadOverride,
};
