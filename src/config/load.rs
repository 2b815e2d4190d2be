use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use super::merge::{apply_env_overrides, merge_layers};
use super::schema::{Config, ConfigLayer};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Location of the user config file.
///
/// Priority order:
/// 1. `WAYMARK_CONFIG` (explicit file path)
/// 2. `$XDG_CONFIG_HOME/waymark/config.toml`
/// 3. `$HOME/.config/waymark/config.toml`
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("WAYMARK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join("waymark").join("config.toml"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("waymark").join("config.toml"))
}

pub fn load_user_config() -> Result<Option<ConfigLayer>, ConfigError> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "user config file not found, using defaults");
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let layer: ConfigLayer =
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
    tracing::debug!(path = %path.display(), "loaded user config");
    Ok(Some(layer))
}

pub fn load() -> Result<Config, ConfigError> {
    let user = load_user_config()?;
    let mut config = merge_layers(user);
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load the config, falling back to defaults (plus env overrides) when the
/// file is unreadable or malformed.
pub fn load_or_default() -> Config {
    match load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("config load failed, using defaults: {err}");
            let mut config = Config::default();
            apply_env_overrides(&mut config);
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_a_full_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [download]
            tile_zoom = 15

            [upload]
            auto_upload = false
            workers = 4

            [logging]
            level = "debug"
            format = "pretty"
            "#
        )
        .unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        let layer: ConfigLayer = toml::from_str(&contents).unwrap();
        let config = merge_layers(Some(layer));
        assert_eq!(config.download.tile_zoom, 15);
        assert!(!config.upload.auto_upload);
        assert_eq!(config.upload.workers, 4);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn partial_files_keep_defaults_elsewhere() {
        let layer: ConfigLayer = toml::from_str("[download]\ntile_zoom = 13\n").unwrap();
        let config = merge_layers(Some(layer));
        assert_eq!(config.download.tile_zoom, 13);
        assert!(config.upload.auto_upload);
    }
}
