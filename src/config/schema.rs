use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_TILE_ZOOM;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub download: DownloadConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Zoom level of the tile grid download regions are aligned to.
    pub tile_zoom: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            tile_zoom: DEFAULT_TILE_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Chain an opportunistic upload pass after every local mutation.
    pub auto_upload: bool,
    /// Size of the mutation worker pool.
    pub workers: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            auto_upload: true,
            workers: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level directive (overridden by `RUST_LOG`).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// =============================================================================
// Layer (all fields optional, merged over defaults)
// =============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfigLayer {
    pub download: DownloadOverride,
    pub upload: UploadOverride,
    pub logging: LoggingOverride,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DownloadOverride {
    pub tile_zoom: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UploadOverride {
    pub auto_upload: Option<bool>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingOverride {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl ConfigLayer {
    pub(crate) fn apply_to(&self, config: &mut Config) {
        if let Some(zoom) = self.download.tile_zoom {
            config.download.tile_zoom = zoom;
        }
        if let Some(auto) = self.upload.auto_upload {
            config.upload.auto_upload = auto;
        }
        if let Some(workers) = self.upload.workers {
            config.upload.workers = workers;
        }
        if let Some(level) = &self.logging.level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.logging.format {
            config.logging.format = format;
        }
    }
}
