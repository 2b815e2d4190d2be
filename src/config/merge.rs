use super::schema::{Config, ConfigLayer, LogFormat};

/// Build the effective config: built-in defaults, then the user layer.
pub fn merge_layers(user: Option<ConfigLayer>) -> Config {
    let mut config = Config::default();
    if let Some(layer) = user {
        layer.apply_to(&mut config);
    }
    config
}

/// Apply `WAYMARK_*` environment overrides on top of the merged config.
pub fn apply_env_overrides(config: &mut Config) {
    apply_env_overrides_with(config, |key| std::env::var(key).ok());
}

pub(crate) fn apply_env_overrides_with(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(zoom) = lookup("WAYMARK_TILE_ZOOM").and_then(|v| v.parse().ok()) {
        config.download.tile_zoom = zoom;
    }
    if let Some(v) = lookup("WAYMARK_NO_AUTO_UPLOAD") {
        config.upload.auto_upload = !truthy(&v);
    }
    if let Some(workers) = lookup("WAYMARK_UPLOAD_WORKERS").and_then(|v| v.parse().ok()) {
        config.upload.workers = workers;
    }
    if let Some(level) = lookup("WAYMARK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = lookup("WAYMARK_LOG_FORMAT") {
        match format.as_str() {
            "compact" => config.logging.format = LogFormat::Compact,
            "pretty" => config.logging.format = LogFormat::Pretty,
            "json" => config.logging.format = LogFormat::Json,
            other => tracing::warn!(format = other, "unknown WAYMARK_LOG_FORMAT, ignoring"),
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes")
}
