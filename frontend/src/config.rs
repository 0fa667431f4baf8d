//! Optional user configuration from `~/.config/flipchip/config.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory searched for media images given as bare file names.
    pub media_dir: Option<PathBuf>,
}

/// Load the config file. A missing file is the default configuration; a
/// malformed one is reported and ignored.
pub fn load() -> Config {
    let Some(base) = dirs::config_dir() else {
        return Config::default();
    };
    let path = base.join("flipchip").join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
            log::warn!("ignoring {}: {}", path.display(), e);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

impl Config {
    /// Resolve a media path: used as given when absolute or already
    /// present, otherwise looked up under the media directory.
    pub fn resolve_media(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        if let Some(dir) = &self.media_dir {
            let candidate = dir.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
        path.to_path_buf()
    }
}
