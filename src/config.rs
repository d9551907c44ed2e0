use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::level::GridPattern;
use crate::session::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub max_attempts: u32,
    pub prepare_dwell_ms: u64,
    pub locator_cadence_ms: u64,
    pub locator_duration_ms: u64,
    pub min_words_per_minute: u32,
    pub option_count: Option<usize>,
    pub start_level: usize,
    pub level_pack: String,
    pub grid: Option<GridPattern>,
}

impl Default for Config {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            max_attempts: session.max_attempts,
            prepare_dwell_ms: session.prepare_dwell_ms,
            locator_cadence_ms: session.locator_cadence_ms,
            locator_duration_ms: session.locator_duration_ms,
            min_words_per_minute: session.min_words_per_minute,
            option_count: Some(6),
            start_level: session.start_level,
            level_pack: "standard".to_string(),
            grid: None,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            prepare_dwell_ms: cfg.prepare_dwell_ms,
            locator_cadence_ms: cfg.locator_cadence_ms,
            locator_duration_ms: cfg.locator_duration_ms,
            min_words_per_minute: cfg.min_words_per_minute,
            option_count: cfg.option_count,
            start_level: cfg.start_level,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "flashword") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("flashword_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring unreadable config: {err}");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            max_attempts: 5,
            prepare_dwell_ms: 300,
            locator_cadence_ms: 50,
            locator_duration_ms: 0,
            min_words_per_minute: 40,
            option_count: None,
            start_level: 2,
            level_pack: "custom".into(),
            grid: Some(GridPattern::new(3, 3)),
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "max_attempts": 3 }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.prepare_dwell_ms, 800);
        assert_eq!(cfg.level_pack, "standard");
    }

    #[test]
    fn session_config_projection() {
        let cfg = Config {
            max_attempts: 7,
            locator_duration_ms: 0,
            ..Config::default()
        };
        let session = SessionConfig::from(&cfg);
        assert_eq!(session.max_attempts, 7);
        assert_eq!(session.locator_duration_ms, 0);
        assert_eq!(session.option_count, Some(6));
    }
}
