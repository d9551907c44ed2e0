use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::error::LevelError;
use crate::level::{ExerciseLevel, GridPattern};

static PACK_DIR: Dir = include_dir!("src/packs");

/// A named collection of levels, possibly spanning several grid patterns.
#[derive(Deserialize, Clone, Debug)]
pub struct LevelPack {
    pub name: String,
    pub levels: Vec<ExerciseLevel>,
}

impl LevelPack {
    /// Loads a pack compiled into the binary, by name.
    pub fn bundled(name: &str) -> Result<Self, LevelError> {
        let file_name = format!("{name}.json");
        let file = PACK_DIR
            .get_file(&file_name)
            .ok_or_else(|| LevelError::PackNotFound(name.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| LevelError::NotUtf8(file_name.clone()))?;
        Self::from_json(contents)
    }

    /// Names of the packs compiled into the binary.
    pub fn bundled_names() -> Vec<String> {
        PACK_DIR
            .files()
            .filter_map(|f| f.path().file_stem())
            .filter_map(|stem| stem.to_str())
            .map(str::to_string)
            .sorted()
            .collect()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LevelError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Distinct grid patterns in pack order.
    pub fn patterns(&self) -> Vec<GridPattern> {
        self.levels
            .iter()
            .map(|level| level.grid_pattern)
            .filter(GridPattern::is_valid)
            .unique()
            .collect()
    }

    /// Playable levels for one grid pattern, slowest first.
    pub fn ladder_levels(&self, pattern: GridPattern) -> Vec<ExerciseLevel> {
        self.levels
            .iter()
            .filter(|level| level.grid_pattern == pattern)
            .filter(|level| match level.defect() {
                Some(defect) => {
                    warn!(pack = %self.name, level = level.level_index, defect, "skipping level");
                    false
                }
                None => true,
            })
            .sorted_by_key(|level| level.words_per_minute)
            .cloned()
            .collect()
    }
}
