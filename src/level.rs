use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grid the words are flashed across, filled row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPattern {
    pub cols: u32,
    pub rows: u32,
}

impl GridPattern {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    pub fn total_positions(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn is_valid(&self) -> bool {
        self.cols > 0 && self.rows > 0
    }

    /// (column, row) of a row-major position.
    pub fn cell(&self, position: usize) -> (u32, u32) {
        let cols = self.cols.max(1) as usize;
        ((position % cols) as u32, (position / cols) as u32)
    }
}

impl fmt::Display for GridPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

impl FromStr for GridPattern {
    type Err = String;

    /// Parses `CxR`, e.g. `3x2` for three columns and two rows.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cols, rows) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected COLSxROWS, got '{s}'"))?;
        let cols: u32 = cols
            .trim()
            .parse()
            .map_err(|_| format!("invalid column count in '{s}'"))?;
        let rows: u32 = rows
            .trim()
            .parse()
            .map_err(|_| format!("invalid row count in '{s}'"))?;
        let pattern = GridPattern::new(cols, rows);
        if !pattern.is_valid() {
            return Err(format!("grid '{s}' must have at least one column and one row"));
        }
        Ok(pattern)
    }
}

/// Which word of the flashed sequence the question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    FirstWord,
    LastWord,
}

impl QuestionType {
    pub fn prompt(&self) -> &'static str {
        match self {
            QuestionType::FirstWord => "Which word appeared first?",
            QuestionType::LastWord => "Which word appeared last?",
        }
    }

    /// The word this question type selects from a display order.
    pub fn pick<'a>(&self, order: &'a [String]) -> Option<&'a String> {
        match self {
            QuestionType::FirstWord => order.first(),
            QuestionType::LastWord => order.last(),
        }
    }
}

/// One rung of the difficulty ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLevel {
    pub level_index: u32,
    /// Pace of the run. Zero means missing and is clamped by the scheduler.
    #[serde(default, deserialize_with = "lenient_pace")]
    pub words_per_minute: u32,
    pub grid_pattern: GridPattern,
    pub word_sequence: Vec<String>,
    #[serde(default)]
    pub option_pool: Vec<String>,
    pub question_type: QuestionType,
}

/// Null and non-positive paces read as 0 so the scheduler can clamp them.
fn lenient_pace<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let pace = Option::<f64>::deserialize(deserializer)?;
    Ok(match pace {
        Some(pace) if pace.is_finite() && pace > 0.0 => pace.round().min(u32::MAX as f64) as u32,
        _ => 0,
    })
}

impl ExerciseLevel {
    /// Reason this level cannot be played, if any.
    pub fn defect(&self) -> Option<&'static str> {
        if self.word_sequence.is_empty() {
            Some("empty word sequence")
        } else if !self.grid_pattern.is_valid() {
            Some("grid pattern has no cells")
        } else {
            None
        }
    }

    pub fn is_playable(&self) -> bool {
        self.defect().is_none()
    }
}
