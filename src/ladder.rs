//! One-step difficulty ladder.
//!
//! A correct answer climbs one rung, an incorrect one drops one rung
//! (never below the floor). A correct answer on the top rung ends the
//! session.

use tracing::warn;

use crate::error::SessionError;
use crate::level::ExerciseLevel;

/// Outcome of resolving one answer against the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub continues: bool,
    pub new_index: usize,
}

#[derive(Debug, Clone)]
pub struct LevelLadder {
    levels: Vec<ExerciseLevel>,
    current_index: usize,
    max_speed_achieved: u32,
}

impl LevelLadder {
    /// Builds a ladder from levels of a single grid pattern.
    ///
    /// Malformed levels are dropped; the remainder is ordered by pace. The
    /// starting rung is clamped into range and counts as reached.
    pub fn new(levels: Vec<ExerciseLevel>, start_index: usize) -> Result<Self, SessionError> {
        let mut levels: Vec<ExerciseLevel> = levels
            .into_iter()
            .filter(|level| match level.defect() {
                Some(defect) => {
                    warn!(level = level.level_index, defect, "dropping malformed level");
                    false
                }
                None => true,
            })
            .collect();

        if levels.is_empty() {
            return Err(SessionError::NoLevelsAvailable);
        }
        levels.sort_by_key(|level| level.words_per_minute);

        let current_index = start_index.min(levels.len() - 1);
        let max_speed_achieved = levels[current_index].words_per_minute;
        Ok(Self {
            levels,
            current_index,
            max_speed_achieved,
        })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[ExerciseLevel] {
        &self.levels
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &ExerciseLevel {
        &self.levels[self.current_index]
    }

    pub fn is_at_top(&self) -> bool {
        self.current_index + 1 == self.levels.len()
    }

    pub fn max_speed_achieved(&self) -> u32 {
        self.max_speed_achieved
    }

    pub fn resolve(&mut self, is_correct: bool) -> Resolution {
        if is_correct {
            if self.is_at_top() {
                return Resolution {
                    continues: false,
                    new_index: self.current_index,
                };
            }
            self.current_index += 1;
            self.max_speed_achieved = self
                .max_speed_achieved
                .max(self.levels[self.current_index].words_per_minute);
        } else {
            self.current_index = self.current_index.saturating_sub(1);
        }

        Resolution {
            continues: true,
            new_index: self.current_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{GridPattern, QuestionType};
    use proptest::prelude::*;

    fn level(index: u32, wpm: u32) -> ExerciseLevel {
        ExerciseLevel {
            level_index: index,
            words_per_minute: wpm,
            grid_pattern: GridPattern::new(2, 2),
            word_sequence: vec!["alpha".into(), "beta".into()],
            option_pool: vec!["alpha".into(), "beta".into(), "gamma".into()],
            question_type: QuestionType::FirstWord,
        }
    }

    fn ladder(paces: &[u32]) -> LevelLadder {
        let levels = paces
            .iter()
            .enumerate()
            .map(|(i, &wpm)| level(i as u32, wpm))
            .collect();
        LevelLadder::new(levels, 0).unwrap()
    }

    #[test]
    fn empty_list_is_no_levels() {
        assert_eq!(
            LevelLadder::new(vec![], 0).unwrap_err(),
            SessionError::NoLevelsAvailable
        );
    }

    #[test]
    fn only_malformed_levels_is_no_levels() {
        let mut broken = level(1, 100);
        broken.word_sequence.clear();
        assert!(LevelLadder::new(vec![broken], 0).is_err());
    }

    #[test]
    fn levels_are_sorted_by_pace() {
        let ladder = ladder(&[150, 50, 100]);
        let paces: Vec<u32> = ladder.levels().iter().map(|l| l.words_per_minute).collect();
        assert_eq!(paces, vec![50, 100, 150]);
        assert_eq!(ladder.max_speed_achieved(), 50);
    }

    #[test]
    fn start_index_is_clamped() {
        let levels = vec![level(1, 50), level(2, 100)];
        let ladder = LevelLadder::new(levels, 9).unwrap();
        assert_eq!(ladder.current_index(), 1);
        assert_eq!(ladder.max_speed_achieved(), 100);
    }

    #[test]
    fn correct_climbs_and_records_speed() {
        let mut ladder = ladder(&[50, 100, 150]);
        assert_eq!(
            ladder.resolve(true),
            Resolution {
                continues: true,
                new_index: 1
            }
        );
        assert_eq!(ladder.max_speed_achieved(), 100);
    }

    #[test]
    fn correct_at_top_ends_session() {
        let mut ladder = ladder(&[50, 100]);
        ladder.resolve(true);
        let resolution = ladder.resolve(true);
        assert!(!resolution.continues);
        assert_eq!(resolution.new_index, 1);
        assert_eq!(ladder.max_speed_achieved(), 100);
    }

    #[test]
    fn incorrect_at_floor_stays_at_zero() {
        let mut ladder = ladder(&[50, 100]);
        assert_eq!(
            ladder.resolve(false),
            Resolution {
                continues: true,
                new_index: 0
            }
        );
    }

    #[test]
    fn incorrect_drops_one_rung_without_lowering_max() {
        let mut ladder = ladder(&[50, 100, 150]);
        ladder.resolve(true);
        ladder.resolve(true);
        assert_eq!(ladder.resolve(false).new_index, 1);
        assert_eq!(ladder.max_speed_achieved(), 150);
    }

    #[test]
    fn single_level_correct_ends_session() {
        let mut ladder = ladder(&[100]);
        assert!(!ladder.resolve(true).continues);
        assert_eq!(ladder.max_speed_achieved(), 100);
    }

    proptest! {
        #[test]
        fn max_speed_never_decreases(
            paces in proptest::collection::vec(1u32..1000, 1..8),
            answers in proptest::collection::vec(any::<bool>(), 0..40),
        ) {
            let mut ladder = ladder(&paces);
            let mut last = ladder.max_speed_achieved();
            for answer in answers {
                let resolution = ladder.resolve(answer);
                prop_assert!(ladder.max_speed_achieved() >= last);
                prop_assert!(resolution.new_index < ladder.len());
                last = ladder.max_speed_achieved();
                if !resolution.continues {
                    break;
                }
            }
        }
    }
}
