use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::level::{ExerciseLevel, QuestionType};

/// The question asked after a run, built from that run's display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub question_type: QuestionType,
    pub options: Vec<String>,
    correct: String,
    resolved: bool,
}

impl Question {
    /// Builds the question for `display_order`, or `None` if it is empty.
    ///
    /// Options come from the level's pool, shuffled and optionally capped at
    /// `option_count`. If the correct word did not make it in, it replaces
    /// one option at random.
    pub fn for_run<R: Rng>(
        level: &ExerciseLevel,
        display_order: &[String],
        option_count: Option<usize>,
        rng: &mut R,
    ) -> Option<Self> {
        let correct = level.question_type.pick(display_order)?.clone();

        let mut options: Vec<String> = level.option_pool.iter().unique().cloned().collect();
        options.shuffle(rng);
        if let Some(count) = option_count {
            options.truncate(count.max(1));
        }

        if !options.contains(&correct) {
            if options.is_empty() {
                options.push(correct.clone());
            } else {
                let slot = rng.gen_range(0..options.len());
                options[slot] = correct.clone();
            }
        }

        Some(Self {
            question_type: level.question_type,
            options,
            correct,
            resolved: false,
        })
    }

    pub fn prompt(&self) -> &'static str {
        self.question_type.prompt()
    }

    pub fn correct(&self) -> &str {
        &self.correct
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn mark_resolved(&mut self) {
        self.resolved = true;
    }
}
