use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ReportError;
use crate::level::GridPattern;

/// Aggregate outcome of one finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub attempts_used: u32,
    pub max_speed_achieved: u32,
    pub accuracy_percent: u32,
    pub grid_pattern: GridPattern,
}

/// `round(100 * correct / (correct + incorrect))`, or 0 with no answers.
pub fn accuracy_percent(correct: u32, incorrect: u32) -> u32 {
    let total = correct as u64 + incorrect as u64;
    if total == 0 {
        return 0;
    }
    (correct as f64 * 100.0 / total as f64).round() as u32
}

/// Receives the summary of every finished session, once.
///
/// Delivery is fire-and-forget from the trainer's point of view: a failed
/// report is logged and never retried.
pub trait ResultReporter {
    fn report(&mut self, summary: &SessionSummary) -> Result<(), ReportError>;
}

impl<R: ResultReporter> ResultReporter for Rc<RefCell<R>> {
    fn report(&mut self, summary: &SessionSummary) -> Result<(), ReportError> {
        self.borrow_mut().report(summary)
    }
}

/// Keeps summaries in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    pub reports: Vec<SessionSummary>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl ResultReporter for MemoryReporter {
    fn report(&mut self, summary: &SessionSummary) -> Result<(), ReportError> {
        self.reports.push(summary.clone());
        Ok(())
    }
}
