/// Hard cap on resolved answers per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    max_attempts: u32,
    attempts_used: u32,
}

impl AttemptBudget {
    /// A budget of zero would end every session before it began, so the
    /// ceiling is at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempts_used: 0,
        }
    }

    pub fn record(&mut self) {
        self.attempts_used = self.attempts_used.saturating_add(1);
    }

    pub fn exhausted(&self) -> bool {
        self.attempts_used >= self.max_attempts
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts_used)
    }
}
