//! Run tokens shared by the stimulus scheduler and the dwell timer.
//!
//! Every time a timer is armed it is stamped with a fresh token. Signals
//! produced by that timer carry the token back, and the owner compares
//! it against the token it currently considers live. A mismatch means the
//! signal belongs to a run that has since been cancelled or replaced.

/// Identifies one armed timer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic source of [`TimerToken`]s.
#[derive(Debug, Default)]
pub struct Generation {
    last: u64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_token(&mut self) -> TimerToken {
        self.last += 1;
        TimerToken(self.last)
    }
}
