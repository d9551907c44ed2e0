//! Stimulus scheduler.
//!
//! Emits one [`StimulusEvent`] per word at a fixed cadence derived from the
//! pace, cycling through grid positions row-major, then a single completion
//! signal. The scheduler never sleeps: the caller supplies the current time
//! to [`StimulusScheduler::poll`] and gets back everything that has come due.
//!
//! ```text
//! t = 0         word 0 @ position 0
//! t = 1 * ivl   word 1 @ position 1 % cells
//! ...
//! t = n * ivl   completion
//! ```

use tracing::{debug, warn};

use crate::timer::{Generation, TimerToken};

pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Pace used when a level does not provide a usable one.
pub const DEFAULT_MIN_WORDS_PER_MINUTE: u32 = 60;

/// One word shown at one grid position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusEvent {
    pub position: usize,
    pub word: String,
    pub sequence_index: usize,
    /// Instant the word was scheduled for, in caller milliseconds.
    pub due_ms: u64,
}

/// Immutable snapshot a run is parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusRun {
    pub words: Vec<String>,
    pub words_per_minute: u32,
    pub total_positions: usize,
}

/// What a poll of the scheduler can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerSignal {
    Stimulus {
        token: TimerToken,
        event: StimulusEvent,
    },
    Completed {
        token: TimerToken,
    },
}

impl SchedulerSignal {
    pub fn token(&self) -> TimerToken {
        match self {
            SchedulerSignal::Stimulus { token, .. } | SchedulerSignal::Completed { token } => *token,
        }
    }
}

/// `round(60000 / wpm)`, with non-positive paces clamped to `min_wpm`.
pub fn interval_ms(words_per_minute: u32, min_wpm: u32) -> u64 {
    let wpm = effective_pace(words_per_minute, min_wpm);
    (MS_PER_MINUTE / wpm as f64).round() as u64
}

fn effective_pace(words_per_minute: u32, min_wpm: u32) -> u32 {
    if words_per_minute == 0 {
        min_wpm.max(1)
    } else {
        words_per_minute
    }
}

#[derive(Debug)]
struct ActiveRun {
    token: TimerToken,
    words: Vec<String>,
    total_positions: usize,
    interval_ms: u64,
    started_at_ms: u64,
    next_index: usize,
}

impl ActiveRun {
    fn due_at(&self, index: usize) -> u64 {
        self.started_at_ms
            .saturating_add((index as u64).saturating_mul(self.interval_ms))
    }
}

/// Owns at most one outstanding run.
#[derive(Debug)]
pub struct StimulusScheduler {
    generation: Generation,
    min_wpm: u32,
    active: Option<ActiveRun>,
}

impl Default for StimulusScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORDS_PER_MINUTE)
    }
}

impl StimulusScheduler {
    pub fn new(min_wpm: u32) -> Self {
        Self {
            generation: Generation::new(),
            min_wpm: min_wpm.max(1),
            active: None,
        }
    }

    /// Starts a run at `now_ms`, cancelling any run still in flight.
    pub fn start(&mut self, run: StimulusRun, now_ms: u64) -> TimerToken {
        self.cancel();

        if run.words_per_minute == 0 {
            warn!(
                min_wpm = self.min_wpm,
                "missing or non-positive pace, clamping to minimum"
            );
        }
        let interval_ms = interval_ms(run.words_per_minute, self.min_wpm);
        let token = self.generation.next_token();
        debug!(
            token = token.value(),
            words = run.words.len(),
            interval_ms,
            "stimulus run started"
        );

        self.active = Some(ActiveRun {
            token,
            words: run.words,
            total_positions: run.total_positions.max(1),
            interval_ms,
            started_at_ms: now_ms,
            next_index: 0,
        });
        token
    }

    /// Drops the pending run, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            debug!(token = run.token.value(), "stimulus run cancelled");
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn active_token(&self) -> Option<TimerToken> {
        self.active.as_ref().map(|run| run.token)
    }

    pub fn interval(&self) -> Option<u64> {
        self.active.as_ref().map(|run| run.interval_ms)
    }

    /// Instant of the next signal, if a run is pending.
    pub fn next_deadline(&self) -> Option<u64> {
        self.active.as_ref().map(|run| run.due_at(run.next_index))
    }

    /// Returns every signal due at or before `now_ms`, in order.
    ///
    /// The completion signal is the last one a run ever produces; the run is
    /// released as soon as it has been returned.
    pub fn poll(&mut self, now_ms: u64) -> Vec<SchedulerSignal> {
        let mut signals = Vec::new();
        let Some(run) = self.active.as_mut() else {
            return signals;
        };

        while run.due_at(run.next_index) <= now_ms {
            let index = run.next_index;
            let due_ms = run.due_at(index);
            run.next_index += 1;

            match run.words.get(index) {
                Some(word) => signals.push(SchedulerSignal::Stimulus {
                    token: run.token,
                    event: StimulusEvent {
                        position: index % run.total_positions,
                        word: word.clone(),
                        sequence_index: index,
                        due_ms,
                    },
                }),
                None => {
                    signals.push(SchedulerSignal::Completed { token: run.token });
                    break;
                }
            }
        }

        if matches!(signals.last(), Some(SchedulerSignal::Completed { .. })) {
            self.active = None;
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn run(list: &[&str], wpm: u32, cells: usize) -> StimulusRun {
        StimulusRun {
            words: words(list),
            words_per_minute: wpm,
            total_positions: cells,
        }
    }

    fn stimuli(signals: &[SchedulerSignal]) -> Vec<&StimulusEvent> {
        signals
            .iter()
            .filter_map(|s| match s {
                SchedulerSignal::Stimulus { event, .. } => Some(event),
                SchedulerSignal::Completed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn interval_is_rounded_from_pace() {
        assert_eq!(interval_ms(100, 60), 600);
        assert_eq!(interval_ms(150, 60), 400);
        assert_eq!(interval_ms(7, 60), 8571);
        assert_eq!(interval_ms(90_000, 60), 1);
    }

    #[test]
    fn zero_pace_is_clamped() {
        assert_eq!(interval_ms(0, 60), 1000);
        assert_eq!(interval_ms(0, 0), 60_000);
    }

    #[test]
    fn first_word_fires_immediately() {
        let mut scheduler = StimulusScheduler::default();
        scheduler.start(run(&["a", "b"], 100, 4), 1_000);

        let signals = scheduler.poll(1_000);
        let events = stimuli(&signals);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].word, "a");
        assert_eq!(events[0].due_ms, 1_000);
        assert_eq!(scheduler.next_deadline(), Some(1_600));
    }

    #[test]
    fn words_are_spaced_by_interval() {
        let mut scheduler = StimulusScheduler::default();
        scheduler.start(run(&["a", "b", "c"], 100, 4), 0);

        assert_eq!(stimuli(&scheduler.poll(0)).len(), 1);
        assert!(scheduler.poll(599).is_empty());
        let second = scheduler.poll(600);
        assert_eq!(stimuli(&second)[0].word, "b");
        let third = scheduler.poll(1_200);
        assert_eq!(stimuli(&third)[0].due_ms, 1_200);
    }

    #[test]
    fn positions_cycle_over_grid() {
        let mut scheduler = StimulusScheduler::default();
        scheduler.start(run(&["a", "b", "c", "d", "e"], 600, 2), 0);

        let signals = scheduler.poll(10_000);
        let positions: Vec<usize> = stimuli(&signals).iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn completion_fires_once_after_last_interval() {
        let mut scheduler = StimulusScheduler::default();
        let token = scheduler.start(run(&["a", "b"], 100, 4), 0);

        scheduler.poll(600);
        assert!(scheduler.poll(1_199).is_empty());
        let done = scheduler.poll(1_200);
        assert_eq!(done, vec![SchedulerSignal::Completed { token }]);
        assert!(scheduler.is_idle());
        assert!(scheduler.poll(100_000).is_empty());
    }

    #[test]
    fn late_poll_catches_up_in_order() {
        let mut scheduler = StimulusScheduler::default();
        scheduler.start(run(&["a", "b", "c"], 100, 4), 0);

        let signals = scheduler.poll(5_000);
        assert_eq!(signals.len(), 4);
        assert_matches!(signals.last(), Some(SchedulerSignal::Completed { .. }));
        let indexes: Vec<usize> = stimuli(&signals).iter().map(|e| e.sequence_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn restart_cancels_previous_run() {
        let mut scheduler = StimulusScheduler::default();
        let first = scheduler.start(run(&["old1", "old2"], 100, 4), 0);
        scheduler.poll(0);
        let second = scheduler.start(run(&["new"], 100, 4), 100);
        assert_ne!(first, second);

        let signals = scheduler.poll(10_000);
        assert!(signals.iter().all(|s| s.token() == second));
        assert!(stimuli(&signals).iter().all(|e| e.word == "new"));
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let mut scheduler = StimulusScheduler::default();
        scheduler.cancel();
        scheduler.cancel();
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn cancel_stops_pending_emission() {
        let mut scheduler = StimulusScheduler::default();
        scheduler.start(run(&["a", "b", "c"], 100, 4), 0);
        scheduler.poll(0);
        scheduler.cancel();
        scheduler.cancel();
        assert!(scheduler.poll(10_000).is_empty());
        assert_eq!(scheduler.active_token(), None);
    }

    #[test]
    fn due_times_saturate_near_end_of_clock() {
        let mut scheduler = StimulusScheduler::default();
        let start = u64::MAX - 1_500;
        scheduler.start(run(&["a", "b", "c"], 60, 4), start);

        let signals = scheduler.poll(start);
        assert_eq!(stimuli(&signals).len(), 1);
        assert_eq!(scheduler.next_deadline(), Some(start + 1_000));

        let signals = scheduler.poll(u64::MAX);
        assert_eq!(stimuli(&signals).len(), 2);
        assert_matches!(signals.last(), Some(SchedulerSignal::Completed { .. }));
        assert!(scheduler.is_idle());
    }
}
