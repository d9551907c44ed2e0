//! Exercise session lifecycle.
//!
//! ```text
//! Ready --start--> InitialAnimation --dwell--> Playing --complete--> Question
//!   ^                (first run only)            ^                      |
//!   |                                            |                  answer
//!   |                                            +---dwell--- Prepare <-+
//!   |                                                                   |
//!   +------------------------------reset------------------------ Final <+
//! ```
//!
//! The machine owns every timer it uses and never sleeps. Hosts call
//! [`SessionStateMachine::tick`] with the current time (ideally at
//! [`SessionStateMachine::next_deadline`]) and render the returned events.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::budget::AttemptBudget;
use crate::dwell::{DwellKind, DwellSignal, DwellTimer, Sweep};
use crate::error::SessionError;
use crate::ladder::LevelLadder;
use crate::level::{ExerciseLevel, GridPattern};
use crate::question::Question;
use crate::report::{accuracy_percent, ResultReporter, SessionSummary};
use crate::scheduler::{
    SchedulerSignal, StimulusEvent, StimulusRun, StimulusScheduler, DEFAULT_MIN_WORDS_PER_MINUTE,
};
use crate::timer::TimerToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Ready,
    InitialAnimation,
    Playing,
    Question,
    Prepare,
    Final,
}

/// Timing and limits injected into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub max_attempts: u32,
    pub prepare_dwell_ms: u64,
    pub locator_cadence_ms: u64,
    /// Zero skips the locator cue entirely.
    pub locator_duration_ms: u64,
    pub min_words_per_minute: u32,
    pub option_count: Option<usize>,
    pub start_level: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            prepare_dwell_ms: 800,
            locator_cadence_ms: 150,
            locator_duration_ms: 1_500,
            min_words_per_minute: DEFAULT_MIN_WORDS_PER_MINUTE,
            option_count: None,
            start_level: 0,
        }
    }
}

/// Counters for the session in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRun {
    pub current_index: usize,
    pub attempts_used: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub max_speed_achieved: u32,
}

/// Everything a host needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    LocatorCue {
        position: usize,
    },
    MarkersShown {
        grid_pattern: GridPattern,
        level_index: usize,
    },
    Stimulus(StimulusEvent),
    QuestionAsked {
        prompt: &'static str,
        options: Vec<String>,
    },
    AnswerResolved {
        correct: bool,
        new_index: usize,
        continues: bool,
    },
    Finished(SessionSummary),
}

/// A signal from one of the machine's own timers.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TimerFire {
    Scheduler(SchedulerSignal),
    Dwell(DwellSignal),
}

pub struct SessionStateMachine {
    config: SessionConfig,
    levels: Vec<ExerciseLevel>,
    phase: Phase,
    run: SessionRun,
    ladder: Option<LevelLadder>,
    budget: AttemptBudget,
    scheduler: StimulusScheduler,
    dwell: DwellTimer,
    stimulus_token: Option<TimerToken>,
    dwell_token: Option<TimerToken>,
    display_order: Vec<String>,
    question: Option<Question>,
    locator_shown: bool,
    summary: Option<SessionSummary>,
    rng: StdRng,
    reporter: Box<dyn ResultReporter>,
}

impl SessionStateMachine {
    /// `levels` should already be filtered to one grid pattern. An empty or
    /// malformed list is accepted here and reported by [`Self::start`].
    pub fn new(
        levels: Vec<ExerciseLevel>,
        config: SessionConfig,
        reporter: Box<dyn ResultReporter>,
    ) -> Self {
        Self {
            budget: AttemptBudget::new(config.max_attempts),
            scheduler: StimulusScheduler::new(config.min_words_per_minute),
            config,
            levels,
            phase: Phase::Ready,
            run: SessionRun::default(),
            ladder: None,
            dwell: DwellTimer::new(),
            stimulus_token: None,
            dwell_token: None,
            display_order: Vec::new(),
            question: None,
            locator_shown: false,
            summary: None,
            rng: StdRng::from_entropy(),
            reporter,
        }
    }

    /// Makes word shuffles and option order reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run(&self) -> &SessionRun {
        &self.run
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn budget(&self) -> &AttemptBudget {
        &self.budget
    }

    pub fn ladder(&self) -> Option<&LevelLadder> {
        self.ladder.as_ref()
    }

    pub fn current_level(&self) -> Option<&ExerciseLevel> {
        self.ladder.as_ref().map(LevelLadder::current)
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Word order of the current run, after shuffling.
    pub fn display_order(&self) -> &[String] {
        &self.display_order
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn stimulus_token(&self) -> Option<TimerToken> {
        self.stimulus_token
    }

    pub fn dwell_token(&self) -> Option<TimerToken> {
        self.dwell_token
    }

    /// Earliest instant at which [`Self::tick`] has something to do.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.scheduler.next_deadline(), self.dwell.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begins a session. Ignored unless the machine is `Ready`.
    pub fn start(&mut self, now_ms: u64) -> Result<Vec<SessionEvent>, SessionError> {
        let mut events = Vec::new();
        if self.phase != Phase::Ready {
            debug!(phase = %self.phase, "start ignored outside ready");
            return Ok(events);
        }

        let ladder = match LevelLadder::new(self.levels.clone(), self.config.start_level) {
            Ok(ladder) => ladder,
            Err(err) => {
                warn!("cannot start session: {err}");
                return Err(err);
            }
        };

        self.run = SessionRun {
            current_index: ladder.current_index(),
            max_speed_achieved: ladder.max_speed_achieved(),
            ..SessionRun::default()
        };
        self.budget = AttemptBudget::new(self.config.max_attempts);
        info!(
            levels = ladder.len(),
            start_index = ladder.current_index(),
            max_attempts = self.budget.max_attempts(),
            "session started"
        );
        let grid = ladder.current().grid_pattern;
        self.ladder = Some(ladder);

        if self.config.locator_duration_ms > 0 && !self.locator_shown {
            self.locator_shown = true;
            self.set_phase(Phase::InitialAnimation, &mut events);
            let sweep = Sweep {
                cadence_ms: self.config.locator_cadence_ms,
                total_positions: grid.total_positions(),
            };
            self.dwell_token = Some(self.dwell.arm(
                DwellKind::Locator,
                now_ms,
                self.config.locator_duration_ms,
                Some(sweep),
            ));
        } else {
            self.enter_playing(now_ms, &mut events);
        }

        self.drain_timers(now_ms, &mut events);
        Ok(events)
    }

    /// Fires every timer due at or before `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.drain_timers(now_ms, &mut events);
        events
    }

    /// Delivers one timer signal as if it had just been polled.
    #[cfg(test)]
    fn handle_timer(&mut self, fire: TimerFire, now_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.dispatch(fire, now_ms, &mut events);
        self.drain_timers(now_ms, &mut events);
        events
    }

    /// Answers the open question. Anything but the first answer to a
    /// question is ignored.
    pub fn submit_answer(&mut self, option: &str, now_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase != Phase::Question {
            debug!(phase = %self.phase, "answer ignored outside question");
            return events;
        }
        let Some(question) = self.question.as_mut().filter(|q| !q.is_resolved()) else {
            debug!("duplicate answer ignored");
            return events;
        };
        question.mark_resolved();
        let correct = question.is_correct(option);

        let Some(ladder) = self.ladder.as_mut() else {
            return events;
        };
        self.budget.record();
        let resolution = ladder.resolve(correct);

        self.run.attempts_used = self.budget.attempts_used();
        if correct {
            self.run.correct_count += 1;
        } else {
            self.run.incorrect_count += 1;
        }
        self.run.current_index = resolution.new_index;
        self.run.max_speed_achieved = ladder.max_speed_achieved();

        let continues = resolution.continues && !self.budget.exhausted();
        debug!(
            correct,
            new_index = resolution.new_index,
            attempts = self.run.attempts_used,
            continues,
            "answer resolved"
        );
        events.push(SessionEvent::AnswerResolved {
            correct,
            new_index: resolution.new_index,
            continues,
        });

        if continues {
            self.enter_prepare(now_ms, &mut events);
            self.drain_timers(now_ms, &mut events);
        } else {
            self.finish(&mut events);
        }
        events
    }

    /// Aborts the session in progress, discarding it unreported.
    ///
    /// A no-op when nothing is running; a finished session stays finished
    /// until [`Self::reset`].
    pub fn cancel(&mut self) {
        match self.phase {
            Phase::Ready | Phase::Final => self.cancel_timers(),
            _ => {
                info!(phase = %self.phase, "session cancelled");
                self.reinitialize();
            }
        }
    }

    /// Returns to `Ready` with a fresh session, from any phase.
    pub fn reset(&mut self) {
        debug!(phase = %self.phase, "session reset");
        self.reinitialize();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn set_phase(&mut self, to: Phase, events: &mut Vec<SessionEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        debug!(%from, %to, "phase changed");
        self.phase = to;
        events.push(SessionEvent::PhaseChanged { from, to });
    }

    fn enter_playing(&mut self, now_ms: u64, events: &mut Vec<SessionEvent>) {
        let Some(level) = self.current_level().cloned() else {
            return;
        };
        self.set_phase(Phase::Playing, events);

        let mut order = level.word_sequence.clone();
        order.shuffle(&mut self.rng);
        self.question = Question::for_run(&level, &order, self.config.option_count, &mut self.rng);
        self.display_order = order.clone();

        let run = StimulusRun {
            words: order,
            words_per_minute: level.words_per_minute,
            total_positions: level.grid_pattern.total_positions(),
        };
        self.stimulus_token = Some(self.scheduler.start(run, now_ms));
    }

    fn enter_question(&mut self, events: &mut Vec<SessionEvent>) {
        self.scheduler.cancel();
        self.stimulus_token = None;
        self.set_phase(Phase::Question, events);
        if let Some(question) = &self.question {
            events.push(SessionEvent::QuestionAsked {
                prompt: question.prompt(),
                options: question.options.clone(),
            });
        }
    }

    fn enter_prepare(&mut self, now_ms: u64, events: &mut Vec<SessionEvent>) {
        self.set_phase(Phase::Prepare, events);
        if let Some(ladder) = &self.ladder {
            events.push(SessionEvent::MarkersShown {
                grid_pattern: ladder.current().grid_pattern,
                level_index: ladder.current_index(),
            });
        }
        self.dwell_token = Some(self.dwell.arm(
            DwellKind::Prepare,
            now_ms,
            self.config.prepare_dwell_ms,
            None,
        ));
    }

    fn finish(&mut self, events: &mut Vec<SessionEvent>) {
        self.cancel_timers();
        self.set_phase(Phase::Final, events);

        let grid_pattern = self
            .current_level()
            .map(|level| level.grid_pattern)
            .unwrap_or(GridPattern::new(0, 0));
        let summary = SessionSummary {
            correct_count: self.run.correct_count,
            incorrect_count: self.run.incorrect_count,
            attempts_used: self.run.attempts_used,
            max_speed_achieved: self.run.max_speed_achieved,
            accuracy_percent: accuracy_percent(self.run.correct_count, self.run.incorrect_count),
            grid_pattern,
        };
        info!(
            correct = summary.correct_count,
            incorrect = summary.incorrect_count,
            max_speed = summary.max_speed_achieved,
            accuracy = summary.accuracy_percent,
            "session finished"
        );

        if let Err(err) = self.reporter.report(&summary) {
            warn!("failed to report session result: {err}");
        }
        self.summary = Some(summary.clone());
        events.push(SessionEvent::Finished(summary));
    }

    fn drain_timers(&mut self, now_ms: u64, events: &mut Vec<SessionEvent>) {
        loop {
            let fires: Vec<TimerFire> = self
                .scheduler
                .poll(now_ms)
                .into_iter()
                .map(TimerFire::Scheduler)
                .chain(self.dwell.poll(now_ms).into_iter().map(TimerFire::Dwell))
                .collect();
            if fires.is_empty() {
                break;
            }
            for fire in fires {
                self.dispatch(fire, now_ms, events);
            }
        }
    }

    fn dispatch(&mut self, fire: TimerFire, now_ms: u64, events: &mut Vec<SessionEvent>) {
        match fire {
            TimerFire::Scheduler(signal) => {
                if self.phase != Phase::Playing || self.stimulus_token != Some(signal.token()) {
                    debug!(token = signal.token().value(), "stale stimulus signal ignored");
                    return;
                }
                match signal {
                    SchedulerSignal::Stimulus { event, .. } => {
                        events.push(SessionEvent::Stimulus(event));
                    }
                    SchedulerSignal::Completed { .. } => self.enter_question(events),
                }
            }
            TimerFire::Dwell(signal) => {
                if self.dwell_token != Some(signal.token()) {
                    debug!(token = signal.token().value(), "stale dwell signal ignored");
                    return;
                }
                match signal {
                    DwellSignal::Cue { position, .. } if self.phase == Phase::InitialAnimation => {
                        events.push(SessionEvent::LocatorCue { position });
                    }
                    DwellSignal::Elapsed { kind, .. } => {
                        self.dwell_token = None;
                        match (kind, self.phase) {
                            (DwellKind::Locator, Phase::InitialAnimation)
                            | (DwellKind::Prepare, Phase::Prepare) => {
                                self.enter_playing(now_ms, events);
                            }
                            _ => debug!(%kind, phase = %self.phase, "dwell elapsed out of phase"),
                        }
                    }
                    DwellSignal::Cue { .. } => {}
                }
            }
        }
    }

    fn cancel_timers(&mut self) {
        self.scheduler.cancel();
        self.dwell.cancel();
        self.stimulus_token = None;
        self.dwell_token = None;
    }

    fn reinitialize(&mut self) {
        self.cancel_timers();
        self.phase = Phase::Ready;
        self.run = SessionRun::default();
        self.ladder = None;
        self.budget = AttemptBudget::new(self.config.max_attempts);
        self.display_order.clear();
        self.question = None;
        self.locator_shown = false;
        self.summary = None;
    }
}
