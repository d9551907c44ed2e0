//! Fixed-duration pauses between runs.
//!
//! A single slot: arming a new dwell replaces whatever was pending. The
//! locator dwell additionally sweeps a cue across the grid at its own
//! cadence so the learner knows where to look before the first run.

use tracing::debug;

use crate::timer::{Generation, TimerToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DwellKind {
    /// Once per session, before the first run.
    Locator,
    /// Between runs, showing the next level's position markers.
    Prepare,
}

/// Cadence of the locator cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    pub cadence_ms: u64,
    pub total_positions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DwellSignal {
    Cue {
        token: TimerToken,
        position: usize,
    },
    Elapsed {
        token: TimerToken,
        kind: DwellKind,
    },
}

impl DwellSignal {
    pub fn token(&self) -> TimerToken {
        match self {
            DwellSignal::Cue { token, .. } | DwellSignal::Elapsed { token, .. } => *token,
        }
    }
}

#[derive(Debug)]
struct Pending {
    token: TimerToken,
    kind: DwellKind,
    started_at_ms: u64,
    ends_at_ms: u64,
    sweep: Option<Sweep>,
    next_cue: u64,
}

impl Pending {
    fn next_cue_at(&self) -> Option<u64> {
        let sweep = self.sweep?;
        let at = self
            .started_at_ms
            .saturating_add(self.next_cue.saturating_mul(sweep.cadence_ms.max(1)));
        (at < self.ends_at_ms).then_some(at)
    }
}

#[derive(Debug, Default)]
pub struct DwellTimer {
    generation: Generation,
    pending: Option<Pending>,
}

impl DwellTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a dwell of `duration_ms` starting at `now_ms`.
    pub fn arm(
        &mut self,
        kind: DwellKind,
        now_ms: u64,
        duration_ms: u64,
        sweep: Option<Sweep>,
    ) -> TimerToken {
        self.cancel();
        let token = self.generation.next_token();
        debug!(token = token.value(), %kind, duration_ms, "dwell armed");
        self.pending = Some(Pending {
            token,
            kind,
            started_at_ms: now_ms,
            ends_at_ms: now_ms.saturating_add(duration_ms),
            sweep: sweep.filter(|s| s.total_positions > 0),
            next_cue: 0,
        });
        token
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(token = pending.token.value(), kind = %pending.kind, "dwell cancelled");
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    pub fn active_token(&self) -> Option<TimerToken> {
        self.pending.as_ref().map(|p| p.token)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        let pending = self.pending.as_ref()?;
        Some(
            pending
                .next_cue_at()
                .map_or(pending.ends_at_ms, |cue| cue.min(pending.ends_at_ms)),
        )
    }

    /// Cues due before `now_ms`, followed by `Elapsed` once the dwell is over.
    pub fn poll(&mut self, now_ms: u64) -> Vec<DwellSignal> {
        let mut signals = Vec::new();
        let Some(pending) = self.pending.as_mut() else {
            return signals;
        };

        while let Some(at) = pending.next_cue_at() {
            if at > now_ms {
                break;
            }
            let total = pending.sweep.map_or(1, |s| s.total_positions);
            signals.push(DwellSignal::Cue {
                token: pending.token,
                position: (pending.next_cue as usize) % total,
            });
            pending.next_cue += 1;
        }

        if pending.ends_at_ms <= now_ms {
            signals.push(DwellSignal::Elapsed {
                token: pending.token,
                kind: pending.kind,
            });
            self.pending = None;
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue_positions(signals: &[DwellSignal]) -> Vec<usize> {
        signals
            .iter()
            .filter_map(|s| match s {
                DwellSignal::Cue { position, .. } => Some(*position),
                DwellSignal::Elapsed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn prepare_elapses_after_duration() {
        let mut dwell = DwellTimer::new();
        let token = dwell.arm(DwellKind::Prepare, 1_000, 800, None);

        assert!(dwell.poll(1_799).is_empty());
        assert_eq!(dwell.next_deadline(), Some(1_800));
        assert_eq!(
            dwell.poll(1_800),
            vec![DwellSignal::Elapsed {
                token,
                kind: DwellKind::Prepare
            }]
        );
        assert!(dwell.is_idle());
        assert!(dwell.poll(5_000).is_empty());
    }

    #[test]
    fn locator_sweeps_positions_until_duration() {
        let mut dwell = DwellTimer::new();
        let sweep = Sweep {
            cadence_ms: 100,
            total_positions: 4,
        };
        dwell.arm(DwellKind::Locator, 0, 550, Some(sweep));

        let first = dwell.poll(0);
        assert_eq!(cue_positions(&first), vec![0]);
        assert_eq!(dwell.next_deadline(), Some(100));

        let rest = dwell.poll(550);
        assert_eq!(cue_positions(&rest), vec![1, 2, 3, 0, 1]);
        assert!(matches!(
            rest.last(),
            Some(DwellSignal::Elapsed {
                kind: DwellKind::Locator,
                ..
            })
        ));
    }

    #[test]
    fn rearming_replaces_pending_dwell() {
        let mut dwell = DwellTimer::new();
        let old = dwell.arm(DwellKind::Prepare, 0, 800, None);
        let new = dwell.arm(DwellKind::Prepare, 100, 800, None);
        assert_ne!(old, new);

        assert!(dwell.poll(800).is_empty());
        let signals = dwell.poll(900);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].token(), new);
    }

    #[test]
    fn cancel_twice_is_harmless() {
        let mut dwell = DwellTimer::new();
        dwell.cancel();
        dwell.arm(DwellKind::Prepare, 0, 10, None);
        dwell.cancel();
        dwell.cancel();
        assert!(dwell.poll(1_000).is_empty());
        assert_eq!(dwell.next_deadline(), None);
    }

    #[test]
    fn zero_duration_elapses_immediately() {
        let mut dwell = DwellTimer::new();
        dwell.arm(DwellKind::Prepare, 42, 0, None);
        assert_eq!(dwell.poll(42).len(), 1);
    }

    #[test]
    fn huge_duration_does_not_wrap() {
        let mut dwell = DwellTimer::new();
        let sweep = Sweep {
            cadence_ms: u64::MAX / 2,
            total_positions: 4,
        };
        dwell.arm(DwellKind::Locator, 1_000, u64::MAX, Some(sweep));
        assert_eq!(dwell.next_deadline(), Some(1_000));

        let signals = dwell.poll(1_000_000);
        assert_eq!(signals.len(), 1);
        assert!(matches!(signals[0], DwellSignal::Cue { position: 0, .. }));
        assert!(!dwell.is_idle());
        assert_eq!(dwell.next_deadline(), Some(1_000 + u64::MAX / 2));
    }
}
