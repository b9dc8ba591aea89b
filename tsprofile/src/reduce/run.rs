//! Run-collapsing state machine shared by the scalar and boolean reducers.
//!
//! A run is a maximal stretch of consecutive samples holding the same value.
//! The collapser only keeps the samples needed to redraw each run as a flat
//! segment: the first sample of a run, and the last sample of a run that is
//! longer than one sample (emitted lazily, once the next run begins).
//!
//! ```text
//!            same value             same value
//!   Fresh ──────────────▶ Tracking ───────────▶ PendingFlush ──┐ same value
//!     │ first sample        ▲  │ new value          │  ▲───────┘
//!     │ (emit Start)        │  │ (emit Change)      │ new value
//!     └─────────────────────┘◀─┘                    │ (emit RunEnd, Change)
//!                           ▲───────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// One timestamped sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    pub time: i64,
    pub value: T,
}

impl<T> Sample<T> {
    pub fn new(time: i64, value: T) -> Self {
        Self { time, value }
    }
}

/// What the collapser emits.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent<T> {
    /// First sample of the series.
    Start(Sample<T>),
    /// Last sample of a run spanning more than one sample.
    RunEnd { sample: Sample<T>, run_start: i64 },
    /// First sample of a new run; `run_start` is when the run it ends began.
    Change { sample: Sample<T>, run_start: i64 },
}

impl<T> RunEvent<T> {
    pub fn sample(&self) -> &Sample<T> {
        match self {
            RunEvent::Start(sample)
            | RunEvent::RunEnd { sample, .. }
            | RunEvent::Change { sample, .. } => sample,
        }
    }

    pub fn into_sample(self) -> Sample<T> {
        match self {
            RunEvent::Start(sample)
            | RunEvent::RunEnd { sample, .. }
            | RunEvent::Change { sample, .. } => sample,
        }
    }
}

/// Observable phase of the collapser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fresh,
    Tracking,
    PendingFlush,
}

#[derive(Debug, Clone)]
enum RunState<T> {
    Fresh,
    Tracking { last: Sample<T>, run_start: i64 },
    PendingFlush { last: Sample<T>, run_start: i64 },
}

/// Explicit {fresh, tracking-run, pending-flush} state machine.
#[derive(Debug, Clone)]
pub struct RunCollapser<T> {
    state: RunState<T>,
}

impl<T: Clone + PartialEq> RunCollapser<T> {
    pub fn new() -> Self {
        Self {
            state: RunState::Fresh,
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self.state {
            RunState::Fresh => RunPhase::Fresh,
            RunState::Tracking { .. } => RunPhase::Tracking,
            RunState::PendingFlush { .. } => RunPhase::PendingFlush,
        }
    }

    /// Feeds the next sample, appending zero, one or two events to `out`.
    pub fn push(&mut self, sample: Sample<T>, out: &mut Vec<RunEvent<T>>) {
        let state = std::mem::replace(&mut self.state, RunState::Fresh);
        self.state = match state {
            RunState::Fresh => {
                out.push(RunEvent::Start(sample.clone()));
                RunState::Tracking {
                    run_start: sample.time,
                    last: sample,
                }
            }
            RunState::Tracking { last, run_start } => {
                if sample.value == last.value {
                    RunState::PendingFlush {
                        last: sample,
                        run_start,
                    }
                } else {
                    out.push(RunEvent::Change {
                        sample: sample.clone(),
                        run_start,
                    });
                    RunState::Tracking {
                        run_start: sample.time,
                        last: sample,
                    }
                }
            }
            RunState::PendingFlush { last, run_start } => {
                if sample.value == last.value {
                    RunState::PendingFlush {
                        last: sample,
                        run_start,
                    }
                } else {
                    out.push(RunEvent::RunEnd {
                        sample: last,
                        run_start,
                    });
                    out.push(RunEvent::Change {
                        sample: sample.clone(),
                        run_start,
                    });
                    RunState::Tracking {
                        run_start: sample.time,
                        last: sample,
                    }
                }
            }
        };
    }

    /// Ends the series. Returns the held last sample if the final run was
    /// never closed.
    pub fn finish(self) -> Option<RunEvent<T>> {
        match self.state {
            RunState::PendingFlush { last, run_start } => Some(RunEvent::RunEnd {
                sample: last,
                run_start,
            }),
            RunState::Fresh | RunState::Tracking { .. } => None,
        }
    }
}

impl<T: Clone + PartialEq> Default for RunCollapser<T> {
    fn default() -> Self {
        Self::new()
    }
}
