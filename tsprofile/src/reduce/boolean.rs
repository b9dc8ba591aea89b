//! Interval encoding of boolean signals.
//!
//! Booleans collapse like scalars, but every kept sample becomes an annotated
//! [`BooleanEvent`] and the final run is always closed: the last sample of the
//! series is emitted even when it does not change the value, so the hover text
//! can state how long the final state held.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::run::{RunCollapser, RunEvent, Sample};
use crate::error::{ProfileError, Result};

/// Vertical distance between a column's true-lane and false-lane markers.
pub const FALSE_LANE_OFFSET: f64 = 0.3;

/// Where a boolean value is drawn relative to its lane position.
pub fn lane_offset(value: bool, lane: f64) -> f64 {
    if value {
        lane
    } else {
        lane + FALSE_LANE_OFFSET
    }
}

/// Role of an event in the encoded series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    RunEnd,
    Change,
}

/// One kept sample of a boolean signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanEvent {
    /// Sample time in milliseconds
    pub time: i64,
    /// Value active from this event on
    pub value: bool,
    /// Vertical display position: the lane for `true`, lane + 0.3 for `false`
    pub offset: f64,
    pub kind: EventKind,
    pub annotation: String,
}

impl BooleanEvent {
    /// Position on the true lane, or `None` when the event is on the false lane.
    pub fn true_lane(&self) -> Option<f64> {
        self.value.then_some(self.offset)
    }

    /// Position on the false lane, or `None` when the event is on the true lane.
    pub fn false_lane(&self) -> Option<f64> {
        (!self.value).then_some(self.offset)
    }

    /// Moves the event to another lane position.
    pub fn relocate(&mut self, lane: f64) {
        self.offset = lane_offset(self.value, lane);
    }
}

fn seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

fn annotate(column: &str, event: &RunEvent<bool>) -> (EventKind, String) {
    match event {
        RunEvent::Start(sample) => (
            EventKind::Start,
            format!("{column} started out as {}", sample.value),
        ),
        RunEvent::RunEnd { sample, run_start } => (
            EventKind::RunEnd,
            format!(
                "{column} was {} until after T+{:.3}s for at least {:.3}s",
                sample.value,
                seconds(sample.time),
                seconds(sample.time - run_start)
            ),
        ),
        RunEvent::Change { sample, run_start } => (
            EventKind::Change,
            format!(
                "{column} became {} before T+{:.3}s after being {} for {:.3}s",
                sample.value,
                seconds(sample.time),
                !sample.value,
                seconds(sample.time - run_start)
            ),
        ),
    }
}

/// Encodes a boolean signal as annotated transition events.
///
/// `column` names the signal in annotations; `lane` is the vertical position
/// of the column's true-lane (its false-lane sits 0.3 below it).
///
/// ```rust
/// use tsprofile::reduce::{reduce_boolean, EventKind};
///
/// let events = reduce_boolean("armed", &[0, 1, 2], &[true, false, false], -1.0).unwrap();
/// let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
/// assert_eq!(kinds, vec![EventKind::Start, EventKind::Change, EventKind::RunEnd]);
/// assert_eq!(events[0].annotation, "armed started out as true");
/// ```
pub fn reduce_boolean(
    column: &str,
    timestamps: &[i64],
    values: &[bool],
    lane: f64,
) -> Result<Vec<BooleanEvent>> {
    if timestamps.len() != values.len() {
        return Err(ProfileError::invalid_input(format!(
            "{} timestamps for {} values of '{column}'",
            timestamps.len(),
            values.len()
        )));
    }

    let mut collapser = RunCollapser::new();
    let mut runs = Vec::new();
    for (time, value) in timestamps.iter().zip(values) {
        collapser.push(Sample::new(*time, *value), &mut runs);
    }
    // the final run is always closed
    runs.extend(collapser.finish());

    let events: Vec<BooleanEvent> = runs
        .iter()
        .map(|run| {
            let (kind, annotation) = annotate(column, run);
            let sample = run.sample();
            BooleanEvent {
                time: sample.time,
                value: sample.value,
                offset: lane_offset(sample.value, lane),
                kind,
                annotation,
            }
        })
        .collect();

    debug!(
        column,
        original = values.len(),
        reduced = events.len(),
        "Reduced boolean trace"
    );
    Ok(events)
}
