//! Display reduction of raw sample sequences.
//!
//! - [`reduce_scalar`] keeps the minimal point set that redraws a step function.
//! - [`reduce_boolean`] turns a boolean signal into annotated transition events
//!   laid out on a true-lane and a false-lane.
//!
//! Both drive the same [`RunCollapser`] state machine.

pub mod boolean;
pub mod run;
pub mod scalar;

pub use boolean::{lane_offset, reduce_boolean, BooleanEvent, EventKind, FALSE_LANE_OFFSET};
pub use run::{RunCollapser, RunEvent, RunPhase, Sample};
pub use scalar::reduce_scalar;
