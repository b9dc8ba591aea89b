//! Plottable traces and summary tables handed to renderers.
//!
//! Nothing here knows about a concrete plotting library: traces are plain
//! serializable structs with times in seconds, ready for any charting
//! front end.

use serde::{Deserialize, Serialize};

use crate::classifier::{Category, ColumnRecord};
use crate::reduce::{BooleanEvent, Sample};
use crate::table::Value;

/// Number of scalar traces visible before the rest drop to legend-only.
pub const DEFAULT_MAX_VISIBLE_TRACES: usize = 3;

/// Suffix of the false-lane trace of a boolean signal.
pub const FALSE_LANE_SUFFIX: &str = "-False";

/// Pixel height reserved per boolean signal by typical renderers.
pub const BOOLEAN_ROW_HEIGHT_PX: usize = 34;

fn seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarPoint {
    /// Time in seconds
    pub t: f64,
    pub value: Value,
}

/// Reduced trace of a scalar signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarTrace {
    /// `column(file)`
    pub name: String,
    pub original_len: usize,
    pub points: Vec<ScalarPoint>,
    /// Initially visible; otherwise shown in the legend only
    pub visible: bool,
}

impl ScalarTrace {
    pub fn from_samples(name: impl Into<String>, original_len: usize, samples: Vec<Sample<Value>>) -> Self {
        Self {
            name: name.into(),
            original_len,
            points: samples
                .into_iter()
                .map(|s| ScalarPoint {
                    t: seconds(s.time),
                    value: s.value,
                })
                .collect(),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanePoint {
    /// Time in seconds
    pub t: f64,
    /// Lane position, or `None` where the other lane is active
    pub y: Option<f64>,
    pub text: String,
}

/// One of the two parallel lanes of a boolean trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneTrace {
    pub name: String,
    pub points: Vec<LanePoint>,
}

/// Reduced trace of a boolean signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanTrace {
    /// `column(file)`
    pub name: String,
    pub original_len: usize,
    /// Position of the true-lane
    pub lane: f64,
    pub events: Vec<BooleanEvent>,
}

impl BooleanTrace {
    pub fn new(name: impl Into<String>, original_len: usize, lane: f64, events: Vec<BooleanEvent>) -> Self {
        Self {
            name: name.into(),
            original_len,
            lane,
            events,
        }
    }

    /// Moves the trace to another lane position.
    pub fn at_lane(mut self, lane: f64) -> Self {
        self.lane = lane;
        for event in &mut self.events {
            event.relocate(lane);
        }
        self
    }

    /// Splits the events into the true-lane and the false-lane trace.
    ///
    /// Both lanes share every timestamp; the inactive lane holds `None` there so
    /// renderers never connect the two across a transition.
    pub fn lanes(&self) -> (LaneTrace, LaneTrace) {
        let lane = |select: fn(&BooleanEvent) -> Option<f64>| -> Vec<LanePoint> {
            self.events
                .iter()
                .map(|e| LanePoint {
                    t: seconds(e.time),
                    y: select(e),
                    text: e.annotation.clone(),
                })
                .collect()
        };

        (
            LaneTrace {
                name: self.name.clone(),
                points: lane(BooleanEvent::true_lane),
            },
            LaneTrace {
                name: format!("{}{FALSE_LANE_SUFFIX}", self.name),
                points: lane(BooleanEvent::false_lane),
            },
        )
    }
}

/// The two rendering groups of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderGroups {
    pub scalar: Vec<ScalarTrace>,
    pub boolean: Vec<BooleanTrace>,
}

impl RenderGroups {
    /// Lays out traces collected across files.
    ///
    /// The first `max_visible` scalar traces start visible. The i-th boolean
    /// trace gets lane `-(i + 1)`.
    pub fn assemble(
        scalar: Vec<ScalarTrace>,
        boolean: Vec<BooleanTrace>,
        max_visible: usize,
    ) -> Self {
        let scalar = scalar
            .into_iter()
            .enumerate()
            .map(|(i, mut trace)| {
                trace.visible = i < max_visible;
                trace
            })
            .collect();
        let boolean = boolean
            .into_iter()
            .enumerate()
            .map(|(i, trace)| trace.at_lane(-(i as f64) - 1.0))
            .collect();

        Self { scalar, boolean }
    }

    pub fn boolean_plot_height_px(&self) -> usize {
        self.boolean.len() * BOOLEAN_ROW_HEIGHT_PX
    }
}

/// Column records split by category, one table per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTables {
    pub constant: Vec<ColumnRecord>,
    pub boolean: Vec<ColumnRecord>,
    pub state: Vec<ColumnRecord>,
    pub scalar: Vec<ColumnRecord>,
}

impl SummaryTables {
    pub fn from_records(records: &[ColumnRecord]) -> Self {
        let mut tables = Self::default();
        for record in records {
            let table = match record.category() {
                Category::Constant => &mut tables.constant,
                Category::Boolean => &mut tables.boolean,
                Category::State => &mut tables.state,
                Category::Scalar => &mut tables.scalar,
            };
            table.push(record.clone());
        }
        tables
    }

    pub fn table(&self, category: Category) -> &[ColumnRecord] {
        match category {
            Category::Constant => &self.constant,
            Category::Boolean => &self.boolean,
            Category::State => &self.state,
            Category::Scalar => &self.scalar,
        }
    }
}
