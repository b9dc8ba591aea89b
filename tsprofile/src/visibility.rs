//! Visibility decisions for scalar signals.
//!
//! After a column is classified as scalar, a [`VisibilityPolicy`] decides
//! whether its reduced trace is plotted. The policy is an ordered list of
//! named [`VisibilityRule`]s evaluated until the first one hides the column.
//! Hidden columns keep all their statistics; only the trace is withheld.
//!
//! ```rust
//! use tsprofile::visibility::{VisibilityInput, VisibilityPolicy, Visibility};
//!
//! let policy = VisibilityPolicy::standard(["GpsTime"], ["rx_delay"], 3);
//!
//! let input = VisibilityInput {
//!     file: "can",
//!     column: "wheel_speed",
//!     changed_percent: 40,
//! };
//! assert_eq!(policy.decide(&input), Visibility::Shown);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scalars changing in fewer percent of their samples are hidden by default.
pub const DEFAULT_MIN_CHANGE_PERCENT: u32 = 3;

/// Why a scalar column was hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HiddenReason {
    BelowChangeThreshold { changed_percent: u32, threshold: u32 },
    OnNameDenylist,
    OnFileDenylist,
}

impl fmt::Display for HiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HiddenReason::BelowChangeThreshold { threshold, .. } => {
                write!(f, "No, differs less than {threshold} percent of the time")
            }
            HiddenReason::OnNameDenylist => write!(f, "No, variable on hide list"),
            HiddenReason::OnFileDenylist => write!(f, "No, file on hide list"),
        }
    }
}

/// Whether a scalar trace is emitted for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Shown,
    Hidden(HiddenReason),
}

impl Visibility {
    pub fn is_shown(&self) -> bool {
        matches!(self, Visibility::Shown)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Shown => write!(f, "Yes"),
            Visibility::Hidden(reason) => write!(f, "{reason}"),
        }
    }
}

/// What a rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityInput<'a> {
    pub file: &'a str,
    pub column: &'a str,
    pub changed_percent: u32,
}

/// A single hide rule.
pub trait VisibilityRule: Send + Sync + fmt::Debug {
    /// Returns the reason to hide the column, or `None` to defer to later rules.
    fn evaluate(&self, input: &VisibilityInput<'_>) -> Option<HiddenReason>;

    fn name(&self) -> &str;
}

/// Hides every column of the listed files.
#[derive(Debug, Clone, Default)]
pub struct FileDenylistRule {
    files: BTreeSet<String>,
}

impl FileDenylistRule {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

impl VisibilityRule for FileDenylistRule {
    fn evaluate(&self, input: &VisibilityInput<'_>) -> Option<HiddenReason> {
        self.files
            .contains(input.file)
            .then_some(HiddenReason::OnFileDenylist)
    }

    fn name(&self) -> &str {
        "file-denylist"
    }
}

/// Hides the listed column names in any file.
#[derive(Debug, Clone, Default)]
pub struct NameDenylistRule {
    columns: BTreeSet<String>,
}

impl NameDenylistRule {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl VisibilityRule for NameDenylistRule {
    fn evaluate(&self, input: &VisibilityInput<'_>) -> Option<HiddenReason> {
        self.columns
            .contains(input.column)
            .then_some(HiddenReason::OnNameDenylist)
    }

    fn name(&self) -> &str {
        "name-denylist"
    }
}

/// Hides signals that change in fewer than `min_change_percent` percent of rows.
#[derive(Debug, Clone)]
pub struct ChangeThresholdRule {
    min_change_percent: u32,
}

impl ChangeThresholdRule {
    pub fn new(min_change_percent: u32) -> Self {
        Self { min_change_percent }
    }
}

impl VisibilityRule for ChangeThresholdRule {
    fn evaluate(&self, input: &VisibilityInput<'_>) -> Option<HiddenReason> {
        (input.changed_percent < self.min_change_percent).then_some(
            HiddenReason::BelowChangeThreshold {
                changed_percent: input.changed_percent,
                threshold: self.min_change_percent,
            },
        )
    }

    fn name(&self) -> &str {
        "change-threshold"
    }
}

/// Ordered hide rules; the first rule that matches wins.
#[derive(Debug, Default)]
pub struct VisibilityPolicy {
    rules: Vec<Box<dyn VisibilityRule>>,
}

impl VisibilityPolicy {
    /// Creates a policy without rules; every column is shown.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The default rule order: file denylist, name denylist, change threshold.
    pub fn standard<F, C, S1, S2>(hidden_files: F, hidden_columns: C, min_change_percent: u32) -> Self
    where
        F: IntoIterator<Item = S1>,
        C: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::new()
            .add_rule(Box::new(FileDenylistRule::new(hidden_files)))
            .add_rule(Box::new(NameDenylistRule::new(hidden_columns)))
            .add_rule(Box::new(ChangeThresholdRule::new(min_change_percent)))
    }

    /// Appends a rule, evaluated after all existing ones.
    pub fn add_rule(mut self, rule: Box<dyn VisibilityRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn decide(&self, input: &VisibilityInput<'_>) -> Visibility {
        for rule in &self.rules {
            if let Some(reason) = rule.evaluate(input) {
                debug!(
                    file = input.file,
                    column = input.column,
                    rule = rule.name(),
                    "Scalar column hidden"
                );
                return Visibility::Hidden(reason);
            }
        }
        Visibility::Shown
    }
}
