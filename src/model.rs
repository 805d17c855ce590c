//! The task hierarchy and column declarations a board is built from.
//!
//! A [`TaskHierarchy`] is the local, pre-remote picture of the board: an
//! ordered list of [`Group`]s, each an ordered list of [`Item`]s with a task
//! name and a time estimate in days. Its JSON form is the wire format shared
//! by the planner, the CLI's `--from-json` input, and library callers:
//!
//! ```json
//! [
//!   { "group": "Authentication",
//!     "items": [ { "task": "Add login form", "time_estimation_AI": 0.5 } ] }
//! ]
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Smallest realistic estimate, in days.
pub const ESTIMATE_MIN: f64 = 0.25;
/// Largest realistic estimate, in days.
pub const ESTIMATE_MAX: f64 = 3.0;

/// Title of the numeric column every item populates.
pub const DEFAULT_ESTIMATE_COLUMN: &str = "Time Estimation AI";

/// Ordered groups of estimated tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHierarchy {
    pub groups: Vec<Group>,
}

/// A named subdivision of the board. Names need not be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "group", alias = "name")]
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// A single task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub task: String,

    /// Estimated effort in days.
    #[serde(
        rename = "time_estimation_AI",
        deserialize_with = "deserialize_estimate"
    )]
    pub estimate: f64,

    /// Values for extra columns, keyed by column title.
    ///
    /// Titles that have no column on the board are left out of the item
    /// payload rather than sent against a missing column.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_values: BTreeMap<String, serde_json::Value>,
}

impl Item {
    pub fn new(task: impl Into<String>, estimate: f64) -> Self {
        Self {
            task: task.into(),
            estimate,
            column_values: BTreeMap::new(),
        }
    }

    /// Attach a value for the extra column titled `title`.
    pub fn with_column_value(mut self, title: impl Into<String>, value: serde_json::Value) -> Self {
        self.column_values.insert(title.into(), value);
        self
    }
}

impl Group {
    pub fn new(name: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

impl TaskHierarchy {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// Parse the JSON array form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of items across all groups.
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    /// Number of groups that will become remote groups.
    pub fn populated_group_count(&self) -> usize {
        self.groups.iter().filter(|g| !g.items.is_empty()).count()
    }

    /// Sum of all estimates, in days.
    pub fn total_estimate(&self) -> f64 {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter())
            .map(|i| i.estimate)
            .sum()
    }

    /// Check the structural invariants a caller-supplied hierarchy must hold.
    ///
    /// The synchronizer re-checks the first-group rule itself; this method
    /// additionally rejects blank tasks and estimates outside
    /// [`ESTIMATE_MIN`]..=[`ESTIMATE_MAX`].
    pub fn validate(&self) -> Result<(), String> {
        let first = self
            .groups
            .first()
            .ok_or_else(|| "hierarchy has no groups".to_string())?;
        if first.items.is_empty() {
            return Err(format!("first group '{}' has no items", first.name));
        }
        for group in &self.groups {
            for item in &group.items {
                if item.task.trim().is_empty() {
                    return Err(format!("group '{}' contains an item with an empty task", group.name));
                }
                if !item.estimate.is_finite()
                    || item.estimate < ESTIMATE_MIN
                    || item.estimate > ESTIMATE_MAX
                {
                    return Err(format!(
                        "task '{}' has estimate {} outside {}–{} days",
                        item.task, item.estimate, ESTIMATE_MIN, ESTIMATE_MAX
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Parse an estimate from a number or a numeric string such as `"0.5"` or
/// `"1.5 days"`.
pub fn parse_estimate(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            let numeric: String = s
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            numeric.parse::<f64>().ok()
        }
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn deserialize_estimate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    parse_estimate(&value)
        .ok_or_else(|| de::Error::custom(format!("invalid time estimate: {value}")))
}

// ── Columns ──────────────────────────────────────────────────────────────

/// Remote column types this crate knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numbers,
    Status,
    Text,
    LongText,
    People,
    Timeline,
    Date,
    Dropdown,
    Checkbox,
}

impl ColumnKind {
    /// The GraphQL `ColumnType` enum value.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ColumnKind::Numbers => "numbers",
            ColumnKind::Status => "status",
            ColumnKind::Text => "text",
            ColumnKind::LongText => "long_text",
            ColumnKind::People => "people",
            ColumnKind::Timeline => "timeline",
            ColumnKind::Date => "date",
            ColumnKind::Dropdown => "dropdown",
            ColumnKind::Checkbox => "checkbox",
        }
    }
}

/// A non-default column the board must have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub title: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: ColumnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Status labels keyed by their short code (`"0"`, `"1"`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl ColumnSpec {
    pub fn new(title: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            title: title.into(),
            kind,
            description: None,
            labels: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = Some(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Column defaults sent on creation. Only status columns with labels
    /// carry any.
    pub fn defaults(&self) -> Option<ColumnDefaults> {
        match (&self.kind, &self.labels) {
            (ColumnKind::Status, Some(labels)) if !labels.is_empty() => Some(ColumnDefaults {
                labels: labels.clone(),
            }),
            _ => None,
        }
    }
}

/// The `defaults` payload of a created column: `{"labels": {"0": "Critical"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefaults {
    pub labels: BTreeMap<String, String>,
}

/// Extra columns used when the caller declares none of their own.
pub fn default_extra_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("Person", ColumnKind::People),
        ColumnSpec::new("Status", ColumnKind::Status),
        ColumnSpec::new("Priority", ColumnKind::Status)
            .with_description("This column indicates the urgency level")
            .with_labels([("0", "Critical"), ("1", "High"), ("2", "Medium"), ("3", "Low")]),
        ColumnSpec::new("Sprint", ColumnKind::Text),
        ColumnSpec::new("Timeline", ColumnKind::Timeline),
        ColumnSpec::new("Actual Time", ColumnKind::Numbers),
        ColumnSpec::new("Actual Timeline", ColumnKind::Timeline),
    ]
}

/// Column title → remote column id, for one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnRegistry {
    columns: HashMap<String, String>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, title: impl Into<String>, id: impl Into<String>) {
        self.columns.insert(title.into(), id.into());
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.columns.get(title).map(String::as_str)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.columns.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}
