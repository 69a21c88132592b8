//! Parameter sweep expansion.
//!
//! A task sweeps up to three axes (X, Y and Z) over a base workflow document.
//! Each axis holds an ordered list of candidates, and a candidate is a list of
//! parameter overrides addressed by `node_id` + `param_key`. The cartesian
//! product of the non-empty axes gives one task item per combination, and the
//! items are later pivoted back into grids (rows = Y, columns = X, one layer
//! per Z candidate) for display.
//!
//! example axes:
//! ```json
//! {
//!   "x": [[{"node_id": "3", "param_key": "seed", "value": 1}],
//!         [{"node_id": "3", "param_key": "seed", "value": 2}]],
//!   "y": [[{"node_id": "3", "param_key": "cfg", "value": 7.5}]]
//! }
//! ```

use std::collections::HashMap;
use std::io::Write;

use diesel::deserialize::{self, FromSql};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::{deserialize::FromSqlRow, sql_types::Jsonb};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use utoipa::ToSchema;

/// Key under which a workflow node keeps its parameters.
pub const INPUTS_KEY: &str = "inputs";

/// A single parameter override applied to the base document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ParamOverride {
    /// Key of the node in the workflow document (e.g. `"3"`).
    pub node_id: String,
    /// Parameter name inside the node's `inputs` object (e.g. `"seed"`).
    pub param_key: String,
    /// Replacement value, any JSON.
    pub value: Value,
}

/// One candidate on an axis. Several overrides move together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, ToSchema)]
#[serde(transparent)]
pub struct AxisValue(pub Vec<ParamOverride>);

impl AxisValue {
    /// JSON form used to tag task items and to key grid lookups.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|o| {
                    json!({
                        "node_id": o.node_id,
                        "param_key": o.param_key,
                        "value": o.value,
                    })
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// The three sweep axes of a task. Stored as JSONB on the task row.
#[derive(
    AsExpression, FromSqlRow, Debug, Clone, Serialize, Deserialize, PartialEq, Default, ToSchema,
)]
#[diesel(sql_type = Jsonb)]
pub struct Axes {
    #[serde(default)]
    pub x: Vec<AxisValue>,
    #[serde(default)]
    pub y: Vec<AxisValue>,
    #[serde(default)]
    pub z: Vec<AxisValue>,
}

impl Axes {
    pub fn get(&self, axis: Axis) -> &[AxisValue] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn overrides(&self) -> impl Iterator<Item = (Axis, usize, &ParamOverride)> {
        Axis::ALL.into_iter().flat_map(move |axis| {
            self.get(axis)
                .iter()
                .enumerate()
                .flat_map(move |(i, c)| c.0.iter().map(move |o| (axis, i, o)))
        })
    }
}

impl ToSql<Jsonb, Pg> for Axes {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(&[1])?; // JSONB version
        out.write_all(&serde_json::to_vec(&self)?)?;
        Ok(IsNull::No)
    }
}

impl FromSql<Jsonb, Pg> for Axes {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = <Value as FromSql<Jsonb, Pg>>::from_sql(bytes)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CombinationError {
    #[error("workflow document must be a JSON object")]
    InvalidDocument,

    #[error("node '{0}' does not exist in the workflow document")]
    UnknownNode(String),

    #[error("node '{0}' has a non-object '{INPUTS_KEY}' field")]
    InvalidInputs(String),

    #[error("sweep produces {count} items, the limit is {max}")]
    TooManyItems { count: usize, max: usize },
}

/// One selection of at most one candidate per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Combination<'a> {
    pub x: Option<&'a AxisValue>,
    pub y: Option<&'a AxisValue>,
    pub z: Option<&'a AxisValue>,
}

impl<'a> Combination<'a> {
    fn with(mut self, axis: Axis, candidate: &'a AxisValue) -> Self {
        match axis {
            Axis::X => self.x = Some(candidate),
            Axis::Y => self.y = Some(candidate),
            Axis::Z => self.z = Some(candidate),
        }
        self
    }

    /// Selected candidates in application order (X, then Y, then Z).
    pub fn candidates(&self) -> impl Iterator<Item = &'a AxisValue> {
        [self.x, self.y, self.z].into_iter().flatten()
    }
}

/// A concrete task item produced by the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedItem {
    pub position: i32,
    pub params: Value,
    pub x_value: Option<Value>,
    pub y_value: Option<Value>,
    pub z_value: Option<Value>,
}

/// Number of items the axes expand to, `None` on overflow.
pub fn total_combinations(axes: &Axes) -> Option<usize> {
    Axis::ALL
        .iter()
        .map(|a| axes.get(*a).len())
        .filter(|len| *len > 0)
        .try_fold(1usize, |acc, len| acc.checked_mul(len))
}

/// Upper bound on the serialized size of a whole sweep: every item carries
/// the document plus its candidates, once as overrides and once as tags.
/// `None` on overflow.
pub fn estimated_sweep_bytes(document: &Value, axes: &Axes) -> Option<usize> {
    let per_item = Axis::ALL.iter().try_fold(document.to_string().len(), |acc, axis| {
        let widest = axes
            .get(*axis)
            .iter()
            .map(|c| c.to_json().to_string().len())
            .max()
            .unwrap_or(0);
        acc.checked_add(widest.checked_mul(2)?)
    })?;
    total_combinations(axes)?.checked_mul(per_item)
}

/// Cartesian product of the non-empty axes, X outermost.
///
/// Empty axes are skipped rather than contributing an empty element, so with
/// no candidates at all the result is a single empty combination.
pub fn combinations(axes: &Axes) -> Vec<Combination<'_>> {
    let mut acc = vec![Combination::default()];
    for axis in Axis::ALL {
        let candidates = axes.get(axis);
        if candidates.is_empty() {
            continue;
        }
        acc = acc
            .iter()
            .flat_map(|partial| candidates.iter().map(move |c| partial.with(axis, c)))
            .collect();
    }
    acc
}

/// Deep-clone `base` and write every override of the combination into it.
pub fn apply_overrides(
    base: &Value,
    combination: &Combination<'_>,
) -> Result<Value, CombinationError> {
    if !base.is_object() {
        return Err(CombinationError::InvalidDocument);
    }
    let mut doc = base.clone();
    for candidate in combination.candidates() {
        for o in &candidate.0 {
            set_param(&mut doc, o)?;
        }
    }
    Ok(doc)
}

fn set_param(doc: &mut Value, o: &ParamOverride) -> Result<(), CombinationError> {
    let node = doc
        .get_mut(o.node_id.as_str())
        .and_then(Value::as_object_mut)
        .ok_or_else(|| CombinationError::UnknownNode(o.node_id.clone()))?;
    let inputs = node
        .entry(INPUTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    match inputs.as_object_mut() {
        Some(inputs) => {
            inputs.insert(o.param_key.clone(), o.value.clone());
            Ok(())
        }
        None => Err(CombinationError::InvalidInputs(o.node_id.clone())),
    }
}

/// Expand `base` over `axes` into task items, refusing more than `max_items`.
pub fn expand(
    base: &Value,
    axes: &Axes,
    max_items: usize,
) -> Result<Vec<ExpandedItem>, CombinationError> {
    let count = total_combinations(axes).ok_or(CombinationError::TooManyItems {
        count: usize::MAX,
        max: max_items,
    })?;
    if count > max_items {
        return Err(CombinationError::TooManyItems {
            count,
            max: max_items,
        });
    }

    combinations(axes)
        .into_iter()
        .enumerate()
        .map(|(i, combo)| {
            Ok(ExpandedItem {
                position: i as i32,
                params: apply_overrides(base, &combo)?,
                x_value: combo.x.map(AxisValue::to_json),
                y_value: combo.y.map(AxisValue::to_json),
                z_value: combo.z.map(AxisValue::to_json),
            })
        })
        .collect()
}

/// Lookup key of an axis tag: the stringified JSON, `null` when absent.
pub fn axis_key(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => Value::Null.to_string(),
    }
}

/// Index of the first candidate that repeats an earlier one on the same axis.
///
/// Repeated candidates would collide on the grid lookup key.
pub fn find_duplicate_candidate(candidates: &[AxisValue]) -> Option<usize> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .iter()
        .position(|c| !seen.insert(c.to_json().to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridLayer<T> {
    pub z_value: Option<Value>,
    /// `rows[y][x]`
    pub rows: Vec<Vec<Option<T>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultGrid<T> {
    pub x_values: Vec<Option<Value>>,
    pub y_values: Vec<Option<Value>>,
    pub layers: Vec<GridLayer<T>>,
}

fn headers(candidates: &[AxisValue]) -> Vec<Option<Value>> {
    if candidates.is_empty() {
        vec![None]
    } else {
        candidates.iter().map(|c| Some(c.to_json())).collect()
    }
}

/// Pivot tagged items into one grid per Z candidate.
///
/// `tags` returns the `[x, y, z]` values an item was generated from. Cells
/// without a matching item stay empty.
pub fn build_grid<T, F>(axes: &Axes, items: &[T], tags: F) -> ResultGrid<T>
where
    T: Clone,
    F: Fn(&T) -> [Option<&Value>; 3],
{
    let index: HashMap<(String, String, String), &T> = items
        .iter()
        .map(|item| {
            let [x, y, z] = tags(item);
            ((axis_key(x), axis_key(y), axis_key(z)), item)
        })
        .collect();

    let x_values = headers(&axes.x);
    let y_values = headers(&axes.y);
    let z_values = headers(&axes.z);

    let x_keys: Vec<String> = x_values.iter().map(|v| axis_key(v.as_ref())).collect();
    let y_keys: Vec<String> = y_values.iter().map(|v| axis_key(v.as_ref())).collect();

    let layers = z_values
        .into_iter()
        .map(|z_value| {
            let z_key = axis_key(z_value.as_ref());
            let rows = y_keys
                .iter()
                .map(|y_key| {
                    x_keys
                        .iter()
                        .map(|x_key| {
                            index
                                .get(&(x_key.clone(), y_key.clone(), z_key.clone()))
                                .map(|item| (*item).clone())
                        })
                        .collect()
                })
                .collect();
            GridLayer { z_value, rows }
        })
        .collect();

    ResultGrid {
        x_values,
        y_values,
        layers,
    }
}
