//! Deterministic pack-sequence ordering of placed items.
//!
//! The comparator works in priority order:
//! 1. the two primary axes given by [`SortOrder`];
//! 2. the depth axis `z`, weighted by the door direction (`front` reverses it);
//! 3. the pack index when LIFO sequencing is enabled (missing index last);
//! 4. input order (the sort is stable).
//!
//! Ordering never fails. Unknown configuration values fall back to the
//! defaults and coordinates that are not numbers sort after all others.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

use crate::types::{PackSequenced, Positioned, Vec3};

/// Priority of the two primary axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "x>y>z")]
    Xyz,
    #[serde(rename = "y>x>z")]
    Yxz,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xyz => "x>y>z",
            Self::Yxz => "y>x>z",
        }
    }

    /// Parses a sort order, falling back to `x>y>z` for anything unknown.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x>y>z" => Self::Xyz,
            "y>x>z" => Self::Yxz,
            other => {
                warn!(value = other, "unrecognized sort order, using x>y>z");
                Self::Xyz
            }
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// Side of the container the door opens on.
///
/// Only `front` changes the comparator; `left` and `right` are accepted and
/// behave like `back`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DoorDirection {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

impl DoorDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parses a door direction. Unknown values are treated as a non-front
    /// side (`back`).
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "front" => Self::Front,
            "back" => Self::Back,
            "left" => Self::Left,
            "right" => Self::Right,
            other => {
                warn!(value = other, "unrecognized door direction, treating as back");
                Self::Back
            }
        }
    }

    /// Multiplier applied to `z` in the depth comparison.
    pub fn depth_weight(&self) -> f64 {
        match self {
            Self::Front => -1.0,
            Self::Back | Self::Left | Self::Right => 1.0,
        }
    }
}

impl fmt::Display for DoorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DoorDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// Ordering configuration. Absent fields take their defaults
/// (`x>y>z`, `front`, LIFO off).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderingConfig {
    #[schema(value_type = String, example = "x>y>z")]
    pub sort_order: SortOrder,
    #[schema(value_type = String, example = "front")]
    pub door_direction: DoorDirection,
    pub lifo_enabled: bool,
}

impl OrderingConfig {
    pub fn builder() -> OrderingConfigBuilder {
        OrderingConfigBuilder::default()
    }
}

/// Builder for [`OrderingConfig`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderingConfigBuilder {
    config: OrderingConfig,
}

impl OrderingConfigBuilder {
    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.config.sort_order = sort_order;
        self
    }

    pub fn door_direction(mut self, door_direction: DoorDirection) -> Self {
        self.config.door_direction = door_direction;
        self
    }

    pub fn lifo_enabled(mut self, enabled: bool) -> Self {
        self.config.lifo_enabled = enabled;
        self
    }

    pub fn build(self) -> OrderingConfig {
        self.config
    }
}

/// An item placed in a container.
///
/// `metadata` is carried through ordering untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"id": "crate-7", "position": {"x": 0.0, "y": 0.0, "z": 5.0}, "packIndex": 3}))]
pub struct PlacedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object, nullable = true)]
    pub id: Option<Value>,
    pub position: Vec3,
    /// Any number is accepted; anything else counts as missing.
    #[serde(
        default,
        deserialize_with = "lenient_pack_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub pack_index: Option<f64>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

impl PlacedItem {
    pub fn new(position: Vec3) -> Self {
        Self {
            id: None,
            position,
            pack_index: None,
            metadata: Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_pack_index(mut self, index: f64) -> Self {
        self.pack_index = Some(index);
        self
    }
}

impl Positioned for PlacedItem {
    fn position(&self) -> Vec3 {
        self.position
    }
}

impl PackSequenced for PlacedItem {
    fn pack_index(&self) -> Option<f64> {
        self.pack_index
    }
}

fn lenient_pack_index<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => {
            warn!("ignoring non-numeric packIndex {}", other);
            None
        }
    })
}

/// Compares two coordinates; NaN sorts after every number.
fn axis_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// A missing index counts as positive infinity.
fn pack_index_cmp(a: Option<f64>, b: Option<f64>) -> Ordering {
    axis_cmp(a.unwrap_or(f64::INFINITY), b.unwrap_or(f64::INFINITY))
}

/// The full comparator used by [`order`].
pub fn compare<T>(a: &T, b: &T, config: &OrderingConfig) -> Ordering
where
    T: Positioned + PackSequenced + ?Sized,
{
    let (pa, pb) = (a.position(), b.position());
    let primary = match config.sort_order {
        SortOrder::Xyz => axis_cmp(pa.x, pb.x).then_with(|| axis_cmp(pa.y, pb.y)),
        SortOrder::Yxz => axis_cmp(pa.y, pb.y).then_with(|| axis_cmp(pa.x, pb.x)),
    };

    let weight = config.door_direction.depth_weight();
    let ordering = primary.then_with(|| axis_cmp(pa.z * weight, pb.z * weight));

    if config.lifo_enabled {
        ordering.then_with(|| pack_index_cmp(a.pack_index(), b.pack_index()))
    } else {
        ordering
    }
}

/// Returns the items in pack sequence. The input is left untouched.
///
/// # Examples
/// ```
/// use pack_planner::ordering::{order, DoorDirection, OrderingConfig, PlacedItem};
/// use pack_planner::types::Vec3;
///
/// let items = vec![
///     PlacedItem::new(Vec3::new(0.0, 0.0, 2.0)),
///     PlacedItem::new(Vec3::new(0.0, 0.0, 5.0)),
/// ];
/// let config = OrderingConfig::builder()
///     .door_direction(DoorDirection::Front)
///     .build();
/// let ordered = order(&items, &config);
/// assert_eq!(ordered[0].position.z, 5.0);
/// ```
pub fn order<'a, T>(items: &'a [T], config: &OrderingConfig) -> Vec<&'a T>
where
    T: Positioned + PackSequenced,
{
    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by(|a, b| compare(*a, *b, config));
    ordered
}

/// One entry of the reorder request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReorderEntry {
    #[schema(value_type = Object)]
    pub id: Value,
    pub item_order: usize,
}

/// Body of `POST /api/items/reorder`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub items: Vec<ReorderEntry>,
}

/// Numbers an ordered sequence from 0, skipping items without an id.
pub fn reorder_request<'a>(ordered: impl IntoIterator<Item = &'a PlacedItem>) -> ReorderRequest {
    let items = ordered
        .into_iter()
        .filter_map(|item| item.id.clone())
        .enumerate()
        .map(|(item_order, id)| ReorderEntry { id, item_order })
        .collect();
    ReorderRequest { items }
}
