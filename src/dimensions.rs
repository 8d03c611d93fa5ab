//! Normalization and validation of raw container dimensions.
//!
//! Raw input arrives as a loosely typed JSON object straight from a form.
//! Validation happens in two explicit steps:
//! 1. alias resolution maps legacy and form field names onto the canonical
//!    names for the requested shape (after this step the aliases are gone);
//! 2. the canonical fields are checked for presence, finiteness, positivity
//!    and cut-out containment, producing a typed [`Dimensions`] record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
#[allow(unused_imports)]
use serde_json::json;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{GeometryError, Result};

/// Supported container footprint shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Plain rectangle, also accepted as `rectangular` or `rect`.
    Box,
    LShape,
    UShape,
    TShape,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [Self::Box, Self::LShape, Self::UShape, Self::TShape];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::LShape => "l-shape",
            Self::UShape => "u_shape",
            Self::TShape => "t_shape",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = GeometryError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "box" | "rectangular" | "rect" => Ok(Self::Box),
            "l-shape" | "l_shape" => Ok(Self::LShape),
            "u_shape" | "u-shape" => Ok(Self::UShape),
            "t_shape" | "t-shape" => Ok(Self::TShape),
            _ => Err(GeometryError::UnsupportedShape(raw.to_string())),
        }
    }
}

impl Serialize for ShapeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShapeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw, unvalidated dimension input as delivered by the UI.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(
    value_type = Object,
    example = json!({"outerWidth": 100.0, "outerDepth": 100.0, "gapWidth": 40.0, "gapDepth": 30.0, "height": 50.0})
)]
pub struct RawDimensions(Map<String, Value>);

impl RawDimensions {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds raw input from any JSON value; non-objects yield an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }
}

/// Canonical field names paired with the aliases that resolve onto them, in
/// precedence order. The canonical name always wins over an alias.
type AliasTable = &'static [(&'static str, &'static [&'static str])];

const BOX_FIELDS: AliasTable = &[
    ("width", &["widthX", "outerWidth", "outerWidthX"]),
    ("depth", &["depthZ", "outerDepth", "outerDepthZ"]),
    ("height", &["heightY"]),
];

const L_SHAPE_FIELDS: AliasTable = &[
    ("outerWidth", &["width", "outerWidthX", "widthX"]),
    ("outerDepth", &["depth", "outerDepthZ", "depthZ"]),
    ("height", &["heightY"]),
    ("notchWidth", &["notchWidthX"]),
    ("notchDepth", &["notchDepthZ"]),
];

const U_SHAPE_FIELDS: AliasTable = &[
    ("outerWidth", &["width", "outerWidthX", "widthX"]),
    ("outerDepth", &["depth", "outerDepthZ", "depthZ"]),
    ("height", &["heightY"]),
    ("gapWidth", &["gapWidthX"]),
    ("gapDepth", &["gapDepthZ"]),
];

const T_SHAPE_FIELDS: AliasTable = &[
    ("crossWidthX", &["crossWidth"]),
    ("crossDepthZ", &["crossDepth"]),
    ("stemWidthX", &["stemWidth"]),
    ("stemDepthZ", &["stemDepth"]),
    ("height", &["heightY"]),
];

fn alias_table(shape: ShapeKind) -> AliasTable {
    match shape {
        ShapeKind::Box => BOX_FIELDS,
        ShapeKind::LShape => L_SHAPE_FIELDS,
        ShapeKind::UShape => U_SHAPE_FIELDS,
        ShapeKind::TShape => T_SHAPE_FIELDS,
    }
}

/// Raw input with every alias resolved onto its canonical field name.
///
/// Only canonical names survive; fields unknown to the shape are dropped.
#[derive(Debug)]
struct ResolvedFields<'a> {
    fields: Vec<(&'static str, Option<&'a Value>)>,
}

impl<'a> ResolvedFields<'a> {
    fn resolve(raw: &'a RawDimensions, shape: ShapeKind) -> Self {
        let fields = alias_table(shape)
            .iter()
            .map(|(canonical, aliases)| {
                let value = raw
                    .get(canonical)
                    .or_else(|| aliases.iter().find_map(|alias| raw.get(alias)));
                (*canonical, value)
            })
            .collect();
        Self { fields }
    }

    /// Reads a canonical field as a strictly positive, finite length.
    fn length(&self, field: &'static str) -> Result<f64> {
        let value = self
            .fields
            .iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, value)| *value)
            .ok_or_else(|| GeometryError::invalid_dimension(field, "missing", "is required"))?;

        let number = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| GeometryError::invalid_dimension(field, value, "must be a number"))?;

        if !number.is_finite() {
            return Err(GeometryError::invalid_dimension(
                field,
                number,
                "must be a finite number",
            ));
        }
        if number <= 0.0 {
            return Err(GeometryError::invalid_dimension(
                field,
                number,
                "must be greater than 0",
            ));
        }
        Ok(number)
    }
}

fn ensure_smaller(
    field: &'static str,
    cut: f64,
    outer_field: &'static str,
    outer: f64,
) -> Result<()> {
    if cut >= outer {
        return Err(GeometryError::invalid_dimension(
            field,
            cut,
            format!("must be smaller than {} ({})", outer_field, outer),
        ));
    }
    Ok(())
}

/// Validated dimensions, one variant per footprint family.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "shape")]
pub enum Dimensions {
    #[serde(rename = "box")]
    Box { width: f64, depth: f64, height: f64 },
    #[serde(rename = "l-shape", rename_all = "camelCase")]
    LShape {
        outer_width: f64,
        outer_depth: f64,
        height: f64,
        notch_width: f64,
        notch_depth: f64,
    },
    #[serde(rename = "u_shape", rename_all = "camelCase")]
    UShape {
        outer_width: f64,
        outer_depth: f64,
        height: f64,
        gap_width: f64,
        gap_depth: f64,
    },
    #[serde(rename = "t_shape", rename_all = "camelCase")]
    TShape {
        cross_width_x: f64,
        cross_depth_z: f64,
        stem_width_x: f64,
        stem_depth_z: f64,
        height: f64,
    },
}

impl Dimensions {
    pub fn shape_kind(&self) -> ShapeKind {
        match self {
            Self::Box { .. } => ShapeKind::Box,
            Self::LShape { .. } => ShapeKind::LShape,
            Self::UShape { .. } => ShapeKind::UShape,
            Self::TShape { .. } => ShapeKind::TShape,
        }
    }

    pub fn height(&self) -> f64 {
        match *self {
            Self::Box { height, .. }
            | Self::LShape { height, .. }
            | Self::UShape { height, .. }
            | Self::TShape { height, .. } => height,
        }
    }

    /// Width of the enclosing rectangle along `x`.
    pub fn outer_width(&self) -> f64 {
        match *self {
            Self::Box { width, .. } => width,
            Self::LShape { outer_width, .. } | Self::UShape { outer_width, .. } => outer_width,
            Self::TShape { cross_width_x, .. } => cross_width_x,
        }
    }

    /// Depth of the enclosing rectangle along `z`.
    pub fn outer_depth(&self) -> f64 {
        match *self {
            Self::Box { depth, .. } => depth,
            Self::LShape { outer_depth, .. } | Self::UShape { outer_depth, .. } => outer_depth,
            Self::TShape {
                cross_depth_z,
                stem_depth_z,
                ..
            } => cross_depth_z + stem_depth_z,
        }
    }
}

/// Validates raw dimension input for the given shape.
///
/// # Errors
/// `InvalidDimension` naming the offending field when a value is missing,
/// not a finite number, not strictly positive, or a cut-out is not strictly
/// smaller than the outer dimension it is taken from.
///
/// # Examples
/// ```
/// use pack_planner::dimensions::{validate, Dimensions, RawDimensions, ShapeKind};
/// use serde_json::json;
///
/// let raw = RawDimensions::from_value(json!({
///     "width": 120.0, "depth": 80.0, "height": 40.0,
///     "notchWidth": 30.0, "notchDepth": 20.0
/// }));
/// let dims = validate(&raw, ShapeKind::LShape).unwrap();
/// assert_eq!(dims.outer_width(), 120.0);
/// ```
pub fn validate(raw: &RawDimensions, shape: ShapeKind) -> Result<Dimensions> {
    let fields = ResolvedFields::resolve(raw, shape);

    let dims = match shape {
        ShapeKind::Box => Dimensions::Box {
            width: fields.length("width")?,
            depth: fields.length("depth")?,
            height: fields.length("height")?,
        },
        ShapeKind::LShape => {
            let outer_width = fields.length("outerWidth")?;
            let outer_depth = fields.length("outerDepth")?;
            let height = fields.length("height")?;
            let notch_width = fields.length("notchWidth")?;
            let notch_depth = fields.length("notchDepth")?;
            ensure_smaller("notchWidth", notch_width, "outerWidth", outer_width)?;
            ensure_smaller("notchDepth", notch_depth, "outerDepth", outer_depth)?;
            Dimensions::LShape {
                outer_width,
                outer_depth,
                height,
                notch_width,
                notch_depth,
            }
        }
        ShapeKind::UShape => {
            let outer_width = fields.length("outerWidth")?;
            let outer_depth = fields.length("outerDepth")?;
            let height = fields.length("height")?;
            let gap_width = fields.length("gapWidth")?;
            let gap_depth = fields.length("gapDepth")?;
            ensure_smaller("gapWidth", gap_width, "outerWidth", outer_width)?;
            ensure_smaller("gapDepth", gap_depth, "outerDepth", outer_depth)?;
            Dimensions::UShape {
                outer_width,
                outer_depth,
                height,
                gap_width,
                gap_depth,
            }
        }
        ShapeKind::TShape => {
            let cross_width_x = fields.length("crossWidthX")?;
            let cross_depth_z = fields.length("crossDepthZ")?;
            let stem_width_x = fields.length("stemWidthX")?;
            let stem_depth_z = fields.length("stemDepthZ")?;
            let height = fields.length("height")?;
            ensure_smaller("stemWidthX", stem_width_x, "crossWidthX", cross_width_x)?;
            Dimensions::TShape {
                cross_width_x,
                cross_depth_z,
                stem_width_x,
                stem_depth_z,
                height,
            }
        }
    };

    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawDimensions {
        RawDimensions::from_value(value)
    }

    fn l_shape(notch_width: f64, notch_depth: f64) -> RawDimensions {
        raw(json!({
            "outerWidth": 100.0,
            "outerDepth": 80.0,
            "height": 50.0,
            "notchWidth": notch_width,
            "notchDepth": notch_depth
        }))
    }

    #[test]
    fn shape_kind_accepts_aliases() {
        assert_eq!("box".parse::<ShapeKind>().unwrap(), ShapeKind::Box);
        assert_eq!("rectangular".parse::<ShapeKind>().unwrap(), ShapeKind::Box);
        assert_eq!("RECT".parse::<ShapeKind>().unwrap(), ShapeKind::Box);
        assert_eq!(" l-shape ".parse::<ShapeKind>().unwrap(), ShapeKind::LShape);
        assert_eq!("u_shape".parse::<ShapeKind>().unwrap(), ShapeKind::UShape);
        assert_eq!("t_shape".parse::<ShapeKind>().unwrap(), ShapeKind::TShape);
    }

    #[test]
    fn unknown_shape_is_unsupported() {
        let err = "hexagon".parse::<ShapeKind>().unwrap_err();
        assert_eq!(err, GeometryError::UnsupportedShape("hexagon".into()));
    }

    #[test]
    fn shape_kind_serializes_canonical_name() {
        let kinds: Vec<ShapeKind> =
            serde_json::from_value(json!(["rectangular", "l-shape", "u_shape", "t_shape"]))
                .unwrap();
        assert_eq!(
            serde_json::to_value(&kinds).unwrap(),
            json!(["box", "l-shape", "u_shape", "t_shape"])
        );
    }

    #[test]
    fn legacy_width_and_depth_resolve_to_outer_fields() {
        let legacy = raw(json!({
            "width": 100.0, "depth": 80.0, "height": 50.0,
            "notchWidth": 20.0, "notchDepth": 10.0
        }));
        assert_eq!(
            validate(&legacy, ShapeKind::LShape).unwrap(),
            validate(&l_shape(20.0, 10.0), ShapeKind::LShape).unwrap()
        );
    }

    #[test]
    fn canonical_field_wins_over_alias() {
        let both = raw(json!({
            "outerWidth": 100.0, "width": 5.0, "outerDepth": 80.0, "height": 50.0,
            "notchWidth": 20.0, "notchDepth": 10.0
        }));
        let dims = validate(&both, ShapeKind::LShape).unwrap();
        assert_eq!(dims.outer_width(), 100.0);
    }

    #[test]
    fn form_field_names_are_accepted() {
        let form = raw(json!({
            "outerWidthX": "6000", "outerDepthZ": 3000, "heightY": 2400,
            "gapWidthX": 2000, "gapDepthZ": 1000
        }));
        let dims = validate(&form, ShapeKind::UShape).unwrap();
        assert_eq!(
            dims,
            Dimensions::UShape {
                outer_width: 6000.0,
                outer_depth: 3000.0,
                height: 2400.0,
                gap_width: 2000.0,
                gap_depth: 1000.0,
            }
        );
    }

    #[test]
    fn box_falls_back_to_outer_fields() {
        let dims = validate(
            &raw(json!({"outerWidth": 10.0, "outerDepth": 20.0, "height": 5.0})),
            ShapeKind::Box,
        )
        .unwrap();
        assert_eq!(
            dims,
            Dimensions::Box {
                width: 10.0,
                depth: 20.0,
                height: 5.0
            }
        );
    }

    #[test]
    fn notch_not_smaller_than_outer_is_rejected() {
        for (width, depth, field) in [
            (100.0, 10.0, "notchWidth"),
            (150.0, 10.0, "notchWidth"),
            (20.0, 80.0, "notchDepth"),
            (20.0, 81.0, "notchDepth"),
        ] {
            let err = validate(&l_shape(width, depth), ShapeKind::LShape).unwrap_err();
            assert_eq!(err.field(), Some(field), "{width}x{depth}");
        }
    }

    #[test]
    fn gap_not_smaller_than_outer_is_rejected() {
        let wide_gap = raw(json!({
            "outerWidth": 100.0, "outerDepth": 100.0, "height": 50.0,
            "gapWidth": 100.0, "gapDepth": 30.0
        }));
        let err = validate(&wide_gap, ShapeKind::UShape).unwrap_err();
        assert_eq!(err.field(), Some("gapWidth"));
    }

    #[test]
    fn stem_wider_than_cross_is_rejected() {
        let t = raw(json!({
            "crossWidthX": 40.0, "crossDepthZ": 10.0,
            "stemWidthX": 40.0, "stemDepthZ": 30.0, "height": 20.0
        }));
        let err = validate(&t, ShapeKind::TShape).unwrap_err();
        assert_eq!(err.field(), Some("stemWidthX"));
    }

    #[test]
    fn missing_and_non_numeric_fields_are_reported() {
        let missing = raw(json!({"width": 10.0, "height": 5.0}));
        let err = validate(&missing, ShapeKind::Box).unwrap_err();
        assert_eq!(err.field(), Some("depth"));

        let text = raw(json!({"width": "wide", "depth": 10.0, "height": 5.0}));
        let err = validate(&text, ShapeKind::Box).unwrap_err();
        assert_eq!(err.field(), Some("width"));
        assert!(err.to_string().contains("wide"));

        let null = raw(json!({"width": null, "depth": 10.0, "height": 5.0}));
        assert_eq!(
            validate(&null, ShapeKind::Box).unwrap_err().field(),
            Some("width")
        );
    }

    #[test]
    fn non_positive_lengths_are_rejected() {
        for value in [0.0, -1.0] {
            let input = raw(json!({"width": 10.0, "depth": 10.0, "height": value}));
            let err = validate(&input, ShapeKind::Box).unwrap_err();
            assert_eq!(err.field(), Some("height"));
        }
        let cut = l_shape(-5.0, 10.0);
        assert_eq!(
            validate(&cut, ShapeKind::LShape).unwrap_err().field(),
            Some("notchWidth")
        );
    }

    #[test]
    fn non_finite_string_is_rejected() {
        let input = raw(json!({"width": "inf", "depth": 10.0, "height": 5.0}));
        let err = validate(&input, ShapeKind::Box).unwrap_err();
        assert!(err.to_string().contains("finite"));
    }

    #[test]
    fn t_shape_outer_depth_sums_bar_and_stem() {
        let t = raw(json!({
            "crossWidthX": 40.0, "crossDepthZ": 10.0,
            "stemWidthX": 20.0, "stemDepthZ": 30.0, "height": 20.0
        }));
        let dims = validate(&t, ShapeKind::TShape).unwrap();
        assert_eq!(dims.outer_width(), 40.0);
        assert_eq!(dims.outer_depth(), 40.0);
        assert_eq!(dims.shape_kind(), ShapeKind::TShape);
    }

    #[test]
    fn dimensions_serialize_with_shape_tag() {
        let dims = validate(&l_shape(20.0, 10.0), ShapeKind::LShape).unwrap();
        assert_eq!(
            serde_json::to_value(dims).unwrap(),
            json!({
                "shape": "l-shape",
                "outerWidth": 100.0,
                "outerDepth": 80.0,
                "height": 50.0,
                "notchWidth": 20.0,
                "notchDepth": 10.0
            })
        );
    }
}
