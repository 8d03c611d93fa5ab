//! Container footprints and their extruded volumes.
//!
//! Every shape is described by an entry in the shape table (`shape_profile`):
//! a seed polygon in its own authoring frame, a reorientation step that turns
//! the extruded seed upright, and a recentering offset. The steps are not
//! uniform across shapes: the L-shape is extruded in its authoring plane and
//! then swapped into the horizontal plane, which points the extrusion
//! downwards and needs a lift by the full height. The other shapes are laid
//! into the horizontal plane before extruding.
//!
//! Frame convention of the result: `y` is vertical and the base sits at
//! `y = 0`. Footprint polygons use `(x, z)` coordinates of the scene.

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::dimensions::{Dimensions, RawDimensions, ShapeKind, validate};
use crate::error::{GeometryError, Result};
use crate::geometry::Polygon;
use crate::mesh::{DEFAULT_EDGE_THRESHOLD_DEG, Mesh, OutlineEdge, extrude};
use crate::types::{BoundingBox, Point2, Vec3};

/// Tuning for footprint construction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FootprintOptions {
    /// Minimum angle in degrees between adjacent face normals for an edge to
    /// appear in the outline.
    pub edge_threshold_deg: f64,
}

impl FootprintOptions {
    pub fn with_edge_threshold(mut self, degrees: f64) -> Self {
        self.edge_threshold_deg = degrees;
        self
    }
}

impl Default for FootprintOptions {
    fn default() -> Self {
        Self {
            edge_threshold_deg: DEFAULT_EDGE_THRESHOLD_DEG,
        }
    }
}

/// A container volume ready for rendering and packing.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ContainerVolume {
    #[schema(value_type = String, example = "u_shape")]
    pub shape: ShapeKind,
    pub dimensions: Dimensions,
    pub height: f64,
    /// Final footprint outline, `(x, z)` in the local frame of the volume.
    #[schema(value_type = Vec<Point2>)]
    pub footprint: Polygon,
    pub mesh: Mesh,
    pub outline: Vec<OutlineEdge>,
}

impl ContainerVolume {
    pub fn footprint_area(&self) -> f64 {
        self.footprint.area()
    }

    pub fn volume(&self) -> f64 {
        self.footprint_area() * self.height
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.mesh.bounding_box()
    }

    /// Lowest vertical coordinate of the volume.
    pub fn base_y(&self) -> f64 {
        self.bounding_box().map(|b| b.min.y).unwrap_or(0.0)
    }

    /// Center of the horizontal extent, `(x, z)`.
    pub fn horizontal_center(&self) -> Point2 {
        self.footprint.bounds_center().unwrap_or_default()
    }
}

/// How an extruded seed is turned into the upright scene frame.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Reorientation {
    /// The footprint is laid into the horizontal plane and the extrusion runs
    /// straight up: `(u, v, w) -> (u, w, v)`.
    Upright,
    /// The seed is extruded in its authoring plane, rotated a quarter turn
    /// about `x` (`(u, v, w) -> (u, -w, v)`), then lifted by the height.
    SwapAndLift,
}

/// One entry of the shape table.
#[derive(Clone, Debug)]
struct ShapeProfile {
    /// Outline in the authoring frame `(u, v)`; `u` becomes `x`, `v` becomes `z`.
    seed: Polygon,
    reorientation: Reorientation,
    /// Horizontal shift applied after reorientation.
    recenter: Vec3,
}

fn shape_profile(dims: &Dimensions) -> ShapeProfile {
    match *dims {
        Dimensions::Box { width, depth, .. } => {
            let (hw, hd) = (width / 2.0, depth / 2.0);
            ShapeProfile {
                seed: Polygon::new(vec![
                    Point2::new(-hw, -hd),
                    Point2::new(hw, -hd),
                    Point2::new(hw, hd),
                    Point2::new(-hw, hd),
                ]),
                reorientation: Reorientation::Upright,
                recenter: Vec3::zero(),
            }
        }
        Dimensions::LShape {
            outer_width,
            outer_depth,
            notch_width,
            notch_depth,
            ..
        } => {
            let (hw, hd) = (outer_width / 2.0, outer_depth / 2.0);
            // Notch cut from the top-right corner.
            ShapeProfile {
                seed: Polygon::new(vec![
                    Point2::new(-hw, -hd),
                    Point2::new(hw, -hd),
                    Point2::new(hw, hd - notch_depth),
                    Point2::new(hw - notch_width, hd - notch_depth),
                    Point2::new(hw - notch_width, hd),
                    Point2::new(-hw, hd),
                ]),
                reorientation: Reorientation::SwapAndLift,
                recenter: Vec3::zero(),
            }
        }
        Dimensions::UShape {
            outer_width: ow,
            outer_depth: od,
            gap_width: gw,
            gap_depth: gd,
            ..
        } => ShapeProfile {
            seed: Polygon::new(vec![
                Point2::new(0.0, 0.0),
                Point2::new(ow, 0.0),
                Point2::new(ow, od),
                Point2::new((ow + gw) / 2.0, od),
                Point2::new((ow + gw) / 2.0, od - gd),
                Point2::new((ow - gw) / 2.0, od - gd),
                Point2::new((ow - gw) / 2.0, od),
                Point2::new(0.0, od),
            ]),
            reorientation: Reorientation::Upright,
            recenter: Vec3::new(-ow / 2.0, 0.0, -od / 2.0),
        },
        Dimensions::TShape {
            cross_width_x: cw,
            cross_depth_z: cd,
            stem_width_x: sw,
            stem_depth_z: sd,
            ..
        } => {
            let stem_offset = (cw - sw) / 2.0;
            let total_depth = cd + sd;
            // Stem first, the bar sits on top of it.
            ShapeProfile {
                seed: Polygon::new(vec![
                    Point2::new(stem_offset, 0.0),
                    Point2::new(stem_offset + sw, 0.0),
                    Point2::new(stem_offset + sw, sd),
                    Point2::new(cw, sd),
                    Point2::new(cw, total_depth),
                    Point2::new(0.0, total_depth),
                    Point2::new(0.0, sd),
                    Point2::new(stem_offset, sd),
                ]),
                reorientation: Reorientation::Upright,
                recenter: Vec3::new(-cw / 2.0, 0.0, -total_depth / 2.0),
            }
        }
    }
}

fn reorient(mesh: &Mesh, reorientation: Reorientation, height: f64) -> Mesh {
    match reorientation {
        Reorientation::Upright => mesh.map_positions(|p| Vec3::new(p.x, p.z, p.y), true),
        Reorientation::SwapAndLift => mesh
            .map_positions(|p| Vec3::new(p.x, -p.z, p.y), false)
            .translated(Vec3::new(0.0, height, 0.0)),
    }
}

/// Builds the extruded volume of a validated footprint.
///
/// # Errors
/// `InvalidDimension` on the `shape` field when `dims` describe a different
/// shape; `Triangulation` if a cap cannot be triangulated.
pub fn build_footprint(
    shape: ShapeKind,
    dims: &Dimensions,
    options: &FootprintOptions,
) -> Result<ContainerVolume> {
    if dims.shape_kind() != shape {
        return Err(GeometryError::invalid_dimension(
            "shape",
            shape,
            format!("does not match {} dimensions", dims.shape_kind()),
        ));
    }

    let height = dims.height();
    let profile = shape_profile(dims);
    debug_assert!(profile.seed.is_simple(), "seed polygon must not self-intersect");

    let authored = extrude(&profile.seed, height)?;
    let upright = reorient(&authored, profile.reorientation, height).translated(profile.recenter);

    // Base to y = 0 after all shape-specific steps.
    let base_y = upright.bounding_box().map(|b| b.min.y).unwrap_or(0.0);
    let mesh = if base_y != 0.0 {
        upright.translated(Vec3::new(0.0, -base_y, 0.0))
    } else {
        upright
    };

    let footprint = profile
        .seed
        .translated(profile.recenter.x, profile.recenter.z);
    let outline = mesh.outline(options.edge_threshold_deg);

    debug!(
        shape = %shape,
        vertices = footprint.len(),
        triangles = mesh.triangle_count(),
        outline_edges = outline.len(),
        "built container volume"
    );

    Ok(ContainerVolume {
        shape,
        dimensions: *dims,
        height,
        footprint,
        mesh,
        outline,
    })
}

/// Parses the shape name, validates the raw dimensions and builds the volume.
///
/// # Errors
/// `UnsupportedShape` for names outside the shape enumeration, otherwise the
/// errors of [`validate`] and [`build_footprint`].
pub fn build_footprint_from_raw(
    shape: &str,
    raw: &RawDimensions,
    options: &FootprintOptions,
) -> Result<ContainerVolume> {
    let shape: ShapeKind = shape.parse()?;
    let dims = validate(raw, shape)?;
    build_footprint(shape, &dims, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON_GENERAL;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawDimensions {
        RawDimensions::from_value(value)
    }

    fn build(shape: ShapeKind) -> ContainerVolume {
        build_footprint_from_raw(shape.as_str(), &sample(shape), &FootprintOptions::default())
            .unwrap()
    }

    fn sample(shape: ShapeKind) -> RawDimensions {
        match shape {
            ShapeKind::Box => raw(json!({"width": 120.0, "depth": 80.0, "height": 60.0})),
            ShapeKind::LShape => raw(json!({
                "outerWidth": 120.0, "outerDepth": 80.0, "height": 60.0,
                "notchWidth": 50.0, "notchDepth": 30.0
            })),
            ShapeKind::UShape => raw(json!({
                "outerWidth": 100.0, "outerDepth": 100.0, "height": 50.0,
                "gapWidth": 40.0, "gapDepth": 30.0
            })),
            ShapeKind::TShape => raw(json!({
                "crossWidthX": 90.0, "crossDepthZ": 20.0,
                "stemWidthX": 30.0, "stemDepthZ": 70.0, "height": 40.0
            })),
        }
    }

    #[test]
    fn every_shape_sits_on_zero_and_is_centered() {
        for shape in ShapeKind::ALL {
            let volume = build(shape);
            assert_eq!(volume.base_y(), 0.0, "{shape}");
            let center = volume.horizontal_center();
            assert!(center.x.abs() < EPSILON_GENERAL, "{shape}: x = {}", center.x);
            assert!(center.y.abs() < EPSILON_GENERAL, "{shape}: z = {}", center.y);
            let top = volume.bounding_box().unwrap().max.y;
            assert_relative_eq!(top, volume.height, epsilon = 1e-9);
        }
    }

    #[test]
    fn every_shape_is_wound_outward() {
        for shape in ShapeKind::ALL {
            let volume = build(shape);
            assert_relative_eq!(volume.mesh.signed_volume(), volume.volume(), epsilon = 1e-6);
            assert!(volume.footprint.is_simple(), "{shape}");
        }
    }

    #[test]
    fn u_shape_walls_and_vertices() {
        let volume = build(ShapeKind::UShape);
        let pts = volume.footprint.points();
        assert_eq!(pts.len(), 8);
        // Left wall runs from x = -50 to the inner channel edge, right wall mirrors it.
        assert_relative_eq!(pts[5].x - pts[0].x, 30.0, epsilon = 1e-9);
        assert_relative_eq!(pts[1].x - pts[3].x, 30.0, epsilon = 1e-9);
        assert_relative_eq!(pts[3].x - pts[5].x, 40.0, epsilon = 1e-9);
        assert_eq!(volume.base_y(), 0.0);
        assert_relative_eq!(volume.footprint_area(), 100.0 * 100.0 - 40.0 * 30.0);
    }

    #[test]
    fn l_shape_notch_is_top_right() {
        let volume = build(ShapeKind::LShape);
        let pts = volume.footprint.points();
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Point2::new(-60.0, -40.0));
        assert_eq!(pts[3], Point2::new(10.0, 10.0));
        assert_relative_eq!(volume.footprint_area(), 120.0 * 80.0 - 50.0 * 30.0);
        let bbox = volume.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.z, -40.0);
        assert_relative_eq!(bbox.max.z, 40.0);
    }

    #[test]
    fn t_shape_stem_is_centered_under_bar() {
        let volume = build(ShapeKind::TShape);
        let pts = volume.footprint.points();
        assert_eq!(pts.len(), 8);
        assert_relative_eq!(pts[0].x, -15.0);
        assert_relative_eq!(pts[1].x, 15.0);
        let dims = volume.bounding_box().unwrap().dimensions();
        assert_relative_eq!(dims.x, 90.0);
        assert_relative_eq!(dims.z, 90.0);
    }

    #[test]
    fn outline_counts_feature_edges() {
        let expected = [
            (ShapeKind::Box, 12),
            (ShapeKind::LShape, 18),
            (ShapeKind::UShape, 24),
            (ShapeKind::TShape, 24),
        ];
        for (shape, edges) in expected {
            let volume = build(shape);
            assert_eq!(volume.outline.len(), edges, "{shape}");
        }
    }

    #[test]
    fn millimetre_box_keeps_its_outline() {
        let tiny = raw(json!({"width": 0.001, "depth": 0.001, "height": 0.001}));
        let volume =
            build_footprint_from_raw("box", &tiny, &FootprintOptions::default()).unwrap();
        assert_eq!(volume.outline.len(), 12);
        assert_relative_eq!(volume.volume(), 1e-9, epsilon = 1e-15);
    }

    #[test]
    fn outline_threshold_is_configurable() {
        let options = FootprintOptions::default().with_edge_threshold(120.0);
        let volume = build_footprint_from_raw("box", &sample(ShapeKind::Box), &options).unwrap();
        assert!(volume.outline.is_empty());
    }

    #[test]
    fn rectangular_alias_builds_a_box() {
        let volume = build_footprint_from_raw(
            "rectangular",
            &sample(ShapeKind::Box),
            &FootprintOptions::default(),
        )
        .unwrap();
        assert_eq!(volume.shape, ShapeKind::Box);
        assert_eq!(volume.footprint.len(), 4);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let dims = validate(&sample(ShapeKind::Box), ShapeKind::Box).unwrap();
        let err = build_footprint(ShapeKind::UShape, &dims, &FootprintOptions::default())
            .unwrap_err();
        assert_eq!(err.field(), Some("shape"));
    }

    #[test]
    fn unknown_shape_and_bad_dimensions_fail() {
        let options = FootprintOptions::default();
        let err = build_footprint_from_raw("star", &sample(ShapeKind::Box), &options).unwrap_err();
        assert_eq!(err, GeometryError::UnsupportedShape("star".into()));

        let bad = raw(json!({
            "outerWidth": 100.0, "outerDepth": 80.0, "height": 50.0,
            "notchWidth": 100.0, "notchDepth": 10.0
        }));
        let err = build_footprint_from_raw("l-shape", &bad, &options).unwrap_err();
        assert_eq!(err.field(), Some("notchWidth"));
    }
}
