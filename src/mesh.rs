//! Triangle meshes for container volumes: extrusion and outline extraction.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{GeometryError, Result};
use crate::geometry::Polygon;
use crate::types::{BoundingBox, EPSILON_GENERAL, Vec3};

/// Default outline threshold in degrees. Keeps every feature edge and drops
/// only the diagonals between coplanar cap triangles.
pub const DEFAULT_EDGE_THRESHOLD_DEG: f64 = 1e-3;

/// Vertex positions are snapped to this many steps across the largest extent
/// of the mesh when matching edges across triangles.
const EDGE_KEY_STEPS: f64 = 1e6;

/// Indexed triangle mesh with counter-clockwise (outward) winding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    #[schema(value_type = Vec<[u32; 3]>)]
    pub triangles: Vec<[u32; 3]>,
}

/// A single line segment of a wireframe outline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct OutlineEdge {
    pub start: Vec3,
    pub end: Vec3,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.positions)
    }

    /// Grid spacing for edge keys, proportional to the mesh size.
    fn key_quantum(&self) -> f64 {
        self.bounding_box()
            .map(|b| {
                let d = b.dimensions();
                d.x.max(d.y).max(d.z)
            })
            .filter(|extent| *extent > 0.0 && extent.is_finite())
            .unwrap_or(1.0)
            / EDGE_KEY_STEPS
    }

    fn corners(&self, tri: &[u32; 3]) -> [Vec3; 3] {
        [
            self.positions[tri[0] as usize],
            self.positions[tri[1] as usize],
            self.positions[tri[2] as usize],
        ]
    }

    /// Enclosed volume via the divergence theorem. Positive when every face
    /// is wound outward.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = self.corners(tri);
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    /// Applies `f` to every vertex. Mirroring maps flip handedness, so the
    /// caller states whether winding has to be reversed to stay outward.
    pub fn map_positions(&self, f: impl Fn(Vec3) -> Vec3, reverses_winding: bool) -> Self {
        let positions = self.positions.iter().map(|p| f(*p)).collect();
        let triangles = if reverses_winding {
            self.triangles.iter().map(|[a, b, c]| [*a, *c, *b]).collect()
        } else {
            self.triangles.clone()
        };
        Self {
            positions,
            triangles,
        }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        self.map_positions(|p| p + offset, false)
    }

    /// Extracts the outline edges of the mesh.
    ///
    /// An edge shared by two triangles is kept when the angle between their
    /// normals is at least `threshold_deg`; edges used by a single triangle
    /// are always kept. Each edge is reported once, in first-seen order.
    pub fn outline(&self, threshold_deg: f64) -> Vec<OutlineEdge> {
        let threshold_dot = threshold_deg.to_radians().cos();
        let quantum = self.key_quantum();

        struct HalfSeen {
            normal: Vec3,
            start: Vec3,
            end: Vec3,
        }

        let mut pending: HashMap<(Key, Key), usize> = HashMap::new();
        let mut slots: Vec<Option<HalfSeen>> = Vec::new();
        let mut edges = Vec::new();

        for tri in &self.triangles {
            let [a, b, c] = self.corners(tri);
            let (ab, ac) = (b - a, c - a);
            let cross = ab.cross(&ac);
            // Sine of the corner angle, independent of the triangle's size.
            if !(cross.length() > ab.length() * ac.length() * EPSILON_GENERAL) {
                continue;
            }
            let Some(normal) = cross.normalized() else {
                continue;
            };

            for (start, end) in [(a, b), (b, c), (c, a)] {
                let (ka, kb) = (Key::of(start, quantum), Key::of(end, quantum));
                if ka == kb {
                    continue;
                }
                let key = if ka < kb { (ka, kb) } else { (kb, ka) };

                match pending.remove(&key) {
                    Some(slot) => {
                        if let Some(first) = slots[slot].take() {
                            if first.normal.dot(&normal) <= threshold_dot {
                                edges.push(OutlineEdge {
                                    start: first.start,
                                    end: first.end,
                                });
                            }
                        }
                    }
                    None => {
                        pending.insert(key, slots.len());
                        slots.push(Some(HalfSeen { normal, start, end }));
                    }
                }
            }
        }

        // Boundary edges, seen by a single triangle only.
        edges.extend(slots.into_iter().flatten().map(|half| OutlineEdge {
            start: half.start,
            end: half.end,
        }));
        edges
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Key(i64, i64, i64);

impl Key {
    fn of(p: Vec3, quantum: f64) -> Self {
        Key(
            (p.x / quantum).round() as i64,
            (p.y / quantum).round() as i64,
            (p.z / quantum).round() as i64,
        )
    }
}

/// Extrudes a polygon along its third axis.
///
/// The polygon lies in the `x`/`y` plane of its authoring frame; the result
/// spans `z = 0` (bottom cap) to `z = depth` (top cap). Caps are triangulated
/// by ear clipping, side walls get their own vertices per face.
pub fn extrude(polygon: &Polygon, depth: f64) -> Result<Mesh> {
    if polygon.len() < 3 {
        return Err(GeometryError::Triangulation(format!(
            "need at least 3 points, got {}",
            polygon.len()
        )));
    }

    // Work on a counter-clockwise ring so side normals point outward.
    let ring: Vec<_> = if polygon.is_counter_clockwise() {
        polygon.points().to_vec()
    } else {
        polygon.points().iter().rev().copied().collect()
    };
    let n = ring.len();

    let flat: Vec<f64> = ring.iter().flat_map(|p| [p.x, p.y]).collect();
    let cap = earcutr::earcut(&flat, &[], 2)
        .map_err(|e| GeometryError::Triangulation(format!("{:?}", e)))?;
    if cap.is_empty() {
        return Err(GeometryError::Triangulation(
            "polygon produced no triangles".to_string(),
        ));
    }

    let mut mesh = Mesh {
        positions: Vec::with_capacity(n * 2 + n * 4),
        triangles: Vec::with_capacity(cap.len() / 3 * 2 + n * 2),
    };

    // Bottom ring [0, n), top ring [n, 2n).
    for z in [0.0, depth] {
        mesh.positions
            .extend(ring.iter().map(|p| Vec3::new(p.x, p.y, z)));
    }

    for tri in cap.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let (pa, pb, pc) = (ring[a], ring[b], ring[c]);
        let ccw = (pb.x - pa.x) * (pc.y - pa.y) - (pb.y - pa.y) * (pc.x - pa.x) > 0.0;
        let (b, c) = if ccw { (b, c) } else { (c, b) };
        let (a, b, c) = (a as u32, b as u32, c as u32);
        let top = n as u32;
        mesh.triangles.push([top + a, top + b, top + c]);
        mesh.triangles.push([a, c, b]);
    }

    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        let base = mesh.positions.len() as u32;
        mesh.positions.extend([
            Vec3::new(p.x, p.y, 0.0),
            Vec3::new(q.x, q.y, 0.0),
            Vec3::new(q.x, q.y, depth),
            Vec3::new(p.x, p.y, depth),
        ]);
        mesh.triangles.push([base, base + 1, base + 2]);
        mesh.triangles.push([base, base + 2, base + 3]);
    }

    Ok(mesh)
}
