//! Serialization of the scene into the packing backend's configuration payload.
//!
//! Serialization never fails. Missing fields take these defaults:
//!
//! | field            | default                          |
//! |------------------|----------------------------------|
//! | `type`           | `"Mesh"`                         |
//! | `position`       | origin                           |
//! | `scale`          | `(1, 1, 1)`                      |
//! | `rotation`       | `(0, 0, 0)`                      |
//! | `metalness`      | `0`                              |
//! | `roughness`      | `1`                              |
//! | `physics.shape`  | inferred from the geometry type  |
//! | `physics.mass`   | `1`                              |
//! | `positionMode`   | `"manual"`                       |

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;

use crate::model::{Scene, SceneObject};
use crate::types::Vec3;

pub const DEFAULT_METALNESS: f64 = 0.0;
pub const DEFAULT_ROUGHNESS: f64 = 1.0;
pub const DEFAULT_MASS: f64 = 1.0;
pub const DEFAULT_POSITION_MODE: &str = "manual";
const FALLBACK_TYPE: &str = "Mesh";

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct MaterialRecord {
    /// `0xRRGGBB`, `null` when the object has no usable color.
    pub color: Option<u32>,
    pub metalness: f64,
    pub roughness: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PhysicsRecord {
    pub shape: String,
    pub mass: f64,
}

/// One serialized scene object.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub uuid: String,
    #[serde(rename = "type")]
    pub geometry_type: String,
    #[schema(value_type = Object)]
    pub geometry: Value,
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Vec3,
    pub material: MaterialRecord,
    pub physics: PhysicsRecord,
    pub position_mode: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentMeta {
    pub boundary_size: f64,
}

/// Payload submitted to the packing backend.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct SceneConfigPayload {
    pub environment_meta: EnvironmentMeta,
    pub objects: Vec<ObjectRecord>,
}

impl SceneConfigPayload {
    fn new(boundary_size: f64, objects: Vec<ObjectRecord>) -> Self {
        Self {
            environment_meta: EnvironmentMeta { boundary_size },
            objects,
        }
    }
}

/// Maps a geometry class name onto a collision shape.
///
/// `BoxGeometry`, `BoxBufferGeometry` and `box` all map to `box`.
pub fn physics_shape_for(geometry_type: &str) -> &'static str {
    let lower = geometry_type.trim().to_ascii_lowercase();
    let name = lower.strip_prefix("buffer").unwrap_or(&lower);
    let name = name.strip_suffix("geometry").unwrap_or(name);
    let name = name.strip_suffix("buffer").unwrap_or(name);
    match name {
        "box" => "box",
        "sphere" | "icosahedron" => "sphere",
        "cylinder" => "cylinder",
        _ => "mesh",
    }
}

/// Projects a scene object onto its payload record.
pub fn serialize_object(object: &SceneObject) -> ObjectRecord {
    let geometry_type = object
        .geometry
        .as_ref()
        .map(|g| g.kind.clone())
        .unwrap_or_else(|| FALLBACK_TYPE.to_string());

    let material = object.material.as_ref();
    let hint = object.user_data.physics.as_ref();

    ObjectRecord {
        uuid: object.uuid.clone(),
        geometry: object
            .geometry
            .as_ref()
            .map(|g| g.parameters.clone())
            .unwrap_or(Value::Null),
        position: object.position.unwrap_or_default(),
        scale: object.scale.unwrap_or(Vec3::one()),
        rotation: object.rotation.unwrap_or_default(),
        material: MaterialRecord {
            color: material.and_then(|m| m.color_hex()),
            metalness: material
                .and_then(|m| m.metalness)
                .unwrap_or(DEFAULT_METALNESS),
            roughness: material
                .and_then(|m| m.roughness)
                .unwrap_or(DEFAULT_ROUGHNESS),
        },
        physics: PhysicsRecord {
            shape: hint
                .and_then(|h| h.shape.clone())
                .unwrap_or_else(|| physics_shape_for(&geometry_type).to_string()),
            mass: hint.and_then(|h| h.mass).unwrap_or(DEFAULT_MASS),
        },
        position_mode: object
            .user_data
            .position_mode
            .clone()
            .unwrap_or_else(|| DEFAULT_POSITION_MODE.to_string()),
        geometry_type,
    }
}

fn is_packable(object: &SceneObject) -> bool {
    object.is_mesh_like() && object.position.is_some()
}

/// Builds the payload from mesh-like objects that have a position; everything
/// else is left out.
pub fn get_scene_config(objects: &[SceneObject], boundary_size: f64) -> SceneConfigPayload {
    let records: Vec<ObjectRecord> = objects
        .iter()
        .filter(|o| is_packable(o))
        .map(serialize_object)
        .collect();
    debug!(
        kept = records.len(),
        skipped = objects.len() - records.len(),
        "serialized scene config"
    );
    SceneConfigPayload::new(boundary_size, records)
}

/// Snapshot of the visible packable objects in a live scene.
///
/// A missing scene or one without a child list produces an empty payload.
pub fn live_scene_snapshot(scene: Option<&Scene>, boundary_size: f64) -> SceneConfigPayload {
    let Some(children) = scene.and_then(|s| s.children.as_deref()) else {
        debug!("scene unavailable, returning empty snapshot");
        return SceneConfigPayload::new(boundary_size, Vec::new());
    };

    let records = children
        .iter()
        .filter(|o| o.visible && is_packable(o))
        .map(serialize_object)
        .collect();
    SceneConfigPayload::new(boundary_size, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Geometry, Material, PhysicsHint};
    use serde_json::json;

    fn mesh(uuid: &str, geometry: &str) -> SceneObject {
        let mut object = SceneObject::new(uuid);
        object.object_type = Some("Mesh".into());
        object.geometry = Some(Geometry::new(geometry));
        object.position = Some(Vec3::new(1.0, 2.0, 3.0));
        object
    }

    #[test]
    fn sphere_without_physics_gets_inferred_shape() {
        let record = serialize_object(&mesh("s", "SphereGeometry"));
        assert_eq!(
            record.physics,
            PhysicsRecord {
                shape: "sphere".into(),
                mass: 1.0
            }
        );
        assert_eq!(record.position_mode, "manual");
        assert_eq!(record.material.metalness, 0.0);
        assert_eq!(record.material.roughness, 1.0);
        assert_eq!(record.material.color, None);
        assert_eq!(record.scale, Vec3::one());
        assert_eq!(record.rotation, Vec3::zero());
    }

    #[test]
    fn physics_shape_lookup() {
        assert_eq!(physics_shape_for("BoxGeometry"), "box");
        assert_eq!(physics_shape_for("BoxBufferGeometry"), "box");
        assert_eq!(physics_shape_for("IcosahedronGeometry"), "sphere");
        assert_eq!(physics_shape_for("CylinderGeometry"), "cylinder");
        assert_eq!(physics_shape_for("TorusKnotGeometry"), "mesh");
        assert_eq!(physics_shape_for("BufferGeometry"), "mesh");
        assert_eq!(physics_shape_for("Mesh"), "mesh");
    }

    #[test]
    fn explicit_hints_override_defaults() {
        let mut object = mesh("c", "BoxGeometry");
        object.user_data.physics = Some(PhysicsHint {
            shape: Some("convex".into()),
            mass: Some(12.5),
        });
        object.user_data.position_mode = Some("auto".into());
        object.material = Some(Material {
            color: Some(json!("#336699")),
            metalness: Some(0.4),
            roughness: None,
        });

        let record = serialize_object(&object);
        assert_eq!(record.physics.shape, "convex");
        assert_eq!(record.physics.mass, 12.5);
        assert_eq!(record.position_mode, "auto");
        assert_eq!(record.material.color, Some(0x336699));
        assert_eq!(record.material.metalness, 0.4);
        assert_eq!(record.material.roughness, 1.0);
    }

    #[test]
    fn missing_geometry_serializes_as_mesh() {
        let mut object = SceneObject::new("g");
        object.is_mesh = true;
        let record = serialize_object(&object);
        assert_eq!(record.geometry_type, "Mesh");
        assert_eq!(record.physics.shape, "mesh");
        assert_eq!(record.position, Vec3::zero());
        assert_eq!(record.geometry, Value::Null);
    }

    #[test]
    fn serialization_is_idempotent() {
        let object = mesh("i", "CylinderGeometry");
        assert_eq!(serialize_object(&object), serialize_object(&object));
    }

    #[test]
    fn scene_config_keeps_positioned_meshes() {
        let mut light = SceneObject::new("light");
        light.object_type = Some("PointLight".into());
        light.position = Some(Vec3::zero());

        let mut floating = mesh("unplaced", "BoxGeometry");
        floating.position = None;

        let objects = vec![mesh("a", "BoxGeometry"), light, floating];
        let payload = get_scene_config(&objects, 250.0);
        assert_eq!(payload.environment_meta.boundary_size, 250.0);
        assert_eq!(payload.objects.len(), 1);
        assert_eq!(payload.objects[0].uuid, "a");
    }

    #[test]
    fn payload_wire_format() {
        let payload = get_scene_config(&[mesh("a", "BoxGeometry")], 100.0);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["environment_meta"], json!({"boundarySize": 100.0}));
        let object = &value["objects"][0];
        assert_eq!(object["type"], "BoxGeometry");
        assert_eq!(object["positionMode"], "manual");
        assert_eq!(object["physics"], json!({"shape": "box", "mass": 1.0}));
        assert_eq!(object["material"]["color"], Value::Null);
        assert_eq!(object["position"], json!({"x": 1.0, "y": 2.0, "z": 3.0}));
    }

    #[test]
    fn snapshot_filters_hidden_objects() {
        let mut hidden = mesh("hidden", "BoxGeometry");
        hidden.visible = false;
        let scene = Scene {
            children: Some(vec![mesh("shown", "SphereGeometry"), hidden]),
        };
        let payload = live_scene_snapshot(Some(&scene), 100.0);
        assert_eq!(payload.objects.len(), 1);
        assert_eq!(payload.objects[0].uuid, "shown");
    }

    #[test]
    fn snapshot_fails_soft() {
        let empty = live_scene_snapshot(None, 80.0);
        assert!(empty.objects.is_empty());
        assert_eq!(empty.environment_meta.boundary_size, 80.0);

        let childless = Scene { children: None };
        assert!(live_scene_snapshot(Some(&childless), 80.0).objects.is_empty());

        let malformed = Scene::from_value(json!({"children": "nope"}));
        assert!(live_scene_snapshot(malformed.as_ref(), 80.0).objects.is_empty());
    }

    #[test]
    fn snapshot_keeps_valid_meshes_next_to_broken_ones() {
        let scene = Scene::from_value(json!({"children": [
            {
                "uuid": "good",
                "type": "Mesh",
                "geometry": {"type": "BoxGeometry"},
                "position": {"x": 0.0, "y": 0.0, "z": 0.0}
            },
            {
                "uuid": "bad",
                "type": "Mesh",
                "geometry": {"type": "BoxGeometry"},
                "position": {"x": 1.0, "y": 0.0, "z": 0.0},
                "userData": {"physics": {"mass": "heavy"}}
            }
        ]}));
        let payload = live_scene_snapshot(scene.as_ref(), 100.0);
        assert_eq!(payload.objects.len(), 1);
        assert_eq!(payload.objects[0].uuid, "good");
    }
}
