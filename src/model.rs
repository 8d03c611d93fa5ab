//! Object model of the viewer scene.
//!
//! These records mirror what the viewer holds for each scene object. Every
//! field may be absent; the serializer in [`crate::scene`] fills the gaps with
//! defaults instead of failing.

use serde::{Deserialize, Deserializer, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

use crate::types::Vec3;

/// Geometry descriptor: the viewer's geometry class name and its constructor
/// parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub parameters: Value,
}

impl Geometry {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: Value::Null,
        }
    }
}

/// Surface material. `color` is either a hex integer or a CSS-style string.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Material {
    #[serde(default)]
    #[schema(value_type = Object, nullable = true)]
    pub color: Option<Value>,
    #[serde(default)]
    pub metalness: Option<f64>,
    #[serde(default)]
    pub roughness: Option<f64>,
}

impl Material {
    /// Color as a `0xRRGGBB` integer.
    ///
    /// Accepts integers and strings of the forms `#rrggbb`, `0xrrggbb` and
    /// `rrggbb`. Anything else yields `None`.
    pub fn color_hex(&self) -> Option<u32> {
        match self.color.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => {
                let s = s.trim();
                let digits = s
                    .strip_prefix('#')
                    .or_else(|| s.strip_prefix("0x"))
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                u32::from_str_radix(digits, 16).ok()
            }
            _ => None,
        }
    }
}

/// Physics hint attached by the editor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PhysicsHint {
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub mass: Option<f64>,
}

/// Free-form per-object data; only the keys read by the serializer are typed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub physics: Option<PhysicsHint>,
    #[serde(default)]
    pub position_mode: Option<String>,
}

fn default_visible() -> bool {
    true
}

/// A single object of the scene graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "uuid": "4f1c",
    "type": "Mesh",
    "geometry": {"type": "SphereGeometry", "parameters": {"radius": 2.0}},
    "position": {"x": 1.0, "y": 2.0, "z": 0.0}
}))]
pub struct SceneObject {
    #[serde(default)]
    pub uuid: String,
    /// Object class, e.g. `Mesh`, `Group` or `PointLight`.
    #[serde(default, rename = "type")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub is_mesh: bool,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub scale: Option<Vec3>,
    #[serde(default)]
    pub rotation: Option<Vec3>,
    #[serde(default)]
    pub material: Option<Material>,
    #[serde(default)]
    pub user_data: UserData,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl SceneObject {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            object_type: None,
            is_mesh: false,
            geometry: None,
            position: None,
            scale: None,
            rotation: None,
            material: None,
            user_data: UserData::default(),
            visible: true,
        }
    }

    /// Mesh-like objects are the ones the packing backend can place.
    ///
    /// Either flagged as a mesh, typed as one (`Mesh`, `InstancedMesh`, ...),
    /// or untyped but carrying a geometry.
    pub fn is_mesh_like(&self) -> bool {
        if self.is_mesh {
            return true;
        }
        match self.object_type.as_deref() {
            Some(kind) => kind.ends_with("Mesh"),
            None => self.geometry.is_some(),
        }
    }
}

/// Reads scene objects one at a time. An object that cannot be read is
/// dropped with a warning and the others are kept.
pub fn parse_objects(values: Vec<Value>) -> Vec<SceneObject> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(object) => Some(object),
            Err(err) => {
                warn!(index, error = %err, "skipping unreadable scene object");
                None
            }
        })
        .collect()
}

/// `deserialize_with` adapter for object lists, see [`parse_objects`].
pub fn deserialize_objects<'de, D>(deserializer: D) -> Result<Vec<SceneObject>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer).map(parse_objects)
}

fn deserialize_children<'de, D>(deserializer: D) -> Result<Option<Vec<SceneObject>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Value>>::deserialize(deserializer).map(|children| children.map(parse_objects))
}

/// Handle on the live scene graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Scene {
    #[serde(default, deserialize_with = "deserialize_children")]
    pub children: Option<Vec<SceneObject>>,
}

impl Scene {
    /// Reads a scene from untyped JSON. Malformed input yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}
