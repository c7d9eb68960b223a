use std::{borrow::Cow, collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use gltf::binary::{Glb, Header};
use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};
use serde_json::Value;

use crate::tree::LocalTransform;

// ─── GLB container ────────────────────────────────────────────────────────────

/// A `.vrm` / `.glb` file split into its editable JSON chunk and the
/// untouched binary chunk.
#[derive(Debug)]
pub(super) struct VrmContainer {
    header: Header,
    pub(super) json: Value,
    bin: Option<Vec<u8>>,
}

impl VrmContainer {
    pub(super) fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?;
        Self::from_slice(&bytes)
    }

    pub(super) fn from_slice(bytes: &[u8]) -> Result<Self> {
        let glb = Glb::from_slice(bytes).context("input VRM is not a GLB container")?;
        let json: Value = serde_json::from_slice(glb.json.as_ref())
            .context("failed to parse glTF JSON chunk from VRM")?;
        Ok(Self {
            header: glb.header,
            json,
            bin: glb.bin.map(|chunk| chunk.into_owned()),
        })
    }

    pub(super) fn to_bytes(&self) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(&self.json).context("failed to serialize glTF JSON")?;
        let glb = Glb {
            header: self.header.clone(),
            json: Cow::Owned(json_bytes),
            bin: self.bin.as_deref().map(Cow::Borrowed),
        };

        let mut out = Vec::new();
        glb.to_writer(&mut out)
            .context("failed to write output GLB")?;
        Ok(out)
    }

    pub(super) fn write(&self, path: &Path) -> Result<()> {
        let out = self.to_bytes()?;
        fs::write(path, out)
            .with_context(|| format!("failed to write output: {}", path.display()))?;
        Ok(())
    }
}

// ─── Node hierarchy helpers ───────────────────────────────────────────────────

pub(super) fn node_count(json: &Value) -> usize {
    json.get("nodes")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

pub(super) fn node_name(json: &Value, index: usize) -> Option<&str> {
    json.get("nodes")?
        .as_array()?
        .get(index)?
        .get("name")?
        .as_str()
}

/// Collect child→parent node index mapping from glTF JSON.
pub(super) fn collect_parent_index_map_from_json(json: &Value) -> HashMap<usize, usize> {
    let mut parent_map = HashMap::<usize, usize>::new();
    let Some(nodes) = json.get("nodes").and_then(Value::as_array) else {
        return parent_map;
    };

    for (parent_index, node) in nodes.iter().enumerate() {
        for child_index in child_indices(node) {
            parent_map.insert(child_index, parent_index);
        }
    }

    parent_map
}

pub(super) fn child_indices(node: &Value) -> Vec<usize> {
    index_list(node, "children")
}

/// Root nodes of a glTF scene, listed under `nodes` rather than `children`.
pub(super) fn scene_root_indices(scene: &Value) -> Vec<usize> {
    index_list(scene, "nodes")
}

fn index_list(value: &Value, key: &str) -> Vec<usize> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|indices| {
            indices
                .iter()
                .filter_map(|index| index.as_u64().map(|value| value as usize))
                .collect()
        })
        .unwrap_or_default()
}

/// Index of the scene the avatar lives in: `scene`, else the first one.
pub(super) fn active_scene_index(json: &Value) -> usize {
    json.get("scene")
        .and_then(Value::as_u64)
        .map(|value| value as usize)
        .unwrap_or(0)
}

// ─── Node TRS read / write ────────────────────────────────────────────────────

/// Read the local transform of a glTF node JSON object.
///
/// A `matrix` wins over TRS properties, as in the glTF spec.
pub(super) fn node_local_transform(node: &Value) -> LocalTransform {
    if let Some(matrix) = node.get("matrix").and_then(Value::as_array)
        && matrix.len() == 16
    {
        let mut values = [0.0f32; 16];
        for (index, value) in matrix.iter().enumerate() {
            values[index] = value.as_f64().unwrap_or(0.0) as f32;
        }
        return LocalTransform::from_matrix(&Matrix4::from_column_slice(&values));
    }

    let translation = node
        .get("translation")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 3)
        .map(|values| {
            Vector3::new(
                values[0].as_f64().unwrap_or(0.0) as f32,
                values[1].as_f64().unwrap_or(0.0) as f32,
                values[2].as_f64().unwrap_or(0.0) as f32,
            )
        })
        .unwrap_or(Vector3::new(0.0, 0.0, 0.0));

    let rotation = node
        .get("rotation")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 4)
        .map(|values| {
            UnitQuaternion::from_quaternion(Quaternion::new(
                values[3].as_f64().unwrap_or(1.0) as f32,
                values[0].as_f64().unwrap_or(0.0) as f32,
                values[1].as_f64().unwrap_or(0.0) as f32,
                values[2].as_f64().unwrap_or(0.0) as f32,
            ))
        })
        .unwrap_or_else(UnitQuaternion::identity);

    let scale = node
        .get("scale")
        .and_then(Value::as_array)
        .filter(|values| values.len() == 3)
        .map(|values| {
            Vector3::new(
                values[0].as_f64().unwrap_or(1.0) as f32,
                values[1].as_f64().unwrap_or(1.0) as f32,
                values[2].as_f64().unwrap_or(1.0) as f32,
            )
        })
        .unwrap_or(Vector3::new(1.0, 1.0, 1.0));

    LocalTransform {
        translation,
        rotation,
        scale,
    }
}

/// Write a local transform back into a glTF node as TRS, dropping any matrix.
pub(super) fn set_node_local_transform(node: &mut Value, local: &LocalTransform) {
    let Some(object) = node.as_object_mut() else {
        return;
    };

    let translation = local.translation;
    let rotation = local.rotation;
    let scale = local.scale;

    object.remove("matrix");
    object.insert(
        "translation".to_string(),
        serde_json::json!([translation.x, translation.y, translation.z]),
    );
    object.insert(
        "rotation".to_string(),
        serde_json::json!([
            rotation.coords.x,
            rotation.coords.y,
            rotation.coords.z,
            rotation.coords.w
        ]),
    );
    object.insert(
        "scale".to_string(),
        serde_json::json!([scale.x, scale.y, scale.z]),
    );
}
