use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::humanoid::BoneId;

/// Which VRM humanoid extension a file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VrmVersion {
    /// `extensions.VRM` (UniVRM 0.x).
    V0,
    /// `extensions.VRMC_vrm` (VRM 1.0).
    V1,
}

/// Humanoid bone assignments read from the VRM extension.
#[derive(Debug, Clone, Default)]
pub(super) struct HumanoidBones {
    pub(super) version: Option<VrmVersion>,
    /// Every recognized `(bone, node)` entry in file order, duplicates included.
    pub(super) entries: Vec<(BoneId, usize)>,
    pub(super) unrecognized: Vec<String>,
}

impl HumanoidBones {
    /// First node assigned to each bone.
    pub(super) fn nodes(&self) -> BTreeMap<BoneId, usize> {
        let mut nodes = BTreeMap::new();
        for (bone, node) in &self.entries {
            nodes.entry(*bone).or_insert(*node);
        }
        nodes
    }
}

/// Extract the humanoid bone → node index mapping.
///
/// VRM 1.0 wins when a file carries both extensions.
pub(super) fn extract_humanoid_bones(json: &Value) -> HumanoidBones {
    let mut bones = HumanoidBones::default();

    if let Some(vrmc_humanoid) = json
        .pointer("/extensions/VRMC_vrm/humanoid/humanBones")
        .and_then(Value::as_object)
    {
        bones.version = Some(VrmVersion::V1);
        for (bone_name, value) in vrmc_humanoid {
            let Some(node_index) = value
                .get("node")
                .and_then(Value::as_u64)
                .map(|value| value as usize)
            else {
                continue;
            };
            match BoneId::from_vrm1_name(bone_name) {
                Some(bone) => bones.entries.push((bone, node_index)),
                None => bones.unrecognized.push(bone_name.clone()),
            }
        }
        return bones;
    }

    if let Some(vrm_humanoid) = json
        .pointer("/extensions/VRM/humanoid/humanBones")
        .and_then(Value::as_array)
    {
        bones.version = Some(VrmVersion::V0);
        for value in vrm_humanoid {
            let bone_name = value.get("bone").and_then(Value::as_str);
            let node_index = value
                .get("node")
                .and_then(Value::as_u64)
                .map(|node| node as usize);

            if let (Some(bone_name), Some(node_index)) = (bone_name, node_index) {
                match BoneId::from_vrm_name(bone_name) {
                    Some(bone) => bones.entries.push((bone, node_index)),
                    None => bones.unrecognized.push(bone_name.to_string()),
                }
            }
        }
    }

    bones
}

/// Point the humanoid extension at new nodes.
pub(super) fn rebind_humanoid_bones(json: &mut Value, nodes: &BTreeMap<BoneId, usize>) {
    if let Some(vrmc_humanoid) = json
        .pointer_mut("/extensions/VRMC_vrm/humanoid/humanBones")
        .and_then(Value::as_object_mut)
    {
        for (bone, node) in nodes {
            if let Some(entry) = vrmc_humanoid.get_mut(bone.vrm1_name()) {
                entry["node"] = Value::from(*node);
            }
        }
    }

    if let Some(vrm_humanoid) = json
        .pointer_mut("/extensions/VRM/humanoid/humanBones")
        .and_then(Value::as_array_mut)
    {
        for entry in vrm_humanoid {
            let Some(bone) = entry
                .get("bone")
                .and_then(Value::as_str)
                .and_then(BoneId::from_vrm_name)
            else {
                continue;
            };
            if let Some(node) = nodes.get(&bone) {
                entry["node"] = Value::from(*node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn given_vrmc_humanoid_when_extracting_bones_then_thumbs_are_shifted() {
        let json = serde_json::json!({
            "extensions": {
                "VRMC_vrm": {
                    "humanoid": {
                        "humanBones": {
                            "hips": {"node": 1},
                            "leftThumbMetacarpal": {"node": 7},
                            "leftThumbProximal": {"node": 8},
                            "tail": {"node": 9}
                        }
                    }
                }
            }
        });

        let bones = extract_humanoid_bones(&json);
        let nodes = bones.nodes();

        assert_eq!(bones.version, Some(VrmVersion::V1));
        assert_eq!(nodes.get(&BoneId::Hips), Some(&1));
        assert_eq!(nodes.get(&BoneId::LeftThumbProximal), Some(&7));
        assert_eq!(nodes.get(&BoneId::LeftThumbIntermediate), Some(&8));
        assert_eq!(bones.unrecognized, vec!["tail".to_string()]);
    }

    #[test]
    fn given_vrm0_humanoid_when_extracting_bones_then_first_assignment_wins() {
        let json = serde_json::json!({
            "extensions": {
                "VRM": {
                    "humanoid": {
                        "humanBones": [
                            {"bone": "hips", "node": 2},
                            {"bone": "spine", "node": 3},
                            {"bone": "hips", "node": 4}
                        ]
                    }
                }
            }
        });

        let bones = extract_humanoid_bones(&json);

        assert_eq!(bones.version, Some(VrmVersion::V0));
        assert_eq!(bones.entries.len(), 3);
        assert_eq!(bones.nodes().get(&BoneId::Hips), Some(&2));
    }

    #[test]
    fn given_new_nodes_when_rebinding_then_both_extension_layouts_are_updated() {
        let mut json = serde_json::json!({
            "extensions": {
                "VRMC_vrm": {"humanoid": {"humanBones": {"hips": {"node": 1}}}},
                "VRM": {"humanoid": {"humanBones": [{"bone": "hips", "node": 1, "useDefaultValues": true}]}}
            }
        });
        let nodes = BTreeMap::from([(BoneId::Hips, 12)]);

        rebind_humanoid_bones(&mut json, &nodes);

        assert_eq!(
            json.pointer("/extensions/VRMC_vrm/humanoid/humanBones/hips/node"),
            Some(&serde_json::json!(12))
        );
        assert_eq!(
            json.pointer("/extensions/VRM/humanoid/humanBones/0/node"),
            Some(&serde_json::json!(12))
        );
        assert_eq!(
            json.pointer("/extensions/VRM/humanoid/humanBones/0/useDefaultValues"),
            Some(&serde_json::json!(true))
        );
    }
}
