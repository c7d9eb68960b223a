use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use serde_json::Value;

use super::bones::HumanoidBones;
use super::gltf_utils::{collect_parent_index_map_from_json, node_count, node_name};
use super::types::{Severity, ValidationIssue};
use crate::humanoid::BoneId;

// ─── Source model validation ──────────────────────────────────────────────────

/// Validate that the source carries a VRM humanoid extension.
pub(super) fn validate_vrm_source(json: &Value) -> Result<()> {
    let vrm_extension_present = json
        .get("extensions")
        .and_then(Value::as_object)
        .map(|ext| ext.contains_key("VRM") || ext.contains_key("VRMC_vrm"))
        .unwrap_or(false);

    if vrm_extension_present {
        return Ok(());
    }

    bail!("[ERROR] Only VRM 0.x / VRM 1.0 files with a humanoid definition are supported")
}

// ─── Bone checks ──────────────────────────────────────────────────────────────

/// Required bones (per the humanoid definition) that the file does not assign.
pub(super) fn collect_missing_bones(bones: &HumanoidBones, optional: bool) -> Vec<BoneId> {
    let assigned = bones.nodes();
    BoneId::ALL
        .into_iter()
        .filter(|bone| bone.is_optional() == optional && !assigned.contains_key(bone))
        .collect()
}

/// Check that every humanoid bone points at its own existing node.
pub(super) fn validate_bone_nodes(json: &Value, bones: &HumanoidBones) -> Vec<ValidationIssue> {
    let count = node_count(json);
    let mut issues = Vec::new();
    let mut owners = HashMap::<usize, BoneId>::new();
    let mut seen = HashSet::<BoneId>::new();

    for (bone, node_index) in &bones.entries {
        if *node_index >= count {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "INVALID_BONE_NODE_INDEX".to_string(),
                message: format!(
                    "[ERROR] Bone '{}' references node {} but the file only has {} nodes",
                    bone.vrm_name(),
                    node_index,
                    count
                ),
            });
            continue;
        }

        if !seen.insert(*bone) {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "DUPLICATE_BONE_NODE".to_string(),
                message: format!(
                    "⚠️ Bone '{}' is assigned more than once; the first assignment is used",
                    bone.vrm_name()
                ),
            });
            continue;
        }

        if let Some(owner) = owners.insert(*node_index, *bone) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "DUPLICATE_BONE_NODE".to_string(),
                message: format!(
                    "[ERROR] Bones '{}' and '{}' share node {}",
                    owner.vrm_name(),
                    bone.vrm_name(),
                    node_index
                ),
            });
        }
    }

    issues
}

/// Warn about non-bone nodes that carry the name of a bone node or of the
/// armature. Denormalization will suffix them.
pub(super) fn collect_name_collisions(
    json: &Value,
    bones: &HumanoidBones,
    armature: Option<usize>,
) -> Vec<ValidationIssue> {
    let canonical: HashSet<usize> = bones
        .nodes()
        .values()
        .copied()
        .chain(armature)
        .collect();
    let reserved: HashSet<&str> = canonical
        .iter()
        .filter_map(|index| node_name(json, *index))
        .collect();

    (0..node_count(json))
        .filter(|index| !canonical.contains(index))
        .filter_map(|index| {
            let name = node_name(json, index)?;
            reserved.contains(name).then(|| ValidationIssue {
                severity: Severity::Warning,
                code: "NAME_COLLISION".to_string(),
                message: format!(
                    "⚠️ Node {} is named '{}' like a skeleton node and will be renamed",
                    index, name
                ),
            })
        })
        .collect()
}

/// Node the Hips bone hangs from, if Hips is assigned and has a parent node.
pub(super) fn find_armature_node(json: &Value, bones: &HumanoidBones) -> Option<usize> {
    let hips = bones.nodes().get(&BoneId::Hips).copied()?;
    collect_parent_index_map_from_json(json).get(&hips).copied()
}

// ─── Metadata extraction ──────────────────────────────────────────────────────

/// Extract model name from VRM metadata or asset generator.
pub(super) fn extract_model_name(json: &Value) -> Option<String> {
    json.pointer("/extensions/VRMC_vrm/meta/name")
        .or_else(|| json.pointer("/extensions/VRM/meta/title"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            json.get("asset")
                .and_then(|asset| asset.get("generator"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
}

/// Extract author/copyright metadata from VRM or asset section.
pub(super) fn extract_author(json: &Value) -> Option<String> {
    json.pointer("/extensions/VRMC_vrm/meta/authors/0")
        .or_else(|| json.pointer("/extensions/VRM/meta/author"))
        .and_then(Value::as_str)
        .filter(|author| !author.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            json.get("asset")
                .and_then(|asset| asset.get("copyright"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
}
