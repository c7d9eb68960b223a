//! VRM front end: reads a `.vrm` container, runs the skeleton denormalizer on
//! its node hierarchy and writes the rebound avatar back out.

mod bones;
mod gltf_utils;
mod meta;
mod scene;
mod types;
mod validation;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::denormalize::Denormalizer;
use crate::humanoid::{BoneId, BoneMap, unanchored_bones};
use crate::project::ExportSettings;
use crate::tree::NodeId;

pub use bones::VrmVersion;
pub use types::{
    AnalysisReport, BoundBone, DenormalizeReport, RenamedNode, Severity, ValidationIssue,
};

use bones::{HumanoidBones, extract_humanoid_bones, rebind_humanoid_bones};
use gltf_utils::{VrmContainer, node_count, node_name};
use meta::apply_meta_override;
use scene::{build_scene_tree, write_scene_tree};
use validation::{
    collect_missing_bones, collect_name_collisions, extract_author, extract_model_name,
    find_armature_node, validate_bone_nodes, validate_vrm_source,
};

// ─── Public API ───────────────────────────────────────────────────────────────

/// Analyze a VRM file and return validation + humanoid information.
pub fn analyze_avatar(input_path: &Path) -> Result<AnalysisReport> {
    let container = VrmContainer::load(input_path)?;
    Ok(analyze_json(&container.json, input_path))
}

/// Denormalize the skeleton of a VRM file and write the result to `output_path`.
///
/// Refuses to run when analysis reports errors. The input file is never
/// modified.
pub fn denormalize_avatar(
    input_path: &Path,
    output_path: &Path,
    settings: &ExportSettings,
) -> Result<DenormalizeReport> {
    let mut container = VrmContainer::load(input_path)?;
    let analysis = analyze_json(&container.json, input_path);

    if analysis.has_errors() {
        let message = analysis
            .issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .map(|issue| issue.message.clone())
            .collect::<Vec<String>>()
            .join(" / ");
        bail!(message);
    }

    let bones = extract_humanoid_bones(&container.json);
    let node_count_before = node_count(&container.json);

    let outcome = if settings.denormalize {
        denormalize_scene(&mut container.json, &bones)?
    } else {
        info!("skeleton denormalization disabled, only meta is applied");
        SceneOutcome::default()
    };
    let meta_applied = apply_meta_override(&mut container.json, bones.version, &settings.meta);

    container.write(output_path)?;

    let mut report = DenormalizeReport {
        model_name: extract_model_name(&container.json).unwrap_or(analysis.model_name),
        author: extract_author(&container.json),
        output_path: output_path.display().to_string(),
        denormalized: settings.denormalize,
        node_count_before,
        node_count_after: node_count(&container.json),
        armature_created: outcome.armature_created,
        bound_bones: outcome.bound_bones,
        renamed_nodes: outcome.renamed_nodes,
        meta_applied,
        issues: analysis.issues,
    };

    if settings.write_report {
        let report_path = report_path_for_output(output_path);
        write_report(&report_path, &report)?;
        report.issues.push(ValidationIssue {
            severity: Severity::Info,
            code: "REPORT_WRITTEN".to_string(),
            message: format!("[INFO] Denormalize report written: {}", report_path.display()),
        });
    }

    info!(
        output = %output_path.display(),
        nodes_before = report.node_count_before,
        nodes_after = report.node_count_after,
        "wrote avatar"
    );
    Ok(report)
}

/// Write any report as pretty JSON.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let content =
        serde_json::to_string_pretty(report).context("failed to serialize report as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    Ok(())
}

/// Sidecar report path for an output avatar, e.g. `avatar.denormalize.json`.
pub fn report_path_for_output(output_path: &Path) -> PathBuf {
    output_path.with_extension("denormalize.json")
}

// ─── Private orchestration ────────────────────────────────────────────────────

fn analyze_json(json: &Value, input_path: &Path) -> AnalysisReport {
    let mut issues = Vec::<ValidationIssue>::new();

    if let Err(err) = validate_vrm_source(json) {
        issues.push(ValidationIssue {
            severity: Severity::Error,
            code: "UNSUPPORTED_SOURCE".to_string(),
            message: err.to_string(),
        });
    }

    let bones = extract_humanoid_bones(json);
    let assigned = bones.nodes();

    if !assigned.contains_key(&BoneId::Hips) {
        issues.push(ValidationIssue {
            severity: Severity::Error,
            code: "MISSING_HIPS".to_string(),
            message: "[ERROR] The humanoid does not assign a hips bone".to_string(),
        });
    }

    let missing_required_bones = collect_missing_bones(&bones, false);
    for missing in missing_required_bones
        .iter()
        .filter(|bone| **bone != BoneId::Hips)
    {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "MISSING_REQUIRED_BONE".to_string(),
            message: format!(
                "⚠️ Required bone '{}' was not found; the skeleton is bridged over it where possible",
                missing.vrm_name()
            ),
        });
    }

    if assigned.contains_key(&BoneId::Hips) {
        for orphan in unanchored_bones(|bone| assigned.contains_key(&bone)) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "UNANCHORED_BONE".to_string(),
                message: format!(
                    "[ERROR] Bone '{}' has no assigned ancestor to attach to (missing '{}')",
                    orphan.vrm_name(),
                    orphan.parent().map(BoneId::vrm_name).unwrap_or("hips")
                ),
            });
        }
    }

    for name in &bones.unrecognized {
        issues.push(ValidationIssue {
            severity: Severity::Info,
            code: "UNRECOGNIZED_BONE".to_string(),
            message: format!("[INFO] Humanoid bone '{name}' is not part of the skeleton and is ignored"),
        });
    }

    issues.extend(validate_bone_nodes(json, &bones));

    let armature = find_armature_node(json, &bones);
    issues.extend(collect_name_collisions(json, &bones, armature));

    debug!(issues = issues.len(), bones = assigned.len(), "analyzed avatar");

    AnalysisReport {
        model_name: extract_model_name(json)
            .unwrap_or_else(|| input_path.to_string_lossy().to_string()),
        author: extract_author(json),
        vrm_version: bones.version,
        node_count: node_count(json),
        mesh_count: json
            .get("meshes")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0),
        present_bones: assigned
            .keys()
            .map(|bone| bone.vrm_name().to_string())
            .collect(),
        missing_required_bones: missing_required_bones
            .iter()
            .map(|bone| bone.vrm_name().to_string())
            .collect(),
        missing_optional_bones: collect_missing_bones(&bones, true)
            .iter()
            .map(|bone| bone.vrm_name().to_string())
            .collect(),
        armature_name: armature.and_then(|index| node_name(json, index).map(ToOwned::to_owned)),
        issues,
    }
}

#[derive(Debug, Default)]
struct SceneOutcome {
    armature_created: bool,
    bound_bones: Vec<BoundBone>,
    renamed_nodes: Vec<RenamedNode>,
}

fn denormalize_scene(json: &mut Value, bones: &HumanoidBones) -> Result<SceneOutcome> {
    let scene = build_scene_tree(json)?;
    let resolver: BoneMap<NodeId> = bones
        .nodes()
        .into_iter()
        .filter_map(|(bone, index)| scene.node_id(index).map(|id| (bone, id)))
        .collect();

    let result = Denormalizer::new()
        .character_root(scene.character_root())
        .resolver(&resolver)
        .run(&scene.tree)
        .context("failed to denormalize the avatar skeleton")?;

    let index_of = write_scene_tree(json, &scene, &result.tree)?;

    let mut binding = BTreeMap::<BoneId, usize>::new();
    let mut bound_bones = Vec::new();
    for (bone, node) in result.binding.iter() {
        let Some(index) = index_of.get(&node).copied() else {
            bail!("parallel {bone} was not written to the output");
        };
        binding.insert(bone, index);
        bound_bones.push(BoundBone {
            bone: bone.vrm_name().to_string(),
            node_index: index,
            node_name: result.tree.node(node)?.name().to_string(),
        });
    }
    rebind_humanoid_bones(json, &binding);

    let renamed_nodes = result
        .renames
        .iter()
        .filter_map(|rename| {
            let node_index = index_of.get(&rename.node).copied()?;
            Some(RenamedNode {
                node_index,
                old_name: rename.old_name.clone(),
                new_name: rename.new_name.clone(),
            })
        })
        .collect();

    Ok(SceneOutcome {
        armature_created: result.armature.is_some(),
        bound_bones,
        renamed_nodes,
    })
}
