use serde::{Deserialize, Serialize};

use super::bones::VrmVersion;

/// Severity level used by validation issues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single validation issue produced during analysis/denormalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// Analysis-only report generated without writing output files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub model_name: String,
    pub author: Option<String>,
    pub vrm_version: Option<VrmVersion>,
    pub node_count: usize,
    pub mesh_count: usize,
    /// VRM 0.x names of the humanoid bones the file assigns.
    pub present_bones: Vec<String>,
    pub missing_required_bones: Vec<String>,
    pub missing_optional_bones: Vec<String>,
    /// Name of the node Hips hangs from, when that is not the scene itself.
    pub armature_name: Option<String>,
    pub issues: Vec<ValidationIssue>,
}

impl AnalysisReport {
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }
}

/// A canonical bone and the output node now carrying it.
#[derive(Debug, Clone, Serialize)]
pub struct BoundBone {
    pub bone: String,
    pub node_index: usize,
    pub node_name: String,
}

/// A node renamed because it shadowed a canonical name.
#[derive(Debug, Clone, Serialize)]
pub struct RenamedNode {
    pub node_index: usize,
    pub old_name: String,
    pub new_name: String,
}

/// Full report returned after writing a denormalized avatar.
#[derive(Debug, Clone, Serialize)]
pub struct DenormalizeReport {
    pub model_name: String,
    pub author: Option<String>,
    pub output_path: String,
    pub denormalized: bool,
    pub node_count_before: usize,
    pub node_count_after: usize,
    pub armature_created: bool,
    pub bound_bones: Vec<BoundBone>,
    pub renamed_nodes: Vec<RenamedNode>,
    pub meta_applied: bool,
    pub issues: Vec<ValidationIssue>,
}
