use tracing::debug;

use super::parallel::ParallelSkeleton;
use super::reparent::denormalized_name;
use super::snapshot::SkeletonSnapshot;
use crate::error::DenormalizeError;
use crate::humanoid::BoneId;
use crate::tree::{NodeId, NodeTree};

/// Attach the parallel Hips to the character, fabricating a parallel
/// armature when the source Hips does not sit directly under the character
/// root.
///
/// Returns the created parallel armature, if any. When one is created it
/// takes the original armature's name and becomes the root's first child;
/// the original armature is renamed and moved underneath it.
pub fn resolve_armature(
    tree: &mut NodeTree,
    snapshot: &SkeletonSnapshot,
    parallel: &ParallelSkeleton,
    character_root: NodeId,
) -> Result<Option<NodeId>, DenormalizeError> {
    let hips = parallel.get(BoneId::Hips).ok_or_else(|| {
        DenormalizeError::StructuralInconsistency(
            "Hips is present but no parallel Hips was created".to_string(),
        )
    })?;

    let original_armature = snapshot.hips_parent();
    if original_armature == character_root {
        tree.set_parent_keep_world(hips, character_root)?;
        debug!("Hips sits under the character root, no armature needed");
        return Ok(None);
    }

    let armature_name = tree.node(original_armature)?.name().to_string();
    let root_position = tree.world_position(character_root)?;
    let armature = tree.create_detached(armature_name.clone(), root_position);
    tree.set_parent_keep_world(armature, character_root)?;
    tree.set_parent_keep_world(hips, armature)?;

    tree.rename(original_armature, denormalized_name(&armature_name))?;
    tree.set_parent_keep_world(original_armature, armature)?;
    tree.set_first_sibling(armature)?;

    debug!(armature = %armature_name, "created parallel armature");
    Ok(Some(armature))
}
