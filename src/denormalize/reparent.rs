use tracing::debug;

use super::parallel::ParallelSkeleton;
use super::snapshot::SkeletonSnapshot;
use crate::error::DenormalizeError;
use crate::humanoid::BoneId;
use crate::tree::NodeTree;

/// Marker appended to every source node displaced by its canonical twin.
pub const DENORMALIZED_SUFFIX: &str = "(Denormalized)";

pub fn denormalized_name(name: &str) -> String {
    format!("{name}{DENORMALIZED_SUFFIX}")
}

/// Nest every source bone under its parallel counterpart, root to leaf.
///
/// World transforms of the moved bones, and therefore of everything still
/// hanging off them, are unchanged.
pub fn reparent_originals(
    tree: &mut NodeTree,
    snapshot: &SkeletonSnapshot,
    parallel: &ParallelSkeleton,
) -> Result<usize, DenormalizeError> {
    let mut moved = 0;
    for bone in BoneId::ALL {
        let (Some(source), Some(target)) = (snapshot.get(bone), parallel.get(bone)) else {
            continue;
        };

        let current = tree.node(source.node)?.name().to_string();
        tree.rename(source.node, denormalized_name(&current))?;
        tree.set_parent_keep_world(source.node, target)?;
        moved += 1;
    }

    debug!(moved, "nested source bones under parallel skeleton");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denormalize::armature::resolve_armature;
    use crate::denormalize::fixtures::RigBuilder;
    use crate::denormalize::parallel::build_parallel_skeleton;

    #[test]
    fn given_resolved_skeleton_when_reparenting_then_sources_nest_under_twins_in_place() {
        let rig = RigBuilder::new()
            .bones(&[BoneId::Spine, BoneId::Chest, BoneId::Neck, BoneId::Head])
            .accessory(Some(BoneId::Head), "Hair")
            .build();
        let hair = rig.accessories[0];
        let hair_before = rig.tree.world_matrix(hair).expect("world");
        let snapshot = SkeletonSnapshot::capture(&rig.tree, &rig.bones).expect("snapshot");
        let mut tree = rig.tree.clone();
        let parallel = build_parallel_skeleton(&mut tree, &snapshot).expect("parallel");
        let root = tree.root();
        resolve_armature(&mut tree, &snapshot, &parallel, root).expect("armature");

        let moved = reparent_originals(&mut tree, &snapshot, &parallel).expect("reparent");

        assert_eq!(moved, 5);
        for (bone, twin) in parallel.iter() {
            let source = snapshot.get(bone).expect("present");
            let node = tree.node(source.node).expect("node");
            assert_eq!(node.parent(), Some(twin));
            assert_eq!(node.name(), denormalized_name(&source.name));

            let before = rig.tree.world_matrix(source.node).expect("world");
            let after = tree.world_matrix(source.node).expect("world");
            assert!((before - after).norm() < 1e-3, "{bone}");
        }

        let hair_after = tree.world_matrix(hair).expect("world");
        assert!((hair_before - hair_after).norm() < 1e-3);
        assert_eq!(
            tree.node(hair).expect("node").parent(),
            Some(rig.bones[&BoneId::Head])
        );
    }
}
