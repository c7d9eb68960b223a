use tracing::debug;

use super::snapshot::SkeletonSnapshot;
use crate::error::DenormalizeError;
use crate::humanoid::{BoneId, BoneMap, CHAINS, chain_edges};
use crate::tree::{NodeId, NodeTree};

/// Newly created canonical bones, present exactly where the snapshot is.
#[derive(Debug, Clone, Default)]
pub struct ParallelSkeleton {
    nodes: BoneMap<NodeId>,
}

impl ParallelSkeleton {
    pub fn get(&self, bone: BoneId) -> Option<NodeId> {
        self.nodes.get(bone).copied()
    }

    pub fn nodes(&self) -> &BoneMap<NodeId> {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, NodeId)> + '_ {
        self.nodes.iter().map(|(bone, node)| (bone, *node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Create one node per present bone at the bone's world position, then link
/// them into the canonical topology.
///
/// Hips is left detached; attaching it belongs to the armature step.
pub fn build_parallel_skeleton(
    tree: &mut NodeTree,
    snapshot: &SkeletonSnapshot,
) -> Result<ParallelSkeleton, DenormalizeError> {
    let mut nodes = BoneMap::new();
    for (bone, source) in snapshot.bones().iter() {
        let node = tree.create_detached(source.name.clone(), source.world_position);
        nodes.insert(bone, node);
    }

    for chain in CHAINS {
        link_chain(tree, &nodes, chain)?;
    }

    for (bone, node) in nodes.iter() {
        if bone != BoneId::Hips && tree.node(*node)?.parent().is_none() {
            return Err(DenormalizeError::StructuralInconsistency(format!(
                "parallel {bone} has no present ancestor to attach to"
            )));
        }
    }

    debug!(bones = nodes.len(), "built parallel skeleton");
    Ok(ParallelSkeleton { nodes })
}

/// Link one tip-to-root chain, bridging absent bones.
///
/// The fold carries the nearest present bone seen so far. At every
/// `(tip, root)` pair a present tip replaces it, and whenever both it and the
/// root exist it is parented under the root, keeping its world transform.
pub fn link_chain(
    tree: &mut NodeTree,
    parallel: &BoneMap<NodeId>,
    chain: &[BoneId],
) -> Result<(), DenormalizeError> {
    chain_edges(chain).try_fold(None, |last_tip: Option<NodeId>, edge| {
        let tip = parallel.get(edge.child).copied().or(last_tip);
        if let (Some(tip), Some(root)) = (tip, parallel.get(edge.parent).copied()) {
            tree.set_parent_keep_world(tip, root)?;
        }
        Ok::<_, DenormalizeError>(tip)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::denormalize::fixtures::RigBuilder;
    use crate::error::ErrorKind;

    fn detached_bones(tree: &mut NodeTree, bones: &[BoneId]) -> BoneMap<NodeId> {
        bones
            .iter()
            .enumerate()
            .map(|(index, bone)| {
                let node = tree.create_detached(bone.to_string(), Vector3::new(index as f32, 0.0, 0.0));
                (*bone, node)
            })
            .collect()
    }

    fn parent_bone(tree: &NodeTree, parallel: &BoneMap<NodeId>, bone: BoneId) -> Option<BoneId> {
        let parent = tree.node(*parallel.get(bone)?).ok()?.parent()?;
        parallel
            .iter()
            .find(|(_, node)| **node == parent)
            .map(|(bone, _)| bone)
    }

    #[test]
    fn given_missing_intermediate_when_linking_finger_chain_then_distal_attaches_to_proximal() {
        let mut tree = NodeTree::new("Avatar");
        let parallel = detached_bones(
            &mut tree,
            &[BoneId::LeftHand, BoneId::LeftIndexProximal, BoneId::LeftIndexDistal],
        );

        link_chain(
            &mut tree,
            &parallel,
            &[
                BoneId::LeftIndexDistal,
                BoneId::LeftIndexIntermediate,
                BoneId::LeftIndexProximal,
                BoneId::LeftHand,
            ],
        )
        .expect("link");

        assert_eq!(
            parent_bone(&tree, &parallel, BoneId::LeftIndexDistal),
            Some(BoneId::LeftIndexProximal)
        );
        assert_eq!(
            parent_bone(&tree, &parallel, BoneId::LeftIndexProximal),
            Some(BoneId::LeftHand)
        );
    }

    #[test]
    fn given_absent_tip_when_linking_optional_link_then_nothing_is_created_or_moved() {
        let mut tree = NodeTree::new("Avatar");
        let parallel = detached_bones(&mut tree, &[BoneId::Head]);
        let before = tree.len();

        link_chain(&mut tree, &parallel, &[BoneId::Jaw, BoneId::Head]).expect("link");

        assert_eq!(tree.len(), before);
        assert!(
            tree.node(*parallel.get(BoneId::Head).expect("head"))
                .expect("node")
                .children()
                .is_empty()
        );
    }

    #[test]
    fn given_two_missing_links_when_linking_then_gap_is_bridged_further_up() {
        let mut tree = NodeTree::new("Avatar");
        let parallel = detached_bones(&mut tree, &[BoneId::Chest, BoneId::LeftHand]);

        link_chain(
            &mut tree,
            &parallel,
            &[
                BoneId::LeftHand,
                BoneId::LeftLowerArm,
                BoneId::LeftUpperArm,
                BoneId::LeftShoulder,
                BoneId::UpperChest,
                BoneId::Chest,
                BoneId::Spine,
            ],
        )
        .expect("link");

        assert_eq!(
            parent_bone(&tree, &parallel, BoneId::LeftHand),
            Some(BoneId::Chest)
        );
    }

    #[test]
    fn given_rig_without_upper_chest_when_building_then_shoulders_and_neck_attach_to_chest() {
        let rig = RigBuilder::new()
            .all_bones()
            .without(&[BoneId::UpperChest])
            .build();
        let snapshot = SkeletonSnapshot::capture(&rig.tree, &rig.bones).expect("snapshot");
        let mut tree = rig.tree.clone();

        let parallel = build_parallel_skeleton(&mut tree, &snapshot).expect("build");

        assert!(parallel.get(BoneId::UpperChest).is_none());
        for bone in [BoneId::LeftShoulder, BoneId::RightShoulder, BoneId::Neck] {
            assert_eq!(parent_bone(&tree, parallel.nodes(), bone), Some(BoneId::Chest));
        }
    }

    #[test]
    fn given_full_rig_when_building_then_every_bone_follows_canonical_parent() {
        let rig = RigBuilder::new().all_bones().build();
        let snapshot = SkeletonSnapshot::capture(&rig.tree, &rig.bones).expect("snapshot");
        let mut tree = rig.tree.clone();

        let parallel = build_parallel_skeleton(&mut tree, &snapshot).expect("build");

        assert_eq!(parallel.len(), BoneId::COUNT);
        for bone in BoneId::ALL {
            assert_eq!(parent_bone(&tree, parallel.nodes(), bone), bone.parent(), "{bone}");
        }
    }

    #[test]
    fn given_built_skeleton_when_comparing_positions_then_they_match_snapshot() {
        let rig = RigBuilder::new()
            .bones(&[BoneId::Spine, BoneId::Chest, BoneId::Neck, BoneId::Head])
            .build();
        let snapshot = SkeletonSnapshot::capture(&rig.tree, &rig.bones).expect("snapshot");
        let mut tree = rig.tree.clone();

        let parallel = build_parallel_skeleton(&mut tree, &snapshot).expect("build");

        for (bone, node) in parallel.iter() {
            let expected = snapshot.get(bone).expect("present").world_position;
            let actual = tree.world_position(node).expect("world");
            assert!((actual - expected).norm() < 1e-4, "{bone}");
        }
    }

    #[test]
    fn given_finger_without_hand_when_building_then_structural_inconsistency_is_returned() {
        let rig = RigBuilder::new()
            .bones(&[BoneId::Spine, BoneId::LeftIndexProximal])
            .build();
        let snapshot = SkeletonSnapshot::capture(&rig.tree, &rig.bones).expect("snapshot");
        let mut tree = rig.tree.clone();

        let error = build_parallel_skeleton(&mut tree, &snapshot).expect_err("orphan");

        assert_eq!(error.kind(), ErrorKind::StructuralInconsistency);
    }
}
