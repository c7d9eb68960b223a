use std::collections::HashMap;

use nalgebra::Vector3;

use crate::error::DenormalizeError;
use crate::humanoid::{BoneId, BoneMap};
use crate::tree::{NodeId, NodeTree};

/// Maps a canonical bone slot to the node that currently plays it.
pub trait BoneResolver {
    fn resolve(&self, bone: BoneId) -> Option<NodeId>;
}

impl<F> BoneResolver for F
where
    F: Fn(BoneId) -> Option<NodeId>,
{
    fn resolve(&self, bone: BoneId) -> Option<NodeId> {
        self(bone)
    }
}

impl BoneResolver for HashMap<BoneId, NodeId> {
    fn resolve(&self, bone: BoneId) -> Option<NodeId> {
        self.get(&bone).copied()
    }
}

impl BoneResolver for BoneMap<NodeId> {
    fn resolve(&self, bone: BoneId) -> Option<NodeId> {
        self.get(bone).copied()
    }
}

/// A source bone as it was when the snapshot was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBone {
    pub node: NodeId,
    pub name: String,
    pub world_position: Vector3<f32>,
}

/// Read-only capture of every present canonical bone of a source rig.
#[derive(Debug, Clone)]
pub struct SkeletonSnapshot {
    bones: BoneMap<SnapshotBone>,
    hips: SnapshotBone,
    hips_parent: NodeId,
}

impl SkeletonSnapshot {
    /// Resolve and record every bone slot. Absent bones stay absent.
    ///
    /// Fails with `InvalidRig` when Hips is missing or has no parent, when a
    /// bone resolves to a node outside the tree, or when two bones share a node.
    pub fn capture(
        tree: &NodeTree,
        resolver: &dyn BoneResolver,
    ) -> Result<Self, DenormalizeError> {
        let mut bones = BoneMap::new();
        let mut owners = HashMap::<NodeId, BoneId>::new();

        for bone in BoneId::ALL {
            let Some(node) = resolver.resolve(bone) else {
                continue;
            };
            if !tree.contains(node) {
                return Err(DenormalizeError::InvalidRig(format!(
                    "{bone} resolves to node {node}, which is not part of the rig"
                )));
            }
            if let Some(owner) = owners.insert(node, bone) {
                return Err(DenormalizeError::InvalidRig(format!(
                    "{owner} and {bone} are both bound to node {node}"
                )));
            }

            bones.insert(
                bone,
                SnapshotBone {
                    node,
                    name: tree.node(node)?.name().to_string(),
                    world_position: tree.world_position(node)?,
                },
            );
        }

        let Some(hips) = bones.get(BoneId::Hips).cloned() else {
            return Err(DenormalizeError::InvalidRig(
                "the rig does not define a Hips bone".to_string(),
            ));
        };
        let Some(hips_parent) = tree.node(hips.node)?.parent() else {
            return Err(DenormalizeError::InvalidRig(format!(
                "Hips node '{}' has no parent",
                hips.name
            )));
        };

        Ok(Self {
            bones,
            hips,
            hips_parent,
        })
    }

    pub fn get(&self, bone: BoneId) -> Option<&SnapshotBone> {
        self.bones.get(bone)
    }

    pub fn bones(&self) -> &BoneMap<SnapshotBone> {
        &self.bones
    }

    pub fn hips(&self) -> &SnapshotBone {
        &self.hips
    }

    /// Parent of the Hips node at capture time (the original armature).
    pub fn hips_parent(&self) -> NodeId {
        self.hips_parent
    }

    pub fn present_count(&self) -> usize {
        self.bones.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denormalize::fixtures::RigBuilder;
    use crate::error::ErrorKind;

    #[test]
    fn given_rig_without_hips_when_capturing_then_invalid_rig_is_returned() {
        let rig = RigBuilder::new().bones(&[BoneId::Spine, BoneId::Head]).build();
        let mut resolver = rig.bones.clone();
        resolver.remove(&BoneId::Hips);

        let error = SkeletonSnapshot::capture(&rig.tree, &resolver).expect_err("no hips");

        assert_eq!(error.kind(), ErrorKind::InvalidRig);
    }

    #[test]
    fn given_two_bones_on_one_node_when_capturing_then_invalid_rig_is_returned() {
        let rig = RigBuilder::new().bones(&[BoneId::Spine]).build();
        let hips = rig.bones[&BoneId::Hips];
        let resolver = move |bone: BoneId| match bone {
            BoneId::Hips | BoneId::Spine => Some(hips),
            _ => None,
        };

        let error = SkeletonSnapshot::capture(&rig.tree, &resolver).expect_err("shared node");

        assert_eq!(error.kind(), ErrorKind::InvalidRig);
    }

    #[test]
    fn given_partial_rig_when_capturing_then_absent_bones_are_not_defaulted() {
        let rig = RigBuilder::new()
            .bones(&[BoneId::Spine, BoneId::Chest, BoneId::Head])
            .build();

        let snapshot = SkeletonSnapshot::capture(&rig.tree, &rig.bones).expect("snapshot");

        assert_eq!(snapshot.present_count(), 4);
        assert!(snapshot.get(BoneId::UpperChest).is_none());
        assert!(snapshot.get(BoneId::Neck).is_none());
        assert_eq!(snapshot.hips_parent(), rig.armature.expect("armature"));

        let head = snapshot.get(BoneId::Head).expect("head");
        let expected = rig.tree.world_position(head.node).expect("world");
        assert!((head.world_position - expected).norm() < 1e-6);
        assert_eq!(head.name, "J_Bip_C_Head");
    }
}
