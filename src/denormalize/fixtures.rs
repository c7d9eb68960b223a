//! Synthetic humanoid rigs shared by the denormalize tests.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use nalgebra::{UnitQuaternion, Vector3};

use crate::humanoid::{BoneId, parent_of};
use crate::tree::{LocalTransform, NodeId, NodeTree};

pub(crate) struct Rig {
    pub tree: NodeTree,
    pub bones: HashMap<BoneId, NodeId>,
    pub armature: Option<NodeId>,
    pub body: NodeId,
    pub accessories: Vec<NodeId>,
}

pub(crate) struct RigBuilder {
    bones: Vec<BoneId>,
    with_armature: bool,
    flattened: bool,
    accessories: Vec<(Option<BoneId>, String)>,
}

/// VRoid-style node name for a bone, e.g. `J_Bip_L_UpperArm`.
pub(crate) fn source_name(bone: BoneId) -> String {
    let name = bone.to_string();
    if let Some(rest) = name.strip_prefix("Left") {
        format!("J_Bip_L_{rest}")
    } else if let Some(rest) = name.strip_prefix("Right") {
        format!("J_Bip_R_{rest}")
    } else {
        format!("J_Bip_C_{name}")
    }
}

impl RigBuilder {
    pub fn new() -> Self {
        Self {
            bones: vec![BoneId::Hips],
            with_armature: true,
            flattened: false,
            accessories: Vec::new(),
        }
    }

    pub fn bones(mut self, bones: &[BoneId]) -> Self {
        self.bones.extend_from_slice(bones);
        self
    }

    pub fn all_bones(mut self) -> Self {
        self.bones = BoneId::ALL.to_vec();
        self
    }

    pub fn without(mut self, missing: &[BoneId]) -> Self {
        self.bones.retain(|bone| !missing.contains(bone));
        self
    }

    pub fn without_armature(mut self) -> Self {
        self.with_armature = false;
        self
    }

    /// Retargeted layout: bones are added in reverse canonical order and hang
    /// alternately from Hips and from the armature, ignoring the canonical
    /// hierarchy entirely.
    pub fn flattened(mut self) -> Self {
        self.flattened = true;
        self
    }

    /// Non-canonical node under `parent` (or under the character root).
    pub fn accessory(mut self, parent: Option<BoneId>, name: &str) -> Self {
        self.accessories.push((parent, name.to_string()));
        self
    }

    pub fn build(mut self) -> Rig {
        self.bones.sort();
        self.bones.dedup();

        let mut tree = NodeTree::new("Avatar");
        let root = tree.root();
        let body = tree
            .add_child(root, "Body", LocalTransform::identity())
            .expect("root exists");

        // FBX-style armature: centimetre bones under a rotated 0.01 scale.
        let armature = self.with_armature.then(|| {
            tree.add_child(
                root,
                "Armature",
                LocalTransform {
                    translation: Vector3::new(0.0, 0.0, 0.05),
                    rotation: UnitQuaternion::from_euler_angles(-FRAC_PI_2, 0.0, 0.0),
                    scale: Vector3::new(0.01, 0.01, 0.01),
                },
            )
            .expect("root exists")
        });

        let mut order = self.bones.clone();
        if self.flattened && order.len() > 1 {
            // Hips stays first so the other bones have somewhere to hang.
            order[1..].reverse();
        }

        let mut bones = HashMap::<BoneId, NodeId>::new();
        for (position, bone) in order.iter().enumerate() {
            let fallback = armature.unwrap_or(root);
            let parent = if self.flattened {
                match bones.get(&BoneId::Hips) {
                    Some(hips) if position % 2 == 0 => *hips,
                    _ => fallback,
                }
            } else {
                nearest_present_ancestor(*bone, &bones).unwrap_or(fallback)
            };
            let step = bone.index() as f32;
            let local = LocalTransform {
                translation: Vector3::new(1.0 + step * 0.25, 2.0, 8.0 - step * 0.1),
                rotation: UnitQuaternion::from_euler_angles(0.02 * step, -0.01 * step, 0.03),
                scale: Vector3::new(1.0, 1.0, 1.0),
            };
            let node = tree
                .add_child(parent, source_name(*bone), local)
                .expect("parent exists");
            bones.insert(*bone, node);
        }

        let mut accessories = Vec::new();
        for (parent, name) in &self.accessories {
            let parent = parent
                .and_then(|bone| bones.get(&bone).copied())
                .unwrap_or(root);
            let node = tree
                .add_child(
                    parent,
                    name.clone(),
                    LocalTransform::from_translation(Vector3::new(0.5, 0.5, 0.0)),
                )
                .expect("parent exists");
            accessories.push(node);
        }

        Rig {
            tree,
            bones,
            armature,
            body,
            accessories,
        }
    }
}

fn nearest_present_ancestor(bone: BoneId, bones: &HashMap<BoneId, NodeId>) -> Option<NodeId> {
    let mut current = parent_of(bone);
    while let Some(candidate) = current {
        if let Some(node) = bones.get(&candidate) {
            return Some(*node);
        }
        current = parent_of(candidate);
    }
    None
}
