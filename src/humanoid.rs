//! Canonical humanoid bone slots and the static topology relating them.

use std::fmt;

// ─── Bone identifiers ─────────────────────────────────────────────────────────

/// Canonical humanoid bone slot.
///
/// Variants are declared parent-before-child: iterating in ascending order
/// always visits a bone after its canonical parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoneId {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,
    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
    LeftEye,
    RightEye,
    Jaw,
}

impl BoneId {
    pub const COUNT: usize = 55;

    pub const ALL: [BoneId; BoneId::COUNT] = [
        BoneId::Hips,
        BoneId::Spine,
        BoneId::Chest,
        BoneId::UpperChest,
        BoneId::Neck,
        BoneId::Head,
        BoneId::LeftShoulder,
        BoneId::LeftUpperArm,
        BoneId::LeftLowerArm,
        BoneId::LeftHand,
        BoneId::RightShoulder,
        BoneId::RightUpperArm,
        BoneId::RightLowerArm,
        BoneId::RightHand,
        BoneId::LeftThumbProximal,
        BoneId::LeftThumbIntermediate,
        BoneId::LeftThumbDistal,
        BoneId::LeftIndexProximal,
        BoneId::LeftIndexIntermediate,
        BoneId::LeftIndexDistal,
        BoneId::LeftMiddleProximal,
        BoneId::LeftMiddleIntermediate,
        BoneId::LeftMiddleDistal,
        BoneId::LeftRingProximal,
        BoneId::LeftRingIntermediate,
        BoneId::LeftRingDistal,
        BoneId::LeftLittleProximal,
        BoneId::LeftLittleIntermediate,
        BoneId::LeftLittleDistal,
        BoneId::RightThumbProximal,
        BoneId::RightThumbIntermediate,
        BoneId::RightThumbDistal,
        BoneId::RightIndexProximal,
        BoneId::RightIndexIntermediate,
        BoneId::RightIndexDistal,
        BoneId::RightMiddleProximal,
        BoneId::RightMiddleIntermediate,
        BoneId::RightMiddleDistal,
        BoneId::RightRingProximal,
        BoneId::RightRingIntermediate,
        BoneId::RightRingDistal,
        BoneId::RightLittleProximal,
        BoneId::RightLittleIntermediate,
        BoneId::RightLittleDistal,
        BoneId::LeftUpperLeg,
        BoneId::LeftLowerLeg,
        BoneId::LeftFoot,
        BoneId::LeftToes,
        BoneId::RightUpperLeg,
        BoneId::RightLowerLeg,
        BoneId::RightFoot,
        BoneId::RightToes,
        BoneId::LeftEye,
        BoneId::RightEye,
        BoneId::Jaw,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn def(self) -> &'static BoneDef {
        let row = &BONES[self.index()];
        debug_assert_eq!(row.bone, self);
        row
    }

    /// Canonical parent bone, `None` for Hips.
    pub fn parent(self) -> Option<BoneId> {
        self.def().parent
    }

    pub fn is_optional(self) -> bool {
        self.def().optional
    }

    /// VRM 0.x humanoid bone name.
    pub fn vrm_name(self) -> &'static str {
        self.def().vrm_name
    }

    /// VRM 1.0 humanoid bone name. Thumbs were renamed in 1.0
    /// (Metacarpal/Proximal/Distal), everything else is shared with 0.x.
    pub fn vrm1_name(self) -> &'static str {
        match self {
            BoneId::LeftThumbProximal => "leftThumbMetacarpal",
            BoneId::LeftThumbIntermediate => "leftThumbProximal",
            BoneId::RightThumbProximal => "rightThumbMetacarpal",
            BoneId::RightThumbIntermediate => "rightThumbProximal",
            other => other.vrm_name(),
        }
    }

    pub fn from_vrm_name(name: &str) -> Option<BoneId> {
        BoneId::ALL
            .into_iter()
            .find(|bone| bone.vrm_name() == name)
    }

    pub fn from_vrm1_name(name: &str) -> Option<BoneId> {
        BoneId::ALL
            .into_iter()
            .find(|bone| bone.vrm1_name() == name)
    }
}

impl fmt::Display for BoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Canonical parent of `child`, `None` for the skeleton root.
pub fn parent_of(child: BoneId) -> Option<BoneId> {
    child.parent()
}

// ─── Topology table ───────────────────────────────────────────────────────────

struct BoneDef {
    bone: BoneId,
    vrm_name: &'static str,
    parent: Option<BoneId>,
    optional: bool,
}

impl BoneDef {
    const fn new(
        bone: BoneId,
        vrm_name: &'static str,
        parent: Option<BoneId>,
        optional: bool,
    ) -> Self {
        Self {
            bone,
            vrm_name,
            parent,
            optional,
        }
    }
}

/// One row per [`BoneId`], in declaration order.
const BONES: [BoneDef; BoneId::COUNT] = [
    BoneDef::new(BoneId::Hips, "hips", None, false),
    BoneDef::new(BoneId::Spine, "spine", Some(BoneId::Hips), false),
    BoneDef::new(BoneId::Chest, "chest", Some(BoneId::Spine), true),
    BoneDef::new(BoneId::UpperChest, "upperChest", Some(BoneId::Chest), true),
    BoneDef::new(BoneId::Neck, "neck", Some(BoneId::UpperChest), true),
    BoneDef::new(BoneId::Head, "head", Some(BoneId::Neck), false),
    BoneDef::new(BoneId::LeftShoulder, "leftShoulder", Some(BoneId::UpperChest), true),
    BoneDef::new(BoneId::LeftUpperArm, "leftUpperArm", Some(BoneId::LeftShoulder), false),
    BoneDef::new(BoneId::LeftLowerArm, "leftLowerArm", Some(BoneId::LeftUpperArm), false),
    BoneDef::new(BoneId::LeftHand, "leftHand", Some(BoneId::LeftLowerArm), false),
    BoneDef::new(BoneId::RightShoulder, "rightShoulder", Some(BoneId::UpperChest), true),
    BoneDef::new(BoneId::RightUpperArm, "rightUpperArm", Some(BoneId::RightShoulder), false),
    BoneDef::new(BoneId::RightLowerArm, "rightLowerArm", Some(BoneId::RightUpperArm), false),
    BoneDef::new(BoneId::RightHand, "rightHand", Some(BoneId::RightLowerArm), false),
    BoneDef::new(BoneId::LeftThumbProximal, "leftThumbProximal", Some(BoneId::LeftHand), true),
    BoneDef::new(BoneId::LeftThumbIntermediate, "leftThumbIntermediate", Some(BoneId::LeftThumbProximal), true),
    BoneDef::new(BoneId::LeftThumbDistal, "leftThumbDistal", Some(BoneId::LeftThumbIntermediate), true),
    BoneDef::new(BoneId::LeftIndexProximal, "leftIndexProximal", Some(BoneId::LeftHand), true),
    BoneDef::new(BoneId::LeftIndexIntermediate, "leftIndexIntermediate", Some(BoneId::LeftIndexProximal), true),
    BoneDef::new(BoneId::LeftIndexDistal, "leftIndexDistal", Some(BoneId::LeftIndexIntermediate), true),
    BoneDef::new(BoneId::LeftMiddleProximal, "leftMiddleProximal", Some(BoneId::LeftHand), true),
    BoneDef::new(BoneId::LeftMiddleIntermediate, "leftMiddleIntermediate", Some(BoneId::LeftMiddleProximal), true),
    BoneDef::new(BoneId::LeftMiddleDistal, "leftMiddleDistal", Some(BoneId::LeftMiddleIntermediate), true),
    BoneDef::new(BoneId::LeftRingProximal, "leftRingProximal", Some(BoneId::LeftHand), true),
    BoneDef::new(BoneId::LeftRingIntermediate, "leftRingIntermediate", Some(BoneId::LeftRingProximal), true),
    BoneDef::new(BoneId::LeftRingDistal, "leftRingDistal", Some(BoneId::LeftRingIntermediate), true),
    BoneDef::new(BoneId::LeftLittleProximal, "leftLittleProximal", Some(BoneId::LeftHand), true),
    BoneDef::new(BoneId::LeftLittleIntermediate, "leftLittleIntermediate", Some(BoneId::LeftLittleProximal), true),
    BoneDef::new(BoneId::LeftLittleDistal, "leftLittleDistal", Some(BoneId::LeftLittleIntermediate), true),
    BoneDef::new(BoneId::RightThumbProximal, "rightThumbProximal", Some(BoneId::RightHand), true),
    BoneDef::new(BoneId::RightThumbIntermediate, "rightThumbIntermediate", Some(BoneId::RightThumbProximal), true),
    BoneDef::new(BoneId::RightThumbDistal, "rightThumbDistal", Some(BoneId::RightThumbIntermediate), true),
    BoneDef::new(BoneId::RightIndexProximal, "rightIndexProximal", Some(BoneId::RightHand), true),
    BoneDef::new(BoneId::RightIndexIntermediate, "rightIndexIntermediate", Some(BoneId::RightIndexProximal), true),
    BoneDef::new(BoneId::RightIndexDistal, "rightIndexDistal", Some(BoneId::RightIndexIntermediate), true),
    BoneDef::new(BoneId::RightMiddleProximal, "rightMiddleProximal", Some(BoneId::RightHand), true),
    BoneDef::new(BoneId::RightMiddleIntermediate, "rightMiddleIntermediate", Some(BoneId::RightMiddleProximal), true),
    BoneDef::new(BoneId::RightMiddleDistal, "rightMiddleDistal", Some(BoneId::RightMiddleIntermediate), true),
    BoneDef::new(BoneId::RightRingProximal, "rightRingProximal", Some(BoneId::RightHand), true),
    BoneDef::new(BoneId::RightRingIntermediate, "rightRingIntermediate", Some(BoneId::RightRingProximal), true),
    BoneDef::new(BoneId::RightRingDistal, "rightRingDistal", Some(BoneId::RightRingIntermediate), true),
    BoneDef::new(BoneId::RightLittleProximal, "rightLittleProximal", Some(BoneId::RightHand), true),
    BoneDef::new(BoneId::RightLittleIntermediate, "rightLittleIntermediate", Some(BoneId::RightLittleProximal), true),
    BoneDef::new(BoneId::RightLittleDistal, "rightLittleDistal", Some(BoneId::RightLittleIntermediate), true),
    BoneDef::new(BoneId::LeftUpperLeg, "leftUpperLeg", Some(BoneId::Hips), false),
    BoneDef::new(BoneId::LeftLowerLeg, "leftLowerLeg", Some(BoneId::LeftUpperLeg), false),
    BoneDef::new(BoneId::LeftFoot, "leftFoot", Some(BoneId::LeftLowerLeg), false),
    BoneDef::new(BoneId::LeftToes, "leftToes", Some(BoneId::LeftFoot), true),
    BoneDef::new(BoneId::RightUpperLeg, "rightUpperLeg", Some(BoneId::Hips), false),
    BoneDef::new(BoneId::RightLowerLeg, "rightLowerLeg", Some(BoneId::RightUpperLeg), false),
    BoneDef::new(BoneId::RightFoot, "rightFoot", Some(BoneId::RightLowerLeg), false),
    BoneDef::new(BoneId::RightToes, "rightToes", Some(BoneId::RightFoot), true),
    BoneDef::new(BoneId::LeftEye, "leftEye", Some(BoneId::Head), true),
    BoneDef::new(BoneId::RightEye, "rightEye", Some(BoneId::Head), true),
    BoneDef::new(BoneId::Jaw, "jaw", Some(BoneId::Head), true),
];

/// A single `child → parent` relation of the canonical skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyEdge {
    pub child: BoneId,
    pub parent: BoneId,
}

/// Tip-to-root bone chains linked by the parallel builder.
///
/// Every consecutive pair is a [`parent_of`] edge. Arm, head and leg chains
/// all run down to Hips, so any missing torso or limb bone is bridged to the
/// next bone that exists. Finger chains stop at the hand and eye/jaw links
/// stop at the head: those bones have nothing to attach to when the hand or
/// head is absent (see [`unanchored_bones`]).
pub const CHAINS: &[&[BoneId]] = &[
    &[
        BoneId::LeftThumbDistal,
        BoneId::LeftThumbIntermediate,
        BoneId::LeftThumbProximal,
        BoneId::LeftHand,
    ],
    &[
        BoneId::LeftIndexDistal,
        BoneId::LeftIndexIntermediate,
        BoneId::LeftIndexProximal,
        BoneId::LeftHand,
    ],
    &[
        BoneId::LeftMiddleDistal,
        BoneId::LeftMiddleIntermediate,
        BoneId::LeftMiddleProximal,
        BoneId::LeftHand,
    ],
    &[
        BoneId::LeftRingDistal,
        BoneId::LeftRingIntermediate,
        BoneId::LeftRingProximal,
        BoneId::LeftHand,
    ],
    &[
        BoneId::LeftLittleDistal,
        BoneId::LeftLittleIntermediate,
        BoneId::LeftLittleProximal,
        BoneId::LeftHand,
    ],
    &[
        BoneId::RightThumbDistal,
        BoneId::RightThumbIntermediate,
        BoneId::RightThumbProximal,
        BoneId::RightHand,
    ],
    &[
        BoneId::RightIndexDistal,
        BoneId::RightIndexIntermediate,
        BoneId::RightIndexProximal,
        BoneId::RightHand,
    ],
    &[
        BoneId::RightMiddleDistal,
        BoneId::RightMiddleIntermediate,
        BoneId::RightMiddleProximal,
        BoneId::RightHand,
    ],
    &[
        BoneId::RightRingDistal,
        BoneId::RightRingIntermediate,
        BoneId::RightRingProximal,
        BoneId::RightHand,
    ],
    &[
        BoneId::RightLittleDistal,
        BoneId::RightLittleIntermediate,
        BoneId::RightLittleProximal,
        BoneId::RightHand,
    ],
    &[
        BoneId::LeftEye,
        BoneId::Head,
    ],
    &[
        BoneId::RightEye,
        BoneId::Head,
    ],
    &[
        BoneId::Jaw,
        BoneId::Head,
    ],
    &[
        BoneId::LeftHand,
        BoneId::LeftLowerArm,
        BoneId::LeftUpperArm,
        BoneId::LeftShoulder,
        BoneId::UpperChest,
        BoneId::Chest,
        BoneId::Spine,
        BoneId::Hips,
    ],
    &[
        BoneId::RightHand,
        BoneId::RightLowerArm,
        BoneId::RightUpperArm,
        BoneId::RightShoulder,
        BoneId::UpperChest,
        BoneId::Chest,
        BoneId::Spine,
        BoneId::Hips,
    ],
    &[
        BoneId::Head,
        BoneId::Neck,
        BoneId::UpperChest,
        BoneId::Chest,
        BoneId::Spine,
        BoneId::Hips,
    ],
    &[
        BoneId::LeftToes,
        BoneId::LeftFoot,
        BoneId::LeftLowerLeg,
        BoneId::LeftUpperLeg,
        BoneId::Hips,
    ],
    &[
        BoneId::RightToes,
        BoneId::RightFoot,
        BoneId::RightLowerLeg,
        BoneId::RightUpperLeg,
        BoneId::Hips,
    ],
];

/// Consecutive `(tip, root)` pairs of a chain as topology edges.
pub fn chain_edges(chain: &[BoneId]) -> impl Iterator<Item = TopologyEdge> + '_ {
    chain.windows(2).map(|pair| TopologyEdge {
        child: pair[0],
        parent: pair[1],
    })
}

/// Present bones that no chain can attach to a present ancestor.
///
/// Hips is never reported. A non-empty result means building a parallel
/// skeleton for this set of bones fails.
pub fn unanchored_bones(present: impl Fn(BoneId) -> bool) -> Vec<BoneId> {
    BoneId::ALL
        .into_iter()
        .filter(|bone| *bone != BoneId::Hips && present(*bone))
        .filter(|bone| {
            !CHAINS.iter().any(|chain| {
                chain
                    .iter()
                    .position(|link| link == bone)
                    .is_some_and(|at| chain[at + 1..].iter().any(|link| present(*link)))
            })
        })
        .collect()
}

// ─── Per-bone storage ─────────────────────────────────────────────────────────

/// Fixed-size map keyed by [`BoneId`], iterated in ascending bone order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMap<T> {
    slots: [Option<T>; BoneId::COUNT],
}

impl<T> Default for BoneMap<T> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl<T> BoneMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bone: BoneId) -> Option<&T> {
        self.slots[bone.index()].as_ref()
    }

    pub fn insert(&mut self, bone: BoneId, value: T) -> Option<T> {
        self.slots[bone.index()].replace(value)
    }

    pub fn contains(&self, bone: BoneId) -> bool {
        self.slots[bone.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &T)> + '_ {
        BoneId::ALL
            .into_iter()
            .zip(self.slots.iter())
            .filter_map(|(bone, slot)| slot.as_ref().map(|value| (bone, value)))
    }
}

impl<T> FromIterator<(BoneId, T)> for BoneMap<T> {
    fn from_iter<I: IntoIterator<Item = (BoneId, T)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (bone, value) in iter {
            map.insert(bone, value);
        }
        map
    }
}
