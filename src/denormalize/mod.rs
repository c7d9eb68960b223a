//! Rebuilds a canonical humanoid skeleton next to a retargeted one and nests
//! the source bones underneath it.
//!
//! The phases run strictly in order on a private clone of the caller's tree:
//! snapshot, parallel build, armature resolution, reparenting, and finally
//! name deduplication over the merged result.

pub mod armature;
pub mod dedup;
pub mod parallel;
pub mod reparent;
pub mod snapshot;

#[cfg(test)]
mod fixtures;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::DenormalizeError;
use crate::humanoid::BoneId;
use crate::tree::{NodeId, NodeTree};

pub use armature::resolve_armature;
pub use dedup::{Rename, deduplicate_names};
pub use parallel::{ParallelSkeleton, build_parallel_skeleton, link_chain};
pub use reparent::{DENORMALIZED_SUFFIX, denormalized_name, reparent_originals};
pub use snapshot::{BoneResolver, SkeletonSnapshot, SnapshotBone};

/// Canonical rig definition handed to binding and export steps: the parallel
/// node of every bone present in the source rig.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvatarBinding {
    bones: BTreeMap<BoneId, NodeId>,
}

impl AvatarBinding {
    pub fn get(&self, bone: BoneId) -> Option<NodeId> {
        self.bones.get(&bone).copied()
    }

    pub fn contains(&self, bone: BoneId) -> bool {
        self.bones.contains_key(&bone)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, NodeId)> + '_ {
        self.bones.iter().map(|(bone, node)| (*bone, *node))
    }
}

impl From<&ParallelSkeleton> for AvatarBinding {
    fn from(parallel: &ParallelSkeleton) -> Self {
        Self {
            bones: parallel.iter().collect(),
        }
    }
}

impl BoneResolver for AvatarBinding {
    fn resolve(&self, bone: BoneId) -> Option<NodeId> {
        self.get(bone)
    }
}

/// Successful result of a denormalization run.
#[derive(Debug, Clone)]
pub struct Denormalized {
    /// Restructured copy of the input tree.
    pub tree: NodeTree,
    pub binding: AvatarBinding,
    pub renames: Vec<Rename>,
    /// Parallel armature, when the source Hips did not sit under the root.
    pub armature: Option<NodeId>,
}

impl Denormalized {
    /// Top-most node of the canonical skeleton.
    pub fn skeleton_root(&self) -> Option<NodeId> {
        self.armature.or_else(|| self.binding.get(BoneId::Hips))
    }
}

#[derive(Default)]
pub struct Denormalizer<'r> {
    character_root: Option<NodeId>,
    resolver: Option<&'r dyn BoneResolver>,
}

impl<'r> Denormalizer<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn character_root(mut self, root: NodeId) -> Self {
        self.character_root = Some(root);
        self
    }

    pub fn resolver(mut self, resolver: &'r dyn BoneResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Denormalize a clone of `tree`. The input is never modified, and on
    /// failure the partially restructured clone is dropped.
    pub fn run(&self, tree: &NodeTree) -> Result<Denormalized, DenormalizeError> {
        let character_root = self.character_root.ok_or_else(|| {
            DenormalizeError::MissingRequiredInput("no character root was supplied".to_string())
        })?;
        let resolver = self.resolver.ok_or_else(|| {
            DenormalizeError::MissingRequiredInput("no bone resolver was supplied".to_string())
        })?;
        if !tree.contains(character_root) {
            return Err(DenormalizeError::MissingRequiredInput(format!(
                "character root {character_root} is not part of the tree"
            )));
        }

        let snapshot = SkeletonSnapshot::capture(tree, resolver)?;
        validate_placement(tree, &snapshot, character_root)?;
        debug!(bones = snapshot.present_count(), "captured skeleton snapshot");

        let mut working = tree.clone();
        let parallel = build_parallel_skeleton(&mut working, &snapshot)?;
        let armature = resolve_armature(&mut working, &snapshot, &parallel, character_root)?;
        reparent_originals(&mut working, &snapshot, &parallel)?;

        let reserved: Vec<NodeId> = parallel
            .iter()
            .map(|(_, node)| node)
            .chain(armature)
            .collect();
        let renames = deduplicate_names(&mut working, character_root, &reserved)?;

        info!(
            bones = parallel.len(),
            armature_created = armature.is_some(),
            renamed = renames.len(),
            "denormalized skeleton"
        );

        Ok(Denormalized {
            tree: working,
            binding: AvatarBinding::from(&parallel),
            renames,
            armature,
        })
    }
}

/// Convenience wrapper around [`Denormalizer`].
pub fn denormalize(
    tree: &NodeTree,
    character_root: NodeId,
    resolver: &dyn BoneResolver,
) -> Result<Denormalized, DenormalizeError> {
    Denormalizer::new()
        .character_root(character_root)
        .resolver(resolver)
        .run(tree)
}

fn validate_placement(
    tree: &NodeTree,
    snapshot: &SkeletonSnapshot,
    character_root: NodeId,
) -> Result<(), DenormalizeError> {
    let hips_parent = snapshot.hips_parent();
    for (bone, source) in snapshot.bones().iter() {
        if source.node == character_root {
            return Err(DenormalizeError::InvalidRig(format!(
                "the character root is bound as {bone}"
            )));
        }
        if source.node == hips_parent {
            return Err(DenormalizeError::InvalidRig(format!(
                "Hips is parented under another humanoid bone ({bone})"
            )));
        }
    }

    if !tree.is_ancestor_or_self(character_root, snapshot.hips().node)? {
        return Err(DenormalizeError::InvalidRig(format!(
            "Hips node '{}' is not inside the character root",
            snapshot.hips().name
        )));
    }
    Ok(())
}
