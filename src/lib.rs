//! Skeleton denormalization for humanoid VRM avatars.
//!
//! Builds a canonical parallel skeleton at the current pose of a retargeted
//! rig, nests the original bones under it and rebinds the humanoid definition
//! to the new bones.

pub mod denormalize;
pub mod error;
pub mod humanoid;
pub mod logging;
pub mod project;
pub mod tree;
pub mod vrm;

pub use denormalize::{AvatarBinding, BoneResolver, Denormalized, Denormalizer, denormalize};
pub use error::{DenormalizeError, ErrorKind};
pub use humanoid::BoneId;
pub use tree::{LocalTransform, NodeId, NodeTree};
