use serde::Serialize;
use thiserror::Error;

use crate::tree::TreeError;

/// Discriminant of a [`DenormalizeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidRig,
    MissingRequiredInput,
    StructuralInconsistency,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DenormalizeError {
    /// The source rig cannot be denormalized (e.g. it has no Hips).
    #[error("Invalid rig: {0}")]
    InvalidRig(String),

    /// A required collaborator (character root, bone resolver) was not supplied.
    #[error("Missing required input: {0}")]
    MissingRequiredInput(String),

    /// An internal invariant was violated while restructuring the tree.
    #[error("Structural inconsistency: {0}")]
    StructuralInconsistency(String),
}

impl DenormalizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DenormalizeError::InvalidRig(_) => ErrorKind::InvalidRig,
            DenormalizeError::MissingRequiredInput(_) => ErrorKind::MissingRequiredInput,
            DenormalizeError::StructuralInconsistency(_) => ErrorKind::StructuralInconsistency,
        }
    }
}

impl From<TreeError> for DenormalizeError {
    fn from(error: TreeError) -> Self {
        DenormalizeError::StructuralInconsistency(error.to_string())
    }
}
