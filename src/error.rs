//! Frame graph error types.
//!
//! Every variant is a usage error: it means the frame graph was described
//! incorrectly, not that something transient went wrong. Once one of these is
//! raised the current frame's graph is considered malformed and will refuse to
//! compile.

use thiserror::Error;

use crate::frame_graph::{Handle, ResourceKind};

/// Errors raised while building, compiling, or executing a frame graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameGraphError {
    /// The handle was already consumed by a read, write, subresource creation
    /// or move, and a newer handle must be used instead.
    #[error("stale handle {handle:?}: it was consumed by an earlier graph operation")]
    StaleHandle { handle: Handle },

    /// The handle was never issued by this frame graph.
    #[error("handle {handle:?} does not belong to this frame graph")]
    InvalidHandle { handle: Handle },

    /// A handle or descriptor was used with an incompatible resource kind.
    #[error("resource kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: ResourceKind,
        found: ResourceKind,
    },

    /// A resource descriptor has parameters that cannot be satisfied.
    #[error("invalid descriptor for resource '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// A pass tried to access a resource it did not declare during setup.
    #[error("pass '{pass}' did not declare access to {handle:?}")]
    UnboundAccess { pass: String, handle: Handle },
}

/// Result alias used across the frame graph API.
pub type FrameGraphResult<T> = Result<T, FrameGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameGraphError::KindMismatch {
            expected: ResourceKind::Texture,
            found: ResourceKind::TextureSubresource,
        };
        assert_eq!(
            err.to_string(),
            "resource kind mismatch: expected texture, found texture subresource"
        );

        let err = FrameGraphError::InvalidDescriptor {
            name: "shadow_map".to_string(),
            reason: "width must be non-zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid descriptor for resource 'shadow_map': width must be non-zero"
        );
    }
}
