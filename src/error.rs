//! The compiler's typed failure taxonomy.
//!
//! Every fallible entry point in this crate returns [`CompileResult<T>`].
//! Validation failures that a well-formed caller can recover from (an
//! unregistered intrinsic, an argument shape the mapper can't flatten, a
//! shared-memory kernel that violates the implicit-grouped policy) get their
//! own variant. Anything else that goes wrong inside the orchestrator is
//! wrapped in [`CompileError::Internal`] with the original error kept as the
//! source, *unless* it is already one of our own variants, in which case it
//! propagates unchanged (see [`crate::backend::Backend::compile`]).

use crate::ir::MethodRef;
use crate::platform::TargetPlatform;
use crate::types::TypeNode;

/// Convenience alias used throughout the crate.
pub type CompileResult<T> = Result<T, CompileError>;

/// The five (plus one, diagnostic) kinds of failure this crate can produce.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// A method is marked intrinsic but no backend implementation mapping
    /// was found for it during [`crate::backend_context::BackendContext`]
    /// validation.
    #[error("no backend mapping registered for intrinsic method `{0}`")]
    NotSupportedIntrinsic(MethodRef),

    /// The artifact was requested for a platform the backend instance was
    /// not constructed for.
    #[error("requested platform {requested:?} does not match backend platform {actual:?}")]
    NotSupportedPlatform {
        /// The platform the caller asked for.
        requested: TargetPlatform,
        /// The platform this backend instance actually targets.
        actual: TargetPlatform,
    },

    /// A code generator was asked to lower an IR node it cannot emit: either
    /// a node kind the transformer pipeline should have eliminated (view
    /// casts, sub-view, new-view, length, undefined, handle, output-write,
    /// accelerator-type; see the kernel code generation contract), or a
    /// register/value that was never bound.
    #[error("invalid code generation: {0}")]
    InvalidCodeGeneration(String),

    /// A host-side parameter type cannot be flattened into device-
    /// marshallable slots by the argument mapper.
    #[error("unsupported parameter type for kernel argument mapping: {0:?}")]
    UnsupportedParameterType(TypeNode),

    /// An implicitly-indexed kernel (as opposed to grouped) declared one or
    /// more shared-memory variables, which the entry-point construction
    /// policy rejects.
    #[error("kernel has an implicit index type but declares shared memory, which is unsupported")]
    UnsupportedSharedMemoryUse,

    /// A failure that does not fit any typed category above. The source
    /// error is preserved so the original cause chain survives across the
    /// orchestrator boundary.
    #[error("internal compiler error: {message}")]
    Internal {
        /// Human-readable summary of what the orchestrator was doing.
        message: String,
        /// The underlying cause, if one is available.
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl CompileError {
    /// Build an [`CompileError::Internal`] from an arbitrary error, wrapping
    /// it only if it is not already a [`CompileError`].
    ///
    /// This is the single place double-wrapping is prevented: the
    /// orchestrator's top-level `catch` calls this, and an already-typed
    /// `CompileError` downcast is re-thrown unchanged.
    pub fn wrap_unexpected<E>(context: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: context.into(),
            cause: Some(Box::new(err)),
        }
    }

    /// Construct a bare internal error with no underlying cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            cause: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_wraps_foreign_errors_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let wrapped = CompileError::wrap_unexpected("emitting constants", io_err);
        match &wrapped {
            CompileError::Internal { cause, .. } => {
                assert!(cause.is_some());
            }
            _ => panic!("expected Internal variant"),
        }
        assert!(std::error::Error::source(&wrapped).is_some());
    }

    #[test]
    fn display_messages_are_stable() {
        let err = CompileError::UnsupportedSharedMemoryUse;
        assert_eq!(
            err.to_string(),
            "kernel has an implicit index type but declares shared memory, which is unsupported"
        );
    }
}
