//! Failure taxonomy for access computation.
//! Every variant means "the system could not decide". A denial is never an
//! error; it is a zero or partial `AccessMask`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// An identifier's encoded bytes or text are structurally invalid.
    #[error("malformed_identifier: {reason}")]
    MalformedIdentifier { reason: String },

    /// The descriptor buffer is truncated, has inconsistent offsets/counts,
    /// or contains an entry kind this engine does not evaluate.
    #[error("malformed_descriptor: {reason}")]
    MalformedDescriptor { reason: String },

    /// The identity collaborator could not resolve the principal.
    #[error("identity_resolution_failed: {identity}: {reason}")]
    IdentityResolutionFailed { identity: String, reason: String },
}

impl AccessError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AccessError::MalformedIdentifier { .. } => "malformed_identifier",
            AccessError::MalformedDescriptor { .. } => "malformed_descriptor",
            AccessError::IdentityResolutionFailed { .. } => "identity_resolution_failed",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AccessError::MalformedIdentifier { reason }
            | AccessError::MalformedDescriptor { reason }
            | AccessError::IdentityResolutionFailed { reason, .. } => reason.as_str(),
        }
    }

    pub fn identifier<S: Into<String>>(reason: S) -> Self {
        AccessError::MalformedIdentifier { reason: reason.into() }
    }

    pub fn descriptor<S: Into<String>>(reason: S) -> Self {
        AccessError::MalformedDescriptor { reason: reason.into() }
    }

    pub fn resolution<I: Into<String>, S: Into<String>>(identity: I, reason: S) -> Self {
        AccessError::IdentityResolutionFailed { identity: identity.into(), reason: reason.into() }
    }

    /// Re-tag an identifier failure found inside a descriptor, keeping the
    /// part of the buffer it came from in the message.
    pub(crate) fn within_descriptor(self, part: &str) -> Self {
        match self {
            AccessError::MalformedIdentifier { reason } => {
                AccessError::descriptor(format!("{}: {}", part, reason))
            }
            other => other,
        }
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
