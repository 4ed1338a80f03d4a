//! Effective-access computation over self-relative security descriptors.
//!
//! The pipeline is: resolve the caller into a [`PrincipalContext`], parse the
//! descriptor bytes, then run the deny-first evaluation. [`AccessChecker`]
//! wires the three together; the pieces are usable on their own.

pub mod config;
pub mod error;
pub mod identity;
pub mod security;

pub use config::{CheckerOverrides, EffectiveConfig, GlobalAccessConfig, PartialGrantPolicy};
pub use error::{AccessError, AccessResult};
pub use identity::{IdentityRef, IdentityResolver, PrincipalContext, ResolvedIdentity, Sid, StaticDirectory};
pub use security::{
    evaluate, evaluate_detailed, AccessChecker, AccessDecision, AccessMask, AccessRequest, Ace, AceFlags, AceKind,
    DescriptorBuilder, SecurityDescriptor,
};
