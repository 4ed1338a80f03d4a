//! Principals and how they are named: SIDs, the resolved principal context
//! an evaluation runs against, and the resolver seam that produces it.

mod sid;
mod principal;
mod provider;
mod directory;

pub use sid::{Sid, SID_MAX_SUB_AUTHORITIES, SID_REVISION};
pub use principal::PrincipalContext;
pub use provider::{IdentityRef, IdentityResolver, ResolvedIdentity};
pub use directory::{AccountRecord, DirectorySeed, MembershipRecord, StaticDirectory};
