use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::principal::PrincipalContext;
use super::sid::Sid;

/// What a caller names when asking about access: an account name to be
/// translated, or an already-known SID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityRef {
    Name(String),
    Sid(Sid),
}

impl Display for IdentityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRef::Name(n) => f.write_str(n),
            IdentityRef::Sid(s) => Display::fmt(s, f),
        }
    }
}

impl From<Sid> for IdentityRef {
    fn from(sid: Sid) -> Self { IdentityRef::Sid(sid) }
}

impl From<&str> for IdentityRef {
    fn from(name: &str) -> Self { IdentityRef::Name(name.to_string()) }
}

impl From<String> for IdentityRef {
    fn from(name: String) -> Self { IdentityRef::Name(name) }
}

/// Output of a resolver: the principal and its full group closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub user: Sid,
    #[serde(default)]
    pub groups: Vec<Sid>,
}

impl ResolvedIdentity {
    pub fn into_principal(self) -> PrincipalContext {
        PrincipalContext::new(self.user, self.groups)
    }
}

/// Identity/directory collaborator. Implementations own any retries,
/// timeouts, or cancellation; an `Err` stops the access check before any
/// descriptor is evaluated.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, identity: &IdentityRef) -> Result<ResolvedIdentity>;
}

impl<T: IdentityResolver + ?Sized> IdentityResolver for Arc<T> {
    fn resolve(&self, identity: &IdentityRef) -> Result<ResolvedIdentity> {
        (**self).resolve(identity)
    }
}

impl<T: IdentityResolver + ?Sized> IdentityResolver for Box<T> {
    fn resolve(&self, identity: &IdentityRef) -> Result<ResolvedIdentity> {
        (**self).resolve(identity)
    }
}

impl<T: IdentityResolver + ?Sized> IdentityResolver for &T {
    fn resolve(&self, identity: &IdentityRef) -> Result<ResolvedIdentity> {
        (**self).resolve(identity)
    }
}
