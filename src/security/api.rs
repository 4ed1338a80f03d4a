//! Request façade: raw descriptor bytes plus an identity reference in, an
//! access mask or a decision out.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::descriptor::SecurityDescriptor;
use super::evaluator::evaluate;
use super::mask::{AccessMask, AccessRequest};
use crate::config::{EffectiveConfig, PartialGrantPolicy};
use crate::error::{AccessError, AccessResult};
use crate::identity::{IdentityRef, IdentityResolver, PrincipalContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allow: bool,
    pub granted: AccessMask,
    pub requested: AccessRequest,
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn allow(requested: AccessRequest, granted: AccessMask, reason: impl Into<String>) -> Self {
        Self { allow: true, granted, requested, reason: Some(reason.into()) }
    }

    pub fn deny(requested: AccessRequest, granted: AccessMask, reason: impl Into<String>) -> Self {
        Self { allow: false, granted, requested, reason: Some(reason.into()) }
    }

    /// Decision for a check that could not be completed.
    pub fn failed(requested: AccessRequest, err: &AccessError) -> Self {
        Self::deny(requested, AccessMask::NONE, format!("{}: {}", err.code_str(), err.message()))
    }
}

pub struct AccessChecker<R: IdentityResolver> {
    resolver: R,
    config: EffectiveConfig,
}

impl<R: IdentityResolver> AccessChecker<R> {
    pub fn new(resolver: R) -> Self {
        Self::with_config(resolver, EffectiveConfig::default())
    }

    pub fn with_config(resolver: R, config: EffectiveConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &EffectiveConfig { &self.config }

    pub fn resolver(&self) -> &R { &self.resolver }

    /// Resolve `identity` into a principal with its full group closure.
    pub fn principal(&self, identity: &IdentityRef) -> AccessResult<PrincipalContext> {
        self.resolver
            .resolve(identity)
            .map(|r| r.into_principal())
            .map_err(|e| AccessError::resolution(identity.to_string(), format!("{:#}", e)))
    }

    /// Effective access of `identity` on the object `descriptor` protects.
    /// The principal is resolved before the descriptor is looked at.
    pub fn compute_access(
        &self,
        descriptor: &[u8],
        identity: &IdentityRef,
        request: AccessRequest,
    ) -> AccessResult<AccessMask> {
        let request = request.normalized();
        let principal = self.principal(identity)?;
        let sd = SecurityDescriptor::parse_with_limit(descriptor, self.config.max_entries)?;
        Ok(evaluate(&sd, &principal, request))
    }

    pub fn maximum_access(&self, descriptor: &[u8], identity: &IdentityRef) -> AccessResult<AccessMask> {
        self.compute_access(descriptor, identity, AccessRequest::MaximumAllowed)
    }

    /// Fail-closed variant of `compute_access`: any failure is a denial with
    /// nothing granted and the error code as reason.
    pub fn check(&self, descriptor: &[u8], identity: &IdentityRef, request: AccessRequest) -> AccessDecision {
        let request = request.normalized();
        let decision = match self.compute_access(descriptor, identity, request) {
            Ok(granted) => self.decide(request, granted),
            Err(err) => {
                warn!(target: "sdaccess::check", identity = %identity, code = err.code_str(), error = %err, "access check failed closed");
                return AccessDecision::failed(request, &err);
            }
        };
        if self.config.log_decisions {
            info!(
                target: "sdaccess::check",
                identity = %identity,
                request = %request,
                granted = %decision.granted,
                allow = decision.allow,
                "access decision"
            );
        }
        decision
    }

    fn decide(&self, request: AccessRequest, granted: AccessMask) -> AccessDecision {
        match request {
            AccessRequest::MaximumAllowed if granted.is_empty() => {
                AccessDecision::deny(request, granted, "no access granted")
            }
            AccessRequest::MaximumAllowed => AccessDecision::allow(request, granted, "granted"),
            AccessRequest::Specific(wanted) if wanted.is_empty() => {
                AccessDecision::deny(request, AccessMask::NONE, "empty request")
            }
            AccessRequest::Specific(wanted) if granted.contains(wanted) => {
                AccessDecision::allow(request, granted, "granted")
            }
            AccessRequest::Specific(_) if granted.is_empty() => {
                AccessDecision::deny(request, granted, "no access granted")
            }
            AccessRequest::Specific(_) => {
                let reported = match self.config.partial_grant {
                    PartialGrantPolicy::Intersect => granted,
                    PartialGrantPolicy::AllOrNothing => AccessMask::NONE,
                };
                AccessDecision::deny(request, reported, "partially granted")
            }
        }
    }
}
