//! Discretionary access evaluation with explicit-deny precedence.
//! Pure and bounded: two linear passes over the entries, no I/O, no locks.

use tracing::trace;

use super::ace::{Ace, AceKind};
use super::descriptor::SecurityDescriptor;
use super::mask::{AccessMask, AccessRequest};
use crate::identity::PrincipalContext;

/// Intermediate state of one evaluation, kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Bits named by matching deny entries.
    pub denied: AccessMask,
    /// Bits contributed by matching allow entries, after denial.
    pub allowed: AccessMask,
    /// Final answer for the request.
    pub granted: AccessMask,
    /// List positions of the entries that matched, in list order.
    pub matched_entries: Vec<usize>,
}

// Entries that govern the object itself and name this principal.
fn applicable<'a>(
    sd: &'a SecurityDescriptor,
    principal: &'a PrincipalContext,
    kind: AceKind,
) -> impl Iterator<Item = (usize, &'a Ace)> + 'a {
    sd.entries()
        .iter()
        .enumerate()
        .filter(move |(_, ace)| ace.kind == kind && !ace.is_inherit_only() && principal.is_trustee(ace))
}

pub fn evaluate_detailed(sd: &SecurityDescriptor, principal: &PrincipalContext, request: AccessRequest) -> Evaluation {
    let mut out = Evaluation::default();

    // Deny pass: recorded first so no allow, wherever it sits, can undo it.
    for (idx, ace) in applicable(sd, principal, AceKind::Deny) {
        out.denied |= ace.mask;
        out.matched_entries.push(idx);
        trace!(target: "sdaccess::eval", idx, trustee = %ace.trustee, mask = %ace.mask, "deny matched");
    }

    for (idx, ace) in applicable(sd, principal, AceKind::Allow) {
        out.allowed |= ace.mask.difference(out.denied);
        out.matched_entries.push(idx);
        trace!(target: "sdaccess::eval", idx, trustee = %ace.trustee, mask = %ace.mask, "allow matched");
    }
    out.matched_entries.sort_unstable();

    let max = out
        .allowed
        .difference(out.denied)
        .difference(AccessMask::MAXIMUM_ALLOWED);
    out.granted = match request {
        AccessRequest::MaximumAllowed => max,
        AccessRequest::Specific(wanted) => wanted & max,
    };
    trace!(
        target: "sdaccess::eval",
        user = %principal.user(),
        request = %request,
        denied = %out.denied,
        granted = %out.granted,
        "evaluated"
    );
    out
}

/// Effective access of `principal` on the object described by `sd`.
/// Never fails: no matching entry simply means no access.
pub fn evaluate(sd: &SecurityDescriptor, principal: &PrincipalContext, request: AccessRequest) -> AccessMask {
    evaluate_detailed(sd, principal, request).granted
}
