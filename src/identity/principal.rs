use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::sid::Sid;
use crate::security::Ace;

/// A resolved identity: the principal's own SID plus the transitive closure
/// of groups it belongs to. Built once per evaluation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalContext {
    user: Sid,
    #[serde(default)]
    groups: HashSet<Sid>,
}

impl PrincipalContext {
    pub fn new(user: Sid, groups: impl IntoIterator<Item = Sid>) -> Self {
        Self { user, groups: groups.into_iter().collect() }
    }

    pub fn user(&self) -> &Sid {
        &self.user
    }

    pub fn groups(&self) -> &HashSet<Sid> {
        &self.groups
    }

    /// Copy of this context with one more group.
    pub fn with_group(&self, group: Sid) -> Self {
        let mut next = self.clone();
        next.groups.insert(group);
        next
    }

    pub fn matches(&self, sid: &Sid) -> bool {
        &self.user == sid || self.groups.contains(sid)
    }

    /// True iff the entry's trustee is this principal or one of its groups.
    pub fn is_trustee(&self, ace: &Ace) -> bool {
        self.matches(&ace.trustee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{AccessMask, AceFlags, AceKind};

    fn sid(s: &str) -> Sid { s.parse().unwrap() }

    #[test]
    fn user_and_groups_both_match() {
        let p = PrincipalContext::new(sid("S-1-5-21-1-2-3-1001"), [Sid::builtin_users()]);
        let direct = Ace::new(AceKind::Allow, AceFlags::empty(), AccessMask::READ_DATA, sid("S-1-5-21-1-2-3-1001"));
        let group = Ace::new(AceKind::Allow, AceFlags::empty(), AccessMask::READ_DATA, Sid::builtin_users());
        let other = Ace::new(AceKind::Allow, AceFlags::empty(), AccessMask::READ_DATA, Sid::builtin_administrators());
        assert!(p.is_trustee(&direct));
        assert!(p.is_trustee(&group));
        assert!(!p.is_trustee(&other));
    }

    #[test]
    fn user_listed_as_own_group_is_harmless() {
        let me = sid("S-1-5-21-9-9-9-500");
        let p = PrincipalContext::new(me.clone(), [me.clone()]);
        assert!(p.matches(&me));
        assert_eq!(p.groups().len(), 1);
    }

    #[test]
    fn groupless_context_matches_only_itself() {
        let p = PrincipalContext::new(Sid::local_system(), []);
        assert!(p.matches(&Sid::local_system()));
        assert!(!p.matches(&Sid::everyone()));
        assert!(p.groups().is_empty());
    }

    #[test]
    fn with_group_leaves_original_untouched() {
        let p = PrincipalContext::new(Sid::local_system(), []);
        let q = p.with_group(Sid::everyone());
        assert!(!p.matches(&Sid::everyone()));
        assert!(q.matches(&Sid::everyone()));
    }
}
