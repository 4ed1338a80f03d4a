//! In-memory identity directory: name translation plus nested group
//! expansion. Group closure is computed here so the evaluator only ever sees
//! a flat, finished set.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{IdentityRef, IdentityResolver, ResolvedIdentity};
use super::sid::Sid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub sid: Sid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipRecord {
    pub member: Sid,
    pub group: Sid,
}

/// Serializable snapshot used to seed a directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectorySeed {
    #[serde(default)]
    pub accounts: Vec<AccountRecord>,
    #[serde(default)]
    pub memberships: Vec<MembershipRecord>,
    #[serde(default)]
    pub implicit_groups: Vec<Sid>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    // lowercase name -> sid
    by_name: HashMap<String, Sid>,
    by_sid: HashMap<Sid, String>,
    // direct memberships only
    member_of: HashMap<Sid, Vec<Sid>>,
}

#[derive(Debug, Default)]
pub struct StaticDirectory {
    state: RwLock<DirectoryState>,
    implicit_groups: Vec<Sid>,
    allow_unregistered_sids: bool,
}

impl StaticDirectory {
    pub fn new() -> Self { Self::default() }

    /// Every resolved principal also belongs to `group`.
    pub fn with_implicit_group(mut self, group: Sid) -> Self {
        if !self.implicit_groups.contains(&group) {
            self.implicit_groups.push(group);
        }
        self
    }

    /// Everyone and Authenticated Users, as a native context built from a
    /// bare SID would carry.
    pub fn with_well_known_defaults(self) -> Self {
        self.with_implicit_group(Sid::everyone())
            .with_implicit_group(Sid::authenticated_users())
    }

    /// Accept SID references the directory has never seen, resolving them
    /// with implicit groups only.
    pub fn allow_unregistered_sids(mut self, allow: bool) -> Self {
        self.allow_unregistered_sids = allow;
        self
    }

    pub fn from_seed(seed: &DirectorySeed) -> Self {
        let mut dir = Self::new();
        for g in &seed.implicit_groups {
            dir = dir.with_implicit_group(g.clone());
        }
        for a in &seed.accounts {
            dir.add_account(&a.name, a.sid.clone());
        }
        for m in &seed.memberships {
            dir.add_membership(m.member.clone(), m.group.clone());
        }
        dir
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let seed: DirectorySeed = serde_json::from_str(s).context("parse directory seed")?;
        Ok(Self::from_seed(&seed))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read directory seed: {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Register or rename an account. Names match case-insensitively; a name
    /// already bound to another SID moves to `sid` and that SID is unregistered.
    pub fn add_account(&self, name: &str, sid: Sid) {
        let key = name.to_lowercase();
        let mut st = self.state.write();
        if let Some(prev) = st.by_name.get(&key).cloned() {
            if prev != sid {
                st.by_sid.remove(&prev);
            }
        }
        if let Some(old) = st.by_sid.insert(sid.clone(), name.to_string()) {
            let old_key = old.to_lowercase();
            if old_key != key {
                st.by_name.remove(&old_key);
            }
        }
        st.by_name.insert(key, sid);
    }

    pub fn add_membership(&self, member: Sid, group: Sid) {
        let mut st = self.state.write();
        let groups = st.member_of.entry(member).or_default();
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    pub fn remove_membership(&self, member: &Sid, group: &Sid) -> bool {
        let mut st = self.state.write();
        match st.member_of.get_mut(member) {
            Some(groups) => {
                let before = groups.len();
                groups.retain(|g| g != group);
                before != groups.len()
            }
            None => false,
        }
    }

    pub fn lookup_name(&self, name: &str) -> Option<Sid> {
        self.state.read().by_name.get(&name.to_lowercase()).cloned()
    }

    pub fn account_name(&self, sid: &Sid) -> Option<String> {
        self.state.read().by_sid.get(sid).cloned()
    }

    /// Transitive groups of `sid`, breadth-first, excluding `sid` itself.
    /// Cycles in the membership graph terminate.
    pub fn group_closure(&self, sid: &Sid) -> Vec<Sid> {
        let st = self.state.read();
        let mut seen: HashSet<&Sid> = HashSet::new();
        seen.insert(sid);
        let mut out = Vec::new();
        let mut queue: VecDeque<&Sid> = VecDeque::from([sid]);
        while let Some(cur) = queue.pop_front() {
            for g in st.member_of.get(cur).into_iter().flatten() {
                if seen.insert(g) {
                    out.push(g.clone());
                    queue.push_back(g);
                }
            }
        }
        out
    }

    fn translate(&self, identity: &IdentityRef) -> Result<Sid> {
        match identity {
            IdentityRef::Name(name) => self
                .lookup_name(name)
                .ok_or_else(|| anyhow!("unknown account '{}'", name)),
            IdentityRef::Sid(sid) => {
                if self.allow_unregistered_sids || self.state.read().by_sid.contains_key(sid) {
                    Ok(sid.clone())
                } else {
                    Err(anyhow!("unknown sid {}", sid))
                }
            }
        }
    }
}

impl IdentityResolver for StaticDirectory {
    fn resolve(&self, identity: &IdentityRef) -> Result<ResolvedIdentity> {
        let user = self.translate(identity)?;
        let mut groups = self.group_closure(&user);
        for g in &self.implicit_groups {
            if *g != user && !groups.contains(g) {
                groups.push(g.clone());
            }
        }
        debug!(target: "sdaccess::identity", identity = %identity, user = %user, groups = groups.len(), "resolved");
        Ok(ResolvedIdentity { user, groups })
    }
}
