//! Access-control entries of a discretionary list.

use serde::{Deserialize, Serialize};

use super::mask::AccessMask;
use crate::identity::Sid;

/// Only the classic allow/deny-by-SID types are evaluated. Every other
/// on-disk type is rejected during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AceKind {
    Allow,
    Deny,
}

impl AceKind {
    pub const ALLOW_TYPE: u8 = 0x00;
    pub const DENY_TYPE: u8 = 0x01;

    pub fn from_type(ace_type: u8) -> Option<Self> {
        match ace_type {
            Self::ALLOW_TYPE => Some(AceKind::Allow),
            Self::DENY_TYPE => Some(AceKind::Deny),
            _ => None,
        }
    }

    pub fn type_byte(self) -> u8 {
        match self {
            AceKind::Allow => Self::ALLOW_TYPE,
            AceKind::Deny => Self::DENY_TYPE,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AceFlags: u8 {
        const OBJECT_INHERIT = 0x01;
        const CONTAINER_INHERIT = 0x02;
        const NO_PROPAGATE_INHERIT = 0x04;
        const INHERIT_ONLY = 0x08;
        const INHERITED = 0x10;
        // Audit bits; meaningless in a DACL but legal on the wire.
        const SUCCESSFUL_ACCESS = 0x40;
        const FAILED_ACCESS = 0x80;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ace {
    pub kind: AceKind,
    pub flags: AceFlags,
    pub mask: AccessMask,
    pub trustee: Sid,
}

impl Ace {
    pub fn new(kind: AceKind, flags: AceFlags, mask: AccessMask, trustee: Sid) -> Self {
        Self { kind, flags, mask, trustee }
    }

    pub fn allow(trustee: Sid, mask: AccessMask) -> Self {
        Self::new(AceKind::Allow, AceFlags::empty(), mask, trustee)
    }

    pub fn deny(trustee: Sid, mask: AccessMask) -> Self {
        Self::new(AceKind::Deny, AceFlags::empty(), mask, trustee)
    }

    pub fn with_flags(mut self, flags: AceFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Applies only to descendants, never to the object carrying it.
    pub fn is_inherit_only(&self) -> bool {
        self.flags.contains(AceFlags::INHERIT_ONLY)
    }

    pub fn is_inherited(&self) -> bool {
        self.flags.contains(AceFlags::INHERITED)
    }

    /// On-disk size: 4-byte header, 4-byte mask, then the SID.
    pub fn binary_len(&self) -> usize {
        8 + self.trustee.binary_len()
    }
}
