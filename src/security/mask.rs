//! Access masks: resource-specific rights in the low word, standard rights
//! above them, and the request-only `MAXIMUM_ALLOWED` wildcard.

use std::fmt::{self, Display, Formatter};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMask(u32);

impl AccessMask {
    pub const NONE: AccessMask = AccessMask(0);

    // File-specific rights
    pub const READ_DATA: AccessMask = AccessMask(0x0000_0001);
    pub const WRITE_DATA: AccessMask = AccessMask(0x0000_0002);
    pub const APPEND_DATA: AccessMask = AccessMask(0x0000_0004);
    pub const READ_EA: AccessMask = AccessMask(0x0000_0008);
    pub const WRITE_EA: AccessMask = AccessMask(0x0000_0010);
    pub const EXECUTE: AccessMask = AccessMask(0x0000_0020);
    pub const DELETE_CHILD: AccessMask = AccessMask(0x0000_0040);
    pub const READ_ATTRIBUTES: AccessMask = AccessMask(0x0000_0080);
    pub const WRITE_ATTRIBUTES: AccessMask = AccessMask(0x0000_0100);

    // Standard rights
    pub const DELETE: AccessMask = AccessMask(0x0001_0000);
    pub const READ_CONTROL: AccessMask = AccessMask(0x0002_0000);
    pub const WRITE_DAC: AccessMask = AccessMask(0x0004_0000);
    pub const WRITE_OWNER: AccessMask = AccessMask(0x0008_0000);
    pub const SYNCHRONIZE: AccessMask = AccessMask(0x0010_0000);
    pub const STANDARD_RIGHTS_REQUIRED: AccessMask = AccessMask(0x000F_0000);

    pub const ACCESS_SYSTEM_SECURITY: AccessMask = AccessMask(0x0100_0000);
    /// Request modifier only; never valid inside an entry or a result.
    pub const MAXIMUM_ALLOWED: AccessMask = AccessMask(0x0200_0000);

    pub const GENERIC_ALL: AccessMask = AccessMask(0x1000_0000);
    pub const GENERIC_EXECUTE: AccessMask = AccessMask(0x2000_0000);
    pub const GENERIC_WRITE: AccessMask = AccessMask(0x4000_0000);
    pub const GENERIC_READ: AccessMask = AccessMask(0x8000_0000);

    pub const FILE_GENERIC_READ: AccessMask = AccessMask(
        Self::READ_CONTROL.0 | Self::READ_DATA.0 | Self::READ_ATTRIBUTES.0 | Self::READ_EA.0 | Self::SYNCHRONIZE.0,
    );
    pub const FILE_GENERIC_WRITE: AccessMask = AccessMask(
        Self::READ_CONTROL.0
            | Self::WRITE_DATA.0
            | Self::WRITE_ATTRIBUTES.0
            | Self::WRITE_EA.0
            | Self::APPEND_DATA.0
            | Self::SYNCHRONIZE.0,
    );
    pub const FILE_GENERIC_EXECUTE: AccessMask =
        AccessMask(Self::READ_CONTROL.0 | Self::READ_ATTRIBUTES.0 | Self::EXECUTE.0 | Self::SYNCHRONIZE.0);
    pub const FILE_ALL_ACCESS: AccessMask = AccessMask(Self::STANDARD_RIGHTS_REQUIRED.0 | Self::SYNCHRONIZE.0 | 0x1FF);

    pub const fn from_bits(bits: u32) -> Self { AccessMask(bits) }
    pub const fn bits(self) -> u32 { self.0 }
    pub const fn is_empty(self) -> bool { self.0 == 0 }

    /// All bits of `other` are present in `self`.
    pub const fn contains(self, other: AccessMask) -> bool { self.0 & other.0 == other.0 }
    pub const fn intersects(self, other: AccessMask) -> bool { self.0 & other.0 != 0 }
    pub const fn union(self, other: AccessMask) -> Self { AccessMask(self.0 | other.0) }
    pub const fn intersection(self, other: AccessMask) -> Self { AccessMask(self.0 & other.0) }
    pub const fn difference(self, other: AccessMask) -> Self { AccessMask(self.0 & !other.0) }

    /// Names of the single-bit rights set in this mask, low bits first.
    /// Bits without a name are reported as hex.
    pub fn names(self) -> Vec<String> {
        let mut out = Vec::new();
        let mut rest = self.0;
        for (bit, name) in NAMED_BITS {
            if rest & bit != 0 {
                out.push((*name).to_string());
                rest &= !bit;
            }
        }
        if rest != 0 {
            out.push(format!("0x{:08X}", rest));
        }
        out
    }
}

const NAMED_BITS: &[(u32, &str)] = &[
    (0x0000_0001, "READ_DATA"),
    (0x0000_0002, "WRITE_DATA"),
    (0x0000_0004, "APPEND_DATA"),
    (0x0000_0008, "READ_EA"),
    (0x0000_0010, "WRITE_EA"),
    (0x0000_0020, "EXECUTE"),
    (0x0000_0040, "DELETE_CHILD"),
    (0x0000_0080, "READ_ATTRIBUTES"),
    (0x0000_0100, "WRITE_ATTRIBUTES"),
    (0x0001_0000, "DELETE"),
    (0x0002_0000, "READ_CONTROL"),
    (0x0004_0000, "WRITE_DAC"),
    (0x0008_0000, "WRITE_OWNER"),
    (0x0010_0000, "SYNCHRONIZE"),
    (0x0100_0000, "ACCESS_SYSTEM_SECURITY"),
    (0x0200_0000, "MAXIMUM_ALLOWED"),
    (0x1000_0000, "GENERIC_ALL"),
    (0x2000_0000, "GENERIC_EXECUTE"),
    (0x4000_0000, "GENERIC_WRITE"),
    (0x8000_0000, "GENERIC_READ"),
];

impl Display for AccessMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        write!(f, "{{{}}}", self.names().join("|"))
    }
}

impl BitOr for AccessMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { self.union(rhs) }
}

impl BitOrAssign for AccessMask {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl BitAnd for AccessMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self { self.intersection(rhs) }
}

impl BitAndAssign for AccessMask {
    fn bitand_assign(&mut self, rhs: Self) { self.0 &= rhs.0; }
}

impl Not for AccessMask {
    type Output = Self;
    fn not(self) -> Self { AccessMask(!self.0) }
}

impl From<u32> for AccessMask {
    fn from(bits: u32) -> Self { AccessMask(bits) }
}

/// What the caller asks for: a concrete set of rights, or everything the
/// policy permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequest {
    MaximumAllowed,
    /// A mask carrying `MAXIMUM_ALLOWED` is treated as `MaximumAllowed` by the
    /// checker; see [`AccessRequest::normalized`].
    Specific(AccessMask),
}

impl AccessRequest {
    /// A mask carrying the `MAXIMUM_ALLOWED` bit becomes the wildcard; any
    /// other bits alongside it are subsumed by it.
    pub fn from_mask(mask: AccessMask) -> Self {
        if mask.intersects(AccessMask::MAXIMUM_ALLOWED) {
            AccessRequest::MaximumAllowed
        } else {
            AccessRequest::Specific(mask)
        }
    }

    /// Re-apply `from_mask` to a hand-built `Specific` request.
    pub fn normalized(self) -> Self {
        match self {
            AccessRequest::Specific(mask) => AccessRequest::from_mask(mask),
            other => other,
        }
    }

    pub fn is_maximum_allowed(&self) -> bool {
        matches!(self, AccessRequest::MaximumAllowed)
    }
}

impl From<AccessMask> for AccessRequest {
    fn from(mask: AccessMask) -> Self { AccessRequest::from_mask(mask) }
}

impl Display for AccessRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AccessRequest::MaximumAllowed => f.write_str("MAXIMUM_ALLOWED"),
            AccessRequest::Specific(m) => Display::fmt(m, f),
        }
    }
}
