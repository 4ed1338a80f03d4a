//! Self-relative security descriptors.
//! ------------------------------------
//! Header (20 bytes):
//! `revision:u8 | sbz1:u8 | control:u16 | off_owner:u32 | off_group:u32 | off_sacl:u32 | off_dacl:u32`
//! ACL header (8 bytes): `revision:u8 | sbz1:u8 | size:u16 | count:u16 | sbz2:u16`
//! ACE: `type:u8 | flags:u8 | size:u16 | mask:u32 | sid`
//!
//! All integers are little-endian. Offsets are relative to the start of the
//! buffer; zero means "absent". Anything that does not add up is rejected;
//! a descriptor is never partially accepted.

use tracing::debug;

use super::ace::{Ace, AceFlags, AceKind};
use super::mask::AccessMask;
use crate::error::{AccessError, AccessResult};
use crate::identity::Sid;

pub const DESCRIPTOR_REVISION: u8 = 1;
pub const HEADER_LEN: usize = 20;
pub const ACL_HEADER_LEN: usize = 8;
pub const ACL_REVISION: u8 = 2;
pub const ACL_REVISION_DS: u8 = 4;
/// ACE header + mask + SID header.
pub const MIN_ACE_LEN: usize = 16;
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DescriptorControl: u16 {
        const OWNER_DEFAULTED = 0x0001;
        const GROUP_DEFAULTED = 0x0002;
        const DACL_PRESENT = 0x0004;
        const DACL_DEFAULTED = 0x0008;
        const SACL_PRESENT = 0x0010;
        const SACL_DEFAULTED = 0x0020;
        const DACL_AUTO_INHERIT_REQ = 0x0100;
        const SACL_AUTO_INHERIT_REQ = 0x0200;
        const DACL_AUTO_INHERITED = 0x0400;
        const SACL_AUTO_INHERITED = 0x0800;
        const DACL_PROTECTED = 0x1000;
        const SACL_PROTECTED = 0x2000;
        const RM_CONTROL_VALID = 0x4000;
        const SELF_RELATIVE = 0x8000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    control: DescriptorControl,
    owner: Option<Sid>,
    group: Option<Sid>,
    entries: Vec<Ace>,
}

impl SecurityDescriptor {
    /// A descriptor with a present DACL holding `entries` in the given order.
    pub fn new(owner: Option<Sid>, group: Option<Sid>, entries: Vec<Ace>) -> Self {
        Self {
            control: DescriptorControl::SELF_RELATIVE | DescriptorControl::DACL_PRESENT,
            owner,
            group,
            entries,
        }
    }

    pub(crate) fn with_control(mut self, control: DescriptorControl) -> Self {
        self.control = control | DescriptorControl::SELF_RELATIVE;
        self
    }

    pub fn parse(bytes: &[u8]) -> AccessResult<Self> {
        Self::parse_with_limit(bytes, DEFAULT_MAX_ENTRIES)
    }

    /// Parse, rejecting DACLs that declare more than `max_entries` entries.
    pub fn parse_with_limit(bytes: &[u8], max_entries: usize) -> AccessResult<Self> {
        let out = parse_inner(bytes, max_entries);
        match &out {
            Ok(sd) => debug!(
                target: "sdaccess::parse",
                len = bytes.len(),
                entries = sd.entries.len(),
                dacl_present = sd.has_dacl(),
                "descriptor parsed"
            ),
            Err(e) => debug!(target: "sdaccess::parse", len = bytes.len(), error = %e, "descriptor rejected"),
        }
        out
    }

    pub fn control(&self) -> DescriptorControl {
        self.control
    }

    pub fn owner(&self) -> Option<&Sid> {
        self.owner.as_ref()
    }

    pub fn group(&self) -> Option<&Sid> {
        self.group.as_ref()
    }

    /// Entries in list order.
    pub fn entries(&self) -> &[Ace] {
        &self.entries
    }

    pub fn has_dacl(&self) -> bool {
        self.control.contains(DescriptorControl::DACL_PRESENT)
    }
}

fn le_u16(bytes: &[u8], at: usize) -> AccessResult<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| AccessError::descriptor(format!("truncated reading u16 at {}", at)))
}

fn le_u32(bytes: &[u8], at: usize) -> AccessResult<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| AccessError::descriptor(format!("truncated reading u32 at {}", at)))
}

fn parse_inner(bytes: &[u8], max_entries: usize) -> AccessResult<SecurityDescriptor> {
    if bytes.len() < HEADER_LEN {
        return Err(AccessError::descriptor(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }
    if bytes[0] != DESCRIPTOR_REVISION {
        return Err(AccessError::descriptor(format!("unsupported revision {}", bytes[0])));
    }
    let control = DescriptorControl::from_bits_retain(le_u16(bytes, 2)?);
    if !control.contains(DescriptorControl::SELF_RELATIVE) {
        return Err(AccessError::descriptor("not in self-relative form"));
    }

    let owner = read_sid_at(bytes, le_u32(bytes, 4)?, "owner")?;
    let group = read_sid_at(bytes, le_u32(bytes, 8)?, "group")?;
    check_offset(bytes, le_u32(bytes, 12)?, "sacl")?;
    let dacl_at = check_offset(bytes, le_u32(bytes, 16)?, "dacl")?;

    let entries = match dacl_at {
        Some(at) if control.contains(DescriptorControl::DACL_PRESENT) => parse_acl(bytes, at, max_entries)?,
        _ => Vec::new(),
    };
    Ok(SecurityDescriptor { control, owner, group, entries })
}

fn check_offset(bytes: &[u8], offset: u32, part: &str) -> AccessResult<Option<usize>> {
    if offset == 0 {
        return Ok(None);
    }
    let at = offset as usize;
    if at < HEADER_LEN || at >= bytes.len() {
        return Err(AccessError::descriptor(format!(
            "{} offset {} outside buffer of {} bytes",
            part,
            offset,
            bytes.len()
        )));
    }
    Ok(Some(at))
}

fn read_sid_at(bytes: &[u8], offset: u32, part: &str) -> AccessResult<Option<Sid>> {
    match check_offset(bytes, offset, part)? {
        None => Ok(None),
        Some(at) => Sid::read_prefix(&bytes[at..])
            .map(|(sid, _)| Some(sid))
            .map_err(|e| e.within_descriptor(part)),
    }
}

fn parse_acl(bytes: &[u8], at: usize, max_entries: usize) -> AccessResult<Vec<Ace>> {
    if bytes.len() - at < ACL_HEADER_LEN {
        return Err(AccessError::descriptor("dacl header truncated"));
    }
    let revision = bytes[at];
    if revision != ACL_REVISION && revision != ACL_REVISION_DS {
        return Err(AccessError::descriptor(format!("unsupported dacl revision {}", revision)));
    }
    let size = le_u16(bytes, at + 2)? as usize;
    let count = le_u16(bytes, at + 4)? as usize;
    if size < ACL_HEADER_LEN {
        return Err(AccessError::descriptor(format!("dacl size {} smaller than its header", size)));
    }
    if size > bytes.len() - at {
        return Err(AccessError::descriptor(format!(
            "dacl declares {} bytes, {} available",
            size,
            bytes.len() - at
        )));
    }
    if count > max_entries {
        return Err(AccessError::descriptor(format!(
            "dacl declares {} entries (limit {})",
            count, max_entries
        )));
    }

    let acl = &bytes[at..at + size];
    let mut entries = Vec::with_capacity(count);
    let mut pos = ACL_HEADER_LEN;
    for i in 0..count {
        let part = format!("ace[{}]", i);
        if acl.len() - pos < MIN_ACE_LEN {
            return Err(AccessError::descriptor(format!(
                "{}: truncated, dacl declares {} entries but only {} fit in {} bytes",
                part, count, i, size
            )));
        }
        let ace_type = acl[pos];
        let flags = AceFlags::from_bits_retain(acl[pos + 1]);
        let ace_size = le_u16(acl, pos + 2)? as usize;
        if ace_size < MIN_ACE_LEN || ace_size % 4 != 0 {
            return Err(AccessError::descriptor(format!("{}: invalid size {}", part, ace_size)));
        }
        if ace_size > acl.len() - pos {
            return Err(AccessError::descriptor(format!(
                "{}: {} bytes overrun the dacl ({} left)",
                part,
                ace_size,
                acl.len() - pos
            )));
        }
        let kind = AceKind::from_type(ace_type)
            .ok_or_else(|| AccessError::descriptor(format!("{}: unsupported entry type 0x{:02X}", part, ace_type)))?;
        let mask = AccessMask::from_bits(le_u32(acl, pos + 4)?);
        if mask.intersects(AccessMask::MAXIMUM_ALLOWED) {
            return Err(AccessError::descriptor(format!("{}: MAXIMUM_ALLOWED is not a grantable right", part)));
        }
        let (trustee, _) = Sid::read_prefix(&acl[pos + 8..pos + ace_size]).map_err(|e| e.within_descriptor(&part))?;
        entries.push(Ace { kind, flags, mask, trustee });
        pos += ace_size;
    }
    Ok(entries)
}
