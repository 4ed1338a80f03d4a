//! Self-relative encoding, for provisioning code that has to lay down a
//! descriptor before a resource is handed to a sandbox.
//! Layout written: header | owner | group | dacl. No SACL is emitted.

use super::ace::{Ace, AceFlags, AceKind};
use super::descriptor::{DescriptorControl, SecurityDescriptor, ACL_HEADER_LEN, ACL_REVISION, DESCRIPTOR_REVISION, HEADER_LEN};
use super::mask::AccessMask;
use crate::error::{AccessError, AccessResult};
use crate::identity::Sid;

fn write_u32(buf: &mut Vec<u8>, v: u32) { buf.extend_from_slice(&v.to_le_bytes()); }
fn write_u16(buf: &mut Vec<u8>, v: u16) { buf.extend_from_slice(&v.to_le_bytes()); }
fn write_u8(buf: &mut Vec<u8>, v: u8) { buf.push(v); }

fn patch_u32(buf: &mut [u8], at: usize, v: u32) { buf[at..at + 4].copy_from_slice(&v.to_le_bytes()); }

impl SecurityDescriptor {
    /// Encode in self-relative form. Entry order is written exactly as held.
    /// ACL size and entry count are u16 on the wire; a DACL that does not fit
    /// is rejected rather than cut short.
    pub fn to_bytes(&self) -> AccessResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_LEN + 256);
        write_u8(&mut buf, DESCRIPTOR_REVISION);
        write_u8(&mut buf, 0);
        write_u16(&mut buf, (self.control() | DescriptorControl::SELF_RELATIVE).bits());
        // owner, group, sacl, dacl offsets; patched below
        for _ in 0..4 { write_u32(&mut buf, 0); }

        if let Some(owner) = self.owner() {
            let at = buf.len() as u32;
            patch_u32(&mut buf, 4, at);
            owner.write_to(&mut buf);
        }
        if let Some(group) = self.group() {
            let at = buf.len() as u32;
            patch_u32(&mut buf, 8, at);
            group.write_to(&mut buf);
        }
        if self.has_dacl() {
            let at = buf.len() as u32;
            patch_u32(&mut buf, 16, at);
            write_acl(&mut buf, self.entries())?;
        }
        Ok(buf)
    }
}

fn wire_u16(v: usize, what: &str) -> AccessResult<u16> {
    u16::try_from(v).map_err(|_| AccessError::descriptor(format!("{} {} exceeds {}", what, v, u16::MAX)))
}

fn write_acl(buf: &mut Vec<u8>, entries: &[Ace]) -> AccessResult<()> {
    let size = ACL_HEADER_LEN + entries.iter().map(Ace::binary_len).sum::<usize>();
    let size = wire_u16(size, "dacl size")?;
    let count = wire_u16(entries.len(), "dacl entry count")?;
    write_u8(buf, ACL_REVISION);
    write_u8(buf, 0);
    write_u16(buf, size);
    write_u16(buf, count);
    write_u16(buf, 0);
    for ace in entries {
        write_u8(buf, ace.kind.type_byte());
        write_u8(buf, ace.flags.bits());
        write_u16(buf, wire_u16(ace.binary_len(), "entry size")?);
        write_u32(buf, ace.mask.bits());
        ace.trustee.write_to(buf);
    }
    Ok(())
}

/// Assemble a descriptor entry by entry; entries keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    owner: Option<Sid>,
    group: Option<Sid>,
    entries: Vec<Ace>,
    protected: bool,
}

impl DescriptorBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn owner(mut self, sid: Sid) -> Self { self.owner = Some(sid); self }
    pub fn group(mut self, sid: Sid) -> Self { self.group = Some(sid); self }

    /// Mark the DACL as protected from inheritance by descendants.
    pub fn protected(mut self) -> Self { self.protected = true; self }

    pub fn entry(mut self, ace: Ace) -> Self { self.entries.push(ace); self }

    pub fn allow(self, trustee: Sid, mask: AccessMask) -> Self {
        self.entry(Ace::allow(trustee, mask))
    }

    pub fn deny(self, trustee: Sid, mask: AccessMask) -> Self {
        self.entry(Ace::deny(trustee, mask))
    }

    pub fn allow_with(self, trustee: Sid, mask: AccessMask, flags: AceFlags) -> Self {
        self.entry(Ace::new(AceKind::Allow, flags, mask, trustee))
    }

    pub fn deny_with(self, trustee: Sid, mask: AccessMask, flags: AceFlags) -> Self {
        self.entry(Ace::new(AceKind::Deny, flags, mask, trustee))
    }

    pub fn build(self) -> SecurityDescriptor {
        let sd = SecurityDescriptor::new(self.owner, self.group, self.entries);
        if self.protected {
            let control = sd.control() | DescriptorControl::DACL_PROTECTED;
            sd.with_control(control)
        } else {
            sd
        }
    }

    pub fn to_bytes(self) -> AccessResult<Vec<u8>> {
        self.build().to_bytes()
    }
}
