//! Security identifiers (SIDs).
//!
//! Binary layout (little-endian except the authority):
//! `revision:u8 | count:u8 | authority:[u8;6] (big-endian) | sub_authority:u32 * count`
//!
//! Canonical text: `S-1-<authority>-<sub>-<sub>...`; authorities that do not
//! fit in 32 bits print as `0x` hex.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, AccessResult};

pub const SID_REVISION: u8 = 1;
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;
/// Fixed part: revision, count, authority.
pub const SID_HEADER_LEN: usize = 8;

const NT_AUTHORITY: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sid {
    authority: [u8; 6],
    sub_authorities: Vec<u32>,
}

impl Sid {
    pub fn new(authority: u64, sub_authorities: &[u32]) -> AccessResult<Self> {
        if authority > 0xFFFF_FFFF_FFFF {
            return Err(AccessError::identifier(format!("authority {} exceeds 48 bits", authority)));
        }
        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
            return Err(AccessError::identifier(format!(
                "{} sub-authorities (max {})",
                sub_authorities.len(),
                SID_MAX_SUB_AUTHORITIES
            )));
        }
        let be = authority.to_be_bytes();
        let mut a = [0u8; 6];
        a.copy_from_slice(&be[2..]);
        Ok(Self { authority: a, sub_authorities: sub_authorities.to_vec() })
    }

    // Well-known constructors only use valid components.
    fn well_known(authority: u8, subs: &[u32]) -> Self {
        Self { authority: [0, 0, 0, 0, 0, authority], sub_authorities: subs.to_vec() }
    }

    /// `S-1-1-0`
    pub fn everyone() -> Self { Self::well_known(1, &[0]) }
    /// `S-1-3-0`
    pub fn creator_owner() -> Self { Self::well_known(3, &[0]) }
    /// `S-1-5-11`
    pub fn authenticated_users() -> Self { Self::well_known(5, &[11]) }
    /// `S-1-5-18`
    pub fn local_system() -> Self { Self::well_known(5, &[18]) }
    /// `S-1-5-32-544`
    pub fn builtin_administrators() -> Self { Self::well_known(5, &[32, 544]) }
    /// `S-1-5-32-545`
    pub fn builtin_users() -> Self { Self::well_known(5, &[32, 545]) }

    /// Parse an identifier occupying the whole buffer.
    pub fn from_bytes(bytes: &[u8]) -> AccessResult<Self> {
        let (sid, used) = Self::read_prefix(bytes)?;
        if used != bytes.len() {
            return Err(AccessError::identifier(format!(
                "length {} does not match {} sub-authorities (expected {})",
                bytes.len(),
                sid.sub_authorities.len(),
                used
            )));
        }
        Ok(sid)
    }

    /// Parse an identifier at the front of `bytes`, returning it and the
    /// number of bytes it occupies. Trailing bytes are left to the caller.
    pub fn read_prefix(bytes: &[u8]) -> AccessResult<(Self, usize)> {
        if bytes.len() < SID_HEADER_LEN {
            return Err(AccessError::identifier(format!(
                "{} bytes is shorter than the {}-byte header",
                bytes.len(),
                SID_HEADER_LEN
            )));
        }
        let revision = bytes[0];
        if revision != SID_REVISION {
            return Err(AccessError::identifier(format!("unsupported revision {}", revision)));
        }
        let count = bytes[1] as usize;
        if count > SID_MAX_SUB_AUTHORITIES {
            return Err(AccessError::identifier(format!(
                "{} sub-authorities (max {})",
                count, SID_MAX_SUB_AUTHORITIES
            )));
        }
        let len = SID_HEADER_LEN + 4 * count;
        if bytes.len() < len {
            return Err(AccessError::identifier(format!(
                "truncated: {} sub-authorities need {} bytes, have {}",
                count,
                len,
                bytes.len()
            )));
        }
        let mut authority = [0u8; 6];
        authority.copy_from_slice(&bytes[2..8]);
        let sub_authorities = bytes[SID_HEADER_LEN..len]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok((Self { authority, sub_authorities }, len))
    }

    pub fn binary_len(&self) -> usize {
        SID_HEADER_LEN + 4 * self.sub_authorities.len()
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(SID_REVISION);
        buf.push(self.sub_authorities.len() as u8);
        buf.extend_from_slice(&self.authority);
        for s in &self.sub_authorities {
            buf.extend_from_slice(&s.to_le_bytes());
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.binary_len());
        self.write_to(&mut buf);
        buf
    }

    pub fn authority(&self) -> u64 {
        let mut be = [0u8; 8];
        be[2..].copy_from_slice(&self.authority);
        u64::from_be_bytes(be)
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Last sub-authority, conventionally the relative id within a domain.
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }

    pub fn is_nt_authority(&self) -> bool {
        self.authority() == NT_AUTHORITY
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", SID_REVISION)?;
        let auth = self.authority();
        if auth <= 0xFFFF_FFFF {
            write!(f, "-{}", auth)?;
        } else {
            write!(f, "-0x{:012X}", auth)?;
        }
        for s in &self.sub_authorities {
            write!(f, "-{}", s)?;
        }
        Ok(())
    }
}

impl FromStr for Sid {
    type Err = AccessError;

    fn from_str(s: &str) -> AccessResult<Self> {
        let bad = |why: &str| AccessError::identifier(format!("'{}': {}", s, why));
        let mut parts = s.trim().split('-');
        match parts.next() {
            Some(p) if p.eq_ignore_ascii_case("s") => {}
            _ => return Err(bad("missing 'S-' prefix")),
        }
        match parts.next() {
            Some("1") => {}
            Some(_) => return Err(bad("unsupported revision")),
            None => return Err(bad("missing revision")),
        }
        let auth_txt = parts.next().ok_or_else(|| bad("missing authority"))?;
        let authority = match auth_txt.strip_prefix("0x").or_else(|| auth_txt.strip_prefix("0X")) {
            Some(hex) if all_digits(hex, 16) => {
                u64::from_str_radix(hex, 16).map_err(|_| bad("invalid hex authority"))?
            }
            Some(_) => return Err(bad("invalid hex authority")),
            None if all_digits(auth_txt, 10) => auth_txt.parse::<u64>().map_err(|_| bad("invalid authority"))?,
            None => return Err(bad("invalid authority")),
        };
        let subs = parts
            .map(|p| match all_digits(p, 10) {
                true => p.parse::<u32>().map_err(|_| bad("invalid sub-authority")),
                false => Err(bad("invalid sub-authority")),
            })
            .collect::<AccessResult<Vec<u32>>>()?;
        Sid::new(authority, &subs)
    }
}

// Integer parsing tolerates a leading sign; the text form does not.
fn all_digits(s: &str, radix: u32) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_digit(radix))
}

impl TryFrom<String> for Sid {
    type Error = AccessError;
    fn try_from(s: String) -> AccessResult<Self> { s.parse() }
}

impl From<Sid> for String {
    fn from(sid: Sid) -> Self { sid.to_string() }
}
