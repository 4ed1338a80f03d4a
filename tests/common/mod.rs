#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::Rng;

use sdaccess::{AccessMask, Ace, AceFlags, AceKind, DescriptorBuilder, Sid};

/// Route library events to the test writer. `RUST_LOG=sdaccess=trace` shows
/// per-entry evaluation.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

pub fn sid(s: &str) -> Sid {
    s.parse().unwrap_or_else(|e| panic!("bad test sid {}: {}", s, e))
}

pub fn alice() -> Sid { sid("S-1-5-21-100-200-300-1104") }
pub fn bob() -> Sid { sid("S-1-5-21-100-200-300-1105") }
pub fn engineering() -> Sid { sid("S-1-5-21-100-200-300-2001") }
pub fn contractors() -> Sid { sid("S-1-5-21-100-200-300-2002") }

pub const READ: AccessMask = AccessMask::READ_DATA;
pub const WRITE: AccessMask = AccessMask::WRITE_DATA;
pub const DELETE: AccessMask = AccessMask::DELETE;

/// Rights an ACE may legally carry, MAXIMUM_ALLOWED excluded.
const GRANTABLE: u32 = 0x001F_01FF;

pub fn random_ace(rng: &mut StdRng, trustees: &[Sid]) -> Ace {
    let kind = if rng.gen_bool(0.3) { AceKind::Deny } else { AceKind::Allow };
    let mut flags = AceFlags::empty();
    if rng.gen_bool(0.15) {
        flags |= AceFlags::INHERIT_ONLY | AceFlags::CONTAINER_INHERIT;
    }
    if rng.gen_bool(0.2) {
        flags |= AceFlags::INHERITED;
    }
    let mask = AccessMask::from_bits(rng.gen::<u32>() & GRANTABLE);
    let trustee = trustees[rng.gen_range(0..trustees.len())].clone();
    Ace::new(kind, flags, mask, trustee)
}

/// Encoded descriptor with up to `max_entries` random entries.
pub fn random_descriptor(rng: &mut StdRng, trustees: &[Sid], max_entries: usize) -> Vec<u8> {
    let n = rng.gen_range(0..=max_entries);
    (0..n)
        .fold(DescriptorBuilder::new().owner(alice()), |b, _| b.entry(random_ace(rng, trustees)))
        .to_bytes().unwrap()
}
