//! AccessChecker over a StaticDirectory: name resolution, fail-closed
//! decisions, partial grants, config loading and shared use across threads.

mod common;

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use common::*;
use sdaccess::config::CheckerOverrides;
use sdaccess::identity::{DirectorySeed, IdentityRef, ResolvedIdentity};
use sdaccess::{
    AccessChecker, AccessError, AccessMask, AccessRequest, DescriptorBuilder, EffectiveConfig, GlobalAccessConfig,
    IdentityResolver, PartialGrantPolicy, Sid, StaticDirectory,
};

fn directory() -> StaticDirectory {
    let dir = StaticDirectory::new().with_well_known_defaults();
    dir.add_account("CORP\\alice", alice());
    dir.add_account("CORP\\bob", bob());
    dir.add_account("CORP\\Engineering", engineering());
    dir.add_account("CORP\\Contractors", contractors());
    dir.add_membership(alice(), engineering());
    // nested: engineering is inside contractors for this fixture
    dir.add_membership(engineering(), contractors());
    dir
}

fn share_descriptor() -> Vec<u8> {
    DescriptorBuilder::new()
        .owner(Sid::builtin_administrators())
        .group(engineering())
        .allow(Sid::builtin_administrators(), AccessMask::FILE_ALL_ACCESS)
        .allow(contractors(), AccessMask::FILE_GENERIC_READ)
        .allow(engineering(), AccessMask::FILE_GENERIC_WRITE)
        .deny(bob(), AccessMask::WRITE_DATA | AccessMask::APPEND_DATA)
        .allow(Sid::authenticated_users(), AccessMask::SYNCHRONIZE)
        .to_bytes().unwrap()
}

#[test]
fn nested_group_rights_reach_the_user() -> Result<()> {
    init_tracing();
    let checker = AccessChecker::new(directory());
    let mask = checker.maximum_access(&share_descriptor(), &"corp\\ALICE".into())?;
    assert_eq!(mask, AccessMask::FILE_GENERIC_READ | AccessMask::FILE_GENERIC_WRITE);
    Ok(())
}

#[test]
fn well_known_groups_apply_to_everyone_resolved() -> Result<()> {
    let checker = AccessChecker::new(directory());
    let mask = checker.maximum_access(&share_descriptor(), &IdentityRef::Sid(bob()))?;
    assert_eq!(mask, AccessMask::SYNCHRONIZE);
    Ok(())
}

#[test]
fn specific_request_fully_granted() {
    let checker = AccessChecker::new(directory());
    let want = AccessRequest::Specific(AccessMask::READ_DATA | AccessMask::WRITE_DATA);
    let d = checker.check(&share_descriptor(), &"CORP\\alice".into(), want);
    assert!(d.allow);
    assert_eq!(d.requested, want);
    assert!(d.granted.contains(AccessMask::READ_DATA | AccessMask::WRITE_DATA));
}

#[test]
fn partial_grant_follows_policy() {
    let want = AccessRequest::Specific(AccessMask::READ_DATA | AccessMask::DELETE);

    let lenient = AccessChecker::new(directory());
    let d = lenient.check(&share_descriptor(), &"CORP\\alice".into(), want);
    assert!(!d.allow);
    assert_eq!(d.granted, AccessMask::READ_DATA);
    assert_eq!(d.reason.as_deref(), Some("partially granted"));

    let global = GlobalAccessConfig::default();
    let ov = CheckerOverrides { partial_grant: Some(PartialGrantPolicy::AllOrNothing), ..Default::default() };
    let strict = AccessChecker::with_config(directory(), EffectiveConfig::from_layers(&global, Some(&ov)));
    let d = strict.check(&share_descriptor(), &"CORP\\alice".into(), want);
    assert!(!d.allow);
    assert_eq!(d.granted, AccessMask::NONE);
}

#[test]
fn unknown_account_fails_closed() {
    init_tracing();
    let checker = AccessChecker::new(directory());
    let who: IdentityRef = "CORP\\mallory".into();

    let err = checker.maximum_access(&share_descriptor(), &who).unwrap_err();
    match &err {
        AccessError::IdentityResolutionFailed { identity, .. } => assert_eq!(identity, "CORP\\mallory"),
        other => panic!("unexpected error {:?}", other),
    }

    let d = checker.check(&share_descriptor(), &who, AccessRequest::MaximumAllowed);
    assert!(!d.allow);
    assert_eq!(d.granted, AccessMask::NONE);
    assert!(d.reason.unwrap_or_default().starts_with("identity_resolution_failed"));
}

#[test]
fn malformed_descriptor_fails_closed() {
    let checker = AccessChecker::new(directory());
    let mut bytes = share_descriptor();
    bytes.truncate(bytes.len() - 10);
    let d = checker.check(&bytes, &"CORP\\alice".into(), AccessRequest::MaximumAllowed);
    assert!(!d.allow);
    assert_eq!(d.granted, AccessMask::NONE);
    assert!(d.reason.unwrap_or_default().starts_with("malformed_descriptor"));
}

#[test]
fn bad_embedded_sid_is_a_descriptor_error() {
    let checker = AccessChecker::new(directory());
    let mut bytes = DescriptorBuilder::new().owner(alice()).to_bytes().unwrap();
    // owner sid revision
    bytes[20] = 9;
    let err = checker.maximum_access(&bytes, &"CORP\\alice".into()).unwrap_err();
    assert_eq!(err.code_str(), "malformed_descriptor");
    assert!(err.message().starts_with("owner"), "{}", err);
}

#[test]
fn entry_limit_comes_from_config() {
    let bytes = (0..5)
        .fold(DescriptorBuilder::new(), |b, i| b.allow(sid(&format!("S-1-5-21-9-9-9-{}", 3000 + i)), AccessMask::READ_DATA))
        .allow(alice(), AccessMask::READ_DATA)
        .to_bytes().unwrap();
    let cfg = EffectiveConfig { max_entries: 4, ..Default::default() };
    let checker = AccessChecker::with_config(directory(), cfg);
    let err = checker.maximum_access(&bytes, &"CORP\\alice".into()).unwrap_err();
    assert_eq!(err.code_str(), "malformed_descriptor");
    assert_eq!(AccessChecker::new(directory()).maximum_access(&bytes, &"CORP\\alice".into()).ok(), Some(AccessMask::READ_DATA));
}

struct Unreachable;

impl IdentityResolver for Unreachable {
    fn resolve(&self, _identity: &IdentityRef) -> Result<ResolvedIdentity> {
        Err(anyhow!("connection refused").context("directory lookup"))
    }
}

#[test]
fn resolver_errors_keep_their_context() {
    let checker = AccessChecker::new(Unreachable);
    // garbage bytes: the resolver fails first so the parse error never surfaces
    let err = checker.maximum_access(&[0u8; 3], &IdentityRef::Sid(alice())).unwrap_err();
    assert_eq!(err.code_str(), "identity_resolution_failed");
    assert_eq!(err.message(), "directory lookup: connection refused");
}

#[test]
fn config_file_round_trip() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"{{"partial_grant": "all_or_nothing", "max_entries": 16}}"#)?;
    let g = GlobalAccessConfig::load(file.path())?;
    assert_eq!(g.partial_grant, PartialGrantPolicy::AllOrNothing);
    assert_eq!(g.max_entries, 16);
    assert!(g.log_decisions);

    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.json");
    let err = GlobalAccessConfig::load(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.json"));
    Ok(())
}

#[test]
fn directory_seed_from_file() -> Result<()> {
    let seed = DirectorySeed {
        accounts: vec![
            sdaccess::identity::AccountRecord { name: "CORP\\svc-build".into(), sid: bob() },
        ],
        memberships: vec![sdaccess::identity::MembershipRecord { member: bob(), group: engineering() }],
        implicit_groups: vec![Sid::everyone()],
    };
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(serde_json::to_string(&seed)?.as_bytes())?;

    let checker = AccessChecker::new(StaticDirectory::load(file.path())?);
    let bytes = DescriptorBuilder::new()
        .allow(engineering(), AccessMask::EXECUTE)
        .allow(Sid::everyone(), AccessMask::READ_ATTRIBUTES)
        .to_bytes().unwrap();
    assert_eq!(
        checker.maximum_access(&bytes, &"corp\\SVC-BUILD".into())?,
        AccessMask::EXECUTE | AccessMask::READ_ATTRIBUTES
    );
    Ok(())
}

#[test]
fn checker_is_shared_across_threads() {
    init_tracing();
    let checker = Arc::new(AccessChecker::new(directory()));
    let bytes = Arc::new(share_descriptor());
    std::thread::scope(|s| {
        for i in 0..8 {
            let checker = Arc::clone(&checker);
            let bytes = Arc::clone(&bytes);
            s.spawn(move || {
                let who = if i % 2 == 0 { "CORP\\alice" } else { "CORP\\bob" };
                for _ in 0..200 {
                    let d = checker.check(&bytes, &who.into(), AccessRequest::Specific(AccessMask::WRITE_DATA));
                    assert_eq!(d.allow, i % 2 == 0);
                }
            });
        }
        // writers interleave with readers; alice stays in engineering
        s.spawn(|| {
            for n in 0..50 {
                checker.resolver().add_account(&format!("CORP\\temp{}", n), sid(&format!("S-1-5-21-9-9-9-{}", 5000 + n)));
            }
        });
    });
}
