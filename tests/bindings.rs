//! Binding engine: how semantics, the long-term guard, idmap indirection,
//! batches and fetches.

mod common;

use common::create_minter;
use noid_rs::minter::{BindEntry, Term};
use noid_rs::store::Backend;
use noid_rs::{BindHow, Error, OpError};

#[test]
fn how_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "bh.rde", Term::Unspecified, "");
    let id = minter.mint().unwrap();

    // new creates, and only once.
    minter.bind(BindHow::New, &id, "where", "a", true).unwrap();
    assert!(minter.bind(BindHow::New, &id, "where", "b", true).is_err());

    // replace needs an existing binding; append/prepend concatenate.
    minter
        .bind(BindHow::Replace, &id, "where", "base", true)
        .unwrap();
    minter
        .bind(BindHow::Append, &id, "where", "+tail", true)
        .unwrap();
    minter
        .bind(BindHow::Prepend, &id, "where", "head+", true)
        .unwrap();
    let fetched = minter.fetch(&id, &["where".to_string()]).unwrap();
    assert_eq!(fetched.bindings, vec![("where".into(), "head+base+tail".into())]);

    // delete is idempotent; replace then fails.
    minter.bind(BindHow::Delete, &id, "where", "", true).unwrap();
    minter.bind(BindHow::Delete, &id, "where", "", true).unwrap();
    assert!(minter.bind(BindHow::Replace, &id, "where", "x", true).is_err());

    // set is unconditional.
    minter.bind(BindHow::Set, &id, "where", "final", true).unwrap();
    assert!(minter.bind(BindHow::Replace, &id, "other", "x", true).is_err());
}

#[test]
fn genonly_validates_bound_ids() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "gv.rde", Term::Unspecified, "");

    let err = minter
        .bind(BindHow::Set, "gvzzz9", "where", "x", true)
        .unwrap_err();
    assert!(err.to_string().starts_with("iderr:"), "got: {err}");
}

#[test]
fn longterm_guard_requires_issue_or_hold() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "lt.rde", Term::Long, "13030");

    // A conforming but unissued, unheld id is refused.
    let err = minter
        .bind(BindHow::Set, "13030/lt00", "where", "x", true)
        .unwrap_err();
    match err {
        Error::Op(OpError::LongtermUnissued { .. }) => {}
        other => panic!("expected long-term refusal, got {other:?}"),
    }

    // Reserving with a hold unlocks binding.
    minter.hold_set(&["13030/lt00".to_string()]).unwrap();
    minter
        .bind(BindHow::Set, "13030/lt00", "where", "x", true)
        .unwrap();

    // Issued ids bind without further ceremony.
    let minted = minter.mint().unwrap();
    minter.bind(BindHow::Set, &minted, "where", "y", true).unwrap();
}

#[test]
fn mint_how_mints_then_binds() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "mb.rde", Term::Unspecified, "");

    let id = minter
        .bind(BindHow::Mint, "new", "where", "https://example.org/x", true)
        .unwrap();
    assert!(id.starts_with("mb"));
    let fetched = minter.fetch(&id, &[]).unwrap();
    assert_eq!(
        fetched.bindings,
        vec![("where".into(), "https://example.org/x".into())]
    );

    // The sentinel is mandatory.
    assert!(minter
        .bind(BindHow::Mint, "mb00", "where", "x", true)
        .is_err());
}

#[test]
fn idmap_supplies_absent_elements() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "im.rde", Term::Unspecified, "");
    let id = minter.mint().unwrap();

    minter
        .bind(
            BindHow::Set,
            ":idmap/locator",
            "^im(.*)$",
            "https://example.org/im/$1",
            true,
        )
        .unwrap();

    // No direct binding: the pattern substitutes over the identifier text.
    let fetched = minter.fetch(&id, &["locator".to_string()]).unwrap();
    let suffix = id.strip_prefix("im").unwrap();
    assert_eq!(
        fetched.bindings,
        vec![(
            "locator".to_string(),
            format!("https://example.org/im/{suffix}")
        )]
    );

    // A direct binding wins over the idmap.
    minter
        .bind(BindHow::Set, &id, "locator", "direct", true)
        .unwrap();
    let fetched = minter.fetch(&id, &["locator".to_string()]).unwrap();
    assert_eq!(fetched.bindings, vec![("locator".into(), "direct".into())]);

    // Resolution is a single substitution step, never recursive.
    let other = minter.mint().unwrap();
    let mapped = minter.fetch(&other, &["locator".to_string()]).unwrap();
    assert!(mapped.bindings[0].1.starts_with("https://example.org/im/"));
    assert!(!mapped.bindings[0].1.contains("https://example.org/im/https"));
}

#[test]
fn unknown_reserved_identifiers_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "rr.rde", Term::Unspecified, "");
    assert!(minter
        .bind(BindHow::Set, ":secret/x", "elem", "v", true)
        .is_err());
    assert!(minter
        .bind(BindHow::Set, "some/id", ":/c", "v", true)
        .is_err());
}

#[test]
fn bind_multiple_keeps_input_order_and_nulls_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "bm.rde", Term::Unspecified, "");
    let a = minter.mint().unwrap();
    let b = minter.mint().unwrap();

    let entries = vec![
        BindEntry {
            how: BindHow::Set,
            id: a.clone(),
            elem: "where".into(),
            value: "1".into(),
        },
        BindEntry {
            how: BindHow::Set,
            id: String::new(), // rejected in pre-validation
            elem: "where".into(),
            value: "2".into(),
        },
        BindEntry {
            how: BindHow::Mint,
            id: "new".into(),
            elem: "where".into(),
            value: "3".into(),
        },
        BindEntry {
            how: BindHow::Replace,
            id: b.clone(),
            elem: "missing".into(), // fails at apply time
            value: "4".into(),
        },
    ];
    let results = minter.bind_multiple(&entries).unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_deref(), Some(a.as_str()));
    assert_eq!(results[1], None);
    let minted = results[2].clone().expect("mint entry yields a fresh id");
    assert!(minted.starts_with("bm"));
    assert_eq!(results[3], None);

    let fetched = minter.fetch(&minted, &["where".to_string()]).unwrap();
    assert_eq!(fetched.bindings[0].1, "3");
}

#[test]
fn fetch_scans_exclude_admin_subkeys() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "fs.rde", Term::Long, "13030");
    let id = minter.mint().unwrap();
    minter.bind(BindHow::Set, &id, "who", "someone", true).unwrap();
    minter.bind(BindHow::Set, &id, "where", "there", true).unwrap();

    let fetched = minter.fetch(&id, &[]).unwrap();
    assert!(fetched.held, "long-term mints hold automatically");
    assert!(fetched.circulation.is_some());
    let elems: Vec<&str> = fetched.bindings.iter().map(|(e, _)| e.as_str()).collect();
    assert_eq!(elems, vec!["where", "who"], "sorted, no :/ subkeys");

    let missing = minter.fetch("13030/fs99", &[]).unwrap_err();
    match missing {
        Error::Op(OpError::NotFound { .. }) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn notes_live_under_the_reserved_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "nt.rde", Term::Unspecified, "");
    minter.note("greeting", "hello").unwrap();
    let dump = minter.dbinfo(noid_rs::DbInfoLevel::Dump).unwrap();
    assert!(dump.contains(":/:/greeting: hello"), "got: {dump}");
}

/// Re-issue through the queue purges stale bindings.
#[test]
fn recycled_ids_shed_old_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "rc.rde", Term::Unspecified, "");
    let id = minter.mint().unwrap();
    minter.bind(BindHow::Set, &id, "where", "old", true).unwrap();

    minter
        .queue(noid_rs::QueueWhen::Now, &[id.clone()])
        .unwrap();
    let recycled = minter.mint().unwrap();
    assert_eq!(recycled, id);
    assert!(minter.fetch(&id, &["where".to_string()]).is_err());
}
