//! Quantified invariants and boundary behaviors.

mod common;

use common::{create_minter, settings};
use noid_rs::minter::{Minter, QueueWhen, Term};
use noid_rs::store::{Backend, OpenMode, open_backend};
use noid_rs::{DbInfoLevel, Error, OpError, Template, n2xdig};

fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

/// Sequential minting is exactly `n2xdig(i)` prefixed by firstpart.
#[test]
fn sequential_mints_are_the_encoding_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "sq.sded", Term::Unspecified, "");
    let template = Template::parse("sq.sded").unwrap();

    let minted = minter.mint_multiple(100).unwrap();
    for (i, id) in minted.iter().enumerate() {
        let expected = format!("sq{}", n2xdig(i as u64, &template.mask).unwrap());
        assert_eq!(*id, expected, "mint {i}");
    }
}

/// Two fresh minters with identical state produce identical sequences.
#[test]
fn random_minting_is_deterministic() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = create_minter(dir_a.path(), Backend::Redb, "dt.rdde", Term::Unspecified, "");
    let b = create_minter(dir_b.path(), Backend::Redb, "dt.rdde", Term::Unspecified, "");

    assert_eq!(
        a.mint_multiple(200).unwrap(),
        b.mint_multiple(200).unwrap()
    );
}

/// `:/held` and `:/queued` always equal the key populations they count.
#[test]
fn counts_match_key_populations() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "ct.rde", Term::Long, "13030");

    minter.mint_multiple(5).unwrap();
    // Holds are not template-checked; foreign ids keep this collision-free.
    minter
        .hold_set(&ids(&["reserve/one", "reserve/two"]))
        .unwrap();
    let minted = minter.mint_multiple(3).unwrap();
    minter.hold_release(&minted[..2]).unwrap();
    minter.queue(QueueWhen::Lvf, &minted[..1]).unwrap();
    minter.queue(QueueWhen::First, &minted[1..2]).unwrap();

    let held = minter.held_count().unwrap();
    let queued = minter.queued_count().unwrap();
    minter.close().unwrap();

    let store = open_backend(
        &dir.path().join("noid"),
        Backend::Redb,
        OpenMode::ReadOnly,
    )
    .unwrap();
    let hold_keys = store
        .range(b"", None)
        .unwrap()
        .into_iter()
        .filter(|(k, _)| k.ends_with(b"\t:/h"))
        .count() as u64;
    let queue_keys = store.range(b":/q/", None).unwrap().len() as u64;
    assert_eq!(held, hold_keys);
    assert_eq!(queued, queue_keys);
}

/// Re-opening a store shows byte-identical admin state.
#[test]
fn reopen_preserves_admin_state() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "ro.rdek", Term::Long, "13030");
    minter.mint_multiple(7).unwrap();
    let before = minter.dbinfo(DbInfoLevel::Full).unwrap();
    minter.close().unwrap();

    let reopened = Minter::open(&settings(dir.path(), Backend::Redb), OpenMode::ReadWrite).unwrap();
    let after = reopened.dbinfo(DbInfoLevel::Full).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        reopened.template().unwrap().to_string(),
        "ro.rdek"
    );
}

#[test]
fn batch_bounds_are_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "bb.zd", Term::Unspecified, "");

    for count in [0usize, 10_001] {
        let err = minter.mint_multiple(count).unwrap_err();
        assert!(
            matches!(err, Error::Core(_)),
            "count {count} should be rejected, got {err:?}"
        );
    }
    assert!(minter.pregenerate(0).is_err());
    assert!(minter.pregenerate(10_001).is_err());
    assert!(minter.fetch_multiple(&ids(&[]), &[]).unwrap().is_empty());
    assert!(minter.bind_multiple(&[]).unwrap().is_empty());
}

#[test]
fn exhausted_sequential_minter_stays_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "xx.sd", Term::Unspecified, "");

    assert_eq!(minter.mint_multiple(10).unwrap().len(), 10);
    for _ in 0..2 {
        match minter.mint() {
            Err(Error::Op(OpError::Exhausted { .. })) => {}
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
    let info = minter.dbinfo(DbInfoLevel::Brief).unwrap();
    assert!(info.contains("oacounter: 10"), "got: {info}");
}

/// A short-term wrapping minter resets and keeps issuing.
#[test]
fn short_term_minter_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "wr.sd", Term::Short, "");

    let first_pass = minter.mint_multiple(10).unwrap();
    let second_pass = minter.mint_multiple(10).unwrap();
    assert_eq!(first_pass, second_pass, "wrap re-issues the same sequence");
}

/// A bind-only minter refuses to generate.
#[test]
fn bind_only_minter_refuses_mint() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "", Term::Unspecified, "");

    match minter.mint() {
        Err(Error::Op(OpError::BindOnly)) => {}
        other => panic!("expected bind-only refusal, got {other:?}"),
    }
    // Arbitrary foreign ids are bindable when no template constrains them.
    minter
        .bind(
            noid_rs::BindHow::Set,
            "doi:10.1234/abc",
            "where",
            "https://example.org",
            true,
        )
        .unwrap();
}

/// Queue `first` lane precedes timed lanes; `lvf` orders by value.
#[test]
fn reserved_queue_lanes_sort_first() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "ql.rde", Term::Unspecified, "");

    let minted = minter.mint_multiple(4).unwrap();
    minter.queue(QueueWhen::Now, &minted[..1]).unwrap();
    minter.queue(QueueWhen::First, &minted[1..2]).unwrap();
    minter.queue(QueueWhen::First, &minted[2..3]).unwrap();

    // Reserved-lane entries outrank the earlier now-dated entry.
    assert_eq!(minter.mint().unwrap(), minted[1]);
    assert_eq!(minter.mint().unwrap(), minted[2]);
    assert_eq!(minter.mint().unwrap(), minted[0]);
}

/// Deleting a queue entry marks the id unqueued and the generator avoids
/// re-issuing it in a non-wrapping minter.
#[test]
fn unqueued_ids_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "uq.rde", Term::Unspecified, "");

    let minted = minter.mint_multiple(2).unwrap();
    minter.queue(QueueWhen::Now, &minted[..1]).unwrap();
    minter.queue(QueueWhen::Delete, &minted[..1]).unwrap();
    assert_eq!(minter.queued_count().unwrap(), 0);

    let more = minter.mint_multiple(20).unwrap();
    assert!(!more.contains(&minted[0]), "unqueued id must not re-issue");
}

/// Future-dated queue entries are not ripe; the generator runs instead.
#[test]
fn unripe_queue_entries_wait() {
    let dir = tempfile::tempdir().unwrap();
    let minter = create_minter(dir.path(), Backend::Redb, "fr.rde", Term::Unspecified, "");

    let minted = minter.mint_multiple(1).unwrap();
    minter
        .queue(QueueWhen::Days(30), &minted[..1])
        .unwrap();
    assert_eq!(minter.queued_count().unwrap(), 1);

    let next = minter.mint().unwrap();
    assert_ne!(next, minted[0], "unripe entry must not surface");
    assert_eq!(minter.queued_count().unwrap(), 1);
}
