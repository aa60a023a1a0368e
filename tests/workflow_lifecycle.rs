//! Workflow state machine lifecycle tests

use std::sync::Arc;

use anchorage::db::Db;
use anchorage::error::AnchorError;
use anchorage::workflow::{VerificationState, WorkflowEngine};

fn engine() -> WorkflowEngine {
    WorkflowEngine::new(Arc::new(Db::open_in_memory().unwrap()))
}

#[test]
fn happy_path_reaches_anchored_with_five_history_entries() {
    let engine = engine();

    let wf = engine.initiate("doc-1").unwrap();
    assert_eq!(wf.current_state, VerificationState::Submitted);
    assert_eq!(wf.history.len(), 1);
    assert_eq!(wf.history[0].note.as_deref(), Some("Workflow initiated"));

    engine
        .transition(&wf.id, VerificationState::Hashing, None)
        .unwrap();
    engine
        .transition(&wf.id, VerificationState::Analyzing, Some("risk score 0.2"))
        .unwrap();
    engine
        .transition(&wf.id, VerificationState::AwaitingBlockchain, None)
        .unwrap();

    let finished = engine.record_anchor(&wf.id, "tx-abc").unwrap();

    assert_eq!(finished.current_state, VerificationState::Anchored);
    assert_eq!(finished.stellar_transaction_id.as_deref(), Some("tx-abc"));
    assert!(finished.completed_at.is_some());
    assert_eq!(finished.history.len(), 5);
    assert_eq!(
        finished.history.last().unwrap().state,
        finished.current_state
    );
}

#[test]
fn history_timestamps_are_monotonic() {
    let engine = engine();
    let wf = engine.initiate("doc-1").unwrap();

    engine
        .transition(&wf.id, VerificationState::Hashing, None)
        .unwrap();
    engine
        .transition(&wf.id, VerificationState::Analyzing, None)
        .unwrap();

    let row = engine.find(&wf.id).unwrap().unwrap();
    let timestamps: Vec<&String> = row.history.iter().map(|h| &h.recorded_at).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[test]
fn direct_jump_to_anchored_is_rejected() {
    let engine = engine();
    let wf = engine.initiate("doc-1").unwrap();

    let err = engine
        .transition(&wf.id, VerificationState::Anchored, None)
        .unwrap_err();
    assert!(matches!(err, AnchorError::InvalidTransition(_)));

    let after = engine.find(&wf.id).unwrap().unwrap();
    assert_eq!(after.current_state, VerificationState::Submitted);
    assert_eq!(after.history.len(), 1);
    assert!(after.completed_at.is_none());
}

#[test]
fn terminal_workflows_are_immutable() {
    let engine = engine();
    let wf = engine.initiate("doc-1").unwrap();

    let failed = engine
        .transition(&wf.id, VerificationState::Failed, Some("hash service down"))
        .unwrap();
    let completed_at = failed.completed_at.clone().unwrap();
    assert_eq!(failed.error_message.as_deref(), Some("hash service down"));

    // Every further mutation fails and completed_at stays put
    for target in [
        VerificationState::Hashing,
        VerificationState::Anchored,
        VerificationState::Failed,
    ] {
        let err = engine.transition(&wf.id, target, None).unwrap_err();
        assert!(matches!(err, AnchorError::InvalidTransition(_)));
    }
    let err = engine.record_anchor(&wf.id, "tx-late").unwrap_err();
    assert!(matches!(err, AnchorError::InvalidTransition(_)));

    let after = engine.find(&wf.id).unwrap().unwrap();
    assert_eq!(after.completed_at.as_deref(), Some(completed_at.as_str()));
    assert!(after.stellar_transaction_id.is_none());
}

#[test]
fn record_anchor_requires_awaiting_blockchain() {
    let engine = engine();
    let wf = engine.initiate("doc-1").unwrap();

    assert!(engine.record_anchor(&wf.id, "tx-abc").is_err());

    engine
        .transition(&wf.id, VerificationState::Hashing, None)
        .unwrap();
    engine
        .transition(&wf.id, VerificationState::Analyzing, None)
        .unwrap();
    assert!(engine.record_anchor(&wf.id, "tx-abc").is_err());

    engine
        .transition(&wf.id, VerificationState::AwaitingBlockchain, None)
        .unwrap();
    let anchored = engine.record_anchor(&wf.id, "tx-abc").unwrap();
    assert_eq!(anchored.current_state, VerificationState::Anchored);
}

#[test]
fn rejection_paths_follow_the_edge_table() {
    let engine = engine();

    // SUBMITTED can be rejected outright
    let wf = engine.initiate("doc-1").unwrap();
    let rejected = engine
        .transition(&wf.id, VerificationState::Rejected, Some("duplicate upload"))
        .unwrap();
    assert!(rejected.completed_at.is_some());

    // HASHING cannot be rejected, only failed
    let wf = engine.initiate("doc-2").unwrap();
    engine
        .transition(&wf.id, VerificationState::Hashing, None)
        .unwrap();
    assert!(engine
        .transition(&wf.id, VerificationState::Rejected, None)
        .is_err());
    assert!(engine
        .transition(&wf.id, VerificationState::Failed, None)
        .is_ok());
}

#[test]
fn unknown_workflow_is_not_found() {
    let engine = engine();
    assert!(matches!(
        engine
            .transition("no-such-id", VerificationState::Hashing, None)
            .unwrap_err(),
        AnchorError::NotFound(_)
    ));
    assert!(matches!(
        engine.record_anchor("no-such-id", "tx").unwrap_err(),
        AnchorError::NotFound(_)
    ));
    assert!(engine.find_by_document("no-such-doc").unwrap().is_none());
}

#[test]
fn find_by_document_returns_most_recent() {
    let engine = engine();

    engine.initiate("doc-1").unwrap();
    let second = engine.initiate("doc-1").unwrap();
    engine.initiate("doc-2").unwrap();

    let latest = engine.find_by_document("doc-1").unwrap().unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(latest.document_id, "doc-1");
}

#[test]
fn find_all_filters_by_state() {
    let engine = engine();

    let a = engine.initiate("doc-1").unwrap();
    let b = engine.initiate("doc-2").unwrap();
    engine
        .transition(&a.id, VerificationState::Hashing, None)
        .unwrap();

    let all = engine.find_all(None).unwrap();
    assert_eq!(all.len(), 2);

    let hashing = engine
        .find_all(Some(VerificationState::Hashing))
        .unwrap();
    assert_eq!(hashing.len(), 1);
    assert_eq!(hashing[0].id, a.id);

    let submitted = engine
        .find_all(Some(VerificationState::Submitted))
        .unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].id, b.id);
}
