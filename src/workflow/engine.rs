//! Workflow engine
//!
//! Owns workflow rows and is the only writer of workflow state. Never
//! talks to the ledger; anchoring results reach it through
//! `record_anchor`.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::db::workflows::{self, WorkflowRow};
use crate::db::Db;
use crate::error::{AnchorError, Result};
use crate::workflow::VerificationState;

/// Note attached to the initial history entry
const INITIATED_NOTE: &str = "Workflow initiated";

pub struct WorkflowEngine {
    db: Arc<Db>,
}

impl WorkflowEngine {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Create a workflow in `SUBMITTED` with a one-entry history.
    /// No external side effects.
    pub fn initiate(&self, document_id: &str) -> Result<WorkflowRow> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(AnchorError::Validation("documentId must not be empty".into()));
        }

        let id = Uuid::new_v4().to_string();
        let row = self
            .db
            .with_conn_mut(|conn| workflows::insert_workflow(conn, &id, document_id, INITIATED_NOTE))?;

        info!(workflow_id = %row.id, document_id = %row.document_id, "Workflow initiated");
        Ok(row)
    }

    /// Move a workflow along an allowed edge, appending history and
    /// marking completion when the target is terminal.
    pub fn transition(
        &self,
        workflow_id: &str,
        new_state: VerificationState,
        note: Option<&str>,
    ) -> Result<WorkflowRow> {
        self.apply(workflow_id, new_state, note, None)
    }

    /// Terminal transition into `ANCHORED`, storing the ledger
    /// transaction reference. Only valid from `AWAITING_BLOCKCHAIN`.
    pub fn record_anchor(&self, workflow_id: &str, transaction_id: &str) -> Result<WorkflowRow> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(AnchorError::Validation(
                "transaction reference must not be empty".into(),
            ));
        }

        let note = format!("Anchored with ledger transaction {transaction_id}");
        self.apply(
            workflow_id,
            VerificationState::Anchored,
            Some(&note),
            Some(transaction_id),
        )
    }

    fn apply(
        &self,
        workflow_id: &str,
        new_state: VerificationState,
        note: Option<&str>,
        transaction_ref: Option<&str>,
    ) -> Result<WorkflowRow> {
        let current = self
            .find(workflow_id)?
            .ok_or_else(|| AnchorError::NotFound(format!("workflow {workflow_id}")))?;

        if !current.current_state.can_transition_to(new_state) {
            return Err(AnchorError::InvalidTransition(format!(
                "{} -> {} is not allowed",
                current.current_state, new_state
            )));
        }

        let applied = self.db.with_conn_mut(|conn| {
            workflows::transition_workflow(
                conn,
                workflow_id,
                current.current_state,
                new_state,
                note,
                transaction_ref,
            )
        })?;

        // Guard miss: a concurrent writer moved the workflow first
        if !applied {
            return Err(AnchorError::InvalidTransition(format!(
                "workflow {workflow_id} changed concurrently"
            )));
        }

        debug!(
            workflow_id = %workflow_id,
            from = %current.current_state,
            to = %new_state,
            "Workflow transitioned"
        );

        self.find(workflow_id)?
            .ok_or_else(|| AnchorError::Internal(format!("workflow {workflow_id} vanished")))
    }

    /// Load a workflow by id
    pub fn find(&self, workflow_id: &str) -> Result<Option<WorkflowRow>> {
        self.db.with_conn(|conn| workflows::get_workflow(conn, workflow_id))
    }

    /// Most recently submitted workflow for a document
    pub fn find_by_document(&self, document_id: &str) -> Result<Option<WorkflowRow>> {
        self.db
            .with_conn(|conn| workflows::find_latest_by_document(conn, document_id))
    }

    /// All workflows, optionally filtered by state, newest first
    pub fn find_all(&self, state: Option<VerificationState>) -> Result<Vec<WorkflowRow>> {
        self.db.with_conn(|conn| workflows::list_workflows(conn, state))
    }
}
