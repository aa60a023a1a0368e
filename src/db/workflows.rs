//! Verification workflow rows
//!
//! State changes are compare-and-swapped: the update names the state it
//! expects to replace, and the history append rides in the same SQLite
//! transaction. A raced writer sees zero affected rows instead of
//! silently overwriting.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{AnchorError, Result};
use crate::workflow::VerificationState;

/// Verification workflow row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRow {
    pub id: String,
    pub document_id: String,
    pub current_state: VerificationState,
    pub stellar_transaction_id: Option<String>,
    pub error_message: Option<String>,
    pub submitted_at: String,
    pub completed_at: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// One append-only history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub state: VerificationState,
    pub note: Option<String>,
    pub recorded_at: String,
}

impl WorkflowRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let state: String = row.get("current_state")?;
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            current_state: state.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "current_state".into(),
                    rusqlite::types::Type::Text,
                )
            })?,
            stellar_transaction_id: row.get("stellar_transaction_id")?,
            error_message: row.get("error_message")?,
            submitted_at: row.get("submitted_at")?,
            completed_at: row.get("completed_at")?,
            history: vec![], // Loaded separately
        })
    }
}

/// Create a workflow in `SUBMITTED` with its initial history entry
pub fn insert_workflow(
    conn: &mut Connection,
    id: &str,
    document_id: &str,
    note: &str,
) -> Result<WorkflowRow> {
    let now = Utc::now().to_rfc3339();
    let state = VerificationState::Submitted;

    let tx = conn
        .transaction()
        .map_err(|e| AnchorError::Database(format!("Transaction failed: {e}")))?;

    tx.execute(
        "INSERT INTO workflows (id, document_id, current_state, submitted_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, document_id, state.as_str(), now],
    )
    .map_err(|e| AnchorError::Database(format!("Workflow insert failed: {e}")))?;

    tx.execute(
        "INSERT INTO workflow_history (workflow_id, seq, state, note, recorded_at)
         VALUES (?1, 1, ?2, ?3, ?4)",
        params![id, state.as_str(), note, now],
    )
    .map_err(|e| AnchorError::Database(format!("History insert failed: {e}")))?;

    tx.commit()
        .map_err(|e| AnchorError::Database(format!("Commit failed: {e}")))?;

    Ok(WorkflowRow {
        id: id.to_string(),
        document_id: document_id.to_string(),
        current_state: state,
        stellar_transaction_id: None,
        error_message: None,
        submitted_at: now.clone(),
        completed_at: None,
        history: vec![HistoryEntry {
            state,
            note: Some(note.to_string()),
            recorded_at: now,
        }],
    })
}

/// Load a workflow with its full history
pub fn get_workflow(conn: &Connection, id: &str) -> Result<Option<WorkflowRow>> {
    let row = conn
        .query_row(
            "SELECT * FROM workflows WHERE id = ?1",
            params![id],
            WorkflowRow::from_row,
        )
        .optional()
        .map_err(|e| AnchorError::Database(format!("Workflow lookup failed: {e}")))?;

    match row {
        Some(mut workflow) => {
            workflow.history = get_history(conn, id)?;
            Ok(Some(workflow))
        }
        None => Ok(None),
    }
}

fn get_history(conn: &Connection, workflow_id: &str) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT state, note, recorded_at FROM workflow_history
             WHERE workflow_id = ?1 ORDER BY seq",
        )
        .map_err(|e| AnchorError::Database(format!("Prepare failed: {e}")))?;

    let entries = stmt
        .query_map(params![workflow_id], |row| {
            let state: String = row.get("state")?;
            Ok(HistoryEntry {
                state: state.parse().map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "state".into(),
                        rusqlite::types::Type::Text,
                    )
                })?,
                note: row.get("note")?,
                recorded_at: row.get("recorded_at")?,
            })
        })
        .map_err(|e| AnchorError::Database(format!("History query failed: {e}")))?;

    entries
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AnchorError::Database(format!("History parse failed: {e}")))
}

/// Apply a state change atomically, guarded on the expected current state.
///
/// Returns `false` when the guard missed, which means a concurrent
/// writer changed the workflow between read and write.
pub fn transition_workflow(
    conn: &mut Connection,
    id: &str,
    expected: VerificationState,
    new_state: VerificationState,
    note: Option<&str>,
    transaction_ref: Option<&str>,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let completed_at = if new_state.is_terminal() {
        Some(now.clone())
    } else {
        None
    };
    let error_message = match new_state {
        VerificationState::Failed | VerificationState::Rejected => note,
        _ => None,
    };

    let tx = conn
        .transaction()
        .map_err(|e| AnchorError::Database(format!("Transaction failed: {e}")))?;

    let updated = tx
        .execute(
            "UPDATE workflows
             SET current_state = ?3,
                 completed_at = COALESCE(?4, completed_at),
                 stellar_transaction_id = COALESCE(?5, stellar_transaction_id),
                 error_message = COALESCE(?6, error_message)
             WHERE id = ?1 AND current_state = ?2",
            params![
                id,
                expected.as_str(),
                new_state.as_str(),
                completed_at,
                transaction_ref,
                error_message,
            ],
        )
        .map_err(|e| AnchorError::Database(format!("Workflow update failed: {e}")))?;

    if updated == 0 {
        // Guard missed; nothing was written
        return Ok(false);
    }

    tx.execute(
        "INSERT INTO workflow_history (workflow_id, seq, state, note, recorded_at)
         SELECT ?1, COALESCE(MAX(seq), 0) + 1, ?2, ?3, ?4
         FROM workflow_history WHERE workflow_id = ?1",
        params![id, new_state.as_str(), note, now],
    )
    .map_err(|e| AnchorError::Database(format!("History insert failed: {e}")))?;

    tx.commit()
        .map_err(|e| AnchorError::Database(format!("Commit failed: {e}")))?;

    Ok(true)
}

/// Most recently submitted workflow for a document
pub fn find_latest_by_document(conn: &Connection, document_id: &str) -> Result<Option<WorkflowRow>> {
    let row = conn
        .query_row(
            "SELECT * FROM workflows WHERE document_id = ?1
             ORDER BY submitted_at DESC, rowid DESC LIMIT 1",
            params![document_id],
            WorkflowRow::from_row,
        )
        .optional()
        .map_err(|e| AnchorError::Database(format!("Workflow lookup failed: {e}")))?;

    match row {
        Some(mut workflow) => {
            workflow.history = get_history(conn, &workflow.id)?;
            Ok(Some(workflow))
        }
        None => Ok(None),
    }
}

/// All workflows, optionally filtered by state, newest first
pub fn list_workflows(
    conn: &Connection,
    state: Option<VerificationState>,
) -> Result<Vec<WorkflowRow>> {
    let mut workflows = match state {
        Some(state) => {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM workflows WHERE current_state = ?1
                     ORDER BY submitted_at DESC, rowid DESC",
                )
                .map_err(|e| AnchorError::Database(format!("Prepare failed: {e}")))?;
            let rows = stmt
                .query_map(params![state.as_str()], WorkflowRow::from_row)
                .map_err(|e| AnchorError::Database(format!("Query failed: {e}")))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AnchorError::Database(format!("Row parse failed: {e}")))?
        }
        None => {
            let mut stmt = conn
                .prepare("SELECT * FROM workflows ORDER BY submitted_at DESC, rowid DESC")
                .map_err(|e| AnchorError::Database(format!("Prepare failed: {e}")))?;
            let rows = stmt
                .query_map([], WorkflowRow::from_row)
                .map_err(|e| AnchorError::Database(format!("Query failed: {e}")))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AnchorError::Database(format!("Row parse failed: {e}")))?
        }
    };

    for workflow in &mut workflows {
        workflow.history = get_history(conn, &workflow.id)?;
    }
    Ok(workflows)
}
