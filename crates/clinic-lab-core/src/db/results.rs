//! Lab result database operations.
//!
//! Implements the [`ResultStore`] contract on top of SQLite.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::ResultStatus;
use crate::store::{
    release_digest, ResultSnapshot, ResultStore, SaveResultPayload, SectionPayload, StoreError,
    StoreResult, StoredResult,
};

const SELECT_RESULT: &str = r#"
    SELECT id, lab_request_id, status, sections, technician_notes,
           created_at, validated_at, sent_at, release_digest
    FROM lab_results
"#;

impl Database {
    /// Create the result for a request or replace the sections of its draft.
    pub fn save_lab_result(
        &self,
        lab_request_id: &str,
        payload: &SaveResultPayload,
    ) -> DbResult<StoredResult> {
        if self.get_lab_request(lab_request_id)?.is_none() {
            return Err(DbError::NotFound(format!("lab request {}", lab_request_id)));
        }

        let sections_json = serde_json::to_string(&payload.sections)?;
        let now = chrono::Utc::now().to_rfc3339();
        let draft = ResultStatus::Draft.as_str();

        let existing = self
            .conn
            .query_row(
                "SELECT id, status FROM lab_results WHERE lab_request_id = ?",
                [lab_request_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, status)) => {
                if status != draft {
                    return Err(DbError::Transition {
                        result_id: id,
                        action: "save",
                        status,
                    });
                }
                self.conn.execute(
                    r#"
                    UPDATE lab_results SET
                        sections = ?2,
                        technician_notes = ?3,
                        updated_at = ?4
                    WHERE id = ?1 AND status = 'draft'
                    "#,
                    params![id, sections_json, payload.technician_notes, now],
                )?;
                Ok(StoredResult {
                    id,
                    status: draft.to_string(),
                })
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                self.conn.execute(
                    r#"
                    INSERT INTO lab_results (
                        id, lab_request_id, sections, technician_notes,
                        status, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                    "#,
                    params![id, lab_request_id, sections_json, payload.technician_notes, draft, now],
                )?;
                Ok(StoredResult {
                    id,
                    status: draft.to_string(),
                })
            }
        }
    }

    /// Move a draft result to `validated`.
    pub fn validate_lab_result(&self, result_id: &str) -> DbResult<StoredResult> {
        let status = self.lab_result_status(result_id)?;
        if status != ResultStatus::Draft.as_str() {
            return Err(DbError::Transition {
                result_id: result_id.to_string(),
                action: "validate",
                status,
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            UPDATE lab_results SET
                status = 'validated',
                validated_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND status = 'draft'
            "#,
            params![result_id, now],
        )?;

        Ok(StoredResult {
            id: result_id.to_string(),
            status: ResultStatus::Validated.as_str().to_string(),
        })
    }

    /// Release a validated result. Already-sent results are returned unchanged.
    ///
    /// Seals the content with its release digest and marks the owning request
    /// `sent_to_doctor` in the same transaction.
    pub fn send_lab_result(&self, result_id: &str) -> DbResult<StoredResult> {
        let tx = self.conn.unchecked_transaction()?;

        let snapshot = self
            .get_lab_result(result_id)?
            .ok_or_else(|| DbError::NotFound(format!("lab result {}", result_id)))?;

        let sent = ResultStatus::Sent.as_str();
        if snapshot.status == sent {
            return Ok(StoredResult {
                id: snapshot.id,
                status: sent.to_string(),
            });
        }
        if snapshot.status != ResultStatus::Validated.as_str() {
            return Err(DbError::Transition {
                result_id: snapshot.id,
                action: "send",
                status: snapshot.status,
            });
        }

        let digest = release_digest(&snapshot.sections, snapshot.technician_notes.as_deref())?;
        let now = chrono::Utc::now().to_rfc3339();

        tx.execute(
            r#"
            UPDATE lab_results SET
                status = 'sent',
                sent_at = ?2,
                release_digest = ?3,
                updated_at = ?2
            WHERE id = ?1 AND status = 'validated'
            "#,
            params![result_id, now, digest],
        )?;
        tx.execute(
            "UPDATE lab_requests SET status = 'sent_to_doctor' WHERE id = ?",
            [&snapshot.lab_request_id],
        )?;
        tx.commit()?;
        tracing::debug!(
            result_id,
            lab_request_id = %snapshot.lab_request_id,
            "Lab result sealed and marked sent"
        );

        Ok(StoredResult {
            id: snapshot.id,
            status: sent.to_string(),
        })
    }

    /// Get a result by ID.
    pub fn get_lab_result(&self, result_id: &str) -> DbResult<Option<ResultSnapshot>> {
        self.conn
            .query_row(&format!("{} WHERE id = ?", SELECT_RESULT), [result_id], result_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get the result belonging to a lab request.
    pub fn find_lab_result_for_request(&self, lab_request_id: &str) -> DbResult<Option<ResultSnapshot>> {
        self.conn
            .query_row(
                &format!("{} WHERE lab_request_id = ?", SELECT_RESULT),
                [lab_request_id],
                result_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List results in a given status, oldest update first (technician worklist).
    pub fn list_lab_results_by_status(&self, status: ResultStatus) -> DbResult<Vec<ResultSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE status = ? ORDER BY updated_at ASC",
            SELECT_RESULT
        ))?;
        let rows = stmt.query_map([status.as_str()], result_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.try_into()?);
        }
        Ok(results)
    }

    fn lab_result_status(&self, result_id: &str) -> DbResult<String> {
        self.conn
            .query_row(
                "SELECT status FROM lab_results WHERE id = ?",
                [result_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("lab result {}", result_id)))
    }
}

/// Intermediate row struct for database mapping.
struct LabResultRow {
    id: String,
    lab_request_id: String,
    status: String,
    sections: String,
    technician_notes: Option<String>,
    created_at: String,
    validated_at: Option<String>,
    sent_at: Option<String>,
    release_digest: Option<String>,
}

fn result_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LabResultRow> {
    Ok(LabResultRow {
        id: row.get(0)?,
        lab_request_id: row.get(1)?,
        status: row.get(2)?,
        sections: row.get(3)?,
        technician_notes: row.get(4)?,
        created_at: row.get(5)?,
        validated_at: row.get(6)?,
        sent_at: row.get(7)?,
        release_digest: row.get(8)?,
    })
}

impl TryFrom<LabResultRow> for ResultSnapshot {
    type Error = DbError;

    // Status is passed through untouched; the workflow decides what an
    // unknown status means.
    fn try_from(row: LabResultRow) -> Result<Self, Self::Error> {
        let sections: Vec<SectionPayload> = serde_json::from_str(&row.sections)?;
        Ok(ResultSnapshot {
            id: row.id,
            lab_request_id: row.lab_request_id,
            status: row.status,
            sections,
            technician_notes: row.technician_notes,
            created_at: row.created_at,
            validated_at: row.validated_at,
            sent_at: row.sent_at,
            release_digest: row.release_digest,
        })
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Transition {
                result_id,
                action,
                status,
            } => StoreError::Rejected {
                result_id,
                action,
                status,
            },
            DbError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Transport(other.to_string()),
        }
    }
}

impl ResultStore for Database {
    fn save_result(&self, lab_request_id: &str, payload: &SaveResultPayload) -> StoreResult<StoredResult> {
        Ok(self.save_lab_result(lab_request_id, payload)?)
    }

    fn validate_result(&self, result_id: &str) -> StoreResult<StoredResult> {
        Ok(self.validate_lab_result(result_id)?)
    }

    fn send_result(&self, result_id: &str) -> StoreResult<StoredResult> {
        Ok(self.send_lab_result(result_id)?)
    }

    fn get_result(&self, result_id: &str) -> StoreResult<Option<ResultSnapshot>> {
        Ok(self.get_lab_result(result_id)?)
    }

    fn find_result_for_request(&self, lab_request_id: &str) -> StoreResult<Option<ResultSnapshot>> {
        Ok(self.find_lab_result_for_request(lab_request_id)?)
    }
}
