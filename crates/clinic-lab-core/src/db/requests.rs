//! Lab request database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Exam, LabRequest, LabRequestStatus};

impl Database {
    /// Insert a new lab request. Every requested exam must exist in the catalog.
    pub fn insert_lab_request(&self, request: &LabRequest) -> DbResult<()> {
        if request.exam_ids.is_empty() {
            return Err(DbError::Constraint("Lab request has no exams".into()));
        }
        for exam_id in &request.exam_ids {
            if self.get_exam(exam_id)?.is_none() {
                return Err(DbError::NotFound(format!("exam {}", exam_id)));
            }
        }

        let exam_ids_json = serde_json::to_string(&request.exam_ids)?;
        self.conn.execute(
            r#"
            INSERT INTO lab_requests (
                id, patient_id, doctor_id, exam_ids, payment_ref, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                request.id,
                request.patient_id,
                request.doctor_id,
                exam_ids_json,
                request.payment_ref,
                request.status.as_str(),
                request.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a lab request by ID.
    pub fn get_lab_request(&self, id: &str) -> DbResult<Option<LabRequest>> {
        self.conn
            .query_row(
                r#"
                SELECT id, patient_id, doctor_id, exam_ids, payment_ref, status, created_at
                FROM lab_requests
                WHERE id = ?
                "#,
                [id],
                request_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List requests by coarse status, newest first.
    pub fn list_lab_requests_by_status(&self, status: LabRequestStatus) -> DbResult<Vec<LabRequest>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_id, doctor_id, exam_ids, payment_ref, status, created_at
            FROM lab_requests
            WHERE status = ?
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map([status.as_str()], request_row)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?.try_into()?);
        }
        Ok(requests)
    }

    /// Resolve the exams of a request, in request order.
    pub fn exams_for_request(&self, request: &LabRequest) -> DbResult<Vec<Exam>> {
        request
            .exam_ids
            .iter()
            .map(|id| {
                self.get_exam(id)?
                    .ok_or_else(|| DbError::NotFound(format!("exam {}", id)))
            })
            .collect()
    }
}

/// Intermediate row struct for database mapping.
struct LabRequestRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    exam_ids: String,
    payment_ref: Option<String>,
    status: String,
    created_at: String,
}

fn request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LabRequestRow> {
    Ok(LabRequestRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        exam_ids: row.get(3)?,
        payment_ref: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl TryFrom<LabRequestRow> for LabRequest {
    type Error = DbError;

    fn try_from(row: LabRequestRow) -> Result<Self, Self::Error> {
        let exam_ids: Vec<String> = serde_json::from_str(&row.exam_ids)?;
        let status = LabRequestStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown request status: {}", row.status)))?;

        Ok(LabRequest {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            exam_ids,
            payment_ref: row.payment_ref,
            status,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> (Database, Vec<Exam>) {
        let db = Database::open_in_memory().unwrap();
        let exams = vec![
            Exam::new("Hemogram", "Hematology", 15.0),
            Exam::new("Widal test", "Serology", 8.0),
        ];
        for exam in &exams {
            db.upsert_exam(exam).unwrap();
        }
        (db, exams)
    }

    #[test]
    fn test_insert_and_get_request() {
        let (db, exams) = setup_db();
        let mut request = LabRequest::new(
            "patient-1".into(),
            "doctor-1".into(),
            exams.iter().map(|e| e.id.clone()).collect(),
        );
        request.payment_ref = Some("PAY-0042".into());
        db.insert_lab_request(&request).unwrap();

        let retrieved = db.get_lab_request(&request.id).unwrap().unwrap();
        assert_eq!(retrieved, request);
        assert_eq!(retrieved.status, LabRequestStatus::Pending);
    }

    #[test]
    fn test_request_with_unknown_exam_rejected() {
        let (db, _) = setup_db();
        let request = LabRequest::new("patient-1".into(), "doctor-1".into(), vec!["ghost".into()]);
        assert!(matches!(db.insert_lab_request(&request), Err(DbError::NotFound(_))));

        let empty = LabRequest::new("patient-1".into(), "doctor-1".into(), vec![]);
        assert!(matches!(db.insert_lab_request(&empty), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_exams_for_request_keeps_order() {
        let (db, exams) = setup_db();
        let request = LabRequest::new(
            "patient-1".into(),
            "doctor-1".into(),
            vec![exams[1].id.clone(), exams[0].id.clone()],
        );
        db.insert_lab_request(&request).unwrap();

        let resolved = db.exams_for_request(&request).unwrap();
        assert_eq!(resolved[0].name, "Widal test");
        assert_eq!(resolved[1].name, "Hemogram");
    }

    #[test]
    fn test_list_by_status() {
        let (db, exams) = setup_db();
        for _ in 0..2 {
            let request = LabRequest::new("patient-1".into(), "doctor-1".into(), vec![exams[0].id.clone()]);
            db.insert_lab_request(&request).unwrap();
        }

        assert_eq!(db.list_lab_requests_by_status(LabRequestStatus::Pending).unwrap().len(), 2);
        assert!(db
            .list_lab_requests_by_status(LabRequestStatus::SentToDoctor)
            .unwrap()
            .is_empty());
    }
}
