//! Exam catalog database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Exam;

impl Database {
    /// Insert or update an exam.
    pub fn upsert_exam(&self, exam: &Exam) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO exams (id, name, category, price, updated_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price = excluded.price,
                updated_at = datetime('now')
            "#,
            params![exam.id, exam.name, exam.category, exam.price],
        )?;
        Ok(())
    }

    /// Get an exam by ID.
    pub fn get_exam(&self, id: &str) -> DbResult<Option<Exam>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, category, price FROM exams WHERE id = ?",
                [id],
                exam_from_row,
            )
            .optional()?)
    }

    /// List the whole catalog ordered by name.
    pub fn list_exams(&self) -> DbResult<Vec<Exam>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, category, price FROM exams ORDER BY name")?;
        let rows = stmt.query_map([], exam_from_row)?;

        let mut exams = Vec::new();
        for row in rows {
            exams.push(row?);
        }
        Ok(exams)
    }
}

fn exam_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exam> {
    Ok(Exam {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_get_exam() {
        let db = Database::open_in_memory().unwrap();
        let mut exam = Exam::new("Hemogram", "Hematology", 15.0);
        db.upsert_exam(&exam).unwrap();

        let retrieved = db.get_exam(&exam.id).unwrap().unwrap();
        assert_eq!(retrieved, exam);

        exam.price = 18.5;
        db.upsert_exam(&exam).unwrap();
        assert_eq!(db.get_exam(&exam.id).unwrap().unwrap().price, 18.5);
    }

    #[test]
    fn test_get_missing_exam() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_exam("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_exams_sorted() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_exam(&Exam::new("Widal test", "Serology", 8.0)).unwrap();
        db.upsert_exam(&Exam::new("Biochemistry panel", "Biochemistry", 25.0)).unwrap();

        let names: Vec<_> = db.list_exams().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Biochemistry panel", "Widal test"]);
    }
}
