//! SQLite schema definition.

/// Complete database schema for the lab result workflow.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Exam Catalog (reference data)
-- ============================================================================

CREATE TABLE IF NOT EXISTS exams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    price REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_exams_name ON exams(name);

-- ============================================================================
-- Lab Requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS lab_requests (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL,
    doctor_id TEXT NOT NULL,
    exam_ids TEXT NOT NULL DEFAULT '[]',         -- JSON array of exam ids, request order
    payment_ref TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'sent_to_doctor')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_requests_patient ON lab_requests(patient_id);
CREATE INDEX IF NOT EXISTS idx_requests_doctor ON lab_requests(doctor_id);
CREATE INDEX IF NOT EXISTS idx_requests_status ON lab_requests(status);

-- ============================================================================
-- Lab Results (one per request; mutable while draft, frozen once sent)
-- ============================================================================

CREATE TABLE IF NOT EXISTS lab_results (
    id TEXT PRIMARY KEY,
    lab_request_id TEXT NOT NULL UNIQUE REFERENCES lab_requests(id),
    sections TEXT NOT NULL DEFAULT '[]',         -- JSON array of SectionPayload
    technician_notes TEXT,
    status TEXT NOT NULL DEFAULT 'draft',        -- draft, validated, sent
    release_digest TEXT,                         -- SHA-256 of released content
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    validated_at TEXT,
    sent_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_results_status ON lab_results(status);

-- Sent results are immutable
CREATE TRIGGER IF NOT EXISTS lab_results_sent_immutable BEFORE UPDATE ON lab_results
WHEN old.status = 'sent'
BEGIN
    SELECT RAISE(ABORT, 'Sent lab results are immutable');
END;

CREATE TRIGGER IF NOT EXISTS lab_results_sent_no_delete BEFORE DELETE ON lab_results
WHEN old.status = 'sent'
BEGIN
    SELECT RAISE(ABORT, 'Sent lab results cannot be deleted');
END;
"#;
