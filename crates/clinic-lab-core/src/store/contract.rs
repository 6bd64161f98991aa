//! Wire shapes exchanged with the persistence collaborator.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Body of a `saveResult` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultPayload {
    pub sections: Vec<SectionPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_notes: Option<String>,
}

/// One section on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionPayload {
    pub exam_id: String,
    pub title: String,
    pub items: Vec<ItemPayload>,
}

/// One parameter row on the wire.
///
/// `status` is derived by the classifier; readers re-derive it rather than trust it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub reference: String,
    pub status: Option<String>,
}

/// Response to `saveResult`, `validateResult` and `sendResult`.
///
/// `status` stays a raw string: callers must treat anything outside
/// `draft | validated | sent` as an inconsistency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResult {
    pub id: String,
    pub status: String,
}

/// Response to `getResult`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultSnapshot {
    pub id: String,
    pub lab_request_id: String,
    pub status: String,
    pub sections: Vec<SectionPayload>,
    pub technician_notes: Option<String>,
    pub created_at: String,
    pub validated_at: Option<String>,
    pub sent_at: Option<String>,
    pub release_digest: Option<String>,
}

/// Content covered by the release digest.
#[derive(Serialize)]
struct ReleasedContent<'a> {
    sections: &'a [SectionPayload],
    technician_notes: Option<&'a str>,
}

/// SHA-256 (hex) over the canonical JSON of a released document's content.
pub fn release_digest(
    sections: &[SectionPayload],
    technician_notes: Option<&str>,
) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(&ReleasedContent {
        sections,
        technician_notes,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
