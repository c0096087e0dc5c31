use crate::marc::MarcRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A holding attached to a bibliographic record. The holding id is only
/// meaningful together with its owning MMS id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingReference {
    pub mms_id: String,
    pub holding_id: String,
}

impl HoldingReference {
    pub fn new(mms_id: impl Into<String>, holding_id: impl Into<String>) -> Self {
        Self {
            mms_id: mms_id.into(),
            holding_id: holding_id.into(),
        }
    }
}

impl fmt::Display for HoldingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mmsID {} + holding {}", self.mms_id, self.holding_id)
    }
}

/// 從 Alma 取回的館藏記錄，連同其 (MMS ID, holding ID)
#[derive(Debug, Clone)]
pub struct HoldingRecord {
    pub reference: HoldingReference,
    pub record: MarcRecord,
}

#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub identifiers: usize,
    pub holding_references: usize,
    pub records: Vec<HoldingRecord>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    /// Records that carried an action note, normalized, in batch order.
    pub normalized: Vec<MarcRecord>,
    /// Records dropped because they never carried an action note.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct LoadResult {
    pub output_path: String,
    pub records_written: usize,
    /// Normalized records left out for lacking a 583 field.
    pub records_rejected: usize,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub identifiers: usize,
    pub holding_references: usize,
    pub records_retrieved: usize,
    pub records_normalized: usize,
    pub records_written: usize,
    pub output_path: String,
}
