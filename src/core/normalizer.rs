//! Control field normalization for exported holding records.
//!
//! Every holding that carries an action note (583) gets four control fields
//! rewritten before export:
//!
//! | tag | value                                   |
//! |-----|-----------------------------------------|
//! | 001 | holding id                              |
//! | 003 | MARC organization code of the source    |
//! | 004 | MMS id of the owning bibliographic record |
//! | 005 | transaction timestamp `YYYYMMDDHHMMSS.ff` |
//!
//! An existing field is overwritten in place. A missing field is inserted
//! after however many control fields have a numerically smaller tag, so a
//! record whose control fields were ordered stays ordered. Tags are applied
//! in ascending order and each insertion sees the ones before it.

use crate::domain::model::HoldingReference;
use crate::marc::{ControlField, MarcRecord};
use chrono::{DateTime, Local, TimeZone, Timelike};

pub const DEFAULT_SOURCE_CODE: &str = "AzTeS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationContext {
    pub mms_id: String,
    pub holding_id: String,
    pub source_code: String,
    pub timestamp: String,
}

impl NormalizationContext {
    pub fn new(reference: &HoldingReference, source_code: &str, timestamp: String) -> Self {
        Self {
            mms_id: reference.mms_id.clone(),
            holding_id: reference.holding_id.clone(),
            source_code: source_code.to_string(),
            timestamp,
        }
    }

    fn assignments(&self) -> [(&'static str, &str); 4] {
        [
            ("001", self.holding_id.as_str()),
            ("003", self.source_code.as_str()),
            ("004", self.mms_id.as_str()),
            ("005", self.timestamp.as_str()),
        ]
    }
}

/// Format an instant as a 005 value: date-time digits, a period, then
/// hundredths of a second.
pub fn transaction_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    // leap seconds report nanosecond >= 1e9
    let hundredths = (now.nanosecond() / 10_000_000).min(99);
    format!("{}.{:02}", now.format("%Y%m%d%H%M%S"), hundredths)
}

pub fn current_timestamp() -> String {
    transaction_timestamp(&Local::now())
}

/// Return a copy of `record` with 001/003/004/005 set from `context`.
///
/// Data fields and the leader are untouched.
pub fn normalize(record: &MarcRecord, context: &NormalizationContext) -> MarcRecord {
    let control_fields = context
        .assignments()
        .into_iter()
        .fold(record.control_fields.clone(), |fields, (tag, value)| {
            upsert_control_field(fields, tag, value)
        });

    MarcRecord {
        leader: record.leader.clone(),
        control_fields,
        data_fields: record.data_fields.clone(),
    }
}

fn upsert_control_field(mut fields: Vec<ControlField>, tag: &str, value: &str) -> Vec<ControlField> {
    if let Some(existing) = fields.iter_mut().find(|f| f.tag == tag) {
        existing.value = value.to_string();
        return fields;
    }

    let position = insertion_position(&fields, tag);
    fields.insert(position, ControlField::new(tag, value));
    fields
}

/// Number of control fields whose numeric tag is strictly below `tag`.
/// Non-numeric tags never count.
fn insertion_position(fields: &[ControlField], tag: &str) -> usize {
    let Ok(target) = tag.parse::<u16>() else {
        return fields.len();
    };
    fields
        .iter()
        .filter(|f| f.numeric_tag().is_some_and(|n| n < target))
        .count()
}
