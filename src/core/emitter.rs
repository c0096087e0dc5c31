use crate::marc::{binary, MarcRecord};
use chrono::NaiveDate;

/// Why a normalized record was left out of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No 583 field; 001/004 identify the record.
    MissingActionNote { holding_id: String, mms_id: String },
    /// No 583 field, and 001 and/or 004 could not be read back.
    UnreadableIdentifiers {
        holding_id: Option<String>,
        mms_id: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct FilteredOutput {
    pub records: Vec<MarcRecord>,
    pub rejected: Vec<Rejection>,
}

/// Keep records with at least one 583 field, in input order, logging a
/// diagnostic for each one dropped.
pub fn filter_annotated(records: Vec<MarcRecord>) -> FilteredOutput {
    let mut output = FilteredOutput::default();

    for record in records {
        if record.has_action_note() {
            output.records.push(record);
            continue;
        }

        let holding_id = record.control_value("001").map(str::to_string);
        let mms_id = record.control_value("004").map(str::to_string);
        let rejection = match (holding_id, mms_id) {
            (Some(holding_id), Some(mms_id)) => {
                tracing::warn!("Blank 583 field: skipping {} / {}", holding_id, mms_id);
                Rejection::MissingActionNote { holding_id, mms_id }
            }
            (holding_id, mms_id) => {
                tracing::warn!(
                    "Blank 583 field: skipping record, 001 ({}) / 004 ({}) could not be read",
                    holding_id.as_deref().unwrap_or("missing"),
                    mms_id.as_deref().unwrap_or("missing")
                );
                Rejection::UnreadableIdentifiers { holding_id, mms_id }
            }
        };
        output.rejected.push(rejection);
    }

    output
}

/// Serialize each record to ISO 2709 and concatenate them.
///
/// A record the codec cannot encode is logged and skipped; the count
/// returned is the number of records actually written.
pub fn encode_records(records: &[MarcRecord]) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut written = 0;
    for record in records {
        match binary::write_record(record) {
            Ok(bytes) => {
                out.extend_from_slice(&bytes);
                written += 1;
            }
            Err(e) => tracing::warn!(
                "Could not encode holding {}: {}",
                record.control_value("001").unwrap_or("<no 001>"),
                e
            ),
        }
    }
    (out, written)
}

/// `<prefix>.<YYYYMMDD>.mrc`
pub fn output_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}.{}.mrc", prefix, date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::DataField;

    fn record(control: &[(&str, &str)], tags: &[&str]) -> MarcRecord {
        let mut record = MarcRecord::new("00000nx  a2200000un 4500");
        for (tag, value) in control {
            record.push_control_field(*tag, *value);
        }
        for tag in tags {
            record.push_data_field(DataField::new(*tag, ' ', ' ').with_subfield('a', "x"));
        }
        record
    }

    #[test]
    fn test_kept_iff_action_note_present() {
        let inputs = vec![
            record(&[("001", "h1"), ("004", "b1")], &["852", "583"]),
            record(&[("001", "h2"), ("004", "b2")], &["852"]),
            record(&[("001", "h3")], &["583", "583"]),
            record(&[("004", "b4")], &[]),
        ];

        let output = filter_annotated(inputs);

        let kept: Vec<_> = output.records.iter().map(|r| r.control_value("001")).collect();
        assert_eq!(kept, vec![Some("h1"), Some("h3")]);
        assert_eq!(
            output.rejected,
            vec![
                Rejection::MissingActionNote {
                    holding_id: "h2".to_string(),
                    mms_id: "b2".to_string()
                },
                Rejection::UnreadableIdentifiers {
                    holding_id: None,
                    mms_id: Some("b4".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_encode_concatenates_and_counts() {
        let good = record(&[("001", "h1"), ("004", "b1")], &["583"]);
        let mut bad = record(&[], &["583"]);
        bad.push_control_field("1", "not a tag");

        let (bytes, written) = encode_records(&[good.clone(), bad, good]);

        assert_eq!(written, 2);
        let decoded: Vec<_> = binary::read_records(&bytes).collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].control_value("004"), Some("b1"));
        assert!(std::str::from_utf8(&bytes).is_ok());
    }

    #[test]
    fn test_output_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 7).unwrap();
        assert_eq!(
            output_file_name("asu.alma.archived", date),
            "asu.alma.archived.20261007.mrc"
        );
    }
}
