//! MARC 21 interchange format: record tree, MARCXML reader and ISO 2709 codec.

pub mod binary;
pub mod record;
pub mod xml;

pub use record::{ControlField, DataField, MarcRecord, Subfield};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarcError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("No <record> element found in payload")]
    MissingRecord,

    #[error("Malformed {element} element: {reason}")]
    MalformedElement { element: String, reason: String },

    #[error("Truncated record: expected {expected} bytes, {available} available")]
    Truncated { expected: usize, available: usize },

    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    #[error("Field {tag} exceeds the 9999 byte ISO 2709 limit")]
    FieldTooLong { tag: String },

    #[error("Record exceeds the 99999 byte ISO 2709 limit")]
    RecordTooLong,
}

/// 從輸入批次中取出 MMS ID：每筆記錄的 001 以及所有 020 $a，保留檔案順序與重複值
pub fn extract_identifiers(records: &[MarcRecord]) -> Vec<String> {
    let mut identifiers = Vec::new();
    for record in records {
        if let Some(value) = record.control_value("001") {
            identifiers.push(value.to_string());
        }
        for field in record.data_fields_with_tag("020") {
            identifiers.extend(field.subfield_values('a').map(str::to_string));
        }
    }
    identifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_identifiers_includes_020a_and_duplicates() {
        let mut first = MarcRecord::new("00000nam a2200000 a 4500");
        first.push_control_field("001", "99100");
        first.push_data_field(DataField::new("020", ' ', ' ').with_subfield('a', "99200"));
        first.push_data_field(
            DataField::new("020", ' ', ' ')
                .with_subfield('a', "99300")
                .with_subfield('q', "pbk"),
        );

        let mut second = MarcRecord::new("00000nam a2200000 a 4500");
        second.push_control_field("001", "99100");

        let mut no_001 = MarcRecord::new("00000nam a2200000 a 4500");
        no_001.push_data_field(DataField::new("245", '1', '0').with_subfield('a', "Title"));

        let ids = extract_identifiers(&[first, second, no_001]);
        assert_eq!(ids, vec!["99100", "99200", "99300", "99100"]);
    }
}
