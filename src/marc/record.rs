use serde::{Deserialize, Serialize};

/// Tag of the action note field every exported holding must carry.
pub const ACTION_NOTE_TAG: &str = "583";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    pub tag: String,
    pub value: String,
}

impl ControlField {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }

    /// Numeric value of the tag, `None` for non-numeric tags.
    pub fn numeric_tag(&self) -> Option<u16> {
        self.tag.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfields: Vec<Subfield>,
}

impl DataField {
    pub fn new(tag: impl Into<String>, ind1: char, ind2: char) -> Self {
        Self {
            tag: tag.into(),
            ind1,
            ind2,
            subfields: Vec::new(),
        }
    }

    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
        self
    }

    pub fn subfield_values(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |s| s.code == code)
            .map(|s| s.value.as_str())
    }
}

/// 一筆 MARC 記錄：leader、依序排列的控制欄位，以及資料欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarcRecord {
    pub leader: String,
    pub control_fields: Vec<ControlField>,
    pub data_fields: Vec<DataField>,
}

impl MarcRecord {
    pub fn new(leader: impl Into<String>) -> Self {
        Self {
            leader: leader.into(),
            control_fields: Vec::new(),
            data_fields: Vec::new(),
        }
    }

    pub fn push_control_field(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.control_fields.push(ControlField::new(tag, value));
    }

    pub fn push_data_field(&mut self, field: DataField) {
        self.data_fields.push(field);
    }

    pub fn control_field(&self, tag: &str) -> Option<&ControlField> {
        self.control_fields.iter().find(|f| f.tag == tag)
    }

    pub fn control_value(&self, tag: &str) -> Option<&str> {
        self.control_field(tag).map(|f| f.value.as_str())
    }

    pub fn data_fields_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields.iter().filter(move |f| f.tag == tag)
    }

    pub fn has_data_field(&self, tag: &str) -> bool {
        self.data_fields.iter().any(|f| f.tag == tag)
    }

    pub fn has_action_note(&self) -> bool {
        self.has_data_field(ACTION_NOTE_TAG)
    }

    pub fn control_tags(&self) -> Vec<&str> {
        self.control_fields.iter().map(|f| f.tag.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_helpers() {
        let mut record = MarcRecord::new("00000nx  a2200000un 4500");
        record.push_control_field("001", "22456000123");
        record.push_control_field("008", "0000000u    8   4001uu   0000000");
        record.push_data_field(DataField::new("583", '1', ' ').with_subfield('a', "archived"));

        assert_eq!(record.control_value("001"), Some("22456000123"));
        assert_eq!(record.control_value("004"), None);
        assert_eq!(record.control_tags(), vec!["001", "008"]);
        assert!(record.has_action_note());
        assert!(!record.has_data_field("852"));
    }

    #[test]
    fn test_numeric_tag() {
        assert_eq!(ControlField::new("005", "x").numeric_tag(), Some(5));
        assert_eq!(ControlField::new("FMT", "x").numeric_tag(), None);
    }
}
