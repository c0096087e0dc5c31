use super::{DataField, MarcError, MarcRecord, Subfield};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

enum Open {
    Leader,
    Control(String),
    Subfield(char),
}

/// Parse the first MARCXML `<record>` found anywhere in `payload`.
///
/// Alma wraps the record in a `<holding>` envelope, so the search is not
/// limited to the document root. Namespace prefixes (`marc:record`) are
/// ignored. Whitespace inside leader, control field and subfield text is
/// kept as-is since fixed-length fields depend on it.
pub fn parse_record(payload: &str) -> Result<MarcRecord, MarcError> {
    let mut reader = Reader::from_str(payload);

    let mut record: Option<MarcRecord> = None;
    let mut datafield: Option<DataField> = None;
    let mut open: Option<Open> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if record.is_none() {
                    if name == b"record" {
                        record = Some(MarcRecord::new(String::new()));
                    }
                    continue;
                }
                text.clear();
                match name.as_slice() {
                    b"leader" => open = Some(Open::Leader),
                    b"controlfield" => open = Some(Open::Control(required_attr(&e, "tag", "controlfield")?)),
                    b"datafield" => datafield = Some(start_datafield(&e)?),
                    b"subfield" if datafield.is_some() => {
                        open = Some(Open::Subfield(subfield_code(&e)?));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let Some(current) = record.as_mut() else {
                    continue;
                };
                match e.local_name().as_ref() {
                    b"controlfield" => {
                        let tag = required_attr(&e, "tag", "controlfield")?;
                        current.push_control_field(tag, "");
                    }
                    b"datafield" => current.push_data_field(start_datafield(&e)?),
                    b"subfield" => {
                        if let Some(field) = datafield.as_mut() {
                            field.subfields.push(Subfield {
                                code: subfield_code(&e)?,
                                value: String::new(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if open.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if open.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                let Some(current) = record.as_mut() else {
                    continue;
                };
                match e.local_name().as_ref() {
                    b"record" => {
                        return record.ok_or(MarcError::MissingRecord);
                    }
                    b"datafield" => {
                        if let Some(field) = datafield.take() {
                            current.push_data_field(field);
                        }
                    }
                    b"leader" | b"controlfield" | b"subfield" => {
                        let value = std::mem::take(&mut text);
                        match open.take() {
                            Some(Open::Leader) => current.leader = value,
                            Some(Open::Control(tag)) => current.push_control_field(tag, value),
                            Some(Open::Subfield(code)) => {
                                if let Some(field) = datafield.as_mut() {
                                    field.subfields.push(Subfield { code, value });
                                }
                            }
                            None => {}
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match record {
        None => Err(MarcError::MissingRecord),
        Some(_) => Err(MarcError::MalformedElement {
            element: "record".to_string(),
            reason: "document ended before </record>".to_string(),
        }),
    }
}

fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, MarcError> {
    for attribute in e.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == key.as_bytes() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(e: &BytesStart<'_>, key: &str, element: &str) -> Result<String, MarcError> {
    attr(e, key)?.ok_or_else(|| MarcError::MalformedElement {
        element: element.to_string(),
        reason: format!("missing '{}' attribute", key),
    })
}

fn indicator(e: &BytesStart<'_>, key: &str) -> Result<char, MarcError> {
    Ok(attr(e, key)?
        .and_then(|v| v.chars().next())
        .unwrap_or(' '))
}

fn start_datafield(e: &BytesStart<'_>) -> Result<DataField, MarcError> {
    let tag = required_attr(e, "tag", "datafield")?;
    Ok(DataField::new(tag, indicator(e, "ind1")?, indicator(e, "ind2")?))
}

fn subfield_code(e: &BytesStart<'_>) -> Result<char, MarcError> {
    required_attr(e, "code", "subfield")?
        .chars()
        .next()
        .ok_or_else(|| MarcError::MalformedElement {
            element: "subfield".to_string(),
            reason: "empty 'code' attribute".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLDING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<holding>
  <holding_id>22456000123</holding_id>
  <created_by>import</created_by>
  <record>
    <leader>00000nx  a2200000un 4500</leader>
    <controlfield tag="001">22456000123</controlfield>
    <controlfield tag="008">1011252u    8   4001uueng0000000</controlfield>
    <datafield ind1="0" ind2=" " tag="852">
      <subfield code="b">MAIN</subfield>
      <subfield code="c">STACKS &amp; ANNEX</subfield>
    </datafield>
    <datafield ind1="1" ind2=" " tag="583">
      <subfield code="a">committed to retain</subfield>
    </datafield>
  </record>
</holding>"#;

    #[test]
    fn test_parse_alma_holding_envelope() {
        let record = parse_record(HOLDING_XML).unwrap();

        assert_eq!(record.leader, "00000nx  a2200000un 4500");
        assert_eq!(record.control_tags(), vec!["001", "008"]);
        assert_eq!(
            record.control_value("008"),
            Some("1011252u    8   4001uueng0000000")
        );
        assert_eq!(record.data_fields.len(), 2);

        let location = &record.data_fields[0];
        assert_eq!(location.tag, "852");
        assert_eq!(location.ind1, '0');
        assert_eq!(location.ind2, ' ');
        assert_eq!(location.subfield_values('c').collect::<Vec<_>>(), vec!["STACKS & ANNEX"]);
        assert!(record.has_action_note());
    }

    #[test]
    fn test_parse_namespaced_collection() {
        let xml = r#"<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
  <marc:record>
    <marc:leader>00000nx  a2200000un 4500</marc:leader>
    <marc:controlfield tag="004">99123</marc:controlfield>
    <marc:datafield tag="852" ind1="0" ind2="1"><marc:subfield code="h">QA76</marc:subfield></marc:datafield>
  </marc:record>
</marc:collection>"#;

        let record = parse_record(xml).unwrap();
        assert_eq!(record.control_value("004"), Some("99123"));
        assert_eq!(record.data_fields[0].ind2, '1');
        assert_eq!(record.data_fields[0].subfields[0].value, "QA76");
    }

    #[test]
    fn test_parse_empty_elements() {
        let xml = r#"<record><leader>00000nx  a2200000un 4500</leader><controlfield tag="003"/><datafield tag="583" ind1=" " ind2=" "/></record>"#;

        let record = parse_record(xml).unwrap();
        assert_eq!(record.control_value("003"), Some(""));
        assert!(record.has_action_note());
    }

    #[test]
    fn test_parse_without_record_fails() {
        let err = parse_record("<holding><holding_id>1</holding_id></holding>").unwrap_err();
        assert!(matches!(err, MarcError::MissingRecord));
    }

    #[test]
    fn test_parse_malformed_xml_fails() {
        assert!(parse_record("<record><leader>abc</controlfield></record>").is_err());
        assert!(parse_record("<record><leader>00000nx  a2200000un 4500</leader>").is_err());
    }

    #[test]
    fn test_controlfield_without_tag_fails() {
        let err = parse_record("<record><controlfield>1</controlfield></record>").unwrap_err();
        assert!(matches!(err, MarcError::MalformedElement { .. }));
    }
}
