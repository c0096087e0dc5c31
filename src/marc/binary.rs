//! ISO 2709 ("MARC 21 binary") reader and writer.

use super::{ControlField, DataField, MarcError, MarcRecord, Subfield};

pub const FIELD_TERMINATOR: u8 = 0x1E;
pub const RECORD_TERMINATOR: u8 = 0x1D;
pub const SUBFIELD_DELIMITER: u8 = 0x1F;

const LEADER_LEN: usize = 24;
const DIRECTORY_ENTRY_LEN: usize = 12;
const MAX_RECORD_LEN: usize = 99_999;
const MAX_FIELD_LEN: usize = 9_999;

/// Serialize one record. The leader is rebuilt with the computed record
/// length and base address, character coding `a` (UTF-8) and the fixed
/// `22`/`4500` entry map.
pub fn write_record(record: &MarcRecord) -> Result<Vec<u8>, MarcError> {
    let mut directory = Vec::new();
    let mut body = Vec::new();

    for field in &record.control_fields {
        let mut bytes = field.value.as_bytes().to_vec();
        bytes.push(FIELD_TERMINATOR);
        push_field(&mut directory, &mut body, &field.tag, &bytes)?;
    }

    for field in &record.data_fields {
        let mut bytes = Vec::new();
        push_char(&mut bytes, field.ind1);
        push_char(&mut bytes, field.ind2);
        for subfield in &field.subfields {
            bytes.push(SUBFIELD_DELIMITER);
            push_char(&mut bytes, subfield.code);
            bytes.extend_from_slice(subfield.value.as_bytes());
        }
        bytes.push(FIELD_TERMINATOR);
        push_field(&mut directory, &mut body, &field.tag, &bytes)?;
    }
    directory.push(FIELD_TERMINATOR);

    let base_address = LEADER_LEN + directory.len();
    let record_length = base_address + body.len() + 1;
    if record_length > MAX_RECORD_LEN {
        return Err(MarcError::RecordTooLong);
    }

    let mut out = Vec::with_capacity(record_length);
    out.extend_from_slice(&build_leader(&record.leader, record_length, base_address));
    out.extend_from_slice(&directory);
    out.extend_from_slice(&body);
    out.push(RECORD_TERMINATOR);
    Ok(out)
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn push_field(
    directory: &mut Vec<u8>,
    body: &mut Vec<u8>,
    tag: &str,
    bytes: &[u8],
) -> Result<(), MarcError> {
    if tag.len() != 3 || !tag.is_ascii() {
        return Err(MarcError::InvalidDirectory(format!(
            "tag '{}' is not three ASCII characters",
            tag
        )));
    }
    if bytes.len() > MAX_FIELD_LEN {
        return Err(MarcError::FieldTooLong {
            tag: tag.to_string(),
        });
    }
    if body.len() > MAX_RECORD_LEN {
        return Err(MarcError::RecordTooLong);
    }
    directory.extend_from_slice(format!("{}{:04}{:05}", tag, bytes.len(), body.len()).as_bytes());
    body.extend_from_slice(bytes);
    Ok(())
}

fn build_leader(leader: &str, record_length: usize, base_address: usize) -> [u8; LEADER_LEN] {
    let mut out = [b' '; LEADER_LEN];
    for (slot, b) in out.iter_mut().zip(leader.bytes()) {
        if b.is_ascii() && !b.is_ascii_control() {
            *slot = b;
        }
    }
    out[0..5].copy_from_slice(format!("{:05}", record_length).as_bytes());
    out[9] = b'a';
    out[10..12].copy_from_slice(b"22");
    out[12..17].copy_from_slice(format!("{:05}", base_address).as_bytes());
    out[20..24].copy_from_slice(b"4500");
    out
}

/// Iterate over the records of an ISO 2709 stream. A record that fails to
/// decode yields an error and the iterator resumes at the next record
/// terminator.
pub fn read_records(bytes: &[u8]) -> impl Iterator<Item = Result<MarcRecord, MarcError>> + '_ {
    bytes
        .split(|b| *b == RECORD_TERMINATOR)
        .filter(|chunk| !chunk.iter().all(u8::is_ascii_whitespace))
        .map(read_record)
}

/// Decode a single record; `chunk` excludes the record terminator.
pub fn read_record(chunk: &[u8]) -> Result<MarcRecord, MarcError> {
    if chunk.len() < LEADER_LEN {
        return Err(MarcError::Truncated {
            expected: LEADER_LEN,
            available: chunk.len(),
        });
    }

    let leader = String::from_utf8_lossy(&chunk[..LEADER_LEN]).into_owned();
    let record_length = digits(&chunk[0..5])
        .ok_or_else(|| MarcError::InvalidLeader(format!("record length in '{}'", leader)))?;
    if record_length > chunk.len() + 1 {
        return Err(MarcError::Truncated {
            expected: record_length,
            available: chunk.len() + 1,
        });
    }
    let base_address = digits(&chunk[12..17])
        .ok_or_else(|| MarcError::InvalidLeader(format!("base address in '{}'", leader)))?;
    if base_address <= LEADER_LEN || base_address > chunk.len() {
        return Err(MarcError::InvalidLeader(format!(
            "base address {} out of range",
            base_address
        )));
    }

    let directory = &chunk[LEADER_LEN..base_address - 1];
    if directory.len() % DIRECTORY_ENTRY_LEN != 0 {
        return Err(MarcError::InvalidDirectory(format!(
            "length {} is not a multiple of {}",
            directory.len(),
            DIRECTORY_ENTRY_LEN
        )));
    }

    let mut record = MarcRecord::new(leader);
    for entry in directory.chunks(DIRECTORY_ENTRY_LEN) {
        let tag = String::from_utf8_lossy(&entry[0..3]).into_owned();
        let (length, start) = match (digits(&entry[3..7]), digits(&entry[7..12])) {
            (Some(length), Some(start)) => (length, start),
            _ => {
                return Err(MarcError::InvalidDirectory(format!(
                    "unreadable entry for tag {}",
                    tag
                )))
            }
        };
        let from = base_address + start;
        let to = from + length;
        if to > chunk.len() {
            return Err(MarcError::Truncated {
                expected: to,
                available: chunk.len(),
            });
        }
        let mut field = &chunk[from..to];
        if let Some((&FIELD_TERMINATOR, rest)) = field.split_last() {
            field = rest;
        }

        if is_control_field(&tag, field) {
            record.control_fields.push(ControlField::new(
                tag,
                String::from_utf8_lossy(field).into_owned(),
            ));
        } else {
            record.data_fields.push(read_data_field(tag, field));
        }
    }

    Ok(record)
}

fn read_data_field(tag: String, bytes: &[u8]) -> DataField {
    let mut segments = bytes.split(|b| *b == SUBFIELD_DELIMITER);
    let indicators = String::from_utf8_lossy(segments.next().unwrap_or_default()).into_owned();
    let mut chars = indicators.chars();
    let mut field = DataField::new(tag, chars.next().unwrap_or(' '), chars.next().unwrap_or(' '));

    for segment in segments {
        let text = String::from_utf8_lossy(segment);
        let mut chars = text.chars();
        if let Some(code) = chars.next() {
            field.subfields.push(Subfield {
                code,
                value: chars.as_str().to_string(),
            });
        }
    }
    field
}

/// Tags 001-009 are control fields. A non-numeric tag (`FMT`, `LDR`) is a
/// control field when its payload carries no subfield delimiter.
fn is_control_field(tag: &str, payload: &[u8]) -> bool {
    match tag.parse::<u16>() {
        Ok(n) => n < 10,
        Err(_) => !payload.contains(&SUBFIELD_DELIMITER),
    }
}

fn digits(bytes: &[u8]) -> Option<usize> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MarcRecord {
        let mut record = MarcRecord::new("00000nx  a2200000un 4500");
        record.push_control_field("001", "22456000123");
        record.push_control_field("003", "AzTeS");
        record.push_control_field("004", "99123");
        record.push_control_field("005", "20261017093015.42");
        record.push_control_field("008", "1011252u    8   4001uueng0000000");
        record.push_data_field(
            DataField::new("852", '0', ' ')
                .with_subfield('b', "MAIN")
                .with_subfield('h', "Ångström QC1"),
        );
        record.push_data_field(
            DataField::new("583", '1', ' ')
                .with_subfield('a', "committed to retain")
                .with_subfield('c', "20240101"),
        );
        record
    }

    #[test]
    fn test_write_layout() {
        let bytes = write_record(&sample()).unwrap();

        let leader = std::str::from_utf8(&bytes[..24]).unwrap();
        assert_eq!(&leader[0..5], format!("{:05}", bytes.len()));
        assert_eq!(&leader[9..12], "a22");
        assert_eq!(&leader[20..24], "4500");

        // 7 directory entries + terminator
        let base_address: usize = leader[12..17].parse().unwrap();
        assert_eq!(base_address, 24 + 7 * 12 + 1);
        assert_eq!(bytes[base_address - 1], FIELD_TERMINATOR);
        assert_eq!(&bytes[24..36], b"001001200000");
        assert_eq!(*bytes.last().unwrap(), RECORD_TERMINATOR);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let original = sample();
        let bytes = write_record(&original).unwrap();

        let decoded: Vec<_> = read_records(&bytes).collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].control_fields, original.control_fields);
        assert_eq!(decoded[0].data_fields, original.data_fields);
    }

    #[test]
    fn test_round_trip_keeps_alphabetic_control_field() {
        let mut original = sample();
        original.control_fields.insert(4, ControlField::new("FMT", "HO"));
        original.push_data_field(DataField::new("AVA", ' ', ' ').with_subfield('b', "MAIN"));

        let bytes = write_record(&original).unwrap();
        let decoded = read_record(&bytes[..bytes.len() - 1]).unwrap();

        assert_eq!(decoded.control_tags(), vec!["001", "003", "004", "005", "FMT", "008"]);
        assert_eq!(decoded.control_value("FMT"), Some("HO"));
        assert_eq!(decoded.control_fields, original.control_fields);
        assert_eq!(decoded.data_fields, original.data_fields);
    }

    #[test]
    fn test_read_stream_skips_bad_record() {
        let mut stream = write_record(&sample()).unwrap();
        stream.extend_from_slice(b"00042garbage");
        stream.push(RECORD_TERMINATOR);
        stream.extend_from_slice(&write_record(&sample()).unwrap());
        stream.push(b'\n');

        let results: Vec<_> = read_records(&stream).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_rejects_invalid_tag() {
        let mut record = MarcRecord::new("");
        record.push_control_field("1", "x");
        assert!(matches!(
            write_record(&record),
            Err(MarcError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn test_short_leader_is_padded() {
        let mut record = MarcRecord::new("00000nx");
        record.push_control_field("001", "1");
        let bytes = write_record(&record).unwrap();
        let decoded = read_record(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(decoded.leader.len(), 24);
        assert_eq!(&decoded.leader[5..7], "nx");
        assert_eq!(decoded.control_value("001"), Some("1"));
    }
}
