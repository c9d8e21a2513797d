//! Append-only CSV audit trail.
//!
//! Each record is one line: `timestamp,lastSeenTag,lockFlag`, for example
//!
//! ```text
//! 2014-11-21 09:30:05,4742006,0
//! 2014-11-21 09:31:12,,1
//! ```
//!
//! The tag field is empty until a tag has been seen. Tags are written
//! byte for byte: fields containing the delimiter, a double quote or a line
//! break are quoted, with embedded quotes doubled. There is no header and no
//! schema version.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeZone};
use latchkey_core::constants::{AUDIT_DELIMITER, AUDIT_TIMESTAMP_FORMAT};
use latchkey_core::{AuditRecord, LockState, TagId};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AuditError, AuditResult};
use crate::sink::AuditSink;

/// Audit sink appending to a CSV file.
///
/// The file is opened in append mode for every record and closed again, so
/// external rotation or truncation of the trail never confuses the sink.
///
/// # Examples
///
/// ```no_run
/// use latchkey_audit::{AuditSink, CsvAuditSink};
/// use latchkey_core::{AuditRecord, LockState};
///
/// # async fn example() -> latchkey_audit::AuditResult<()> {
/// let mut sink = CsvAuditSink::new("DataDump.csv");
/// sink.append(&AuditRecord::now(None, LockState::Locked)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvAuditSink {
    path: PathBuf,
}

impl CsvAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the trail file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for CsvAuditSink {
    async fn append(&mut self, record: &AuditRecord) -> AuditResult<()> {
        let mut line = encode_record(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AuditError::io(&self.path, e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AuditError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| AuditError::io(&self.path, e))?;

        debug!("Appended audit record to {}", self.path.display());
        Ok(())
    }
}

/// Encode a record as one trail line, without the line terminator.
///
/// # Errors
///
/// Returns `AuditError::Encoding` if the CSV writer rejects the record.
pub fn encode_record(record: &AuditRecord) -> AuditResult<String> {
    let flag = record.lock_state.as_audit_flag().to_string();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(AUDIT_DELIMITER as u8)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record([
            record.formatted_timestamp().as_str(),
            record.tag_field(),
            flag.as_str(),
        ])
        .map_err(encoding)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AuditError::Encoding(e.to_string()))?;

    let mut line = String::from_utf8(bytes).map_err(encoding)?;
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(line)
}

/// Decode one trail line.
///
/// # Errors
///
/// Returns `AuditError::Encoding` if the line does not have three fields,
/// the timestamp does not parse, or the lock flag is not `0` or `1`.
pub fn decode_record(line: &str) -> AuditResult<AuditRecord> {
    let mut reader = trail_reader(line.as_bytes());
    match reader.records().next() {
        Some(fields) => decode_fields(&fields.map_err(encoding)?),
        None => Err(AuditError::Encoding("empty line".to_string())),
    }
}

/// Read every record from a trail file. Empty lines are skipped.
///
/// A missing file is an empty trail.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line does not decode.
pub async fn read_records(path: impl AsRef<Path>) -> AuditResult<Vec<AuditRecord>> {
    let path = path.as_ref();
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AuditError::io(path, e)),
    };

    trail_reader(contents.as_slice())
        .records()
        .map(|fields| decode_fields(&fields.map_err(encoding)?))
        .collect()
}

fn trail_reader(input: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(AUDIT_DELIMITER as u8)
        .from_reader(input)
}

fn decode_fields(fields: &csv::StringRecord) -> AuditResult<AuditRecord> {
    let (Some(timestamp), Some(tag), Some(flag), 3) =
        (fields.get(0), fields.get(1), fields.get(2), fields.len())
    else {
        return Err(AuditError::Encoding(format!(
            "expected 3 fields, got {}",
            fields.len()
        )));
    };

    let naive = NaiveDateTime::parse_from_str(timestamp, AUDIT_TIMESTAMP_FORMAT)
        .map_err(|e| AuditError::Encoding(format!("bad timestamp {timestamp:?}: {e}")))?;
    let timestamp = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| AuditError::Encoding(format!("nonexistent local time {naive}")))?;

    let last_seen_tag = if tag.is_empty() {
        None
    } else {
        Some(TagId::new(tag).map_err(encoding)?)
    };

    let flag: u8 = flag
        .parse()
        .map_err(|_| AuditError::Encoding(format!("bad lock flag {flag:?}")))?;
    let lock_state = LockState::from_audit_flag(flag).map_err(encoding)?;

    Ok(AuditRecord::at(timestamp, last_seen_tag, lock_state))
}

fn encoding(e: impl std::fmt::Display) -> AuditError {
    AuditError::Encoding(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(tag: Option<&str>, lock_state: LockState) -> AuditRecord {
        let timestamp = Local.with_ymd_and_hms(2014, 11, 21, 9, 30, 5).unwrap();
        AuditRecord::at(timestamp, tag.map(|t| TagId::new(t).unwrap()), lock_state)
    }

    #[rstest]
    #[case(Some("4742006"), LockState::Unlocked, "2014-11-21 09:30:05,4742006,0")]
    #[case(Some("9999999"), LockState::Locked, "2014-11-21 09:30:05,9999999,1")]
    #[case(None, LockState::Locked, "2014-11-21 09:30:05,,1")]
    #[case(Some("47,42"), LockState::Locked, "2014-11-21 09:30:05,\"47,42\",1")]
    #[case(Some("say \"hi\""), LockState::Locked, "2014-11-21 09:30:05,\"say \"\"hi\"\"\",1")]
    fn test_encode_record(
        #[case] tag: Option<&str>,
        #[case] lock_state: LockState,
        #[case] expected: &str,
    ) {
        assert_eq!(encode_record(&record(tag, lock_state)).unwrap(), expected);
    }

    #[test]
    fn test_decode_quoted_tag() {
        let decoded = decode_record("2014-11-21 09:30:05,\"47,42\",1").unwrap();
        assert_eq!(decoded, record(Some("47,42"), LockState::Locked));
    }

    #[test]
    fn test_decode_empty_tag() {
        let decoded = decode_record("2014-11-21 09:30:05,,0").unwrap();
        assert_eq!(decoded.last_seen_tag, None);
        assert_eq!(decoded.lock_state, LockState::Unlocked);
    }

    #[rstest]
    #[case("2014-11-21 09:30:05,4742006")]
    #[case("2014-11-21 09:30:05,4742006,2")]
    #[case("21/11/2014 09:30:05,4742006,1")]
    #[case("2014-11-21 09:30:05,\"4742006,1")]
    fn test_decode_invalid(#[case] line: &str) {
        assert!(matches!(decode_record(line), Err(AuditError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_csv_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DataDump.csv");
        let mut sink = CsvAuditSink::new(&path);

        sink.append(&record(None, LockState::Locked)).await.unwrap();
        sink.append(&record(Some("4742006"), LockState::Unlocked))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            contents,
            "2014-11-21 09:30:05,,1\n2014-11-21 09:30:05,4742006,0\n"
        );

        let records = read_records(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], record(Some("4742006"), LockState::Unlocked));
    }

    #[tokio::test]
    async fn test_csv_sink_keeps_tags_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DataDump.csv");
        let mut sink = CsvAuditSink::new(&path);
        let tags = [" 4742006", "4742006\n", "47,42", "4742006"];

        for tag in tags {
            sink.append(&record(Some(tag), LockState::Locked))
                .await
                .unwrap();
        }

        let records = read_records(&path).await.unwrap();
        let read_back: Vec<&str> = records
            .iter()
            .filter_map(|r| r.last_seen_tag.as_ref().map(TagId::as_str))
            .collect();
        assert_eq!(read_back, tags);
    }

    #[tokio::test]
    async fn test_csv_sink_keeps_existing_trail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DataDump.csv");
        tokio::fs::write(&path, "2014-11-20 18:00:00,4742006,1\n")
            .await
            .unwrap();

        let mut sink = CsvAuditSink::new(&path);
        sink.append(&record(None, LockState::Locked)).await.unwrap();

        assert_eq!(read_records(&path).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_csv_sink_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvAuditSink::new(dir.path().join("missing").join("DataDump.csv"));

        let result = sink.append(&record(None, LockState::Locked)).await;
        assert!(matches!(result, Err(AuditError::Io { .. })));
    }

    #[tokio::test]
    async fn test_read_missing_trail_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_records(dir.path().join("none.csv")).await.unwrap();
        assert!(records.is_empty());
    }
}
