//! Upload processor turning plain files into on-device records.
//!
//! CSV files yield one record per row with the header as property names,
//! JSON arrays yield one record per object, and anything else becomes a
//! single record summarised by its first line.

use async_trait::async_trait;
use log::debug;
use recollect_rs_protocol::{PendingUpload, ProcessedUpload, Record, UploadError, UploadProcessor};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Longest summary kept for text uploads.
const MAX_SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileImportProcessor;

#[async_trait]
impl UploadProcessor for FileImportProcessor {
    async fn process(&self, upload: &PendingUpload) -> Result<ProcessedUpload, UploadError> {
        let record_type = record_type_for(&upload.name);
        let extension = upload
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let text = match std::str::from_utf8(&upload.bytes) {
            Ok(text) => text,
            Err(_) => {
                return Ok(ProcessedUpload {
                    records: vec![binary_record(upload, &record_type)],
                    persisted: false,
                });
            }
        };
        let records = match extension.as_deref() {
            Some("csv") => csv_records(upload, &record_type, text)?,
            Some("json") => json_records(upload, &record_type, text)?,
            _ => vec![text_record(upload, &record_type, text)],
        };
        debug!(
            "processed upload (name={}, records={})",
            upload.name,
            records.len()
        );
        Ok(ProcessedUpload {
            records,
            persisted: false,
        })
    }
}

/// Record type derived from the file stem, e.g. `invoice.pdf` -> `invoice`.
fn record_type_for(name: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let stem = stem.rsplit(['/', '\\']).next().unwrap_or(stem);
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

fn new_record(upload: &PendingUpload, record_type: &str, summary: String) -> Record {
    Record::new(Uuid::new_v4().to_string(), record_type, summary).with_file_ref(upload.name.clone())
}

fn binary_record(upload: &PendingUpload, record_type: &str) -> Record {
    new_record(upload, record_type, upload.name.clone())
        .with_property("size_bytes", upload.bytes.len())
}

fn text_record(upload: &PendingUpload, record_type: &str, text: &str) -> Record {
    let summary = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_SUMMARY_CHARS).collect())
        .unwrap_or_else(|| upload.name.clone());
    new_record(upload, record_type, summary).with_property("size_bytes", upload.bytes.len())
}

fn csv_records(
    upload: &PendingUpload,
    record_type: &str,
    text: &str,
) -> Result<Vec<Record>, UploadError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Err(UploadError::Unsupported {
            name: upload.name.clone(),
            reason: "csv file has no header".to_string(),
        });
    };
    let columns = split_csv_line(header);
    Ok(lines
        .map(|line| {
            let cells = split_csv_line(line);
            let summary = cells
                .iter()
                .filter(|cell| !cell.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            let mut record = new_record(upload, record_type, summary);
            for (column, cell) in columns.iter().zip(cells) {
                record = record.with_property(column.clone(), cell);
            }
            record
        })
        .collect())
}

/// Split one CSV line, honouring double-quoted cells and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn json_records(
    upload: &PendingUpload,
    record_type: &str,
    text: &str,
) -> Result<Vec<Record>, UploadError> {
    let value: Value = serde_json::from_str(text).map_err(|err| UploadError::Failed {
        name: upload.name.clone(),
        reason: err.to_string(),
    })?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(object_record(upload, record_type, map)),
            _ => None,
        })
        .collect())
}

fn object_record(upload: &PendingUpload, record_type: &str, map: Map<String, Value>) -> Record {
    let summary = ["summary", "title", "name", "description"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| upload.name.clone());
    let mut record = new_record(upload, record_type, summary);
    record.properties = map;
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn record_type_uses_file_stem() {
        assert_eq!(record_type_for("invoice.pdf"), "invoice");
        assert_eq!(record_type_for("/tmp/Leg Day.csv"), "leg-day");
        assert_eq!(record_type_for(".hidden"), "file");
    }

    #[test]
    fn csv_line_splitting_handles_quotes() {
        assert_eq!(
            split_csv_line(r#"2024-01-02, "Squat, front", "say ""hi""""#),
            vec!["2024-01-02", "Squat, front", "say \"hi\""]
        );
    }

    #[tokio::test]
    async fn csv_rows_become_records() {
        let upload = PendingUpload::new(
            "workouts.csv",
            "date,exercise,reps\n2024-01-02,squat,5\n\n2024-01-03,pullups,8\n",
        );
        let processed = FileImportProcessor.process(&upload).await.expect("process");
        assert!(!processed.persisted);
        assert_eq!(processed.records.len(), 2);
        let second = &processed.records[1];
        assert_eq!(second.record_type, "workouts");
        assert_eq!(second.summary, "2024-01-03 pullups 8");
        assert_eq!(second.properties["exercise"], json!("pullups"));
        assert_eq!(second.file_refs, vec!["workouts.csv".to_string()]);
    }

    #[tokio::test]
    async fn json_and_text_uploads() {
        let upload = PendingUpload::new(
            "receipts.json",
            r#"[{"title": "Coffee", "amount": 4.5}, 3, {"amount": 12}]"#,
        );
        let processed = FileImportProcessor.process(&upload).await.expect("process");
        assert_eq!(processed.records.len(), 2);
        assert_eq!(processed.records[0].summary, "Coffee");
        assert_eq!(processed.records[1].summary, "receipts.json");

        let upload = PendingUpload::new("note.txt", "\n  Call the dentist  \nlater");
        let processed = FileImportProcessor.process(&upload).await.expect("process");
        assert_eq!(processed.records[0].summary, "Call the dentist");

        let broken = PendingUpload::new("bad.json", "{");
        assert!(FileImportProcessor.process(&broken).await.is_err());
    }
}
