//! Decoding of export stream bodies.
//!
//! `json` exports are decoded in two terminal states: the whole body as one
//! JSON document, or (when that fails) one JSON value per non-blank line.
//! Lines that still fail become raw-text rows so no input is dropped.
//! `csv` and `avro` bodies are never inspected; they are handed back as a
//! single binary artifact.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::media::BinaryArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Avro,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Avro => "avro",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Avro => "application/avro",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportRow {
    Record(Value),
    /// Text that did not decode as JSON, kept verbatim.
    Raw(String),
}

impl ExportRow {
    pub fn to_json(&self) -> Value {
        match self {
            ExportRow::Record(v) => v.clone(),
            ExportRow::Raw(text) => json!({ "raw": text }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutput {
    Rows(Vec<ExportRow>),
    Binary(BinaryArtifact),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonDecodeMode {
    WholeDocument,
    LineByLine,
}

pub fn parse(format: ExportFormat, body: &[u8]) -> ExportOutput {
    match format {
        ExportFormat::Json => {
            let text = String::from_utf8_lossy(body);
            let (mode, rows) = parse_json_text(&text);
            tracing::debug!("Decoded {} export rows ({:?})", rows.len(), mode);
            ExportOutput::Rows(rows)
        }
        ExportFormat::Csv | ExportFormat::Avro => ExportOutput::Binary(BinaryArtifact {
            data: body.to_vec(),
            mime_type: format.mime_type().to_string(),
            file_name: format!("export.{}", format.as_str()),
        }),
    }
}

pub fn parse_json_text(text: &str) -> (JsonDecodeMode, Vec<ExportRow>) {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => (
            JsonDecodeMode::WholeDocument,
            items.into_iter().map(ExportRow::Record).collect(),
        ),
        Ok(obj @ Value::Object(_)) => (JsonDecodeMode::WholeDocument, vec![ExportRow::Record(obj)]),
        Ok(_) => (JsonDecodeMode::WholeDocument, vec![ExportRow::Raw(text.to_string())]),
        Err(_) => (JsonDecodeMode::LineByLine, parse_lines(text)),
    }
}

fn parse_lines(text: &str) -> Vec<ExportRow> {
    let rows: Vec<ExportRow> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| match serde_json::from_str::<Value>(line) {
            Ok(v) => ExportRow::Record(v),
            Err(_) => ExportRow::Raw(line.to_string()),
        })
        .collect();
    if rows.is_empty() {
        return vec![ExportRow::Raw(text.to_string())];
    }
    rows
}
