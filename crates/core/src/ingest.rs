//! Turns uploaded job sheets into a [`FieldSet`].
//!
//! Tabular uploads (CSV, or the first worksheet of an XLSX workbook) are read
//! as a header row plus the first data row. PDFs have their text extracted
//! and go through the same `key: value` line matcher as plain text. Anything a
//! sheet leaves out is filled from the same defaults the upload form uses.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use csv::{ReaderBuilder, Trim};
use lopdf::Document;
use thiserror::Error;

use crate::domain::fields::{
    FieldSet, FieldValue, COMPLEXITY, MATERIAL, QUANTITY, SERVICE_TYPE, TURNAROUND_DAYS,
};

pub const DEFAULT_QUANTITY: i64 = 1;
pub const DEFAULT_MATERIAL: &str = "aluminum";
pub const DEFAULT_COMPLEXITY: f64 = 1.0;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("unsupported upload type `{0}`")]
    UnsupportedType(String),
    #[error("could not parse {format} upload: {message}")]
    Parse { format: &'static str, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Spreadsheet,
    Pdf,
    PlainText,
}

impl UploadFormat {
    /// Matches on the media type only; parameters such as `charset` are ignored.
    pub fn from_content_type(content_type: &str) -> Result<Self, IngestError> {
        let media_type =
            content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match media_type.as_str() {
            "text/csv" => Ok(Self::Csv),
            XLSX_CONTENT_TYPE => Ok(Self::Spreadsheet),
            "application/pdf" => Ok(Self::Pdf),
            "text/plain" => Ok(Self::PlainText),
            _ => Err(IngestError::UnsupportedType(content_type.trim().to_string())),
        }
    }

    /// File extension lookup for local sheets; unknown extensions are `None`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Spreadsheet),
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Spreadsheet => XLSX_CONTENT_TYPE,
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Spreadsheet => "xlsx",
            Self::Pdf => "pdf",
            Self::PlainText => "text",
        }
    }
}

pub fn parse_upload(content_type: &str, bytes: &[u8]) -> Result<FieldSet, IngestError> {
    let format = UploadFormat::from_content_type(content_type)?;

    let fields = match format {
        UploadFormat::Csv => parse_csv(utf8(format, bytes)?)?,
        UploadFormat::Spreadsheet => parse_xlsx(bytes)?,
        UploadFormat::Pdf => parse_pdf(bytes)?,
        UploadFormat::PlainText => parse_plain_text(utf8(format, bytes)?)?,
    };

    tracing::debug!(
        event_name = "ingest.upload.parsed",
        format = format.label(),
        field_count = fields.len(),
        "upload parsed into field set"
    );
    Ok(fields)
}

fn utf8(format: UploadFormat, bytes: &[u8]) -> Result<&str, IngestError> {
    std::str::from_utf8(bytes).map_err(|error| IngestError::Parse {
        format: format.label(),
        message: format!("upload is not valid UTF-8: {error}"),
    })
}

pub fn parse_csv(text: &str) -> Result<FieldSet, IngestError> {
    let parse_error = |message: String| IngestError::Parse { format: "csv", message };

    let mut reader = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| parse_error(error.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let record = match reader.records().next() {
        Some(record) => record.map_err(|error| parse_error(error.to_string()))?,
        None => return Err(parse_error("sheet has no data rows".to_string())),
    };
    let row: Vec<String> = record.iter().map(str::to_string).collect();

    fields_from_row("csv", &headers, &row)
}

/// Reads the first worksheet: its first row names the columns and the next
/// row holds the job.
pub fn parse_xlsx(bytes: &[u8]) -> Result<FieldSet, IngestError> {
    let parse_error = |message: String| IngestError::Parse { format: "xlsx", message };

    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|error| parse_error(format!("not a readable workbook: {error}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_error("workbook has no worksheets".to_string()))?
        .map_err(|error| parse_error(error.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Err(parse_error("sheet is empty".to_string())),
    };
    let row: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Err(parse_error("sheet has no data rows".to_string())),
    };

    fields_from_row("xlsx", &headers, &row)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            text.trim().to_string()
        }
        Data::Int(value) => value.to_string(),
        Data::Float(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        _ => String::new(),
    }
}

/// Pulls the text out of every page and hands it to the line matcher.
pub fn parse_pdf(bytes: &[u8]) -> Result<FieldSet, IngestError> {
    let parse_error = |message: String| IngestError::Parse { format: "pdf", message };

    let document = Document::load_mem(bytes)
        .map_err(|error| parse_error(format!("not a readable PDF: {error}")))?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(parse_error("document has no pages".to_string()));
    }
    let text = document.extract_text(&pages).map_err(|error| parse_error(error.to_string()))?;

    parse_lines("pdf", &text)
}

/// Column names match case-insensitively; empty cells count as missing.
fn fields_from_row(
    format: &'static str,
    headers: &[String],
    row: &[String],
) -> Result<FieldSet, IngestError> {
    let parse_error = |message: String| IngestError::Parse { format, message };
    let cell = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
            .and_then(|index| row.get(index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };

    let quantity = match cell(QUANTITY) {
        Some(raw) => parse_quantity(raw).ok_or_else(|| {
            parse_error(format!("`{QUANTITY}` must be a whole number, got `{raw}`"))
        })?,
        None => DEFAULT_QUANTITY,
    };
    let complexity = match cell(COMPLEXITY) {
        Some(raw) => raw.parse::<f64>().map_err(|_| {
            parse_error(format!("`{COMPLEXITY}` must be a number, got `{raw}`"))
        })?,
        None => DEFAULT_COMPLEXITY,
    };

    let mut fields = FieldSet::new()
        .with(QUANTITY, quantity)
        .with(MATERIAL, cell(MATERIAL).unwrap_or(DEFAULT_MATERIAL))
        .with(COMPLEXITY, complexity);
    if let Some(service_type) = cell(SERVICE_TYPE) {
        fields = fields.with(SERVICE_TYPE, service_type);
    }
    if let Some(raw) = cell(TURNAROUND_DAYS) {
        let days = parse_quantity(raw).ok_or_else(|| {
            parse_error(format!("`{TURNAROUND_DAYS}` must be a whole number, got `{raw}`"))
        })?;
        fields = fields.with(TURNAROUND_DAYS, days);
    }
    Ok(fields)
}

/// Lines are matched loosely: a line mentioning `quantity` contributes its
/// digits, `material` and `service_type` take the text after the last colon,
/// and a `complexity` value that does not parse keeps the default.
pub fn parse_plain_text(text: &str) -> Result<FieldSet, IngestError> {
    parse_lines("text", text)
}

fn parse_lines(format: &'static str, text: &str) -> Result<FieldSet, IngestError> {
    let mut quantity = DEFAULT_QUANTITY;
    let mut material = DEFAULT_MATERIAL.to_string();
    let mut complexity = DEFAULT_COMPLEXITY;
    let mut extras: Vec<(&'static str, FieldValue)> = Vec::new();

    for line in text.lines().map(str::to_lowercase) {
        let value = line.rsplit(':').next().unwrap_or_default().trim();
        if line.contains(QUANTITY) {
            quantity = digits_of(&line).ok_or_else(|| IngestError::Parse {
                format,
                message: format!("no digits in quantity line `{}`", line.trim()),
            })?;
        } else if line.contains(MATERIAL) {
            material = value.to_string();
        } else if line.contains(COMPLEXITY) {
            if let Ok(parsed) = value.parse::<f64>() {
                complexity = parsed;
            }
        } else if line.contains(SERVICE_TYPE) && !value.is_empty() {
            extras.push((SERVICE_TYPE, FieldValue::from(value)));
        } else if line.contains("turnaround") {
            if let Some(days) = digits_of(&line) {
                extras.push((TURNAROUND_DAYS, FieldValue::from(days)));
            }
        }
    }

    let fields = FieldSet::new()
        .with(QUANTITY, quantity)
        .with(MATERIAL, material)
        .with(COMPLEXITY, complexity);
    Ok(extras.into_iter().fold(fields, |fields, (name, value)| fields.with(name, value)))
}

fn parse_quantity(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>().ok().filter(|value| value.fract() == 0.0).map(|value| value as i64)
    })
}

fn digits_of(line: &str) -> Option<i64> {
    let digits: String = line.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
