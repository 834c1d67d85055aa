//! CSV ingestion
//!
//! The file must carry `Mobile` and `Message` columns, and may carry a
//! `Type` column. Header names are matched case-insensitively. Rows are
//! validated individually, so one bad row never prevents the rest from
//! being sent.

use std::{io::Read, path::Path};

use herald_common::{Message, MessageError, MessageKind, Recipient};
use thiserror::Error;

pub const PHONE_COLUMN: &str = "Mobile";
pub const MESSAGE_COLUMN: &str = "Message";
pub const TYPE_COLUMN: &str = "Type";

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV is missing the required {0:?} column")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Why a row was not enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Empty message")]
    EmptyMessage,

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

impl From<MessageError> for RowError {
    fn from(value: MessageError) -> Self {
        match value {
            MessageError::InvalidRecipient { .. } => Self::InvalidPhone,
            MessageError::EmptyContent => Self::EmptyMessage,
            MessageError::UnknownKind(kind) => Self::UnknownType(kind),
        }
    }
}

/// One data row of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// 1-based data row, the header excluded
    pub row: usize,
    /// The phone number as written in the file
    pub phone: String,
    pub parsed: Result<Message, RowError>,
}

impl Entry {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.parsed.is_ok()
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    phone: usize,
    message: usize,
    kind: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, CsvError> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        Ok(Self {
            phone: find(PHONE_COLUMN).ok_or(CsvError::MissingColumn(PHONE_COLUMN))?,
            message: find(MESSAGE_COLUMN).ok_or(CsvError::MissingColumn(MESSAGE_COLUMN))?,
            kind: find(TYPE_COLUMN),
        })
    }
}

/// Read every entry from the file at `path`.
///
/// # Errors
///
/// Returns a [`CsvError`] if the file cannot be opened or decoded, or lacks a
/// required column.
pub fn read_path(path: &Path) -> Result<Vec<Entry>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    collect(reader)
}

/// Read every entry from `input`.
///
/// # Errors
///
/// Returns a [`CsvError`] if the input cannot be decoded or lacks a required
/// column.
pub fn read<R: Read>(input: R) -> Result<Vec<Entry>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    collect(reader)
}

fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Entry>, CsvError> {
    let columns = Columns::locate(reader.headers()?)?;

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let field = |position: usize| record.get(position).unwrap_or_default();

        let phone = field(columns.phone).to_string();
        let parsed = parse(&phone, field(columns.message), columns.kind.map(field));

        entries.push(Entry {
            row: index + 1,
            phone,
            parsed,
        });
    }

    Ok(entries)
}

fn parse(phone: &str, content: &str, kind: Option<&str>) -> Result<Message, RowError> {
    let recipient = Recipient::parse(phone)?;
    let kind = kind.map_or(Ok(MessageKind::Text), str::parse)?;

    let message = Message::new(recipient, kind, content);
    message.validate()?;

    Ok(message)
}
