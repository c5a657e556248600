use crate::transaction::{Transaction, TransactionType, DATE_FORMAT};
use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder, StringRecord, Writer};
use log::{trace, warn};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::Path,
    str::{self, FromStr},
};
use thiserror::Error;

/// The header of the transaction table. Order matters when writing; when reading,
/// columns are looked up by name.
pub const COLUMNS: [&str; 4] = ["date", "amount", "category", "type"];

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("file access failed")]
    Io(#[from] io::Error),
    #[error("malformed CSV")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON")]
    Json(#[from] serde_json::Error),
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),
}

/// Load the transaction table.
///
/// Returns `None` if the file does not exist yet. Rows that cannot be decoded are
/// logged and skipped so that one damaged line does not hide the rest of the ledger.
pub fn read_transactions(path: &Path) -> Result<Option<Vec<Transaction>>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let positions = column_positions(reader.headers()?)?;

    let mut transactions = Vec::new();
    for (line, record) in reader.byte_records().enumerate() {
        let record = record?;
        match decode_row(&record, &positions) {
            Ok(t) => transactions.push(t),
            // Line numbers are 1-based and the header occupies the first line
            Err(reason) => warn!("skipping row {} of {}: {}", line + 2, path.display(), reason),
        }
    }

    trace!("read {} transactions from {}", transactions.len(), path.display());
    Ok(Some(transactions))
}

/// Rewrite the whole transaction table
pub fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), transactions)?;

    trace!("wrote {} transactions to {}", transactions.len(), path.display());
    Ok(())
}

/// Serialize transactions as CSV, header first
pub fn write_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<(), StorageError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(&COLUMNS)?;

    for t in transactions {
        writer.write_record(&[
            t.date.format(DATE_FORMAT).to_string(),
            t.amount.to_string(),
            t.category.clone(),
            t.kind.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Load a JSON document, or `None` if the file does not exist yet
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    Ok(Some(serde_json::from_reader(reader)?))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn column_positions(headers: &StringRecord) -> Result<[usize; 4], StorageError> {
    let mut positions = [0; 4];
    for (slot, column) in positions.iter_mut().zip(COLUMNS.iter()) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == *column)
            .ok_or(StorageError::MissingColumn(*column))?;
    }
    Ok(positions)
}

fn decode_row(record: &ByteRecord, positions: &[usize; 4]) -> Result<Transaction, String> {
    let date = field(record, positions, 0)?;
    let amount = field(record, positions, 1)?;
    let category = field(record, positions, 2)?;

    let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| format!("bad date '{}': {}", date, e))?;
    let amount = Decimal::from_str(amount)
        .or_else(|_| Decimal::from_scientific(amount))
        .map_err(|e| format!("bad amount '{}': {}", amount, e))?;
    let kind = field(record, positions, 3)?
        .parse::<TransactionType>()
        .map_err(|e| e.to_string())?;

    Ok(Transaction {
        date,
        amount,
        category: category.to_string(),
        kind,
    })
}

fn field<'r>(
    record: &'r ByteRecord,
    positions: &[usize; 4],
    column: usize,
) -> Result<&'r str, String> {
    let raw = record.get(positions[column]).unwrap_or(b"");
    str::from_utf8(raw)
        .map(str::trim)
        .map_err(|_| format!("'{}' is not valid UTF-8", COLUMNS[column]))
}
