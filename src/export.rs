use crate::{
    storage::{self, StorageError},
    transaction::Transaction,
};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};
use thiserror::Error;

/// Formats a transaction view can be written out in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// The same table layout as the ledger file
    Csv,
    /// One JSON object per line
    JsonLines,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("could not write export")]
    Io(#[from] io::Error),
    #[error("could not serialize transactions")]
    Storage(#[from] StorageError),
    #[error("could not serialize transactions")]
    Json(#[from] serde_json::Error),
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match *self {
            ExportFormat::Csv => "csv",
            ExportFormat::JsonLines => "json",
        }
    }
}

/// Serialize `transactions` as given. No validation is done here.
pub fn export<W: Write>(
    transactions: &[Transaction],
    format: ExportFormat,
    mut writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => storage::write_csv(writer, transactions)?,
        ExportFormat::JsonLines => {
            for t in transactions {
                serde_json::to_writer(&mut writer, t)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

pub fn export_to_file(
    transactions: &[Transaction],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    export(transactions, format, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::date, transaction::TransactionType};
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::TempDir;

    fn rows() -> Vec<Transaction> {
        vec![
            Transaction::new(date(2024, 1, 5), dec!(50.00), "Food", TransactionType::Expense),
            Transaction::new(date(2024, 1, 10), dec!(2000), "Salary", TransactionType::Income),
        ]
    }

    #[test]
    fn export_csv() {
        let mut out = Vec::new();
        export(&rows(), ExportFormat::Csv, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,amount,category,type\n2024-01-05,50.00,Food,expense\n2024-01-10,2000,Salary,income\n"
        );
    }

    #[test]
    fn export_json_lines() {
        let mut out = Vec::new();
        export(&rows(), ExportFormat::JsonLines, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["category"], "Salary");
        assert_eq!(lines[1]["type"], "income");
        assert_eq!(lines[1]["amount"].as_f64(), Some(2000.0));
    }

    #[test]
    fn export_empty_view() {
        let mut out = Vec::new();
        export(&[], ExportFormat::JsonLines, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn export_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("export.{}", ExportFormat::Csv.extension()));

        export_to_file(&rows(), ExportFormat::Csv, &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("date,amount,category,type\n"));
    }
}
