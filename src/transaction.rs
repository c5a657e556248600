use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Dates are read and written in ISO form everywhere, including the CSV store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether a transaction brings money in or sends it out
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// A single row of the ledger.
///
/// A transaction has no identity of its own. Callers address it by its position in
/// the store, which shifts whenever an earlier row is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date must be YYYY-MM-DD, got '{0}'")]
    InvalidDate(String),
    #[error("amount must be a number > 0, got '{0}'")]
    InvalidAmount(String),
    #[error("'{0}' is not a known category")]
    UnknownCategory(String),
    #[error("type must be 'income' or 'expense', got '{0}'")]
    InvalidType(String),
}

/// A partial update for an existing transaction.
///
/// Only the fields that have been set are validated and replaced. Values are kept in
/// their raw form until the patch is applied, so an edit form can hand over exactly
/// what the user typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    date: Option<String>,
    amount: Option<String>,
    category: Option<String>,
    kind: Option<String>,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ValidationError::InvalidType(s.into())),
        }
    }
}

impl ValidationError {
    /// The name of the field that failed validation
    pub fn field(&self) -> &'static str {
        match *self {
            ValidationError::InvalidDate(_) => "date",
            ValidationError::InvalidAmount(_) => "amount",
            ValidationError::UnknownCategory(_) => "category",
            ValidationError::InvalidType(_) => "type",
        }
    }
}

impl Transaction {
    pub fn new<S: Into<String>>(
        date: NaiveDate,
        amount: Decimal,
        category: S,
        kind: TransactionType,
    ) -> Self {
        Transaction {
            date,
            amount,
            category: category.into(),
            kind,
        }
    }

    /// Build a transaction from raw user input, checking every field.
    pub fn parse(
        date: &str,
        amount: &str,
        category: &str,
        kind: &str,
        categories: &[String],
    ) -> Result<Self, ValidationError> {
        Ok(Transaction {
            date: parse_date(date)?,
            amount: parse_amount(amount)?,
            category: parse_category(category, categories)?,
            kind: kind.parse()?,
        })
    }

    /// Check the invariants that a typed transaction can still break: the amount must
    /// be positive and the category must be registered.
    pub fn validate(&self, categories: &[String]) -> Result<(), ValidationError> {
        check_amount(self.amount, || self.amount.to_string())?;
        parse_category(&self.category, categories)?;
        Ok(())
    }
}

impl TransactionPatch {
    pub fn with_date<S: Into<String>>(&mut self, date: S) -> &mut Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_amount<S: Into<String>>(&mut self, amount: S) -> &mut Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_category<S: Into<String>>(&mut self, category: S) -> &mut Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_kind<S: Into<String>>(&mut self, kind: S) -> &mut Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.amount.is_none() && self.category.is_none() && self.kind.is_none()
    }

    /// Produce the patched copy of `original`.
    ///
    /// Every supplied field is validated before anything is replaced, so a single bad
    /// field rejects the whole patch.
    pub fn apply_to(
        &self,
        original: &Transaction,
        categories: &[String],
    ) -> Result<Transaction, ValidationError> {
        let date = self.date.as_deref().map(parse_date).transpose()?;
        let amount = self.amount.as_deref().map(parse_amount).transpose()?;
        let category = self
            .category
            .as_deref()
            .map(|c| parse_category(c, categories))
            .transpose()?;
        let kind = self
            .kind
            .as_deref()
            .map(TransactionType::from_str)
            .transpose()?;

        Ok(Transaction {
            date: date.unwrap_or(original.date),
            amount: amount.unwrap_or(original.amount),
            category: category.unwrap_or_else(|| original.category.clone()),
            kind: kind.unwrap_or(original.kind),
        })
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.into()))
}

pub fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();

    // Accept exponent notation as well, since spreadsheet exports are full of it
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ValidationError::InvalidAmount(raw.into()))?;

    check_amount(amount, || raw.into())?;
    Ok(amount)
}

fn parse_category(raw: &str, categories: &[String]) -> Result<String, ValidationError> {
    if categories.iter().any(|c| c == raw) {
        Ok(raw.into())
    } else {
        Err(ValidationError::UnknownCategory(raw.into()))
    }
}

fn check_amount<F: FnOnce() -> String>(amount: Decimal, raw: F) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount(raw()));
    }
    Ok(())
}
