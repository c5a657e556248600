use crate::{
    config::LedgerConfig,
    frequency::Frequency,
    storage::{self, StorageError},
    store::{StoreError, TransactionStore},
    transaction::{Transaction, TransactionType, ValidationError},
};
use chrono::{Local, NaiveDate};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// A schedule that produces one transaction per occurrence
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub start_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub freq: Frequency,
}

/// Why a rule was left out of an apply pass
#[derive(Error, Debug)]
pub enum RecurrenceError {
    #[error("rule {index} could not be decoded")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("rule {index} is invalid")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },
}

/// The outcome of materializing the rule set
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// New rows, in the order they were appended to the ledger
    pub materialized: Vec<Transaction>,
    pub skipped: Vec<RecurrenceError>,
}

/// Stores recurring rules and expands them into ledger rows
#[derive(Clone, Debug)]
pub struct RecurrenceEngine {
    path: PathBuf,
}

impl RecurringRule {
    pub fn new<S: Into<String>>(
        start_date: NaiveDate,
        amount: Decimal,
        category: S,
        kind: TransactionType,
    ) -> Self {
        RecurringRule {
            start_date,
            amount,
            category: category.into(),
            kind,
            freq: Frequency::default(),
        }
    }

    pub fn with_frequency(mut self, freq: Frequency) -> Self {
        self.freq = freq;
        self
    }

    /// The row this rule produces on `date`
    pub fn occurrence(&self, date: NaiveDate) -> Transaction {
        Transaction::new(date, self.amount, self.category.clone(), self.kind)
    }
}

impl RecurrenceEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        RecurrenceEngine {
            path: config.rules_path(),
        }
    }

    /// Rules that decode cleanly. Malformed rules are logged and left out.
    pub fn rules(&self) -> Result<Vec<RecurringRule>, StorageError> {
        let rules = self
            .load()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match decode(index, value) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("{}", describe(&e));
                    None
                }
            })
            .collect();
        Ok(rules)
    }

    /// Save a new rule. Nothing is checked until the rule is applied.
    pub fn add_rule(&self, rule: &RecurringRule) -> Result<(), StorageError> {
        // An unreadable rule file is replaced rather than blocking new rules
        let mut rules = self.load().unwrap_or_else(|e| {
            warn!(
                "could not read rules from {} ({}), starting a new set",
                self.path.display(),
                e
            );
            Vec::new()
        });
        rules.push(serde_json::to_value(rule)?);

        storage::write_json(&self.path, &rules)?;
        debug!("added {} rule starting {}", rule.freq, rule.start_date);
        Ok(())
    }

    /// Materialize every rule up to and including today
    pub fn apply_until_today(&self, store: &TransactionStore) -> Result<ApplyReport, StoreError> {
        self.apply(store, Local::now().date_naive())
    }

    /// Materialize every rule up to and including `until`.
    ///
    /// An occurrence is skipped when an identical row already exists, whether it was
    /// in the ledger beforehand or produced earlier in this pass, so applying twice
    /// adds nothing the second time. Each rule is checked like a manual entry; a rule
    /// that fails is reported and the others still run. All new rows are written in a
    /// single save and no undo entries are recorded.
    pub fn apply(&self, store: &TransactionStore, until: NaiveDate) -> Result<ApplyReport, StoreError> {
        let mut report = ApplyReport::default();
        let values = self.load()?;
        if values.is_empty() {
            return Ok(report);
        }

        let categories = store.categories().list();
        let mut transactions = store.read();

        for (index, value) in values.into_iter().enumerate() {
            let rule = match decode(index, value).and_then(|rule| {
                rule.occurrence(rule.start_date)
                    .validate(&categories)
                    .map(|_| rule)
                    .map_err(|source| RecurrenceError::Invalid { index, source })
            }) {
                Ok(rule) => rule,
                Err(e) => {
                    warn!("{}", describe(&e));
                    report.skipped.push(e);
                    continue;
                }
            };

            for date in rule.freq.get_occurrence_dates(rule.start_date, until) {
                let candidate = rule.occurrence(date);
                if !transactions.contains(&candidate) {
                    transactions.push(candidate.clone());
                    report.materialized.push(candidate);
                }
            }
        }

        if !report.materialized.is_empty() {
            store.write(&transactions)?;
        }

        debug!(
            "materialized {} recurring transactions up to {}",
            report.materialized.len(),
            until
        );
        Ok(report)
    }

    fn load(&self) -> Result<Vec<serde_json::Value>, StorageError> {
        Ok(storage::read_json(&self.path)?.unwrap_or_default())
    }
}

// Rules are decoded one at a time so that a single bad rule cannot hide the rest
fn decode(index: usize, value: serde_json::Value) -> Result<RecurringRule, RecurrenceError> {
    serde_json::from_value(value).map_err(|source| RecurrenceError::Malformed { index, source })
}

fn describe(e: &RecurrenceError) -> String {
    let source: &dyn fmt::Display = match e {
        RecurrenceError::Malformed { source, .. } => source,
        RecurrenceError::Invalid { source, .. } => source,
    };
    format!("{} ({}), skipping it", e, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, TestEnvironment};
    use rust_decimal_macros::dec;
    use std::fs;

    fn rent() -> RecurringRule {
        RecurringRule::new(date(2024, 1, 31), dec!(900), "Rent", TransactionType::Expense)
    }

    #[test]
    fn apply_without_rules_does_nothing() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);

        let report = engine.apply(&store, date(2024, 12, 31)).unwrap();
        assert!(report.materialized.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn add_rule_persists_json() {
        let env = TestEnvironment::new();
        let engine = RecurrenceEngine::new(&env.config);

        engine.add_rule(&rent()).unwrap();
        assert_eq!(engine.rules().unwrap(), vec![rent()]);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(env.path().join("recurring.json")).unwrap())
                .unwrap();
        assert_eq!(json[0]["start_date"], "2024-01-31");
        assert_eq!(json[0]["type"], "expense");
        assert_eq!(json[0]["freq"], "monthly");
    }

    #[test]
    fn monthly_rule_clamps_to_28th() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        engine.add_rule(&rent()).unwrap();

        let report = engine.apply(&store, date(2024, 4, 30)).unwrap();
        let dates: Vec<NaiveDate> = store.read().iter().map(|t| t.date).collect();

        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 28),
                date(2024, 3, 28),
                date(2024, 4, 28)
            ]
        );
        assert_eq!(report.materialized.len(), 4);
    }

    #[test]
    fn apply_twice_is_idempotent() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        engine
            .add_rule(&RecurringRule::new(date(2024, 3, 1), dec!(5), "Food", TransactionType::Expense)
                .with_frequency(Frequency::Weekly))
            .unwrap();

        let first = engine.apply(&store, date(2024, 3, 31)).unwrap();
        let rows = store.read();
        let second = engine.apply(&store, date(2024, 3, 31)).unwrap();

        assert_eq!(first.materialized.len(), 5);
        assert!(second.materialized.is_empty());
        assert_eq!(store.read(), rows);
    }

    #[test]
    fn existing_rows_are_not_duplicated() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        store.add("2024-02-28", "900.00", "Rent", "expense").unwrap();
        engine.add_rule(&rent()).unwrap();

        engine.apply(&store, date(2024, 3, 28)).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn identical_rules_do_not_duplicate_each_other() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        engine.add_rule(&rent()).unwrap();
        engine.add_rule(&rent()).unwrap();

        engine.apply(&store, date(2024, 2, 28)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn daily_rule_stops_at_cutoff() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        engine
            .add_rule(&RecurringRule::new(date(2024, 1, 1), dec!(3), "Food", TransactionType::Expense)
                .with_frequency(Frequency::Daily))
            .unwrap();

        engine.apply(&store, date(2024, 1, 10)).unwrap();
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn bad_rules_do_not_block_good_ones() {
        let env = TestEnvironment::new();
        fs::write(
            env.path().join("recurring.json"),
            r#"[
                {"start_date": "2024-13-01", "amount": 10, "category": "Food", "type": "expense"},
                {"start_date": "2024-01-01", "amount": 10, "category": "Travel", "type": "expense"},
                {"start_date": "2024-01-01", "amount": 2000.0, "category": "Salary", "type": "income"}
            ]"#,
        )
        .unwrap();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);

        let report = engine.apply(&store, date(2024, 2, 15)).unwrap();

        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0], RecurrenceError::Malformed { index: 0, .. }));
        assert!(matches!(report.skipped[1], RecurrenceError::Invalid { index: 1, .. }));
        assert_eq!(report.materialized.len(), 2);
        assert_eq!(store.summary().total_income, dec!(4000));
        assert_eq!(engine.rules().unwrap().len(), 2);
    }

    #[test]
    fn rule_without_freq_is_monthly() {
        let rule: RecurringRule = serde_json::from_str(
            r#"{"start_date": "2024-01-15", "amount": 12.5, "category": "Food", "type": "expense"}"#,
        )
        .unwrap();
        assert_eq!(rule.freq, Frequency::Monthly);
        assert_eq!(rule.amount, dec!(12.5));
    }

    #[test]
    fn materialized_rows_are_not_undoable() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        engine.add_rule(&rent()).unwrap();

        engine.apply(&store, date(2024, 2, 28)).unwrap();
        assert!(store.undo_log().is_empty());
    }

    #[test]
    fn rule_amounts_are_kept_exactly() {
        let env = TestEnvironment::new();
        let store = TransactionStore::new(&env.config);
        let engine = RecurrenceEngine::new(&env.config);
        let amount = dec!(1234567890.123456789);
        engine
            .add_rule(&RecurringRule::new(date(2024, 1, 1), amount, "Salary", TransactionType::Income))
            .unwrap();

        assert_eq!(engine.rules().unwrap()[0].amount, amount);
        engine.apply(&store, date(2024, 2, 1)).unwrap();
        assert!(store.read().iter().all(|t| t.amount == amount));
        assert_eq!(store.len(), 2);
    }
}
