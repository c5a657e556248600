use crate::{
    category::CategoryRegistry,
    config::LedgerConfig,
    export::{self, ExportError, ExportFormat},
    filter::TransactionFilter,
    recurrence::{ApplyReport, RecurrenceEngine, RecurringRule},
    storage::StorageError,
    store::{StoreError, TransactionStore},
    summary::{self, BudgetStatus, Month, MonthlyBreakdown, MonthlyFlow, Summary},
    transaction::{Transaction, TransactionPatch},
    undo::{UndoError, UndoKind},
};
use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, io::Write};

/// Everything a front end needs, bound to one storage namespace.
///
/// A `Ledger` is cheap to build. To switch users, build another one with
/// [`Ledger::for_user`]; the handles never share state.
#[derive(Clone, Debug)]
pub struct Ledger {
    config: LedgerConfig,
    store: TransactionStore,
    recurrence: RecurrenceEngine,
}

impl Ledger {
    pub fn open(config: LedgerConfig) -> Self {
        Ledger {
            store: TransactionStore::new(&config),
            recurrence: RecurrenceEngine::new(&config),
            config,
        }
    }

    /// The same data directory under another user's namespace. `None` or a blank
    /// name selects the default namespace.
    pub fn for_user(&self, user: Option<&str>) -> Self {
        let config = match user {
            Some(user) => self.config.clone().with_user(user),
            None => self.config.clone().without_user(),
        };
        Ledger::open(config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.store.read()
    }

    pub fn add(
        &self,
        date: &str,
        amount: &str,
        category: &str,
        kind: &str,
    ) -> Result<usize, StoreError> {
        self.store.add(date, amount, category, kind)
    }

    pub fn add_transaction(&self, transaction: Transaction) -> Result<usize, StoreError> {
        self.store.add_transaction(transaction)
    }

    pub fn edit(&self, index: usize, patch: &TransactionPatch) -> Result<(), StoreError> {
        self.store.edit(index, patch)
    }

    pub fn delete(&self, indices: &[usize]) -> Result<Vec<Transaction>, StoreError> {
        self.store.delete(indices)
    }

    pub fn filter(&self, filter: &TransactionFilter) -> Vec<(usize, Transaction)> {
        self.store.filter(filter)
    }

    pub fn summary(&self) -> Summary {
        self.store.summary()
    }

    pub fn monthly_breakdown(&self) -> MonthlyBreakdown {
        self.store.monthly_breakdown()
    }

    /// Total expenses measured against a spending limit
    pub fn budget_status(&self, limit: Decimal) -> BudgetStatus {
        self.summary().budget_status(limit)
    }

    pub fn expenses_by_category(&self) -> BTreeMap<String, Decimal> {
        summary::expenses_by_category(&self.transactions())
    }

    pub fn monthly_flow(&self) -> BTreeMap<Month, MonthlyFlow> {
        summary::monthly_flow(&self.transactions())
    }

    pub fn categories(&self) -> Vec<String> {
        self.registry().list()
    }

    pub fn add_category(&self, name: &str) -> Result<bool, StorageError> {
        self.registry().add(name)
    }

    pub fn remove_category(&self, name: &str) -> Result<bool, StorageError> {
        self.registry().remove(name)
    }

    /// Reverse the latest mutation. See [`crate::UndoLog::undo`].
    pub fn undo(&self) -> Result<Option<UndoKind>, UndoError> {
        self.store.undo_log().undo(&self.store)
    }

    /// Reverse the latest mutation, reporting only whether it worked. Returns `false`
    /// both when there is nothing to undo and when the undo failed.
    pub fn undo_last(&self) -> bool {
        match self.undo() {
            Ok(undone) => undone.is_some(),
            Err(e) => {
                warn!("undo failed: {}", e);
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.store.undo_log().is_empty()
    }

    pub fn add_rule(&self, rule: &RecurringRule) -> Result<(), StorageError> {
        self.recurrence.add_rule(rule)
    }

    pub fn rules(&self) -> Result<Vec<RecurringRule>, StorageError> {
        self.recurrence.rules()
    }

    /// Materialize recurring rules up to `until`, or up to today if not given
    pub fn apply_recurring(&self, until: Option<NaiveDate>) -> Result<ApplyReport, StoreError> {
        match until {
            Some(until) => self.recurrence.apply(&self.store, until),
            None => self.recurrence.apply_until_today(&self.store),
        }
    }

    /// Write the rows matching `filter` in the given format
    pub fn export<W: Write>(
        &self,
        filter: &TransactionFilter,
        format: ExportFormat,
        writer: W,
    ) -> Result<(), ExportError> {
        let rows: Vec<Transaction> = self.filter(filter).into_iter().map(|(_, t)| t).collect();
        export::export(&rows, format, writer)
    }

    fn registry(&self) -> &CategoryRegistry {
        self.store.categories()
    }
}
