use crate::{
    category::CategoryRegistry,
    config::LedgerConfig,
    filter::TransactionFilter,
    storage::{self, StorageError},
    summary::{MonthlyBreakdown, Summary},
    transaction::{Transaction, TransactionPatch, ValidationError},
    undo::{UndoEntry, UndoLog},
};
use log::{debug, error, warn};
use std::{collections::BTreeSet, path::PathBuf};
use thiserror::Error;

/// The flat, ordered transaction table.
///
/// Nothing is cached: every call reloads the table from disk and every mutation
/// rewrites it in full. Each mutation records its inverse in the undo log.
#[derive(Clone, Debug)]
pub struct TransactionStore {
    path: PathBuf,
    categories: CategoryRegistry,
    undo_log: UndoLog,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid transaction: {0}")]
    Validation(#[from] ValidationError),
    #[error("index {index} is out of range for a ledger of {len} transactions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("could not persist the ledger")]
    Storage(#[from] StorageError),
}

impl TransactionStore {
    pub fn new(config: &LedgerConfig) -> Self {
        TransactionStore {
            path: config.transactions_path(),
            categories: CategoryRegistry::new(config),
            undo_log: UndoLog::new(config),
        }
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo_log
    }

    /// The current ledger, freshly loaded.
    ///
    /// A missing table is created empty. An unreadable one is reported and treated as
    /// empty rather than failing the caller.
    pub fn read(&self) -> Vec<Transaction> {
        match storage::read_transactions(&self.path) {
            Ok(Some(transactions)) => transactions,
            Ok(None) => {
                if let Err(e) = storage::write_transactions(&self.path, &[]) {
                    warn!("could not initialise {}: {}", self.path.display(), e);
                }
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "could not read {} ({}), treating the ledger as empty",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate raw input and append it. Returns the index of the new row.
    pub fn add(
        &self,
        date: &str,
        amount: &str,
        category: &str,
        kind: &str,
    ) -> Result<usize, StoreError> {
        let transaction = Transaction::parse(date, amount, category, kind, &self.categories.list())?;
        self.append_new(transaction)
    }

    /// Append an already typed transaction, checking the amount and category
    pub fn add_transaction(&self, transaction: Transaction) -> Result<usize, StoreError> {
        transaction.validate(&self.categories.list())?;
        self.append_new(transaction)
    }

    /// Apply a partial update to the row at `index`.
    ///
    /// All supplied fields are validated before anything changes. The undo entry
    /// captures every field of the original row, not only the edited ones.
    pub fn edit(&self, index: usize, patch: &TransactionPatch) -> Result<(), StoreError> {
        let mut transactions = self.read();
        let len = transactions.len();
        let row = transactions
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;

        let updated = patch.apply_to(row, &self.categories.list())?;
        let old_values = std::mem::replace(row, updated);

        storage::write_transactions(&self.path, &transactions)?;
        debug!("edited transaction {}", index);
        self.record(UndoEntry::Edit { index, old_values });
        Ok(())
    }

    /// Remove a batch of rows, recorded as a single undo entry.
    ///
    /// An empty batch does nothing. If any index is out of range nothing is removed.
    /// Returns the removed rows in ledger order.
    pub fn delete(&self, indices: &[usize]) -> Result<Vec<Transaction>, StoreError> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let transactions = self.read();
        let len = transactions.len();
        let targets: BTreeSet<usize> = indices.iter().copied().collect();
        if let Some(&index) = targets.iter().find(|&&i| i >= len) {
            return Err(StoreError::IndexOutOfRange { index, len });
        }

        let (removed, kept): (Vec<_>, Vec<_>) = transactions
            .into_iter()
            .enumerate()
            .partition(|(i, _)| targets.contains(i));
        let removed: Vec<Transaction> = removed.into_iter().map(|(_, t)| t).collect();
        let kept: Vec<Transaction> = kept.into_iter().map(|(_, t)| t).collect();

        storage::write_transactions(&self.path, &kept)?;
        debug!("deleted {} transactions", removed.len());
        self.record(UndoEntry::Delete {
            rows: removed.clone(),
        });
        Ok(removed)
    }

    pub fn filter(&self, filter: &TransactionFilter) -> Vec<(usize, Transaction)> {
        filter.apply(self.read())
    }

    pub fn summary(&self) -> Summary {
        Summary::from_transactions(&self.read())
    }

    pub fn monthly_breakdown(&self) -> MonthlyBreakdown {
        MonthlyBreakdown::from_transactions(&self.read())
    }

    /// Replace the whole table without touching the undo log
    pub(crate) fn write(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        storage::write_transactions(&self.path, transactions)?;
        Ok(())
    }

    // The operations below reverse a mutation. They skip validation, since they put
    // back rows that were valid when first written, and never record undo entries.

    pub(crate) fn remove_at(&self, index: usize) -> Result<Transaction, StoreError> {
        let mut transactions = self.read();
        let len = transactions.len();
        if index >= len {
            return Err(StoreError::IndexOutOfRange { index, len });
        }

        let removed = transactions.remove(index);
        self.write(&transactions)?;
        Ok(removed)
    }

    pub(crate) fn append(&self, rows: Vec<Transaction>) -> Result<(), StoreError> {
        let mut transactions = self.read();
        transactions.extend(rows);
        self.write(&transactions)
    }

    pub(crate) fn overwrite(&self, index: usize, row: Transaction) -> Result<(), StoreError> {
        let mut transactions = self.read();
        let len = transactions.len();
        match transactions.get_mut(index) {
            Some(slot) => *slot = row,
            None => return Err(StoreError::IndexOutOfRange { index, len }),
        }
        self.write(&transactions)
    }

    fn append_new(&self, transaction: Transaction) -> Result<usize, StoreError> {
        let mut transactions = self.read();
        transactions.push(transaction);
        self.write(&transactions)?;

        let index = transactions.len() - 1;
        debug!("added transaction {}: {:?}", index, transactions[index]);
        self.record(UndoEntry::Add { index });
        Ok(index)
    }

    // The mutation has already been persisted by the time this runs, so a failure
    // here only costs the ability to undo it.
    fn record(&self, entry: UndoEntry) {
        if let Err(e) = self.undo_log.push(entry) {
            error!("could not record undo entry: {}", e);
        }
    }
}
