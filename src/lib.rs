mod category;
mod config;
mod export;
mod filter;
mod frequency;
mod ledger;
mod recurrence;
mod storage;
mod store;
mod summary;
mod transaction;
mod undo;

#[cfg(test)]
mod test_utils;

pub use category::{CategoryRegistry, DEFAULT_CATEGORIES};
pub use config::{LedgerConfig, DEFAULT_UNDO_CAPACITY};
pub use export::{export, export_to_file, ExportError, ExportFormat};
pub use filter::TransactionFilter;
pub use frequency::Frequency;
pub use ledger::Ledger;
pub use recurrence::{ApplyReport, RecurrenceEngine, RecurrenceError, RecurringRule};
pub use storage::StorageError;
pub use store::{StoreError, TransactionStore};
pub use summary::{
    expenses_by_category, monthly_flow, BudgetStatus, Month, MonthlyBreakdown, MonthlyFlow,
    Summary,
};
pub use transaction::{
    parse_amount, parse_date, Transaction, TransactionPatch, TransactionType, ValidationError,
    DATE_FORMAT,
};
pub use undo::{UndoEntry, UndoError, UndoKind, UndoLog};
