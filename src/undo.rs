use crate::{
    config::LedgerConfig,
    storage::{self, StorageError},
    store::{StoreError, TransactionStore},
    transaction::Transaction,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, path::PathBuf};
use thiserror::Error;

/// The inverse of one ledger mutation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase", try_from = "UndoRecord")]
pub enum UndoEntry {
    /// Undone by deleting the row at `index`
    Add { index: usize },
    /// Undone by appending `rows` to the end of the ledger. Their relative order is
    /// kept but they do not return to their original positions.
    Delete { rows: Vec<Transaction> },
    /// Undone by putting `old_values` back at `index`
    Edit {
        index: usize,
        #[serde(rename = "old")]
        old_values: Transaction,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoKind {
    Add,
    Delete,
    Edit,
}

// Internally tagged enums are decoded through serde's buffered content, which cannot
// read the exact-precision numbers used for amounts. Entries are read field by field
// instead and checked against their action.
#[derive(Deserialize)]
pub struct UndoRecord {
    action: UndoKind,
    index: Option<usize>,
    rows: Option<Vec<Transaction>>,
    old: Option<Transaction>,
}

#[derive(Error, Debug)]
pub enum UndoError {
    #[error("could not undo {kind}")]
    Replay {
        kind: UndoKind,
        #[source]
        source: StoreError,
    },
    #[error("could not persist the undo log")]
    Storage(#[from] StorageError),
}

/// A bounded stack of undo entries, most recent last.
///
/// Once the stack is full, every push drops the oldest entry.
#[derive(Clone, Debug)]
pub struct UndoLog {
    path: PathBuf,
    capacity: usize,
}

impl UndoEntry {
    pub fn kind(&self) -> UndoKind {
        match *self {
            UndoEntry::Add { .. } => UndoKind::Add,
            UndoEntry::Delete { .. } => UndoKind::Delete,
            UndoEntry::Edit { .. } => UndoKind::Edit,
        }
    }
}

impl TryFrom<UndoRecord> for UndoEntry {
    type Error = String;

    fn try_from(record: UndoRecord) -> Result<Self, Self::Error> {
        let action = record.action;
        let missing = |field: &str| format!("{} entry is missing '{}'", action, field);

        match action {
            UndoKind::Add => Ok(UndoEntry::Add {
                index: record.index.ok_or_else(|| missing("index"))?,
            }),
            UndoKind::Delete => Ok(UndoEntry::Delete {
                rows: record.rows.ok_or_else(|| missing("rows"))?,
            }),
            UndoKind::Edit => Ok(UndoEntry::Edit {
                index: record.index.ok_or_else(|| missing("index"))?,
                old_values: record.old.ok_or_else(|| missing("old"))?,
            }),
        }
    }
}

impl fmt::Display for UndoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            UndoKind::Add => "add",
            UndoKind::Delete => "delete",
            UndoKind::Edit => "edit",
        })
    }
}

impl UndoLog {
    pub fn new(config: &LedgerConfig) -> Self {
        UndoLog {
            path: config.undo_path(),
            capacity: config.undo_capacity(),
        }
    }

    /// Entries from oldest to newest. An unreadable log is reported and treated as
    /// empty.
    pub fn entries(&self) -> Vec<UndoEntry> {
        match storage::read_json::<Vec<UndoEntry>>(&self.path) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!(
                    "could not read undo log {} ({}), starting a new one",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, entry: UndoEntry) -> Result<(), StorageError> {
        let mut entries = self.entries();
        entries.push(entry);
        self.save(entries)
    }

    /// Reverse the most recent mutation.
    ///
    /// Returns the kind of entry undone, or `None` if there was nothing to undo. The
    /// entry is consumed even when reversing it fails, so a broken entry can never
    /// block the ones beneath it. A failed replay may leave the ledger partially
    /// restored.
    pub fn undo(&self, store: &TransactionStore) -> Result<Option<UndoKind>, UndoError> {
        let mut entries = self.entries();
        let entry = match entries.pop() {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let kind = entry.kind();

        let replayed = match entry {
            UndoEntry::Add { index } => store.remove_at(index).map(|_| ()),
            UndoEntry::Delete { rows } => store.append(rows),
            UndoEntry::Edit { index, old_values } => store.overwrite(index, old_values),
        };

        self.save(entries)?;

        match replayed {
            Ok(()) => {
                debug!("undid {}", kind);
                Ok(Some(kind))
            }
            Err(source) => {
                warn!("could not undo {}: {}", kind, source);
                Err(UndoError::Replay { kind, source })
            }
        }
    }

    fn save(&self, mut entries: Vec<UndoEntry>) -> Result<(), StorageError> {
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }
        storage::write_json(&self.path, &entries)
    }
}
