use crate::{
    config::LedgerConfig,
    storage::{self, StorageError},
};
use log::{debug, warn};
use std::path::PathBuf;

/// The categories offered before the user has saved a registry of their own
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Food", "Rent", "Utilities", "Salary", "Other"];

/// The ordered set of category labels that transactions may use.
///
/// Removing a category does not touch transactions that already use it.
#[derive(Clone, Debug)]
pub struct CategoryRegistry {
    path: PathBuf,
}

impl CategoryRegistry {
    pub fn new(config: &LedgerConfig) -> Self {
        CategoryRegistry {
            path: config.categories_path(),
        }
    }

    /// All categories in insertion order.
    ///
    /// A missing or unreadable registry yields the default set.
    pub fn list(&self) -> Vec<String> {
        match storage::read_json::<Vec<String>>(&self.path) {
            Ok(Some(categories)) => dedup(categories),
            Ok(None) => defaults(),
            Err(e) => {
                warn!(
                    "could not read categories from {} ({}), using defaults",
                    self.path.display(),
                    e
                );
                defaults()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.list().iter().any(|c| c == name)
    }

    /// Register a new category. Returns `false` if it already exists or is blank.
    pub fn add(&self, name: &str) -> Result<bool, StorageError> {
        let name = name.trim();
        let mut categories = self.list();
        if name.is_empty() || categories.iter().any(|c| c == name) {
            return Ok(false);
        }

        categories.push(name.to_string());
        storage::write_json(&self.path, &categories)?;
        debug!("added category '{}'", name);
        Ok(true)
    }

    /// Drop a category. Returns `false` if it was not registered.
    pub fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let name = name.trim();
        let mut categories = self.list();
        let before = categories.len();
        categories.retain(|c| c != name);
        if categories.len() == before {
            return Ok(false);
        }

        storage::write_json(&self.path, &categories)?;
        debug!("removed category '{}'", name);
        Ok(true)
    }
}

fn defaults() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

// Hand-edited registries may repeat a label. Keep the first one.
fn dedup(categories: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(categories.len());
    for c in categories {
        if !unique.contains(&c) {
            unique.push(c);
        }
    }
    unique
}
