use log::debug;
use std::{
    env,
    path::{Path, PathBuf},
};

/// How many undo entries are kept before the oldest is dropped.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

const DATA_DIR_VAR: &str = "BUDGET_LEDGER_DATA_DIR";
const USER_VAR: &str = "BUDGET_LEDGER_USER";

/// The storage namespace every component works against.
///
/// A config names the data directory and, optionally, the active user. Each user gets
/// their own set of files, suffixed with the username. Switching users means building
/// a new config, so nothing running against the old one is affected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    data_dir: PathBuf,
    user: Option<String>,
    undo_capacity: usize,
}

impl LedgerConfig {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        LedgerConfig {
            data_dir: data_dir.into(),
            user: None,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
        }
    }

    /// Read the data directory and user from the environment, falling back to the
    /// working directory and the default user.
    pub fn from_env() -> Self {
        let data_dir = env::var_os(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let config = LedgerConfig::new(data_dir);

        let config = match env::var(USER_VAR) {
            Ok(user) => config.with_user(user),
            Err(_) => config,
        };

        debug!(
            "using data directory {} for user {}",
            config.data_dir.display(),
            config.user.as_deref().unwrap_or("<default>")
        );

        config
    }

    /// Switch to a user's namespace. A blank name selects the default namespace.
    pub fn with_user<S: Into<String>>(mut self, user: S) -> Self {
        let user = user.into();
        let user = user.trim();
        self.user = if user.is_empty() {
            None
        } else {
            Some(user.to_string())
        };
        self
    }

    pub fn without_user(mut self) -> Self {
        self.user = None;
        self
    }

    pub fn with_undo_capacity(mut self, capacity: usize) -> Self {
        self.undo_capacity = capacity;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn undo_capacity(&self) -> usize {
        self.undo_capacity
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.file_path("data", "csv")
    }

    pub fn categories_path(&self) -> PathBuf {
        self.file_path("categories", "json")
    }

    pub fn undo_path(&self) -> PathBuf {
        self.file_path("undo", "json")
    }

    pub fn rules_path(&self) -> PathBuf {
        self.file_path("recurring", "json")
    }

    fn file_path(&self, stem: &str, extension: &str) -> PathBuf {
        let name = match self.user {
            Some(ref user) => format!("{}_{}.{}", stem, user, extension),
            None => format!("{}.{}", stem, extension),
        };
        self.data_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_paths() {
        let config = LedgerConfig::new("/data");
        assert_eq!(config.transactions_path(), PathBuf::from("/data/data.csv"));
        assert_eq!(config.categories_path(), PathBuf::from("/data/categories.json"));
        assert_eq!(config.undo_path(), PathBuf::from("/data/undo.json"));
        assert_eq!(config.rules_path(), PathBuf::from("/data/recurring.json"));
        assert_eq!(config.undo_capacity(), DEFAULT_UNDO_CAPACITY);
    }

    #[test]
    fn user_paths_are_suffixed() {
        let config = LedgerConfig::new("/data").with_user("alice");
        assert_eq!(config.user(), Some("alice"));
        assert_eq!(config.transactions_path(), PathBuf::from("/data/data_alice.csv"));
        assert_eq!(config.undo_path(), PathBuf::from("/data/undo_alice.json"));
    }

    #[test]
    fn blank_user_is_default_namespace() {
        let config = LedgerConfig::new("/data").with_user("  ");
        assert_eq!(config.user(), None);
        assert_eq!(config.transactions_path(), PathBuf::from("/data/data.csv"));
    }

    #[test]
    fn without_user_resets_namespace() {
        let config = LedgerConfig::new("/data").with_user("bob").without_user();
        assert_eq!(config, LedgerConfig::new("/data"));
    }
}
