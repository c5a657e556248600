use crate::config::LedgerConfig;
use chrono::NaiveDate;
use std::path::Path;
use tempfile::TempDir;

/// A throwaway data directory, removed when the environment is dropped
pub(crate) struct TestEnvironment {
    dir: TempDir,
    pub config: LedgerConfig,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = TempDir::new().expect("could not create test directory");
        let config = LedgerConfig::new(dir.path());
        TestEnvironment { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("invalid test date")
}
