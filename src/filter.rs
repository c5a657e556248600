use crate::transaction::{Transaction, TransactionType};
use chrono::NaiveDate;

/// Narrows the ledger down to the rows a front end wants to show.
///
/// Unset criteria match everything. Date bounds are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    category: Option<String>,
    kind: Option<TransactionType>,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn with_category<S: Into<String>>(&mut self, category: S) -> &mut Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_kind(&mut self, kind: TransactionType) -> &mut Self {
        self.kind = Some(kind);
        self
    }

    pub fn since(&mut self, date: NaiveDate) -> &mut Self {
        self.from = Some(date);
        self
    }

    pub fn until(&mut self, date: NaiveDate) -> &mut Self {
        self.until = Some(date);
        self
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        self.category.as_ref().map_or(true, |c| *c == t.category)
            && self.kind.map_or(true, |k| k == t.kind)
            && self.from.map_or(true, |d| t.date >= d)
            && self.until.map_or(true, |d| t.date <= d)
    }

    /// Matching rows paired with their position in the ledger, so that a filtered
    /// view can still address rows for editing and deleting.
    pub fn apply(&self, transactions: Vec<Transaction>) -> Vec<(usize, Transaction)> {
        transactions
            .into_iter()
            .enumerate()
            .filter(|(_, t)| self.matches(t))
            .collect()
    }
}
