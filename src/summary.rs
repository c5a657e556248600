use crate::transaction::{Transaction, TransactionType};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// Ledger totals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
}

/// A calendar month, displayed as `YYYY-MM`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

/// Summed amounts per month and category, zero-filled.
///
/// Months are the rows and categories the columns, both sorted. Income and expense
/// amounts are summed together, as they are in the monthly trends view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonthlyBreakdown {
    months: Vec<Month>,
    categories: Vec<String>,
    amounts: BTreeMap<(Month, String), Decimal>,
}

/// Income and expense within one month
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonthlyFlow {
    pub income: Decimal,
    pub expense: Decimal,
}

/// How total spending compares with a budget limit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetStatus {
    pub limit: Decimal,
    pub spent: Decimal,
    /// Spent as a fraction of the limit. `None` when the limit is not positive, in
    /// which case no alert is raised, or when the ratio is too large to represent.
    pub usage: Option<Decimal>,
    pub exceeded: bool,
}

impl Summary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let total_income = total_of(transactions, TransactionType::Income);
        let total_expense = total_of(transactions, TransactionType::Expense);

        Summary {
            total_income,
            total_expense,
            net: total_income - total_expense,
        }
    }

    pub fn budget_status(&self, limit: Decimal) -> BudgetStatus {
        let positive = limit > Decimal::ZERO;

        BudgetStatus {
            limit,
            spent: self.total_expense,
            usage: if positive {
                self.total_expense.checked_div(limit)
            } else {
                None
            },
            exceeded: positive && self.total_expense > limit,
        }
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl MonthlyBreakdown {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut amounts = BTreeMap::new();
        let mut months = BTreeSet::new();
        let mut categories = BTreeSet::new();

        for t in transactions {
            let month = Month::from(t.date);
            months.insert(month);
            categories.insert(t.category.clone());
            *amounts
                .entry((month, t.category.clone()))
                .or_insert(Decimal::ZERO) += t.amount;
        }

        MonthlyBreakdown {
            months: months.into_iter().collect(),
            categories: categories.into_iter().collect(),
            amounts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// The amount for one cell, zero if nothing was recorded for it
    pub fn get(&self, month: Month, category: &str) -> Decimal {
        self.amounts
            .get(&(month, category.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Each month with one amount per category, in `categories()` order
    pub fn rows(&self) -> impl Iterator<Item = (Month, Vec<Decimal>)> + '_ {
        self.months.iter().map(move |&month| {
            let cells = self
                .categories
                .iter()
                .map(|c| self.get(month, c))
                .collect();
            (month, cells)
        })
    }
}

/// Total spending per category, ignoring income
pub fn expenses_by_category(transactions: &[Transaction]) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.kind == TransactionType::Expense)
    {
        *totals.entry(t.category.clone()).or_insert(Decimal::ZERO) += t.amount;
    }
    totals
}

/// Income against expense for every month that has transactions
pub fn monthly_flow(transactions: &[Transaction]) -> BTreeMap<Month, MonthlyFlow> {
    let mut flows: BTreeMap<Month, MonthlyFlow> = BTreeMap::new();
    for t in transactions {
        let flow = flows.entry(Month::from(t.date)).or_default();
        match t.kind {
            TransactionType::Income => flow.income += t.amount,
            TransactionType::Expense => flow.expense += t.amount,
        }
    }
    flows
}

fn total_of(transactions: &[Transaction], kind: TransactionType) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(date: (i32, u32, u32), amount: Decimal, category: &str, kind: TransactionType) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            category,
            kind,
        )
    }

    fn sample() -> Vec<Transaction> {
        vec![
            t((2024, 1, 5), dec!(50.00), "Food", TransactionType::Expense),
            t((2024, 1, 10), dec!(2000.00), "Salary", TransactionType::Income),
            t((2024, 1, 20), dec!(25.50), "Food", TransactionType::Expense),
            t((2024, 2, 1), dec!(900), "Rent", TransactionType::Expense),
        ]
    }

    #[test]
    fn summary_of_empty_ledger() {
        assert_eq!(Summary::from_transactions(&[]), Summary::default());
        assert_eq!(Summary::default().net, Decimal::ZERO);
    }

    #[test]
    fn summary_food_and_salary() {
        let rows = &sample()[..2];
        let summary = Summary::from_transactions(rows);

        assert_eq!(summary.total_income, dec!(2000.00));
        assert_eq!(summary.total_expense, dec!(50.00));
        assert_eq!(summary.net, dec!(1950.00));
    }

    #[test]
    fn breakdown_of_empty_ledger_is_empty() {
        let breakdown = MonthlyBreakdown::from_transactions(&[]);
        assert!(breakdown.is_empty());
        assert!(breakdown.categories().is_empty());
        assert_eq!(breakdown.rows().count(), 0);
    }

    #[test]
    fn breakdown_is_zero_filled() {
        let breakdown = MonthlyBreakdown::from_transactions(&sample());
        let jan = Month { year: 2024, month: 1 };
        let feb = Month { year: 2024, month: 2 };

        assert_eq!(breakdown.months(), &[jan, feb]);
        assert_eq!(breakdown.categories(), &["Food", "Rent", "Salary"]);
        assert_eq!(breakdown.get(jan, "Food"), dec!(75.50));
        assert_eq!(breakdown.get(feb, "Food"), Decimal::ZERO);

        let rows: Vec<_> = breakdown.rows().collect();
        assert_eq!(rows[0], (jan, vec![dec!(75.50), dec!(0), dec!(2000.00)]));
        assert_eq!(rows[1], (feb, vec![dec!(0), dec!(900), dec!(0)]));
    }

    #[test]
    fn month_display() {
        assert_eq!(Month { year: 2024, month: 3 }.to_string(), "2024-03");
    }

    #[test]
    fn expenses_grouped_by_category() {
        let totals = expenses_by_category(&sample());
        assert_eq!(totals.get("Food"), Some(&dec!(75.50)));
        assert_eq!(totals.get("Rent"), Some(&dec!(900)));
        assert_eq!(totals.get("Salary"), None);
    }

    #[test]
    fn monthly_flow_splits_income_and_expense() {
        let flows = monthly_flow(&sample());
        let jan = flows[&Month { year: 2024, month: 1 }];

        assert_eq!(jan.income, dec!(2000.00));
        assert_eq!(jan.expense, dec!(75.50));
        assert_eq!(flows.len(), 2);
    }

    #[test]
    fn budget_exceeded() {
        let summary = Summary::from_transactions(&sample());
        let status = summary.budget_status(dec!(500));

        assert!(status.exceeded);
        assert_eq!(status.spent, dec!(975.50));
        assert_eq!(status.usage, Some(dec!(1.951)));
    }

    #[test]
    fn budget_without_limit_never_alerts() {
        let summary = Summary::from_transactions(&sample());
        let status = summary.budget_status(Decimal::ZERO);

        assert!(!status.exceeded);
        assert_eq!(status.usage, None);
    }

    #[test]
    fn budget_with_tiny_limit_has_no_usage() {
        let summary = Summary {
            total_expense: dec!(1000000000),
            ..Summary::default()
        };
        let status = summary.budget_status(dec!(0.0000000000000000000000000001));

        assert!(status.exceeded);
        assert_eq!(status.usage, None);
    }
}
