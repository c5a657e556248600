use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// Monthly occurrences are pinned to a day that every month contains. A rule anchored
// on the 29th, 30th or 31st therefore moves to the 28th after its first occurrence.
const MONTHLY_DAY_LIMIT: u32 = 28;

/// Records the recurrence of a rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Monthly
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        })
    }
}

impl Frequency {
    /// The occurrence after `date`, or `None` once we run off the end of the calendar
    pub fn next_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Frequency::Daily => date.checked_add_signed(Duration::days(1)),
            Frequency::Weekly => date.checked_add_signed(Duration::weeks(1)),
            Frequency::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, date.day().min(MONTHLY_DAY_LIMIT))
            }
        }
    }

    /// Every occurrence from `start` up to and including `end`.
    ///
    /// The first occurrence is always `start` itself, unclamped. If `start` is after
    /// `end` there are no occurrences.
    pub fn get_occurrence_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut next = Some(start);

        while let Some(date) = next {
            if date > end {
                break;
            }
            dates.push(date);
            next = self.next_date(date);
        }

        dates
    }
}
