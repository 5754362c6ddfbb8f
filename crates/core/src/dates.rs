//! Date and age arithmetic.
//!
//! Converts between partial calendar dates (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`) and
//! (years, months, days) ages, and renders dates at a chosen precision. Everything here is a
//! pure function of its arguments; "today" is always passed in.

use chrono::{Datelike, Days, Months, NaiveDate};

/// Which calendar units of a date are known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatePrecision {
    Year,
    YearMonth,
    Day,
}

/// A date known to year, year-month, or full-date precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartialDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

impl PartialDate {
    /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`. Anything else, including impossible dates,
    /// yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        fn digits(part: &str, len: usize) -> Option<u32> {
            if part.len() == len && part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().ok()
            } else {
                None
            }
        }

        let parts: Vec<&str> = text.trim().split('-').collect();
        let date = match parts.as_slice() {
            [y] => Self {
                year: digits(y, 4)? as i32,
                month: None,
                day: None,
            },
            [y, m] => Self {
                year: digits(y, 4)? as i32,
                month: Some(digits(m, 2)?),
                day: None,
            },
            [y, m, d] => Self {
                year: digits(y, 4)? as i32,
                month: Some(digits(m, 2)?),
                day: Some(digits(d, 2)?),
            },
            _ => return None,
        };

        NaiveDate::from_ymd_opt(date.year, date.month.unwrap_or(1), date.day.unwrap_or(1))?;
        Some(date)
    }

    pub fn precision(&self) -> DatePrecision {
        match (self.month, self.day) {
            (Some(_), Some(_)) => DatePrecision::Day,
            (Some(_), None) => DatePrecision::YearMonth,
            _ => DatePrecision::Year,
        }
    }

    /// Earliest calendar date the partial date covers (missing month/day become 1).
    pub fn anchor(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .unwrap_or_default()
    }
}

/// Elapsed calendar time between a birth date and an as-of date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarAge {
    pub years: i32,
    pub months: i32,
    pub days: i32,
    /// Precision of the date the age was computed from.
    pub precision: DatePrecision,
}

impl CalendarAge {
    /// Human narrative at the precision of the source date.
    pub fn narrative(&self) -> String {
        match self.precision {
            DatePrecision::Year => format!("~{} years", self.years),
            DatePrecision::YearMonth => format!("{} years, {} months", self.years, self.months),
            DatePrecision::Day => format!(
                "{} years, {} months, {} days",
                self.years, self.months, self.days
            ),
        }
    }
}

/// Result of reading an age out of a date string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeReading {
    Valid(CalendarAge),
    Invalid,
}

impl AgeReading {
    pub fn narrative(&self) -> String {
        match self {
            AgeReading::Valid(age) => age.narrative(),
            AgeReading::Invalid => String::new(),
        }
    }
}

/// Which age units were supplied, deciding how a derived birth date is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgePrecision {
    YearOnly,
    YearMonthOnly,
    MonthOnly,
    DayOnly,
    FullDate,
}

impl AgePrecision {
    pub fn date_precision(self) -> DatePrecision {
        match self {
            AgePrecision::YearOnly => DatePrecision::Year,
            AgePrecision::YearMonthOnly | AgePrecision::MonthOnly => DatePrecision::YearMonth,
            AgePrecision::DayOnly | AgePrecision::FullDate => DatePrecision::Day,
        }
    }
}

/// Compute elapsed (years, months, days) from `date` to `as_of`.
///
/// Year-only dates are anchored at 1 January and year-month dates at the 1st. A negative day
/// difference borrows the length of the month before `as_of`; a negative month difference
/// borrows 12 months from the years.
pub fn age_from_date(date: &str, as_of: NaiveDate) -> AgeReading {
    let Some(partial) = PartialDate::parse(date) else {
        return AgeReading::Invalid;
    };
    let birth = partial.anchor();

    let mut years = as_of.year() - birth.year();
    let mut months = as_of.month() as i32 - birth.month() as i32;
    let mut days = as_of.day() as i32 - birth.day() as i32;

    if days < 0 {
        months -= 1;
        days += days_in_previous_month(as_of) as i32;
    }
    if months < 0 {
        years -= 1;
        months += 12;
    }

    AgeReading::Valid(CalendarAge {
        years,
        months,
        days,
        precision: partial.precision(),
    })
}

/// Compute the calendar date lying `years`/`months`/`days` before `as_of`.
///
/// Years alone anchor to 1 January of the resulting year and months alone anchor to the 1st
/// of the resulting month. Otherwise the units are subtracted in turn from `as_of`, clamping
/// to the last day of a shorter month. Returns `None` only when the result leaves the
/// representable calendar range.
pub fn date_from_age(years: u32, months: u32, days: u32, as_of: NaiveDate) -> Option<NaiveDate> {
    match (years, months, days) {
        (y, 0, 0) if y > 0 => {
            let year = as_of.year().checked_sub(i32::try_from(y).ok()?)?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        }
        (0, m, 0) if m > 0 => as_of.with_day(1)?.checked_sub_months(Months::new(m)),
        (y, m, d) => as_of
            .checked_sub_months(Months::new(y.checked_mul(12)?))?
            .checked_sub_months(Months::new(m))?
            .checked_sub_days(Days::new(u64::from(d))),
    }
}

/// Classify which units are present; zero counts as absent.
pub fn precision_for(years: u32, months: u32, days: u32) -> AgePrecision {
    match (years > 0, months > 0, days > 0) {
        (true, false, false) => AgePrecision::YearOnly,
        (true, true, false) => AgePrecision::YearMonthOnly,
        (false, true, false) => AgePrecision::MonthOnly,
        (false, false, true) => AgePrecision::DayOnly,
        _ => AgePrecision::FullDate,
    }
}

/// Render `date` zero-padded at `precision`, truncating lower-order units.
pub fn format_date(date: NaiveDate, precision: AgePrecision) -> String {
    match precision.date_precision() {
        DatePrecision::Year => format!("{:04}", date.year()),
        DatePrecision::YearMonth => format!("{:04}-{:02}", date.year(), date.month()),
        DatePrecision::Day => format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()),
    }
}

fn days_in_previous_month(date: NaiveDate) -> u32 {
    date.with_day(1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}
