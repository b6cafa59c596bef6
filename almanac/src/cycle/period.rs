use chrono::{Datelike, NaiveDate};

use crate::error::{AlmanacError, Result};
use crate::models::CyclePeriod;

/// The birth month/day projected onto `year`. A Feb-29 birthday falls on
/// Feb-28 in non-leap years.
pub fn anniversary(birth_date: NaiveDate, year: i32) -> Result<NaiveDate> {
    let (month, day) = (birth_date.month(), birth_date.day());

    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| {
            if month == 2 && day == 29 {
                NaiveDate::from_ymd_opt(year, 2, 28)
            } else {
                None
            }
        })
        .ok_or_else(|| {
            AlmanacError::Validation(format!("No anniversary of {birth_date} in year {year}"))
        })
}

/// The solar cycle containing `reference`: from the most recent birth
/// anniversary on or before `reference` up to (excluding) the next one.
pub fn period_for(birth_date: NaiveDate, reference: NaiveDate) -> Result<CyclePeriod> {
    let this_year = anniversary(birth_date, reference.year())?;
    let start = if reference >= this_year {
        this_year
    } else {
        anniversary(birth_date, reference.year() - 1)?
    };
    let end = anniversary(birth_date, start.year() + 1)?;

    Ok(CyclePeriod { start, end })
}

/// Resolve a stored cycle label (the start year) back to its period.
pub fn period_for_label(birth_date: NaiveDate, label: &str) -> Result<CyclePeriod> {
    let year: i32 = label
        .trim()
        .parse()
        .ok()
        .filter(|y| (1..=9999).contains(y))
        .ok_or_else(|| AlmanacError::Validation(format!("Invalid cycle label: {label}")))?;

    Ok(CyclePeriod {
        start: anniversary(birth_date, year)?,
        end: anniversary(birth_date, year + 1)?,
    })
}
