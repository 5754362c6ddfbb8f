//! The "Rendered Age" narrative shown beneath the birth-date inputs.

use crate::dates::age_from_date;
use crate::form::FormState;
use crate::mapper::ManualAge;
use chrono::NaiveDate;

/// Narrative age for the current form.
///
/// Precedence:
/// - "always derive" mode with a birth date: the age computed from that date
/// - any manual unit above zero: the non-zero manual units, e.g. `5 years, 3 months`
/// - otherwise the age computed from the birth date, or an empty string without one
///
/// The form's own birth date is used when filled, else the stored document's.
pub fn age_preview(form: &FormState, stored_birth_date: Option<&str>, today: NaiveDate) -> String {
    let typed = form.birth_date.trim();
    let date = if typed.is_empty() {
        stored_birth_date.map(str::trim).unwrap_or_default()
    } else {
        typed
    };

    if form.always_derive() && !date.is_empty() {
        return age_from_date(date, today).narrative();
    }

    let (years, months, days) = ManualAge::from_fields(&form.age).units();
    let manual: Vec<String> = [(years, "years"), (months, "months"), (days, "days")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value} {unit}"))
        .collect();
    if !manual.is_empty() {
        return manual.join(", ");
    }

    if date.is_empty() {
        return String::new();
    }
    age_from_date(date, today).narrative()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    }

    fn form_with(birth_date: &str, years: &str, months: &str, days: &str) -> FormState {
        let mut form = FormState::default();
        form.birth_date = birth_date.into();
        form.age.years = years.into();
        form.age.months = months.into();
        form.age.days = days.into();
        form
    }

    #[test]
    fn narrates_birth_date_at_its_precision() {
        assert_eq!(age_preview(&form_with("1990", "", "", ""), None, today()), "~36 years");
        assert_eq!(
            age_preview(&form_with("1990-05", "", "", ""), None, today()),
            "36 years, 5 months"
        );
        assert_eq!(
            age_preview(&form_with("1990-05-15", "", "", ""), None, today()),
            "36 years, 5 months, 1 days"
        );
    }

    #[test]
    fn manual_units_take_precedence_and_skip_zeros() {
        let form = form_with("1990-05-15", "5", "0", "3");
        assert_eq!(age_preview(&form, None, today()), "5 years, 3 days");
    }

    #[test]
    fn always_derive_prefers_the_date() {
        let mut form = form_with("1990", "5", "", "");
        form.set_always_derive(true);
        assert_eq!(age_preview(&form, None, today()), "~36 years");
    }

    #[test]
    fn falls_back_to_stored_birth_date() {
        let form = form_with("", "", "", "");
        assert_eq!(age_preview(&form, Some("2000-11"), today()), "25 years, 11 months");
        assert_eq!(age_preview(&form, None, today()), "");
    }

    #[test]
    fn invalid_date_narrates_nothing() {
        let form = form_with("sometime", "", "", "");
        assert_eq!(age_preview(&form, None, today()), "");
    }
}
