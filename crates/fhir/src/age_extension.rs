//! The `ageAtEncounter` patient extension.
//!
//! Records an age (years, months, days) as it was known when the record was made, as an
//! alternative or supplement to a precise birth date. Shape on the wire:
//!
//! ```text
//! { url: ageAtEncounter,
//!   extension: [ AgeYear?, AgeMonth?, AgeDay?, recordedDate ] }
//! ```
//!
//! Each unit entry is written only when the caller supplies it; whether a missing unit means
//! "skip" or "write zero" is the caller's decision. The recorded date is always written.

use crate::constants::{
    AGE_AT_ENCOUNTER_URL, AGE_DAY_URL, AGE_MONTH_URL, AGE_YEAR_URL, RECORDED_DATE_URL,
};
use crate::patient::{Extension, Quantity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

/// Age units carried by (or destined for) an age extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgeComponents {
    pub years: Option<i64>,
    pub months: Option<i64>,
    pub days: Option<i64>,
}

/// Build the age extension from the supplied units plus the mandatory recorded date.
pub fn build_age_extension(components: &AgeComponents, recorded_on: NaiveDate) -> Extension {
    let units = [
        (AGE_YEAR_URL, components.years, "years"),
        (AGE_MONTH_URL, components.months, "months"),
        (AGE_DAY_URL, components.days, "days"),
    ];

    let mut extension: Vec<Extension> = units
        .into_iter()
        .filter_map(|(url, value, unit)| value.map(|v| quantity_entry(url, v, unit)))
        .collect();

    extension.push(Extension {
        url: RECORDED_DATE_URL.to_string(),
        value_date_time: Some(recorded_on.format("%Y-%m-%d").to_string()),
        ..Extension::default()
    });

    Extension {
        url: AGE_AT_ENCOUNTER_URL.to_string(),
        extension,
        ..Extension::default()
    }
}

/// True for the top-level age extension.
pub fn is_age_extension(extension: &Extension) -> bool {
    extension.url == AGE_AT_ENCOUNTER_URL
}

/// Locate the age extension among a resource's extensions.
pub fn find_age_extension(extensions: &[Extension]) -> Option<&Extension> {
    extensions.iter().find(|ext| is_age_extension(ext))
}

/// Read the unit values back out of an age extension.
///
/// Entries whose quantity is missing or not an integer are treated as absent.
pub fn read_age_extension(extension: &Extension) -> AgeComponents {
    let unit = |url: &str| {
        extension
            .extension
            .iter()
            .find(|ext| ext.url == url)
            .and_then(|ext| ext.value_quantity.as_ref())
            .and_then(|q| q.value.as_ref())
            .and_then(Number::as_i64)
    };

    AgeComponents {
        years: unit(AGE_YEAR_URL),
        months: unit(AGE_MONTH_URL),
        days: unit(AGE_DAY_URL),
    }
}

/// The recorded date written in an age extension, if any.
pub fn recorded_date(extension: &Extension) -> Option<&str> {
    extension
        .extension
        .iter()
        .find(|ext| ext.url == RECORDED_DATE_URL)
        .and_then(|ext| ext.value_date_time.as_deref())
}

fn quantity_entry(url: &str, value: i64, unit: &str) -> Extension {
    Extension {
        url: url.to_string(),
        value_quantity: Some(Quantity {
            value: Some(Number::from(value)),
            unit: Some(unit.to_string()),
            other: Map::new(),
        }),
        ..Extension::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    }

    #[test]
    fn writes_only_supplied_units_and_recorded_date() {
        let ext = build_age_extension(
            &AgeComponents {
                years: Some(5),
                months: None,
                days: Some(0),
            },
            recorded(),
        );

        assert_eq!(ext.url, AGE_AT_ENCOUNTER_URL);
        let urls: Vec<&str> = ext.extension.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec![AGE_YEAR_URL, AGE_DAY_URL, RECORDED_DATE_URL]);
        assert_eq!(recorded_date(&ext), Some("2026-10-16"));

        let day = ext.extension[1].value_quantity.as_ref().expect("quantity");
        assert_eq!(day.unit.as_deref(), Some("days"));
        assert_eq!(day.value.as_ref().and_then(Number::as_i64), Some(0));
    }

    #[test]
    fn empty_components_still_record_the_date() {
        let ext = build_age_extension(&AgeComponents::default(), recorded());
        assert_eq!(ext.extension.len(), 1);
        assert_eq!(ext.extension[0].url, RECORDED_DATE_URL);
    }

    #[test]
    fn reads_back_written_units() {
        let components = AgeComponents {
            years: Some(34),
            months: Some(5),
            days: Some(1),
        };
        let ext = build_age_extension(&components, recorded());
        assert_eq!(read_age_extension(&ext), components);
    }

    #[test]
    fn finds_age_extension_among_others() {
        let other = Extension {
            url: "http://example.com/fhir/StructureDefinition/indigenous-people".into(),
            ..Extension::default()
        };
        let age = build_age_extension(&AgeComponents::default(), recorded());
        let list = vec![other.clone(), age.clone()];

        assert_eq!(find_age_extension(&list), Some(&age));
        assert!(find_age_extension(&[other]).is_none());
    }

    #[test]
    fn non_integer_quantity_reads_as_absent() {
        let mut ext = build_age_extension(
            &AgeComponents {
                years: Some(2),
                ..AgeComponents::default()
            },
            recorded(),
        );
        if let Some(q) = ext.extension[0].value_quantity.as_mut() {
            q.value = Number::from_f64(2.5);
        }
        assert_eq!(read_age_extension(&ext).years, None);
    }
}
