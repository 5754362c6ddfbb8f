//! Form state to document derivation.
//!
//! [`derive_document`] turns a [`FormState`] into a complete patient document. The decision is
//! made over three independent axes, always in this order:
//!
//! 1. **Age source**: whether the birth-date input or the manual age inputs decide `birthDate`,
//!    and whether an age extension is attached.
//! 2. **Addresses**: the permanent address from its own fields; the temporary address omitted,
//!    cloned from the permanent one, or encoded from its own fields.
//! 3. **Extensions**: every extension of the prior document except the age extension is kept;
//!    the age extension is replaced by the newly computed one, if any.
//!
//! The result depends only on the form, the prior document's id and extensions, configuration
//! and the as-of date. Calling it twice with the same inputs gives the same document.

use crate::config::EditorConfig;
use crate::dates::{age_from_date, date_from_age, format_date, precision_for, AgeReading};
use crate::form::{AgeExtensionMode, AgeFields, FormState, TempAddressMode};
use chrono::NaiveDate;
use fhir::constants::PATIENT_RESOURCE_TYPE;
use fhir::{
    build_age_extension, encode_address, encode_identifier, encode_name, is_age_extension,
    Address, AddressRole, AddressUse, AgeComponents, Extension, PatientResource,
};
use serde_json::Map;

/// Manual age inputs after parsing. A unit is `Some` only when its input held a
/// non-negative integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManualAge {
    pub years: Option<u32>,
    pub months: Option<u32>,
    pub days: Option<u32>,
}

impl ManualAge {
    pub fn from_fields(fields: &AgeFields) -> Self {
        let parse = |raw: &str| raw.trim().parse::<u32>().ok();
        Self {
            years: parse(&fields.years),
            months: parse(&fields.months),
            days: parse(&fields.days),
        }
    }

    /// True when at least one unit was entered.
    pub fn is_specified(&self) -> bool {
        self.years.is_some() || self.months.is_some() || self.days.is_some()
    }

    /// Units with absent entries read as zero.
    pub fn units(&self) -> (u32, u32, u32) {
        (
            self.years.unwrap_or(0),
            self.months.unwrap_or(0),
            self.days.unwrap_or(0),
        )
    }

    /// Birth date implied by this age, written at the precision of the units entered.
    pub fn birth_date(&self, today: NaiveDate) -> Option<String> {
        let (years, months, days) = self.units();
        date_from_age(years, months, days, today)
            .map(|date| format_date(date, precision_for(years, months, days)))
    }

    /// Extension units for exactly the entries that were made.
    fn specified_components(&self) -> AgeComponents {
        AgeComponents {
            years: self.years.map(i64::from),
            months: self.months.map(i64::from),
            days: self.days.map(i64::from),
        }
    }

    /// Extension units with every unit present, absent entries written as zero.
    fn zero_filled_components(&self) -> AgeComponents {
        let (years, months, days) = self.units();
        AgeComponents {
            years: Some(i64::from(years)),
            months: Some(i64::from(months)),
            days: Some(i64::from(days)),
        }
    }
}

/// Which input decided the document's birth date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeSource {
    /// Derived from the manual age inputs.
    ManualAge,
    /// Taken from the birth-date input.
    BirthDate,
    /// Neither input was filled.
    Unknown,
}

/// Result of a derivation.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedDocument {
    pub document: PatientResource,
    /// Birth date to write back into the form's birth-date input, when it was derived from age.
    pub birth_date_writeback: Option<String>,
    pub age_source: AgeSource,
}

/// Outcome of the age-source axis.
struct AgeResolution {
    birth_date: Option<String>,
    extension: Option<Extension>,
    writeback: Option<String>,
    source: AgeSource,
}

/// Derive the canonical document from form state.
///
/// # Arguments
///
/// * `form` - Current form state.
/// * `prior` - The document currently in the store; only its id and extensions are read.
/// * `cfg` - Editor configuration (fallback resource id).
/// * `today` - As-of date for age arithmetic and the recorded-date stamp.
///
/// # Returns
///
/// The new document, plus the birth date to write back into the form when it was derived
/// from the manual age inputs.
pub fn derive_document(
    form: &FormState,
    prior: &PatientResource,
    cfg: &EditorConfig,
    today: NaiveDate,
) -> DerivedDocument {
    let age = resolve_age(form, today);

    let mut address = vec![encode_address(AddressRole::Permanent, &form.permanent)];
    if let Some(temp) = resolve_temporary_address(form, &address[0]) {
        address.push(temp);
    }

    let mut extension: Vec<Extension> = prior
        .extension
        .iter()
        .filter(|ext| !is_age_extension(ext))
        .cloned()
        .collect();
    extension.extend(age.extension);

    let document = PatientResource {
        resource_type: PATIENT_RESOURCE_TYPE.to_string(),
        id: prior
            .id
            .clone()
            .or_else(|| Some(cfg.resource_id().to_string())),
        identifier: vec![encode_identifier(&form.philhealth)],
        name: vec![encode_name(&form.name)],
        gender: form.gender,
        birth_date: age.birth_date,
        address,
        extension,
        other: Map::new(),
    };

    DerivedDocument {
        document,
        birth_date_writeback: age.writeback,
        age_source: age.source,
    }
}

fn resolve_age(form: &FormState, today: NaiveDate) -> AgeResolution {
    let manual = ManualAge::from_fields(&form.age);
    let entered = form.birth_date.trim();
    let entered = (!entered.is_empty()).then(|| entered.to_string());

    match form.age_mode() {
        AgeExtensionMode::AlwaysFromBirthDate if manual.is_specified() => {
            tracing::debug!(?manual, "always-derive: manual age is authoritative");
            from_manual_age(&manual, manual.zero_filled_components(), true, today)
        }
        AgeExtensionMode::AlwaysFromBirthDate => {
            let Some(birth_date) = entered else {
                return unknown_age();
            };
            let extension = match age_from_date(&birth_date, today) {
                AgeReading::Valid(age) => Some(build_age_extension(
                    &AgeComponents {
                        years: Some(i64::from(age.years)),
                        months: Some(i64::from(age.months)),
                        days: Some(i64::from(age.days)),
                    },
                    today,
                )),
                AgeReading::Invalid => {
                    tracing::warn!(
                        %birth_date,
                        "always-derive: birth date is not a date, no age extension"
                    );
                    None
                }
            };
            AgeResolution {
                birth_date: Some(birth_date),
                extension,
                writeback: None,
                source: AgeSource::BirthDate,
            }
        }
        mode if manual.is_specified() => {
            let generate = mode == AgeExtensionMode::GenerateWhenUnknown;
            tracing::debug!(?manual, generate, "manual age is authoritative");
            from_manual_age(&manual, manual.specified_components(), generate, today)
        }
        _ => match entered {
            Some(birth_date) => AgeResolution {
                birth_date: Some(birth_date),
                extension: None,
                writeback: None,
                source: AgeSource::BirthDate,
            },
            None => unknown_age(),
        },
    }
}

fn from_manual_age(
    manual: &ManualAge,
    components: AgeComponents,
    with_extension: bool,
    today: NaiveDate,
) -> AgeResolution {
    let birth_date = manual.birth_date(today);
    if birth_date.is_none() {
        tracing::warn!(?manual, "age is outside the calendar range, birth date left empty");
    }

    AgeResolution {
        writeback: birth_date.clone(),
        birth_date,
        extension: with_extension.then(|| build_age_extension(&components, today)),
        source: AgeSource::ManualAge,
    }
}

fn unknown_age() -> AgeResolution {
    AgeResolution {
        birth_date: None,
        extension: None,
        writeback: None,
        source: AgeSource::Unknown,
    }
}

fn resolve_temporary_address(form: &FormState, permanent: &Address) -> Option<Address> {
    match form.temp_mode() {
        TempAddressMode::SameAsPermanent => None,
        TempAddressMode::ClonePermanent => Some(Address {
            use_type: Some(AddressUse::Temp),
            ..permanent.clone()
        }),
        TempAddressMode::OwnFields => {
            Some(encode_address(AddressRole::Temporary, &form.temporary))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::constants::{
        AGE_AT_ENCOUNTER_URL, AGE_DAY_URL, AGE_MONTH_URL, AGE_YEAR_URL, RECORDED_DATE_URL,
    };
    use fhir::{find_age_extension, read_age_extension, recorded_date, GeoCoding, Patient};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    }

    fn sample_form() -> FormState {
        FormState::from_document(&Patient::sample(), &EditorConfig::default())
    }

    fn derive(form: &FormState) -> DerivedDocument {
        derive_document(form, &Patient::sample(), &EditorConfig::default(), today())
    }

    fn with_age(years: &str, months: &str, days: &str) -> FormState {
        let mut form = sample_form();
        form.birth_date.clear();
        form.age = AgeFields {
            years: years.into(),
            months: months.into(),
            days: days.into(),
        };
        form
    }

    fn age_urls(document: &PatientResource) -> Vec<String> {
        find_age_extension(&document.extension)
            .map(|ext| ext.extension.iter().map(|e| e.url.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn sample_form_derives_sample_document() {
        let derived = derive(&sample_form());
        let mut expected = Patient::sample();
        expected.address = vec![Address {
            use_type: Some(AddressUse::Home),
            country: Some("Philippines".into()),
            ..Address::default()
        }];
        assert_eq!(derived.document, expected);
        assert_eq!(derived.age_source, AgeSource::BirthDate);
        assert!(derived.birth_date_writeback.is_none());
    }

    #[test]
    fn years_only_gives_year_precision() {
        let derived = derive(&with_age("5", "", ""));
        assert_eq!(derived.document.birth_date.as_deref(), Some("2021"));
        assert_eq!(derived.birth_date_writeback.as_deref(), Some("2021"));
        assert_eq!(derived.age_source, AgeSource::ManualAge);
    }

    #[test]
    fn zero_units_count_as_absent_for_precision() {
        let derived = derive(&with_age("5", "0", "0"));
        assert_eq!(derived.document.birth_date.as_deref(), Some("2021"));
    }

    #[test]
    fn years_and_months_give_year_month_precision() {
        let derived = derive(&with_age("5", "3", ""));
        assert_eq!(derived.document.birth_date.as_deref(), Some("2021-07"));
    }

    #[test]
    fn nonzero_days_force_full_date() {
        let derived = derive(&with_age("1", "", "20"));
        assert_eq!(derived.document.birth_date.as_deref(), Some("2025-09-26"));
    }

    #[test]
    fn generate_mode_writes_only_entered_units() {
        let derived = derive(&with_age("5", "", "0"));
        assert_eq!(
            age_urls(&derived.document),
            vec![AGE_YEAR_URL, AGE_DAY_URL, RECORDED_DATE_URL]
        );
        let ext = find_age_extension(&derived.document.extension).expect("age extension");
        assert_eq!(recorded_date(ext), Some("2026-10-16"));
        assert_eq!(
            read_age_extension(ext),
            AgeComponents {
                years: Some(5),
                months: None,
                days: Some(0),
            }
        );
    }

    #[test]
    fn unparseable_age_input_is_not_specified() {
        let mut form = with_age("abc", "", "");
        form.birth_date = "1990-05-15".into();
        let derived = derive(&form);
        assert_eq!(derived.age_source, AgeSource::BirthDate);
        assert!(derived.document.extension.is_empty());
    }

    #[test]
    fn off_mode_derives_from_age_without_extension() {
        let mut form = with_age("5", "", "");
        form.set_generate_age_extension(false);
        let derived = derive(&form);
        assert_eq!(derived.document.birth_date.as_deref(), Some("2021"));
        assert!(find_age_extension(&derived.document.extension).is_none());
    }

    #[test]
    fn entered_birth_date_never_generates_extension() {
        let mut form = sample_form();
        form.set_generate_age_extension(false);
        let derived = derive(&form);
        assert_eq!(derived.document.birth_date.as_deref(), Some("1990-05-15"));
        assert!(derived.document.extension.is_empty());
    }

    #[test]
    fn nothing_entered_leaves_birth_date_out() {
        let derived = derive(&with_age("", "", ""));
        assert!(derived.document.birth_date.is_none());
        assert!(derived.document.extension.is_empty());
        assert_eq!(derived.age_source, AgeSource::Unknown);
    }

    #[test]
    fn always_mode_with_manual_age_zero_fills_extension() {
        let mut form = with_age("5", "", "");
        form.set_always_derive(true);
        let derived = derive(&form);

        assert_eq!(derived.document.birth_date.as_deref(), Some("2021"));
        assert_eq!(derived.birth_date_writeback.as_deref(), Some("2021"));
        let ext = find_age_extension(&derived.document.extension).expect("age extension");
        assert_eq!(
            read_age_extension(ext),
            AgeComponents {
                years: Some(5),
                months: Some(0),
                days: Some(0),
            }
        );
    }

    #[test]
    fn always_mode_with_birth_date_records_computed_age() {
        let mut form = sample_form();
        form.set_always_derive(true);
        let derived = derive(&form);

        assert_eq!(derived.document.birth_date.as_deref(), Some("1990-05-15"));
        assert!(derived.birth_date_writeback.is_none());
        assert_eq!(derived.age_source, AgeSource::BirthDate);
        let ext = find_age_extension(&derived.document.extension).expect("age extension");
        assert_eq!(
            read_age_extension(ext),
            AgeComponents {
                years: Some(36),
                months: Some(5),
                days: Some(1),
            }
        );
        assert_eq!(
            age_urls(&derived.document),
            vec![AGE_YEAR_URL, AGE_MONTH_URL, AGE_DAY_URL, RECORDED_DATE_URL]
        );
    }

    #[test]
    fn always_mode_with_invalid_birth_date_skips_extension() {
        let mut form = sample_form();
        form.birth_date = "15/05/1990".into();
        form.set_always_derive(true);
        let derived = derive(&form);
        assert_eq!(derived.document.birth_date.as_deref(), Some("15/05/1990"));
        assert!(derived.document.extension.is_empty());
    }

    #[test]
    fn other_extensions_survive_and_age_extension_is_replaced() {
        let indigenous = Extension {
            url: "http://example.com/fhir/StructureDefinition/indigenous-people".into(),
            ..Extension::default()
        };
        let stale_age = build_age_extension(
            &AgeComponents {
                years: Some(99),
                ..AgeComponents::default()
            },
            today(),
        );
        let mut prior = Patient::sample();
        prior.extension = vec![stale_age, indigenous.clone()];

        let derived = derive_document(
            &with_age("5", "", ""),
            &prior,
            &EditorConfig::default(),
            today(),
        );
        let extension = &derived.document.extension;
        assert_eq!(extension.len(), 2);
        assert_eq!(extension[0], indigenous);
        assert_eq!(extension[1].url, AGE_AT_ENCOUNTER_URL);
        assert_eq!(read_age_extension(&extension[1]).years, Some(5));

        let without_age = derive_document(&sample_form(), &prior, &EditorConfig::default(), today());
        assert_eq!(without_age.document.extension, vec![indigenous]);
    }

    #[test]
    fn same_as_permanent_omits_temp_address() {
        let derived = derive(&sample_form());
        assert!(derived.document.address_with_use(AddressUse::Temp).is_none());
        assert_eq!(derived.document.address.len(), 1);
    }

    #[test]
    fn clone_copies_permanent_and_retags() {
        let mut form = sample_form();
        form.permanent.line = "123 Main".into();
        form.permanent.country = "Philippines".into();
        form.permanent.geo.region = GeoCoding::new("01", "Region I");
        form.set_temp_clone_permanent(true);

        let derived = derive(&form);
        let home = derived.document.address_with_use(AddressUse::Home).expect("home");
        let temp = derived.document.address_with_use(AddressUse::Temp).expect("temp");
        assert_eq!(
            *temp,
            Address {
                use_type: Some(AddressUse::Temp),
                ..home.clone()
            }
        );
        assert_eq!(temp.line, vec!["123 Main"]);
        assert_eq!(temp.extension.len(), 1);
    }

    #[test]
    fn own_fields_encode_distinct_temp_address() {
        let mut form = sample_form();
        form.set_temp_same_as_permanent(false);
        form.temporary.line = "Dorm 5, UP Diliman".into();
        form.temporary.geo.city_municipality = GeoCoding::new("0601", "Aklan City");

        let derived = derive(&form);
        let temp = derived.document.address_with_use(AddressUse::Temp).expect("temp");
        assert_eq!(temp.line, vec!["Dorm 5", "UP Diliman"]);
        assert_eq!(temp.country.as_deref(), Some("Philippines"));
        assert_eq!(temp.extension.len(), 1);
    }

    #[test]
    fn id_comes_from_prior_or_config() {
        let mut prior = Patient::sample();
        prior.id = Some("pt-42".into());
        let kept = derive_document(&sample_form(), &prior, &EditorConfig::default(), today());
        assert_eq!(kept.document.id.as_deref(), Some("pt-42"));

        prior.id = None;
        let cfg = EditorConfig::new("draft".into(), "Philippines".into()).expect("config");
        let fallback = derive_document(&sample_form(), &prior, &cfg, today());
        assert_eq!(fallback.document.id.as_deref(), Some("draft"));
    }

    #[test]
    fn derivation_is_idempotent() {
        let mut form = with_age("5", "3", "");
        form.set_temp_clone_permanent(true);
        let first = derive(&form);
        let second = derive_document(&form, &first.document, &EditorConfig::default(), today());
        assert_eq!(first, second);
    }

    #[test]
    fn derived_document_survives_json_round_trip() {
        let mut form = with_age("5", "", "2");
        form.permanent.geo.region = GeoCoding::new("01", "Region I");
        form.set_temp_clone_permanent(true);
        let derived = derive(&form);

        let text = Patient::render(&derived.document).expect("render");
        let reparsed = Patient::parse(&text).expect("reparse");
        assert_eq!(reparsed, derived.document);
    }
}
