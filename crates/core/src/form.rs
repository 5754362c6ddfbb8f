//! Form state and the snapshot contract with the rendering collaborator.
//!
//! The renderer reports every edit as a [`FormSnapshot`]: the value of every named field at the
//! moment of the edit. [`FormState::from_snapshot`] turns that into typed state, resolving the
//! two mutually exclusive checkbox pairs; [`FormState::from_document`] rebuilds the state the
//! form is rendered from after a document is loaded.

use crate::config::EditorConfig;
use crate::{EditorError, EditorResult};
use fhir::{
    decode_address, decode_identifier, decode_name, Address, AddressFields, AddressRole,
    AddressUse, AdministrativeGender, GeoCoding, GeoLevel, NameFields, PatientResource,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names used by the rendered form.
pub mod fields {
    pub const FAMILY: &str = "family";
    pub const GIVEN: &str = "given0";
    pub const MIDDLE: &str = "given1";
    pub const GENDER: &str = "gender";
    pub const BIRTH_DATE: &str = "birthDate";
    pub const PHILHEALTH: &str = "philHealth";
    pub const AGE_YEAR: &str = "ageYear";
    pub const AGE_MONTH: &str = "ageMonth";
    pub const AGE_DAY: &str = "ageDay";
    pub const GENERATE_AGE_EXT: &str = "generateAgeExt";
    pub const ALWAYS_GENERATE_AGE_EXT: &str = "alwaysGenerateAgeExt";
    pub const TEMP_SAME_AS_PERM: &str = "tempSameAsPerm";
    pub const TEMP_CLONE_PERM: &str = "tempClonePerm";
}

/// Names of the six fields making up one address block.
#[derive(Clone, Copy, Debug)]
pub struct AddressFieldNames {
    pub line: &'static str,
    pub region: &'static str,
    pub province: &'static str,
    pub city: &'static str,
    pub barangay: &'static str,
    pub country: &'static str,
}

impl AddressFieldNames {
    pub const PERMANENT: AddressFieldNames = AddressFieldNames {
        line: "permLine",
        region: "permRegion",
        province: "permProvince",
        city: "permCity",
        barangay: "permBarangay",
        country: "permCountry",
    };

    pub const TEMPORARY: AddressFieldNames = AddressFieldNames {
        line: "tempLine",
        region: "tempRegion",
        province: "tempProvince",
        city: "tempCity",
        barangay: "tempBarangay",
        country: "tempCountry",
    };

    pub fn for_role(role: AddressRole) -> Self {
        match role {
            AddressRole::Permanent => Self::PERMANENT,
            AddressRole::Temporary => Self::TEMPORARY,
        }
    }

    pub fn geo(&self, level: GeoLevel) -> &'static str {
        match level {
            GeoLevel::Region => self.region,
            GeoLevel::Province => self.province,
            GeoLevel::CityMunicipality => self.city,
            GeoLevel::Barangay => self.barangay,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Value of one form field as reported by the renderer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Checked(bool),
    Text(String),
    /// A select's chosen option: its code plus the option's display text.
    Select(GeoCoding),
}

/// Every field of the form by name.
pub type FormSnapshot = BTreeMap<String, FieldValue>;

// ============================================================================
// Modes
// ============================================================================

/// Which age-extension checkbox is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeExtensionMode {
    /// Neither checkbox.
    Off,
    /// "If birth date not known, generate age extension".
    #[default]
    GenerateWhenUnknown,
    /// "Always generate extension for main birth date (ignore manual fields)".
    AlwaysFromBirthDate,
}

/// How the temporary address is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TempAddressMode {
    /// Temporary address encoded from its own fields.
    OwnFields,
    /// Temporary address omitted from the document.
    #[default]
    SameAsPermanent,
    /// Permanent address copied verbatim and tagged temporary.
    ClonePermanent,
}

/// Raw manual age inputs, exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgeFields {
    pub years: String,
    pub months: String,
    pub days: String,
}

impl AgeFields {
    /// True when any of the three inputs holds more than whitespace.
    pub fn any_filled(&self) -> bool {
        [&self.years, &self.months, &self.days]
            .iter()
            .any(|v| !v.trim().is_empty())
    }
}

// ============================================================================
// Form state
// ============================================================================

/// Typed view of every field on the form.
///
/// The two mode pairs are private so they can only change through the setters, which keep
/// each pair mutually exclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormState {
    pub philhealth: String,
    pub name: NameFields,
    pub gender: Option<AdministrativeGender>,
    pub birth_date: String,
    pub age: AgeFields,
    age_mode: AgeExtensionMode,
    pub permanent: AddressFields,
    pub temporary: AddressFields,
    temp_mode: TempAddressMode,
}

impl FormState {
    pub fn age_mode(&self) -> AgeExtensionMode {
        self.age_mode
    }

    /// State of the "generate age extension when birth date unknown" checkbox.
    pub fn generate_age_extension(&self) -> bool {
        self.age_mode == AgeExtensionMode::GenerateWhenUnknown
    }

    /// State of the "always derive from birth date" checkbox.
    pub fn always_derive(&self) -> bool {
        self.age_mode == AgeExtensionMode::AlwaysFromBirthDate
    }

    /// Check or uncheck "generate age extension"; checking clears "always derive".
    pub fn set_generate_age_extension(&mut self, checked: bool) {
        if checked {
            self.age_mode = AgeExtensionMode::GenerateWhenUnknown;
        } else if self.generate_age_extension() {
            self.age_mode = AgeExtensionMode::Off;
        }
    }

    /// Check or uncheck "always derive"; checking clears "generate age extension".
    pub fn set_always_derive(&mut self, checked: bool) {
        if checked {
            self.age_mode = AgeExtensionMode::AlwaysFromBirthDate;
        } else if self.always_derive() {
            self.age_mode = AgeExtensionMode::Off;
        }
    }

    pub fn temp_mode(&self) -> TempAddressMode {
        self.temp_mode
    }

    pub fn temp_same_as_permanent(&self) -> bool {
        self.temp_mode == TempAddressMode::SameAsPermanent
    }

    pub fn temp_clone_permanent(&self) -> bool {
        self.temp_mode == TempAddressMode::ClonePermanent
    }

    /// Check or uncheck "same as permanent"; checking clears "clone".
    ///
    /// Checking also replaces the temporary fields with the permanent address's geographic
    /// codes and country so the hidden block mirrors it; the line is left blank.
    pub fn set_temp_same_as_permanent(&mut self, checked: bool) {
        if checked {
            self.temp_mode = TempAddressMode::SameAsPermanent;
            self.temporary = AddressFields {
                line: String::new(),
                country: self.permanent.country.clone(),
                geo: self.permanent.geo.clone(),
            };
        } else if self.temp_same_as_permanent() {
            self.temp_mode = TempAddressMode::OwnFields;
        }
    }

    /// Check or uncheck "clone permanent"; checking clears "same as" and the temporary fields.
    pub fn set_temp_clone_permanent(&mut self, checked: bool) {
        if checked {
            self.temp_mode = TempAddressMode::ClonePermanent;
            self.temporary = AddressFields::default();
        } else if self.temp_clone_permanent() {
            self.temp_mode = TempAddressMode::OwnFields;
        }
    }

    /// The birth-date input is disabled while any manual age input holds text.
    pub fn birth_date_locked(&self) -> bool {
        self.age.any_filled()
    }

    pub fn address_mut(&mut self, role: AddressRole) -> &mut AddressFields {
        match role {
            AddressRole::Permanent => &mut self.permanent,
            AddressRole::Temporary => &mut self.temporary,
        }
    }

    /// Build typed state from a renderer snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::MissingFormField`] if a required field is absent, and
    /// [`EditorError::WrongFieldKind`] if a field holds the wrong kind of value. Both are
    /// caller bugs; an empty string is valid input.
    pub fn from_snapshot(snapshot: &FormSnapshot) -> EditorResult<Self> {
        let reader = SnapshotReader(snapshot);

        let mut state = FormState {
            philhealth: reader.text(fields::PHILHEALTH)?,
            name: NameFields {
                family: reader.text(fields::FAMILY)?,
                given: reader.text(fields::GIVEN)?,
                middle: reader.text(fields::MIDDLE)?,
            },
            gender: AdministrativeGender::from_code(&reader.text(fields::GENDER)?),
            birth_date: reader.text(fields::BIRTH_DATE)?,
            age: AgeFields {
                years: reader.text(fields::AGE_YEAR)?,
                months: reader.text(fields::AGE_MONTH)?,
                days: reader.text(fields::AGE_DAY)?,
            },
            age_mode: AgeExtensionMode::Off,
            permanent: reader.address(AddressFieldNames::PERMANENT)?,
            temporary: AddressFields::default(),
            temp_mode: TempAddressMode::OwnFields,
        };

        // "Generate" is applied last so it wins when a snapshot reports both.
        state.set_always_derive(reader.optional_checked(fields::ALWAYS_GENERATE_AGE_EXT, false)?);
        state.set_generate_age_extension(reader.optional_checked(fields::GENERATE_AGE_EXT, true)?);

        let same_as = reader.checked(fields::TEMP_SAME_AS_PERM)?;
        let clone = reader.checked(fields::TEMP_CLONE_PERM)?;
        if same_as {
            state.set_temp_same_as_permanent(true);
        } else if clone {
            state.set_temp_clone_permanent(true);
        } else {
            state.temporary = reader.address(AddressFieldNames::TEMPORARY)?;
        }

        Ok(state)
    }

    /// Every field of the form, as the renderer would report it.
    pub fn to_snapshot(&self) -> FormSnapshot {
        let mut snapshot = FormSnapshot::new();
        let mut text = |name: &str, value: &str| {
            snapshot.insert(name.to_string(), FieldValue::Text(value.to_string()));
        };

        text(fields::PHILHEALTH, &self.philhealth);
        text(fields::FAMILY, &self.name.family);
        text(fields::GIVEN, &self.name.given);
        text(fields::MIDDLE, &self.name.middle);
        text(fields::GENDER, self.gender.map(|g| g.as_code()).unwrap_or(""));
        text(fields::BIRTH_DATE, &self.birth_date);
        text(fields::AGE_YEAR, &self.age.years);
        text(fields::AGE_MONTH, &self.age.months);
        text(fields::AGE_DAY, &self.age.days);

        for (names, address) in [
            (AddressFieldNames::PERMANENT, &self.permanent),
            (AddressFieldNames::TEMPORARY, &self.temporary),
        ] {
            snapshot.insert(names.line.into(), FieldValue::Text(address.line.clone()));
            snapshot.insert(names.country.into(), FieldValue::Text(address.country.clone()));
            for level in GeoLevel::ALL {
                snapshot.insert(
                    names.geo(level).into(),
                    FieldValue::Select(address.geo.get(level).clone()),
                );
            }
        }

        for (name, checked) in [
            (fields::GENERATE_AGE_EXT, self.generate_age_extension()),
            (fields::ALWAYS_GENERATE_AGE_EXT, self.always_derive()),
            (fields::TEMP_SAME_AS_PERM, self.temp_same_as_permanent()),
            (fields::TEMP_CLONE_PERM, self.temp_clone_permanent()),
        ] {
            snapshot.insert(name.to_string(), FieldValue::Checked(checked));
        }

        snapshot
    }

    /// Initial form values for a loaded document.
    ///
    /// The manual age inputs start empty and the age mode starts as "generate when unknown".
    /// A missing permanent country is pre-filled from configuration. The temporary address mode
    /// is "same as" when the document has no temporary address and "clone" when the temporary
    /// address equals the permanent one apart from its use.
    pub fn from_document(resource: &PatientResource, cfg: &EditorConfig) -> Self {
        let home = resource.address_with_use(AddressUse::Home);
        let temp = resource.address_with_use(AddressUse::Temp);

        let mut permanent = home.map(decode_address).unwrap_or_default();
        if permanent.country.trim().is_empty() {
            permanent.country = cfg.default_country().to_string();
        }

        let mut state = FormState {
            philhealth: decode_identifier(resource),
            name: decode_name(resource),
            gender: resource.gender,
            birth_date: resource.birth_date.clone().unwrap_or_default(),
            age: AgeFields::default(),
            age_mode: AgeExtensionMode::GenerateWhenUnknown,
            permanent,
            temporary: AddressFields::default(),
            temp_mode: TempAddressMode::OwnFields,
        };

        match (home, temp) {
            (_, None) => state.set_temp_same_as_permanent(true),
            (Some(home), Some(temp)) if is_clone_of(temp, home) => {
                state.set_temp_clone_permanent(true)
            }
            (_, Some(temp)) => state.temporary = decode_address(temp),
        }

        state
    }
}

fn is_clone_of(temp: &Address, home: &Address) -> bool {
    let retagged = Address {
        use_type: home.use_type,
        ..temp.clone()
    };
    retagged == *home
}

// ============================================================================
// Snapshot access (internal)
// ============================================================================

struct SnapshotReader<'a>(&'a FormSnapshot);

impl SnapshotReader<'_> {
    fn field(&self, name: &str) -> EditorResult<&FieldValue> {
        self.0
            .get(name)
            .ok_or_else(|| EditorError::MissingFormField(name.to_string()))
    }

    fn text(&self, name: &str) -> EditorResult<String> {
        match self.field(name)? {
            FieldValue::Text(value) => Ok(value.clone()),
            _ => Err(wrong_kind(name, "text input")),
        }
    }

    fn checked(&self, name: &str) -> EditorResult<bool> {
        match self.field(name)? {
            FieldValue::Checked(value) => Ok(*value),
            _ => Err(wrong_kind(name, "checkbox")),
        }
    }

    fn optional_checked(&self, name: &str, default: bool) -> EditorResult<bool> {
        if self.0.contains_key(name) {
            self.checked(name)
        } else {
            Ok(default)
        }
    }

    /// A select may be reported with its display text or as a bare code.
    fn select(&self, name: &str) -> EditorResult<GeoCoding> {
        match self.field(name)? {
            FieldValue::Select(coding) => Ok(coding.clone()),
            FieldValue::Text(code) => Ok(GeoCoding::new(code.clone(), "")),
            FieldValue::Checked(_) => Err(wrong_kind(name, "select")),
        }
    }

    fn address(&self, names: AddressFieldNames) -> EditorResult<AddressFields> {
        let mut address = AddressFields {
            line: self.text(names.line)?,
            country: self.text(names.country)?,
            ..AddressFields::default()
        };
        for level in GeoLevel::ALL {
            *address.geo.get_mut(level) = self.select(names.geo(level))?;
        }
        Ok(address)
    }
}

fn wrong_kind(field: &str, expected: &'static str) -> EditorError {
    EditorError::WrongFieldKind {
        field: field.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::{encode_address, Patient};

    fn region_one() -> GeoCoding {
        GeoCoding::new("01", "Region I")
    }

    fn filled_form() -> FormState {
        let mut form = FormState::from_document(&Patient::sample(), &EditorConfig::default());
        form.permanent.line = "123 Main".into();
        form.permanent.geo.region = region_one();
        form
    }

    #[test]
    fn age_mode_checkboxes_are_mutually_exclusive() {
        let mut form = FormState::default();
        assert!(form.generate_age_extension());

        form.set_always_derive(true);
        assert!(form.always_derive());
        assert!(!form.generate_age_extension());

        form.set_generate_age_extension(true);
        assert!(form.generate_age_extension());
        assert!(!form.always_derive());

        form.set_generate_age_extension(false);
        assert_eq!(form.age_mode(), AgeExtensionMode::Off);
    }

    #[test]
    fn unchecking_the_inactive_flag_changes_nothing() {
        let mut form = FormState::default();
        form.set_always_derive(false);
        assert!(form.generate_age_extension());
    }

    #[test]
    fn temp_checkboxes_are_mutually_exclusive() {
        let mut form = filled_form();

        form.set_temp_clone_permanent(true);
        assert!(form.temp_clone_permanent());
        assert!(!form.temp_same_as_permanent());

        form.set_temp_same_as_permanent(true);
        assert!(form.temp_same_as_permanent());
        assert!(!form.temp_clone_permanent());

        form.set_temp_same_as_permanent(false);
        assert_eq!(form.temp_mode(), TempAddressMode::OwnFields);
    }

    #[test]
    fn same_as_mirrors_permanent_codes_without_line() {
        let mut form = filled_form();
        form.temporary.line = "Dorm 5".into();
        form.set_temp_same_as_permanent(true);

        assert_eq!(form.temporary.line, "");
        assert_eq!(form.temporary.country, "Philippines");
        assert_eq!(form.temporary.geo.region, region_one());
    }

    #[test]
    fn clone_clears_temporary_fields() {
        let mut form = filled_form();
        form.set_temp_same_as_permanent(false);
        form.temporary.line = "Dorm 5".into();
        form.set_temp_clone_permanent(true);
        assert!(form.temporary.is_empty());
    }

    #[test]
    fn birth_date_locks_while_age_typed() {
        let mut form = FormState::default();
        assert!(!form.birth_date_locked());
        form.age.months = "0".into();
        assert!(form.birth_date_locked());
    }

    #[test]
    fn whitespace_age_does_not_lock_birth_date() {
        let mut form = FormState::default();
        form.age.years = "  ".into();
        form.age.days = "\t".into();
        assert!(!form.birth_date_locked());
        assert!(!crate::mapper::ManualAge::from_fields(&form.age).is_specified());
    }

    #[test]
    fn snapshot_round_trips_form_state() {
        let mut form = filled_form();
        form.set_temp_same_as_permanent(false);
        form.temporary.line = "Dorm 5".into();
        form.temporary.geo.province = GeoCoding::new("0128", "Ilocos Norte");
        form.age.years = "5".into();
        form.set_always_derive(true);

        let restored = FormState::from_snapshot(&form.to_snapshot()).expect("snapshot");
        assert_eq!(restored, form);
    }

    #[test]
    fn missing_required_field_is_a_contract_violation() {
        let mut snapshot = FormState::default().to_snapshot();
        snapshot.remove(fields::FAMILY);
        let err = FormState::from_snapshot(&snapshot).expect_err("missing family");
        assert!(matches!(err, EditorError::MissingFormField(name) if name == "family"));
    }

    #[test]
    fn wrong_field_kind_is_rejected() {
        let mut snapshot = FormState::default().to_snapshot();
        snapshot.insert(fields::TEMP_CLONE_PERM.into(), FieldValue::Text("yes".into()));
        let err = FormState::from_snapshot(&snapshot).expect_err("text checkbox");
        assert!(matches!(err, EditorError::WrongFieldKind { expected: "checkbox", .. }));
    }

    #[test]
    fn age_checkboxes_are_optional() {
        let mut snapshot = FormState::default().to_snapshot();
        snapshot.remove(fields::GENERATE_AGE_EXT);
        snapshot.remove(fields::ALWAYS_GENERATE_AGE_EXT);
        let form = FormState::from_snapshot(&snapshot).expect("snapshot");
        assert!(form.generate_age_extension());
    }

    #[test]
    fn conflicting_flags_resolve_like_initial_render() {
        let mut snapshot = FormState::default().to_snapshot();
        for name in [
            fields::GENERATE_AGE_EXT,
            fields::ALWAYS_GENERATE_AGE_EXT,
            fields::TEMP_SAME_AS_PERM,
            fields::TEMP_CLONE_PERM,
        ] {
            snapshot.insert(name.into(), FieldValue::Checked(true));
        }
        let form = FormState::from_snapshot(&snapshot).expect("snapshot");
        assert_eq!(form.age_mode(), AgeExtensionMode::GenerateWhenUnknown);
        assert_eq!(form.temp_mode(), TempAddressMode::SameAsPermanent);
    }

    #[test]
    fn temp_fields_not_required_when_a_temp_flag_is_set() {
        let mut form = FormState::default();
        form.set_temp_clone_permanent(true);
        let mut snapshot = form.to_snapshot();
        snapshot.remove(AddressFieldNames::TEMPORARY.line);
        snapshot.remove(AddressFieldNames::TEMPORARY.region);
        assert!(FormState::from_snapshot(&snapshot).is_ok());

        snapshot.insert(fields::TEMP_CLONE_PERM.into(), FieldValue::Checked(false));
        let err = FormState::from_snapshot(&snapshot).expect_err("own fields need temp inputs");
        assert!(matches!(err, EditorError::MissingFormField(_)));
    }

    #[test]
    fn select_accepts_bare_code() {
        let mut snapshot = FormState::default().to_snapshot();
        snapshot.insert("permRegion".into(), FieldValue::Text("01".into()));
        let form = FormState::from_snapshot(&snapshot).expect("snapshot");
        assert_eq!(form.permanent.geo.region, GeoCoding::new("01", ""));
    }

    #[test]
    fn snapshot_values_deserialise_by_shape() {
        let json = r#"{"family": "Reyes", "tempSameAsPerm": true, "permRegion": {"code": "01", "display": "Region I"}}"#;
        let snapshot: FormSnapshot = serde_json::from_str(json).expect("snapshot json");
        assert_eq!(snapshot["family"], FieldValue::Text("Reyes".into()));
        assert_eq!(snapshot["tempSameAsPerm"], FieldValue::Checked(true));
        assert_eq!(snapshot["permRegion"], FieldValue::Select(region_one()));
    }

    #[test]
    fn from_sample_document() {
        let form = FormState::from_document(&Patient::sample(), &EditorConfig::default());
        assert_eq!(form.philhealth, "PH1234567890");
        assert_eq!(form.name.family, "Santos");
        assert_eq!(form.name.middle, "Dela Cruz");
        assert_eq!(form.gender, Some(AdministrativeGender::Male));
        assert_eq!(form.birth_date, "1990-05-15");
        assert_eq!(form.permanent.country, "Philippines");
        assert!(form.temp_same_as_permanent());
        assert!(form.generate_age_extension());
        assert!(!form.birth_date_locked());
    }

    #[test]
    fn from_document_detects_cloned_temp_address() {
        let home = encode_address(
            AddressRole::Permanent,
            &AddressFields {
                line: "123 Main".into(),
                country: "Philippines".into(),
                geo: fhir::GeoCodes {
                    region: region_one(),
                    ..Default::default()
                },
            },
        );
        let mut resource = Patient::sample();
        resource.address = vec![
            home.clone(),
            Address {
                use_type: Some(AddressUse::Temp),
                ..home
            },
        ];

        let form = FormState::from_document(&resource, &EditorConfig::default());
        assert!(form.temp_clone_permanent());
        assert!(form.temporary.is_empty());
    }

    #[test]
    fn from_document_reads_distinct_temp_address() {
        let mut resource = Patient::sample();
        resource.address = vec![Address {
            use_type: Some(AddressUse::Temp),
            line: vec!["Dorm 5".into()],
            ..Address::default()
        }];

        let form = FormState::from_document(&resource, &EditorConfig::default());
        assert_eq!(form.temp_mode(), TempAddressMode::OwnFields);
        assert_eq!(form.temporary.line, "Dorm 5");
        assert_eq!(form.permanent.country, "Philippines");
    }
}
