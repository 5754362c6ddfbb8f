//! FHIR-aligned patient wire model and JSON translation.
//!
//! This module defines the patient resource exactly as it appears in the editor's JSON
//! surface, plus the operations to parse and render it.
//!
//! Responsibilities:
//! - Define the wire model for serialisation/deserialisation
//! - Parse hand-edited JSON, reporting the failing path on shape errors
//! - Render the resource as 2-space pretty-printed JSON
//! - Provide the built-in sample resource the editor starts from
//!
//! Notes:
//! - Parsing is lossless: members this model does not name are kept in `other` maps and
//!   rendered back, so a hand-edited document survives a trip through the store
//! - Empty strings are never emitted; absent optional values are skipped on output

use crate::constants::{PATIENT_RESOURCE_TYPE, PHILHEALTH_SYSTEM};
use crate::{FhirError, FhirResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

// ============================================================================
// Coded wire values
// ============================================================================

/// Purpose of a human name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameUse {
    /// Official name.
    Official,
    /// Usual/preferred name.
    Usual,
    /// Temporary name.
    Temp,
    /// Nickname or informal name.
    Nickname,
    /// Anonymous name.
    Anonymous,
    /// Old name (no longer in use).
    Old,
    /// Maiden name.
    Maiden,
}

/// Administrative gender. "Unspecified" is the absence of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeGender {
    Female,
    Male,
    Other,
    Unknown,
}

impl AdministrativeGender {
    /// Wire code of this gender.
    pub fn as_code(self) -> &'static str {
        match self {
            AdministrativeGender::Female => "female",
            AdministrativeGender::Male => "male",
            AdministrativeGender::Other => "other",
            AdministrativeGender::Unknown => "unknown",
        }
    }

    /// Parse a wire code; the empty string and unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "female" => Some(AdministrativeGender::Female),
            "male" => Some(AdministrativeGender::Male),
            "other" => Some(AdministrativeGender::Other),
            "unknown" => Some(AdministrativeGender::Unknown),
            _ => None,
        }
    }
}

/// Purpose of an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressUse {
    Home,
    Work,
    Temp,
    Old,
    Billing,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a patient resource.
///
/// Field order matches the order members are written to the JSON surface.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatientResource {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub gender: Option<AdministrativeGender>,

    #[serde(
        rename = "birthDate",
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Wire representation of an identifier.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Identifier {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Wire representation of a human name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct HumanName {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<NameUse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Wire representation of an address.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Address {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<AddressUse>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Wire representation of an extension, simple or complex.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Extension {
    pub url: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(rename = "valueCoding", default, skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,

    #[serde(rename = "valueQuantity", default, skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,

    #[serde(rename = "valueDateTime", default, skip_serializing_if = "Option::is_none")]
    pub value_date_time: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Wire representation of a coding.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Wire representation of a quantity. The number keeps its JSON spelling.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Quantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl PatientResource {
    /// First address carrying the given use, if any.
    pub fn address_with_use(&self, use_type: AddressUse) -> Option<&Address> {
        self.address
            .iter()
            .find(|a| a.use_type == Some(use_type))
    }
}

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// This is a zero-sized type used for namespacing patient-related operations.
/// All methods are associated functions.
pub struct Patient;

impl Patient {
    /// Parse a patient resource from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `name[0].given`)
    /// to the failing member when the JSON is well-formed but does not match the wire model.
    ///
    /// # Arguments
    ///
    /// * `json_text` - JSON text expected to represent a patient resource.
    ///
    /// # Returns
    ///
    /// Returns the parsed [`PatientResource`], including any members the model does not name.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the text is not syntactically valid JSON (`InvalidJson`),
    /// - any member has an unexpected type or code (`Translation`),
    /// - resourceType is not "Patient" (`InvalidInput`).
    pub fn parse(json_text: &str) -> FhirResult<PatientResource> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let wire = match serde_path_to_error::deserialize::<_, PatientResource>(&mut deserializer)
        {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                if !source.is_data() {
                    return Err(FhirError::InvalidJson(source));
                }
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Patient schema mismatch at {path}: {source}"
                )));
            }
        };
        deserializer.end().map_err(FhirError::InvalidJson)?;

        // Validate resourceType
        if wire.resource_type != PATIENT_RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Patient', got '{}'",
                wire.resource_type
            )));
        }

        Ok(wire)
    }

    /// Render a patient resource as JSON text, pretty-printed with 2-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn render(resource: &PatientResource) -> FhirResult<String> {
        serde_json::to_string_pretty(resource)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise patient: {e}")))
    }

    /// The built-in sample patient the editor opens with.
    pub fn sample() -> PatientResource {
        PatientResource {
            resource_type: PATIENT_RESOURCE_TYPE.to_string(),
            id: Some("example".to_string()),
            identifier: vec![Identifier {
                use_type: Some("usual".to_string()),
                system: Some(PHILHEALTH_SYSTEM.to_string()),
                value: Some("PH1234567890".to_string()),
                other: Map::new(),
            }],
            name: vec![HumanName {
                use_type: Some(NameUse::Official),
                family: Some("Santos".to_string()),
                given: vec!["Juan".to_string(), "Dela Cruz".to_string()],
                other: Map::new(),
            }],
            gender: Some(AdministrativeGender::Male),
            birth_date: Some("1990-05-15".to_string()),
            address: Vec::new(),
            extension: Vec::new(),
            other: Map::new(),
        }
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

/// Treat `""` the same as an absent member.
///
/// Earlier exports of the editor wrote `"gender": ""` and `"birthDate": ""`; those documents
/// must still load.
fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
