//! Canonical URLs and code systems written into the patient document.
//!
//! Kept in one place so the codec and the editor core always agree on the exact strings
//! used to recognise their own extensions inside hand-edited documents.

/// Resource type every accepted document must declare.
pub const PATIENT_RESOURCE_TYPE: &str = "Patient";

/// Identifier system for the PhilHealth (government health insurance) number.
pub const PHILHEALTH_SYSTEM: &str = "https://philhealth.gov.ph";

/// Code system of the Philippine Standard Geographic Code.
pub const PSGC_SYSTEM: &str = "https://ontoserver.upmsilab.org/psgc";

/// Address extension URL for the region component.
pub const REGION_EXTENSION_URL: &str = "urn://example.com/ph-core/fhir/StructureDefinition/region";

/// Address extension URL for the province component.
pub const PROVINCE_EXTENSION_URL: &str =
    "urn://example.com/ph-core/fhir/StructureDefinition/province";

/// Address extension URL for the city/municipality component.
pub const CITY_MUNICIPALITY_EXTENSION_URL: &str =
    "urn://example.com/ph-core/fhir/StructureDefinition/city-municipality";

/// Address extension URL for the barangay component.
pub const BARANGAY_EXTENSION_URL: &str =
    "urn://example.com/ph-core/fhir/StructureDefinition/barangay";

/// Patient extension URL recording an age entered in place of a birth date.
pub const AGE_AT_ENCOUNTER_URL: &str = "http://example.com/fhir/StructureDefinition/ageAtEncounter";

/// Sub-extension URLs of the age extension.
pub const AGE_YEAR_URL: &str = "AgeYear";
pub const AGE_MONTH_URL: &str = "AgeMonth";
pub const AGE_DAY_URL: &str = "AgeDay";
pub const RECORDED_DATE_URL: &str = "recordedDate";
