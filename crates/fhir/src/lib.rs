//! FHIR wire/boundary support for the patient record editor.
//!
//! This crate provides the **wire model** of the PH Core aligned `Patient` resource and the
//! **document codec** that moves flat editor field values in and out of its nested structures:
//! - JSON parse/render (the editor's text surface is the pretty-printed resource)
//! - identifier and human name mapping
//! - addresses carrying PSGC geographic-code extensions
//! - the `ageAtEncounter` extension recording a manually entered age
//!
//! This crate focuses on:
//! - FHIR semantic alignment of the exchanged document
//! - lossless serialisation/deserialisation of hand-edited JSON
//! - translation between flat field values and the wire structs
//!
//! It knows nothing about forms, checkboxes or dates relative to "today"; those rules live in
//! `phedit-core`.

pub mod address;
pub mod age_extension;
pub mod constants;
pub mod identity;
pub mod patient;

// Re-export facades
pub use patient::Patient;

// Re-export public wire and codec types
pub use address::{
    decode_address, encode_address, AddressFields, AddressRole, GeoCodes, GeoCoding, GeoLevel,
};
pub use age_extension::{
    build_age_extension, find_age_extension, is_age_extension, read_age_extension,
    recorded_date, AgeComponents,
};
pub use identity::{decode_identifier, decode_name, encode_identifier, encode_name, NameFields};
pub use patient::{
    Address, AddressUse, AdministrativeGender, Coding, Extension, HumanName, Identifier, NameUse,
    PatientResource, Quantity,
};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
