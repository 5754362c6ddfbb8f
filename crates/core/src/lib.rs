//! # phedit core
//!
//! Form/JSON synchronisation engine for the patient record editor.
//!
//! This crate contains the rules that turn partial form input into one canonical patient
//! document, and back:
//! - Date/age arithmetic at year, year-month and full-date precision
//! - Form state, the snapshot contract with the renderer, and reconstruction from a document
//! - Derivation of the document from form state (age source, addresses, extension merge)
//! - The synchronisation controller keeping the form and JSON surfaces consistent with the store
//! - The terminology boundary and cascading geographic selects
//!
//! **No rendering or transport concerns**: widgets, HTTP terminology clients and process
//! bootstrap belong to the binaries composing this crate.

pub mod clock;
pub mod config;
pub mod constants;
pub mod dates;
pub mod error;
pub mod form;
pub mod mapper;
pub mod preview;
pub mod store;
pub mod sync;
pub mod terminology;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EditorConfig;
pub use dates::{
    age_from_date, date_from_age, format_date, precision_for, AgePrecision, AgeReading,
    CalendarAge, DatePrecision, PartialDate,
};
pub use error::{EditorError, EditorResult};
pub use form::{
    AgeExtensionMode, AgeFields, FieldValue, FormSnapshot, FormState, TempAddressMode,
};
pub use mapper::{derive_document, AgeSource, DerivedDocument, ManualAge};
pub use preview::age_preview;
pub use store::PatientStore;
pub use sync::{EditOrigin, FormRenderer, SyncController, SyncOutcome};
pub use terminology::{
    parse_child_codes, parse_lookup_display, parse_value_set_expansion, resolve, GeoCascade,
    LevelOptions, PendingLookup, StaticTerminology, TerminologyLookup,
};
