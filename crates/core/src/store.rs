//! The single owned copy of the canonical document.

use fhir::{Patient, PatientResource};

/// Holds the canonical patient document.
///
/// Every change is a whole-document replacement; nothing edits the document in place.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientStore {
    current: PatientResource,
}

impl Default for PatientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientStore {
    /// A store holding the built-in sample document.
    pub fn new() -> Self {
        Self::with_document(Patient::sample())
    }

    pub fn with_document(document: PatientResource) -> Self {
        Self { current: document }
    }

    pub fn current(&self) -> &PatientResource {
        &self.current
    }

    /// Replace the document, returning the one it supersedes.
    pub fn replace(&mut self, document: PatientResource) -> PatientResource {
        std::mem::replace(&mut self.current, document)
    }

    /// Go back to the built-in sample document.
    pub fn reset(&mut self) {
        self.current = Patient::sample();
    }
}
