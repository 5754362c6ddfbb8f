//! Constants used throughout the editor core crate.

/// Resource id used when the prior document carries none.
pub const DEFAULT_RESOURCE_ID: &str = "example";

/// Country pre-filled into the permanent address when the document has none.
pub const DEFAULT_COUNTRY: &str = "Philippines";

/// Prefix of the only user-visible error message.
pub const INVALID_JSON_PREFIX: &str = "Invalid JSON: ";
