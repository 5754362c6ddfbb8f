//! Identifier and human name codec.
//!
//! Both are direct field mappings: the editor owns exactly one PhilHealth identifier and one
//! official name (family plus up to two given names). Missing input decodes to empty strings.

use crate::constants::PHILHEALTH_SYSTEM;
use crate::patient::{HumanName, Identifier, NameUse, PatientResource};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Flat view of the patient's primary name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NameFields {
    pub family: String,
    /// First given name.
    pub given: String,
    /// Second given name (middle name).
    pub middle: String,
}

/// Encode the PhilHealth number as the resource's identifier.
pub fn encode_identifier(value: &str) -> Identifier {
    let value = value.trim();
    Identifier {
        use_type: Some("usual".to_string()),
        system: Some(PHILHEALTH_SYSTEM.to_string()),
        value: (!value.is_empty()).then(|| value.to_string()),
        other: Map::new(),
    }
}

/// Value of the first identifier, or empty.
pub fn decode_identifier(resource: &PatientResource) -> String {
    resource
        .identifier
        .first()
        .and_then(|i| i.value.clone())
        .unwrap_or_default()
}

/// Encode the name fields as an official human name; empty given names are dropped.
pub fn encode_name(fields: &NameFields) -> HumanName {
    let family = fields.family.trim();
    let given = [fields.given.trim(), fields.middle.trim()]
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();

    HumanName {
        use_type: Some(NameUse::Official),
        family: (!family.is_empty()).then(|| family.to_string()),
        given,
        other: Map::new(),
    }
}

/// Flat fields of the first name entry, or empty.
pub fn decode_name(resource: &PatientResource) -> NameFields {
    // Flat structure extracts only the first name
    let Some(name) = resource.name.first() else {
        return NameFields::default();
    };

    NameFields {
        family: name.family.clone().unwrap_or_default(),
        given: name.given.first().cloned().unwrap_or_default(),
        middle: name.given.get(1).cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Patient;

    #[test]
    fn decodes_sample_identity() {
        let sample = Patient::sample();
        assert_eq!(decode_identifier(&sample), "PH1234567890");
        assert_eq!(
            decode_name(&sample),
            NameFields {
                family: "Santos".into(),
                given: "Juan".into(),
                middle: "Dela Cruz".into(),
            }
        );
    }

    #[test]
    fn empty_identifier_keeps_system_but_no_value() {
        let identifier = encode_identifier("  ");
        assert_eq!(identifier.system.as_deref(), Some(PHILHEALTH_SYSTEM));
        assert!(identifier.value.is_none());
    }

    #[test]
    fn missing_middle_name_is_not_written() {
        let name = encode_name(&NameFields {
            family: "Reyes".into(),
            given: "Maria".into(),
            middle: String::new(),
        });
        assert_eq!(name.given, vec!["Maria"]);
        assert_eq!(name.use_type, Some(NameUse::Official));
    }

    #[test]
    fn middle_name_alone_becomes_first_given() {
        // Given names are positional on the wire; an empty first slot is not kept.
        let name = encode_name(&NameFields {
            middle: "Cruz".into(),
            ..NameFields::default()
        });
        assert_eq!(name.given, vec!["Cruz"]);
        assert!(name.family.is_none());
    }

    #[test]
    fn decodes_missing_name_as_empty() {
        let resource = PatientResource::default();
        assert_eq!(decode_name(&resource), NameFields::default());
        assert_eq!(decode_identifier(&resource), "");
    }
}
