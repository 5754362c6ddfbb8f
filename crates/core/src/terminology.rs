//! Geographic terminology lookups and the cascading address selects.
//!
//! The terminology collaborator resolves PSGC codes: the top-level regions come from a ValueSet
//! `$expand`, and the children of any code come from CodeSystem `$lookup` with
//! `property=child`, each child's display from a further `$lookup`. Every failure at this
//! boundary degrades to an empty option list; nothing here ever fails a document edit.
//!
//! [`GeoCascade`] models the four selects of one address block. Selecting a level clears
//! everything below it and yields a [`PendingLookup`] for the next level. Applying a completed
//! lookup is unconditional: a slow lookup for an earlier selection can still land after a newer
//! one and populate its level.

use crate::{EditorError, EditorResult};
use async_trait::async_trait;
use fhir::{AddressRole, GeoCodes, GeoCoding, GeoLevel};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Asynchronous source of geographic codes.
///
/// Implementations return an empty list on any transport or payload error.
#[async_trait]
pub trait TerminologyLookup: Send + Sync {
    /// All top-level (region) codes.
    async fn expand_top_level(&self) -> Vec<GeoCoding>;

    /// Direct children of `code`.
    async fn lookup_children(&self, code: &str) -> Vec<GeoCoding>;
}

// ============================================================================
// Server payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct ValueSet {
    expansion: Option<ValueSetExpansion>,
}

#[derive(Debug, Deserialize)]
struct ValueSetExpansion {
    contains: Option<Vec<ValueSetContains>>,
}

#[derive(Debug, Deserialize)]
struct ValueSetContains {
    code: Option<String>,
    display: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Parameters {
    #[serde(default)]
    parameter: Vec<Parameter>,
}

#[derive(Debug, Deserialize)]
struct Parameter {
    name: String,
    #[serde(rename = "valueString")]
    value_string: Option<String>,
    #[serde(rename = "valueCode")]
    value_code: Option<String>,
    #[serde(default)]
    part: Vec<Parameter>,
}

/// Codes listed in a ValueSet `$expand` response.
///
/// A response without `expansion.contains` is malformed and yields no codes.
pub fn parse_value_set_expansion(payload: &Value) -> Vec<GeoCoding> {
    let contains = ValueSet::deserialize(payload)
        .ok()
        .and_then(|vs| vs.expansion)
        .and_then(|expansion| expansion.contains);

    let Some(contains) = contains else {
        tracing::warn!("malformed ValueSet expansion, no codes loaded");
        return Vec::new();
    };

    contains
        .into_iter()
        .filter_map(|c| {
            let code = c.code?;
            let display = c.display.unwrap_or_else(|| code.clone());
            Some(GeoCoding::new(code, display))
        })
        .collect()
}

/// Child codes listed in a CodeSystem `$lookup` response requested with `property=child`.
pub fn parse_child_codes(payload: &Value) -> Vec<String> {
    let Ok(parameters) = Parameters::deserialize(payload) else {
        tracing::warn!("malformed $lookup response, no children loaded");
        return Vec::new();
    };

    parameters
        .parameter
        .into_iter()
        .filter(|p| p.name == "property")
        .filter(|p| {
            p.part
                .iter()
                .any(|part| part.name == "code" && part.value_code.as_deref() == Some("child"))
        })
        .filter_map(|p| {
            p.part
                .into_iter()
                .find(|part| part.name == "value")
                .and_then(|part| part.value_code)
        })
        .collect()
}

/// The `display` of a CodeSystem `$lookup` response.
pub fn parse_lookup_display(payload: &Value) -> Option<String> {
    Parameters::deserialize(payload)
        .ok()?
        .parameter
        .into_iter()
        .find(|p| p.name == "display")
        .and_then(|p| p.value_string)
}

// ============================================================================
// In-memory terminology
// ============================================================================

/// Recorded server responses, keyed the way they were requested.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TerminologyFixture {
    /// The regions ValueSet `$expand` response.
    expand: Value,
    /// `$lookup` `property=child` responses by parent code.
    children: BTreeMap<String, Value>,
    /// `$lookup` responses by code, used for child displays.
    lookups: BTreeMap<String, Value>,
}

/// A terminology source answering from memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticTerminology {
    regions: Vec<GeoCoding>,
    children: BTreeMap<String, Vec<GeoCoding>>,
}

impl StaticTerminology {
    pub fn new(regions: Vec<GeoCoding>, children: BTreeMap<String, Vec<GeoCoding>>) -> Self {
        Self { regions, children }
    }

    /// Build from a fixture of recorded server responses.
    ///
    /// The fixture is a JSON object with an `expand` member (the regions `$expand` response),
    /// a `children` object mapping parent codes to their `$lookup` `property=child` response,
    /// and a `lookups` object mapping codes to their `$lookup` response. A child with no
    /// recorded lookup is displayed by its code.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::TerminologyFixture`] if the text is not a fixture object.
    pub fn from_fixture_str(json_text: &str) -> EditorResult<Self> {
        let fixture: TerminologyFixture =
            serde_json::from_str(json_text).map_err(EditorError::TerminologyFixture)?;

        let regions = if fixture.expand.is_null() {
            Vec::new()
        } else {
            parse_value_set_expansion(&fixture.expand)
        };

        let children = fixture
            .children
            .iter()
            .map(|(parent, payload)| {
                let codings = parse_child_codes(payload)
                    .into_iter()
                    .map(|code| {
                        let display = fixture
                            .lookups
                            .get(&code)
                            .and_then(parse_lookup_display)
                            .unwrap_or_else(|| code.clone());
                        GeoCoding::new(code, display)
                    })
                    .collect();
                (parent.clone(), codings)
            })
            .collect();

        Ok(Self::new(regions, children))
    }
}

#[async_trait]
impl TerminologyLookup for StaticTerminology {
    async fn expand_top_level(&self) -> Vec<GeoCoding> {
        self.regions.clone()
    }

    async fn lookup_children(&self, code: &str) -> Vec<GeoCoding> {
        match self.children.get(code) {
            Some(children) => children.clone(),
            None => {
                tracing::debug!(code, "no children recorded");
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Cascading selects
// ============================================================================

/// Options of one select.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LevelOptions {
    /// No lookup has completed for this level since it was last cleared.
    #[default]
    NotRequested,
    /// A lookup completed; the list may be empty.
    Loaded(Vec<GeoCoding>),
}

impl LevelOptions {
    pub fn as_slice(&self) -> &[GeoCoding] {
        match self {
            LevelOptions::NotRequested => &[],
            LevelOptions::Loaded(options) => options,
        }
    }
}

/// A lookup the cascade is waiting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLookup {
    pub role: AddressRole,
    /// Level the results populate.
    pub target: GeoLevel,
    /// Parent code whose children are wanted; `None` for the top-level regions.
    pub parent_code: Option<String>,
}

/// The four cascading selects of one address block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoCascade {
    role: AddressRole,
    options: [LevelOptions; 4],
    selected: GeoCodes,
}

impl GeoCascade {
    pub fn new(role: AddressRole) -> Self {
        Self {
            role,
            options: Default::default(),
            selected: GeoCodes::default(),
        }
    }

    pub fn options(&self, level: GeoLevel) -> &LevelOptions {
        &self.options[level as usize]
    }

    pub fn selected(&self) -> &GeoCodes {
        &self.selected
    }

    /// Start from a loaded document's selections; no options are loaded yet.
    pub fn seed(&mut self, geo: &GeoCodes) {
        self.selected = geo.clone();
        self.options = Default::default();
    }

    /// Regions load lazily the first time the region select is opened.
    ///
    /// Returns `None` once a non-empty region list has been applied; an empty result is
    /// requested again on the next opening.
    pub fn request_regions(&self) -> Option<PendingLookup> {
        let loaded = matches!(
            self.options(GeoLevel::Region),
            LevelOptions::Loaded(regions) if !regions.is_empty()
        );
        (!loaded).then(|| PendingLookup {
            role: self.role,
            target: GeoLevel::Region,
            parent_code: None,
        })
    }

    /// Select `coding` at `level`.
    ///
    /// Every lower level loses its selection and options. Returns the lookup for the next
    /// level down when something was actually selected.
    pub fn select(&mut self, level: GeoLevel, coding: GeoCoding) -> Option<PendingLookup> {
        self.clear_below(level);
        let pending = coding
            .is_selected()
            .then(|| level.child())
            .flatten()
            .map(|target| PendingLookup {
                role: self.role,
                target,
                parent_code: Some(coding.code.clone()),
            });
        *self.selected.get_mut(level) = coding;
        pending
    }

    /// Populate the lookup's target level with `options`.
    ///
    /// Selections are never touched: a stored code stays selected whether or not it is listed,
    /// and an empty (failed) lookup only leaves the select empty. No check is made that the
    /// lookup is still current.
    pub fn apply(&mut self, lookup: &PendingLookup, options: Vec<GeoCoding>) {
        self.options[lookup.target as usize] = LevelOptions::Loaded(options);
    }

    /// Mirror selections made outside the cascade; loaded options are kept.
    pub fn set_selected(&mut self, geo: &GeoCodes) {
        self.selected = geo.clone();
    }

    fn clear_below(&mut self, level: GeoLevel) {
        let mut next = level.child();
        while let Some(lower) = next {
            *self.selected.get_mut(lower) = GeoCoding::default();
            self.options[lower as usize] = LevelOptions::NotRequested;
            next = lower.child();
        }
    }
}

/// Run a pending lookup against `terminology`.
pub async fn resolve(
    terminology: &dyn TerminologyLookup,
    lookup: &PendingLookup,
) -> Vec<GeoCoding> {
    let options = match &lookup.parent_code {
        None => terminology.expand_top_level().await,
        Some(code) => terminology.lookup_children(code).await,
    };
    if options.is_empty() {
        tracing::warn!(?lookup, "terminology lookup returned no options");
    }
    options
}
