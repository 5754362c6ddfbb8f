//! Address codec with PSGC geographic-code extensions.
//!
//! A PH Core address carries its administrative divisions as extensions on the address,
//! one per division, each holding a `valueCoding` from the PSGC code system:
//!
//! ```text
//! region > province > city/municipality > barangay
//! ```
//!
//! Components with an empty code are not written at all, and the written order is always the
//! hierarchy order above. No parent/child consistency is enforced: codes are trusted as
//! supplied by the terminology source.

use crate::constants::{
    BARANGAY_EXTENSION_URL, CITY_MUNICIPALITY_EXTENSION_URL, PROVINCE_EXTENSION_URL,
    PSGC_SYSTEM, REGION_EXTENSION_URL,
};
use crate::patient::{Address, AddressUse, Coding, Extension};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Role of an address within the patient record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressRole {
    Permanent,
    Temporary,
}

impl AddressRole {
    /// FHIR `Address.use` this role is written as.
    pub fn address_use(self) -> AddressUse {
        match self {
            AddressRole::Permanent => AddressUse::Home,
            AddressRole::Temporary => AddressUse::Temp,
        }
    }
}

/// One level of the PSGC hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoLevel {
    Region,
    Province,
    CityMunicipality,
    Barangay,
}

impl GeoLevel {
    /// All levels, parent first.
    pub const ALL: [GeoLevel; 4] = [
        GeoLevel::Region,
        GeoLevel::Province,
        GeoLevel::CityMunicipality,
        GeoLevel::Barangay,
    ];

    pub fn extension_url(self) -> &'static str {
        match self {
            GeoLevel::Region => REGION_EXTENSION_URL,
            GeoLevel::Province => PROVINCE_EXTENSION_URL,
            GeoLevel::CityMunicipality => CITY_MUNICIPALITY_EXTENSION_URL,
            GeoLevel::Barangay => BARANGAY_EXTENSION_URL,
        }
    }

    /// The level directly below this one.
    pub fn child(self) -> Option<GeoLevel> {
        match self {
            GeoLevel::Region => Some(GeoLevel::Province),
            GeoLevel::Province => Some(GeoLevel::CityMunicipality),
            GeoLevel::CityMunicipality => Some(GeoLevel::Barangay),
            GeoLevel::Barangay => None,
        }
    }
}

/// A geographic code with its human display label. An empty code means "not selected".
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoCoding {
    pub code: String,
    pub display: String,
}

impl GeoCoding {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display: display.into(),
        }
    }

    pub fn is_selected(&self) -> bool {
        !self.code.is_empty()
    }
}

/// The four geographic components of one address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoCodes {
    pub region: GeoCoding,
    pub province: GeoCoding,
    pub city_municipality: GeoCoding,
    pub barangay: GeoCoding,
}

impl GeoCodes {
    pub fn get(&self, level: GeoLevel) -> &GeoCoding {
        match level {
            GeoLevel::Region => &self.region,
            GeoLevel::Province => &self.province,
            GeoLevel::CityMunicipality => &self.city_municipality,
            GeoLevel::Barangay => &self.barangay,
        }
    }

    pub fn get_mut(&mut self, level: GeoLevel) -> &mut GeoCoding {
        match level {
            GeoLevel::Region => &mut self.region,
            GeoLevel::Province => &mut self.province,
            GeoLevel::CityMunicipality => &mut self.city_municipality,
            GeoLevel::Barangay => &mut self.barangay,
        }
    }
}

/// Flat, form-shaped view of one address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressFields {
    /// Free-text line; comma separated parts become separate `Address.line` entries.
    pub line: String,
    pub country: String,
    pub geo: GeoCodes,
}

impl AddressFields {
    pub fn is_empty(&self) -> bool {
        *self == AddressFields::default()
    }
}

/// Encode flat address fields into a wire address tagged with `role`.
///
/// Geographic components with an empty code are omitted entirely. Components are written in
/// hierarchy order regardless of how they were filled in.
pub fn encode_address(role: AddressRole, fields: &AddressFields) -> Address {
    let line = fields
        .line
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();

    let country = fields.country.trim();

    let extension = GeoLevel::ALL
        .iter()
        .filter_map(|&level| {
            let coding = fields.geo.get(level);
            coding.is_selected().then(|| geo_extension(level, coding))
        })
        .collect();

    Address {
        use_type: Some(role.address_use()),
        line,
        country: (!country.is_empty()).then(|| country.to_string()),
        extension,
        other: Map::new(),
    }
}

/// Decode a wire address into flat fields; missing components become empty code/display.
pub fn decode_address(address: &Address) -> AddressFields {
    let mut geo = GeoCodes::default();
    for level in GeoLevel::ALL {
        let coding = address
            .extension
            .iter()
            .find(|ext| ext.url == level.extension_url())
            .and_then(|ext| ext.value_coding.as_ref());
        if let Some(coding) = coding {
            *geo.get_mut(level) = GeoCoding {
                code: coding.code.clone().unwrap_or_default(),
                display: coding.display.clone().unwrap_or_default(),
            };
        }
    }

    AddressFields {
        line: address.line.join(", "),
        country: address.country.clone().unwrap_or_default(),
        geo,
    }
}

fn geo_extension(level: GeoLevel, coding: &GeoCoding) -> Extension {
    Extension {
        url: level.extension_url().to_string(),
        value_coding: Some(Coding {
            system: Some(PSGC_SYSTEM.to_string()),
            code: Some(coding.code.clone()),
            display: (!coding.display.is_empty()).then(|| coding.display.clone()),
            other: Map::new(),
        }),
        ..Extension::default()
    }
}
