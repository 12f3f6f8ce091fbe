use crate::core::geo::LatLng;
use crate::data::validate::feed_items;
use crate::Result;
use serde::{Deserialize, Serialize};

/// A listing as the surrounding application supplies it.
///
/// Everything is optional because the map has to cope with partially filled
/// records; [`crate::data::validate::GeoRecordValidator`] decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProperty {
    pub id: Option<String>,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub address: Option<RawAddress>,
    pub details: Option<RawDetails>,
    pub images: Vec<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub coordinates: Option<RawCoordinates>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCoordinates {
    pub lat: Option<RawCoordinate>,
    pub lng: Option<RawCoordinate>,
}

/// A coordinate component as found in the wild: usually a number, sometimes not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawCoordinate {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDetails {
    pub property_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub bedrooms: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub bathrooms: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub square_footage: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub year_built: Option<u32>,
}

/// Display-only fields: a value of the wrong type reads as missing
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A validated, map-ready listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub property_type: String,
    pub bedrooms: u32,
    pub bathrooms: f64,
    /// Floor area in m²
    pub area: f64,
    pub lat: f64,
    pub lng: f64,
    pub image_ref: Option<String>,
    pub address_line: String,
    pub status: Option<String>,
}

impl GeoRecord {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl RawProperty {
    /// Every well-formed entry of a listing feed; malformed ones are skipped
    /// here and reported by [`GeoRecordValidator::validate_json`].
    ///
    /// [`GeoRecordValidator::validate_json`]: crate::data::validate::GeoRecordValidator::validate_json
    pub fn list_from_json(json: &str) -> Result<Vec<RawProperty>> {
        Ok(feed_items(json)?
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    /// Convenience constructor for the fields the map needs
    pub fn listing(
        id: impl Into<String>,
        title: impl Into<String>,
        price: f64,
        property_type: impl Into<String>,
        lat: f64,
        lng: f64,
    ) -> Self {
        Self {
            id: Some(id.into()),
            title: Some(title.into()),
            price: Some(price),
            address: Some(RawAddress {
                coordinates: Some(RawCoordinates {
                    lat: Some(lat.into()),
                    lng: Some(lng.into()),
                }),
                ..RawAddress::default()
            }),
            details: Some(RawDetails {
                property_type: Some(property_type.into()),
                ..RawDetails::default()
            }),
            ..RawProperty::default()
        }
    }
}
