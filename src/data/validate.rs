use crate::data::record::{GeoRecord, RawCoordinate, RawProperty};
use crate::prelude::HashSet;
use crate::{MapError, Result};
use std::fmt;

/// Why a record was left off the map
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    MissingId,
    DuplicateId,
    MissingCoordinates,
    NonNumericCoordinate,
    NonFiniteCoordinate,
    ZeroCoordinate,
    OutOfRange,
    MissingTitle,
    MissingPrice,
    MissingPropertyType,
    Malformed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "missing id"),
            Self::DuplicateId => write!(f, "duplicate id"),
            Self::MissingCoordinates => write!(f, "missing coordinates"),
            Self::NonNumericCoordinate => write!(f, "coordinate is not a number"),
            Self::NonFiniteCoordinate => write!(f, "coordinate is not finite"),
            Self::ZeroCoordinate => write!(f, "coordinate is exactly zero"),
            Self::OutOfRange => write!(f, "coordinate out of range"),
            Self::MissingTitle => write!(f, "missing title"),
            Self::MissingPrice => write!(f, "missing or non-positive price"),
            Self::MissingPropertyType => write!(f, "missing property type"),
            Self::Malformed(msg) => write!(f, "malformed record: {}", msg),
        }
    }
}

/// One dropped record
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Position in the input list
    pub index: usize,
    pub record_id: Option<String>,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub records: Vec<GeoRecord>,
    pub dropped: Vec<Diagnostic>,
}

impl ValidationOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Filters raw listings down to the ones that can be placed on the map.
///
/// Never fails on bad records: each one is dropped with a [`Diagnostic`] and a
/// warning in the log, and an empty result is a valid outcome.
#[derive(Debug, Clone, Default)]
pub struct GeoRecordValidator;

impl GeoRecordValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw: &[RawProperty]) -> ValidationOutcome {
        self.validate_indexed(raw.iter().enumerate().map(|(i, r)| (i, Ok(r))))
    }

    /// Parses a JSON array of listings (or an object with a `properties`
    /// array) one record at a time, so a single malformed entry is dropped
    /// instead of rejecting the whole list.
    pub fn validate_json(&self, json: &str) -> Result<ValidationOutcome> {
        let items = feed_items(json)?;

        let parsed: Vec<std::result::Result<RawProperty, String>> = items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| e.to_string()))
            .collect();

        Ok(self.validate_indexed(
            parsed
                .iter()
                .enumerate()
                .map(|(i, r)| (i, r.as_ref().map_err(Clone::clone))),
        ))
    }

    fn validate_indexed<'a, I>(&self, items: I) -> ValidationOutcome
    where
        I: Iterator<Item = (usize, std::result::Result<&'a RawProperty, String>)>,
    {
        let mut outcome = ValidationOutcome::default();
        let mut seen: HashSet<String> = HashSet::default();

        for (index, item) in items {
            let raw = match item {
                Ok(raw) => raw,
                Err(msg) => {
                    Self::drop_record(&mut outcome, index, None, DropReason::Malformed(msg));
                    continue;
                }
            };

            match Self::check(raw) {
                Ok(record) if !seen.insert(record.id.clone()) => {
                    Self::drop_record(&mut outcome, index, Some(record.id), DropReason::DuplicateId);
                }
                Ok(record) => outcome.records.push(record),
                Err(reason) => Self::drop_record(&mut outcome, index, raw.id.clone(), reason),
            }
        }

        if !outcome.dropped.is_empty() {
            log::info!(
                "validated {} records, dropped {}",
                outcome.records.len(),
                outcome.dropped.len()
            );
        }

        outcome
    }

    fn drop_record(
        outcome: &mut ValidationOutcome,
        index: usize,
        record_id: Option<String>,
        reason: DropReason,
    ) {
        log::warn!(
            "dropping record #{} ({}): {}",
            index,
            record_id.as_deref().unwrap_or("no id"),
            reason
        );
        outcome.dropped.push(Diagnostic {
            index,
            record_id,
            reason,
        });
    }

    fn check(raw: &RawProperty) -> std::result::Result<GeoRecord, DropReason> {
        let id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(DropReason::MissingId)?;

        let coordinates = raw
            .address
            .as_ref()
            .and_then(|a| a.coordinates.as_ref())
            .ok_or(DropReason::MissingCoordinates)?;
        let lat = Self::coordinate(coordinates.lat.as_ref())?;
        let lng = Self::coordinate(coordinates.lng.as_ref())?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(DropReason::OutOfRange);
        }

        let title = raw
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(DropReason::MissingTitle)?;

        let price = raw
            .price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or(DropReason::MissingPrice)?;

        let details = raw.details.as_ref().ok_or(DropReason::MissingPropertyType)?;
        let property_type = details
            .property_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(DropReason::MissingPropertyType)?;

        let address_line = raw
            .address
            .as_ref()
            .map(|a| {
                [a.street.as_deref(), a.city.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|part| !part.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        Ok(GeoRecord {
            id: id.to_string(),
            title: title.to_string(),
            price,
            property_type: property_type.to_string(),
            bedrooms: details.bedrooms.unwrap_or(0),
            bathrooms: details.bathrooms.unwrap_or(0.0),
            area: details.square_footage.unwrap_or(0.0),
            lat,
            lng,
            image_ref: raw.images.first().cloned(),
            address_line,
            status: raw.status.clone(),
        })
    }

    fn coordinate(value: Option<&RawCoordinate>) -> std::result::Result<f64, DropReason> {
        match value {
            None => Err(DropReason::MissingCoordinates),
            Some(RawCoordinate::Number(v)) if !v.is_finite() => {
                Err(DropReason::NonFiniteCoordinate)
            }
            Some(RawCoordinate::Number(v)) if *v == 0.0 => Err(DropReason::ZeroCoordinate),
            Some(RawCoordinate::Number(v)) => Ok(*v),
            Some(_) => Err(DropReason::NonNumericCoordinate),
        }
    }
}

/// Splits a listing feed into its raw entries: either a bare array or an
/// object with a `properties` array.
pub(crate) fn feed_items(json: &str) -> Result<Vec<serde_json::Value>> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    let items = match document {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Object(mut map) => match map.remove("properties") {
            Some(serde_json::Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    };
    items.ok_or_else(|| MapError::ParseError("expected an array of properties".to_string()))
}
