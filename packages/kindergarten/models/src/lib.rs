#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Kindergarten record types shared across the preschool services.
//!
//! A [`KindergartenRecord`] is the raw stored document. Everything the
//! services compute from it ([`KindergartenView`], [`MunicipalityAggregate`])
//! is derived fresh on every read and never persisted.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Occupancy ratio at or above which a kindergarten is flagged critical.
pub const CRITICAL_OCCUPANCY: f64 = 0.90;

/// Bucket name for records that carry no municipality.
pub const UNKNOWN_MUNICIPALITY: &str = "Unknown";

/// Ownership type of a kindergarten.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KindergartenType {
    /// Publicly funded.
    State,
    /// Privately run.
    Private,
}

impl KindergartenType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::State, Self::Private]
    }
}

/// A kindergarten as stored in the record store.
///
/// `enrolled` may exceed `max_capacity`; over-enrollment is a real,
/// reportable condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindergartenRecord {
    /// Opaque record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Ownership type.
    #[serde(rename = "type")]
    pub kind: KindergartenType,
    /// City the kindergarten is located in.
    pub city: String,
    /// Municipality used for aggregation. May be empty.
    pub municipality: String,
    /// Maximum number of enrolled children.
    pub max_capacity: i64,
    /// Number of currently enrolled children.
    pub enrolled: i64,
}

/// A [`KindergartenRecord`] together with its derived capacity figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindergartenView {
    /// The underlying record.
    #[serde(flatten)]
    pub record: KindergartenRecord,
    /// `enrolled / max_capacity`, or 0 when capacity is not positive.
    pub occupancy: f64,
    /// `max_capacity - enrolled` (negative when over-enrolled), or 0 when
    /// capacity is not positive.
    pub free_seats: i64,
    /// Whether occupancy reached [`CRITICAL_OCCUPANCY`].
    pub critical: bool,
}

/// Summed capacity figures for every kindergarten in one municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityAggregate {
    /// Municipality name ([`UNKNOWN_MUNICIPALITY`] for records without one).
    pub municipality: String,
    /// Number of kindergartens in the municipality.
    pub kindergarten_count: u64,
    /// Sum of `max_capacity`.
    pub total_capacity: i64,
    /// Sum of `enrolled`.
    pub total_enrolled: i64,
    /// `total_enrolled / total_capacity`, or 0 when capacity is not positive.
    pub occupancy: f64,
}

/// Errors produced when validating a [`KindergartenInput`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The name was empty or whitespace.
    #[error("name is required")]
    MissingName,

    /// The type was empty or missing.
    #[error("type is required")]
    MissingType,

    /// The type did not match a known [`KindergartenType`].
    #[error("invalid type '{value}' (expected state or private)")]
    InvalidType {
        /// The rejected value.
        value: String,
    },

    /// Capacity must be strictly positive for a stored record.
    #[error("max capacity must be > 0, got {value}")]
    NonPositiveCapacity {
        /// The rejected value.
        value: i64,
    },

    /// Enrollment cannot be negative.
    #[error("enrolled must be >= 0, got {value}")]
    NegativeEnrollment {
        /// The rejected value.
        value: i64,
    },
}

/// Unvalidated create/update payload for a kindergarten.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindergartenInput {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Ownership type as free text (`"state"` or `"private"`).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// City.
    #[serde(default)]
    pub city: String,
    /// Municipality.
    #[serde(default)]
    pub municipality: String,
    /// Maximum capacity.
    #[serde(default)]
    pub max_capacity: i64,
    /// Current enrollment.
    #[serde(default)]
    pub enrolled: i64,
}

/// A validated kindergarten that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKindergarten {
    /// Display name (trimmed).
    pub name: String,
    /// Ownership type.
    pub kind: KindergartenType,
    /// City (trimmed).
    pub city: String,
    /// Municipality (trimmed).
    pub municipality: String,
    /// Maximum capacity, always positive.
    pub max_capacity: i64,
    /// Current enrollment, never negative.
    pub enrolled: i64,
}

impl KindergartenInput {
    /// Validates the payload.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered, checked in field
    /// order: name, type, capacity, enrollment.
    pub fn validate(self) -> Result<NewKindergarten, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => return Err(ValidationError::MissingType),
            Some(raw) => raw
                .to_lowercase()
                .parse::<KindergartenType>()
                .map_err(|_| ValidationError::InvalidType {
                    value: raw.to_string(),
                })?,
        };

        if self.max_capacity <= 0 {
            return Err(ValidationError::NonPositiveCapacity {
                value: self.max_capacity,
            });
        }
        if self.enrolled < 0 {
            return Err(ValidationError::NegativeEnrollment {
                value: self.enrolled,
            });
        }

        Ok(NewKindergarten {
            name: name.to_string(),
            kind,
            city: self.city.trim().to_string(),
            municipality: self.municipality.trim().to_string(),
            max_capacity: self.max_capacity,
            enrolled: self.enrolled,
        })
    }
}

impl NewKindergarten {
    /// Attaches an id, producing a storable record.
    #[must_use]
    pub fn into_record(self, id: String) -> KindergartenRecord {
        KindergartenRecord {
            id,
            name: self.name,
            kind: self.kind,
            city: self.city,
            municipality: self.municipality,
            max_capacity: self.max_capacity,
            enrolled: self.enrolled,
        }
    }
}
