use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

use crate::model::{VesselCategory, VesselRecord};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Geographic rectangle in degrees. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.south <= latitude
            && latitude <= self.north
            && self.west <= longitude
            && longitude <= self.east
    }
}

/// Caller-supplied filters. A `None` dimension imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    pub bounding_box: Option<BoundingBox>,
    pub vessel_types: Option<HashSet<VesselCategory>>,
    pub recency_window_hours: Option<f64>,
}

/// Why a decoded record was not stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    InvalidCoordinates { latitude: f64, longitude: f64 },
    OutsideBoundingBox,
    VesselTypeExcluded(VesselCategory),
    TooOld,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InvalidCoordinates {
                latitude,
                longitude,
            } => write!(f, "invalid coordinates ({latitude}, {longitude})"),
            Rejection::OutsideBoundingBox => f.write_str("outside bounding box"),
            Rejection::VesselTypeExcluded(c) => write!(f, "vessel type {c} not selected"),
            Rejection::TooOld => f.write_str("older than recency window"),
        }
    }
}

impl FilterConfig {
    /// Accept or reject a record. Filters are conjunctive.
    ///
    /// The coordinate check runs regardless of configuration.
    pub fn validate(&self, record: &VesselRecord, now: DateTime<Utc>) -> Result<(), Rejection> {
        if !record.has_valid_position() {
            return Err(Rejection::InvalidCoordinates {
                latitude: record.latitude,
                longitude: record.longitude,
            });
        }

        if let Some(bbox) = &self.bounding_box {
            if !bbox.contains(record.latitude, record.longitude) {
                return Err(Rejection::OutsideBoundingBox);
            }
        }

        if let Some(types) = &self.vessel_types {
            if !types.is_empty() && !types.contains(&record.vessel_type_category) {
                return Err(Rejection::VesselTypeExcluded(record.vessel_type_category));
            }
        }

        // Compared as an age so no cutoff instant has to be representable.
        if let Some(hours) = self.recency_window_hours {
            let age = now.signed_duration_since(record.timestamp);
            if age.num_milliseconds() as f64 > hours * MILLIS_PER_HOUR {
                return Err(Rejection::TooOld);
            }
        }

        Ok(())
    }
}
