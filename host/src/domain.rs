//! ==============================================================================
//! domain.rs - reading model and response envelope
//! ==============================================================================
//!
//! purpose:
//!     the data shapes that flow out of the api:
//!     - GeoPoint: one row sampled from the address point table
//!     - Reading: one synthesized observation anchored to a GeoPoint
//!     - SensorsResponse: the success envelope wrapping a list of readings
//!
//! relationships:
//!     - produced by: sampler.rs (GeoPoint), generator.rs (Reading)
//!     - serialized by: api.rs
//!
//! ==============================================================================

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// a sampled geographic point, already reprojected to wgs84
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct GeoPoint {
    /// identifier column of the backing table, cast to text
    pub sensor_id: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// one synthetic sensor observation
///
/// `air_quality` and `noise_level` are drawn as floats but always exposed
/// as integers, truncated toward zero.
#[derive(Clone, Debug, Serialize)]
pub struct Reading {
    sensor_id: String,
    longitude: f64,
    latitude: f64,
    /// local wall-clock time in America/New_York, no offset
    timestamp: NaiveDateTime,
    temperature: f64,
    humidity: f64,
    #[serde(serialize_with = "serialize_truncated")]
    air_quality: f64,
    #[serde(serialize_with = "serialize_truncated")]
    noise_level: f64,
}

impl Reading {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor_id: String,
        longitude: f64,
        latitude: f64,
        timestamp: NaiveDateTime,
        temperature: f64,
        humidity: f64,
        air_quality: f64,
        noise_level: f64,
    ) -> Self {
        Self {
            sensor_id,
            longitude,
            latitude,
            timestamp,
            temperature,
            humidity,
            air_quality,
            noise_level,
        }
    }
}

#[allow(dead_code)]
impl Reading {
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn air_quality(&self) -> i32 {
        truncate(self.air_quality)
    }

    pub fn noise_level(&self) -> i32 {
        truncate(self.noise_level)
    }
}

// `as` truncates toward zero and saturates at the i32 bounds
fn truncate(value: f64) -> i32 {
    value as i32
}

fn serialize_truncated<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i32(truncate(*value))
}

/// success envelope for GET /api/sensors
#[derive(Debug, Serialize)]
pub struct SensorsResponse {
    pub message: String,
    pub status: u16,
    pub records: Vec<Reading>,
}

impl SensorsResponse {
    pub fn ok(records: Vec<Reading>) -> Self {
        Self {
            message: format!("Successfully retrieved data! Total records: {}", records.len()),
            status: 200,
            records,
        }
    }
}
