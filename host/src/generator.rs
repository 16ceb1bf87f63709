//! ==============================================================================
//! generator.rs - synthetic reading generator
//! ==============================================================================
//!
//! purpose:
//!     turns a sampled GeoPoint into a Reading by drawing bounded uniform
//!     values for each environmental dimension and stamping the current
//!     wall-clock time in America/New_York.
//!
//! relationships:
//!     - used by: api.rs (once per sampled point)
//!     - produces: domain::Reading
//!
//! ranges (half-open, upper bound excluded):
//!     temperature   16    .. 30
//!     humidity      0.05  .. 0.6
//!     air_quality   0.01  .. 55    (truncated to integer on output)
//!     noise_level   0.01  .. 110   (truncated to integer on output)
//!
//! ==============================================================================

use std::ops::Range;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::America::New_York;
use rand::Rng;

use crate::domain::{GeoPoint, Reading};

pub const TEMPERATURE_RANGE: Range<f64> = 16.0..30.0;
pub const HUMIDITY_RANGE: Range<f64> = 0.05..0.6;
pub const AIR_QUALITY_RANGE: Range<f64> = 0.01..55.0;
pub const NOISE_LEVEL_RANGE: Range<f64> = 0.01..110.0;

/// current local time in the fixed reporting timezone
pub fn local_now() -> NaiveDateTime {
    Utc::now().with_timezone(&New_York).naive_local()
}

/// build a reading for `point` using the given random source
pub fn generate_with<R: Rng>(rng: &mut R, point: &GeoPoint, timestamp: NaiveDateTime) -> Reading {
    Reading::new(
        point.sensor_id.clone(),
        point.longitude,
        point.latitude,
        timestamp,
        rng.gen_range(TEMPERATURE_RANGE),
        rng.gen_range(HUMIDITY_RANGE),
        rng.gen_range(AIR_QUALITY_RANGE),
        rng.gen_range(NOISE_LEVEL_RANGE),
    )
}

/// generate one reading per point, each stamped at its own generation time
pub fn generate_all(points: &[GeoPoint]) -> Vec<Reading> {
    let mut rng = rand::thread_rng();
    points
        .iter()
        .map(|p| generate_with(&mut rng, p, local_now()))
        .collect()
}
