//! ==============================================================================
//! api.rs - http surface
//! ==============================================================================
//!
//! purpose:
//!     serves GET /api/sensors?count=<n>.
//!
//!     request flow:
//!         parse + validate count  ->  sampler.sample(count)
//!             ->  one synthetic reading per point  ->  success envelope
//!
//!     validation runs before the sampler is touched, so a bad `count`
//!     never acquires a database connection.
//!
//! relationships:
//!     - uses: sampler.rs (PointSampler), generator.rs, domain.rs
//!     - errors rendered by: error.rs
//!     - router built by: main.rs
//!
//! ==============================================================================

use std::num::IntErrorKind;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::SensorsResponse;
use crate::error::{ApiError, ErrorResponse, ValidationError};
use crate::generator;
use crate::sampler::PointSampler;

pub const MIN_COUNT: i64 = 1;
pub const MAX_COUNT: i64 = 10_000;
pub const DEFAULT_COUNT: u32 = 10_000;

// ==============================================================================
// shared state
// ==============================================================================
// the only thing requests share is the sampler (and through it the pool).
// nothing here is mutable.

#[derive(Clone)]
pub struct ApiState {
    pub sampler: Arc<dyn PointSampler>,
}

impl ApiState {
    pub fn new(sampler: Arc<dyn PointSampler>) -> Self {
        Self { sampler }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/sensors", get(sensors_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==============================================================================
// parameters
// ==============================================================================

/// raw query parameters; `count` is parsed by hand so every failure
/// goes through the same error envelope
#[derive(Debug, Default, Deserialize)]
pub struct SensorsParams {
    pub count: Option<String>,
}

/// absent or blank -> default, otherwise an integer within bounds
pub fn parse_count(raw: Option<&str>) -> Result<u32, ValidationError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_COUNT),
        Some(raw) => raw,
    };

    match raw.parse::<i64>() {
        Ok(n) => validate_count(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Err(ValidationError::AboveMaximum),
            IntErrorKind::NegOverflow => Err(ValidationError::BelowMinimum),
            _ => Err(ValidationError::NotAnInteger),
        },
    }
}

pub fn validate_count(count: i64) -> Result<u32, ValidationError> {
    if count < MIN_COUNT {
        return Err(ValidationError::BelowMinimum);
    }
    if count > MAX_COUNT {
        return Err(ValidationError::AboveMaximum);
    }
    // bounds checked above
    Ok(count as u32)
}

// ==============================================================================
// handler
// ==============================================================================

async fn sensors_handler(
    State(state): State<ApiState>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<SensorsParams>, QueryRejection>,
) -> Result<Json<SensorsResponse>, ErrorResponse> {
    let path = uri.path().to_string();

    let count = params
        .map_err(|rejection| ValidationError::MalformedQuery(rejection.body_text()))
        .and_then(|Query(p)| parse_count(p.count.as_deref()))
        .map_err(|e| ApiError::from(e).at(path.as_str()))?;

    let points = state
        .sampler
        .sample(count)
        .await
        .map_err(|e| ApiError::from(e).at(path.as_str()))?;

    let records = generator::generate_all(&points);
    tracing::info!(requested = count, returned = records.len(), "served sensor readings");

    Ok(Json(SensorsResponse::ok(records)))
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoPoint;
    use crate::sampler::SamplerError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    /// in-memory stand-in for the postgis table
    struct FakeSampler {
        points: Vec<GeoPoint>,
        fail: bool,
        calls: Mutex<Vec<u32>>,
    }

    impl FakeSampler {
        fn with_points(n: usize) -> Arc<Self> {
            let points = (0..n)
                .map(|i| GeoPoint {
                    sensor_id: format!("ADDR-{i}"),
                    longitude: -83.0 + i as f64 * 0.001,
                    latitude: 40.0 - i as f64 * 0.001,
                })
                .collect();
            Self::from_points(points)
        }

        fn from_points(points: Vec<GeoPoint>) -> Arc<Self> {
            Arc::new(Self { points, fail: false, calls: Mutex::new(Vec::new()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { points: Vec::new(), fail: true, calls: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PointSampler for FakeSampler {
        async fn sample(&self, limit: u32) -> Result<Vec<GeoPoint>, SamplerError> {
            self.calls.lock().unwrap().push(limit);
            if self.fail {
                return Err(SamplerError::Timeout(Duration::from_millis(5)));
            }
            Ok(self.points.iter().take(limit as usize).cloned().collect())
        }
    }

    async fn get(sampler: Arc<FakeSampler>, uri: &str) -> (StatusCode, Value) {
        let app = router(ApiState::new(sampler));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn records(body: &Value) -> &Vec<Value> {
        body["records"].as_array().unwrap()
    }

    fn assert_bad_request(body: &Value, message: &str) {
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"], message);
        assert_eq!(body["path"], "/api/sensors");
        assert!(body["timestamp"].is_string());
        assert!(body.get("records").is_none());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(None), Ok(10_000));
        assert_eq!(parse_count(Some("")), Ok(10_000));
        assert_eq!(parse_count(Some(" 25 ")), Ok(25));
        assert_eq!(parse_count(Some("1")), Ok(1));
        assert_eq!(parse_count(Some("10000")), Ok(10_000));
        assert_eq!(parse_count(Some("0")), Err(ValidationError::BelowMinimum));
        assert_eq!(parse_count(Some("-3")), Err(ValidationError::BelowMinimum));
        assert_eq!(parse_count(Some("10001")), Err(ValidationError::AboveMaximum));
        assert_eq!(parse_count(Some("99999999999999999999")), Err(ValidationError::AboveMaximum));
        assert_eq!(parse_count(Some("-99999999999999999999")), Err(ValidationError::BelowMinimum));
        assert_eq!(parse_count(Some("ten")), Err(ValidationError::NotAnInteger));
        assert_eq!(parse_count(Some("2.5")), Err(ValidationError::NotAnInteger));
    }

    #[tokio::test]
    async fn test_returns_requested_number_of_readings() {
        let sampler = FakeSampler::with_points(50);
        let (status, body) = get(sampler.clone(), "/api/sensors?count=20").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 200);
        assert_eq!(body["message"], "Successfully retrieved data! Total records: 20");
        assert_eq!(records(&body).len(), 20);
        assert_eq!(sampler.calls(), vec![20]);
    }

    #[tokio::test]
    async fn test_short_sample_reported_truthfully() {
        let sampler = FakeSampler::with_points(3);
        let (status, body) = get(sampler, "/api/sensors?count=500").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully retrieved data! Total records: 3");
        assert_eq!(records(&body).len(), 3);
    }

    #[tokio::test]
    async fn test_empty_sample_is_success() {
        let (status, body) = get(FakeSampler::with_points(0), "/api/sensors?count=5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully retrieved data! Total records: 0");
        assert!(records(&body).is_empty());
    }

    #[tokio::test]
    async fn test_readings_are_anchored_to_sampled_points() {
        let sampler = FakeSampler::with_points(25);
        let (_, body) = get(sampler.clone(), "/api/sensors?count=25").await;

        for r in records(&body) {
            let id = r["sensor_id"].as_str().unwrap();
            let point = sampler.points.iter().find(|p| p.sensor_id == id).unwrap();
            assert!((r["longitude"].as_f64().unwrap() - point.longitude).abs() < 1e-9);
            assert!((r["latitude"].as_f64().unwrap() - point.latitude).abs() < 1e-9);

            let temperature = r["temperature"].as_f64().unwrap();
            let humidity = r["humidity"].as_f64().unwrap();
            let air_quality = r["air_quality"].as_i64().unwrap();
            let noise_level = r["noise_level"].as_i64().unwrap();
            assert!((16.0..30.0).contains(&temperature));
            assert!((0.05..0.6).contains(&humidity));
            assert!((0..=54).contains(&air_quality));
            assert!((0..=109).contains(&noise_level));
            assert!(r["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn test_missing_count_defaults_to_maximum() {
        let sampler = FakeSampler::with_points(10);
        let (status, _) = get(sampler.clone(), "/api/sensors").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(sampler.clone(), "/api/sensors?count=").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(sampler.clone(), "/api/sensors?count=10000").await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(sampler.calls(), vec![10_000, 10_000, 10_000]);
    }

    #[tokio::test]
    async fn test_count_below_minimum_rejected_before_sampling() {
        let sampler = FakeSampler::with_points(10);
        let (status, body) = get(sampler.clone(), "/api/sensors?count=0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_bad_request(&body, "Count must be at least 1");
        assert!(sampler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_count_above_maximum_rejected_before_sampling() {
        let sampler = FakeSampler::with_points(10);
        let (status, body) = get(sampler.clone(), "/api/sensors?count=10001").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_bad_request(&body, "Count must not exceed 10,000");
        assert!(sampler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_integer_count_rejected() {
        let sampler = FakeSampler::with_points(10);
        let (status, body) = get(sampler.clone(), "/api/sensors?count=lots").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_bad_request(&body, "Count must be a valid integer");

        let (status, body) = get(sampler.clone(), "/api/sensors?count=1&count=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(sampler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_data_source_failure_is_server_error() {
        let sampler = FakeSampler::failing();
        let (status, body) = get(sampler.clone(), "/api/sensors?count=10").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], 503);
        assert_eq!(body["error"], "Data source unavailable");
        assert_eq!(body["path"], "/api/sensors");
        assert!(body.get("records").is_none());
        assert!(body.get("message").is_none());
        assert_eq!(sampler.calls(), vec![10]);
    }

    #[tokio::test]
    async fn test_repeated_requests_generate_fresh_values() {
        let sampler = FakeSampler::with_points(20);
        let (_, first) = get(sampler.clone(), "/api/sensors?count=20").await;
        let (_, second) = get(sampler.clone(), "/api/sensors?count=20").await;

        assert_eq!(records(&first).len(), records(&second).len());
        let temps = |body: &Value| -> Vec<f64> {
            records(body).iter().map(|r| r["temperature"].as_f64().unwrap()).collect()
        };
        assert_ne!(temps(&first), temps(&second));
    }

    #[tokio::test]
    async fn test_duplicate_sensor_ids_pass_through() {
        // the sampler gives no uniqueness guarantee and we add none
        let point = GeoPoint { sensor_id: "SAME".to_string(), longitude: -82.9, latitude: 39.9 };
        let sampler = FakeSampler::from_points(vec![point.clone(), point]);
        let (status, body) = get(sampler, "/api/sensors?count=2").await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = records(&body).iter().map(|r| r["sensor_id"].clone()).collect();
        assert_eq!(ids, vec![Value::from("SAME"), Value::from("SAME")]);
    }
}
