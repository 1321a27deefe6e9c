//! Router assembly: routes, body limits, CORS and request tracing.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Request, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use venomx_config::CorsOrigins;

use crate::handlers;
use crate::state::AppState;

/// Room for multipart headers and the threshold field on top of the image.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    let body_limit = state.settings.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/snake-id", post(handlers::snake_id::identify))
        .route("/antivenom/finder", post(handlers::antivenom::finder))
        .route("/antivenom/facilities", post(handlers::antivenom::facilities))
        .route("/antivenom/route", get(handlers::antivenom::route))
        .route("/snakes", get(handlers::snakes::list))
        .route("/snakes/with-antivenom", get(handlers::snakes::with_antivenom))
        .route("/snakes/medically-significant", get(handlers::snakes::medically_significant))
        .route("/snakes/{scientific_name}", get(handlers::snakes::get))
        .route("/models/info", get(handlers::models::info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::{header, StatusCode};
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use venomx_config::Settings;
    use venomx_core::{Coordinate, RouteSummary};
    use venomx_routing::{DisabledRouter, RoutingError, RoutingProvider};
    use venomx_store::{SeedData, VenomStore};
    use venomx_vision::{
        BoundingBox, Classification, Detection, Identification, ModelInfo, Prediction,
        SpeciesIdentifier, VisionError,
    };

    const SEED: &str = include_str!("../../../data/seed.json");
    const BOUNDARY: &str = "venomx-test-boundary";

    struct StubIdentifier {
        outcome: Identification,
        delay: Duration,
        calls: AtomicUsize,
        saw_file: Mutex<Option<bool>>,
    }

    impl StubIdentifier {
        fn new(outcome: Identification) -> Self {
            Self {
                outcome,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                saw_file: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SpeciesIdentifier for StubIdentifier {
        fn identify(&self, image_path: &Path, _threshold: f32) -> Result<Identification, VisionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.saw_file.lock().unwrap() = Some(image_path.exists());
            std::thread::sleep(self.delay);
            Ok(self.outcome.clone())
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                detection_model: "stub-detector.onnx".into(),
                detection_input_size: 640,
                oriented_boxes: false,
                classification_model: "stub-classifier.onnx".into(),
                classification_input_size: 224,
                num_classes: 10,
            }
        }
    }

    struct FixedRouter;

    #[async_trait]
    impl RoutingProvider for FixedRouter {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn route(&self, _from: Coordinate, _to: Coordinate) -> Result<RouteSummary, RoutingError> {
            Ok(RouteSummary::from_meters_seconds(3100.0, 480.0))
        }
    }

    struct Harness {
        app: Router,
        identifier: Arc<StubIdentifier>,
        temp_dir: TempDir,
    }

    impl Harness {
        fn uploads_left(&self) -> usize {
            let uploads = self.temp_dir.path().join("uploads");
            match fs::read_dir(&uploads) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }
    }

    fn build(identifier: StubIdentifier, routing: Arc<dyn RoutingProvider>, inference_timeout: Duration) -> Harness {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            temp_dir: temp_dir.path().join("uploads"),
            osrm_base_url: None,
            inference_timeout,
            ..Settings::default()
        };

        let store = VenomStore::in_memory().unwrap();
        let seed: SeedData = serde_json::from_str(SEED).unwrap();
        store.seed(&seed).unwrap();

        let identifier = Arc::new(identifier);
        let state = AppState::new(settings, store, identifier.clone(), routing);
        Harness {
            app: router(Arc::new(state)),
            identifier,
            temp_dir,
        }
    }

    fn harness(outcome: Identification) -> Harness {
        build(StubIdentifier::new(outcome), Arc::new(DisabledRouter), Duration::from_secs(30))
    }

    fn no_snake() -> Identification {
        Identification::NoDetection { best_confidence: Some(0.2) }
    }

    fn naja_detected(confidence: f32) -> Identification {
        Identification::Detected {
            detection: Detection {
                confidence: 0.88,
                class_id: 0,
                bounding_box: BoundingBox { x1: 10.0, y1: 12.0, x2: 60.0, y2: 40.0 },
                oriented_box: None,
            },
            classification: Classification {
                label: "Naja Naja".into(),
                class_index: 3,
                confidence,
                predictions: vec![
                    Prediction { label: "Naja Naja".into(), confidence },
                    Prediction { label: "Naja Philippinensis".into(), confidence: 1.0 - confidence },
                    Prediction { label: "Garden Hose".into(), confidence: 0.0 },
                ],
            },
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(file_name: &str, bytes: &[u8], threshold: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(t) = threshold {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"confidence_threshold\"\r\n\r\n{t}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/snake-id")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(32, 32, Rgb([90, 120, 40]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn manila_search(extra: Value) -> Value {
        let mut body = json!({
            "user_latitude": 14.5995,
            "user_longitude": 120.9842,
            "max_distance_km": 100.0
        });
        if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        body
    }

    // === Health & metadata ===

    #[tokio::test]
    async fn test_health() {
        let h = harness(no_snake());
        let (status, body) = send(&h.app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "venomx");
    }

    #[tokio::test]
    async fn test_models_info() {
        let h = harness(no_snake());
        let (status, body) = send(&h.app, get_req("/models/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["models"]["num_classes"], 10);
        assert_eq!(body["allowed_extensions"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_router_builds_with_unbounded_upload_limit() {
        let settings = Settings {
            max_upload_bytes: usize::MAX,
            ..Settings::default()
        };
        let state = AppState::new(
            settings,
            VenomStore::in_memory().unwrap(),
            Arc::new(StubIdentifier::new(no_snake())),
            Arc::new(DisabledRouter),
        );
        let app = router(Arc::new(state));
        let (status, _) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    // === Snake identification ===

    #[tokio::test]
    async fn test_snake_id_identifies_known_species() {
        let h = harness(naja_detected(0.95));
        let (status, body) = send(&h.app, multipart("cobra.png", &png_bytes(), Some("0.5"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["scientific_name"], "Naja naja");
        assert_eq!(body["species"], "Indian Cobra");
        assert_eq!(body["danger_level"], "Highly Venomous");
        assert_eq!(body["bounding_box"]["x2"], 60.0);
        assert_eq!(body["image_url"], "/static/snakes/naja_naja.jpg");
        assert!(body["recommendation"].is_string());

        let predictions = body["predictions"].as_array().unwrap();
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0]["scientific_name"], "Naja naja");
        assert_eq!(predictions[1]["label"], "Naja Philippinensis");
        assert_eq!(predictions[1]["scientific_name"], "Naja philippinensis");
        assert_eq!(predictions[1]["image_url"], "/static/snakes/naja_philippinensis.jpg");
        assert!(predictions[2].get("scientific_name").is_none());
        assert!(predictions[2].get("image_url").is_none());

        assert_eq!(h.identifier.calls(), 1);
        assert_eq!(*h.identifier.saw_file.lock().unwrap(), Some(true));
        assert_eq!(h.uploads_left(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_low_classification_is_unknown_species() {
        let h = harness(naja_detected(0.6));
        let (status, body) = send(&h.app, multipart("cobra.jpg", &png_bytes(), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["species"], "Unknown species");
        assert!(body.get("scientific_name").is_none());
        assert_eq!(body["predictions"][0]["label"], "Naja Naja");
        // candidates are still resolved when the top label is not trusted
        assert_eq!(body["predictions"][0]["scientific_name"], "Naja naja");
    }

    #[tokio::test]
    async fn test_snake_id_no_detection() {
        let h = harness(no_snake());
        let (status, body) = send(&h.app, multipart("grass.png", &png_bytes(), Some("0.5"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body.get("species").is_none());
        assert!((body["detection_confidence"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(h.uploads_left(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_rejects_15mb_upload_before_model() {
        let h = harness(naja_detected(0.95));
        let big = vec![0u8; 15 * 1024 * 1024];
        let (status, body) = send(&h.app, multipart("big.jpg", &big, None)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(h.identifier.calls(), 0);
        assert_eq!(h.uploads_left(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_rejects_upload_just_over_limit() {
        let h = harness(naja_detected(0.95));
        let mut bytes = png_bytes();
        bytes.resize(10 * 1024 * 1024 + 512 * 1024, 0);
        let (status, body) = send(&h.app, multipart("big.png", &bytes, None)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload_too_large");
        assert_eq!(h.identifier.calls(), 0);
        assert_eq!(h.uploads_left(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_rejects_unsupported_type() {
        let h = harness(naja_detected(0.95));
        let (status, body) = send(&h.app, multipart("snake.gif", &png_bytes(), None)).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"], "unsupported_media_type");
        assert_eq!(h.identifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_rejects_bad_threshold() {
        let h = harness(naja_detected(0.95));
        let (status, _) = send(&h.app, multipart("cobra.png", &png_bytes(), Some("1.5"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(h.identifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_non_multipart_body_is_json_error() {
        let h = harness(naja_detected(0.95));
        let (status, body) = send(&h.app, post_json("/snake-id", json!({"image": "x"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "bad_request");
        assert!(body["message"].is_string());
        assert_eq!(h.identifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_snake_id_timeout_is_retryable_and_cleans_up() {
        let mut slow = StubIdentifier::new(naja_detected(0.95));
        slow.delay = Duration::from_millis(400);
        let h = build(slow, Arc::new(DisabledRouter), Duration::from_millis(50));

        let (status, body) = send(&h.app, multipart("cobra.png", &png_bytes(), None)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "timeout");
        assert_eq!(h.uploads_left(), 0);
    }

    // === Antivenom finder ===

    #[tokio::test]
    async fn test_finder_naja_naja_near_manila() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/finder",
            manila_search(json!({"snake_scientific_name": "Naja naja"})),
        );
        let (status, body) = send(&h.app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let facilities = body["facilities"].as_array().unwrap();
        assert!(!facilities.is_empty());
        assert_eq!(body["total_facilities"], facilities.len());

        let first = &facilities[0];
        assert_eq!(first["facility_id"], 1);
        assert_eq!(first["antivenom_id"], 102);
        assert_eq!(first["quantity"], 25);
        assert!(first["distance_km"].as_f64().unwrap() <= 100.0);

        let distances: Vec<f64> = facilities.iter().map(|f| f["distance_km"].as_f64().unwrap()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!(facilities.iter().all(|f| f["quantity"].as_i64().unwrap() > 0));
        // unverified Makati stock and the zero-quantity batch never appear
        assert!(facilities.iter().all(|f| f["facility_id"] != 7));
        assert!(facilities.iter().all(|f| f["facility_id"] != 2));
        assert_eq!(body["search_criteria"]["species"], "Naja naja");
    }

    #[tokio::test]
    async fn test_finder_by_common_name_merges_batches() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/finder",
            manila_search(json!({"snake_common_name": "philippine cobra"})),
        );
        let (status, body) = send(&h.app, req).await;

        assert_eq!(status, StatusCode::OK);
        let facilities = body["facilities"].as_array().unwrap();
        let east_avenue: Vec<&Value> = facilities.iter().filter(|f| f["facility_id"] == 2).collect();
        assert_eq!(east_avenue.len(), 1);
        assert_eq!(east_avenue[0]["quantity"], 14);
        assert_eq!(east_avenue[0]["expiration_date"], "2028-09-30");
        // the rural health unit has no coordinates
        assert!(facilities.iter().all(|f| f["facility_id"] != 8));
    }

    #[tokio::test]
    async fn test_finder_by_antivenom_type() {
        let h = harness(no_snake());
        let req = post_json("/antivenom/finder", manila_search(json!({"antivenom_type": "Polyvalent"})));
        let (status, body) = send(&h.app, req).await;

        assert_eq!(status, StatusCode::OK);
        let facilities = body["facilities"].as_array().unwrap();
        assert!(!facilities.is_empty());
        assert!(facilities.iter().all(|f| f["antivenom_type"] == "polyvalent"));
    }

    #[tokio::test]
    async fn test_finder_enriches_routes() {
        let h = build(
            StubIdentifier::new(no_snake()),
            Arc::new(FixedRouter),
            Duration::from_secs(30),
        );
        let req = post_json(
            "/antivenom/finder",
            manila_search(json!({"snake_scientific_name": "Naja naja"})),
        );
        let (_, body) = send(&h.app, req).await;

        let first = &body["facilities"][0];
        assert_eq!(first["road_distance_km"], 3.1);
        assert_eq!(first["estimated_travel_time_minutes"], 8.0);
        assert_eq!(first["formatted_duration"], "8m");
    }

    #[tokio::test]
    async fn test_finder_empty_result_is_success() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/finder",
            json!({
                "snake_scientific_name": "Naja naja",
                "user_latitude": 16.4000,
                "user_longitude": 120.5960,
                "max_distance_km": 10.0
            }),
        );
        let (status, body) = send(&h.app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["total_facilities"], 0);
        assert!(body.get("facilities").and_then(Value::as_array).is_some_and(Vec::is_empty));
    }

    #[tokio::test]
    async fn test_finder_validation_errors() {
        let h = harness(no_snake());

        let bad_lat = json!({"snake_scientific_name": "Naja naja", "user_latitude": 95.0, "user_longitude": 120.0});
        let (status, body) = send(&h.app, post_json("/antivenom/finder", bad_lat)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let zero_radius = manila_search(json!({"snake_scientific_name": "Naja naja", "max_distance_km": 0.0}));
        let (status, _) = send(&h.app, post_json("/antivenom/finder", zero_radius)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&h.app, post_json("/antivenom/finder", manila_search(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let bad_type = manila_search(json!({"antivenom_type": "trivalent"}));
        let (status, _) = send(&h.app, post_json("/antivenom/finder", bad_type)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let malformed = Request::builder()
            .method("POST")
            .uri("/antivenom/finder")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"user_latitude\": "))
            .unwrap();
        let (status, body) = send(&h.app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_finder_unknown_species_is_not_found() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/finder",
            manila_search(json!({"snake_scientific_name": "Naja fictus"})),
        );
        let (status, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_facilities_grouped_by_facility() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/facilities",
            json!({"antivenom_name": "cobra", "user_latitude": 14.5995, "user_longitude": 120.9842}),
        );
        let (status, body) = send(&h.app, req).await;

        assert_eq!(status, StatusCode::OK);
        let facilities = body["facilities"].as_array().unwrap();
        let ids: Vec<i64> = facilities.iter().map(|f| f["facility_id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let ritm: Vec<i64> = facilities[2]["antivenoms"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["antivenom_id"].as_i64().unwrap())
            .collect();
        assert_eq!(ritm, vec![100, 101]);
        assert_eq!(body["search_criteria"]["max_distance_km"], 200.0);
    }

    #[tokio::test]
    async fn test_facilities_requires_name() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/facilities",
            json!({"antivenom_name": "  ", "user_latitude": 14.5995, "user_longitude": 120.9842}),
        );
        let (status, _) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_facilities_by_snake_id() {
        let h = harness(no_snake());
        let req = post_json(
            "/antivenom/facilities",
            json!({"snake_id": 3, "user_latitude": 14.5995, "user_longitude": 120.9842}),
        );
        let (status, body) = send(&h.app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["search_criteria"]["species"], "Naja naja");
        assert!(body["search_criteria"].get("antivenom_name").is_none());
        let facilities = body["facilities"].as_array().unwrap();
        assert_eq!(facilities[0]["facility_id"], 1);
        assert!(facilities[0]["antivenoms"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["antivenom_id"] == 102));
        assert!(facilities.iter().all(|f| f["facility_id"] != 7));

        let missing = json!({"snake_id": 999, "user_latitude": 14.5995, "user_longitude": 120.9842});
        let (status, body) = send(&h.app, post_json("/antivenom/facilities", missing)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let neither = json!({"user_latitude": 14.5995, "user_longitude": 120.9842});
        let (status, _) = send(&h.app, post_json("/antivenom/facilities", neither)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_route_falls_back_to_estimate() {
        let h = harness(no_snake());
        let uri = "/antivenom/route?start_lat=14.5995&start_lon=120.9842&end_lat=14.5782&end_lon=120.9847";
        let (status, body) = send(&h.app, get_req(uri)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "estimate");
        assert_eq!(body["route"]["estimated"], true);
        let km = body["straight_line_distance_km"].as_f64().unwrap();
        assert!((2.3..=2.6).contains(&km));

        let (status, _) = send(&h.app, get_req("/antivenom/route?start_lat=99&start_lon=0&end_lat=0&end_lon=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&h.app, get_req("/antivenom/route?start_lat=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // === Species ===

    #[tokio::test]
    async fn test_species_endpoints() {
        let h = harness(no_snake());

        let (status, body) = send(&h.app, get_req("/snakes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 10);
        assert_eq!(body["snakes"][0]["scientific_name"], "Boiga dendrophila");

        let (_, body) = send(&h.app, get_req("/snakes/with-antivenom")).await;
        assert_eq!(body["total"], 7);

        let (_, body) = send(&h.app, get_req("/snakes/medically-significant")).await;
        assert_eq!(body["total"], 6);

        let (status, body) = send(&h.app, get_req("/snakes/Naja%20naja")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["snake"]["snake_id"], 3);

        let (status, body) = send(&h.app, get_req("/snakes/Naja%20fictus")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
