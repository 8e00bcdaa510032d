//! Integration tests for the maps client against a mock provider.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use saffron_integration_tests::{kitchen, maps_config};
use saffron_storefront::maps::{Coordinates, DistanceService, MapsClient, MapsError, PlaceResolver};

fn place_body(place_id: &str, postal_code: Option<&str>) -> serde_json::Value {
    let mut components = vec![json!({
        "long_name": "88",
        "short_name": "88",
        "types": ["street_number"]
    })];
    if let Some(code) = postal_code {
        components.push(json!({
            "long_name": code,
            "short_name": code,
            "types": ["postal_code"]
        }));
    }
    json!({
        "place_id": place_id,
        "formatted_address": "88 Mott St, New York, NY 10013, USA",
        "geometry": { "location": { "lat": 40.7166, "lng": -73.9977 } },
        "address_components": components
    })
}

async fn client(server: &MockServer) -> MapsClient {
    MapsClient::new(&maps_config(&server.uri())).unwrap()
}

// =============================================================================
// Place Details
// =============================================================================

#[tokio::test]
async fn test_resolve_place_reads_postal_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .and(query_param("place_id", "ChIJ-mott"))
        .and(query_param("key", "maps-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": place_body("ChIJ-mott", Some("10013"))
        })))
        .mount(&server)
        .await;

    let place = client(&server).await.resolve("ChIJ-mott").await.unwrap();

    assert_eq!(place.place_id, "ChIJ-mott");
    assert_eq!(place.postal_code.as_deref(), Some("10013"));
    assert_eq!(place.formatted_address, "88 Mott St, New York, NY 10013, USA");
    assert!((place.coordinates.latitude - 40.7166).abs() < 1e-9);
}

#[tokio::test]
async fn test_resolved_place_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": place_body("ChIJ-mott", Some("10013"))
        })))
        .expect(1)
        .mount(&server)
        .await;

    let maps = client(&server).await;
    let first = maps.resolve("ChIJ-mott").await.unwrap();
    let second = maps.resolve("ChIJ-mott").await.unwrap();

    assert_eq!(first, second);
    // `expect(1)` is verified when the server drops
}

#[tokio::test]
async fn test_place_without_postal_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": place_body("ChIJ-park", None)
        })))
        .mount(&server)
        .await;

    let place = client(&server).await.resolve("ChIJ-park").await.unwrap();
    assert!(place.postal_code.is_none());
}

#[tokio::test]
async fn test_unknown_place_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "NOT_FOUND" })))
        .mount(&server)
        .await;

    let err = client(&server).await.resolve("ChIJ-gone").await.unwrap_err();
    assert!(matches!(err, MapsError::NotFound(id) if id == "ChIJ-gone"));
}

#[tokio::test]
async fn test_denied_request_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .mount(&server)
        .await;

    let err = client(&server).await.resolve("ChIJ-mott").await.unwrap_err();
    match err {
        MapsError::Provider { status, message } => {
            assert_eq!(status, "REQUEST_DENIED");
            assert_eq!(message.as_deref(), Some("The provided API key is invalid."));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_failure_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server).await.resolve("ChIJ-mott").await.unwrap_err();
    assert!(matches!(err, MapsError::Api { status: 503, .. }));
}

// =============================================================================
// Geocoding
// =============================================================================

#[tokio::test]
async fn test_geocode_takes_first_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("address", "88 Mott St"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [place_body("ChIJ-mott", Some("10013")), place_body("ChIJ-other", Some("10002"))]
        })))
        .mount(&server)
        .await;

    let place = client(&server).await.geocode("88 Mott St").await.unwrap();
    assert_eq!(place.place_id, "ChIJ-mott");
    assert_eq!(place.postal_code.as_deref(), Some("10013"));
}

#[tokio::test]
async fn test_geocode_zero_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ZERO_RESULTS",
            "results": []
        })))
        .mount(&server)
        .await;

    let err = client(&server).await.geocode("nowhere at all").await.unwrap_err();
    assert!(matches!(err, MapsError::NotFound(_)));
}

// =============================================================================
// Distance Matrix
// =============================================================================

fn destination() -> Coordinates {
    Coordinates::new(40.7166, -73.9977).unwrap()
}

#[tokio::test]
async fn test_drive_time_prefers_traffic_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/distancematrix/json"))
        .and(query_param("origins", "40.7223,-73.9973"))
        .and(query_param("destinations", "40.7166,-73.9977"))
        .and(query_param("mode", "driving"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "duration": { "value": 540, "text": "9 mins" },
                    "duration_in_traffic": { "value": 721, "text": "13 mins" },
                    "distance": { "value": 1800, "text": "1.1 mi" }
                }]
            }]
        })))
        .mount(&server)
        .await;

    let drive = client(&server)
        .await
        .drive_time(kitchen(), destination())
        .await
        .unwrap();

    assert_eq!(drive.duration_seconds, 540);
    assert_eq!(drive.traffic_seconds, Some(721));
    assert_eq!(drive.distance_meters, 1800);
    // 721 seconds rounds up to 13 minutes
    assert_eq!(drive.minutes(), 13);
}

#[tokio::test]
async fn test_drive_time_without_traffic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/distancematrix/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{ "elements": [{ "status": "OK", "duration": { "value": 600 } }] }]
        })))
        .mount(&server)
        .await;

    let drive = client(&server)
        .await
        .drive_time(kitchen(), destination())
        .await
        .unwrap();
    assert_eq!(drive.minutes(), 10);
    assert_eq!(drive.distance_meters, 0);
}

#[tokio::test]
async fn test_unroutable_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/distancematrix/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{ "elements": [{ "status": "ZERO_RESULTS" }] }]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .drive_time(kitchen(), destination())
        .await
        .unwrap_err();
    assert!(matches!(err, MapsError::NoRoute(status) if status == "ZERO_RESULTS"));
}
