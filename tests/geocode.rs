//! Integration tests for the geocoding client and the key registry.
//!
//! These tests use wiremock to simulate the provider responses and
//! verify correct parsing and error handling.

use searchpanel::config::NetworkConfig;
use searchpanel::traits::{Geocoder, KeyService};
use searchpanel::{
    ApiKeyManager, GeoPoint, GeocodeError, HttpGeocoder, HttpKeyService, KeyCache,
};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn network() -> NetworkConfig {
    NetworkConfig {
        request_timeout_secs: 10,
        connect_timeout_secs: 5,
    }
}

// ==================== Forward Geocoding ====================

#[tokio::test]
async fn test_forward_geocode_success() {
    let mock_server = MockServer::start().await;

    let body = r#"{
        "status": "OK",
        "results": [{
            "formatted_address": "Marienplatz, 80331 München, Germany",
            "geometry": {"location": {"lat": 48.1374, "lng": 11.5755}}
        }]
    }"#;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .and(query_param("address", "marienplatz"))
        .and(query_param("key", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let geocoder =
        HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let result = geocoder.forward("marienplatz").await.unwrap();

    assert_eq!(result.formatted_address, "Marienplatz, 80331 München, Germany");
    assert_eq!(result.position.lat, 48.1374);
    assert_eq!(result.position.lng, 11.5755);
}

#[tokio::test]
async fn test_forward_geocode_zero_results_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"status": "ZERO_RESULTS", "results": []}"#),
        )
        .mount(&mock_server)
        .await;

    let geocoder = HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let err = geocoder.forward("nowhere at all").await.unwrap_err();
    assert!(matches!(err, GeocodeError::NotFound));
}

#[tokio::test]
async fn test_forward_geocode_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let geocoder = HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let err = geocoder.forward("marienplatz").await.unwrap_err();
    assert!(matches!(err, GeocodeError::ServiceUnavailable(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_forward_geocode_malformed_body_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let geocoder = HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let err = geocoder.forward("marienplatz").await.unwrap_err();
    assert!(matches!(err, GeocodeError::ServiceUnavailable(_)));
}

// ==================== Reverse Geocoding ====================

#[tokio::test]
async fn test_reverse_geocode_success() {
    let mock_server = MockServer::start().await;

    let body = r#"{
        "status": "OK",
        "results": [{
            "formatted_address": "Odeonsplatz 1, München",
            "geometry": {"location": {"lat": 48.1427, "lng": 11.5772}}
        }]
    }"#;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .and(query_param("latlng", "48.1427,11.5772"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let geocoder = HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let address = geocoder
        .reverse(GeoPoint {
            lat: 48.1427,
            lng: 11.5772,
        })
        .await
        .unwrap();
    assert_eq!(address, "Odeonsplatz 1, München");
}

#[tokio::test]
async fn test_reverse_geocode_no_result_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"status": "ZERO_RESULTS", "results": []}"#),
        )
        .mount(&mock_server)
        .await;

    let geocoder = HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let err = geocoder
        .reverse(GeoPoint { lat: 0.0, lng: 0.0 })
        .await
        .unwrap_err();
    assert!(matches!(err, GeocodeError::NotFound));
}

// ==================== Autocomplete ====================

#[tokio::test]
async fn test_suggest_returns_descriptions() {
    let mock_server = MockServer::start().await;

    let body = r#"{
        "predictions": [
            {"description": "Marienplatz, München"},
            {"description": "Marienstraße, Berlin"}
        ]
    }"#;

    Mock::given(method("GET"))
        .and(path("/autocomplete"))
        .and(query_param("input", "marien"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let geocoder = HttpGeocoder::new(mock_server.uri(), "abc123".to_string(), &network()).unwrap();
    let suggestions = geocoder.suggest("marien").await.unwrap();
    assert_eq!(
        suggestions,
        vec!["Marienplatz, München", "Marienstraße, Berlin"]
    );
}

#[tokio::test]
async fn test_suggest_empty_input_short_circuits() {
    // No server: an empty partial must not hit the network at all.
    let geocoder = HttpGeocoder::new(
        "http://127.0.0.1:9".to_string(),
        "abc123".to_string(),
        &network(),
    )
    .unwrap();
    assert!(geocoder.suggest("").await.unwrap().is_empty());
}

// ==================== Key Registry ====================

#[tokio::test]
async fn test_fetch_key_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get"))
        .and(body_json(serde_json::json!({"name": "map_api_key"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"key": "abc123"}"#),
        )
        .mount(&mock_server)
        .await;

    let service = HttpKeyService::new(mock_server.uri(), &network()).unwrap();
    let key = service.fetch_key("map_api_key").await.unwrap();
    assert_eq!(key.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_fetch_key_absent_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"key": null}"#))
        .mount(&mock_server)
        .await;

    let service = HttpKeyService::new(mock_server.uri(), &network()).unwrap();
    assert_eq!(service.fetch_key("map_api_key").await.unwrap(), None);
}

#[tokio::test]
async fn test_fetch_key_404_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let service = HttpKeyService::new(mock_server.uri(), &network()).unwrap();
    assert_eq!(service.fetch_key("map_api_key").await.unwrap(), None);
}

#[tokio::test]
async fn test_fetch_key_server_error_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = HttpKeyService::new(mock_server.uri(), &network()).unwrap();
    let result = service.fetch_key("map_api_key").await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("500"));
}

#[tokio::test]
async fn test_store_key_posts_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/set"))
        .and(body_json(
            serde_json::json!({"name": "map_api_key", "key": "fresh"}),
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = HttpKeyService::new(mock_server.uri(), &network()).unwrap();
    service.store_key("map_api_key", "fresh").await.unwrap();
}

// ==================== Cascade over HTTP ====================

#[tokio::test]
async fn test_manager_caches_registry_hit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/get"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"key": "abc123"}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache = KeyCache::with_path(dir.path().join("api_keys.json"));
    let service = HttpKeyService::new(mock_server.uri(), &network()).unwrap();
    let manager = ApiKeyManager::new("map_api_key".to_string(), None, cache, service);

    // First resolve hits the registry, second is served from the cache;
    // the expect(1) above verifies the single request.
    assert_eq!(manager.resolve().await.unwrap(), "abc123");
    assert_eq!(manager.resolve().await.unwrap(), "abc123");
}
