//! Abstractions for time and side effects to enable testing.
//!
//! Components take these traits at their seams so time, notifications,
//! record persistence, geocoding and key retrieval can all be replaced
//! with deterministic mocks in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};

use crate::geocode::{GeoPoint, GeocodeError, GeocodeResult};

// ==================== Clock Trait ====================

/// Trait for abstracting wall-clock access.
///
/// The date-range filter resets to "today" on every granularity change,
/// so tests need a controllable notion of now.
pub trait Clock: Send + Sync {
    /// The current local wall-clock time, naive (no zone attached).
    fn now(&self) -> NaiveDateTime;
}

/// System clock using real local time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clock for testing with controllable time.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl MockClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }
}

impl Clock for MockClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

// ==================== Notifier Trait ====================

/// Trait for abstracting user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Surface a notification with the given title and body. Callers use
    /// this for degradations the user must see, so implementations should
    /// keep the notification visible until dismissed.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Desktop notifier implementation using notify-rust.
#[cfg(feature = "desktop")]
#[derive(Debug, Clone, Default)]
pub struct SystemNotifier;

#[cfg(feature = "desktop")]
impl Notifier for SystemNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("Search Panel")
            .timeout(notify_rust::Timeout::Never)
            .show()?;
        Ok(())
    }
}

/// Mock notifier for testing that records all notifications.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn was_called(&self) -> bool {
        !self.notifications.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ==================== RecordStore Trait ====================

/// Trait for persisting a committed field value upstream (the record
/// save that follows every address commit).
pub trait RecordStore: Send + Sync {
    fn persist(&self, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Mock record store that keeps every persisted value in memory.
#[derive(Debug, Clone, Default)]
pub struct MockRecordStore {
    values: Arc<Mutex<Vec<String>>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persisted(&self) -> Vec<String> {
        self.values.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.values.lock().unwrap().last().cloned()
    }
}

impl RecordStore for MockRecordStore {
    async fn persist(&self, value: &str) -> Result<()> {
        self.values.lock().unwrap().push(value.to_string());
        Ok(())
    }
}

// ==================== Geocoder Trait ====================

/// Trait over the mapping provider: address to coordinates, coordinates
/// to address, and autocomplete suggestions for partial text.
pub trait Geocoder: Send + Sync {
    fn forward(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<GeocodeResult, GeocodeError>> + Send;

    fn reverse(
        &self,
        position: GeoPoint,
    ) -> impl Future<Output = Result<String, GeocodeError>> + Send;

    fn suggest(
        &self,
        partial: &str,
    ) -> impl Future<Output = Result<Vec<String>, GeocodeError>> + Send;
}

/// Mock geocoder with canned responses.
#[derive(Debug, Clone, Default)]
pub struct MockGeocoder {
    forward_results: Arc<Mutex<HashMap<String, GeocodeResult>>>,
    reverse_result: Arc<Mutex<Option<String>>>,
    suggestions: Arc<Mutex<Vec<String>>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_forward(&self, address: &str, result: GeocodeResult) {
        self.forward_results
            .lock()
            .unwrap()
            .insert(address.to_string(), result);
    }

    /// Canned answer for every reverse lookup; `None` means not found.
    pub fn set_reverse(&self, address: Option<&str>) {
        *self.reverse_result.lock().unwrap() = address.map(str::to_string);
    }

    pub fn set_suggestions(&self, suggestions: Vec<String>) {
        *self.suggestions.lock().unwrap() = suggestions;
    }
}

impl Geocoder for MockGeocoder {
    async fn forward(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        self.forward_results
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or(GeocodeError::NotFound)
    }

    async fn reverse(&self, _position: GeoPoint) -> Result<String, GeocodeError> {
        self.reverse_result
            .lock()
            .unwrap()
            .clone()
            .ok_or(GeocodeError::NotFound)
    }

    async fn suggest(&self, partial: &str) -> Result<Vec<String>, GeocodeError> {
        Ok(self
            .suggestions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.to_lowercase().contains(&partial.to_lowercase()))
            .cloned()
            .collect())
    }
}

// ==================== KeyService Trait ====================

/// Trait over the remote key registry: fetch or store an API key by name.
pub trait KeyService: Send + Sync {
    fn fetch_key(&self, name: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn store_key(&self, name: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Mock key service backed by an in-memory map. Can be told to fail to
/// simulate an unreachable registry.
#[derive(Debug, Clone, Default)]
pub struct MockKeyService {
    keys: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockKeyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, value: &str) {
        self.keys
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl KeyService for MockKeyService {
    async fn fetch_key(&self, name: &str) -> Result<Option<String>> {
        if *self.failing.lock().unwrap() {
            anyhow::bail!("key service unreachable");
        }
        Ok(self.keys.lock().unwrap().get(name).cloned())
    }

    async fn store_key(&self, name: &str, value: &str) -> Result<()> {
        if *self.failing.lock().unwrap() {
            anyhow::bail!("key service unreachable");
        }
        self.insert(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_mock_clock_returns_set_time() {
        let clock = MockClock::new(at(10));
        assert_eq!(clock.now(), at(10));

        clock.set(at(14));
        assert_eq!(clock.now(), at(14));
    }

    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new(at(10));
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), at(12));
    }

    #[test]
    fn test_mock_notifier_records_notifications() {
        let notifier = MockNotifier::new();
        assert!(!notifier.was_called());

        notifier.notify("Title", "Body").unwrap();
        assert_eq!(
            notifier.notifications(),
            vec![("Title".to_string(), "Body".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mock_record_store_keeps_values() {
        let store = MockRecordStore::new();
        store.persist("10 Downing Street").await.unwrap();
        store.persist("221B Baker Street").await.unwrap();

        assert_eq!(store.persisted().len(), 2);
        assert_eq!(store.last().as_deref(), Some("221B Baker Street"));
    }

    #[tokio::test]
    async fn test_mock_geocoder_forward_miss_is_not_found() {
        let geocoder = MockGeocoder::new();
        let err = geocoder.forward("nowhere").await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound));
    }

    #[tokio::test]
    async fn test_mock_key_service_failure_mode() {
        let service = MockKeyService::new();
        service.insert("map_key", "abc123");
        assert_eq!(
            service.fetch_key("map_key").await.unwrap().as_deref(),
            Some("abc123")
        );

        service.set_failing(true);
        assert!(service.fetch_key("map_key").await.is_err());
    }
}
