//! Map-backed address picker.
//!
//! Every way an address can change (typed text, an autocomplete pick, a
//! marker drag, a programmatic write) funnels into [`MapAddressPicker::commit`],
//! which geocodes, updates the marker position, updates the field text
//! and persists the value upstream. Routing everything through one path
//! keeps field text, marker and current address in agreement.
//!
//! Because `commit` takes `&mut self` and awaits its geocode inline,
//! lookups are serialized per picker instance; a stale response can
//! never overwrite a newer commit.

use anyhow::{Context, Result};

use crate::apikey::ApiKeyManager;
use crate::config::MapConfig;
use crate::geocode::{GeoPoint, GeocodeError, UNKNOWN_LOCATION};
use crate::traits::{Geocoder, KeyService, Notifier, RecordStore};

/// Visibility state of the map popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickerPhase {
    #[default]
    Collapsed,
    Revealed,
}

/// Source of an address change.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressInput {
    /// Free text typed into the field.
    Typed(String),
    /// An autocomplete suggestion the user picked.
    Suggested(String),
    /// A value written by the surrounding form.
    Programmatic(String),
    /// The marker was dragged to a new position.
    MarkerDragged(GeoPoint),
}

/// What a commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Field, marker and persisted value were updated.
    Committed,
    /// The address could not be resolved; prior marker and address were
    /// kept and `message` should be shown to the user.
    NotFound { message: &'static str },
    /// Nothing to do (empty input, or a marker event without a map).
    Skipped,
}

/// Builds a geocoder once the API key is known.
pub type GeocoderFactory<G> = Box<dyn Fn(&str) -> Result<G> + Send + Sync>;

/// Address form field with an attached map and draggable marker.
pub struct MapAddressPicker<G, K, S, N> {
    phase: PickerPhase,
    position: GeoPoint,
    current_address: Option<String>,
    field_value: String,
    map_ready: bool,
    load_attempted: bool,
    autocomplete: bool,
    geocoder: Option<G>,
    build_geocoder: GeocoderFactory<G>,
    keys: ApiKeyManager<K>,
    store: S,
    notifier: N,
}

impl<G, K, S, N> MapAddressPicker<G, K, S, N>
where
    G: Geocoder,
    K: KeyService,
    S: RecordStore,
    N: Notifier,
{
    pub fn new(
        config: &MapConfig,
        keys: ApiKeyManager<K>,
        store: S,
        notifier: N,
        build_geocoder: GeocoderFactory<G>,
    ) -> Self {
        Self {
            phase: PickerPhase::Collapsed,
            position: GeoPoint {
                lat: config.default_lat,
                lng: config.default_lng,
            },
            current_address: None,
            field_value: String::new(),
            map_ready: false,
            load_attempted: false,
            autocomplete: config.autocomplete,
            geocoder: None,
            build_geocoder,
            keys,
            store,
            notifier,
        }
    }

    pub fn phase(&self) -> PickerPhase {
        self.phase
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn current_address(&self) -> Option<&str> {
        self.current_address.as_deref()
    }

    pub fn field_value(&self) -> &str {
        &self.field_value
    }

    /// False until the mapping library is loaded, and permanently false
    /// when loading failed: the picker then degrades to a plain field.
    pub fn map_ready(&self) -> bool {
        self.map_ready
    }

    /// Show the map. The mapping library is loaded on first reveal only;
    /// later reveals reuse the outcome, success or failure.
    pub async fn reveal(&mut self) {
        self.phase = PickerPhase::Revealed;
        self.ensure_loaded().await;
    }

    /// Hide the map (outside click).
    pub fn collapse(&mut self) {
        self.phase = PickerPhase::Collapsed;
    }

    async fn ensure_loaded(&mut self) {
        if self.load_attempted {
            return;
        }
        self.load_attempted = true;

        let key = match self.keys.resolve().await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "map API key unavailable");
                self.degrade("Map API key not found. The address field stays editable.");
                return;
            }
        };

        match (self.build_geocoder)(&key) {
            Ok(geocoder) => {
                self.geocoder = Some(geocoder);
                self.map_ready = true;
                tracing::info!("mapping library loaded");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load mapping library");
                self.degrade("Failed loading the map API.");
            }
        }
    }

    fn degrade(&mut self, body: &str) {
        self.map_ready = false;
        if let Err(e) = self.notifier.notify("Map unavailable", body) {
            tracing::warn!(error = %e, "failed to send notification");
        }
    }

    /// Autocomplete suggestions for partial text. Empty when the map is
    /// not ready or autocomplete is disabled.
    pub async fn suggestions(&self, partial: &str) -> Result<Vec<String>, GeocodeError> {
        if !self.autocomplete {
            return Ok(Vec::new());
        }
        match &self.geocoder {
            Some(geocoder) if self.map_ready => geocoder.suggest(partial).await,
            _ => Ok(Vec::new()),
        }
    }

    /// The single address-change path.
    ///
    /// Text inputs are forward-geocoded to move the marker; a marker
    /// drag is reverse-geocoded to name the position. Every successful
    /// resolution writes the field, persists it, and leaves marker and
    /// address in agreement.
    pub async fn commit(&mut self, input: AddressInput) -> Result<CommitOutcome> {
        match input {
            AddressInput::Typed(address)
            | AddressInput::Suggested(address)
            | AddressInput::Programmatic(address) => {
                if address.is_empty() {
                    return Ok(CommitOutcome::Skipped);
                }
                self.commit_text(address).await
            }
            AddressInput::MarkerDragged(position) => self.commit_drag(position).await,
        }
    }

    async fn commit_text(&mut self, address: String) -> Result<CommitOutcome> {
        let Some(geocoder) = self.geocoder.as_ref().filter(|_| self.map_ready) else {
            // Degraded mode: the field is still editable and persisted.
            self.write_and_persist(address).await?;
            return Ok(CommitOutcome::Committed);
        };

        match geocoder.forward(&address).await {
            Ok(result) => {
                self.position = result.position;
                self.write_and_persist(result.formatted_address).await?;
                Ok(CommitOutcome::Committed)
            }
            Err(GeocodeError::NotFound) => {
                tracing::debug!(address, "address did not geocode");
                Ok(CommitOutcome::NotFound {
                    message: UNKNOWN_LOCATION,
                })
            }
            Err(GeocodeError::ServiceUnavailable(reason)) => {
                tracing::warn!(%reason, "forward geocode failed");
                Ok(CommitOutcome::NotFound {
                    message: UNKNOWN_LOCATION,
                })
            }
        }
    }

    async fn commit_drag(&mut self, position: GeoPoint) -> Result<CommitOutcome> {
        let Some(geocoder) = self.geocoder.as_ref().filter(|_| self.map_ready) else {
            return Ok(CommitOutcome::Skipped);
        };

        self.position = position;
        let address = match geocoder.reverse(position).await {
            Ok(address) => address,
            Err(e) => {
                tracing::debug!(error = %e, "reverse geocode failed");
                UNKNOWN_LOCATION.to_string()
            }
        };
        self.write_and_persist(address).await?;
        Ok(CommitOutcome::Committed)
    }

    async fn write_and_persist(&mut self, address: String) -> Result<()> {
        self.field_value = address.clone();
        self.store
            .persist(&address)
            .await
            .context("Failed to persist address value")?;
        self.current_address = Some(address);
        Ok(())
    }
}
