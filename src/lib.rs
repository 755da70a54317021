//! Search Panel Library
//!
//! Building blocks for record-browsing views: a date-range search filter
//! with calendar-period snapping, composition of the resulting query
//! domain with facet groups and a search-panel predicate, and a
//! map-backed address picker with API-key resolution and geocoding.

pub mod apikey;
pub mod composer;
pub mod config;
pub mod domain;
pub mod field;
pub mod filter;
pub mod geocode;
pub mod picker;
pub mod traits;

// Re-export commonly used types
pub use apikey::{ApiKeyManager, HttpKeyService, KeyCache, KeyError};
pub use composer::{FilterGroup, SearchModel, compose};
pub use config::AppConfig;
pub use domain::{Connective, Domain, DomainError, DomainItem, Leaf};
pub use field::{EligibleField, FieldDef, FieldKind, eligible_fields};
pub use filter::{FilterSetting, Granularity, ShiftDirection, ShiftOutcome};
pub use geocode::{GeoPoint, GeocodeError, GeocodeResult, HttpGeocoder, UNKNOWN_LOCATION};
pub use picker::{AddressInput, CommitOutcome, GeocoderFactory, MapAddressPicker, PickerPhase};
pub use traits::{
    Clock, Geocoder, KeyService, MockClock, MockGeocoder, MockKeyService, MockNotifier,
    MockRecordStore, Notifier, RecordStore, SystemClock,
};
#[cfg(feature = "desktop")]
pub use traits::SystemNotifier;
