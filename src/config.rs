use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub map: MapConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// Marker position shown before any address is committed.
    pub default_lat: f64,
    pub default_lng: f64,
    pub zoom: u32,
    /// Base URL of the geocoding API.
    pub geocode_url: String,
    /// Base URL of the remote key registry.
    pub key_service_url: String,
    /// Name under which the map API key is registered.
    pub api_key_name: String,
    /// Literal key, bypassing cache and registry when set.
    pub api_key: Option<String>,
    pub autocomplete: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_lat: 10.8231,
            default_lng: 106.6297,
            zoom: 14,
            geocode_url: "https://maps.googleapis.com/maps/api".to_string(),
            key_service_url: "http://localhost:8069/api/keys".to_string(),
            api_key_name: "map_api_key".to_string(),
            api_key: None,
            autocomplete: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("searchpanel");

        let builder = Config::builder()
            // 1. Load default values
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // Map
            .set_default("map.default_lat", 10.8231)?
            .set_default("map.default_lng", 106.6297)?
            .set_default("map.zoom", 14)?
            .set_default("map.geocode_url", "https://maps.googleapis.com/maps/api")?
            .set_default("map.key_service_url", "http://localhost:8069/api/keys")?
            .set_default("map.api_key_name", "map_api_key")?
            .set_default("map.api_key", None::<String>)?
            .set_default("map.autocomplete", true)?

            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Load from environment variables (SEARCHPANEL__MAP__ZOOM=...)
            .add_source(Environment::with_prefix("SEARCHPANEL").separator("__"));

        let s = builder.build()?;
        Ok(s.try_deserialize()?)
    }
}
