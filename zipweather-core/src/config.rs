use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr, path::PathBuf, time::Duration};

use crate::provider::LocalityBackend;

/// Weather provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: "https://api.weatherapi.com".to_string() }
    }
}

/// Geocoding (postal code lookup) provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self { base_url: "https://viacep.com.br".to_string() }
    }
}

/// How the weather hop resolves localities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalityConfig {
    /// "viacep" or "hop"; hop when absent.
    pub backend: Option<String>,

    /// Base URL of the locality hop, as reachable from the weather hop.
    pub hop_url: String,
}

impl Default for LocalityConfig {
    fn default() -> Self {
        Self { backend: None, hop_url: "http://127.0.0.1:8080".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub locality_addr: SocketAddr,
    pub weather_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            locality_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            weather_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Deadline for all outbound calls made on behalf of one inbound request.
    pub timeout_ms: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl OutboundConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [weather]
/// api_key = "..."
///
/// [locality]
/// backend = "hop"
/// hop_url = "http://service-a:8080"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherApiConfig,
    pub geocoding: GeocodingConfig,
    pub locality: LocalityConfig,
    pub server: ServerConfig,
    pub outbound: OutboundConfig,
}

impl Config {
    /// Load config from disk (defaults when the file doesn't exist yet), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    /// Load config from disk only.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "zipweather", "zipweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overrides settings from environment-style variables looked up through `var`.
    ///
    /// `SERVICE_A_HOST` + `SERVICE_A_PORT` point the weather hop at the
    /// locality hop; `SERVICE_A_PORT` and `SERVICE_B_PORT` also set the
    /// listen ports of the two hops.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var("WEATHER_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }

        if let Some(backend) = var("LOCALITY_BACKEND") {
            LocalityBackend::try_from(backend.as_str())?;
            self.locality.backend = Some(backend);
        }

        let port_a = var("SERVICE_A_PORT").map(|p| parse_port("SERVICE_A_PORT", &p)).transpose()?;
        if let Some(port) = port_a {
            self.server.locality_addr.set_port(port);
        }

        if let Some(host) = var("SERVICE_A_HOST") {
            let port = port_a.unwrap_or_else(|| self.server.locality_addr.port());
            self.locality.hop_url = format!("http://{host}:{port}");
        }

        if let Some(port) = var("SERVICE_B_PORT") {
            let port = parse_port("SERVICE_B_PORT", &port)?;
            self.server.weather_addr.set_port(port);
        }

        Ok(())
    }

    /// Return the locality backend as a strongly-typed value.
    pub fn locality_backend(&self) -> Result<LocalityBackend> {
        match &self.locality.backend {
            Some(s) => LocalityBackend::try_from(s.as_str()),
            None => Ok(LocalityBackend::Hop),
        }
    }

    pub fn set_locality_backend(&mut self, backend: LocalityBackend) {
        self.locality.backend = Some(backend.as_str().to_string());
    }

    pub fn set_weather_api_key(&mut self, api_key: String) {
        self.weather.api_key = Some(api_key);
    }

    /// Returns the weather API key, if present.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a port number, got '{value}'"))
}
