use crate::{
    Config, Error,
    context::RequestContext,
    model::{CurrentWeather, Locality, PostalCode},
    provider::{hop::HopLocalityResolver, viacep::ViaCepResolver, weatherapi::WeatherApiResolver},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod hop;
pub mod viacep;
pub mod weatherapi;

/// Where the weather hop gets localities from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalityBackend {
    /// Call the geocoding provider directly.
    ViaCep,
    /// Delegate to the locality hop over HTTP.
    Hop,
}

impl LocalityBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalityBackend::ViaCep => "viacep",
            LocalityBackend::Hop => "hop",
        }
    }

    pub const fn all() -> &'static [LocalityBackend] {
        &[LocalityBackend::Hop, LocalityBackend::ViaCep]
    }
}

impl std::fmt::Display for LocalityBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LocalityBackend {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "viacep" => Ok(LocalityBackend::ViaCep),
            "hop" => Ok(LocalityBackend::Hop),
            _ => Err(anyhow::anyhow!(
                "Unknown locality backend '{value}'. Supported backends: hop, viacep."
            )),
        }
    }
}

/// Maps a postal code to a locality.
///
/// "Not found" is a successful call returning [`Locality::not_found`]; only
/// transport and decode failures are errors.
#[async_trait]
pub trait LocalityResolver: Send + Sync + Debug {
    async fn resolve(&self, ctx: &RequestContext, postal_code: &PostalCode)
    -> Result<Locality, Error>;
}

/// Current weather for a free-text locality name.
#[async_trait]
pub trait WeatherResolver: Send + Sync + Debug {
    async fn current(&self, ctx: &RequestContext, locality: &str) -> Result<CurrentWeather, Error>;
}

/// Shared outbound client. Per-call deadlines come from [`RequestContext`].
pub fn http_client() -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(concat!("zipweather/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Construct the locality resolver selected by config.
pub fn locality_resolver_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Arc<dyn LocalityResolver>> {
    let resolver: Arc<dyn LocalityResolver> = match config.locality_backend()? {
        LocalityBackend::ViaCep => {
            Arc::new(ViaCepResolver::new(&config.geocoding.base_url, http.clone()))
        }
        LocalityBackend::Hop => {
            Arc::new(HopLocalityResolver::new(&config.locality.hop_url, http.clone()))
        }
    };

    Ok(resolver)
}

/// Construct the geocoding resolver used by the locality hop itself.
pub fn geocoding_resolver_from_config(config: &Config, http: &Client) -> Arc<dyn LocalityResolver> {
    Arc::new(ViaCepResolver::new(&config.geocoding.base_url, http.clone()))
}

/// Construct the weather resolver; fails when no API key is configured.
pub fn weather_resolver_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Arc<dyn WeatherResolver>> {
    let api_key = config.weather_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No weather API key configured.\n\
                 Hint: run `zipweather configure` or set WEATHER_API_KEY."
        )
    })?;

    Ok(Arc::new(WeatherApiResolver::new(&config.weather.base_url, api_key, http.clone())))
}
