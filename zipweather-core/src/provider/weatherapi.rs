use async_trait::async_trait;
use http::{Method, StatusCode};
use reqwest::Client;
use serde::Deserialize;

use crate::{Error, context::RequestContext, model::CurrentWeather, webclient::WebClient};

use super::WeatherResolver;

/// Current conditions from WeatherAPI.com.
#[derive(Clone)]
pub struct WeatherApiResolver {
    base_url: String,
    api_key: String,
    http: Client,
}

impl WeatherApiResolver {
    pub fn new(base_url: &str, api_key: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        }
    }
}

impl std::fmt::Debug for WeatherApiResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiResolver")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl WeatherResolver for WeatherApiResolver {
    async fn current(&self, ctx: &RequestContext, locality: &str) -> Result<CurrentWeather, Error> {
        let url = format!("{}/v1/current.json", self.base_url);
        let wc = WebClient::new(
            ctx,
            &self.http,
            Method::GET,
            &url,
            &[("key", self.api_key.as_str()), ("q", locality), ("aqi", "no")],
        )?;

        match wc.json::<WaResponse>().await {
            Ok(parsed) => Ok(CurrentWeather { celsius: parsed.current.temp_c }),
            Err(err) => {
                tracing::error!(error = %err, locality, "WeatherAPI request failed");
                Err(match err.status() {
                    Some(StatusCode::UNAUTHORIZED) => Error::InvalidApiKey,
                    Some(StatusCode::BAD_REQUEST) => Error::LocalityNotFound,
                    Some(status) => Error::Transport {
                        message: format!("weather provider responded {status}"),
                        source: None,
                    },
                    None => err,
                })
            }
        }
    }
}
