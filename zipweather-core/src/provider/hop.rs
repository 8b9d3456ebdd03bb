use async_trait::async_trait;
use http::{Method, StatusCode};
use reqwest::Client;
use serde::Serialize;

use crate::{
    Error,
    context::RequestContext,
    model::{Locality, PostalCode},
    webclient::WebClient,
};

use super::LocalityResolver;

/// Resolves postal codes by delegating to the locality hop over HTTP.
///
/// The trace context of the calling request travels with the call, so the
/// hop's own outbound geocoding request joins the same trace.
#[derive(Debug, Clone)]
pub struct HopLocalityResolver {
    base_url: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct HopRequest<'a> {
    cep: &'a str,
}

impl HopLocalityResolver {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), http }
    }
}

#[async_trait]
impl LocalityResolver for HopLocalityResolver {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        postal_code: &PostalCode,
    ) -> Result<Locality, Error> {
        let url = format!("{}/zipcode/", self.base_url);
        let wc = WebClient::new(ctx, &self.http, Method::POST, &url, &[])?
            .json_body(&HopRequest { cep: postal_code.as_str() })?;

        match wc.json::<Locality>().await {
            Ok(locality) => Ok(locality),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                Ok(Locality::not_found(postal_code))
            }
            Err(err) => {
                tracing::error!(error = %err, %postal_code, "locality hop call failed");
                Err(err)
            }
        }
    }
}
