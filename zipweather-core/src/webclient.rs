//! One outbound HTTP call: build, inject trace context, send under the request
//! context, then decode or classify the response.

use std::fmt::Display;

use http::{HeaderValue, Method, header::CONTENT_TYPE};
use reqwest::{Client, Request};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::{Error, context::RequestContext, telemetry};

const BODY_PREVIEW_MAX: usize = 200;

/// A prepared outbound request bound to a [`RequestContext`].
///
/// The request stays readable through [`WebClient::request`] after it has
/// been sent.
#[derive(Debug)]
pub struct WebClient {
    ctx: RequestContext,
    http: Client,
    request: Request,
}

impl WebClient {
    /// Builds the request and injects the context's trace headers.
    ///
    /// Each `query` pair is URL-escaped and appended to `url`.
    pub fn new(
        ctx: &RequestContext,
        http: &Client,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Self, Error> {
        let mut url = Url::parse(url).map_err(|err| Error::Transport {
            message: format!("invalid url '{url}': {err}"),
            source: None,
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut request = Request::new(method, url);
        telemetry::inject(ctx.trace(), request.headers_mut());

        Ok(Self { ctx: ctx.clone(), http: http.clone(), request })
    }

    /// Sets a JSON request body.
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(body).map_err(|err| Error::Transport {
            message: format!("failed to encode request body: {err}"),
            source: None,
        })?;

        self.request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *self.request.body_mut() = Some(bytes.into());
        Ok(self)
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Sends the request and hands the raw 2xx body to `consume`.
    ///
    /// Non-2xx responses never reach `consume`; they come back as
    /// [`Error::HttpStatus`] with a preview of the body. A failing `consume`
    /// becomes [`Error::Decode`] carrying its message unchanged.
    pub async fn send<T, E, F>(&self, consume: F) -> Result<T, Error>
    where
        F: FnOnce(&[u8]) -> Result<T, E>,
        E: Display,
    {
        let request = self.request.try_clone().ok_or_else(|| Error::Transport {
            message: "request body cannot be replayed".to_string(),
            source: None,
        })?;

        let url = request.url();
        tracing::debug!(
            method = %request.method(),
            host = url.host_str().unwrap_or_default(),
            path = url.path(),
            "calling remote"
        );

        let response = self
            .ctx
            .run(self.http.execute(request))
            .await?
            .map_err(|err| Error::transport("failed to send request", err.without_url()))?;

        let status = response.status();
        let body = self
            .ctx
            .run(response.bytes())
            .await?
            .map_err(|err| Error::transport("failed to read response body", err.without_url()))?;

        if !status.is_success() {
            tracing::debug!(%status, "remote answered with non-success status");
            return Err(Error::HttpStatus {
                status,
                body_preview: truncate_body(&String::from_utf8_lossy(&body)),
            });
        }

        consume(&body).map_err(|err| Error::Decode(err.to_string()))
    }

    /// [`WebClient::send`] with a JSON decoder as the consumer.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.send(|body| serde_json::from_slice::<T>(body)).await
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
