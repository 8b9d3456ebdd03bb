use async_trait::async_trait;
use http::Method;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Error,
    context::RequestContext,
    model::{Locality, PostalCode},
    webclient::WebClient,
};

use super::LocalityResolver;

/// Resolves postal codes against the ViaCEP geocoding API.
#[derive(Debug, Clone)]
pub struct ViaCepResolver {
    base_url: String,
    http: Client,
}

impl ViaCepResolver {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), http }
    }

    fn url_for(&self, postal_code: &PostalCode) -> String {
        format!("{}/ws/{}/json/", self.base_url, postal_code)
    }
}

#[derive(Debug, Deserialize)]
struct VcResponse {
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    erro: Option<Value>,
}

impl VcResponse {
    /// ViaCEP flags unknown codes with `"erro": true` or `"erro": "true"`.
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => !s.is_empty() && s != "false",
            _ => false,
        }
    }
}

#[async_trait]
impl LocalityResolver for ViaCepResolver {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        postal_code: &PostalCode,
    ) -> Result<Locality, Error> {
        let wc = WebClient::new(ctx, &self.http, Method::GET, &self.url_for(postal_code), &[])?;

        let parsed: VcResponse = wc.json().await.inspect_err(|err| {
            tracing::error!(error = %err, %postal_code, "ViaCEP lookup failed");
        })?;

        if parsed.is_error() {
            tracing::debug!(%postal_code, "ViaCEP does not know this postal code");
            return Ok(Locality::not_found(postal_code));
        }

        let name = parsed.localidade.unwrap_or_default();
        Ok(Locality::found(postal_code, name.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn code(raw: &str) -> PostalCode {
        PostalCode::new(raw).unwrap()
    }

    #[tokio::test]
    async fn resolves_locality_name() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01001000/json/");
                then.status(200)
                    .json_body(json!({"cep": "01001-000", "localidade": "São Paulo", "uf": "SP"}));
            })
            .await;

        let resolver = ViaCepResolver::new(&format!("{}/", server.base_url()), Client::new());
        let locality = resolver.resolve(&RequestContext::new(), &code("01001000")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(locality, Locality::found(&code("01001000"), "São Paulo"));
    }

    #[tokio::test]
    async fn erro_flag_is_not_found_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01001009/json/");
                then.status(200).body(r#"{"erro":"true"}"#);
            })
            .await;

        let resolver = ViaCepResolver::new(&server.base_url(), Client::new());
        let locality = resolver.resolve(&RequestContext::new(), &code("01001009")).await.unwrap();

        assert!(locality.is_not_found());
        assert_eq!(locality.postal_code, "01001009");
    }

    #[tokio::test]
    async fn boolean_erro_and_empty_locality_are_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/99999999/json/");
                then.status(200).json_body(json!({"erro": true}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/88888888/json/");
                then.status(200).json_body(json!({"cep": "88888-888", "localidade": ""}));
            })
            .await;

        let resolver = ViaCepResolver::new(&server.base_url(), Client::new());
        let ctx = RequestContext::new();

        assert!(resolver.resolve(&ctx, &code("99999999")).await.unwrap().is_not_found());
        assert!(resolver.resolve(&ctx, &code("88888888")).await.unwrap().is_not_found());
    }

    #[tokio::test]
    async fn empty_erro_string_is_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/13000001/json/");
                then.status(200)
                    .json_body(json!({"cep": "13000-001", "localidade": "Campinas", "erro": ""}));
            })
            .await;

        let resolver = ViaCepResolver::new(&server.base_url(), Client::new());
        let locality = resolver.resolve(&RequestContext::new(), &code("13000001")).await.unwrap();

        assert_eq!(locality.name, "Campinas");
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01001000/json/");
                then.status(502).body("bad gateway");
            })
            .await;

        let resolver = ViaCepResolver::new(&server.base_url(), Client::new());
        let err = resolver.resolve(&RequestContext::new(), &code("01001000")).await.unwrap_err();

        assert_eq!(err.status(), Some(http::StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01001000/json/");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let resolver = ViaCepResolver::new(&server.base_url(), Client::new());
        let err = resolver.resolve(&RequestContext::new(), &code("01001000")).await.unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
    }
}
