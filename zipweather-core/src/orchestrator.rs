//! Postal code -> locality -> weather.

use std::sync::Arc;

use tracing::Instrument;

use crate::{
    Error,
    context::RequestContext,
    model::{LookupResult, PostalCode, TemperatureReading},
    provider::{LocalityResolver, WeatherResolver},
};

/// Chains a [`LocalityResolver`] and a [`WeatherResolver`].
///
/// Errors are forwarded as typed [`Error`] values; turning them into status
/// codes is the boundary's job.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    locality: Arc<dyn LocalityResolver>,
    weather: Arc<dyn WeatherResolver>,
}

impl Orchestrator {
    pub fn new(locality: Arc<dyn LocalityResolver>, weather: Arc<dyn WeatherResolver>) -> Self {
        Self { locality, weather }
    }

    /// Resolves the locality for `postal_code`, then its current temperature.
    ///
    /// An empty locality ends the lookup with [`Error::LocalityNotFound`]
    /// without calling the weather provider.
    pub async fn lookup(
        &self,
        ctx: &RequestContext,
        postal_code: &PostalCode,
    ) -> Result<LookupResult, Error> {
        let locality = self
            .locality
            .resolve(ctx, postal_code)
            .instrument(tracing::info_span!("zipcode-search", %postal_code))
            .await?;

        if locality.is_not_found() {
            tracing::debug!(%postal_code, "postal code did not resolve to a locality");
            return Err(Error::LocalityNotFound);
        }

        let weather = self
            .weather
            .current(ctx, &locality.name)
            .instrument(tracing::info_span!("weather-search", locality = %locality.name))
            .await?;

        let reading = TemperatureReading::new(&locality.name, weather.celsius)?;
        Ok(LookupResult::from(reading))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{CurrentWeather, Locality};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Locality resolver answering from a fixed outcome.
    #[derive(Debug)]
    pub(crate) enum FakeLocality {
        Named(&'static str),
        NotFound,
        Unreachable,
    }

    #[async_trait]
    impl LocalityResolver for FakeLocality {
        async fn resolve(
            &self,
            _ctx: &RequestContext,
            postal_code: &PostalCode,
        ) -> Result<Locality, Error> {
            match self {
                FakeLocality::Named(name) => Ok(Locality::found(postal_code, *name)),
                FakeLocality::NotFound => Ok(Locality::not_found(postal_code)),
                FakeLocality::Unreachable => Err(Error::Transport {
                    message: "connection refused".to_string(),
                    source: None,
                }),
            }
        }
    }

    type Outcome = Box<dyn Fn() -> Result<CurrentWeather, Error> + Send + Sync>;

    /// Weather resolver answering from a fixed outcome, counting calls.
    pub(crate) struct FakeWeather {
        outcome: Outcome,
        pub(crate) calls: AtomicUsize,
    }

    impl std::fmt::Debug for FakeWeather {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FakeWeather").field("calls", &self.calls).finish()
        }
    }

    impl FakeWeather {
        pub(crate) fn new(
            outcome: impl Fn() -> Result<CurrentWeather, Error> + Send + Sync + 'static,
        ) -> Self {
            Self { outcome: Box::new(outcome), calls: AtomicUsize::new(0) }
        }

        pub(crate) fn celsius(celsius: f64) -> Self {
            Self::new(move || Ok(CurrentWeather { celsius }))
        }
    }

    #[async_trait]
    impl WeatherResolver for FakeWeather {
        async fn current(
            &self,
            _ctx: &RequestContext,
            _locality: &str,
        ) -> Result<CurrentWeather, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn code() -> PostalCode {
        PostalCode::new("01001000").unwrap()
    }

    #[tokio::test]
    async fn full_chain_builds_converted_result() {
        let orchestrator = Orchestrator::new(
            Arc::new(FakeLocality::Named("São Paulo")),
            Arc::new(FakeWeather::celsius(22.0)),
        );

        let result = orchestrator.lookup(&RequestContext::new(), &code()).await.unwrap();

        assert_eq!(
            result,
            LookupResult {
                city: "São Paulo".to_string(),
                temp_c: 22.0,
                temp_f: 71.6,
                temp_k: 295.15,
            }
        );
    }

    #[tokio::test]
    async fn empty_locality_short_circuits_as_not_found() {
        let weather = Arc::new(FakeWeather::celsius(22.0));
        let orchestrator = Orchestrator::new(Arc::new(FakeLocality::NotFound), weather.clone());

        let err = orchestrator.lookup(&RequestContext::new(), &code()).await.unwrap_err();

        assert!(matches!(err, Error::LocalityNotFound));
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn locality_transport_failure_is_surfaced_as_is() {
        let weather = Arc::new(FakeWeather::celsius(22.0));
        let orchestrator = Orchestrator::new(Arc::new(FakeLocality::Unreachable), weather.clone());

        let err = orchestrator.lookup(&RequestContext::new(), &code()).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weather_errors_are_forwarded() {
        let orchestrator = Orchestrator::new(
            Arc::new(FakeLocality::Named("Campinas")),
            Arc::new(FakeWeather::new(|| Err(Error::InvalidApiKey))),
        );

        let err = orchestrator.lookup(&RequestContext::new(), &code()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey));
    }

    #[tokio::test]
    async fn implausible_temperature_is_rejected() {
        let orchestrator = Orchestrator::new(
            Arc::new(FakeLocality::Named("Campinas")),
            Arc::new(FakeWeather::celsius(99.0)),
        );

        let err = orchestrator.lookup(&RequestContext::new(), &code()).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }
}
