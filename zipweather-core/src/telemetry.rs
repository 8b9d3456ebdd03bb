//! Logging setup and W3C Trace Context propagation over HTTP headers.
//!
//! Propagation is two pure functions: [`inject`] copies a trace context into an
//! outbound header map, [`extract`] reads one back from inbound headers.

use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    Context, KeyValue, global,
    propagation::{Extractor, Injector, TextMapPropagator},
    trace::{TraceContextExt, TracerProvider as _},
};
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace::SdkTracerProvider};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// W3C Trace Context header name.
pub const TRACEPARENT: &str = "traceparent";

const DEFAULT_FILTER: &str = "zipweather=debug,zipweather_core=debug,tower_http=debug";

struct HeadersExtractor<'a>(&'a HeaderMap);

impl Extractor for HeadersExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

struct HeadersInjector<'a>(&'a mut HeaderMap);

impl Injector for HeadersInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(val)) =
            (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value))
        {
            self.0.insert(name, val);
        }
    }
}

/// Writes `cx` into `headers` as `traceparent` / `tracestate`.
/// A context without a valid span writes nothing.
pub fn inject(cx: &Context, headers: &mut HeaderMap) {
    TraceContextPropagator::new().inject_context(cx, &mut HeadersInjector(headers));
}

/// Reads the remote trace context carried by `headers`, if any.
pub fn extract(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeadersExtractor(headers))
}

/// Parents `span` on the trace context found in `headers` and returns the
/// context outbound calls should carry.
///
/// When an OpenTelemetry layer is installed that is the span's own context, so
/// downstream hops see it as their parent. Without one the extracted context
/// is passed along unchanged.
pub fn continue_trace(span: &Span, headers: &HeaderMap) -> Context {
    let parent = extract(headers);
    if let Err(err) = span.set_parent(parent.clone()) {
        tracing::debug!(error = ?err, "span not linked to the inbound trace");
    }

    let trace_id = parent.span().span_context().trace_id();
    if parent.span().span_context().is_valid() {
        span.record("trace_id", tracing::field::display(trace_id));
    }

    let own = span.context();
    if own.span().span_context().is_valid() { own } else { parent }
}

/// Keeps the tracer provider alive; shuts it down on drop.
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(err) = self.provider.shutdown() {
            tracing::warn!(error = %err, "failed to shut down tracer provider");
        }
    }
}

/// Installs the global subscriber (env filter, fmt output, OpenTelemetry
/// layer) and the W3C propagator for `service_name`.
pub fn init(service_name: &str) -> anyhow::Result<TelemetryGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder_empty()
        .with_attributes([KeyValue::new("service.name", service_name.to_string())])
        .build();
    let provider = SdkTracerProvider::builder().with_resource(resource).build();
    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(service_name.to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    Ok(TelemetryGuard { provider })
}
