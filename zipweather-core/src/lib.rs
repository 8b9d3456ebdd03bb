//! Core library for the `zipweather` hops.
//!
//! This crate defines:
//! - Validated value objects (postal code, locality, temperature reading)
//! - A traced, cancellable outbound call helper
//! - Locality and weather resolvers, and the orchestrator chaining them
//! - The HTTP boundary of both hops, plus configuration and telemetry setup
//!
//! It is used by `zipweather-cli`, but can also be embedded in other binaries.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod server;
pub mod telemetry;
pub mod webclient;

pub use config::Config;
pub use context::RequestContext;
pub use error::Error;
pub use model::{Locality, LookupResult, PostalCode, TemperatureReading};
pub use orchestrator::Orchestrator;
pub use provider::{LocalityBackend, LocalityResolver, WeatherResolver};
