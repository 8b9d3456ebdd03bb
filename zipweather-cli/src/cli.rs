use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, Select};
use tokio_util::sync::CancellationToken;
use zipweather_core::{
    Config, LocalityBackend, LookupResult, Orchestrator, PostalCode, RequestContext, provider,
    server,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "zipweather", version, about = "Weather by Brazilian postal code")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the locality hop (postal code -> locality).
    ServeLocality {
        /// Listen address; defaults to the configured one.
        #[arg(long)]
        addr: Option<SocketAddr>,
    },

    /// Run the weather hop (postal code -> temperatures).
    ServeWeather {
        /// Listen address; defaults to the configured one.
        #[arg(long)]
        addr: Option<SocketAddr>,
    },

    /// Look up the current weather for a postal code without running a server.
    Lookup {
        /// 8-digit postal code, e.g. 01001000.
        postal_code: String,

        /// Print the raw JSON payload instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Configure the weather API key and locality backend.
    Configure,
}

impl Command {
    /// Service name reported in traces.
    pub fn service_name(&self) -> &'static str {
        match self {
            Command::ServeLocality { .. } => "service-a-zipcode",
            Command::ServeWeather { .. } => "service-b-weather",
            Command::Lookup { .. } | Command::Configure => "zipweather-cli",
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::ServeLocality { addr } => {
                let config = Config::load()?;
                let addr = addr.unwrap_or(config.server.locality_addr);
                let shutdown = CancellationToken::new();
                server::shutdown_signal(shutdown.clone());

                let router = server::locality_hop(&config, &provider::http_client()?, &shutdown);
                server::serve(server::bind(addr).await?, router, shutdown).await
            }
            Command::ServeWeather { addr } => {
                let config = Config::load()?;
                let addr = addr.unwrap_or(config.server.weather_addr);
                let shutdown = CancellationToken::new();
                server::shutdown_signal(shutdown.clone());

                let router = server::weather_hop(&config, &provider::http_client()?, &shutdown)?;
                server::serve(server::bind(addr).await?, router, shutdown).await
            }
            Command::Lookup { postal_code, json } => lookup(&postal_code, json).await,
            Command::Configure => configure(),
        }
    }
}

async fn lookup(raw: &str, json: bool) -> anyhow::Result<()> {
    let postal_code =
        PostalCode::new(raw).with_context(|| format!("'{raw}' is not a valid postal code"))?;

    let config = Config::load()?;
    let http = provider::http_client()?;
    let orchestrator = Orchestrator::new(
        provider::locality_resolver_from_config(&config, &http)?,
        provider::weather_resolver_from_config(&config, &http)?,
    );

    let ctx = RequestContext::new().with_timeout(config.outbound.timeout());
    let result = orchestrator.lookup(&ctx, &postal_code).await.inspect_err(|err| {
        tracing::debug!(%postal_code, error = ?err, "lookup failed");
    })?;
    tracing::debug!(%postal_code, city = %result.city, "lookup finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&result).context("Failed to encode result")?);
    } else {
        print_summary(&postal_code, &result);
    }

    Ok(())
}

fn print_summary(postal_code: &PostalCode, result: &LookupResult) {
    println!("{} ({postal_code})", result.city);
    println!("  {:.1} °C", result.temp_c);
    println!("  {:.1} °F", result.temp_f);
    println!("  {:.2} K", result.temp_k);
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load_file()?;

    let api_key = Password::new("WeatherAPI.com API key:")
        .without_confirmation()
        .prompt()
        .context("API key prompt cancelled")?;
    if !api_key.trim().is_empty() {
        config.set_weather_api_key(api_key.trim().to_string());
    }

    let current = config.locality_backend()?;
    let mut options = LocalityBackend::all().to_vec();
    options.sort_by_key(|b| *b != current);
    let backend = Select::new("Resolve localities via:", options)
        .prompt()
        .context("Backend prompt cancelled")?;
    config.set_locality_backend(backend);

    config.save()?;
    let path = Config::config_file_path()?;
    tracing::info!(path = %path.display(), %backend, "configuration saved");
    println!("Configuration saved to {}", path.display());

    Ok(())
}
