//! gatelink command line.
//!
//! ```text
//! gatelink [--config FILE] listen                      login, log events until signal
//! gatelink [--config FILE] gateway                     print the gateway endpoint
//! gatelink [--config FILE] request METHOD PATH [--body JSON]
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use gatelink::config::loader::load_config;
use gatelink::gateway::{ChannelObserver, GatewayEvent};
use gatelink::lifecycle::shutdown_signal;
use gatelink::observability::{logging, metrics};
use gatelink::rest::{ApiRequest, RequestDispatcher, ResponseBody};
use gatelink::Client;

#[derive(Parser)]
#[command(name = "gatelink")]
#[command(about = "REST and gateway client for the chat platform", long_about = None)]
struct Cli {
    /// TOML configuration file. `GATELINK_TOKEN` overrides its token.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and log gateway events until Ctrl+C or SIGTERM
    Listen,
    /// Print the discovered gateway endpoint
    Gateway,
    /// Send one REST request and print the response
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,
        /// Path below the API base URL, e.g. /users/@me
        path: String,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gatelink starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Listen => {
            let (observer, mut events) = ChannelObserver::new();
            let client = Client::builder(&config).observer(observer).build()?;
            client.login().await?;

            let signal = shutdown_signal();
            tokio::pin!(signal);
            loop {
                tokio::select! {
                    _ = &mut signal => break,
                    event = events.recv() => match event {
                        Some(event) => log_event(&event),
                        None => break,
                    },
                }
            }

            client.destroy().await;
        }
        Commands::Gateway => {
            let api = RequestDispatcher::from_config(&config)?;
            println!("{}", api.gateway_url().await?);
        }
        Commands::Request { method, path, body } => {
            let method = Method::from_str(&method.to_uppercase())?;
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.with_body(serde_json::from_str::<Value>(&body)?);
            }

            let api = RequestDispatcher::from_config(&config)?;
            match api.submit(request).await? {
                ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                ResponseBody::Text(text) => println!("{text}"),
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_event(event: &GatewayEvent) {
    match event {
        GatewayEvent::StateChanged { from, to } => {
            tracing::info!(%from, %to, "Gateway state changed");
        }
        GatewayEvent::Dispatch(dispatch) => {
            tracing::info!(event = %dispatch.name, sequence = ?dispatch.sequence, "Dispatch");
        }
        GatewayEvent::Error(error) => {
            tracing::warn!(error = %error, "Gateway error");
        }
    }
}
