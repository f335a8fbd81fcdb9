use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::config_loader::load_config;
use crate::feature_adapter::RawInput;
use crate::feature_schema::FeatureSpec;
use crate::pipeline::Pipeline;
use crate::telemetry::init_tracing;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::sync::Arc;

/// Top-level CLI interface for pirisk
#[derive(Parser)]
#[command(
    name = "pirisk",
    version,
    about = "Pressure-injury risk prediction for ICU patients (XGBoost + TreeSHAP)"
)]
pub struct Cli {
    /// Config file (defaults to ./pirisk.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the form page and the JSON API
    Serve {
        /// Host/IP to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
    },

    /// Score one submission read as JSON from a file or `-` for stdin
    Predict {
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Fill fields missing from the input with the configured defaults
        #[arg(long)]
        fill_defaults: bool,
    },

    /// Print the feature schema the model expects
    Schema {
        /// Print the built-in layout without loading the model
        #[arg(long)]
        canonical: bool,
    },

    /// Print the effective configuration after all layers are merged
    Config,
}

pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.log_filter)?;

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port),
        Commands::Predict {
            input,
            fill_defaults,
        } => predict(&config, &input, fill_defaults),
        Commands::Schema { canonical } => {
            let spec = if canonical {
                FeatureSpec::canonical()
            } else {
                Pipeline::from_config(&config)?.spec().clone()
            };
            println!("{}", serde_json::to_string_pretty(&spec.info())?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config)
        .with_context(|| format!("cannot start without model {}", config.model_path))?;
    let app = crate::web::build_router(Arc::new(state));
    let addr = config.server.bind_addr();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build Tokio runtime")?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!("HTTP server listening on http://{addr}");
        axum::serve(listener, app).await.context("server error")
    })
}

fn predict(config: &AppConfig, input: &str, fill_defaults: bool) -> anyhow::Result<()> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };

    let mut raw: RawInput =
        serde_json::from_str(&text).with_context(|| format!("{input} is not a JSON object"))?;

    let pipeline = Pipeline::from_config(config)?;

    if fill_defaults {
        config.defaults.fill_missing(&mut raw, pipeline.spec());
    }

    let assessment = pipeline.assess(&raw)?;
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}
