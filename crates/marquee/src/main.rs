//! Marquee - Entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use marquee::{build_server, InMemoryMovieService};
use marquee_config::{ConfigLoader, MarqueeConfig};
use marquee_telemetry::init_telemetry;
use tracing::{error, info};

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "MARQUEE";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
    /// Start from development defaults.
    dev: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;
        let mut dev = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--dev" => dev = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("marquee {}", marquee::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config, dev }
    }
}

fn print_help() {
    println!(
        r"Marquee - Movie catalogue service

USAGE:
    marquee [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
        --dev              Start from development defaults (static dev token, pretty logs)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    MARQUEE__<SECTION>__<KEY>    Override any configuration key, for example:
    MARQUEE__SERVER__HTTP_ADDR           Listen address (default: 0.0.0.0:8080)
    MARQUEE__AUTH__JWT__PUBLIC_KEY       Hex-encoded Ed25519 public key
    MARQUEE__TELEMETRY__LOGGING__LEVEL   Log level (default: info)
    MARQUEE__ROUTES__GUARD_REPLACE       Require auth on PATCH (default: false)

A .env file in the working directory is read before the environment.

EXAMPLES:
    # Run with configuration file
    marquee --config /etc/marquee/marquee.toml

    # Run locally with the static development token
    marquee --dev
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<MarqueeConfig> {
    let loader = if args.dev {
        ConfigLoader::new().with_development()
    } else {
        ConfigLoader::new().with_production()
    };

    let loader = match &args.config {
        Some(path) => loader
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => loader,
    };

    loader
        .with_dotenv()?
        .with_env_prefix(ENV_PREFIX)
        .load()
        .context("invalid configuration")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(
        &config.telemetry.log_config(),
        &config.telemetry.metrics_config(),
    ) {
        eprintln!("Failed to initialize telemetry: {e}");
        std::process::exit(1);
    }

    info!(
        version = marquee::VERSION,
        service = %config.telemetry.service_name,
        environment = %config.telemetry.environment,
        "starting marquee"
    );

    let server = match build_server(&config, Arc::new(InMemoryMovieService::new())) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to build server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
