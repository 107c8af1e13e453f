use actix_web::{middleware::Logger, App, HttpServer};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use tokensync::config::{Config, LoggingConfig};
use tokensync::oauth::{
    JobScheduler, MemoryOAuthStore, OAuthService, OAuthStore, RefreshScheduler, TokenEndpointValidator,
    TokenRequestSpec,
};
use tokensync::web::configure_oauth_api;
use tokensync::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Validate the token request described by a JSON file once and exit
    #[arg(long, value_name = "FILE")]
    validate: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config, cli.host, cli.port).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging)?;
    info!("Starting tokensync v{}", tokensync::VERSION);

    if let Some(spec_path) = cli.validate {
        return run_validate_mode(&config, &spec_path).await;
    }

    run_http_server_mode(config).await
}

/// Run a single validation and print the verdict
async fn run_validate_mode(config: &Config, spec_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(spec_path).await?;
    let spec: TokenRequestSpec = serde_json::from_str(&content)?;
    let validator = TokenEndpointValidator::from_config(config)?;

    match validator.validate(&spec, chrono::Utc::now()).await {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Err(e) => {
            error!("Validation of {} failed: {}", spec_path.display(), e);
            Err(e.into())
        }
    }
}

/// Run the management API with background refresh
async fn run_http_server_mode(config: Config) -> Result<()> {
    let store: Arc<dyn OAuthStore> = match &config.storage.path {
        Some(path) => {
            info!("Using OAuth configuration snapshot at {}", path.display());
            Arc::new(MemoryOAuthStore::open(path).await?)
        }
        None => {
            warn!("No storage path configured; OAuth configurations will not survive a restart");
            Arc::new(MemoryOAuthStore::new())
        }
    };

    let validator = TokenEndpointValidator::from_config(&config)?;
    let scheduler = Arc::new(RefreshScheduler::new(validator.clone(), config.refresh.clone()));
    let service = Arc::new(OAuthService::new(
        store,
        Arc::clone(&scheduler) as Arc<dyn JobScheduler>,
        validator,
    ));

    if config.refresh.schedule_on_startup {
        let scheduled = service.schedule_stored().await?;
        info!("Scheduled {} refresh jobs from storage", scheduled);
    }

    let bind_addr = (config.server.host.clone(), config.server.port);
    info!("HTTP server will bind to {}:{}", bind_addr.0, bind_addr.1);

    let server_service = Arc::clone(&service);
    let result = HttpServer::new(move || {
        let service = Arc::clone(&server_service);
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| configure_oauth_api(cfg, service))
    })
    .bind(bind_addr)?
    .run()
    .await;

    scheduler.shutdown().await;
    result?;
    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}
