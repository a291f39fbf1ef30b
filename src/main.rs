use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coursegate::cli::{
    AdminCommands, CatalogCommands, run_catalog_import, run_info, run_init,
};
use coursegate::config::ServerConfig;
use coursegate::notify::{LogNotifier, Notifier, Outbox, SpoolNotifier};
use coursegate::server::{AppState, create_router};
use coursegate::store::{SqliteStore, Store};

const NOTIFY_RETRY_INTERVAL: Duration = Duration::from_secs(60);
const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(name = "coursegate")]
#[command(about = "A course-delivery server with manual payment review", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to (overrides the config file)
        #[arg(long, env = "COURSEGATE_HOST")]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(long, short, env = "COURSEGATE_PORT")]
        port: Option<u16>,

        /// Data directory for the database, uploads and config file
        #[arg(long, default_value = "./data", env = "COURSEGATE_DATA_DIR")]
        data_dir: String,

        /// Config file. Defaults to <data-dir>/coursegate.toml when present.
        #[arg(long, env = "COURSEGATE_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn load_config(
    host: Option<String>,
    port: Option<u16>,
    data_dir: String,
    config: Option<PathBuf>,
) -> anyhow::Result<ServerConfig> {
    let data_dir = PathBuf::from(data_dir);

    let mut config = match config {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::load_or_default(&ServerConfig::default_config_path(&data_dir))?,
    };

    config.data_dir = data_dir;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    config.validate()?;
    Ok(config)
}

fn build_notifier(config: &ServerConfig) -> Arc<dyn Notifier> {
    match &config.mail.spool_dir {
        Some(dir) => {
            info!("Spooling notifications to {}", dir.display());
            Arc::new(SpoolNotifier::new(dir.clone(), config.mail.from.clone()))
        }
        None => {
            info!("No mail spool configured, notifications will be logged");
            Arc::new(LogNotifier)
        }
    }
}

async fn sweep_expired_tokens(store: Arc<dyn Store>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(TOKEN_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let store = Arc::clone(&store);
        match tokio::task::spawn_blocking(move || store.delete_expired_tokens()).await {
            Ok(Ok(0)) => {}
            Ok(Ok(removed)) => info!("Removed {removed} expired tokens"),
            Ok(Err(e)) => warn!("Failed to remove expired tokens: {e}"),
            Err(e) => warn!("Token sweep task failed: {e}"),
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
        () = shutdown.cancelled() => {}
    }

    info!("Shutting down");
    shutdown.cancel();
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if !store.has_admin_user()? {
        bail!(
            "Server not initialized. Run 'coursegate admin init' first to create the database and admin account."
        );
    }

    let store: Arc<dyn Store> = Arc::new(store);
    let outbox = Arc::new(Outbox::new(
        Arc::clone(&store),
        build_notifier(&config),
        config.notice_settings(),
    ));

    let shutdown = CancellationToken::new();
    let dispatcher = tokio::spawn(Arc::clone(&outbox).run(NOTIFY_RETRY_INTERVAL, shutdown.clone()));
    let sweeper = tokio::spawn(sweep_expired_tokens(Arc::clone(&store), shutdown.clone()));

    let state = Arc::new(AppState::new(Arc::clone(&store), outbox, &config));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = dispatcher.await {
        warn!("Notification dispatcher ended abnormally: {e}");
    }
    if let Err(e) = sweeper.await {
        warn!("Token sweeper ended abnormally: {e}");
    }

    store.close()?;
    info!("Server stopped");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("coursegate=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                admin_email,
                admin_name,
                admin_password,
                non_interactive,
            } => {
                run_init(data_dir, admin_email, admin_name, admin_password, non_interactive)?;
            }
            AdminCommands::Info { data_dir, json } => {
                run_info(data_dir, json)?;
            }
            AdminCommands::Catalog { command } => match command {
                CatalogCommands::Import { data_dir, file } => {
                    run_catalog_import(data_dir, &file)?;
                }
            },
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            config,
        } => {
            let config = load_config(host, port, data_dir, config)?;
            run_serve(config).await?;
        }
    }

    Ok(())
}
