use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tracing::{info, warn};

use nexus::{
    authority::{Authorities, TablePaths},
    config::{self, AppConfig},
    db, logging,
    metrics::Metrics,
    middleware::recovery,
    routes,
    state::AppState,
    store::SqliteCharacterStore,
};

#[derive(Debug, Parser)]
#[command(name = "nexus", version, about)]
struct Args {
    /// Configuration file (TOML), layered over the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run in debug mode. Do not use in production.
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration (embedded defaults -> nexus.toml -> --config/NEXUS_CONFIG -> env)
    let mut app_cfg = config::load(args.config.as_deref())?;
    if args.debug {
        app_cfg.server.debug = true;
    }

    let threads = match app_cfg.server.max_threads {
        0 => num_cpus::get(),
        n => n,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads)
        .enable_all()
        .build()?;
    runtime.block_on(run(app_cfg, threads))
}

async fn run(app_cfg: AppConfig, threads: usize) -> anyhow::Result<()> {
    // Logging (stdout + daily file rotation under log.dir, pruned to log.max_files)
    let _log_guards = logging::init(&app_cfg.log)?;
    recovery::install_panic_hook();

    for warning in config::startup_warnings(&app_cfg) {
        warn!("{}", warning);
    }
    info!("Using {} worker threads", threads);

    // Authority tables are loaded before anything can be served
    let metrics = Metrics::new();
    let authorities = Authorities::new(TablePaths::from_config(&app_cfg), metrics.clone());
    for outcome in authorities.reload_all() {
        if outcome.loaded {
            info!("Loaded {} entries into {}", outcome.entries, outcome.table);
        }
    }
    #[cfg(unix)]
    spawn_reload_on_hangup(authorities.clone())?;

    // Prepare data dir and database
    let db_url = &app_cfg.database.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }
    info!("Connecting to database");
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;
    db::init_db(&pool).await?;

    // Limiter and policy are built here, once, and injected into the gates
    let state = AppState::new(
        Arc::new(SqliteCharacterStore::new(pool)),
        app_cfg.clone(),
        authorities,
        metrics,
    )?;
    if app_cfg.rate_limit.enable {
        info!(
            "Rate limiting to {} requests per {}s",
            app_cfg.rate_limit.max_requests, app_cfg.rate_limit.window_secs
        );
    }
    let app = routes::build_router(state);

    let port: u16 = app_cfg.server.port;
    let host: String = app_cfg.server.host.clone();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Nexus listening on http://{}{}", listener.local_addr()?, app_cfg.server.root_path);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(authorities: Authorities) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hup.recv().await.is_some() {
            info!("SIGHUP received, reloading authority tables");
            let tables = authorities.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || tables.reload_all()).await {
                warn!("Authority table reload task failed: {}", e);
            }
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
