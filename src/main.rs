use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use gamedex::account::{AuthClient, Backend};
use gamedex::app::{App, AppEvent, Services};
use gamedex::catalog::CatalogClient;
use gamedex::config::Config;
use gamedex::preferences::PreferenceManager;
use gamedex::storage::{Database, DatabaseError};
use gamedex::ui;

/// Get the config directory path (~/.config/gamedex/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gamedex"))
}

#[derive(Parser, Debug)]
#[command(name = "gamedex", about = "Terminal video game catalog with wishlists and comments")]
struct Args {
    /// Config file (default: ~/.config/gamedex/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local database (default: ~/.config/gamedex/gamedex.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Drop cached game details before starting
    #[arg(long)]
    clear_cache: bool,
}

/// Logs go to a file because the TUI owns the terminal. Nothing is logged
/// unless RUST_LOG is set.
fn init_tracing(config_dir: &std::path::Path) -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let log_path = config_dir.join("gamedex.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // User-only access: the directory holds the last used email and the log
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(&config_dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                eprintln!(
                    "Warning: failed to set {} permissions to 0700: {e}",
                    config_dir.display()
                );
            }
        }
    }

    init_tracing(&config_dir)?;

    let config_path = args
        .config
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env();
    tracing::debug!(config = ?config, "Effective configuration");

    let db_path = args.db.unwrap_or_else(|| config_dir.join("gamedex.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of gamedex appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    if args.clear_cache {
        let stats = db.game_cache_stats().await.context("Failed to read cache")?;
        db.clear_game_cache().await.context("Failed to clear cache")?;
        println!("Cleared {} cached games.", stats.total_entries);
    }
    match db.purge_expired_games().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "Purged expired game cache entries"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge game cache"),
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent(concat!("gamedex/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let catalog = CatalogClient::new(
        http.clone(),
        &config.catalog_base_url,
        config.catalog_api_key(),
    )
    .context("Invalid catalog configuration")?;

    let auth = match config.backend() {
        Some((url, anon_key)) => {
            let backend =
                Backend::new(http, url, anon_key).context("Invalid backend configuration")?;
            Some(Arc::new(AuthClient::new(backend)))
        }
        None => {
            tracing::info!("No backend configured; accounts, wishlists and comments disabled");
            None
        }
    };
    let services = Services::new(Arc::new(catalog), auth);

    let prefs = match PreferenceManager::load(&config, &db).await {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load preferences, using config defaults");
            PreferenceManager::from_config(&config)
        }
    };
    if let Some(page_size) = prefs.page_size() {
        config.page_size = page_size;
    }

    let mut app = App::new(db, services, prefs, config.effective_page_size());

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
