mod config;

use std::{sync::Arc, time::Duration};

use {
    clap::Parser,
    sqlx::sqlite::SqliteConnectOptions,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    ferrybot_relay::{
        AuditLog, NoticeRender, RelayRouter, RelayTransport, RouterConfig, ThreadRegistry,
        ThreadStore,
    },
    ferrybot_storage::{SqliteAuditLog, SqliteThreadStore},
    ferrybot_telegram::{TelegramNotices, TelegramTransport},
};

#[derive(Parser)]
#[command(name = "ferrybot", about = "Telegram support relay bot")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Config file path (default: ./ferrybot.toml, then the user config dir).
    #[arg(long, env = "FERRYBOT_CONFIG")]
    config: Option<std::path::PathBuf>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let cfg = config::discover_and_load(cli.config.as_deref())?;
    cfg.telegram.validate()?;

    let options = SqliteConnectOptions::new()
        .filename(&cfg.storage.database_path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await?;
    ferrybot_storage::init_schema(&pool).await?;
    info!(path = %cfg.storage.database_path.display(), "database ready");

    let store: Arc<dyn ThreadStore> = Arc::new(SqliteThreadStore::new(pool.clone()));
    let registry = Arc::new(ThreadRegistry::new(store));
    let audit: Arc<dyn AuditLog> = Arc::new(SqliteAuditLog::new(pool));
    let notices = Arc::new(TelegramNotices);

    let (bot, username) = ferrybot_telegram::connect(&cfg.telegram).await?;
    let transport: Arc<dyn RelayTransport> =
        Arc::new(TelegramTransport::new(bot.clone(), cfg.telegram.group_id));

    let mut router_config = RouterConfig::new(cfg.telegram.group_id);
    router_config.poll_interval = Duration::from_secs(cfg.relay.poll_interval_secs);
    router_config.max_wait = Duration::from_secs(cfg.relay.max_wait_secs);
    let router = RelayRouter::new(
        registry,
        transport,
        Arc::clone(&notices) as Arc<dyn NoticeRender>,
        router_config,
    );

    let cancel =
        ferrybot_telegram::start_polling(bot, username, router.clone(), notices, Some(audit));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received ctrl-c, shutting down"),
        () = cancel.cancelled() => info!("polling loop stopped, shutting down"),
    }

    cancel.cancel();
    router.shutdown();
    Ok(())
}
