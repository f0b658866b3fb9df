use vaultwatch::config::{Config, LoggingConfig};
use vaultwatch::explorer::{BlockRangeFetcher, ExplorerClient};
use vaultwatch::notify::{LogNotifier, Notifier, TelegramNotifier};
use vaultwatch::onchain::{abi, BalanceResolver, VaultReader};
use vaultwatch::reconcile::ReconciliationEngine;
use vaultwatch::scheduler::{DailySchedule, TickSchedule};
use vaultwatch::store::{EmptySnapshot, HttpSnapshot, LedgerStore, SnapshotSource};
use vaultwatch::watcher::Watcher;

use chrono::Local;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config_path = std::env::var("VAULTWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("vaultwatch.toml"));
    let (config, from_file) = if config_path.exists() {
        (Config::load(&config_path)?, true)
    } else {
        (Config::from_env(), false)
    };

    init_logging(&config.logging)?;
    if from_file {
        info!(path = %config_path.display(), "config loaded");
    } else {
        info!(path = %config_path.display(), "no config file found, using env-only config");
    }
    config.validate()?;

    info!("vaultwatch v{} starting", env!("CARGO_PKG_VERSION"));

    for (signature, ok) in abi::verify_selectors() {
        if !ok {
            warn!(signature = %signature, "selector constant does not match its signature");
        }
    }
    if config.explorer.api_key.is_empty() {
        warn!("EXPLORER_API_KEY not set, explorer requests will be rate limited");
    }

    let retry = config.retry.policy();

    // --- Ledger ---
    let store = LedgerStore::new(&config.ledger.path);
    let bootstrap: Box<dyn SnapshotSource> = if config.ledger.bootstrap_url.is_empty() {
        Box::new(EmptySnapshot)
    } else {
        Box::new(HttpSnapshot::new(&config.ledger.bootstrap_url))
    };
    let ledger = store.load(bootstrap.as_ref(), &retry).await?;

    // --- Reconciliation ---
    let explorer = ExplorerClient::new(&config.explorer)?;
    let chain = VaultReader::connect(&config.chain, &config.explorer.vault_address)?;
    let engine = ReconciliationEngine::new(
        BlockRangeFetcher::new(explorer, retry.clone()),
        BalanceResolver::new(chain, config.chain.token_decimals, retry.clone()),
        config.explorer.deposit_selector.clone(),
        config.explorer.withdrawal_selector.clone(),
    );

    // --- Notifications ---
    let notifier: Box<dyn Notifier> = if config.has_telegram() {
        info!(chat = %config.telegram.chat_id, "telegram notifications enabled");
        Box::new(TelegramNotifier::new(&config.telegram, retry.clone())?)
    } else {
        warn!("telegram not configured, alerts go to the log only");
        Box::new(LogNotifier)
    };

    // --- Schedule ---
    let schedule = &config.schedule;
    let daily = DailySchedule::new(schedule.daily_report_time()?, Local::now().naive_local());
    let passes = TickSchedule::new(schedule.reconcile_every_ticks);
    let tick = Duration::from_millis(schedule.tick_ms);

    let mut watcher = Watcher::new(ledger, store, engine, notifier, config.alerts.clone());
    watcher.run(tick, passes, daily).await;

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let builder = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            if config.json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        None => {
            if config.json {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(env_filter)
                    .init();
            } else {
                tracing_subscriber::fmt().with_env_filter(env_filter).init();
            }
        }
    }
    Ok(())
}
