//! Service configuration: `vaultwatch.toml` with secrets overlaid from the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    /// Etherscan-compatible API endpoint (BscScan by default)
    #[serde(default = "default_explorer_url")]
    pub api_url: String,
    /// API key - loaded from env EXPLORER_API_KEY
    #[serde(default)]
    pub api_key: String,
    /// The staking vault whose transactions are scanned
    #[serde(default = "default_vault_address")]
    pub vault_address: String,
    #[serde(default = "default_deposit_selector")]
    pub deposit_selector: String,
    #[serde(default = "default_withdrawal_selector")]
    pub withdrawal_selector: String,
    /// Max results per txlist request (the explorer's result window)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// HTTP JSON-RPC endpoint - overridable by env CHAIN_RPC_URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Reward token the vault pool is keyed by
    #[serde(default = "default_reward_token")]
    pub reward_token: String,
    #[serde(default)]
    pub pool_id: u64,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
    /// Remote snapshot used when the local ledger is missing or unreadable.
    /// Empty disables the fallback (start from an empty ledger).
    #[serde(default = "default_bootstrap_url")]
    pub bootstrap_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_url")]
    pub api_url: String,
    /// Bot token - loaded from env TELEGRAM_BOT_TOKEN
    #[serde(default)]
    pub bot_token: String,
    /// Chat id - loaded from env TELEGRAM_CHAT_ID
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,
    /// Address links in alerts point at `{profile_url}{address}`
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Base tick of the main loop.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Reconciliation runs every N base ticks.
    #[serde(default = "default_reconcile_every_ticks")]
    pub reconcile_every_ticks: u32,
    /// Local time of day for the daily report, "HH:MM".
    #[serde(default = "default_daily_report_at")]
    pub daily_report_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,
    /// None = retry forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Optional log file (appended). Stdout when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_explorer_url() -> String {
    "https://api.bscscan.com/api".to_string()
}
fn default_vault_address() -> String {
    "0x051100480289e704d20e9db4804837068f3f9204".to_string()
}
fn default_deposit_selector() -> String {
    crate::onchain::abi::DEPOSIT_SELECTOR.to_string()
}
fn default_withdrawal_selector() -> String {
    crate::onchain::abi::WITHDRAWAL_SELECTOR.to_string()
}
fn default_page_size() -> u32 {
    10_000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_rpc_url() -> String {
    "https://bsc-dataseed.binance.org".to_string()
}
fn default_reward_token() -> String {
    "0xcf6bb5389c92bdda8a3747ddb454cb7a64626c63".to_string()
}
fn default_token_decimals() -> u32 {
    18
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("xvs_vault_stakers.json")
}
fn default_bootstrap_url() -> String {
    "https://raw.githubusercontent.com/J1Mtonic/VenusXVSVaultBot/main/xvs_vault_stakers.json"
        .to_string()
}
fn default_telegram_url() -> String {
    "https://api.telegram.org".to_string()
}
fn default_token_symbol() -> String {
    "XVS".to_string()
}
fn default_profile_url() -> String {
    "https://debank.com/profile/".to_string()
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_reconcile_every_ticks() -> u32 {
    10
}
fn default_daily_report_at() -> String {
    "07:30".to_string()
}
fn default_retry_delay_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_url: default_explorer_url(),
            api_key: String::new(),
            vault_address: default_vault_address(),
            deposit_selector: default_deposit_selector(),
            withdrawal_selector: default_withdrawal_selector(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            reward_token: default_reward_token(),
            pool_id: 0,
            token_decimals: default_token_decimals(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            bootstrap_url: default_bootstrap_url(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_telegram_url(),
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            token_symbol: default_token_symbol(),
            profile_url: default_profile_url(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            reconcile_every_ticks: default_reconcile_every_ticks(),
            daily_report_at: default_daily_report_at(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_retry_delay_secs(),
            max_attempts: None,
            jitter_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.delay_secs),
            max_attempts: self.max_attempts,
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

impl ScheduleConfig {
    pub fn daily_report_time(&self) -> Result<chrono::NaiveTime, ConfigError> {
        chrono::NaiveTime::parse_from_str(&self.daily_report_at, "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                field: "schedule.daily_report_at",
                reason: e.to_string(),
            }
        })
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables for secrets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Load a default config with env-only secrets (no file needed).
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    // Secrets never need to live in the config file.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("EXPLORER_API_KEY") {
            self.explorer.api_key = key;
        }
        if let Ok(url) = std::env::var("CHAIN_RPC_URL") {
            self.chain.rpc_url = url;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(chat) = std::env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat;
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, selector) in [
            ("explorer.deposit_selector", &self.explorer.deposit_selector),
            ("explorer.withdrawal_selector", &self.explorer.withdrawal_selector),
        ] {
            let hex = selector.strip_prefix("0x").unwrap_or(selector);
            if hex.len() != 8 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected 4-byte hex selector, got {selector:?}"),
                });
            }
        }
        if self.schedule.reconcile_every_ticks == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.reconcile_every_ticks",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.chain.token_decimals > 28 {
            return Err(ConfigError::Invalid {
                field: "chain.token_decimals",
                reason: "decimal scale above 28 is not representable".to_string(),
            });
        }
        self.schedule.daily_report_time()?;
        Ok(())
    }

    pub fn has_telegram(&self) -> bool {
        !self.telegram.bot_token.is_empty() && !self.telegram.chat_id.is_empty()
    }
}
