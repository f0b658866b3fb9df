//! Main loop: reconcile, persist, notify.
//!
//! The watcher owns the in-memory ledger for the whole process lifetime.
//! A pass is awaited to completion before the next tick is taken, so the
//! ledger is only ever borrowed by one pass at a time.

use crate::config::AlertConfig;
use crate::explorer::ExplorerApi;
use crate::ledger::Ledger;
use crate::notify::Notifier;
use crate::onchain::ChainReader;
use crate::reconcile::{PassOutcome, ReconcileError, ReconciliationEngine};
use crate::report;
use crate::scheduler::{DailySchedule, TickSchedule};
use crate::store::{LedgerStore, StoreError};

use chrono::Local;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("failed to persist ledger: {0}")]
    Store(#[from] StoreError),
}

pub struct Watcher<X, C, N> {
    ledger: Ledger,
    store: LedgerStore,
    engine: ReconciliationEngine<X, C>,
    notifier: N,
    style: AlertConfig,
}

impl<X: ExplorerApi, C: ChainReader, N: Notifier> Watcher<X, C, N> {
    pub fn new(
        ledger: Ledger,
        store: LedgerStore,
        engine: ReconciliationEngine<X, C>,
        notifier: N,
        style: AlertConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            engine,
            notifier,
            style,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// One pass: reconcile, save, then send alerts for notable changes.
    ///
    /// Nothing is sent unless the ledger was saved first. If the save fails
    /// the in-memory ledger keeps the update and the next pass saves it.
    pub async fn reconcile_once(&mut self) -> Result<PassOutcome, WatchError> {
        let outcome = self.engine.run(&mut self.ledger).await?;
        self.store.save(&self.ledger)?;

        if !outcome.skipped_ranges.is_empty() {
            warn!(
                ranges = ?outcome.skipped_ranges,
                "pass skipped ranges with undecodable explorer data"
            );
        }

        if !outcome.skipped_addresses.is_empty() {
            warn!(
                addresses = ?outcome.skipped_addresses,
                "pass skipped addresses whose balance could not be resolved"
            );
        }

        for alert in outcome.changes.iter().filter_map(|c| c.alert()) {
            info!(
                address = %alert.address,
                kind = ?alert.kind,
                amount = %alert.amount,
                difference = %alert.difference,
                "alert"
            );
            if let Err(e) = self.notifier.send(&alert.render(&self.style)).await {
                warn!(address = %alert.address, error = %e, "failed to send alert");
            }
        }
        Ok(outcome)
    }

    /// Send the stake summary and the whale list.
    pub async fn daily_report(&self) {
        let messages = [
            report::stake_summary(&self.ledger, &self.style),
            report::whale_list(&self.ledger, &self.style),
        ];
        for text in messages {
            if let Err(e) = self.notifier.send(&text).await {
                warn!(error = %e, "failed to send daily report");
            }
        }
        info!(
            stakers = self.ledger.metadata.active_user_count,
            total_staked = %self.ledger.metadata.total_staked,
            "daily report sent"
        );
    }

    async fn pass(&mut self) {
        match self.reconcile_once().await {
            Ok(outcome) => info!(
                from = outcome.from_block,
                to = outcome.to_block,
                transactions = outcome.transactions,
                addresses = outcome.addresses,
                changes = outcome.changes.len(),
                "pass complete"
            ),
            Err(e) => error!(error = %e, "pass failed"),
        }
    }

    /// Run until Ctrl+C.
    pub async fn run(&mut self, tick: Duration, passes: TickSchedule, daily: DailySchedule) {
        self.run_until(tick, passes, daily, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// One pass at startup, then tick until `shutdown` resolves.
    pub async fn run_until<F: Future<Output = ()>>(
        &mut self,
        tick: Duration,
        mut passes: TickSchedule,
        mut daily: DailySchedule,
        shutdown: F,
    ) {
        tokio::pin!(shutdown);

        info!(
            checkpoint = self.ledger.checkpoint(),
            next_report = %daily.next_due(),
            "watcher started"
        );
        self.pass().await;

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if passes.tick() {
                        self.pass().await;
                    }
                    if daily.poll(Local::now().naive_local()) {
                        self.daily_report().await;
                    }
                }
                _ = &mut shutdown => {
                    info!(checkpoint = self.ledger.checkpoint(), "shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::{BlockRangeFetcher, FetchError, RawTransaction, TxListPage};
    use crate::notify::NotifyError;
    use crate::onchain::{BalanceResolver, ResolveError};
    use crate::retry::RetryPolicy;
    use alloy::primitives::{Address, U256};
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    const DEPOSIT: &str = "0x0efe6a8b";
    const WITHDRAW: &str = "0x7ac92456";

    fn addr(n: u8) -> String {
        format!("0x{:040x}", n)
    }

    struct FakeExplorer {
        txs: Vec<RawTransaction>,
    }

    #[async_trait]
    impl ExplorerApi for FakeExplorer {
        async fn txlist(&self, start: u64, end: u64) -> Result<TxListPage, FetchError> {
            Ok(TxListPage::Transactions(
                self.txs
                    .iter()
                    .filter(|tx| tx.block_number >= start && tx.block_number <= end)
                    .cloned()
                    .collect(),
            ))
        }
    }

    /// Head advances by one on every read so repeated passes see new blocks.
    struct FakeChain {
        head: AtomicU64,
        balances: HashMap<Address, U256>,
        fail: bool,
    }

    #[async_trait]
    impl ChainReader for FakeChain {
        async fn block_number(&self) -> Result<u64, ResolveError> {
            Ok(self.head.fetch_add(1, Ordering::SeqCst))
        }

        async fn staked_raw(&self, user: Address) -> Result<U256, ResolveError> {
            if self.fail {
                return Err(ResolveError::Rpc(format!("node unreachable for {user}")));
            }
            Ok(self.balances.get(&user).copied().unwrap_or(U256::ZERO))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        reject: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.reject {
                return Err(NotifyError::Rejected("bot was blocked".to_string()));
            }
            Ok(())
        }
    }

    fn tokens(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn watcher(
        dir: &tempfile::TempDir,
        prior: Ledger,
        fail_resolve: bool,
        notifier: RecordingNotifier,
    ) -> Watcher<FakeExplorer, FakeChain, RecordingNotifier> {
        let txs = vec![
            RawTransaction {
                from: addr(1),
                input: format!("{DEPOSIT}00"),
                block_number: 150,
            },
            RawTransaction {
                from: addr(2),
                input: format!("{WITHDRAW}00"),
                block_number: 160,
            },
            RawTransaction {
                from: addr(3),
                input: format!("{DEPOSIT}00"),
                block_number: 170,
            },
        ];
        let mut balances = HashMap::new();
        balances.insert(Address::from_str(&addr(1)).unwrap(), tokens(35_000));
        balances.insert(Address::from_str(&addr(3)).unwrap(), tokens(200));
        let chain = FakeChain {
            head: AtomicU64::new(200),
            balances,
            fail: fail_resolve,
        };
        let retry = RetryPolicy::capped(Duration::from_secs(1), 1);
        let engine = ReconciliationEngine::new(
            BlockRangeFetcher::new(FakeExplorer { txs }, retry.clone()),
            BalanceResolver::new(chain, 18, retry),
            DEPOSIT,
            WITHDRAW,
        );
        let store = LedgerStore::new(dir.path().join("stakers.json"));
        Watcher::new(prior, store, engine, notifier, AlertConfig::default())
    }

    fn prior_ledger() -> Ledger {
        let mut ledger = Ledger::default();
        ledger.upsert(&addr(2), Decimal::from(40_000));
        ledger.finalize(100);
        ledger
    }

    #[tokio::test]
    async fn test_pass_saves_then_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let mut w = watcher(&dir, prior_ledger(), false, notifier.clone());

        let outcome = w.reconcile_once().await.unwrap();
        assert_eq!(outcome.from_block, 101);
        assert_eq!(outcome.to_block, 200);
        assert_eq!(outcome.addresses, 3);

        let saved = LedgerStore::new(dir.path().join("stakers.json"))
            .read_local()
            .unwrap();
        assert_eq!(&saved, w.ledger());
        assert_eq!(saved.checkpoint(), 200);
        assert_eq!(saved.metadata.total_staked, Decimal::from(35_200));
        assert!(saved.amount_of(&addr(2)).is_none());

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|m| m.starts_with("❇️🐳❗❗") && m.contains("New Vault User!")));
        assert!(sent
            .iter()
            .any(|m| m.starts_with("🚨🐳❗❗") && m.contains("Withdraw _40,000 XVS_")));
    }

    #[tokio::test]
    async fn test_notify_failure_does_not_fail_pass() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier {
            reject: true,
            ..Default::default()
        };
        let mut w = watcher(&dir, prior_ledger(), false, notifier.clone());
        assert!(w.reconcile_once().await.is_ok());
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
        assert_eq!(w.ledger().checkpoint(), 200);
    }

    #[tokio::test]
    async fn test_failed_pass_saves_and_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let prior = prior_ledger();
        let mut w = watcher(&dir, prior.clone(), true, notifier.clone());

        assert!(matches!(
            w.reconcile_once().await,
            Err(WatchError::Reconcile(_))
        ));
        assert_eq!(w.ledger(), &prior);
        assert!(!dir.path().join("stakers.json").exists());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let mut w = watcher(&dir, prior_ledger(), false, notifier.clone());
        w.reconcile_once().await.unwrap();
        let before = w.ledger().clone();

        let outcome = w.reconcile_once().await.unwrap();
        assert_eq!(outcome.from_block, 201);
        assert!(outcome.changes.is_empty());
        assert_eq!(w.ledger().entries, before.entries);
        assert_eq!(w.ledger().checkpoint(), 201);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_daily_report_sends_summary_and_whales() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let mut w = watcher(&dir, prior_ledger(), false, notifier.clone());
        w.reconcile_once().await.unwrap();
        notifier.sent.lock().unwrap().clear();

        w.daily_report().await;
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("🔒 *XVS Staked:* _35,200_ XVS"));
        assert!(sent[1].contains("_35,000 XVS_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_passes_on_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let mut w = watcher(&dir, prior_ledger(), false, notifier.clone());
        let far_away = Local::now().naive_local() + chrono::Duration::hours(1);
        let daily = DailySchedule::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            far_away,
        );

        w.run_until(
            Duration::from_secs(1),
            TickSchedule::new(10),
            daily,
            tokio::time::sleep(Duration::from_millis(25_500)),
        )
        .await;

        // Startup pass plus passes at ticks 10 and 20; each read advances the head.
        assert_eq!(w.ledger().checkpoint(), 202);
    }
}
