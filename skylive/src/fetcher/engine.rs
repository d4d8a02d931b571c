//! Fetch orchestrator.
//!
//! The engine owns the fleet state and drives one tick at a time: pick
//! the due devices per provider, run every provider's fetch concurrently
//! against the shared per-tick budget, then fold the results back into
//! the state sequentially and publish fresh snapshots. Nothing but this
//! loop mutates the fleet state.
//!
//! Failure isolation: a provider's fetch never returns an error - it
//! records per-device and tick-level problems in its updates, and the
//! merge step turns those into counters and log lines. Only the account
//! store can fail a reconcile, and a failed reconcile keeps the previous
//! configuration.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sync::SyncCounter;
use super::updates::{due_devices, TrackerUpdates};
use crate::config::EngineConfig;
use crate::provider::{build_fetchers, AsyncHttpClient, ProviderFetcher};
use crate::state::{FleetState, Pilot, SnapshotPublisher, Tracker};
use crate::store::{AccountStore, PilotAccount, StoreError};
use crate::time::epoch_sec;
use crate::track::{LiveTrack, ProviderId};

/// Errors that can abort engine construction.
///
/// Once running, the tick loop never propagates errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("account store error: {0}")]
    Store(#[from] StoreError),
}

/// The fetch orchestrator.
///
/// Single writer of [`FleetState`]; constructed by the process entry
/// point with its collaborators injected.
pub struct FetcherEngine<C: AsyncHttpClient + Clone, S: AccountStore> {
    config: EngineConfig,
    state: FleetState,
    fetchers: Vec<ProviderFetcher<C>>,
    store: S,
    publisher: Arc<SnapshotPublisher>,
    sync: SyncCounter,
    seen_sync: i64,
}

impl<C, S> FetcherEngine<C, S>
where
    C: AsyncHttpClient + Clone,
    S: AccountStore,
{
    /// Creates the engine and performs the initial reconcile from the
    /// account store.
    pub async fn new(
        config: EngineConfig,
        client: C,
        store: S,
        publisher: Arc<SnapshotPublisher>,
        sync: SyncCounter,
    ) -> Result<Self, EngineError> {
        let now_sec = epoch_sec();
        let fetchers = build_fetchers(client, &config);
        let mut engine = Self {
            state: FleetState::new(now_sec),
            seen_sync: sync.value(),
            config,
            fetchers,
            store,
            publisher,
            sync,
        };
        let accounts = engine.store.load_accounts().await?;
        engine.reconcile(accounts, true);
        engine.state.next_partial_sync_sec = now_sec + engine.config.partial_sync_every_sec;
        engine.state.next_full_sync_sec = now_sec + engine.config.full_sync_every_sec;
        engine.publisher.publish(&engine.state, now_sec);
        info!(pilots = engine.state.pilots.len(), "engine initialized");
        Ok(engine)
    }

    /// Read access for tests and diagnostics.
    pub fn state(&self) -> &FleetState {
        &self.state
    }

    /// Runs the periodic tick loop until cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.tick_interval_sec));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let now_sec = epoch_sec();
                    self.state.stopped_sec = now_sec;
                    self.publisher.publish(&self.state, now_sec);
                    info!(num_ticks = self.state.num_ticks, "engine stopped");
                    return;
                }
                _ = interval.tick() => {
                    self.tick(epoch_sec()).await;
                }
            }
        }
    }

    /// One full fetch-and-merge cycle.
    pub async fn tick(&mut self, now_sec: i64) {
        self.state.in_tick = true;
        self.maybe_reconcile(now_sec).await;

        let timeout_sec = self.config.fetch_timeout_sec;
        let jobs = self.fetchers.iter().map(|fetcher| {
            let devices = due_devices(&self.state, fetcher.provider_id(), now_sec);
            async move {
                let mut updates = TrackerUpdates::new(fetcher.provider_id(), now_sec);
                if !devices.is_empty() {
                    debug!(
                        provider = %fetcher.provider_id(),
                        devices = devices.len(),
                        "fetching due devices"
                    );
                    fetcher.fetch(devices, &mut updates, timeout_sec).await;
                }
                updates
            }
        });
        let all_updates = futures::future::join_all(jobs).await;

        for updates in all_updates {
            self.apply_updates(updates, now_sec);
        }

        self.state.num_ticks += 1;
        self.state.last_tick_sec = now_sec;
        self.state.last_updated_ms = self
            .state
            .pilots
            .values()
            .map(|p| p.last_updated_ms)
            .max()
            .unwrap_or(0);
        self.state.in_tick = false;

        self.publisher.publish(&self.state, now_sec);
    }

    /// Folds one provider's tick results into the fleet state.
    fn apply_updates(&mut self, mut updates: TrackerUpdates, now_sec: i64) {
        let provider = updates.provider;
        let fetchers = &self.fetchers;
        let state = &mut self.state;

        for error in &updates.errors {
            warn!(provider = %provider, error = %error, "tick error");
        }

        let fetcher = fetchers
            .iter()
            .find(|f| f.provider_id() == provider)
            .expect("fetcher for every provider id");

        for pilot_id in &updates.fetched {
            let Some(tracker) = state
                .pilots
                .get_mut(pilot_id)
                .and_then(|p| p.tracker_mut(provider))
            else {
                continue;
            };
            tracker.last_fetch_sec = updates.start_fetch_sec;
            tracker.num_requests += 1;
            tracker.num_consecutive_errors = 0;
            if let Some(fix_sec) = updates
                .track_deltas
                .get(pilot_id)
                .and_then(LiveTrack::last)
                .map(|f| f.timestamp_sec())
            {
                if fix_sec > tracker.last_fix_sec {
                    tracker.last_fix_sec = fix_sec;
                }
            }
            tracker.next_fetch_sec =
                updates.start_fetch_sec + fetcher.next_fetch_after_sec(tracker, now_sec);
        }

        for (pilot_id, message) in &updates.tracker_errors {
            let Some(tracker) = state
                .pilots
                .get_mut(pilot_id)
                .and_then(|p| p.tracker_mut(provider))
            else {
                continue;
            };
            tracker.num_errors += 1;
            tracker.num_consecutive_errors += 1;
            // next_fetch_sec stays put: the device is retried as soon as
            // it is due again, without stalling anyone else.
            debug!(provider = %provider, pilot_id = *pilot_id, message = %message, "device error");
        }

        for (pilot_id, delta) in updates.track_deltas.drain() {
            if delta.is_empty() {
                continue;
            }
            let Some(pilot) = state.pilots.get_mut(&pilot_id) else {
                continue;
            };
            pilot.track = pilot
                .track
                .merge(&delta)
                .trim_before(now_sec - self.config.track_retention_sec)
                .simplify(self.config.simplify_interval_sec);
            pilot.last_updated_ms = now_sec * 1000;
        }
    }

    /// Reconciles tracker configuration when signalled or scheduled.
    async fn maybe_reconcile(&mut self, now_sec: i64) {
        let counter = self.sync.value();
        let full = counter > self.seen_sync || now_sec >= self.state.next_full_sync_sec;
        let partial = now_sec >= self.state.next_partial_sync_sec;
        if !full && !partial {
            return;
        }

        match self.store.load_accounts().await {
            Ok(accounts) => {
                self.reconcile(accounts, full);
                self.seen_sync = counter;
                self.state.next_partial_sync_sec = now_sec + self.config.partial_sync_every_sec;
                if full {
                    self.state.next_full_sync_sec = now_sec + self.config.full_sync_every_sec;
                }
            }
            // Keep the previous configuration; the next tick retries.
            Err(e) => warn!(error = %e, "account reconcile failed"),
        }
    }

    /// Applies the authoritative account list to the in-memory state.
    ///
    /// Runtime tracker state (counters, schedule, last fix) survives as
    /// long as the account string is unchanged; a changed account resets
    /// the slot. A full reconcile also drops pilots no longer stored.
    fn reconcile(&mut self, accounts: Vec<PilotAccount>, full: bool) {
        let state = &mut self.state;
        let mut seen: std::collections::HashSet<i64> =
            std::collections::HashSet::with_capacity(accounts.len());

        for account in accounts {
            seen.insert(account.id);
            let pilot = state.pilots.entry(account.id).or_insert_with(Pilot::default);
            pilot.name = account.name;
            pilot.share = account.share;
            pilot.enabled = account.enabled;
            for provider in ProviderId::ALL {
                let configured = match provider {
                    ProviderId::Flymaster => account.flymaster.as_ref(),
                    ProviderId::Skylines => account.skylines.as_ref(),
                };
                match configured {
                    Some(config) => {
                        let keep = pilot
                            .tracker(provider)
                            .is_some_and(|t| t.account == config.account);
                        if keep {
                            if let Some(tracker) = pilot.tracker_mut(provider) {
                                tracker.enabled = config.enabled;
                            }
                        } else {
                            pilot.set_tracker(
                                provider,
                                Some(Tracker::new(config.enabled, config.account.clone())),
                            );
                        }
                    }
                    None => pilot.set_tracker(provider, None),
                }
            }
        }

        if full {
            state.pilots.retain(|id, _| seen.contains(id));
        }
        debug!(pilots = state.pilots.len(), full, "accounts reconciled");
    }
}
