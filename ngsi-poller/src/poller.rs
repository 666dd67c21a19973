//! Fixed-interval entity polling with pause, manual refresh and
//! supersession of in-flight cycles.

use crate::cancel::CancelToken;
use crate::source::{fetch_for_types, EntitySource};
use crate::types::FetchError;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use ngsi_map::Entity;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Control messages accepted by a running poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollCommand {
    /// Stop interval ticks from starting cycles
    Pause,
    Resume,
    /// Start a cycle now, cancelling any in flight; the interval keeps its schedule
    Refresh,
    /// Switch the active types and start a cycle for them
    SetTypes(BTreeSet<String>),
    Shutdown,
}

/// What started a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    Tick,
    Refresh,
    TypesChanged,
}

/// Result of one completed, current fetch cycle.
///
/// Generations increase strictly; outcomes are only delivered for the
/// newest cycle, so a consumer never sees an older generation after a
/// newer one.
#[derive(Debug)]
pub struct PollOutcome {
    pub generation: u64,
    pub trigger: PollTrigger,
    pub types: BTreeSet<String>,
    pub result: Result<Vec<Entity>, FetchError>,
}

/// Status information for a poller.
#[derive(Clone, Debug, Default)]
pub struct PollerStatus {
    pub paused: bool,
    /// Last successful cycle
    pub last_poll: Option<DateTime<Utc>>,
    /// Last failure message (cleared on success)
    pub last_error: Option<String>,
    pub poll_count: u64,
    pub error_count: u64,
    /// Cycles cancelled or discarded because a newer one started
    pub superseded_count: u64,
}

/// Cloneable control handle for a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<PollCommand>,
    status: Arc<Mutex<PollerStatus>>,
}

impl PollerHandle {
    pub fn pause(&self) -> Result<()> {
        self.send(PollCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(PollCommand::Resume)
    }

    pub fn refresh(&self) -> Result<()> {
        self.send(PollCommand::Refresh)
    }

    pub fn set_types(&self, types: BTreeSet<String>) -> Result<()> {
        self.send(PollCommand::SetTypes(types))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PollCommand::Shutdown)
    }

    /// Returns a clone of the status tracker for external monitoring.
    pub fn status(&self) -> Arc<Mutex<PollerStatus>> {
        Arc::clone(&self.status)
    }

    fn send(&self, command: PollCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Poller has stopped"))
    }
}

struct InFlight {
    generation: u64,
    token: CancelToken,
}

/// Polls an [`EntitySource`] for the active types.
///
/// - First cycle starts immediately, then one per interval tick
/// - A tick is skipped while paused or while a cycle is still in flight
/// - Refresh and type changes cancel the in-flight cycle and start a new one
/// - Results of superseded cycles are discarded
pub struct PollingController {
    source: Arc<dyn EntitySource>,
    interval: Duration,
    limit: u32,
    types: BTreeSet<String>,
    paused: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl PollingController {
    pub fn new(source: Arc<dyn EntitySource>, interval: Duration, limit: u32) -> Self {
        Self {
            source,
            interval,
            limit,
            types: BTreeSet::new(),
            paused: false,
            generation: 0,
            in_flight: None,
        }
    }

    /// Initial active types.
    pub fn with_types(mut self, types: BTreeSet<String>) -> Self {
        self.types = types;
        self
    }

    /// Starts the polling loop (non-blocking).
    ///
    /// Returns the control handle, the outcome stream and the loop's
    /// JoinHandle. The loop ends on shutdown or when either the handle or
    /// the outcome receiver is dropped.
    pub fn start(
        self,
    ) -> (
        PollerHandle,
        mpsc::UnboundedReceiver<PollOutcome>,
        JoinHandle<()>,
    ) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(PollerStatus::default()));

        let handle = PollerHandle {
            commands: command_tx,
            status: Arc::clone(&status),
        };
        let task = tokio::spawn(self.run(command_rx, outcome_tx, status));
        (handle, outcome_rx, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<PollCommand>,
        outcomes: mpsc::UnboundedSender<PollOutcome>,
        status: Arc<Mutex<PollerStatus>>,
    ) {
        info!(
            source = self.source.name(),
            interval_secs = self.interval.as_secs(),
            types = self.types.len(),
            "Starting poller"
        );

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<PollOutcome>();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.paused {
                        debug!("Poller paused, skipping tick");
                        continue;
                    }
                    if let Some(cycle) = &self.in_flight {
                        debug!(generation = cycle.generation, "Cycle still in flight, skipping tick");
                        continue;
                    }
                    self.begin(PollTrigger::Tick, &done_tx, &status).await;
                }
                command = commands.recv() => match command {
                    Some(PollCommand::Pause) => {
                        info!("Polling paused");
                        self.paused = true;
                        status.lock().await.paused = true;
                    }
                    Some(PollCommand::Resume) => {
                        info!("Polling resumed");
                        self.paused = false;
                        status.lock().await.paused = false;
                    }
                    Some(PollCommand::Refresh) => {
                        info!("Manual refresh");
                        self.begin(PollTrigger::Refresh, &done_tx, &status).await;
                    }
                    Some(PollCommand::SetTypes(types)) => {
                        if types == self.types {
                            debug!("Active types unchanged");
                            continue;
                        }
                        info!(types = types.len(), "Active types changed");
                        self.types = types;
                        self.begin(PollTrigger::TypesChanged, &done_tx, &status).await;
                    }
                    Some(PollCommand::Shutdown) | None => break,
                },
                Some(done) = done_rx.recv() => {
                    let current = self.in_flight.as_ref().map(|c| c.generation);
                    if current != Some(done.generation) {
                        debug!(generation = done.generation, "Discarding superseded cycle");
                        continue;
                    }
                    self.in_flight = None;
                    record(&status, &done).await;

                    if outcomes.send(done).is_err() {
                        info!("Outcome receiver dropped");
                        break;
                    }
                }
            }
        }

        if let Some(cycle) = self.in_flight.take() {
            cycle.token.cancel();
        }
        info!(source = self.source.name(), "Poller stopped");
    }

    /// Cancel any in-flight cycle and start a new one for the current types.
    async fn begin(
        &mut self,
        trigger: PollTrigger,
        done_tx: &mpsc::UnboundedSender<PollOutcome>,
        status: &Mutex<PollerStatus>,
    ) {
        if let Some(previous) = self.in_flight.take() {
            debug!(generation = previous.generation, "Cancelling superseded cycle");
            previous.token.cancel();
            status.lock().await.superseded_count += 1;
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancelToken::new();

        let source = Arc::clone(&self.source);
        let types = self.types.clone();
        let limit = self.limit;
        let cancel = token.clone();
        let done_tx = done_tx.clone();

        debug!(generation, trigger = ?trigger, types = types.len(), "Starting fetch cycle");
        tokio::spawn(async move {
            let result = tokio::select! {
                result = fetch_for_types(source.as_ref(), &types, limit) => result,
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
            };
            // The loop may already be gone at shutdown
            let _ = done_tx.send(PollOutcome {
                generation,
                trigger,
                types,
                result,
            });
        });

        self.in_flight = Some(InFlight { generation, token });
    }
}

async fn record(status: &Mutex<PollerStatus>, outcome: &PollOutcome) {
    let mut status = status.lock().await;
    match &outcome.result {
        Ok(entities) => {
            info!(
                generation = outcome.generation,
                trigger = ?outcome.trigger,
                entities = entities.len(),
                "Fetch cycle complete"
            );
            status.last_poll = Some(Utc::now());
            status.last_error = None;
            status.poll_count += 1;
        }
        Err(e) => {
            error!(
                generation = outcome.generation,
                trigger = ?outcome.trigger,
                error = %e,
                "Fetch cycle failed"
            );
            status.last_error = Some(e.to_string());
            status.error_count += 1;
        }
    }
}
