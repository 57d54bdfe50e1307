//! Collection loop
//!
//! A single task alternates between waiting for the next tick and running one
//! fetch → decode → transform → publish cycle. Shutdown is a `CancellationToken` raced
//! against the timer at the wait point only; a tick that already started always completes.
//!
//! ```text
//! Idle --connect--> Waiting --tick--> Collecting --done/skipped--> Waiting
//!                      |                   |
//!                    stop             fatal publish
//!                      v                   v
//!                   Stopped <--------------+
//! ```

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decoder::decode;
use crate::error::{CollectorError, ConfigError, DecodeError, FetchError};
use crate::fetcher::StationSource;
use crate::models::StationRecord;
use crate::sink::EventSink;
use crate::transform::transform_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Waiting,
    Collecting,
    Stopped,
}

/// Why a tick published nothing. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result of one Collecting phase.
#[derive(Debug)]
pub enum TickOutcome {
    /// Events were handed to the sink; `failed` of them were refused.
    Published { published: usize, failed: usize },
    /// Upstream answered with an empty list.
    Empty,
    /// Fetch or decode failed; the tick was abandoned.
    Skipped(TickError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub empty_ticks: u64,
    pub published: u64,
    pub publish_failures: u64,
}

impl CollectorStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Published { published, failed } => {
                self.published += *published as u64;
                self.publish_failures += *failed as u64;
            }
            TickOutcome::Empty => self.empty_ticks += 1,
            TickOutcome::Skipped(_) => self.skipped_ticks += 1,
        }
    }
}

/// Cloneable handle that asks a running collector to stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Request shutdown. Safe to call any number of times.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!("stop requested");
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct Collector {
    period: Duration,
    source: Box<dyn StationSource>,
    sink: Box<dyn EventSink>,
    shutdown: CancellationToken,
    state: LoopState,
    stats: CollectorStats,
}

impl Collector {
    pub fn new(
        period: Duration,
        source: Box<dyn StationSource>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }

        Ok(Self {
            period,
            source,
            sink,
            shutdown: CancellationToken::new(),
            state: LoopState::Idle,
            stats: CollectorStats::default(),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { token: self.shutdown.clone() }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// Connect the sink and poll until stopped or until the sink becomes unusable.
    ///
    /// Per-tick fetch, decode and publish errors are logged and absorbed. The sink is
    /// closed exactly once on the way out, whatever the reason.
    pub async fn run(&mut self) -> Result<(), CollectorError> {
        if self.state != LoopState::Idle {
            return Err(CollectorError::NotIdle(self.state));
        }

        info!(period = %humantime::format_duration(self.period), "velov-beat is running! Hit CTRL-C to stop it.");

        // First tick one period after Run entry; a slow tick delays the next one instead of
        // causing a burst.
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if let Err(e) = self.sink.connect().await {
            self.transition(LoopState::Stopped);
            return Err(CollectorError::Connect(e));
        }
        self.transition(LoopState::Waiting);

        let result = loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break Ok(()),
                _ = ticker.tick() => {}
            }

            self.transition(LoopState::Collecting);
            if let Err(e) = self.collect_once().await {
                break Err(e);
            }
            self.transition(LoopState::Waiting);
        };

        if let Err(e) = self.sink.close().await {
            warn!(error = %e, "failed to close sink cleanly");
        }
        self.transition(LoopState::Stopped);

        let stats = self.stats;
        info!(
            ticks = stats.ticks,
            skipped = stats.skipped_ticks,
            published = stats.published,
            failed = stats.publish_failures,
            "velov-beat stopped"
        );
        result
    }

    /// Run one fetch → decode → transform → publish cycle.
    ///
    /// Only a fatal sink error is returned; everything else is reported in the outcome.
    pub async fn collect_once(&mut self) -> Result<TickOutcome, CollectorError> {
        let outcome = match fetch_records(self.source.as_ref()).await {
            Err(e) => {
                warn!(error = %e, "skipping tick");
                TickOutcome::Skipped(e)
            }
            Ok(records) if records.is_empty() => {
                debug!("API call returned 0 stations");
                TickOutcome::Empty
            }
            Ok(records) => {
                let mut published = 0;
                let mut failed = 0;
                for event in transform_all(records) {
                    let station = event.number;
                    match self.sink.publish(event).await {
                        Ok(()) => published += 1,
                        Err(e) if e.is_fatal() => {
                            self.stats.published += published as u64;
                            self.stats.publish_failures += failed as u64;
                            self.stats.ticks += 1;
                            return Err(CollectorError::SinkLost(e));
                        }
                        Err(e) => {
                            failed += 1;
                            warn!(station, error = %e, "failed to publish station event");
                        }
                    }
                }
                info!(published, failed, "tick complete");
                TickOutcome::Published { published, failed }
            }
        };

        self.stats.record(&outcome);
        Ok(outcome)
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "collector state");
            self.state = next;
        }
    }
}

async fn fetch_records(source: &dyn StationSource) -> Result<Vec<StationRecord>, TickError> {
    let body = source.fetch().await?;
    Ok(decode(&body)?)
}
