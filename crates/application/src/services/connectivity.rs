//! Connectivity monitor
//!
//! Publishes whether the letter repository is reachable. The signal is a
//! `watch` channel so late subscribers always see the current value and
//! only real transitions wake them.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ports::LetterRepositoryPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Probe tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Seconds between reachability probes
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Seconds before a probe counts as failed
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

const fn default_probe_interval() -> u64 {
    15
}

const fn default_probe_timeout() -> u64 {
    5
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

/// Tracks reachability of the letter repository
pub struct ConnectivityMonitor {
    repository: Arc<dyn LetterRepositoryPort>,
    config: ConnectivityConfig,
    state: watch::Sender<Connectivity>,
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("config", &self.config)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl ConnectivityMonitor {
    /// Create a monitor that assumes the repository is reachable until a
    /// probe says otherwise
    pub fn new(repository: Arc<dyn LetterRepositoryPort>, config: ConnectivityConfig) -> Self {
        Self {
            repository,
            config,
            state: watch::Sender::new(Connectivity::Online),
        }
    }

    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_offline(&self) -> bool {
        self.current() == Connectivity::Offline
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Record a state; returns true on a transition
    pub fn set(&self, next: Connectivity) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            match next {
                Connectivity::Online => info!("Letter repository reachable again"),
                Connectivity::Offline => warn!("Letter repository unreachable"),
            }
        }
        changed
    }

    /// Ping the repository once and record the result
    pub async fn probe(&self) -> Connectivity {
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        let next = match tokio::time::timeout(timeout, self.repository.ping()).await {
            Ok(Ok(())) => Connectivity::Online,
            Ok(Err(e)) => {
                debug!(error = %e, "Reachability probe failed");
                Connectivity::Offline
            },
            Err(_) => {
                debug!(timeout_secs = self.config.probe_timeout_secs, "Reachability probe timed out");
                Connectivity::Offline
            },
        };
        self.set(next);
        next
    }

    /// Probe on a fixed interval until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.probe_interval_secs.max(1));
        info!(interval_secs = period.as_secs(), "Connectivity monitor started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Connectivity monitor stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.probe().await;
                }
            }
        }
    }
}
