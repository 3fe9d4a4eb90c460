//! Reconnect supervisor for the trade stream
//!
//! Wraps a [`StreamClient`] and decides whether to reconnect after each
//! session ends, waiting out an exponential backoff between attempts.

use super::stream::StreamClient;
use super::types::{ConnectionState, StreamExit};
use crate::config::ReconnectSettings;
use crate::telemetry::{self, CounterMetric};
use crate::ws::{ReconnectConfig, ReconnectPolicy};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why the supervisor stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The shutdown token was cancelled
    Shutdown,
    /// The last session ended in a way that is not retried
    Stopped(StreamExit),
    /// The backoff policy ran out of attempts
    GaveUp { attempts: u32 },
}

/// Runs the stream client, reconnecting with backoff on failure
pub struct StreamSupervisor {
    client: StreamClient,
    policy: Option<ReconnectPolicy>,
}

impl StreamSupervisor {
    /// Supervise with the policy described by configuration
    pub fn new(client: StreamClient, settings: &ReconnectSettings) -> Self {
        let policy = settings.enabled.then(|| settings.policy_config());
        Self::with_policy(client, policy)
    }

    /// Supervise with an explicit policy; None disables reconnection
    pub fn with_policy(client: StreamClient, policy: Option<ReconnectConfig>) -> Self {
        Self {
            client,
            policy: policy.map(ReconnectPolicy::new),
        }
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.client.watch_state()
    }

    /// Connect and keep the stream alive until shutdown or a terminal exit
    ///
    /// The client is always disconnected before this returns.
    pub async fn run(mut self, shutdown: CancellationToken) -> SupervisorExit {
        let outcome = self.supervise(&shutdown).await;
        self.client.disconnect().await;
        tracing::info!(outcome = ?outcome, "Stream supervisor stopped");
        outcome
    }

    async fn supervise(&mut self, shutdown: &CancellationToken) -> SupervisorExit {
        loop {
            let connected = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SupervisorExit::Shutdown,
                result = self.client.connect() => result,
            };

            let last = match connected {
                Ok(()) => {
                    if let Some(policy) = self.policy.as_mut() {
                        policy.reset();
                    }

                    let exit = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => return SupervisorExit::Shutdown,
                        exit = self.client.wait() => exit,
                    };

                    match exit {
                        Some(exit) if exit.is_recoverable() => {
                            tracing::warn!(exit = ?exit, "Trade stream session ended");
                            exit
                        }
                        Some(exit) => return SupervisorExit::Stopped(exit),
                        None => return SupervisorExit::Stopped(StreamExit::Requested),
                    }
                }
                Err(e) => StreamExit::Failed(e),
            };

            let Some(policy) = self.policy.as_mut() else {
                tracing::warn!("Reconnect disabled, leaving trade stream down");
                return SupervisorExit::Stopped(last);
            };

            let Some(delay) = policy.next_delay() else {
                let attempts = policy.attempts();
                tracing::error!(attempts, "Giving up on trade stream reconnection");
                return SupervisorExit::GaveUp { attempts };
            };

            telemetry::increment(CounterMetric::ReconnectAttempts);
            tracing::info!(
                attempt = policy.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting trade stream"
            );

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SupervisorExit::Shutdown,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
