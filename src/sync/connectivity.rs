//! Connectivity events and their delivery to the queue.
//!
//! Hosts translate whatever their runtime reports (OS network state, a
//! browser's online/offline events, failed health checks) into
//! [`ConnectivityEvent`]s on a channel and register that channel once at
//! startup. Dropping the subscription deregisters it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::queue::OfflineQueue;
use crate::remote::{RemoteError, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// A registered event stream feeding one queue.
#[derive(Debug)]
pub struct ConnectivitySubscription {
    task: JoinHandle<()>,
}

impl ConnectivitySubscription {
    /// Start forwarding `events` to `queue`. Must be called inside a tokio
    /// runtime.
    #[must_use]
    pub fn register(queue: OfflineQueue, mut events: mpsc::Receiver<ConnectivityEvent>) -> Self {
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(?event, "Connectivity event");
                queue.handle(event);
            }
            debug!("Connectivity stream closed");
        });

        Self { task }
    }

    /// Whether events are still being forwarded.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop forwarding events.
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for ConnectivitySubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Polls the remote store and reports connectivity changes.
pub struct ConnectivityProbe {
    remote: Arc<dyn RemoteStore>,
    interval: Duration,
}

impl ConnectivityProbe {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, interval: Duration) -> Self {
        Self { remote, interval }
    }

    /// Probe once.
    pub async fn check(&self) -> ConnectivityEvent {
        match self.remote.ping().await {
            Ok(()) => ConnectivityEvent::Online,
            Err(e) if e.is_connectivity() => {
                debug!(error = %e, "Remote store unreachable");
                ConnectivityEvent::Offline
            }
            // The server answered, so the network is up
            Err(e @ RemoteError::Http { .. }) => {
                debug!(error = %e, "Remote store answered with an error");
                ConnectivityEvent::Online
            }
            Err(e) => {
                debug!(error = %e, "Remote store refused the probe");
                ConnectivityEvent::Offline
            }
        }
    }

    /// Probe every interval, sending an event whenever the state changes.
    /// The first probe always reports. The task ends when the receiver is
    /// dropped.
    #[must_use]
    pub fn spawn(self, tx: mpsc::Sender<ConnectivityEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last = None;

            loop {
                ticker.tick().await;
                let event = self.check().await;
                if last == Some(event) {
                    continue;
                }
                last = Some(event);
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        })
    }
}
