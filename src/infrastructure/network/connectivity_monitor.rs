use super::probe::ConnectivityProbe;
use crate::application::ports::Connectivity;
use crate::shared::listeners::{ListenerRegistry, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Two-state online/offline tracker.
///
/// The host feeds platform events through [`ConnectivityMonitor::set_online`];
/// an optional probe task re-checks periodically in case an event was missed.
/// Subscribers are only called on actual transitions.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    listeners: ListenerRegistry<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self {
            state,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Records the platform state. Returns `true` when this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            if online {
                tracing::info!(target: "sync::connectivity", "network online");
            } else {
                tracing::warn!(target: "sync::connectivity", "network offline");
            }
            self.listeners.notify(&online);
        }
        changed
    }

    pub fn subscribe_state(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Polls `probe` every `interval` until `cancel` fires. The first check runs immediately.
    pub fn spawn_recheck(
        self: &Arc<Self>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let reachable = tokio::select! {
                            _ = cancel.cancelled() => break,
                            reachable = probe.is_reachable() => reachable,
                        };
                        monitor.set_online(reachable);
                    }
                }
            }
            tracing::debug!(target: "sync::connectivity", "recheck task stopped");
        })
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    fn on_change(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> Subscription {
        self.listeners.subscribe(move |online: &bool| callback(*online))
    }
}
