//! Root listener that turns permission events into visible signals.

use super::bus::{ChannelSubscription, ErrorChannel, PERMISSION_ERROR};
use crate::error::{BindError, PermissionError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// How the root listener surfaces denials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ErrorSurface {
    /// Log and keep history only.
    #[default]
    Log,
    /// Development mode: `check()` raises unseen denials as errors.
    Overlay,
}

/// Configuration for [`PermissionErrorListener`].
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    pub surface: ErrorSurface,

    /// Max events kept in history (oldest evicted first).
    /// Default: 64
    pub history_limit: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            surface: ErrorSurface::Log,
            history_limit: 64,
        }
    }
}

#[derive(Default)]
struct Reported {
    history: VecDeque<PermissionError>,
    unseen: VecDeque<PermissionError>,
    total: u64,
}

/// Application-root subscriber for permission-error events.
pub struct PermissionErrorListener {
    config: ListenerConfig,
    reported: Arc<Mutex<Reported>>,
    _subscription: ChannelSubscription,
}

impl PermissionErrorListener {
    /// Register on `channel`. The handler is removed when the listener drops.
    pub fn attach(channel: &ErrorChannel, config: ListenerConfig) -> Self {
        let reported = Arc::new(Mutex::new(Reported::default()));

        let subscription = {
            let reported = Arc::clone(&reported);
            let surface = config.surface;
            let limit = config.history_limit;
            channel.subscribe(PERMISSION_ERROR, move |event| {
                let Some(err) = event.as_permission_error() else {
                    return;
                };

                tracing::error!(
                    path = %err.path,
                    operation = %err.operation,
                    payload = ?err.request_resource_data,
                    "request denied by security rules"
                );

                let mut reported = reported.lock();
                reported.total += 1;
                push_bounded(&mut reported.history, err.clone(), limit);
                if surface == ErrorSurface::Overlay {
                    push_bounded(&mut reported.unseen, err.clone(), limit);
                }
            })
        };

        Self {
            config,
            reported,
            _subscription: subscription,
        }
    }

    pub fn surface(&self) -> ErrorSurface {
        self.config.surface
    }

    /// Raise the oldest unseen denial (overlay mode only).
    pub fn check(&self) -> Result<()> {
        match self.reported.lock().unseen.pop_front() {
            Some(err) => Err(BindError::PermissionDenied(err)),
            None => Ok(()),
        }
    }

    /// Retained events, oldest first.
    pub fn recent(&self) -> Vec<PermissionError> {
        self.reported.lock().history.iter().cloned().collect()
    }

    /// Total events received, including evicted ones.
    pub fn total_reported(&self) -> u64 {
        self.reported.lock().total
    }
}

fn push_bounded(queue: &mut VecDeque<PermissionError>, err: PermissionError, limit: usize) {
    if limit == 0 {
        return;
    }
    while queue.len() >= limit {
        queue.pop_front();
    }
    queue.push_back(err);
}
