//! Activation lifecycle of a page surface.
//!
//! Uses `ArcSwap` for lock-free state transitions and a `watch` channel to
//! tell outstanding work that the surface has been torn down.

use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

/// Surface state.
///
/// State machine: Activating -> Ready -> TornDown (TornDown is reachable from either).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Configuration and live schema are still being fetched.
    Activating,
    /// The surface is rendered and answering queries.
    Ready,
    /// The user navigated away; results of outstanding work are discarded.
    TornDown,
}

/// Tracks one activation of a surface.
#[derive(Debug)]
pub struct SurfaceLifecycle {
    teardown_signal: watch::Sender<bool>,
    state: Arc<ArcSwap<SurfaceState>>,
}

impl SurfaceLifecycle {
    /// Creates a lifecycle in the `Activating` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            teardown_signal: tx,
            state: Arc::new(ArcSwap::from_pointee(SurfaceState::Activating)),
        }
    }

    /// Moves to `Ready` unless the surface was already torn down.
    ///
    /// Returns whether the transition happened.
    pub fn set_ready(&self) -> bool {
        let previous = self.state.rcu(|current| {
            if **current == SurfaceState::Activating {
                Arc::new(SurfaceState::Ready)
            } else {
                Arc::clone(current)
            }
        });
        *previous == SurfaceState::Activating
    }

    /// Tears the surface down and signals every receiver.
    pub fn tear_down(&self) {
        self.state.store(Arc::new(SurfaceState::TornDown));
        // Ignore send errors -- receivers may have been dropped
        let _ = self.teardown_signal.send(true);
    }

    #[must_use]
    pub fn state(&self) -> SurfaceState {
        **self.state.load()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.state() == SurfaceState::TornDown
    }

    /// Returns a receiver that flips to `true` on teardown.
    #[must_use]
    pub fn teardown_receiver(&self) -> watch::Receiver<bool> {
        self.teardown_signal.subscribe()
    }

    /// Runs `work` until it finishes or the surface is torn down.
    ///
    /// Returns `None` when teardown won; the work future is dropped and its
    /// result never reaches the caller.
    pub async fn run_until_teardown<F, T>(&self, work: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let mut rx = self.teardown_receiver();
        if *rx.borrow() {
            return None;
        }

        tokio::select! {
            output = work => {
                if self.is_torn_down() {
                    None
                } else {
                    Some(output)
                }
            }
            _ = rx.wait_for(|torn_down| *torn_down) => {
                debug!("surface torn down, discarding outstanding work");
                None
            }
        }
    }
}

impl Default for SurfaceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
