//! Application state shared across handlers

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use application::SpeechEngineConnector;
use infrastructure::AppConfig;
use tokio::sync::watch;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Opens one speech engine connection per call
    pub speech_engine: Arc<dyn SpeechEngineConnector>,
    /// Number of calls currently being relayed
    pub active_calls: Arc<AtomicUsize>,
    /// Flips to `true` when the server is shutting down
    pub shutdown: watch::Receiver<bool>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("active_calls", &self.active_calls())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state; the returned sender triggers shutdown of all calls
    pub fn new(
        config: AppConfig,
        speech_engine: Arc<dyn SpeechEngineConnector>,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown) = watch::channel(false);
        let state = Self {
            config: Arc::new(config),
            speech_engine,
            active_calls: Arc::new(AtomicUsize::new(0)),
            shutdown,
        };
        (state, shutdown_tx)
    }

    /// Number of calls currently being relayed
    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::Relaxed)
    }
}

/// Counts a call as active for as long as it is alive
#[derive(Debug)]
pub struct ActiveCallGuard {
    counter: Arc<AtomicUsize>,
}

impl ActiveCallGuard {
    /// Increment the counter
    pub fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for ActiveCallGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_active_calls() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = ActiveCallGuard::new(&counter);
        let second = ActiveCallGuard::new(&counter);
        assert_eq!(counter.load(Ordering::Relaxed), 2);

        drop(first);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        drop(second);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
