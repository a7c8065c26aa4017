//! Network activity tracking for idle detection
//!
//! A [`NetworkActivity`] is shared between the engine's network observer,
//! which records request and response events, and the wait protocol, which
//! polls it to decide when a page has gone quiet.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct ActivityState {
    last_activity: Instant,
    in_flight: usize,
}

/// Shared, cheaply cloneable record of a page's network activity
#[derive(Debug, Clone)]
pub struct NetworkActivity {
    state: Arc<Mutex<ActivityState>>,
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkActivity {
    /// Creates a tracker whose idle clock starts now
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ActivityState {
                last_activity: Instant::now(),
                in_flight: 0,
            })),
        }
    }

    /// Resets the idle clock without changing the in-flight count
    pub fn touch(&self) {
        self.state.lock().last_activity = Instant::now();
    }

    /// A request was sent
    pub fn request_started(&self) {
        let mut state = self.state.lock();
        state.in_flight += 1;
        state.last_activity = Instant::now();
    }

    /// A response finished loading or the request failed
    pub fn request_finished(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.last_activity = Instant::now();
    }

    /// A response was received; the request may still be streaming
    pub fn response_received(&self) {
        self.touch();
    }

    /// Number of requests currently in flight
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Time since the most recent event
    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_activity.elapsed()
    }

    /// Whether the page has been quiet for at least `idle`.
    ///
    /// With `max_in_flight` set, the in-flight count must also be within
    /// budget.
    pub fn is_quiet(&self, idle: Duration, max_in_flight: Option<usize>) -> bool {
        let state = self.state.lock();
        let within_budget = max_in_flight.is_none_or(|max| state.in_flight <= max);
        within_budget && state.last_activity.elapsed() >= idle
    }
}
