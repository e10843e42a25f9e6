//! Phase deadline timers, one pending timer per room at most.
//!
//! A timer is scheduled when a timed phase opens and cancelled when the phase
//! is exited by a player action. The registry tags every timer with the
//! `(round, phase)` it was armed for; a fire whose tag no longer matches the
//! room is stale and must be ignored by the expiry handler.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::room::RoomPhase;

/// Identity of the phase a timer was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerKey {
    /// Round number at arming time (0 for game-level dwells).
    pub round: u32,
    /// Phase the deadline belongs to.
    pub phase: RoomPhase,
}

struct PendingTimer {
    key: TimerKey,
    handle: JoinHandle<()>,
}

/// Abort a replaced or cancelled timer task. Expiry handlers arm the next
/// phase's timer from within their own task; aborting that task here would
/// cancel the very handler doing the re-arm, so the current task is spared.
fn abort_unless_current(handle: JoinHandle<()>) {
    if tokio::task::try_id() != Some(handle.id()) {
        handle.abort();
    }
}

/// Registry of pending phase timers keyed by room code.
#[derive(Default)]
pub struct TimerRegistry {
    timers: DashMap<String, PendingTimer>,
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a deadline for a room, replacing (and aborting) any pending timer.
    /// `on_expiry` runs on its own task after `delay`; it is responsible for
    /// re-checking the room state, since the fire may race a cancellation.
    pub fn schedule<F>(&self, code: &str, key: TimerKey, delay: Duration, on_expiry: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(room = code, ?key, delay_ms = delay.as_millis() as u64, "arming phase timer");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry.await;
        });
        if let Some(previous) = self
            .timers
            .insert(code.to_string(), PendingTimer { key, handle })
        {
            abort_unless_current(previous.handle);
        }
    }

    /// Cancel the pending timer for a room, if any. The abort is synchronous:
    /// once this returns the expiry task is aborted or already running, and
    /// an already-running handler sees the phase change and becomes a no-op.
    pub fn cancel(&self, code: &str) {
        if let Some((_, pending)) = self.timers.remove(code) {
            abort_unless_current(pending.handle);
            debug!(room = code, "cancelled phase timer");
        }
    }

    /// Tag of the pending timer for a room, if one is armed.
    pub fn pending(&self, code: &str) -> Option<TimerKey> {
        self.timers.get(code).map(|timer| timer.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(round: u32, phase: RoomPhase) -> TimerKey {
        TimerKey { round, phase }
    }

    #[tokio::test]
    async fn timer_fires_after_delay() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        registry.schedule(
            "1234",
            key(1, RoomPhase::Predicting),
            Duration::from_millis(10),
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(registry.pending("1234"), Some(key(1, RoomPhase::Predicting)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_the_fire() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        registry.schedule(
            "1234",
            key(1, RoomPhase::Answering),
            Duration::from_millis(20),
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        registry.cancel("1234");
        assert_eq!(registry.pending("1234"), None);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rescheduling_aborts_the_previous_timer() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&fired);
        registry.schedule(
            "1234",
            key(1, RoomPhase::Predicting),
            Duration::from_millis(20),
            async move {
                first.fetch_add(10, Ordering::SeqCst);
            },
        );
        let second = Arc::clone(&fired);
        registry.schedule(
            "1234",
            key(1, RoomPhase::Answering),
            Duration::from_millis(20),
            async move {
                second.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(registry.pending("1234"), Some(key(1, RoomPhase::Answering)));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
