//! Inactivity auto-lock timer.
//!
//! Wraps `tokio::time` in the named-alarm semantics the vault needs:
//! one pending timer at most, `schedule` replaces it, `cancel` clears
//! it, and the callback runs exactly once when the delay elapses.
//!
//! The vault manager arms this on every successful unlock and cancels
//! it on manual lock.  Read activity does not rearm the timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Slot holding the single pending timer.
///
/// The generation counter lets a fired task tell whether it is still
/// the current timer before it disarms itself.
#[derive(Default)]
struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

/// One-shot, replaceable inactivity timer.
#[derive(Default)]
pub struct AutoLockScheduler {
    slot: Arc<Mutex<TimerSlot>>,
}

impl AutoLockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, replacing any pending arming.
    ///
    /// After `delay` elapses, `on_fire` runs exactly once.  A second
    /// `schedule` call before that aborts the first timer; there are
    /// never two pending alarms.
    pub async fn schedule<F>(&self, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().await;

        if let Some(prev) = slot.handle.take() {
            prev.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        let armed_generation = slot.generation;

        let task_slot = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Disarm before firing.  If the callback itself calls
            // `cancel` (locking the vault does), it must not abort the
            // task it is running on.
            {
                let mut slot = task_slot.lock().await;
                if slot.generation != armed_generation {
                    // Replaced or cancelled while we were waking up.
                    return;
                }
                slot.handle = None;
            }

            on_fire.await;
        });

        slot.handle = Some(handle);
        debug!(delay_secs = delay.as_secs(), "auto-lock timer armed");
    }

    /// Clear any pending timer.  Safe to call when nothing is armed.
    pub async fn cancel(&self) {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.handle.take() {
            handle.abort();
            debug!("auto-lock timer cancelled");
        }
        slot.generation = slot.generation.wrapping_add(1);
    }

    /// Whether a timer is currently pending.
    pub async fn is_armed(&self) -> bool {
        self.slot.lock().await.handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let scheduler = AutoLockScheduler::new();

        let counter = Arc::clone(&fired);
        scheduler
            .schedule(Duration::from_secs(60), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_pending_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let scheduler = AutoLockScheduler::new();

        let first = Arc::clone(&fired);
        scheduler
            .schedule(Duration::from_secs(10), async move {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        // Replace before the first fires; only the second should run.
        let second = Arc::clone(&fired);
        scheduler
            .schedule(Duration::from_secs(30), async move {
                second.fetch_add(10, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let scheduler = AutoLockScheduler::new();

        let counter = Arc::clone(&fired);
        scheduler
            .schedule(Duration::from_secs(10), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        scheduler.cancel().await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_armed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_may_cancel_without_aborting_itself() {
        let fired = Arc::new(AtomicUsize::new(0));
        let scheduler = Arc::new(AutoLockScheduler::new());

        let counter = Arc::clone(&fired);
        let inner = Arc::clone(&scheduler);
        scheduler
            .schedule(Duration::from_secs(5), async move {
                // What VaultManager::lock does from inside the callback.
                inner.cancel().await;
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        // Let the spawned callback task finish.
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
