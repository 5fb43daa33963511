/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Repeating task timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

/// A repeating timer running a callback on a tokio task.
///
/// The first tick fires one period after creation. A callback that overruns
/// its period causes the missed ticks to be skipped rather than replayed.
/// Dropping the handle cancels the timer.
pub struct IntervalHandle {
    quit: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl IntervalHandle {
    /// A tokio runtime must be active.
    pub fn new<F: FnMut() + Send + 'static>(period: Duration, mut callback: F) -> Self {
        Self::with_async(period, move || {
            callback();
            std::future::ready(())
        })
    }

    /// Like [`IntervalHandle::new`], but the next tick waits for the
    /// returned future. Ticks missed meanwhile are skipped.
    pub fn with_async<F, Fut>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let quit = Arc::new(AtomicBool::new(false));
        let quit_clone = quit.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                if quit_clone.load(Ordering::Relaxed) {
                    break;
                }
                callback().await;
            }
        });

        Self {
            quit,
            handle: Some(handle),
        }
    }

    pub fn cancel(&mut self) {
        self.quit.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }
}

impl Drop for IntervalHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counting(period_ms: u64) -> (IntervalHandle, Arc<AtomicU32>) {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let handle = IntervalHandle::new(Duration::from_millis(period_ms), move || {
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });
        (handle, counter)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_every_period_after_the_first() {
        let (_handle, counter) = counting(10);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let count = counter.load(Ordering::Relaxed);
        assert!((4..=5).contains(&count), "got {count} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_the_timer() {
        let (handle, counter) = counting(10);
        tokio::time::sleep(Duration::from_millis(35)).await;
        let before = counter.load(Ordering::Relaxed);
        assert!(before >= 2);

        drop(handle);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::Relaxed), before);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let (mut handle, counter) = counting(10);
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn async_callback_overrun_skips_ticks() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let _handle = IntervalHandle::with_async(Duration::from_millis(10), move || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(35)).await;
            }
        });

        // Ticks at 10, 50 and 90 ms; everything in between is skipped.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let count = counter.load(Ordering::Relaxed);
        assert!((2..=3).contains(&count), "got {count} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_runtime_skips_missed_ticks() {
        let (_handle, counter) = counting(10);
        settle().await;

        // Jump past nine deadlines at once; they collapse into one tick.
        tokio::time::advance(Duration::from_millis(95)).await;
        settle().await;
        let count = counter.load(Ordering::Relaxed);
        assert!((1..=2).contains(&count), "got {count} ticks");
    }
}
