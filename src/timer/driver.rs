//! One-second tick source for live timers
//!
//! Timers expose a synchronous `tick()`; a [`TickDriver`] calls it from a
//! tokio task once per second. Dropping or stopping the driver aborts the
//! task, so a torn-down timer never ticks against stale state.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of advancing a timer by one second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running (idle, paused, expired, or inactive)
    Idle,
    /// Ticked down; carries the remaining seconds
    Ticked(u64),
    /// Reached zero on this tick
    Expired,
}

/// Anything that can be advanced one second at a time
pub trait Tick: Send + 'static {
    fn tick(&mut self) -> TickOutcome;
}

/// Handle to a spawned ticking task
#[derive(Debug)]
pub struct TickDriver {
    handle: Option<JoinHandle<()>>,
}

impl TickDriver {
    /// Tick `timer` once per second on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<T: Tick>(timer: Arc<Mutex<T>>) -> Self {
        Self::with_period(timer, Duration::from_secs(1))
    }

    pub fn with_period<T: Tick>(timer: Arc<Mutex<T>>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let outcome = match timer.lock() {
                    Ok(mut timer) => timer.tick(),
                    Err(_) => {
                        tracing::warn!("Timer lock poisoned, stopping tick driver");
                        break;
                    }
                };
                if outcome == TickOutcome::Expired {
                    tracing::debug!("Tick driver observed expiry");
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort the ticking task
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u64,
    }

    impl Tick for Counter {
        fn tick(&mut self) -> TickOutcome {
            self.ticks += 1;
            TickOutcome::Ticked(self.ticks)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_ticks_once_per_second() {
        let counter = Arc::new(Mutex::new(Counter::default()));
        let _driver = TickDriver::spawn(counter.clone());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.lock().unwrap().ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_driver_no_longer_ticks() {
        let counter = Arc::new(Mutex::new(Counter::default()));
        let mut driver = TickDriver::spawn(counter.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        driver.stop();
        assert!(!driver.is_running());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.lock().unwrap().ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_driver_no_longer_ticks() {
        let counter = Arc::new(Mutex::new(Counter::default()));
        {
            let _driver = TickDriver::spawn(counter.clone());
            tokio::time::sleep(Duration::from_millis(2500)).await;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.lock().unwrap().ticks, 2);
    }
}
