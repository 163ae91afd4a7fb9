//! Active Expiration Sweeper
//!
//! Background task that periodically removes expired entries from one cache.
//!
//! The task runs on the caller's tokio runtime when a multi-threaded one is
//! current at spawn time. A current-thread runtime only makes progress while
//! its owner blocks on it, so in that case, or with no runtime at all, the
//! task gets a dedicated thread driving its own single-threaded runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::Result;

// == Sweep Trait ==
/// State that can drop its own expired entries.
pub trait Sweep: Send + Sync + 'static {
    /// Removes every entry expired as of `now`, returning how many were removed.
    fn sweep_expired(&mut self, now: Instant) -> usize;
}

// == Stop Signal ==
/// One-shot stop signal that tolerates being raised any number of times.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    fn raise(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        if first {
            // notify_one stores a permit, so a sweep in progress still sees it
            self.notify.notify_one();
        }
        first
    }

    fn is_raised(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

// == Sweeper ==
/// Handle to a running sweep task.
///
/// Stopping is idempotent and also happens on drop. The task only holds a weak
/// reference to the cache state, so it also exits once the cache is gone.
#[derive(Debug)]
pub struct Sweeper {
    signal: Arc<StopSignal>,
    period: Duration,
}

impl Sweeper {
    /// Spawns a task that sweeps `state` every `period`.
    ///
    /// # Errors
    /// Returns [`CacheError::Runtime`](crate::error::CacheError::Runtime) if no
    /// multi-threaded runtime is current and a dedicated sweeper thread cannot
    /// be started.
    pub fn spawn<S: Sweep>(state: &Arc<RwLock<S>>, period: Duration) -> Result<Self> {
        let signal = Arc::new(StopSignal::default());
        let task = sweep_loop(Arc::downgrade(state), period, signal.clone());

        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                handle.spawn(task);
            }
            _ => {
                let runtime = Builder::new_current_thread().enable_time().build()?;
                std::thread::Builder::new()
                    .name("polycache-sweeper".to_string())
                    .spawn(move || runtime.block_on(task))?;
            }
        }

        info!("Started expiration sweeper with period {:?}", period);
        Ok(Self { signal, period })
    }

    /// Signals the task to stop. Returns true only for the call that stopped it.
    pub fn stop(&self) -> bool {
        let stopped = self.signal.raise();
        if stopped {
            info!("Stopping expiration sweeper with period {:?}", self.period);
        }
        stopped
    }

    /// Returns true until [`Sweeper::stop`] has been called.
    pub fn is_running(&self) -> bool {
        !self.signal.is_raised()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop<S: Sweep>(state: Weak<RwLock<S>>, period: Duration, signal: Arc<StopSignal>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = signal.notify.notified() => break,
            _ = ticker.tick() => {}
        }
        if signal.is_raised() {
            break;
        }
        let Some(state) = state.upgrade() else {
            break;
        };

        let removed = state.write().sweep_expired(Instant::now());

        if removed > 0 {
            debug!("Expiration sweep: removed {} expired entries", removed);
        }
    }

    debug!("Expiration sweeper exited");
}
