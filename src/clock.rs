//! Injectable wall-clock and sleep sources.
//!
//! Both generators need a millisecond clock and a way to suspend the calling thread
//! for a millisecond at a time. Production code uses [`SystemClock`]/[`ThreadSleep`];
//! tests substitute a scripted [`Clock`] to exercise the rewind and overflow paths in
//! §4.3/§4.4 deterministically without actually waiting on a real clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current time as milliseconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// Generators subtract their own epoch offset from this value; `Clock` itself is
/// epoch-agnostic so the same implementation serves both generators.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_unix_millis(&self) -> u64;
}

/// Suspends the calling thread for approximately `millis` milliseconds.
pub trait Sleep: Send + Sync {
    /// Suspends the calling thread for approximately `millis` milliseconds.
    fn sleep_millis(&self, millis: u64);
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is set before the Unix epoch")
            .as_millis() as u64
    }
}

/// [`Sleep`] backed by [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep_millis(&self, millis: u64) {
        std::thread::sleep(std::time::Duration::from_millis(millis));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Clock, Sleep};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// A clock that replays a fixed schedule of readings, then repeats the last one.
    #[derive(Debug)]
    pub(crate) struct ScriptedClock {
        schedule: Vec<u64>,
        next: AtomicUsize,
    }

    impl ScriptedClock {
        pub(crate) fn new(schedule: impl Into<Vec<u64>>) -> Self {
            Self {
                schedule: schedule.into(),
                next: AtomicUsize::new(0),
            }
        }

        pub(crate) fn fixed(value: u64) -> Self {
            Self::new(vec![value])
        }
    }

    impl Clock for ScriptedClock {
        fn now_unix_millis(&self) -> u64 {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            let i = i.min(self.schedule.len() - 1);
            self.schedule[i]
        }
    }

    /// A sleeper that records total requested sleep time instead of blocking.
    #[derive(Debug, Default)]
    pub(crate) struct CountingSleep {
        total_millis: AtomicU64,
    }

    impl CountingSleep {
        pub(crate) fn total_millis(&self) -> u64 {
            self.total_millis.load(Ordering::SeqCst)
        }
    }

    impl Sleep for CountingSleep {
        fn sleep_millis(&self, millis: u64) {
            self.total_millis.fetch_add(millis, Ordering::SeqCst);
        }
    }
}
