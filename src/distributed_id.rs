//! The 93-bit, decimal-shaped `DistributedId` and its generator (§3.1, §4.3).

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use rand::RngCore;

use crate::clock::{Clock, Sleep, SystemClock, ThreadSleep};
use crate::error::ParseError;
use crate::random::RandomSequence48;
use crate::rng::DefaultRng;

/// Milliseconds between the Unix epoch and 1900-01-01T00:00:00Z. Negative offset:
/// the `DistributedId` epoch precedes the Unix epoch, so this is *subtracted* from a
/// Unix millisecond reading, not added.
const UNIX_TO_DISTRIBUTED_ID_EPOCH_MILLIS: i64 = -2_208_988_800_000;

/// Width of the `timestamp` field, in bits.
const TIMESTAMP_BITS: u32 = 45;
const MAX_TIMESTAMP: u64 = (1u64 << TIMESTAMP_BITS) - 1;

const RANDOM_BITS: u32 = 48;

/// Window by which `DistributedIdGenerator`'s notion of "now" lags the wall clock, to
/// absorb bursts without ever minting an ID that looks like it is from the future.
const LEEWAY_MILLIS: u64 = 1_000;

const DECIMAL_DIGITS: usize = 28;

/// A 93-bit monotonic identifier, canonically a 28-digit decimal string (§3.1).
///
/// Laid out big-endian across 96 bits as 3 reserved zero bits, a 45-bit millisecond
/// timestamp since 1900-01-01T00:00:00Z, and a 48-bit random tail. Stored here as a
/// `u128` (only the low 96 bits are ever meaningful; only the low 93 are, in fact).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct DistributedId(u128);

impl DistributedId {
    /// Largest value a `DistributedId` can hold: 10²⁸ − 1. The generator never
    /// actually reaches this (its true ceiling is 2⁹³ − 1, comfortably smaller), but
    /// it is the bound [`crate::PublicIdentityConverter::try_decode_dec`] validates
    /// decoded values against, per §4.5 step 5.
    pub const MAX: u128 = 10u128.pow(28) - 1;

    /// Wraps a 128-bit integer as a `DistributedId`, if it is within [`Self::MAX`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::DistributedId;
    ///
    /// assert!(DistributedId::from_u128(0).is_some());
    /// assert!(DistributedId::from_u128(DistributedId::MAX).is_some());
    /// assert!(DistributedId::from_u128(DistributedId::MAX + 1).is_none());
    /// ```
    pub const fn from_u128(value: u128) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the underlying 128-bit integer representation.
    pub const fn to_u128(self) -> u128 {
        self.0
    }

    /// Returns the 96-bit big-endian byte representation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::DistributedId;
    ///
    /// let id = DistributedId::from_u128(1).unwrap();
    /// assert_eq!(id.to_bytes(), [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    /// ```
    pub fn to_bytes(self) -> [u8; 12] {
        let full = self.0.to_be_bytes();
        let mut out = [0u8; 12];
        out.copy_from_slice(&full[4..]);
        out
    }

    /// Builds a `DistributedId` from its 96-bit big-endian byte representation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::DistributedId;
    ///
    /// let id = DistributedId::from_u128(1).unwrap();
    /// assert_eq!(DistributedId::from_bytes(id.to_bytes()), id);
    /// ```
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        let mut full = [0u8; 16];
        full[4..].copy_from_slice(&bytes);
        Self(u128::from_be_bytes(full))
    }

    /// Returns the 45-bit `timestamp` field.
    pub const fn timestamp(&self) -> u64 {
        (self.0 >> RANDOM_BITS) as u64
    }

    /// Returns the 48-bit random field.
    pub const fn random(&self) -> u64 {
        (self.0 as u64) & ((1u64 << RANDOM_BITS) - 1)
    }

    fn from_fields(timestamp: u64, random: u64) -> Self {
        debug_assert!(timestamp <= MAX_TIMESTAMP);
        debug_assert!(random <= (1u64 << RANDOM_BITS) - 1);
        Self(((timestamp as u128) << RANDOM_BITS) | random as u128)
    }
}

impl fmt::Display for DistributedId {
    /// Formats as the canonical 28-digit zero-padded decimal string (§3.1, §6.4).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = DECIMAL_DIGITS)
    }
}

impl FromStr for DistributedId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DECIMAL_DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::MalformedDecimal {
                expected: DECIMAL_DIGITS,
                actual: s.to_owned(),
            });
        }
        let value: u128 = s.parse().map_err(|_| ParseError::MalformedDecimal {
            expected: DECIMAL_DIGITS,
            actual: s.to_owned(),
        })?;
        Self::from_u128(value).ok_or(ParseError::OutOfRange)
    }
}

impl From<DistributedId> for u128 {
    fn from(id: DistributedId) -> u128 {
        id.0
    }
}

/// Mutable state protected by [`DistributedIdGenerator`]'s internal mutex.
#[derive(Debug, Default)]
struct State {
    previous_timestamp: u64,
    previous_random: RandomSequence48,
}

/// Generates monotonically increasing [`DistributedId`]s (§4.3).
///
/// `create_id` takes `&self`: the mutex guarding `(previous_timestamp,
/// previous_random)` lives inside the generator, so a single instance can be shared
/// across threads directly (`Arc<DistributedIdGenerator>` or a `'static`), unlike a
/// plain `&mut self` counter that would need an external `Mutex` wrapper.
pub struct DistributedIdGenerator<R = DefaultRng, C = SystemClock, S = ThreadSleep> {
    rng: Mutex<R>,
    state: Mutex<State>,
    clock: C,
    sleep: S,
}

impl<R, C, S> fmt::Debug for DistributedIdGenerator<R, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedIdGenerator")
            .finish_non_exhaustive()
    }
}

impl DistributedIdGenerator<DefaultRng, SystemClock, ThreadSleep> {
    /// Creates a generator using the default CSPRNG, system clock, and real sleeps.
    pub fn new() -> Self {
        Self::with_rng_clock_sleep(DefaultRng::default(), SystemClock, ThreadSleep)
    }
}

impl Default for DistributedIdGenerator<DefaultRng, SystemClock, ThreadSleep> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore, C: Clock, S: Sleep> DistributedIdGenerator<R, C, S> {
    /// Creates a generator with injected randomness, clock, and sleep sources —
    /// the hook tests use to exercise §4.3's overflow and rewind paths deterministically.
    pub fn with_rng_clock_sleep(rng: R, clock: C, sleep: S) -> Self {
        #[cfg(feature = "log")]
        log::debug!("initialized DistributedIdGenerator");
        Self {
            rng: Mutex::new(rng),
            state: Mutex::new(State::default()),
            clock,
            sleep,
        }
    }

    /// Generates a new [`DistributedId`].
    ///
    /// # Panics
    ///
    /// Panics if the timestamp field would exceed 45 bits (the clock has advanced
    /// past approximately the year 3084).
    pub fn create_id(&self) -> DistributedId {
        loop {
            let fresh = {
                let mut rng = self
                    .rng
                    .lock()
                    .unwrap_or_else(|err| panic!("rng lock poisoned: {err}"));
                RandomSequence48::create(&mut *rng)
            };

            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|err| panic!("state lock poisoned: {err}"));

            let now_unix = self.clock.now_unix_millis();
            let t = unix_millis_to_epoch(now_unix).saturating_sub(LEEWAY_MILLIS);

            if t > state.previous_timestamp {
                // Case A: time has moved forward.
                state.previous_timestamp = t;
                state.previous_random = fresh;
                return Self::encode(state.previous_timestamp, state.previous_random.as_u64());
            }

            let (candidate, ok) = state.previous_random.try_add_random_bits(fresh);
            if ok {
                // Case B: same or earlier timestamp, increment fit.
                state.previous_random = candidate;
                return Self::encode(state.previous_timestamp, state.previous_random.as_u64());
            }

            let gap = state.previous_timestamp.saturating_sub(t);
            if gap <= LEEWAY_MILLIS - 1 {
                // Case C: increment overflowed, but there's leeway room to advance.
                state.previous_timestamp += 1;
                state.previous_random = fresh;
                return Self::encode(state.previous_timestamp, state.previous_random.as_u64());
            }

            if gap > LEEWAY_MILLIS {
                // Case D: clock has rewound by more than the leeway window. Sleeping
                // would not help — reset the baseline and accept the one-off
                // non-monotonic jump rather than stall.
                #[cfg(feature = "log")]
                log::debug!("DistributedIdGenerator: clock rewound by {gap}ms, resetting baseline");
                state.previous_timestamp = t;
                state.previous_random = fresh;
                return Self::encode(state.previous_timestamp, state.previous_random.as_u64());
            }

            // At the leeway boundary: wait a millisecond for the clock to catch up.
            drop(state);
            #[cfg(feature = "log")]
            log::trace!("DistributedIdGenerator: at leeway boundary, sleeping 1ms");
            self.sleep.sleep_millis(1);
        }
    }

    fn encode(timestamp: u64, random: u64) -> DistributedId {
        assert!(
            timestamp <= MAX_TIMESTAMP,
            "DistributedIdGenerator: timestamp exceeds the 45-bit field (clock past supported range)"
        );
        DistributedId::from_fields(timestamp, random)
    }
}

/// Converts a Unix millisecond timestamp to milliseconds since the `DistributedId`
/// epoch (1900-01-01T00:00:00Z).
fn unix_millis_to_epoch(unix_millis: u64) -> u64 {
    (unix_millis as i64 - UNIX_TO_DISTRIBUTED_ID_EPOCH_MILLIS) as u64
}
