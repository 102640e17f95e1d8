//! The 122-bit, UUID-v7-shaped `DistributedId128` and its generator (§3.1, §4.4).

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use rand::RngCore;
use uuid::Uuid;

use crate::clock::{Clock, Sleep, SystemClock, ThreadSleep};
use crate::error::ParseError;
use crate::random::RandomSequence75;
use crate::rng::DefaultRng;

/// Milliseconds between the Unix epoch and 1700-01-01T00:00:00Z.
const UNIX_TO_DISTRIBUTED_ID128_EPOCH_MILLIS: i64 = -8_520_336_000_000;

const TIMESTAMP_BITS: u32 = 48;
const MAX_TIMESTAMP: u64 = (1u64 << TIMESTAMP_BITS) - 1;

/// Version marker occupying bits 48..51: fixed UUIDv7 value `0b0111`.
const VERSION_MARKER: u128 = 0b0111;

/// Clock rewind beyond which monotonicity is deliberately broken rather than stalled.
const REWIND_TOLERANCE_MILLIS: u64 = 1_000;

const DECIMAL_DIGITS: usize = 38;

/// A 122-bit monotonic identifier shaped like a version-7 UUID (§3.1, §4.4).
///
/// Bits 0..47 (big-endian) are a 48-bit millisecond timestamp since
/// 1700-01-01T00:00:00Z; bits 48..51 are the fixed version marker `0b0111`; bits
/// 52..63 are the high 12 bits of a 75-bit random tail; bit 64 is always 0 (a
/// variant indicator); bits 65..127 are the low 63 bits of that random tail.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct DistributedId128(u128);

impl DistributedId128 {
    /// Wraps a raw 128-bit integer as a `DistributedId128` without checking that its
    /// version/variant bits match the shape this crate's generator produces — useful
    /// when decoding a value that is merely *claimed* to be one of these ids.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::DistributedId128;
    ///
    /// let id = DistributedId128::from_u128(0x017f_0000_0000_0000_7000_0000_0000_0001);
    /// assert_eq!(id.to_u128(), 0x017f_0000_0000_0000_7000_0000_0000_0001);
    /// ```
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Returns the underlying 128-bit integer representation.
    pub const fn to_u128(self) -> u128 {
        self.0
    }

    /// Returns the 16-byte big-endian representation.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Builds a `DistributedId128` from its 16-byte big-endian representation.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    /// Converts to a [`Uuid`] carrying the identical underlying bits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::DistributedId128;
    ///
    /// let id = DistributedId128::from_u128(1);
    /// let uuid = id.to_uuid();
    /// assert_eq!(uuid.as_u128(), 1);
    /// ```
    pub fn to_uuid(self) -> Uuid {
        Uuid::from_bytes(self.to_bytes())
    }

    /// Builds a `DistributedId128` from a [`Uuid`] carrying the identical underlying bits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::DistributedId128;
    /// use uuid::Uuid;
    ///
    /// let uuid = Uuid::from_u128(1);
    /// assert_eq!(DistributedId128::from_uuid(uuid).to_u128(), 1);
    /// ```
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self::from_bytes(*uuid.as_bytes())
    }

    /// Returns the 48-bit `timestamp` field.
    pub const fn timestamp(&self) -> u64 {
        (self.0 >> 80) as u64
    }

    /// Returns the 4-bit version marker (bits 48..51); should always be `0b0111`.
    pub const fn version(&self) -> u8 {
        ((self.0 >> 76) & 0xf) as u8
    }

    /// Returns the variant bit (bit 64); should always be `0`.
    pub const fn variant_bit(&self) -> u8 {
        ((self.0 >> 63) & 1) as u8
    }

    fn from_fields(timestamp: u64, high_12: u16, low_63: u64) -> Self {
        debug_assert!(timestamp <= MAX_TIMESTAMP);
        let value = ((timestamp as u128) << 80)
            | (VERSION_MARKER << 76)
            | ((high_12 as u128 & 0xfff) << 64)
            | (low_63 as u128 & ((1u128 << 63) - 1));
        Self(value)
    }
}

impl fmt::Display for DistributedId128 {
    /// Formats as the canonical 38-digit zero-padded decimal string (§6.4).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = DECIMAL_DIGITS)
    }
}

impl FromStr for DistributedId128 {
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
        Ok(Self(value))
    }
}

impl From<DistributedId128> for u128 {
    fn from(id: DistributedId128) -> u128 {
        id.0
    }
}

impl From<DistributedId128> for Uuid {
    fn from(id: DistributedId128) -> Uuid {
        id.to_uuid()
    }
}

#[derive(Debug, Default)]
struct State {
    previous_timestamp: u64,
    previous_random: RandomSequence75,
}

/// Generates monotonically increasing [`DistributedId128`]s (§4.4).
///
/// Same internal-mutex shape as [`crate::DistributedIdGenerator`] (§5), but with no
/// leeway: on randomness overflow it sleeps and retries rather than borrowing a
/// millisecond of headroom, since its 75-bit random field makes overflow negligible.
pub struct DistributedId128Generator<R = DefaultRng, C = SystemClock, S = ThreadSleep> {
    rng: Mutex<R>,
    state: Mutex<State>,
    clock: C,
    sleep: S,
}

impl<R, C, S> fmt::Debug for DistributedId128Generator<R, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedId128Generator")
            .finish_non_exhaustive()
    }
}

impl DistributedId128Generator<DefaultRng, SystemClock, ThreadSleep> {
    pub fn new() -> Self {
        Self::with_rng_clock_sleep(DefaultRng::default(), SystemClock, ThreadSleep)
    }
}

impl Default for DistributedId128Generator<DefaultRng, SystemClock, ThreadSleep> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore, C: Clock, S: Sleep> DistributedId128Generator<R, C, S> {
    pub fn with_rng_clock_sleep(rng: R, clock: C, sleep: S) -> Self {
        #[cfg(feature = "log")]
        log::debug!("initialized DistributedId128Generator");
        Self {
            rng: Mutex::new(rng),
            state: Mutex::new(State::default()),
            clock,
            sleep,
        }
    }

    /// Generates a new id and returns its raw 128-bit integer form.
    ///
    /// # Panics
    ///
    /// Panics if the timestamp field would exceed 48 bits (the clock has advanced
    /// past approximately the year 10000).
    pub fn create_id(&self) -> u128 {
        self.create_distributed_id128().to_u128()
    }

    /// Generates a new id and returns it as a [`Uuid`] with identical underlying bits.
    pub fn create_uuid(&self) -> Uuid {
        self.create_distributed_id128().to_uuid()
    }

    fn create_distributed_id128(&self) -> DistributedId128 {
        loop {
            let fresh = {
                let mut rng = self
                    .rng
                    .lock()
                    .unwrap_or_else(|err| panic!("rng lock poisoned: {err}"));
                RandomSequence75::create(&mut *rng)
            };

            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|err| panic!("state lock poisoned: {err}"));

            let now_unix = self.clock.now_unix_millis();
            let t = unix_millis_to_epoch(now_unix);

            if t > state.previous_timestamp {
                state.previous_timestamp = t;
                state.previous_random = fresh;
                return Self::encode(state.previous_timestamp, state.previous_random);
            }

            let gap = state.previous_timestamp.saturating_sub(t);
            if gap >= REWIND_TOLERANCE_MILLIS {
                // Clock has moved back by a second or more: accept it as the new
                // baseline instead of attempting the increment at all.
                #[cfg(feature = "log")]
                log::debug!(
                    "DistributedId128Generator: clock rewound by {gap}ms, resetting baseline"
                );
                state.previous_timestamp = t;
                state.previous_random = fresh;
                return Self::encode(state.previous_timestamp, state.previous_random);
            }

            let (candidate, ok) = state.previous_random.try_add_random_bits(fresh);
            if ok {
                state.previous_random = candidate;
                return Self::encode(state.previous_timestamp, state.previous_random);
            }

            // Overflow on a 75-bit field is astronomically rare; there is no
            // timestamp-advancement fallback here, just sleep and retry.
            drop(state);
            #[cfg(feature = "log")]
            log::trace!("DistributedId128Generator: random field overflowed, sleeping 1ms");
            self.sleep.sleep_millis(1);
        }
    }

    fn encode(timestamp: u64, random: RandomSequence75) -> DistributedId128 {
        assert!(
            timestamp <= MAX_TIMESTAMP,
            "DistributedId128Generator: timestamp exceeds the 48-bit field (clock past supported range)"
        );
        DistributedId128::from_fields(timestamp, random.high_12_bits(), random.low_63_bits())
    }
}

fn unix_millis_to_epoch(unix_millis: u64) -> u64 {
    (unix_millis as i64 - UNIX_TO_DISTRIBUTED_ID128_EPOCH_MILLIS) as u64
}
