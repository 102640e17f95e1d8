//! # distributed-identities
//!
//! Time-and-random monotonic identifier generators, plus a reversible converter
//! from internal ids to an opaque public form.
//!
//! This crate provides two generators and one converter:
//!
//! - [`DistributedIdGenerator`] produces 93-bit [`DistributedId`]s: a 45-bit
//!   millisecond timestamp plus a 48-bit random tail, with a one-second leeway
//!   that lets a burst of same-millisecond calls borrow a little headroom before
//!   falling back to sleeping.
//! - [`DistributedId128Generator`] produces 122-bit [`DistributedId128`]s shaped
//!   like a version-7 UUID: a 48-bit timestamp, a fixed version/variant marker,
//!   and a 75-bit random tail. It has no leeway; overflow is rare enough at this
//!   width that it just sleeps and retries.
//! - [`PublicIdentityConverter`] encrypts an internal id's 16-byte representation
//!   with AES-ECB into an opaque [`uuid::Uuid`], and decrypts it back, validating
//!   that the plaintext fits the type the caller asked for.
//!
//! ```
//! use distributed_identities::DistributedIdGenerator;
//!
//! let generator = DistributedIdGenerator::new();
//! let id = generator.create_id();
//! println!("{id}"); // a 28-digit zero-padded decimal string
//! ```
//!
//! ## Crate features
//!
//! - `log` (default) instruments generator construction and the rarer branches of
//!   id generation (overflow, clock rewind) with the [`log`] crate's facade. It
//!   carries no run-time cost beyond a level check when no logger is installed.
//!
//! Every generator is parameterized over a [`Clock`], a [`Sleep`], and an
//! [`rand::RngCore`] so tests can script exact timestamps and randomness instead
//! of waiting on the system clock; production code uses [`SystemClock`] and
//! [`ThreadSleep`] through the `new()` constructors.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::module_name_repetitions)]

mod clock;
mod distributed_id;
mod distributed_id128;
mod error;
mod public_identity;
mod random;
mod rng;

pub use clock::{Clock, Sleep, SystemClock, ThreadSleep};
pub use distributed_id::DistributedId;
pub use distributed_id128::DistributedId128;
pub use error::{ConverterError, ParseError};
pub use public_identity::{IntegralId, PublicIdentityConverter};
pub use rng::DefaultRng;

#[doc(inline)]
pub use distributed_id::DistributedIdGenerator;
#[doc(inline)]
pub use distributed_id128::DistributedId128Generator;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Generates 28-digit canonical string
    #[test]
    fn distributed_id_generates_28_digit_canonical_string() {
        let re = regex::Regex::new(r"^[0-9]{28}$").unwrap();
        let g = DistributedIdGenerator::new();
        for _ in 0..1_000 {
            assert!(re.is_match(&g.create_id().to_string()));
        }
    }

    /// Generates 38-digit canonical string
    #[test]
    fn distributed_id128_generates_38_digit_canonical_string() {
        let re = regex::Regex::new(r"^[0-9]{38}$").unwrap();
        let g = DistributedId128Generator::new();
        for _ in 0..1_000 {
            assert!(re.is_match(&g.create_id().to_string()));
        }
    }

    /// Generates identifiers without collision across a live clock
    #[test]
    fn distributed_id_generates_identifiers_without_collision() {
        let g = DistributedIdGenerator::new();
        let samples: Vec<DistributedId> = (0..10_000).map(|_| g.create_id()).collect();
        let unique: HashSet<u128> = samples.iter().map(|id| id.to_u128()).collect();
        assert_eq!(unique.len(), samples.len());
    }

    /// Generates monotonically increasing identifiers across a live clock
    #[test]
    fn distributed_id_generates_monotonic_sequence() {
        let g = DistributedIdGenerator::new();
        let mut prev = g.create_id();
        for _ in 0..10_000 {
            let curr = g.create_id();
            assert!(curr > prev);
            prev = curr;
        }
    }

    /// End-to-end: generate, encode to a public id, and recover the original.
    #[test]
    fn round_trips_a_generated_id_through_the_public_converter() {
        let g = DistributedIdGenerator::new();
        let converter = PublicIdentityConverter::new(&[0u8; 32]).unwrap();
        let id = g.create_id();
        let public = converter.encode(id);
        assert_eq!(converter.try_decode_dec(public), Some(id));
    }
}
