//! `PublicIdentityConverter`: a deterministic, reversible AES-ECB transform from
//! internal ids to an opaque 16-byte public form (§4.5).

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use uuid::Uuid;

use crate::distributed_id::DistributedId;
use crate::error::ConverterError;

/// The values [`PublicIdentityConverter::encode`] accepts.
///
/// `From` conversions are provided for every accepted width so callers can write
/// `converter.encode(42u64)` or `converter.encode(some_distributed_id)` directly.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum IntegralId {
    /// A plain 64-bit unsigned id.
    U64(u64),
    /// Must be non-negative by caller contract (§4.5); this is not checked on the
    /// way in, only on the way out through [`PublicIdentityConverter::try_decode_i64`].
    I64(i64),
    /// A full 128-bit id.
    U128(u128),
    /// A [`DistributedId`] produced by [`crate::DistributedIdGenerator`].
    DistributedId(DistributedId),
}

impl IntegralId {
    fn to_be_bytes(self) -> [u8; 16] {
        let value: u128 = match self {
            IntegralId::U64(v) => v as u128,
            IntegralId::I64(v) => (v as u64) as u128,
            IntegralId::U128(v) => v,
            IntegralId::DistributedId(v) => v.to_u128(),
        };
        value.to_be_bytes()
    }
}

impl From<u64> for IntegralId {
    fn from(v: u64) -> Self {
        IntegralId::U64(v)
    }
}

impl From<i64> for IntegralId {
    fn from(v: i64) -> Self {
        IntegralId::I64(v)
    }
}

impl From<u128> for IntegralId {
    fn from(v: u128) -> Self {
        IntegralId::U128(v)
    }
}

impl From<DistributedId> for IntegralId {
    fn from(v: DistributedId) -> Self {
        IntegralId::DistributedId(v)
    }
}

/// The AES cipher in use, selected by key length at construction time.
enum AesKey {
    Aes128(Aes128),
    Aes256(Aes256),
}

/// Converts internal ids to and from an opaque, AES-ECB-encrypted 16-byte public
/// form (§4.5).
///
/// A single 16-byte block is encrypted (or decrypted) per call; since there is
/// exactly one block and no chaining, this *is* ECB mode without needing a separate
/// mode-of-operation crate. The cached [`AesKey`] holds the expanded round keys,
/// which are zeroized on drop via the `aes` crate's `zeroize` feature.
pub struct PublicIdentityConverter {
    key: AesKey,
}

impl PublicIdentityConverter {
    /// Constructs a converter from a 16-byte (AES-128) or 32-byte (AES-256) key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::PublicIdentityConverter;
    ///
    /// let converter = PublicIdentityConverter::new(&[0u8; 32])?;
    /// let public = converter.encode(42u64);
    /// assert_eq!(converter.try_decode_u64(public), Some(42));
    ///
    /// assert!(PublicIdentityConverter::new(&[0u8; 24]).is_err());
    /// # Ok::<(), distributed_identities::ConverterError>(())
    /// ```
    pub fn new(key: &[u8]) -> Result<Self, ConverterError> {
        let key = match key.len() {
            16 => AesKey::Aes128(Aes128::new_from_slice(key).expect("length checked above")),
            32 => AesKey::Aes256(Aes256::new_from_slice(key).expect("length checked above")),
            other => return Err(ConverterError::InvalidKeyLength(other)),
        };
        Ok(Self { key })
    }

    /// Encrypts `id`'s 16-byte big-endian representation into an opaque [`Uuid`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use distributed_identities::PublicIdentityConverter;
    ///
    /// let converter = PublicIdentityConverter::new(&[0u8; 16])?;
    /// let a = converter.encode(1u64);
    /// let b = converter.encode(1u64);
    /// assert_eq!(a, b); // deterministic: same key, same input
    /// # Ok::<(), distributed_identities::ConverterError>(())
    /// ```
    pub fn encode(&self, id: impl Into<IntegralId>) -> Uuid {
        let mut block = id.into().to_be_bytes().into();
        match &self.key {
            AesKey::Aes128(cipher) => cipher.encrypt_block(&mut block),
            AesKey::Aes256(cipher) => cipher.encrypt_block(&mut block),
        }
        Uuid::from_bytes(block.into())
    }

    fn decrypt_u128(&self, public: Uuid) -> u128 {
        let mut block = (*public.as_bytes()).into();
        match &self.key {
            AesKey::Aes128(cipher) => cipher.decrypt_block(&mut block),
            AesKey::Aes256(cipher) => cipher.decrypt_block(&mut block),
        }
        u128::from_be_bytes(block.into())
    }

    /// Decodes `public`, succeeding only if the high 8 bytes of the plaintext are zero.
    pub fn try_decode_u64(&self, public: Uuid) -> Option<u64> {
        let value = self.decrypt_u128(public);
        (value >> 64 == 0).then_some(value as u64)
    }

    /// Decodes `public`, succeeding only if the plaintext fits in a non-negative `i64`.
    pub fn try_decode_i64(&self, public: Uuid) -> Option<i64> {
        let value = self.decrypt_u128(public);
        if value >> 64 != 0 {
            return None;
        }
        let low = value as u64;
        (low <= i64::MAX as u64).then_some(low as i64)
    }

    /// Decodes `public` as a full 128-bit integer; always succeeds.
    pub fn try_decode_u128(&self, public: Uuid) -> Option<u128> {
        Some(self.decrypt_u128(public))
    }

    /// Decodes `public`, succeeding only if the plaintext is within
    /// [`DistributedId::MAX`].
    pub fn try_decode_dec(&self, public: Uuid) -> Option<DistributedId> {
        DistributedId::from_u128(self.decrypt_u128(public))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_key_lengths() {
        assert!(matches!(
            PublicIdentityConverter::new(&[0u8; 15]),
            Err(ConverterError::InvalidKeyLength(15))
        ));
        assert!(matches!(
            PublicIdentityConverter::new(&[0u8; 24]),
            Err(ConverterError::InvalidKeyLength(24))
        ));
        assert!(PublicIdentityConverter::new(&[0u8; 16]).is_ok());
        assert!(PublicIdentityConverter::new(&[0u8; 32]).is_ok());
    }

    #[test]
    fn round_trips_u64() {
        let c = PublicIdentityConverter::new(&[7u8; 32]).unwrap();
        for v in [0u64, 1, 42, u64::MAX] {
            let public = c.encode(v);
            assert_eq!(c.try_decode_u64(public), Some(v));
        }
    }

    #[test]
    fn round_trips_i64_non_negative() {
        let c = PublicIdentityConverter::new(&[9u8; 16]).unwrap();
        for v in [0i64, 1, 42, i64::MAX] {
            let public = c.encode(v);
            assert_eq!(c.try_decode_i64(public), Some(v));
        }
    }

    #[test]
    fn round_trips_u128() {
        let c = PublicIdentityConverter::new(&[3u8; 32]).unwrap();
        let v = u128::MAX / 3;
        let public = c.encode(v);
        assert_eq!(c.try_decode_u128(public), Some(v));
    }

    #[test]
    fn round_trips_distributed_id() {
        let c = PublicIdentityConverter::new(&[1u8; 16]).unwrap();
        let id = DistributedId::from_u128(123_456_789_012_345).unwrap();
        let public = c.encode(id);
        assert_eq!(c.try_decode_dec(public), Some(id));
    }

    /// S5 — deterministic AES-256-ECB encryption under an all-zero key.
    #[test]
    fn s5_encrypts_deterministically_under_known_key() {
        let c = PublicIdentityConverter::new(&[0u8; 32]).unwrap();

        let mut expected_0 = GenericArray::from([0u8; 16]);
        let cipher = Aes256::new_from_slice(&[0u8; 32]).unwrap();
        cipher.encrypt_block(&mut expected_0);

        assert_eq!(*c.encode(0u64).as_bytes(), expected_0.as_slice());
        assert_eq!(c.try_decode_u64(c.encode(0u64)), Some(0));
        assert_eq!(c.try_decode_u64(c.encode(1u64)), Some(1));
    }

    /// S6 — a value that fits `u64` but overflows `i64` must fail `try_decode_i64`.
    #[test]
    fn s6_decode_validation_rejects_i64_overflow() {
        let c = PublicIdentityConverter::new(&[5u8; 32]).unwrap();
        let public = c.encode(u64::MAX);
        assert_eq!(c.try_decode_i64(public), None);
        assert_eq!(c.try_decode_u64(public), Some(u64::MAX));
    }

    #[test]
    fn different_keys_produce_unrelated_ciphertexts() {
        let a = PublicIdentityConverter::new(&[1u8; 32]).unwrap();
        let b = PublicIdentityConverter::new(&[2u8; 32]).unwrap();
        assert_ne!(a.encode(42u64), b.encode(42u64));
    }

    #[test]
    fn decode_rejects_values_above_distributed_id_max() {
        let c = PublicIdentityConverter::new(&[6u8; 16]).unwrap();
        // u128::MAX is far above DistributedId::MAX (10^28 - 1).
        let public = c.encode(u128::MAX);
        assert_eq!(c.try_decode_dec(public), None);
    }
}
