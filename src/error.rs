//! Error types for the parts of this crate that can fail at all (§7).

/// Failure constructing a [`crate::PublicIdentityConverter`].
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConverterError {
    /// The supplied key was not 16 bytes (AES-128) or 32 bytes (AES-256).
    #[error("AES key must be 16 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Failure parsing a canonical decimal string into a [`crate::DistributedId`] or
/// [`crate::DistributedId128`].
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum ParseError {
    /// The string was not composed entirely of ASCII digits, or had the wrong length.
    #[error("expected a {expected}-digit decimal string, got {actual:?}")]
    MalformedDecimal { expected: usize, actual: String },

    /// The string parsed as an integer but exceeded the type's maximum value.
    #[error("decimal value out of range")]
    OutOfRange,
}
