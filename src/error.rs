//! use localca::error::PkiError;

use thiserror::Error;

/// Represents errors that can occur while issuing or storing certificates.
///
/// Every failure is surfaced to the caller; nothing is retried internally.
#[derive(Debug, Error, Clone)]
pub enum PkiError {
    /// The key generation primitive or its entropy source failed.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error due to invalid input (empty DNS name list, malformed subject fields).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encoding the to-be-signed body or producing the signature failed.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding, including corrupt persisted bundles.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// The storage collaborator failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A certificate signature did not verify.
    #[error("Verification failed: {0}")]
    VerificationError(String),
}

pub type Result<T> = std::result::Result<T, PkiError>;

impl From<der::Error> for PkiError {
    /// Converts a `der::Error` into a `PkiError`.
    fn from(err: der::Error) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for PkiError {
    fn from(err: pkcs8::Error) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}

impl From<spki::Error> for PkiError {
    fn from(err: spki::Error) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for PkiError {
    fn from(err: pem::PemError) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}
