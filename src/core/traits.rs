//! Core traits for the telemetry receiver.

use super::error::CryptoError;

/// Turns a raw datagram into a plaintext frame.
///
/// Implementations MUST be deterministic for the fixed key material and
/// MUST report malformed input as an error rather than returning garbage.
/// The receive loop treats every error as a soft, per-datagram failure.
///
/// Any `Fn(&[u8]) -> Result<Vec<u8>, CryptoError>` closure or function
/// also implements this trait.
///
/// # Example
///
/// ```
/// use gt7_telemetry::core::{CryptoError, Decryptor};
///
/// fn passthrough(raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
///     Ok(raw.to_vec())
/// }
///
/// assert_eq!(passthrough.decrypt(b"abc").unwrap(), b"abc");
/// ```
pub trait Decryptor: Send + 'static {
    /// Decrypt one datagram.
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

impl<F> Decryptor for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, CryptoError> + Send + 'static,
{
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self(raw)
    }
}
