//! Built-in decryptor for the Gran Turismo 7 telemetry stream.
//!
//! Each datagram is XORed with a Salsa20 keystream. The key is fixed and
//! the 8-byte nonce is derived from a 32-bit IV word carried in the clear
//! at offset 0x40 of the datagram:
//!
//! ```text
//! nonce = LE32(iv ^ 0xDEADBEAF) || LE32(iv)
//! ```
//!
//! A decrypted frame starts with the magic `0x47375330`; anything else is
//! reported as [`CryptoError::DecryptionFailed`](crate::core::CryptoError).

mod cipher;

pub use cipher::*;
