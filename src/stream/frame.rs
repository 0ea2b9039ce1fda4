//! Decoded telemetry frames.

use crate::core::{CryptoError, SEQUENCE_OFFSET};

/// One accepted datagram: the decrypted payload plus the raw bytes it
/// came from.
///
/// Constructed per datagram and handed to the consumer by value; the
/// receiver keeps no reference to it after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence: i32,
    payload: Vec<u8>,
    raw: Vec<u8>,
}

impl Frame {
    /// Build a frame from a decrypted payload and its raw datagram.
    ///
    /// Fails with [`CryptoError::Malformed`] if the payload is too short
    /// to carry a sequence number.
    pub fn new(payload: Vec<u8>, raw: Vec<u8>) -> Result<Self, CryptoError> {
        let sequence = read_sequence(&payload).ok_or(CryptoError::Malformed {
            len: payload.len(),
        })?;
        Ok(Self {
            sequence,
            payload,
            raw,
        })
    }

    /// Packet sequence number embedded in the payload.
    pub fn sequence(&self) -> i32 {
        self.sequence
    }

    /// Decrypted payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Raw datagram as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Split into `(payload, raw)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.payload, self.raw)
    }
}

/// Read the little-endian `i32` sequence number at offset 0x70.
pub(crate) fn read_sequence(payload: &[u8]) -> Option<i32> {
    let bytes = payload.get(SEQUENCE_OFFSET..SEQUENCE_OFFSET + 4)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
