//! Salsa20 frame decryption.

use salsa20::Salsa20;
use salsa20::cipher::{KeyIvInit, StreamCipher};

use crate::core::{
    CryptoError, Decryptor, FRAME_MAGIC, IV_MASK, IV_OFFSET, KEY_MATERIAL, MIN_FRAME_SIZE,
};

/// Size of the Salsa20 key.
pub const KEY_SIZE: usize = 32;

/// Size of the Salsa20 nonce.
pub const NONCE_SIZE: usize = 8;

/// Decryptor for GT7 telemetry datagrams.
#[derive(Clone)]
pub struct Gt7Decryptor {
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for Gt7Decryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gt7Decryptor").finish_non_exhaustive()
    }
}

impl Default for Gt7Decryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Gt7Decryptor {
    /// Create a decryptor using the console's fixed key material.
    pub fn new() -> Self {
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&KEY_MATERIAL[..KEY_SIZE]);
        Self { key }
    }

    /// Derive the Salsa20 nonce from the datagram's IV word.
    pub fn nonce_for(iv: u32) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..4].copy_from_slice(&(iv ^ IV_MASK).to_le_bytes());
        nonce[4..].copy_from_slice(&iv.to_le_bytes());
        nonce
    }

    /// Build the datagram the console would send for `plaintext`.
    ///
    /// The IV word is written in the clear at offset 0x40, overwriting
    /// whatever the plaintext held there. Used by simulators and tests.
    pub fn encrypt(&self, plaintext: &[u8], iv: u32) -> Result<Vec<u8>, CryptoError> {
        if plaintext.len() < MIN_FRAME_SIZE {
            return Err(CryptoError::Malformed {
                len: plaintext.len(),
            });
        }

        let mut out = plaintext.to_vec();
        self.apply_keystream(iv, &mut out);
        out[IV_OFFSET..IV_OFFSET + 4].copy_from_slice(&iv.to_le_bytes());
        Ok(out)
    }

    fn apply_keystream(&self, iv: u32, buf: &mut [u8]) {
        let nonce = Self::nonce_for(iv);
        let mut cipher = Salsa20::new(&self.key.into(), &nonce.into());
        cipher.apply_keystream(buf);
    }
}

impl Decryptor for Gt7Decryptor {
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if raw.len() < MIN_FRAME_SIZE {
            return Err(CryptoError::Malformed { len: raw.len() });
        }

        let iv = read_u32_le(raw, IV_OFFSET);
        let mut plain = raw.to_vec();
        self.apply_keystream(iv, &mut plain);

        if read_u32_le(&plain, 0) != FRAME_MAGIC {
            return Err(CryptoError::DecryptionFailed);
        }
        Ok(plain)
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}
