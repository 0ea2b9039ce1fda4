//! Protocol and receiver constants.
//!
//! Wire values are fixed by the console and MUST NOT be changed. Timing
//! values are the defaults used by `ReceiverConfig`.

use std::time::Duration;

// =============================================================================
// WIRE PROTOCOL
// =============================================================================

/// Port the console listens on for heartbeats.
pub const SEND_PORT: u16 = 33739;

/// Port the console streams telemetry to.
pub const RECV_PORT: u16 = 33740;

/// Single-byte keep-alive payload (ASCII `'A'`).
pub const HEARTBEAT: &[u8; 1] = b"A";

/// Largest datagram the receiver accepts.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

// =============================================================================
// FRAME LAYOUT (post-decryption)
// =============================================================================

/// Magic number at offset 0 of a correctly decrypted frame ("0S7G" as LE u32).
pub const FRAME_MAGIC: u32 = 0x4737_5330;

/// Offset of the IV word in the raw (still encrypted) datagram.
pub const IV_OFFSET: usize = 0x40;

/// Offset of the 4-byte signed packet sequence number.
pub const SEQUENCE_OFFSET: usize = 0x70;

/// Smallest frame that still carries a sequence number.
pub const MIN_FRAME_SIZE: usize = SEQUENCE_OFFSET + 4;

// =============================================================================
// CRYPTO
// =============================================================================

/// Shared key material; the cipher uses its first 32 bytes.
pub const KEY_MATERIAL: &[u8] = b"Simulator Interface Packet GT7 ver 0.0";

/// Mask XORed into the IV word to form the first half of the nonce.
pub const IV_MASK: u32 = 0xDEAD_BEAF;

// =============================================================================
// TIMING
// =============================================================================

/// Socket receive timeout.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A heartbeat is due once this much time has passed since the last one.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Number of consecutive local ports tried by a single bind.
pub const BIND_ATTEMPTS: u16 = 10;

/// Reconnect backoff floor.
pub const BACKOFF_MIN: Duration = Duration::from_secs(1);

/// Reconnect backoff ceiling.
pub const BACKOFF_MAX: Duration = Duration::from_secs(30);

// =============================================================================
// CHANNELS & RECORDING
// =============================================================================

/// Depth of the control command queue.
pub const COMMAND_CAPACITY: usize = 32;

/// Suggested depth of a consumer frame channel (see `ReceiverHandle::subscribe`).
pub const FRAME_CAPACITY: usize = 64;

/// Extension of recording files.
pub const RECORDING_EXTENSION: &str = "gt7";

/// `chrono` format used for the timestamp in recording file names.
pub const RECORDING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
