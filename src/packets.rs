//! Probe packet wire format.
//!
//! A probe carries a single monotonic timestamp in nanoseconds, taken by the
//! sending agent right before transmission:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Timestamp (big-endian)                    |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! There is no version field and no sequence number. Peers echo the bytes back
//! unmodified, so only the originating agent ever interprets the timestamp.

use thiserror::Error;

/// Size of a probe payload on the wire.
pub const PROBE_SIZE: usize = 8;

/// Errors raised while decoding a probe payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Invalid probe length: expected 8 bytes, got {0}")]
    InvalidLength(usize),
}

/// Serializes a timestamp into the 8-byte probe payload.
pub fn encode(timestamp: u64) -> [u8; PROBE_SIZE] {
    timestamp.to_be_bytes()
}

/// Parses a probe payload back into its timestamp.
///
/// # Errors
/// Returns [`PacketError::InvalidLength`] unless `buf` is exactly
/// [`PROBE_SIZE`] bytes long. Truncated and padded datagrams are both rejected.
pub fn decode(buf: &[u8]) -> Result<u64, PacketError> {
    let bytes: [u8; PROBE_SIZE] = buf
        .try_into()
        .map_err(|_| PacketError::InvalidLength(buf.len()))?;
    Ok(u64::from_be_bytes(bytes))
}
