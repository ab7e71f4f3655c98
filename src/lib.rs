// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A fixed-footprint decoder for individual FLAC frames
//!
//! This crate decodes one FLAC frame at a time from a window
//! of bytes the caller has already positioned at (or just before)
//! a frame boundary.
//! It never allocates.
//! All samples are written to a single caller-owned buffer
//! of channel data, sized once from a [`decode::DecoderConfig`].
//!
//! Decoding is split into two phases so the caller can see
//! exactly where a frame's sync code was found before committing
//! to reading the rest of it:
//!
//! 1. [`decode::Decoder::process_frame_sync`] scans for the sync code
//! 2. [`decode::Decoder::process_read_frame`] reads the header,
//!    subframes and footer checksum
//!
//! [`decode::Decoder::decode_frame`] runs both phases at once.
//!
//! Stream parameters which would normally come from a
//! STREAMINFO metadata block are given directly by the caller
//! as a [`metadata::Streaminfo`].
//!
//! # Example
//!
//! ```
//! use flac_frame_decoder::{audio::ChannelBuffers, decode::{Decoder, DecoderConfig}};
//!
//! // a 2 channel, 16 bps, 44100 Hz frame of 4 constant samples per channel
//! let frame = [
//!     0xff, 0xf8, 0x69, 0x18, 0x00, 0x03, 0xb6,  // header
//!     0x00, 0x00, 0x64,                          // subframe 0
//!     0x00, 0xff, 0x9c,                          // subframe 1
//!     0x1b, 0x3b,                                // CRC-16
//! ];
//!
//! let config = DecoderConfig::new(2, 2).max_block_size(16);
//! let mut decoder = Decoder::new(config).unwrap();
//! let mut samples = vec![0; config.buffer_len()];
//! let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();
//!
//! let outcome = decoder.decode_frame(&frame, &mut buffers).unwrap();
//! assert!(outcome.got_frame);
//! assert_eq!(outcome.bytes_consumed, frame.len());
//! assert_eq!(decoder.blocksize(), 4);
//! assert_eq!(&buffers.channel(0)[0..4], &[100, 100, 100, 100]);
//! assert_eq!(&buffers.channel(1)[0..4], &[-100, -100, -100, -100]);
//! ```

pub mod audio;
pub mod bitreader;
pub mod crc;
pub mod decode;
pub mod fixed;
pub mod lpc;
pub mod metadata;
pub mod stream;
pub mod subframe;

/// The largest number of channels a FLAC stream may have
pub const MAX_CHANNELS: usize = 8;

/// The largest block size a FLAC frame may have, in samples
pub const MAX_BLOCK_SIZE: u16 = u16::MAX;

/// The smallest block size of a variable block size stream
pub const MIN_BLOCK_SIZE: u16 = 16;

/// The largest bits-per-sample this decoder supports
///
/// A side channel carries one bit more than this.
pub const MAX_BITS_PER_SAMPLE: u32 = 24;

/// The largest LPC subframe order
pub const MAX_LPC_ORDER: usize = 32;

/// The largest fixed subframe order
pub const MAX_FIXED_ORDER: usize = 4;

/// The largest possible frame header, in bytes, including its CRC-8
pub const MAX_HEADER_SIZE: usize = 16;

/// A hard decoding error
///
/// Recoverable stream problems, such as a corrupted
/// frame header, are not errors.
/// Those are reported by [`decode::Decoder::error_status`]
/// and the decoder simply goes back to looking for the next frame.
#[derive(Debug)]
pub enum Error {
    /// The input window ran out of bits
    ///
    /// The caller should supply more input and retry
    /// from the start of the frame.
    ShortInput,
    /// A residual partition is too small for its predictor
    ///
    /// This indicates a corrupt or malicious stream
    /// and decoding cannot safely continue.
    PartitionTooSmall,
    /// The given channel buffers are too small for the configuration
    InvalidBufferSize,
    /// Supported channel counts are out of range
    InvalidChannelCount,
    /// The configured maximum block size is out of range
    InvalidBlockSize,
    /// The configured sample rate range is invalid
    InvalidSampleRateRange,
    /// The given stream parameters are invalid
    InvalidStreaminfo,
}

// bit reads from an in-memory window can only fail by running dry
impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Self::ShortInput
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ShortInput => "insufficient input for frame".fmt(f),
            Self::PartitionTooSmall => "residual partition smaller than predictor order".fmt(f),
            Self::InvalidBufferSize => "channel buffers too small for configuration".fmt(f),
            Self::InvalidChannelCount => "invalid supported channel count".fmt(f),
            Self::InvalidBlockSize => "invalid maximum block size".fmt(f),
            Self::InvalidSampleRateRange => "invalid sample rate range".fmt(f),
            Self::InvalidStreaminfo => "invalid stream parameters".fmt(f),
        }
    }
}

/// Why reading part of a frame stopped early
///
/// A frame may be rejected with a status, after which
/// the decoder goes back to searching for sync,
/// or it may fail outright with an error.
#[derive(Debug)]
pub(crate) enum FrameError {
    Rejected(decode::ErrorStatus),
    // a bad header whose last byte may begin the next sync code
    Backtrack(u8),
    Failed(Error),
}

impl From<Error> for FrameError {
    #[inline]
    fn from(error: Error) -> Self {
        Self::Failed(error)
    }
}

impl From<decode::ErrorStatus> for FrameError {
    #[inline]
    fn from(status: decode::ErrorStatus) -> Self {
        Self::Rejected(status)
    }
}

#[test]
fn test_header_code_errors() {
    use bitstream_io::{BigEndian, BitRead, BitReader};

    // three bytes can't hold a header's codes
    let data: &[u8] = &[0xff, 0xf8, 0x69];
    let result = BitReader::endian(data, BigEndian).parse::<stream::HeaderCodes>();
    assert!(matches!(result.map_err(Error::from), Err(Error::ShortInput)));
}
