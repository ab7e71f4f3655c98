// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling stream-wide parameters
//!
//! A FLAC file normally carries these in its STREAMINFO block,
//! but this decoder never parses metadata blocks.
//! The caller supplies whatever it knows about the stream
//! instead, and frame headers may defer to those values.

use crate::Error;
use std::num::NonZero;

/// Common stream properties
pub trait Metadata {
    /// Returns channel count
    ///
    /// From 1 to 8, or 0 if not yet known
    fn channel_count(&self) -> u8;

    /// Returns sample rate, in Hz
    fn sample_rate(&self) -> u32;

    /// Returns bits-per-sample
    ///
    /// From 4 to 24, or 0 if not yet known
    fn bits_per_sample(&self) -> u32;
}

/// Stream parameters supplied by the caller
///
/// Frame headers with a sample rate or bits-per-sample code
/// of 0 take those values from here, and a stream whose minimum
/// and maximum block sizes differ is treated as having
/// variable-sized blocks.
/// Each field is bounded by the width of the STREAMINFO
/// field it would normally be read from.
///
/// ```
/// use flac_frame_decoder::metadata::{Metadata, Streaminfo};
/// use std::num::NonZero;
///
/// let hints = Streaminfo {
///     minimum_block_size: 4096,
///     maximum_block_size: 4096,
///     minimum_frame_size: NonZero::new(14),
///     maximum_frame_size: NonZero::new(12_000),
///     sample_rate: 44100,
///     channels: NonZero::new(2).unwrap(),
///     bits_per_sample: 16,
/// };
/// assert!(hints.validate().is_ok());
/// assert_eq!(hints.fixed_block_size(), Some(4096));
/// assert_eq!(hints.channel_count(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Streaminfo {
    /// Smallest block size in the stream, not counting the final block
    pub minimum_block_size: u16,
    /// Largest block size in the stream, not counting the final block
    pub maximum_block_size: u16,
    /// Smallest frame in the stream, in bytes, if known
    pub minimum_frame_size: Option<NonZero<u32>>,
    /// Largest frame in the stream, in bytes, if known
    pub maximum_frame_size: Option<NonZero<u32>>,
    /// Stream's sample rate, in Hz
    pub sample_rate: u32,
    /// Stream's channel count, up to 8
    pub channels: NonZero<u8>,
    /// Stream's bits-per-sample, from 4 to 24
    pub bits_per_sample: u32,
}

impl Streaminfo {
    /// Largest frame size a 24-bit field can hold
    pub const MAX_FRAME_SIZE: u32 = 0xff_ffff;

    /// Largest sample rate a 20-bit field can hold
    pub const MAX_SAMPLE_RATE: u32 = 0xf_ffff;

    /// Returns the stream's block size, if all blocks are the same size
    #[inline]
    pub fn fixed_block_size(&self) -> Option<u16> {
        (self.minimum_block_size == self.maximum_block_size).then_some(self.maximum_block_size)
    }

    /// Ensures all fields are in range
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStreaminfo`] if any field
    /// couldn't have come from a valid STREAMINFO block.
    pub fn validate(&self) -> Result<(), Error> {
        let frame_size_ok =
            |size: Option<NonZero<u32>>| size.is_none_or(|s| s.get() <= Self::MAX_FRAME_SIZE);

        if self.minimum_block_size <= self.maximum_block_size
            && frame_size_ok(self.minimum_frame_size)
            && frame_size_ok(self.maximum_frame_size)
            && self.sample_rate <= Self::MAX_SAMPLE_RATE
            && usize::from(self.channels.get()) <= crate::MAX_CHANNELS
            && (4..=crate::MAX_BITS_PER_SAMPLE).contains(&self.bits_per_sample)
        {
            Ok(())
        } else {
            Err(Error::InvalidStreaminfo)
        }
    }
}

impl Metadata for Streaminfo {
    fn channel_count(&self) -> u8 {
        self.channels.get()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }
}

#[test]
fn test_streaminfo_validation() {
    let streaminfo = Streaminfo {
        minimum_block_size: 16,
        maximum_block_size: 4608,
        minimum_frame_size: None,
        maximum_frame_size: None,
        sample_rate: 48000,
        channels: NonZero::new(6).unwrap(),
        bits_per_sample: 24,
    };
    assert!(streaminfo.validate().is_ok());
    assert_eq!(streaminfo.fixed_block_size(), None);

    assert!(matches!(
        Streaminfo {
            minimum_block_size: 4608,
            maximum_block_size: 16,
            ..streaminfo.clone()
        }
        .validate(),
        Err(Error::InvalidStreaminfo)
    ));

    assert!(
        Streaminfo {
            channels: NonZero::new(9).unwrap(),
            ..streaminfo.clone()
        }
        .validate()
        .is_err()
    );

    assert!(
        Streaminfo {
            bits_per_sample: 3,
            ..streaminfo.clone()
        }
        .validate()
        .is_err()
    );

    assert!(
        Streaminfo {
            bits_per_sample: 32,
            ..streaminfo.clone()
        }
        .validate()
        .is_err()
    );

    assert!(
        Streaminfo {
            maximum_frame_size: NonZero::new(1 << 24),
            ..streaminfo
        }
        .validate()
        .is_err()
    );
}
