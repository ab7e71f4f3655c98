// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling FLAC frame headers
//!
//! Every frame begins with a header of the form
//!
//! | Bits   | Field | Meaning |
//! |-------:|------:|---------|
//! | 14     | sync code | always `0b11111111111110`
//! | 1      | reserved | must be 0
//! | 1      | blocking strategy | 1 for variable block sizes
//! | 4      | block size code |
//! | 4      | sample rate code |
//! | 4      | channel assignment |
//! | 3      | bits-per-sample code |
//! | 1      | reserved | must be 0
//! | 8-56   | frame or sample number | UTF-8-style coding
//! | 0-16   | block size | if indicated by its code
//! | 0-16   | sample rate | if indicated by its code
//! | 8      | CRC-8 | of all preceding header bytes

use crate::bitreader::{BitReader, UTF8_SENTINEL_U32, UTF8_SENTINEL_U64};
use crate::crc::crc8;
use crate::decode::ErrorStatus;
use crate::metadata::{Metadata, Streaminfo};
use crate::subframe::Subframe;
use crate::{Error, FrameError, MAX_CHANNELS, MAX_HEADER_SIZE};
use arrayvec::ArrayVec;
use bitstream_io::{BitRead, FromBitStream};

/// The sync code and reserved bit, as a 16-bit value
/// with the blocking strategy bit cleared
pub const FRAME_SYNC: u16 = 0b11111111_11111000;

/// The first 4 bytes of a frame header
///
/// These fields are fixed-sized and their contents
/// determine how the rest of the header is laid out.
///
/// ```
/// use flac_frame_decoder::stream::HeaderCodes;
/// use bitstream_io::{BitReader, BitRead, BigEndian};
///
/// let data: &[u8] = &[0xff, 0xf8, 0x69, 0x18];
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(
///     r.parse::<HeaderCodes>().unwrap(),
///     HeaderCodes {
///         sync_code: 0b11111111111110,
///         reserved: false,
///         variable_block_size: false,
///         block_size: 0b0110,       // 8-bit block size follows
///         sample_rate: 0b1001,      // 44100 Hz
///         channels: 0b0001,         // 2 independent channels
///         bits_per_sample: 0b100,   // 16 bps
///         padding: false,
///     },
/// );
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HeaderCodes {
    /// The 14-bit sync code
    pub sync_code: u16,
    /// Reserved bit following sync code
    pub reserved: bool,
    /// Whether the stream uses variable-sized blocks
    pub variable_block_size: bool,
    /// 4-bit block size code
    pub block_size: u8,
    /// 4-bit sample rate code
    pub sample_rate: u8,
    /// 4-bit channel assignment code
    pub channels: u8,
    /// 3-bit bits-per-sample code
    pub bits_per_sample: u8,
    /// Reserved bit following bits-per-sample
    pub padding: bool,
}

impl FromBitStream for HeaderCodes {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            sync_code: r.read::<14, _>()?,
            reserved: r.read_bit()?,
            variable_block_size: r.read_bit()?,
            block_size: r.read::<4, _>()?,
            sample_rate: r.read::<4, _>()?,
            channels: r.read::<4, _>()?,
            bits_per_sample: r.read::<3, _>()?,
            padding: r.read_bit()?,
        })
    }
}

// a header field whose value may come from elsewhere
#[derive(Copy, Clone, Debug)]
enum Field {
    Known(u32),
    Unknown,
    Follows { bytes: u8, scale: u32, offset: u32 },
}

impl Field {
    fn resolve<const N: usize>(
        self,
        r: &mut BitReader<'_>,
        raw: &mut ArrayVec<u8, N>,
    ) -> Result<Option<u32>, Error> {
        match self {
            Self::Known(value) => Ok(Some(value)),
            Self::Unknown => Ok(None),
            Self::Follows {
                bytes,
                scale,
                offset,
            } => {
                let mut value = 0;
                for _ in 0..bytes {
                    let byte = r.read_raw_u32(8)? as u8;
                    raw.push(byte);
                    value = (value << 8) | u32::from(byte);
                }
                Ok(Some(value * scale + offset))
            }
        }
    }
}

impl HeaderCodes {
    fn block_size(&self) -> Field {
        match self.block_size {
            0b0000 => Field::Unknown,
            0b0001 => Field::Known(192),
            v @ 0b0010..=0b0101 => Field::Known(576 << (v - 2)),
            0b0110 => Field::Follows {
                bytes: 1,
                scale: 1,
                offset: 1,
            },
            0b0111 => Field::Follows {
                bytes: 2,
                scale: 1,
                offset: 1,
            },
            v => Field::Known(256 << (v - 8)),
        }
    }

    fn sample_rate(&self, streaminfo: Option<&Streaminfo>) -> Option<Field> {
        Some(match self.sample_rate {
            0b0000 => streaminfo.map_or(Field::Unknown, |s| Field::Known(s.sample_rate)),
            0b0001 => Field::Known(88200),
            0b0010 => Field::Known(176400),
            0b0011 => Field::Known(192000),
            0b0100 => Field::Known(8000),
            0b0101 => Field::Known(16000),
            0b0110 => Field::Known(22050),
            0b0111 => Field::Known(24000),
            0b1000 => Field::Known(32000),
            0b1001 => Field::Known(44100),
            0b1010 => Field::Known(48000),
            0b1011 => Field::Known(96000),
            0b1100 => Field::Follows {
                bytes: 1,
                scale: 1000,
                offset: 0,
            },
            0b1101 => Field::Follows {
                bytes: 2,
                scale: 1,
                offset: 0,
            },
            0b1110 => Field::Follows {
                bytes: 2,
                scale: 10,
                offset: 0,
            },
            _ => return None, // invalid rather than merely reserved
        })
    }

    fn channel_assignment(&self) -> Option<ChannelAssignment> {
        match self.channels {
            c @ 0b0000..=0b0111 => Some(ChannelAssignment::Independent(c + 1)),
            0b1000 => Some(ChannelAssignment::LeftSide),
            0b1001 => Some(ChannelAssignment::SideRight),
            0b1010 => Some(ChannelAssignment::MidSide),
            _ => None,
        }
    }

    fn bits_per_sample(&self, streaminfo: Option<&Streaminfo>) -> Option<u32> {
        match self.bits_per_sample {
            0b000 => streaminfo.map(|s| s.bits_per_sample),
            0b001 => Some(8),
            0b010 => Some(12),
            0b100 => Some(16),
            0b101 => Some(20),
            0b110 => Some(24),
            _ => None,
        }
    }
}

/// How a frame's channels are stored
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelAssignment {
    /// Channels are stored independently
    Independent(u8),
    /// Channel 0 is left, channel 1 is side
    LeftSide,
    /// Channel 0 is side, channel 1 is right
    SideRight,
    /// Channel 0 is mid, channel 1 is side
    MidSide,
}

impl ChannelAssignment {
    /// Returns total number of channels
    pub fn count(&self) -> u8 {
        match self {
            Self::Independent(c) => *c,
            _ => 2,
        }
    }

    /// Returns which channel, if any, holds a side signal
    ///
    /// A side channel needs one more bit per sample than the others.
    pub fn side_channel(&self) -> Option<usize> {
        match self {
            Self::Independent(_) => None,
            Self::LeftSide | Self::MidSide => Some(1),
            Self::SideRight => Some(0),
        }
    }

    /// Converts decoded stereo channels back to left and right
    ///
    /// ```
    /// use flac_frame_decoder::stream::ChannelAssignment;
    ///
    /// let (mut mid, mut side) = ([5], [1]);
    /// ChannelAssignment::MidSide.decorrelate(&mut mid, &mut side);
    /// assert_eq!((mid, side), ([6], [5]));
    /// ```
    pub fn decorrelate(&self, channel0: &mut [i32], channel1: &mut [i32]) {
        match self {
            Self::Independent(_) => { /* nothing to do */ }
            Self::LeftSide => {
                for (left, side) in channel0.iter().zip(channel1) {
                    *side = left.wrapping_sub(*side);
                }
            }
            Self::SideRight => {
                for (side, right) in channel0.iter_mut().zip(channel1.iter()) {
                    *side = side.wrapping_add(*right);
                }
            }
            Self::MidSide => {
                for (mid, side) in channel0.iter_mut().zip(channel1) {
                    let sum = (*mid << 1) | (*side & 1);
                    *mid = sum.wrapping_add(*side) >> 1;
                    *side = sum.wrapping_sub(*side) >> 1;
                }
            }
        }
    }
}

/// A frame's position in the stream, as coded in its header
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameNumber {
    /// Frame number, for fixed block size streams
    Frame(u32),
    /// Starting sample number, for variable block size streams
    Sample(u64),
}

/// A parsed and checksummed FLAC frame header
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    /// Whether the stream uses variable-sized blocks
    pub variable_block_size: bool,
    /// Block size, in samples
    pub block_size: u16,
    /// Sample rate, in Hz
    pub sample_rate: u32,
    /// How channels are stored
    pub channel_assignment: ChannelAssignment,
    /// Bits-per-sample
    pub bits_per_sample: u32,
    /// Frame or sample number
    pub number: FrameNumber,
    /// CRC-8 over the raw header bytes
    pub crc8: u8,
}

impl FrameHeader {
    /// Reads the remainder of a frame header following its sync bytes
    ///
    /// `sync` holds the two bytes already consumed by sync search,
    /// which count toward the header's CRC-8.
    /// If an 0xFF byte is found where none should be,
    /// that byte is handed back so that sync search
    /// can pick up from it.
    pub(crate) fn read(
        r: &mut BitReader<'_>,
        sync: [u8; 2],
        streaminfo: Option<&Streaminfo>,
    ) -> Result<Self, FrameError> {
        use bitstream_io::BigEndian;

        let mut raw = ArrayVec::<u8, MAX_HEADER_SIZE>::new();
        raw.extend(sync);

        for _ in 0..2 {
            match r.read_raw_u32(8)? as u8 {
                // a sync code can't appear in a valid header
                0xff => return Err(FrameError::Backtrack(0xff)),
                byte => raw.push(byte),
            }
        }

        let codes = bitstream_io::BitReader::endian(&raw[0..4], BigEndian)
            .parse::<HeaderCodes>()
            .map_err(Error::from)?;

        let mut unparseable = codes.reserved || codes.padding;

        let block_size = codes.block_size();
        let sample_rate = codes
            .sample_rate(streaminfo)
            .ok_or(ErrorStatus::BadHeader)?;
        let channel_assignment = codes.channel_assignment();
        let bits_per_sample = codes.bits_per_sample(streaminfo);

        let number = if codes.variable_block_size
            || streaminfo.is_some_and(|s| s.fixed_block_size().is_none())
        {
            match r.read_utf8_u64(&mut raw)? {
                UTF8_SENTINEL_U64 => return Err(backtrack(&raw)),
                sample => FrameNumber::Sample(sample),
            }
        } else {
            match r.read_utf8_u32(&mut raw)? {
                UTF8_SENTINEL_U32 => return Err(backtrack(&raw)),
                frame => FrameNumber::Frame(frame),
            }
        };

        let block_size = block_size.resolve(r, &mut raw)?;
        let sample_rate = sample_rate.resolve(r, &mut raw)?;

        let crc = r.read_raw_u32(8)? as u8;
        if crc8(&raw) != crc {
            return Err(ErrorStatus::BadHeader.into());
        }

        let (Some(block_size), Some(sample_rate), Some(channel_assignment), Some(bits_per_sample)) =
            (block_size, sample_rate, channel_assignment, bits_per_sample)
        else {
            return Err(ErrorStatus::UnparseableStream.into());
        };
        unparseable |= block_size == 0;

        if unparseable {
            return Err(ErrorStatus::UnparseableStream.into());
        }

        Ok(Self {
            variable_block_size: codes.variable_block_size,
            block_size: block_size
                .try_into()
                .map_err(|_| ErrorStatus::UnsupportedStream)?,
            sample_rate,
            channel_assignment,
            bits_per_sample,
            number,
            crc8: crc,
        })
    }
}

// backs up as far as possible to the last byte read
fn backtrack(raw: &[u8]) -> FrameError {
    match raw.last() {
        Some(byte) => FrameError::Backtrack(*byte),
        None => FrameError::Rejected(ErrorStatus::BadHeader),
    }
}

impl Metadata for FrameHeader {
    fn channel_count(&self) -> u8 {
        self.channel_assignment.count()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }
}

/// The most recently read frame
///
/// Holds everything about a frame except its samples,
/// which are in the caller's channel buffers.
#[derive(Clone, Debug)]
pub struct Frame {
    /// The frame's header
    pub header: FrameHeader,
    /// The frame's first sample's position in the stream
    pub sample_number: u64,
    /// One subframe per channel
    pub subframes: ArrayVec<Subframe, MAX_CHANNELS>,
}
