// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For decoding FLAC frames to per-channel samples
//!
//! A [`Decoder`] alternates between two states.
//! While searching for frame sync it scans input bytes
//! for a frame's sync code, and once one is found it
//! reads the remainder of that frame.
//! Any recoverable problem with the frame, such as a bad
//! header or corrupt subframe, sends the decoder back
//! to searching and is reported as an [`ErrorStatus`].

use crate::audio::ChannelBuffers;
use crate::bitreader::BitReader;
use crate::metadata::{Metadata, Streaminfo};
use crate::stream::{Frame, FrameHeader, FrameNumber};
use crate::subframe::read_subframe;
use crate::{Error, FrameError, MAX_BLOCK_SIZE, MAX_CHANNELS, MIN_BLOCK_SIZE};
use arrayvec::ArrayVec;
use log::{debug, warn};

/// Where the decoder is in its processing of the stream
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecoderState {
    /// Looking for the next frame's sync code
    SearchForFrameSync,
    /// Sync found, ready to read the rest of the frame
    ReadFrame,
    /// The caller has run out of input
    EndOfStream,
    /// Decoding was aborted
    ///
    /// Never entered by this decoder, which has
    /// no way to abort mid-stream.
    Aborted,
    /// Memory could not be allocated
    ///
    /// Never entered by this decoder, which
    /// performs no allocation.
    MemoryAllocationError,
}

/// A recoverable problem found in the stream
///
/// After any of these, the decoder goes back to searching
/// for the next frame's sync code, except for
/// [`ErrorStatus::FrameCrcMismatch`] whose frame
/// is still delivered, but muted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorStatus {
    /// Bytes were skipped to find frame sync,
    /// or a frame was found to be corrupt partway through
    LostSync,
    /// A frame header had reserved bits set or a bad CRC-8
    BadHeader,
    /// A frame's CRC-16 didn't match its contents
    FrameCrcMismatch,
    /// A frame used a reserved or unknown encoding
    UnparseableStream,
    /// A frame's channels, bits-per-sample or sample rate
    /// changed from those of the previous frame
    ChangedHeader,
    /// A frame's parameters are outside the decoder's configuration
    UnsupportedStream,
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::LostSync => "lost sync".fmt(f),
            Self::BadHeader => "bad frame header".fmt(f),
            Self::FrameCrcMismatch => "frame CRC-16 mismatch".fmt(f),
            Self::UnparseableStream => "unparseable stream".fmt(f),
            Self::ChangedHeader => "frame header changed mid-stream".fmt(f),
            Self::UnsupportedStream => "unsupported stream".fmt(f),
        }
    }
}

/// The smallest sample rate accepted by default, in Hz
pub const DEFAULT_MIN_SAMPLE_RATE: u32 = 8000;

/// The largest sample rate accepted by default, in Hz
pub const DEFAULT_MAX_SAMPLE_RATE: u32 = 96000;

/// The largest sample rate a frame header can express, in Hz
pub const MAX_SAMPLE_RATE: u32 = 655350;

/// Parameters fixed for the lifetime of a decoder
///
/// ```
/// use flac_frame_decoder::decode::DecoderConfig;
///
/// let config = DecoderConfig::new(6, 2)
///     .max_block_size(4096)
///     .sample_rate_range(44100, 48000);
/// assert_eq!(config.buffer_len(), 6 * 4096);
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DecoderConfig {
    input_channels: u8,
    output_channels: u8,
    max_block_size: u16,
    min_sample_rate: u32,
    max_sample_rate: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input_channels: 2,
            output_channels: 2,
            max_block_size: 4608,
            min_sample_rate: DEFAULT_MIN_SAMPLE_RATE,
            max_sample_rate: DEFAULT_MAX_SAMPLE_RATE,
        }
    }
}

impl DecoderConfig {
    /// Supports frames of up to `input_channels` channels,
    /// of which the first `output_channels` are fully decoded
    ///
    /// Any remaining channels are parsed and checksummed,
    /// but their samples are left undefined.
    pub fn new(input_channels: u8, output_channels: u8) -> Self {
        Self {
            input_channels,
            output_channels,
            ..Self::default()
        }
    }

    /// Sets the largest frame block size to support, in samples
    ///
    /// Must be at least 16.
    /// The default is 4608, the largest in FLAC's streamable subset.
    pub fn max_block_size(self, max_block_size: u16) -> Self {
        Self {
            max_block_size,
            ..self
        }
    }

    /// Sets the range of supported sample rates, in Hz
    ///
    /// The default is 8000 to 96000 Hz.
    pub fn sample_rate_range(self, min_sample_rate: u32, max_sample_rate: u32) -> Self {
        Self {
            min_sample_rate,
            max_sample_rate,
            ..self
        }
    }

    /// Returns number of channels the decoder will accept
    #[inline]
    pub fn input_channels(&self) -> u8 {
        self.input_channels
    }

    /// Returns number of channels the decoder will fully decode
    #[inline]
    pub fn output_channels(&self) -> u8 {
        self.output_channels
    }

    /// The number of samples callers must provide for decoding
    ///
    /// That is, one maximum-sized block for each input channel.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        usize::from(self.input_channels) * usize::from(self.max_block_size)
    }

    fn validate(&self) -> Result<(), Error> {
        if !(1..=MAX_CHANNELS).contains(&usize::from(self.input_channels))
            || !(1..=self.input_channels).contains(&self.output_channels)
        {
            Err(Error::InvalidChannelCount)
        } else if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.max_block_size) {
            Err(Error::InvalidBlockSize)
        } else if self.min_sample_rate == 0
            || self.min_sample_rate > self.max_sample_rate
            || self.max_sample_rate > MAX_SAMPLE_RATE
        {
            Err(Error::InvalidSampleRateRange)
        } else {
            Ok(())
        }
    }
}

/// The result of a call to [`Decoder::decode_frame`]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DecodeOutcome {
    /// Number of input bytes the caller should advance by
    pub bytes_consumed: usize,
    /// Offset of the frame's sync code in the input, if found
    pub sync_offset: Option<usize>,
    /// Whether a frame was decoded to the channel buffers
    ///
    /// A frame whose CRC-16 didn't match is still delivered,
    /// but with its samples muted.
    pub got_frame: bool,
}

/// A FLAC frame decoder
///
/// The decoder holds no samples of its own.
/// Each frame is decoded into a set of [`ChannelBuffers`]
/// borrowed for the duration of the call.
#[derive(Clone, Debug)]
pub struct Decoder {
    config: DecoderConfig,
    streaminfo: Option<Streaminfo>,
    state: DecoderState,
    error_status: Option<ErrorStatus>,
    // a byte handed back by the header parser for the next sync search
    lookahead: Option<u8>,
    // the sync code bytes, which belong to the frame header
    header_warmup: [u8; 2],
    fixed_block_size: Option<u16>,
    next_fixed_block_size: Option<u16>,
    channels: u8,
    bits_per_sample: u32,
    sample_rate: u32,
    blocksize: u16,
    frame: Option<Frame>,
}

impl Decoder {
    /// Builds new decoder from the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration's channel counts,
    /// maximum block size or sample rate range are invalid.
    pub fn new(config: DecoderConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            streaminfo: None,
            state: DecoderState::SearchForFrameSync,
            error_status: None,
            lookahead: None,
            header_warmup: [0; 2],
            fixed_block_size: None,
            next_fixed_block_size: None,
            channels: 0,
            bits_per_sample: 0,
            sample_rate: 0,
            blocksize: 0,
            frame: None,
        })
    }

    /// Supplies the stream's parameters, if known
    ///
    /// These persist across calls to [`Decoder::reset`]
    /// and [`Decoder::flush`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStreaminfo`] if any
    /// of the parameters are out of range.
    pub fn set_streaminfo(&mut self, streaminfo: Streaminfo) -> Result<(), Error> {
        streaminfo.validate()?;
        self.streaminfo = Some(streaminfo);
        Ok(())
    }

    /// Returns decoder's configuration
    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns stream parameters, if supplied
    #[inline]
    pub fn streaminfo(&self) -> Option<&Streaminfo> {
        self.streaminfo.as_ref()
    }

    /// Returns decoder's current state
    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Returns the most recent recoverable stream problem, if any
    ///
    /// Cleared at the start of each sync search.
    #[inline]
    pub fn error_status(&self) -> Option<ErrorStatus> {
        self.error_status
    }

    /// Returns channel count of the most recent frame
    ///
    /// 0 if no frame has been decoded yet.
    #[inline]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Returns block size of the most recent frame, in samples
    ///
    /// 0 if no frame has been decoded yet.
    #[inline]
    pub fn blocksize(&self) -> u16 {
        self.blocksize
    }

    /// Returns the most recent frame's header and subframes
    #[inline]
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Returns to searching for frame sync
    ///
    /// Any byte held back for the next sync search is discarded,
    /// but the stream's established fixed block size is kept.
    pub fn flush(&mut self) {
        self.state = DecoderState::SearchForFrameSync;
        self.lookahead = None;
    }

    /// Prepares to decode a new stream
    ///
    /// Like [`Decoder::flush`], but also forgets the
    /// stream's established fixed block size.
    /// The configuration and stream parameters are kept.
    pub fn reset(&mut self) {
        self.flush();
        self.fixed_block_size = None;
        self.next_fixed_block_size = None;
    }

    /// Scans the reader for the next frame's sync code
    ///
    /// On success, the decoder's state becomes [`DecoderState::ReadFrame`]
    /// and the reader is positioned just past the sync code.
    /// Does nothing if the decoder isn't searching for frame sync.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShortInput`] if the reader runs out
    /// of input before sync is found.
    pub fn process_frame_sync(&mut self, r: &mut BitReader<'_>) -> Result<(), Error> {
        if self.state != DecoderState::SearchForFrameSync {
            return Ok(());
        }

        self.error_status = None;

        if !r.is_byte_aligned() {
            r.skip_bits_no_crc(r.bits_left_for_alignment())?;
        }

        let mut skipped = 0usize;

        loop {
            let byte = match self.lookahead.take() {
                Some(byte) => byte,
                None => read_byte(r)?,
            };

            if byte == 0xff {
                self.header_warmup[0] = byte;
                match read_byte(r)? {
                    // may begin the sync code itself
                    0xff => self.lookahead = Some(0xff),
                    byte if byte >> 1 == 0x7c => {
                        self.header_warmup[1] = byte;
                        self.state = DecoderState::ReadFrame;
                        if skipped > 0 {
                            debug!("frame sync regained after {skipped} bytes");
                        }
                        return Ok(());
                    }
                    _ => {}
                }
            }

            if skipped == 0 {
                debug!("frame sync lost");
                self.error_status = Some(ErrorStatus::LostSync);
            }
            skipped += 1;
        }
    }

    /// Reads the remainder of a frame into the given buffers
    ///
    /// Returns `true` if a frame was decoded, though its samples
    /// will be muted if its CRC-16 doesn't match.
    /// Returns `false` if the frame was rejected, after which
    /// [`Decoder::error_status`] indicates why and the decoder
    /// goes back to searching for frame sync.
    /// Does nothing if the decoder isn't ready to read a frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBufferSize`] if the buffers are smaller
    /// than the decoder's configuration requires,
    /// [`Error::ShortInput`] if the reader runs out of input,
    /// or [`Error::PartitionTooSmall`] if the frame's residuals
    /// can't be decoded safely.
    pub fn process_read_frame(
        &mut self,
        r: &mut BitReader<'_>,
        buffers: &mut ChannelBuffers<'_>,
    ) -> Result<bool, Error> {
        if self.state != DecoderState::ReadFrame {
            return Ok(false);
        }

        if buffers.channels() < usize::from(self.config.input_channels)
            || buffers.channel_len() < usize::from(self.config.max_block_size)
        {
            return Err(Error::InvalidBufferSize);
        }

        match self.read_frame(r, buffers) {
            Ok(()) => Ok(true),
            Err(FrameError::Rejected(status)) => {
                self.reject(status);
                Ok(false)
            }
            Err(FrameError::Backtrack(byte)) => {
                self.lookahead = Some(byte);
                self.reject(ErrorStatus::BadHeader);
                Ok(false)
            }
            Err(FrameError::Failed(Error::PartitionTooSmall)) => {
                warn!("residual partition smaller than predictor order");
                self.reject(ErrorStatus::LostSync);
                Err(Error::PartitionTooSmall)
            }
            Err(FrameError::Failed(err)) => Err(err),
        }
    }

    /// Decodes the first frame found in `input`
    ///
    /// Runs both [`Decoder::process_frame_sync`] and
    /// [`Decoder::process_read_frame`] over a fresh window of input.
    /// The outcome's `bytes_consumed` says how far the caller
    /// should advance before the next call.
    ///
    /// Given empty input, the decoder enters [`DecoderState::EndOfStream`]
    /// and stays there until reset or flushed.
    ///
    /// If the input ends before the frame does, the decoder flushes
    /// back to searching for frame sync and `bytes_consumed` points
    /// at the frame's start, so the caller can retry once
    /// more input is available.
    /// Likewise, if input ends during the sync search,
    /// a trailing 0xFF byte is left unconsumed.
    ///
    /// # Errors
    ///
    /// Returns an error only for problems which aren't
    /// recoverable by searching for the next frame.
    pub fn decode_frame(
        &mut self,
        input: &[u8],
        buffers: &mut ChannelBuffers<'_>,
    ) -> Result<DecodeOutcome, Error> {
        if input.is_empty() {
            self.state = DecoderState::EndOfStream;
        }

        if self.state == DecoderState::EndOfStream {
            return Ok(DecodeOutcome::default());
        }

        // each call begins a fresh window of input
        self.flush();

        let mut r = BitReader::new(input);

        match self.process_frame_sync(&mut r) {
            Ok(()) => {}
            Err(Error::ShortInput) => {
                let consumed = r.bytes_consumed();
                return Ok(DecodeOutcome {
                    bytes_consumed: match input[..consumed].last() {
                        Some(0xff) => consumed - 1,
                        _ => consumed,
                    },
                    sync_offset: None,
                    got_frame: false,
                });
            }
            Err(err) => return Err(err),
        }

        let sync_offset = r.bytes_consumed().checked_sub(2);

        match self.process_read_frame(&mut r, buffers) {
            Ok(got_frame) => Ok(DecodeOutcome {
                bytes_consumed: match self.lookahead {
                    // the byte will be seen again by the next search
                    Some(_) => r.bytes_consumed() - 1,
                    None => r.bytes_consumed(),
                },
                sync_offset,
                got_frame,
            }),
            Err(Error::ShortInput) => {
                self.flush();
                Ok(DecodeOutcome {
                    bytes_consumed: sync_offset.unwrap_or_default(),
                    sync_offset,
                    got_frame: false,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn reject(&mut self, status: ErrorStatus) {
        debug!("frame rejected: {status}");
        self.error_status = Some(status);
        self.state = DecoderState::SearchForFrameSync;
    }

    fn read_frame(
        &mut self,
        r: &mut BitReader<'_>,
        buffers: &mut ChannelBuffers<'_>,
    ) -> Result<(), FrameError> {
        r.reset_crc16(crate::crc::crc16(&self.header_warmup));

        let header = FrameHeader::read(r, self.header_warmup, self.streaminfo.as_ref())?;
        let sample_number = self.sample_number(&header);
        self.check_header(&header)?;

        let block_size = usize::from(header.block_size);
        let channels = usize::from(header.channel_assignment.count());
        let output_channels = usize::from(self.config.output_channels);
        let side_channel = header.channel_assignment.side_channel();

        let mut subframes = ArrayVec::new();
        for channel in 0..channels {
            subframes.push(read_subframe(
                r,
                header.bits_per_sample + u32::from(side_channel == Some(channel)),
                &mut buffers.channel_mut(channel)[0..block_size],
                channel < output_channels,
            )?);
        }

        if !r.is_byte_aligned() && r.read_raw_u32(r.bits_left_for_alignment())? != 0 {
            return Err(ErrorStatus::LostSync.into());
        }

        let crc16 = r.get_crc16();
        let frame_crc16 = r.read_raw_u32(16)? as u16;

        if crc16 == frame_crc16 {
            if side_channel.is_some() && output_channels >= 2 {
                let (channel0, channel1) = buffers.stereo_mut(block_size);
                header.channel_assignment.decorrelate(channel0, channel1);
            }
        } else {
            warn!("frame CRC-16 mismatch, expected {crc16:04x}, got {frame_crc16:04x}");
            self.error_status = Some(ErrorStatus::FrameCrcMismatch);
            buffers.mute(channels.min(output_channels), block_size);
        }

        if let Some(size) = self.next_fixed_block_size {
            self.fixed_block_size = Some(size);
        }

        self.channels = header.channel_count();
        self.bits_per_sample = header.bits_per_sample;
        self.sample_rate = header.sample_rate;
        self.blocksize = header.block_size;
        self.frame = Some(Frame {
            header,
            sample_number,
            subframes,
        });
        self.state = DecoderState::SearchForFrameSync;

        Ok(())
    }

    // converts a frame number to the frame's first sample number
    fn sample_number(&mut self, header: &FrameHeader) -> u64 {
        self.next_fixed_block_size = None;

        match header.number {
            FrameNumber::Sample(sample) => sample,
            FrameNumber::Frame(frame) => {
                let frame = u64::from(frame);
                match (
                    self.fixed_block_size,
                    self.streaminfo.as_ref().and_then(|s| s.fixed_block_size()),
                ) {
                    (Some(size), _) => u64::from(size) * frame,
                    (None, Some(size)) => {
                        self.next_fixed_block_size = Some(size);
                        u64::from(size) * frame
                    }
                    (None, None) => {
                        if frame == 0 {
                            self.next_fixed_block_size = Some(header.block_size);
                        }
                        u64::from(header.block_size) * frame
                    }
                }
            }
        }
    }

    // ensures the header fits our configuration and the stream so far
    fn check_header(&self, header: &FrameHeader) -> Result<(), ErrorStatus> {
        let min_block_size = match &self.streaminfo {
            Some(streaminfo) if streaminfo.fixed_block_size().is_none() => MIN_BLOCK_SIZE,
            _ => 1,
        };

        let mut status = None;

        if !(self.config.min_sample_rate..=self.config.max_sample_rate)
            .contains(&header.sample_rate)
            || !(min_block_size..=self.config.max_block_size).contains(&header.block_size)
            || header.channel_assignment.count() > self.config.input_channels
        {
            status = Some(ErrorStatus::UnsupportedStream);
        }

        if self.channels != 0
            && self.bits_per_sample != 0
            && self.sample_rate != 0
            && self.blocksize != 0
            && (self.channels != header.channel_count()
                || self.bits_per_sample != header.bits_per_sample
                || self.sample_rate != header.sample_rate)
        {
            status = Some(ErrorStatus::ChangedHeader);
        }

        match status {
            None => Ok(()),
            Some(status) => Err(status),
        }
    }
}

impl Metadata for Decoder {
    fn channel_count(&self) -> u8 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }
}

fn read_byte(r: &mut BitReader<'_>) -> Result<u8, Error> {
    let mut byte = [0];
    r.read_byte_block_aligned_no_crc(&mut byte)?;
    Ok(byte[0])
}
