// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For holding decoded samples in caller-owned memory

use crate::Error;

/// Per-channel sample buffers borrowed from the caller
///
/// All channels live in a single flat slice,
/// stacked one after another, with each channel
/// `channel_len` samples long.
/// A frame's samples occupy the first `block_size` samples
/// of each of its channels, and a subframe's residuals are
/// decoded in place within the same region.
///
/// ```
/// use flac_frame_decoder::audio::ChannelBuffers;
///
/// let mut samples = [0; 8];
/// let mut buffers = ChannelBuffers::new(&mut samples, 2, 4).unwrap();
/// buffers.channel_mut(0).copy_from_slice(&[1, 2, 3, 4]);
/// buffers.channel_mut(1).copy_from_slice(&[-1, -2, -3, -4]);
/// assert_eq!(
///     buffers.interleaved(2, 2).collect::<Vec<_>>(),
///     vec![1, -1, 2, -2],
/// );
/// ```
#[derive(Debug)]
pub struct ChannelBuffers<'b> {
    // all samples, stacked by channel
    samples: &'b mut [i32],

    // total number of channels
    channels: usize,

    // total length of each channel in samples
    channel_len: usize,
}

impl<'b> ChannelBuffers<'b> {
    /// Wraps caller's buffer as the given number of channels
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBufferSize`] if `samples` is
    /// too short to hold all the channels,
    /// or if there are no channels or samples.
    pub fn new(samples: &'b mut [i32], channels: usize, channel_len: usize) -> Result<Self, Error> {
        match channels
            .checked_mul(channel_len)
            .filter(|len| channels > 0 && channel_len > 0 && *len <= samples.len())
        {
            Some(len) => Ok(Self {
                samples: &mut samples[0..len],
                channels,
                channel_len,
            }),
            None => Err(Error::InvalidBufferSize),
        }
    }

    /// Returns total number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the length of each channel, in samples
    #[inline]
    pub fn channel_len(&self) -> usize {
        self.channel_len
    }

    /// Returns the whole of the given channel
    ///
    /// # Panics
    ///
    /// Panics if the channel is out of range.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[i32] {
        assert!(channel < self.channels);
        &self.samples[channel * self.channel_len..(channel + 1) * self.channel_len]
    }

    /// Returns the whole of the given channel, mutably
    ///
    /// # Panics
    ///
    /// Panics if the channel is out of range.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [i32] {
        assert!(channel < self.channels);
        &mut self.samples[channel * self.channel_len..(channel + 1) * self.channel_len]
    }

    /// Returns the first `block_size` samples of the first two channels
    ///
    /// # Panics
    ///
    /// Panics if there are fewer than two channels.
    pub fn stereo_mut(&mut self, block_size: usize) -> (&mut [i32], &mut [i32]) {
        assert!(self.channels >= 2);
        let (left, right) = self.samples.split_at_mut(self.channel_len);
        (&mut left[0..block_size], &mut right[0..block_size])
    }

    /// Iterates over the first `block_size` samples of
    /// the first `channels` channels
    pub fn block_channels(
        &self,
        channels: usize,
        block_size: usize,
    ) -> impl Iterator<Item = &[i32]> {
        self.samples
            .chunks_exact(self.channel_len)
            .take(channels)
            .map(move |channel| &channel[0..block_size])
    }

    /// Iterates over a decoded block's samples in interleaved order
    pub fn interleaved(&self, channels: usize, block_size: usize) -> impl Iterator<Item = i32> {
        let channels = channels.min(self.channels);
        (0..block_size * channels).map(move |i| {
            let (sample, channel) = (i / channels, i % channels);
            self.samples[channel * self.channel_len + sample]
        })
    }

    /// Zeroes the first `block_size` samples of
    /// the first `channels` channels
    pub fn mute(&mut self, channels: usize, block_size: usize) {
        self.samples
            .chunks_exact_mut(self.channel_len)
            .take(channels)
            .for_each(|channel| channel[0..block_size].fill(0));
    }
}

#[test]
fn test_buffer_sizes() {
    let mut samples = [0; 16];
    assert!(ChannelBuffers::new(&mut samples, 2, 8).is_ok());
    assert!(ChannelBuffers::new(&mut samples, 4, 4).is_ok());
    assert!(matches!(
        ChannelBuffers::new(&mut samples, 3, 6),
        Err(Error::InvalidBufferSize)
    ));
    assert!(ChannelBuffers::new(&mut samples, 0, 6).is_err());
    assert!(ChannelBuffers::new(&mut samples, usize::MAX, 2).is_err());
}

#[test]
fn test_stereo_and_mute() {
    let mut samples = [1; 12];
    let mut buffers = ChannelBuffers::new(&mut samples, 3, 4).unwrap();

    let (left, right) = buffers.stereo_mut(3);
    assert_eq!(left.len(), 3);
    right[0] = 5;

    buffers.mute(2, 3);
    assert_eq!(buffers.channel(0), &[0, 0, 0, 1]);
    assert_eq!(buffers.channel(1), &[0, 0, 0, 1]);
    assert_eq!(buffers.channel(2), &[1, 1, 1, 1]);
    assert_eq!(
        buffers.block_channels(3, 2).collect::<Vec<_>>(),
        vec![&[0, 0][..], &[0, 0][..], &[1, 1][..]]
    );
}
