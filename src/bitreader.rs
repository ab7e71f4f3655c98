// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For reading bit-packed FLAC frame data from a borrowed buffer
//!
//! Unlike a general-purpose bitstream reader, this reader
//! never pulls more data from anywhere.
//! Its whole input window is handed to it up front,
//! and running off the end of that window is reported as
//! [`Error::ShortInput`] so the caller can supply more
//! bytes and try again from the same frame boundary.
//!
//! The reader also keeps a running CRC-16 over the bytes
//! consumed since its last [`BitReader::reset_crc16`],
//! which is how a frame's footer checksum gets verified.

use crate::Error;
use crate::crc::{Checksum, Crc16};
use arrayvec::ArrayVec;

const WORD_BYTES: usize = 4;
const WORD_BITS: u32 = u32::BITS;

/// Returned by the UTF-8 number readers for malformed input
pub const UTF8_SENTINEL_U32: u32 = u32::MAX;

/// Returned by the UTF-8 number readers for malformed input
pub const UTF8_SENTINEL_U64: u64 = u64::MAX;

/// A word-granular bit reader over a caller-owned input window
///
/// Bits are consumed most-significant first, as a big-endian
/// logical stream regardless of host byte order.
///
/// ```
/// use flac_frame_decoder::bitreader::BitReader;
///
/// let data = [0b1011_0000, 0b0000_0001, 0xff];
/// let mut r = BitReader::new(&data);
/// assert_eq!(r.read_raw_u32(2).unwrap(), 0b10);
/// assert_eq!(r.read_raw_i32(2).unwrap(), -1);
/// assert_eq!(r.read_unary_unsigned().unwrap(), 11);
/// assert_eq!(r.bytes_consumed(), 2);
/// assert!(r.read_raw_u32(9).is_err());
/// ```
#[derive(Debug)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    // number of whole 32-bit words in buffer
    words: usize,
    // number of bytes in trailing partial word
    bytes: usize,
    consumed_words: usize,
    consumed_bits: u32,
    crc16: Crc16,
    // absolute offset of first byte not yet folded into crc16
    crc16_offset: usize,
}

impl<'a> BitReader<'a> {
    /// Builds a reader over the whole of the given buffer
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            words: buffer.len() / WORD_BYTES,
            bytes: buffer.len() % WORD_BYTES,
            consumed_words: 0,
            consumed_bits: 0,
            crc16: Crc16::default(),
            crc16_offset: 0,
        }
    }

    /// Returns total number of whole bytes consumed so far
    #[inline]
    pub fn bytes_consumed(&self) -> usize {
        self.consumed_words * WORD_BYTES + (self.consumed_bits / 8) as usize
    }

    /// Returns number of bits yet to be consumed
    #[inline]
    pub fn bits_remaining(&self) -> usize {
        (self.words * WORD_BYTES + self.bytes) * 8
            - (self.consumed_words * WORD_BITS as usize + self.consumed_bits as usize)
    }

    /// Whether the reader sits on a byte boundary
    #[inline]
    pub fn is_byte_aligned(&self) -> bool {
        self.consumed_bits % 8 == 0
    }

    /// Number of bits needed to reach the next byte boundary
    ///
    /// This is 0 if already aligned.
    #[inline]
    pub fn bits_left_for_alignment(&self) -> u32 {
        (8 - self.consumed_bits % 8) % 8
    }

    /// Restarts the running CRC-16 at the current byte position
    ///
    /// `seed` is the checksum of any bytes already consumed
    /// which should count toward the total.
    pub fn reset_crc16(&mut self, seed: u16) {
        debug_assert!(self.is_byte_aligned());
        self.crc16 = Crc16::with_seed(seed);
        self.crc16_offset = self.bytes_consumed();
    }

    /// Returns CRC-16 of all bytes consumed since last reset
    ///
    /// The reader should be byte-aligned.
    pub fn get_crc16(&mut self) -> u16 {
        debug_assert!(self.is_byte_aligned());
        self.fold_crc16();
        self.crc16.checksum()
    }

    fn fold_crc16(&mut self) {
        let consumed = self.bytes_consumed();
        if let Some(bytes) = self.buffer.get(self.crc16_offset..consumed) {
            self.crc16.update_all(bytes);
        }
        self.crc16_offset = consumed;
    }

    /// Returns the given word, left-justified if partial
    #[inline]
    fn word(&self, index: usize) -> u32 {
        let start = index * WORD_BYTES;
        match self.buffer.get(start..start + WORD_BYTES) {
            Some(word) => u32::from_be_bytes([word[0], word[1], word[2], word[3]]),
            None => {
                let mut word = [0; WORD_BYTES];
                if let Some(tail) = self.buffer.get(start..) {
                    word[0..tail.len()].copy_from_slice(tail);
                }
                u32::from_be_bytes(word)
            }
        }
    }

    #[inline]
    fn ensure(&self, bits: u32) -> Result<(), Error> {
        if self.bits_remaining() >= bits as usize {
            Ok(())
        } else {
            Err(Error::ShortInput)
        }
    }

    #[inline]
    fn advance(&mut self, bits: u32) {
        let total = self.consumed_bits + bits;
        self.consumed_words += (total / WORD_BITS) as usize;
        self.consumed_bits = total % WORD_BITS;
    }

    /// Reads an unsigned value of up to 32 bits
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShortInput`] if too few bits remain,
    /// in which case nothing is consumed.
    pub fn read_raw_u32(&mut self, bits: u32) -> Result<u32, Error> {
        debug_assert!(bits <= 32);

        if bits == 0 {
            return Ok(0);
        }
        self.ensure(bits)?;

        let word = self.word(self.consumed_words);
        let available = WORD_BITS - self.consumed_bits;

        if bits < available {
            let value = (word << self.consumed_bits) >> (WORD_BITS - bits);
            self.consumed_bits += bits;
            Ok(value)
        } else {
            // finish off current word and take the rest from the next one
            let high = word & (u32::MAX >> self.consumed_bits);
            let remaining = bits - available;
            self.consumed_words += 1;
            self.consumed_bits = 0;
            if remaining == 0 {
                Ok(high)
            } else {
                let low = self.word(self.consumed_words) >> (WORD_BITS - remaining);
                self.consumed_bits = remaining;
                Ok((high << remaining) | low)
            }
        }
    }

    /// Reads a two's complement signed value of up to 32 bits
    pub fn read_raw_i32(&mut self, bits: u32) -> Result<i32, Error> {
        match bits {
            0 => Ok(0),
            bits => {
                let value = self.read_raw_u32(bits)?;
                Ok(((value << (WORD_BITS - bits)) as i32) >> (WORD_BITS - bits))
            }
        }
    }

    /// Reads an unsigned value of up to 64 bits
    pub fn read_raw_u64(&mut self, bits: u32) -> Result<u64, Error> {
        debug_assert!(bits <= 64);

        if bits > 32 {
            self.ensure(bits)?;
            let high = self.read_raw_u32(bits - 32)?;
            let low = self.read_raw_u32(32)?;
            Ok((u64::from(high) << 32) | u64::from(low))
        } else {
            self.read_raw_u32(bits).map(u64::from)
        }
    }

    /// Counts 0 bits up to the next 1 bit, which is also consumed
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShortInput`] if the stop bit
    /// isn't found before the end of input.
    pub fn read_unary_unsigned(&mut self) -> Result<u32, Error> {
        let mut zeroes = 0u32;

        loop {
            let remaining = self.bits_remaining();
            if remaining == 0 {
                return Err(Error::ShortInput);
            }

            let available = (WORD_BITS - self.consumed_bits).min(remaining as u32);
            let word = self.word(self.consumed_words) << self.consumed_bits;
            let leading = word.leading_zeros();

            if leading < available {
                self.advance(leading + 1);
                return Ok(zeroes + leading);
            } else {
                zeroes += available;
                self.advance(available);
            }
        }
    }

    /// Fills `values` with signed Rice-coded residuals
    ///
    /// Each value is a unary-coded high part, `parameter`
    /// low bits, and a zig-zag mapping back to a signed value.
    pub fn read_rice_signed_block(&mut self, values: &mut [i32], parameter: u32) -> Result<(), Error> {
        debug_assert!(parameter < 32);

        values.iter_mut().try_for_each(|value| {
            let msbs = self.read_unary_unsigned()?;
            let lsbs = self.read_raw_u32(parameter)?;
            let folded = msbs.wrapping_shl(parameter) | lsbs;
            *value = ((folded >> 1) as i32) ^ -((folded & 1) as i32);
            Ok(())
        })
    }

    /// Reads a UTF-8-style coded number of up to 31 bits
    ///
    /// Every byte consumed is also appended to `raw`,
    /// so that the frame header can be checksummed later.
    /// Malformed codes return [`UTF8_SENTINEL_U32`].
    pub fn read_utf8_u32<const N: usize>(&mut self, raw: &mut ArrayVec<u8, N>) -> Result<u32, Error> {
        let lead = self.read_raw_u32(8)? as u8;
        raw.push(lead);

        let (mut value, continuation) = match lead.leading_ones() {
            0 => return Ok(lead.into()),
            1 => return Ok(UTF8_SENTINEL_U32),
            ones @ 2..=6 => (u32::from(lead) & (0xff >> (ones + 1)), ones - 1),
            _ => return Ok(UTF8_SENTINEL_U32),
        };

        for _ in 0..continuation {
            let byte = self.read_raw_u32(8)? as u8;
            raw.push(byte);
            if byte & 0xc0 != 0x80 {
                return Ok(UTF8_SENTINEL_U32);
            }
            value = (value << 6) | u32::from(byte & 0x3f);
        }

        Ok(value)
    }

    /// Reads a UTF-8-style coded number of up to 36 bits
    ///
    /// Works like [`BitReader::read_utf8_u32`],
    /// but also accepts a 7-byte code.
    /// Malformed codes return [`UTF8_SENTINEL_U64`].
    pub fn read_utf8_u64<const N: usize>(&mut self, raw: &mut ArrayVec<u8, N>) -> Result<u64, Error> {
        let lead = self.read_raw_u32(8)? as u8;
        raw.push(lead);

        let (mut value, continuation) = match lead.leading_ones() {
            0 => return Ok(lead.into()),
            1 => return Ok(UTF8_SENTINEL_U64),
            ones @ 2..=6 => (u64::from(lead) & (0xff >> (ones + 1)), ones - 1),
            7 => (0, 6),
            _ => return Ok(UTF8_SENTINEL_U64),
        };

        for _ in 0..continuation {
            let byte = self.read_raw_u32(8)? as u8;
            raw.push(byte);
            if byte & 0xc0 != 0x80 {
                return Ok(UTF8_SENTINEL_U64);
            }
            value = (value << 6) | u64::from(byte & 0x3f);
        }

        Ok(value)
    }

    /// Skips the given number of bits outside the running CRC-16
    pub fn skip_bits_no_crc(&mut self, bits: u32) -> Result<(), Error> {
        self.ensure(bits)?;
        self.fold_crc16();
        self.advance(bits);
        self.crc16_offset = self.bytes_consumed();
        Ok(())
    }

    /// Copies whole bytes to `block` outside the running CRC-16
    ///
    /// The reader must be byte-aligned.
    pub fn read_byte_block_aligned_no_crc(&mut self, block: &mut [u8]) -> Result<(), Error> {
        debug_assert!(self.is_byte_aligned());

        let start = self.bytes_consumed();
        let bytes = self
            .buffer
            .get(start..start + block.len())
            .ok_or(Error::ShortInput)?;
        block.copy_from_slice(bytes);
        self.fold_crc16();
        self.advance(block.len() as u32 * 8);
        self.crc16_offset = self.bytes_consumed();
        Ok(())
    }
}
