// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For calculating the checksums protecting FLAC frames
//!
//! A frame header is protected by a CRC-8 over its raw bytes,
//! and the whole frame (header included) is protected by
//! a trailing CRC-16.

/// A running checksum over a sequence of bytes
pub trait Checksum: Default {
    /// The checksum's final value
    type Output: Copy + Eq + std::fmt::Debug;

    /// Updates checksum with a single byte
    fn update(&mut self, byte: u8);

    /// Updates checksum with all the given bytes
    #[inline]
    fn update_all(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|b| self.update(*b));
    }

    /// Returns the checksum of all bytes so far
    fn checksum(&self) -> Self::Output;

    /// Whether the checksum is valid
    ///
    /// This is true if a checksum's own trailing bytes
    /// have been included in the data
    fn valid(&self) -> bool;
}

/// The CRC-8 used by FLAC frame headers
///
/// Uses the polynomial x⁸ + x² + x¹ + x⁰ with
/// an initial value of 0.
///
/// ```
/// use flac_frame_decoder::crc::{Checksum, Crc8};
///
/// let mut crc = Crc8::default();
/// crc.update_all(&[0xff, 0xf8, 0x69, 0x18, 0x00]);
/// let checksum = crc.checksum();
/// crc.update(checksum);
/// assert!(crc.valid());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Crc8 {
    crc: u8,
}

impl Checksum for Crc8 {
    type Output = u8;

    #[inline]
    fn update(&mut self, byte: u8) {
        self.crc = CRC8[usize::from(self.crc ^ byte)];
    }

    #[inline]
    fn checksum(&self) -> u8 {
        self.crc
    }

    #[inline]
    fn valid(&self) -> bool {
        self.crc == 0
    }
}

/// Calculates the CRC-8 of a whole buffer at once
#[inline]
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = Crc8::default();
    crc.update_all(bytes);
    crc.checksum()
}

/// The CRC-16 used by FLAC frame footers
///
/// Uses the polynomial x¹⁶ + x¹⁵ + x² + x⁰ with
/// an initial value of 0, though it may be seeded
/// with a partial checksum so a frame's sync bytes
/// can be accounted for after the fact.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Crc16 {
    crc: u16,
}

impl Crc16 {
    /// Builds checksum from an existing partial checksum
    #[inline]
    pub fn with_seed(crc: u16) -> Self {
        Self { crc }
    }
}

impl Checksum for Crc16 {
    type Output = u16;

    #[inline]
    fn update(&mut self, byte: u8) {
        self.crc = (self.crc << 8) ^ CRC16[usize::from((self.crc >> 8) as u8 ^ byte)];
    }

    #[inline]
    fn checksum(&self) -> u16 {
        self.crc
    }

    #[inline]
    fn valid(&self) -> bool {
        self.crc == 0
    }
}

/// Calculates the CRC-16 of a whole buffer at once
#[inline]
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = Crc16::default();
    crc.update_all(bytes);
    crc.checksum()
}

const CRC8: [u8; 256] = crc8_table(0x07);

const CRC16: [u16; 256] = crc16_table(0x8005);

const fn crc8_table(polynomial: u8) -> [u8; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ polynomial
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn crc16_table(polynomial: u16) -> [u16; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ polynomial
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

#[test]
fn test_crc8_table() {
    // first few entries of the reference table
    assert_eq!(&CRC8[0..8], &[0x00, 0x07, 0x0e, 0x09, 0x1c, 0x1b, 0x12, 0x15]);
    assert_eq!(CRC8[255], 0xf3);
}

#[test]
fn test_crc16_table() {
    assert_eq!(
        &CRC16[0..8],
        &[0x0000, 0x8005, 0x800f, 0x000a, 0x801b, 0x001e, 0x0014, 0x8011]
    );
    assert_eq!(CRC16[255], 0x0202);
}

#[test]
fn test_check_values() {
    // the standard "123456789" check values for these parameters
    assert_eq!(crc8(b"123456789"), 0xf4);
    assert_eq!(crc16(b"123456789"), 0xfee8);
}

#[test]
fn test_seeded_crc16() {
    let data = [0xff, 0xf8, 0x69, 0x18, 0x00, 0x00, 0xbf];

    let mut seed = Crc16::default();
    seed.update_all(&data[0..2]);

    let mut crc = Crc16::with_seed(seed.checksum());
    crc.update_all(&data[2..]);

    assert_eq!(crc.checksum(), crc16(&data));
}

#[test]
fn test_crc8_detects_single_bit_errors() {
    let header = [0xff, 0xf8, 0x69, 0x18, 0x00];
    let checksum = crc8(&header);

    for byte in 0..header.len() {
        for bit in 0..8 {
            let mut corrupted = header;
            corrupted[byte] ^= 1 << bit;
            assert_ne!(crc8(&corrupted), checksum);
        }
    }
}
