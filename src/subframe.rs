// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For decoding FLAC subframes
//!
//! Each channel of a frame is stored in its own subframe,
//! which begins with a header of the form
//!
//! | Bits | Field | Meaning |
//! |-----:|------:|---------|
//! | 1    | padding | must be 0
//! | 6    | type | see below
//! | 1    | wasted flag | if set, a unary-coded wasted bit count follows
//!
//! | Type       | Subframe |
//! |-----------:|----------|
//! | `0b000000` | Constant
//! | `0b000001` | Verbatim
//! | `0b001xxx` | Fixed, order `xxx` (0 to 4)
//! | `0b1xxxxx` | LPC, order `xxxxx` + 1
//!
//! with all other types reserved.

use crate::bitreader::BitReader;
use crate::decode::ErrorStatus;
use crate::lpc::Precision;
use crate::{Error, FrameError, MAX_FIXED_ORDER, MAX_LPC_ORDER};
use arrayvec::ArrayVec;

/// A subframe's type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SubframeType {
    /// A single value repeated for the whole block
    Constant,
    /// Uncompressed samples
    Verbatim,
    /// A fixed predictor of the given order
    Fixed(u8),
    /// A linear predictor of the given order
    Lpc(u8),
}

impl SubframeType {
    /// Parses type from a subframe header byte with its wasted flag cleared
    ///
    /// ```
    /// use flac_frame_decoder::subframe::SubframeType;
    /// use flac_frame_decoder::decode::ErrorStatus;
    ///
    /// assert_eq!(SubframeType::from_code(0b0_000000_0), Ok(SubframeType::Constant));
    /// assert_eq!(SubframeType::from_code(0b0_001010_0), Ok(SubframeType::Fixed(2)));
    /// assert_eq!(SubframeType::from_code(0b0_101111_0), Ok(SubframeType::Lpc(16)));
    /// assert_eq!(
    ///     SubframeType::from_code(0b0_001101_0),
    ///     Err(ErrorStatus::UnparseableStream),
    /// );
    /// assert_eq!(
    ///     SubframeType::from_code(0b1_000000_0),
    ///     Err(ErrorStatus::LostSync),
    /// );
    /// ```
    pub fn from_code(code: u8) -> Result<Self, ErrorStatus> {
        match code {
            c if c & 0x80 != 0 => Err(ErrorStatus::LostSync),
            0b0_000000_0 => Ok(Self::Constant),
            0b0_000001_0 => Ok(Self::Verbatim),
            c @ 0b0_001000_0..=0b0_001100_0 => Ok(Self::Fixed((c >> 1) & 0b111)),
            c @ 0b0_100000_0.. => Ok(Self::Lpc(((c >> 1) & 0b11111) + 1)),
            _ => Err(ErrorStatus::UnparseableStream),
        }
    }
}

/// How a subframe's residuals are coded
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResidualCoding {
    /// Partitioned Rice with 4-bit parameters
    Rice,
    /// Partitioned Rice with 5-bit parameters
    Rice2,
}

impl ResidualCoding {
    /// Size of each partition's Rice parameter, in bits
    #[inline]
    pub fn parameter_bits(self) -> u32 {
        match self {
            Self::Rice => 4,
            Self::Rice2 => 5,
        }
    }

    /// The parameter indicating a partition of unencoded samples
    #[inline]
    pub fn escape(self) -> u32 {
        match self {
            Self::Rice => 0b1111,
            Self::Rice2 => 0b11111,
        }
    }
}

/// A subframe's residual block
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Residual {
    /// The residual's coding method
    pub coding: ResidualCoding,
    /// The residual has 2 ^ `partition_order` partitions
    pub partition_order: u32,
}

impl Residual {
    /// Returns total number of partitions
    #[inline]
    pub fn partitions(&self) -> usize {
        1 << self.partition_order
    }
}

/// A decoded subframe, minus its samples
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubframeKind {
    /// A single sample value
    Constant(i32),
    /// Samples stored verbatim
    Verbatim,
    /// Fixed predictor parameters
    Fixed {
        /// One warm-up sample per order
        warm_up: ArrayVec<i32, MAX_FIXED_ORDER>,
        /// The subframe's residuals
        residual: Residual,
    },
    /// Linear predictor parameters
    Lpc {
        /// One warm-up sample per order
        warm_up: ArrayVec<i32, MAX_LPC_ORDER>,
        /// Precision of each coefficient, in bits
        precision: u32,
        /// Shift applied to each prediction
        shift: u32,
        /// One predictor coefficient per order
        coefficients: ArrayVec<i32, MAX_LPC_ORDER>,
        /// The subframe's residuals
        residual: Residual,
    },
}

/// A decoded subframe's parameters
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subframe {
    /// Bits-per-sample the subframe was coded at
    ///
    /// This includes any extra bit for side channels
    /// and excludes any wasted bits.
    pub bits_per_sample: u32,
    /// Number of wasted low bits in each sample
    pub wasted_bps: u32,
    /// Type-specific parameters
    pub kind: SubframeKind,
}

impl Subframe {
    /// Returns the subframe's type
    pub fn subframe_type(&self) -> SubframeType {
        match &self.kind {
            SubframeKind::Constant(_) => SubframeType::Constant,
            SubframeKind::Verbatim => SubframeType::Verbatim,
            SubframeKind::Fixed { warm_up, .. } => SubframeType::Fixed(warm_up.len() as u8),
            SubframeKind::Lpc { warm_up, .. } => SubframeType::Lpc(warm_up.len() as u8),
        }
    }
}

/// Reads a subframe of `buf.len()` samples into `buf`
///
/// Residuals are always decoded into the buffer,
/// but they are only restored to samples when `full_decode` is set.
/// Otherwise, the subframe is merely parsed.
pub(crate) fn read_subframe(
    r: &mut BitReader<'_>,
    bits_per_sample: u32,
    buf: &mut [i32],
    full_decode: bool,
) -> Result<Subframe, FrameError> {
    let code = r.read_raw_u32(8)? as u8;

    let wasted_bps = match code & 1 {
        0 => 0,
        _ => r.read_unary_unsigned()? + 1,
    };

    let subframe_type = SubframeType::from_code(code & 0xfe)?;

    let bits_per_sample = match bits_per_sample.checked_sub(wasted_bps) {
        Some(bps) if bps > 0 => bps,
        _ => return Err(ErrorStatus::LostSync.into()),
    };

    log::trace!("{subframe_type:?} subframe at {bits_per_sample} bps, {wasted_bps} wasted");

    let kind = match subframe_type {
        SubframeType::Constant => {
            let value = r.read_raw_i32(bits_per_sample)?;
            if full_decode {
                buf.fill(value);
            }
            SubframeKind::Constant(value)
        }
        SubframeType::Verbatim => {
            buf.iter_mut().try_for_each(|s| {
                *s = r.read_raw_i32(bits_per_sample)?;
                Ok::<(), Error>(())
            })?;
            SubframeKind::Verbatim
        }
        SubframeType::Fixed(order) => {
            let order = usize::from(order);
            let warm_up = read_warm_up::<MAX_FIXED_ORDER>(r, bits_per_sample, order, buf)?;
            let residual = read_residual(r, order, buf)?;
            if full_decode {
                crate::fixed::restore_signal(order, buf);
            }
            SubframeKind::Fixed { warm_up, residual }
        }
        SubframeType::Lpc(order) => {
            let order = usize::from(order);
            let warm_up = read_warm_up::<MAX_LPC_ORDER>(r, bits_per_sample, order, buf)?;

            let precision = match r.read_raw_u32(4)? {
                0b1111 => return Err(ErrorStatus::LostSync.into()),
                p => p + 1,
            };

            let shift = u32::try_from(r.read_raw_i32(5)?)
                .map_err(|_| ErrorStatus::UnparseableStream)?;

            let mut coefficients = ArrayVec::<i32, MAX_LPC_ORDER>::new();
            for _ in 0..order {
                coefficients.push(r.read_raw_i32(precision)?);
            }

            let residual = read_residual(r, order, buf)?;
            if full_decode {
                Precision::select(bits_per_sample, precision, order).restore_signal(
                    &coefficients,
                    shift,
                    buf,
                );
            }
            SubframeKind::Lpc {
                warm_up,
                precision,
                shift,
                coefficients,
                residual,
            }
        }
    };

    if wasted_bps > 0 && full_decode {
        buf.iter_mut().for_each(|s| *s <<= wasted_bps);
    }

    Ok(Subframe {
        bits_per_sample,
        wasted_bps,
        kind,
    })
}

// reads warm-up samples to the start of the buffer
fn read_warm_up<const N: usize>(
    r: &mut BitReader<'_>,
    bits_per_sample: u32,
    order: usize,
    buf: &mut [i32],
) -> Result<ArrayVec<i32, N>, FrameError> {
    // a predictor's history can't be larger than its block
    let warm_up = buf.get_mut(0..order).ok_or(Error::PartitionTooSmall)?;

    let mut samples = ArrayVec::new();
    for s in warm_up {
        *s = r.read_raw_i32(bits_per_sample)?;
        samples.push(*s);
    }
    Ok(samples)
}

/// Reads a subframe's partitioned residuals to `buf[order..]`
fn read_residual(
    r: &mut BitReader<'_>,
    order: usize,
    buf: &mut [i32],
) -> Result<Residual, FrameError> {
    let coding = match r.read_raw_u32(2)? {
        0 => ResidualCoding::Rice,
        1 => ResidualCoding::Rice2,
        _ => return Err(ErrorStatus::UnparseableStream.into()),
    };

    let residual = Residual {
        coding,
        partition_order: r.read_raw_u32(4)?,
    };

    read_partitions(r, residual, order, buf)?;

    Ok(residual)
}

fn read_partitions(
    r: &mut BitReader<'_>,
    residual: Residual,
    order: usize,
    buf: &mut [i32],
) -> Result<(), FrameError> {
    let block_size = buf.len();
    let partitions = residual.partitions();
    let partition_samples = block_size >> residual.partition_order;

    // the first partition excludes the warm-up samples,
    // so it must have at least that many to begin with
    if partition_samples < order {
        return Err(Error::PartitionTooSmall.into());
    }

    if partition_samples * partitions != block_size {
        return Err(ErrorStatus::LostSync.into());
    }

    log::trace!(
        "{:?} residual with {partitions} partitions of {partition_samples} samples",
        residual.coding,
    );

    let (parameter_bits, escape) = (residual.coding.parameter_bits(), residual.coding.escape());

    let mut start = order;
    for end in (1..=partitions).map(|p| p * partition_samples) {
        let partition = &mut buf[start..end];

        match r.read_raw_u32(parameter_bits)? {
            parameter if parameter < escape => {
                r.read_rice_signed_block(partition, parameter)?;
            }
            _ => {
                let bits = r.read_raw_u32(5)?;
                partition.iter_mut().try_for_each(|s| {
                    *s = r.read_raw_i32(bits)?;
                    Ok::<(), Error>(())
                })?;
            }
        }

        start = end;
    }

    Ok(())
}
