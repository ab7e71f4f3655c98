// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For restoring signals encoded with linear prediction
//!
//! Each sample is restored as
//!
//! ```text
//! data[i] = residual[i] + (Σ coefficient[j] × data[i - j - 1]) >> shift
//! ```
//!
//! for `j` from 0 to `order - 1`.
//! How wide that sum must be depends on the subframe's
//! bits-per-sample, coefficient precision and order,
//! so each subframe picks a [`Precision`] to do its math in.

/// The accumulator width used to restore an LPC subframe
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Precision {
    /// Samples and coefficients both fit in 16 bits
    ///
    /// Numerically identical to [`Precision::Narrow32`],
    /// but unrolled for the lower predictor orders.
    Narrow16,
    /// The sum of products fits in 32 bits
    Narrow32,
    /// The sum of products requires 64 bits
    Wide64,
}

impl Precision {
    /// Picks accumulator width for the given subframe parameters
    ///
    /// A 32-bit sum suffices only if
    /// `bits_per_sample + precision + ⌈log₂(order)⌉ <= 32`.
    ///
    /// ```
    /// use flac_frame_decoder::lpc::Precision;
    ///
    /// assert_eq!(Precision::select(16, 12, 8), Precision::Narrow16);
    /// assert_eq!(Precision::select(17, 12, 8), Precision::Narrow32);
    /// assert_eq!(Precision::select(24, 15, 8), Precision::Wide64);
    /// ```
    pub fn select(bits_per_sample: u32, precision: u32, order: usize) -> Self {
        let order_bits = order.next_power_of_two().trailing_zeros();

        if bits_per_sample + precision + order_bits <= 32 {
            if bits_per_sample <= 16 && precision <= 16 {
                Self::Narrow16
            } else {
                Self::Narrow32
            }
        } else {
            Self::Wide64
        }
    }

    /// Restores an LPC-predicted signal in place
    ///
    /// `buf[0..coefficients.len()]` must hold the subframe's
    /// warm-up samples and the remainder its residuals,
    /// which are replaced by the restored samples.
    ///
    /// # Panics
    ///
    /// Panics if there are no coefficients, more than 32,
    /// or more than there are samples in the buffer.
    pub fn restore_signal(self, coefficients: &[i32], shift: u32, buf: &mut [i32]) {
        assert!((1..=crate::MAX_LPC_ORDER).contains(&coefficients.len()));
        assert!(coefficients.len() <= buf.len());
        debug_assert!(shift < 32);

        match self {
            Self::Narrow16 => match coefficients.len() {
                1 => restore_unrolled::<1>(coefficients, shift, buf),
                2 => restore_unrolled::<2>(coefficients, shift, buf),
                3 => restore_unrolled::<3>(coefficients, shift, buf),
                4 => restore_unrolled::<4>(coefficients, shift, buf),
                5 => restore_unrolled::<5>(coefficients, shift, buf),
                6 => restore_unrolled::<6>(coefficients, shift, buf),
                7 => restore_unrolled::<7>(coefficients, shift, buf),
                8 => restore_unrolled::<8>(coefficients, shift, buf),
                9 => restore_unrolled::<9>(coefficients, shift, buf),
                10 => restore_unrolled::<10>(coefficients, shift, buf),
                11 => restore_unrolled::<11>(coefficients, shift, buf),
                12 => restore_unrolled::<12>(coefficients, shift, buf),
                _ => restore_narrow(coefficients, shift, buf),
            },
            Self::Narrow32 => restore_narrow(coefficients, shift, buf),
            Self::Wide64 => restore_wide(coefficients, shift, buf),
        }
    }
}

fn restore_unrolled<const ORDER: usize>(coefficients: &[i32], shift: u32, buf: &mut [i32]) {
    let coefficients: &[i32; ORDER] = match coefficients.try_into() {
        Ok(coefficients) => coefficients,
        Err(_) => return restore_narrow(coefficients, shift, buf),
    };

    for i in ORDER..buf.len() {
        let mut sum = 0i32;
        for j in 0..ORDER {
            sum = sum.wrapping_add(coefficients[j].wrapping_mul(buf[i - j - 1]));
        }
        buf[i] = buf[i].wrapping_add(sum >> shift);
    }
}

fn restore_narrow(coefficients: &[i32], shift: u32, buf: &mut [i32]) {
    let order = coefficients.len();

    for i in order..buf.len() {
        let sum = coefficients
            .iter()
            .zip(buf[i - order..i].iter().rev())
            .fold(0i32, |sum, (c, s)| sum.wrapping_add(c.wrapping_mul(*s)));
        buf[i] = buf[i].wrapping_add(sum >> shift);
    }
}

fn restore_wide(coefficients: &[i32], shift: u32, buf: &mut [i32]) {
    let order = coefficients.len();

    for i in order..buf.len() {
        let sum = coefficients
            .iter()
            .zip(buf[i - order..i].iter().rev())
            .fold(0i64, |sum, (c, s)| {
                sum.wrapping_add(i64::from(*c) * i64::from(*s))
            });
        buf[i] = buf[i].wrapping_add((sum >> shift) as i32);
    }
}
