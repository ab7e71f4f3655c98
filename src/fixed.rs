// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For restoring signals encoded with FLAC's fixed predictors

/// Restores a fixed-predicted signal in place
///
/// `buf[0..order]` must hold the subframe's warm-up samples
/// and `buf[order..]` its residuals, which are replaced
/// by the restored samples.
///
/// The predictors use the difference coefficients
///
/// | order | coefficients |
/// |------:|--------------|
/// | 0     | none         |
/// | 1     | 1            |
/// | 2     | 2, -1        |
/// | 3     | 3, -3, 1     |
/// | 4     | 4, -6, 4, -1 |
///
/// and all arithmetic wraps, as it does in the reference decoder.
///
/// # Panics
///
/// Panics if `order` is greater than 4
/// or larger than the buffer.
///
/// ```
/// use flac_frame_decoder::fixed::restore_signal;
///
/// let mut buf = [1, 2, 0, 0, 0];
/// restore_signal(2, &mut buf);
/// assert_eq!(buf, [1, 2, 3, 4, 5]);
/// ```
pub fn restore_signal(order: usize, buf: &mut [i32]) {
    assert!(order <= crate::MAX_FIXED_ORDER, "invalid fixed order {order}");
    assert!(order <= buf.len());

    match order {
        0 => { /* residuals are the signal */ }
        1 => {
            for i in 1..buf.len() {
                buf[i] = buf[i].wrapping_add(buf[i - 1]);
            }
        }
        2 => {
            for i in 2..buf.len() {
                let prediction = buf[i - 1].wrapping_mul(2).wrapping_sub(buf[i - 2]);
                buf[i] = buf[i].wrapping_add(prediction);
            }
        }
        3 => {
            for i in 3..buf.len() {
                let prediction = buf[i - 1]
                    .wrapping_sub(buf[i - 2])
                    .wrapping_mul(3)
                    .wrapping_add(buf[i - 3]);
                buf[i] = buf[i].wrapping_add(prediction);
            }
        }
        4 => {
            for i in 4..buf.len() {
                let prediction = buf[i - 1]
                    .wrapping_add(buf[i - 3])
                    .wrapping_mul(4)
                    .wrapping_sub(buf[i - 2].wrapping_mul(6))
                    .wrapping_sub(buf[i - 4]);
                buf[i] = buf[i].wrapping_add(prediction);
            }
        }
        _ => unreachable!(),
    }
}
