// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use bitstream_io::{BigEndian, BitWrite, BitWriter};
use flac_frame_decoder::{
    Error,
    audio::ChannelBuffers,
    crc::{crc8, crc16},
    decode::{Decoder, DecoderConfig, DecoderState, ErrorStatus},
    metadata::{Metadata, Streaminfo},
    stream::{ChannelAssignment, FrameNumber},
    subframe::{ResidualCoding, SubframeKind, SubframeType},
};
use std::io;

type Writer = BitWriter<Vec<u8>, BigEndian>;

const INDEPENDENT_STEREO: u8 = 0b0001;
const LEFT_SIDE: u8 = 0b1000;
const SIDE_RIGHT: u8 = 0b1001;
const MID_SIDE: u8 = 0b1010;

// a 44100 Hz, 16 bps header with an 8-bit block size
fn header(channels: u8, block_size: u8, frame_number: u8) -> Vec<u8> {
    assert!(frame_number < 0x80);
    vec![
        0xff,
        0xf8,
        0x69,
        (channels << 4) | (0b100 << 1),
        frame_number,
        block_size - 1,
    ]
}

// appends CRC-8 to header, then subframes, then CRC-16
fn frame(header: Vec<u8>, subframes: impl FnOnce(&mut Writer) -> io::Result<()>) -> Vec<u8> {
    let mut data = header;
    data.push(crc8(&data));

    let mut w = BitWriter::endian(data, BigEndian);
    subframes(&mut w).unwrap();
    w.byte_align().unwrap();

    let mut data = w.into_writer();
    data.extend(crc16(&data).to_be_bytes());
    data
}

fn constant(w: &mut Writer, bits: u32, value: i32) -> io::Result<()> {
    w.write::<8, u8>(0b0_000000_0)?;
    w.write_signed_var(bits, value)
}

fn verbatim(w: &mut Writer, bits: u32, samples: &[i32]) -> io::Result<()> {
    w.write::<8, u8>(0b0_000001_0)?;
    samples.iter().try_for_each(|s| w.write_signed_var(bits, *s))
}

fn write_rice(w: &mut Writer, parameter: u32, value: i32) -> io::Result<()> {
    let folded = if value < 0 {
        ((-value as u32) << 1) - 1
    } else {
        (value as u32) << 1
    };
    w.write_unary::<1>(folded >> parameter)?;
    w.write_var(parameter, folded & ((1 << parameter) - 1))
}

// a 100/-100 constant stereo frame of 4 samples
fn constant_stereo(frame_number: u8) -> Vec<u8> {
    frame(header(INDEPENDENT_STEREO, 4, frame_number), |w| {
        constant(w, 16, 100)?;
        constant(w, 16, -100)
    })
}

#[test]
fn test_constant_stereo() {
    let data = constant_stereo(0);
    assert_eq!(
        data,
        [
            0xff, 0xf8, 0x69, 0x18, 0x00, 0x03, 0xb6, 0x00, 0x00, 0x64, 0x00, 0xff, 0x9c, 0x1b,
            0x3b
        ]
    );

    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    let outcome = decoder.decode_frame(&data, &mut buffers).unwrap();
    assert!(outcome.got_frame);
    assert_eq!(outcome.sync_offset, Some(0));
    assert_eq!(outcome.bytes_consumed, data.len());

    assert_eq!(decoder.state(), DecoderState::SearchForFrameSync);
    assert_eq!(decoder.error_status(), None);
    assert_eq!(decoder.blocksize(), 4);
    assert_eq!(decoder.channel_count(), 2);
    assert_eq!(decoder.bits_per_sample(), 16);
    assert_eq!(decoder.sample_rate(), 44100);

    assert_eq!(
        buffers.block_channels(2, 4).collect::<Vec<_>>(),
        vec![&[100, 100, 100, 100][..], &[-100, -100, -100, -100][..]]
    );
    assert_eq!(
        buffers.interleaved(2, 2).collect::<Vec<_>>(),
        vec![100, -100, 100, -100]
    );

    let frame = decoder.frame().unwrap();
    assert_eq!(frame.sample_number, 0);
    assert_eq!(frame.header.number, FrameNumber::Frame(0));
    assert_eq!(
        frame.header.channel_assignment,
        ChannelAssignment::Independent(2)
    );
    assert_eq!(frame.subframes.len(), 2);
    assert_eq!(frame.subframes[1].kind, SubframeKind::Constant(-100));
}

#[test]
fn test_two_phases() {
    use flac_frame_decoder::bitreader::BitReader;

    let mut data = vec![0x00, 0x01];
    data.extend(constant_stereo(0));

    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    let mut r = BitReader::new(&data);
    decoder.process_frame_sync(&mut r).unwrap();
    assert_eq!(decoder.state(), DecoderState::ReadFrame);
    assert_eq!(decoder.error_status(), Some(ErrorStatus::LostSync));
    assert_eq!(r.bytes_consumed(), 4);

    assert!(decoder.process_read_frame(&mut r, &mut buffers).unwrap());
    assert_eq!(r.bytes_consumed(), data.len());
    assert_eq!(&buffers.channel(0)[0..4], &[100; 4]);
}

#[test]
fn test_fixed_with_escaped_partition() {
    let signal = [1, 4, 9, 16, 25, 36, 49, 64];

    // a second-order fixed predictor leaves a residual of 2
    let data = frame(header(0b0000, 8, 0), |w| {
        w.write::<8, u8>(0b0_001010_0)?;
        w.write_signed_var(16, signal[0])?;
        w.write_signed_var(16, signal[1])?;
        w.write::<2, u8>(0)?; // Rice
        w.write::<4, u8>(1)?; // 2 partitions
        w.write::<4, u8>(1)?;
        (0..2).try_for_each(|_| write_rice(w, 1, 2))?;
        w.write::<4, u8>(0b1111)?; // escaped
        w.write::<5, u8>(4)?;
        (0..4).try_for_each(|_| w.write_signed::<4, i8>(2))
    });

    let config = DecoderConfig::new(1, 1).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 1, 16).unwrap();

    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
    assert_eq!(decoder.error_status(), None);
    assert_eq!(&buffers.channel(0)[0..8], &signal);

    let subframe = &decoder.frame().unwrap().subframes[0];
    assert_eq!(subframe.subframe_type(), SubframeType::Fixed(2));
}

#[test]
fn test_wide_lpc() {
    const SHIFT: u32 = 12;
    const COEFFICIENTS: [i32; 2] = [2 << SHIFT, -(1 << SHIFT)];

    let mut sample = 0i32;
    let signal = (0..16)
        .map(|_| {
            sample = (sample + fastrand::i32(-50_000..=50_000)).clamp(-(1 << 20), 1 << 20);
            sample
        })
        .collect::<Vec<_>>();

    let residuals = (2..signal.len()).map(|i| {
        let sum = i64::from(COEFFICIENTS[0]) * i64::from(signal[i - 1])
            + i64::from(COEFFICIENTS[1]) * i64::from(signal[i - 2]);
        signal[i] - (sum >> SHIFT) as i32
    });

    // 24 bps with 15-bit coefficients needs a 64-bit accumulator
    let mut header24 = header(0b0000, 16, 0);
    header24[3] = 0b0000_110_0;
    let data = frame(header24, |w| {
        w.write::<8, u8>(0b0_100001_0)?;
        w.write_signed_var(24, signal[0])?;
        w.write_signed_var(24, signal[1])?;
        w.write::<4, u8>(14)?;
        w.write_signed::<5, i8>(SHIFT as i8)?;
        COEFFICIENTS
            .iter()
            .try_for_each(|c| w.write_signed_var(15, *c))?;
        w.write::<2, u8>(0)?;
        w.write::<4, u8>(0)?;
        w.write::<4, u8>(0b1111)?;
        w.write::<5, u8>(26)?;
        residuals
            .clone()
            .try_for_each(|r| w.write_signed_var(26, r))
    });

    let config = DecoderConfig::new(1, 1).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 1, 16).unwrap();

    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
    assert_eq!(decoder.error_status(), None);
    assert_eq!(decoder.bits_per_sample(), 24);
    assert_eq!(buffers.channel(0), signal.as_slice());

    match &decoder.frame().unwrap().subframes[0].kind {
        SubframeKind::Lpc {
            precision,
            shift,
            coefficients,
            residual,
            ..
        } => {
            assert_eq!(*precision, 15);
            assert_eq!(*shift, SHIFT);
            assert_eq!(coefficients.as_slice(), &COEFFICIENTS);
            assert_eq!(residual.coding, ResidualCoding::Rice);
        }
        other => panic!("unexpected subframe {other:?}"),
    }
}

#[test]
fn test_stereo_decorrelation() {
    let left = [10, -20, 30, -40];
    let right = [7, 8, -9, 10];
    let side: Vec<i32> = left.iter().zip(&right).map(|(l, r)| l - r).collect();
    let mid: Vec<i32> = left.iter().zip(&right).map(|(l, r)| (l + r) >> 1).collect();

    let frames = [
        (LEFT_SIDE, (&left[..], 16), (&side[..], 17)),
        (SIDE_RIGHT, (&side[..], 17), (&right[..], 16)),
        (MID_SIDE, (&mid[..], 16), (&side[..], 17)),
    ];

    for (assignment, (channel0, bits0), (channel1, bits1)) in frames {
        let data = frame(header(assignment, 4, 0), |w| {
            verbatim(w, bits0, channel0)?;
            verbatim(w, bits1, channel1)
        });

        let config = DecoderConfig::new(2, 2).max_block_size(16);
        let mut decoder = Decoder::new(config).unwrap();
        let mut samples = vec![0; config.buffer_len()];
        let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

        assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
        assert_eq!(decoder.error_status(), None);
        assert_eq!(decoder.channel_count(), 2);
        assert_eq!(&buffers.channel(0)[0..4], &left);
        assert_eq!(&buffers.channel(1)[0..4], &right);
    }
}

#[test]
fn test_wasted_bits() {
    // 16 bps samples stored in 12 bits with 4 wasted
    let data = frame(header(0b0000, 4, 0), |w| {
        w.write::<8, u8>(0b0_000001_1)?;
        w.write_unary::<1>(3)?;
        [-2048, 2047, 1, -1]
            .into_iter()
            .try_for_each(|s| w.write_signed_var::<i32>(12, s))
    });

    let config = DecoderConfig::new(1, 1).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 1, 16).unwrap();

    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
    assert_eq!(&buffers.channel(0)[0..4], &[-32768, 32752, 16, -16]);
    assert_eq!(decoder.frame().unwrap().subframes[0].wasted_bps, 4);
}

#[test]
fn test_crc16_mismatch() {
    let mut data = constant_stereo(0);
    *data.last_mut().unwrap() ^= 0x10;

    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![1; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    let outcome = decoder.decode_frame(&data, &mut buffers).unwrap();
    assert!(outcome.got_frame);
    assert_eq!(outcome.bytes_consumed, data.len());
    assert_eq!(decoder.error_status(), Some(ErrorStatus::FrameCrcMismatch));
    assert_eq!(decoder.state(), DecoderState::SearchForFrameSync);
    assert_eq!(decoder.blocksize(), 4);
    assert_eq!(&buffers.channel(0)[0..5], &[0, 0, 0, 0, 1]);
    assert_eq!(&buffers.channel(1)[0..5], &[0, 0, 0, 0, 1]);
}

#[test]
fn test_sync_after_garbage() {
    let mut data = vec![0x12, 0xff, 0xfe, 0xff];
    data.extend(constant_stereo(0));

    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    // the 0xFF just before the frame's own 0xFF is skipped
    let outcome = decoder.decode_frame(&data, &mut buffers).unwrap();
    assert!(outcome.got_frame);
    assert_eq!(outcome.sync_offset, Some(4));
    assert_eq!(outcome.bytes_consumed, data.len());
    assert_eq!(decoder.error_status(), Some(ErrorStatus::LostSync));
    assert_eq!(&buffers.channel(1)[0..4], &[-100; 4]);
}

#[test]
fn test_sync_inside_header() {
    // a sync code where the header's third byte should be
    let mut data = vec![0xff, 0xf8];
    data.extend(constant_stereo(0));

    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    let outcome = decoder.decode_frame(&data, &mut buffers).unwrap();
    assert!(!outcome.got_frame);
    assert_eq!(outcome.bytes_consumed, 2);
    assert_eq!(decoder.error_status(), Some(ErrorStatus::BadHeader));

    let outcome = decoder.decode_frame(&data[2..], &mut buffers).unwrap();
    assert!(outcome.got_frame);
    assert_eq!(outcome.bytes_consumed, data.len() - 2);
}

// decodes a single frame with a fresh decoder,
// returning whether a frame was found and the resulting status
fn decode_one(config: DecoderConfig, data: &[u8]) -> (bool, Option<ErrorStatus>) {
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(
        &mut samples,
        config.input_channels().into(),
        config.buffer_len() / usize::from(config.input_channels()),
    )
    .unwrap();

    let outcome = decoder.decode_frame(data, &mut buffers).unwrap();
    assert_eq!(decoder.state(), DecoderState::SearchForFrameSync);
    (outcome.got_frame, decoder.error_status())
}

#[test]
fn test_header_classification() {
    let stereo = DecoderConfig::new(2, 2).max_block_size(16);

    // CRC-8 mismatch
    let mut data = constant_stereo(0);
    data[6] ^= 0x01;
    assert_eq!(decode_one(stereo, &data), (false, Some(ErrorStatus::BadHeader)));

    // reserved bits-per-sample
    let mut reserved = header(INDEPENDENT_STEREO, 4, 0);
    reserved[3] = 0b0001_011_0;
    let data = frame(reserved, |w| {
        constant(w, 16, 0)?;
        constant(w, 16, 0)
    });
    assert_eq!(
        decode_one(stereo, &data),
        (false, Some(ErrorStatus::UnparseableStream))
    );

    // sample rate outside configured range
    assert_eq!(
        decode_one(
            stereo.sample_rate_range(48000, 96000),
            &constant_stereo(0)
        ),
        (false, Some(ErrorStatus::UnsupportedStream))
    );

    // too many channels
    assert_eq!(
        decode_one(DecoderConfig::new(1, 1).max_block_size(16), &constant_stereo(0)),
        (false, Some(ErrorStatus::UnsupportedStream))
    );

    // block size too large
    let data = frame(header(INDEPENDENT_STEREO, 32, 0), |w| {
        constant(w, 16, 0)?;
        constant(w, 16, 0)
    });
    assert_eq!(
        decode_one(stereo, &data),
        (false, Some(ErrorStatus::UnsupportedStream))
    );

    // reserved 32 bps code
    let mut header32 = header(0b0000, 4, 0);
    header32[3] = 0b0000_111_0;
    let data = frame(header32, |w| constant(w, 32, 0));
    assert_eq!(
        decode_one(DecoderConfig::new(1, 1).max_block_size(16), &data),
        (false, Some(ErrorStatus::UnparseableStream))
    );
}

#[test]
fn test_subframe_classification() {
    let mono = DecoderConfig::new(1, 1).max_block_size(16);

    // reserved subframe type
    let data = frame(header(0b0000, 4, 0), |w| {
        w.write::<8, u8>(0b0_000100_0)?;
        w.write::<16, u16>(0)
    });
    assert_eq!(
        decode_one(mono, &data),
        (false, Some(ErrorStatus::UnparseableStream))
    );

    // reserved residual coding method
    let data = frame(header(0b0000, 4, 0), |w| {
        w.write::<8, u8>(0b0_001000_0)?;
        w.write::<2, u8>(0b10)?;
        w.write::<16, u16>(0)
    });
    assert_eq!(
        decode_one(mono, &data),
        (false, Some(ErrorStatus::UnparseableStream))
    );

    // non-zero padding after a 12 bps constant subframe
    let mut header12 = header(0b0000, 4, 0);
    header12[3] = 0b0000_010_0;
    let data = frame(header12, |w| {
        constant(w, 12, 5)?;
        w.write::<4, u8>(0b1010)
    });
    assert_eq!(
        decode_one(mono, &data),
        (false, Some(ErrorStatus::LostSync))
    );
}

#[test]
fn test_changed_header() {
    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    assert!(
        decoder
            .decode_frame(&constant_stereo(0), &mut buffers)
            .unwrap()
            .got_frame
    );

    let mono = frame(header(0b0000, 4, 1), |w| constant(w, 16, 1));
    assert!(!decoder.decode_frame(&mono, &mut buffers).unwrap().got_frame);
    assert_eq!(decoder.error_status(), Some(ErrorStatus::ChangedHeader));
    assert_eq!(decoder.channel_count(), 2);

    // a matching frame is still accepted
    assert!(
        decoder
            .decode_frame(&constant_stereo(2), &mut buffers)
            .unwrap()
            .got_frame
    );
    assert_eq!(decoder.error_status(), None);
}

#[test]
fn test_partition_too_small() {
    // block size 4, order 3, partition order 2
    let data = frame(header(0b0000, 4, 0), |w| {
        w.write::<8, u8>(0b0_001011_0)?;
        (0..3).try_for_each(|_| w.write_signed_var::<i32>(16, 0))?;
        w.write::<2, u8>(0)?;
        w.write::<4, u8>(2)?;
        w.write::<16, u16>(0)
    });

    let config = DecoderConfig::new(1, 1).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 1, 16).unwrap();

    assert!(matches!(
        decoder.decode_frame(&data, &mut buffers),
        Err(Error::PartitionTooSmall)
    ));
    assert_eq!(decoder.state(), DecoderState::SearchForFrameSync);
    assert_eq!(decoder.error_status(), Some(ErrorStatus::LostSync));
}

#[test]
fn test_output_channel_limit() {
    // only the first channel is fully decoded
    let data = frame(header(LEFT_SIDE, 4, 0), |w| {
        constant(w, 16, 100)?;
        constant(w, 17, 50)
    });

    let config = DecoderConfig::new(2, 1).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![-1; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
    assert_eq!(decoder.error_status(), None);
    assert_eq!(&buffers.channel(0)[0..4], &[100; 4]);
    assert_eq!(&buffers.channel(1)[0..4], &[-1; 4]);
    assert_eq!(
        decoder.frame().unwrap().subframes[1].kind,
        SubframeKind::Constant(50)
    );

    // a CRC-16 mismatch mutes only the decoded channel
    let mut data = data;
    *data.last_mut().unwrap() ^= 0x01;
    samples.fill(-1);
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
    assert_eq!(decoder.error_status(), Some(ErrorStatus::FrameCrcMismatch));
    assert_eq!(&buffers.channel(0)[0..4], &[0; 4]);
    assert_eq!(&buffers.channel(1)[0..4], &[-1; 4]);
}

#[test]
fn test_short_input() {
    let mut data = vec![0x00];
    data.extend(constant_stereo(0));

    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    // rewinds to the frame's start
    let outcome = decoder.decode_frame(&data[0..10], &mut buffers).unwrap();
    assert!(!outcome.got_frame);
    assert_eq!(outcome.sync_offset, Some(1));
    assert_eq!(outcome.bytes_consumed, 1);
    assert_eq!(decoder.state(), DecoderState::SearchForFrameSync);

    let outcome = decoder.decode_frame(&data[1..], &mut buffers).unwrap();
    assert!(outcome.got_frame);
}

#[test]
fn test_sample_numbers() {
    let config = DecoderConfig::new(2, 2).max_block_size(16);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 2, 16).unwrap();

    let stream: Vec<u8> = (0..5).flat_map(constant_stereo).collect();
    let mut input = stream.as_slice();
    let mut frames = 0;

    while !input.is_empty() {
        let outcome = decoder.decode_frame(input, &mut buffers).unwrap();
        assert!(outcome.got_frame);
        assert_eq!(decoder.frame().unwrap().sample_number, frames * 4);
        input = &input[outcome.bytes_consumed..];
        frames += 1;
    }
    assert_eq!(frames, 5);

    // without frame 0, the block size isn't yet established
    decoder.reset();
    decoder
        .decode_frame(&constant_stereo(3), &mut buffers)
        .unwrap();
    assert_eq!(decoder.frame().unwrap().sample_number, 12);
}

#[test]
fn test_streaminfo_hints() {
    use std::num::NonZero;

    // sample rate and bits-per-sample are left to streaminfo
    let header = vec![0xff, 0xf8, 0b1100_0000, 0b0000_000_0, 0x02];
    let data = frame(header, |w| constant(w, 20, -5));

    let config = DecoderConfig::new(1, 1).max_block_size(4096);
    let mut decoder = Decoder::new(config).unwrap();
    let mut samples = vec![0; config.buffer_len()];
    let mut buffers = ChannelBuffers::new(&mut samples, 1, 4096).unwrap();

    assert_eq!(decode_one(config, &data), (false, Some(ErrorStatus::UnparseableStream)));

    assert!(matches!(
        decoder.set_streaminfo(Streaminfo {
            minimum_block_size: 4096,
            maximum_block_size: 16,
            minimum_frame_size: None,
            maximum_frame_size: None,
            sample_rate: 48000,
            channels: NonZero::new(1).unwrap(),
            bits_per_sample: 20,
        }),
        Err(Error::InvalidStreaminfo)
    ));

    decoder
        .set_streaminfo(Streaminfo {
            minimum_block_size: 4096,
            maximum_block_size: 4096,
            minimum_frame_size: None,
            maximum_frame_size: None,
            sample_rate: 48000,
            channels: NonZero::new(1).unwrap(),
            bits_per_sample: 20,
        })
        .unwrap();

    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
    assert_eq!(decoder.sample_rate(), 48000);
    assert_eq!(decoder.bits_per_sample(), 20);
    assert_eq!(decoder.blocksize(), 4096);
    assert_eq!(decoder.frame().unwrap().sample_number, 2 * 4096);
    assert!(buffers.channel(0).iter().all(|s| *s == -5));

    // stream parameters survive a reset
    decoder.reset();
    assert!(decoder.streaminfo().is_some());
    assert!(decoder.decode_frame(&data, &mut buffers).unwrap().got_frame);
}
