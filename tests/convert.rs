// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use jpeg_spectral::color::JpegColorSpace;
use jpeg_spectral::convert::{CancelFlag, SpectralConverter};
use jpeg_spectral::error::{Error, Result};
use jpeg_spectral::frame::Frame;
use jpeg_spectral::options::ConverterOptions;
use jpeg_spectral::pixels::{Pixel, PixelBuffer, Rgb8, Rgba8};
use jpeg_spectral::spectral::{RawJpegData, SpectralBlock};
use test_log::test;

/// DC coefficient decoding to a flat 8-bit sample `value`.
fn flat_dc(value: u8) -> SpectralBlock {
    SpectralBlock::from_dc(8.0 * (value as f32 - 128.0))
}

fn flat_gray(size: (usize, usize), value: u8) -> (Frame, RawJpegData) {
    let frame = Frame::new(size, 8, &[(1, 1)]).unwrap();
    let mut data = RawJpegData::new(&frame, JpegColorSpace::Grayscale).unwrap();
    data.fill_component(0, flat_dc(value));
    (frame, data)
}

/// Grayscale image whose sample value changes per native block row, making
/// stride coverage mistakes visible.
fn banded_gray(size: (usize, usize)) -> (Frame, RawJpegData) {
    let frame = Frame::new(size, 8, &[(1, 1)]).unwrap();
    let mut data = RawJpegData::new(&frame, JpegColorSpace::Grayscale).unwrap();
    let blocks_wide = frame.components()[0].blocks_wide;
    let blocks_tall = frame.components()[0].blocks_tall;
    for by in 0..blocks_tall {
        for bx in 0..blocks_wide {
            *data.block_mut(0, bx, by) = flat_dc(band_value(by));
        }
    }
    (frame, data)
}

fn band_value(block_row: usize) -> u8 {
    (64 + block_row * 30) as u8
}

fn contiguous() -> ConverterOptions {
    ConverterOptions {
        prefer_contiguous: true,
        ..ConverterOptions::new()
    }
}

#[test]
fn baseline_strides_cover_the_whole_image() -> Result<()> {
    let (frame, data) = banded_gray((29, 21));
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data)?;
    assert_eq!(converter.output_size(), Some((29, 21)));
    // 21 rows in strides of 8: two full strides and a final 5-row one.
    for stride in 0..3 {
        converter.convert_stride_baseline(&data);
        assert_eq!(converter.converted_rows(), (8 * (stride + 1)).min(21));
    }
    converter.commit_conversion();
    let buffer = converter.take_pixel_buffer(&data, &CancelFlag::new())?;
    assert_eq!(buffer.size(), (29, 21));
    for y in 0..21 {
        let value = band_value(y / 8);
        let expected = Rgb8::from_rgb(value, value, value);
        assert!(
            buffer.row(y).iter().all(|p| *p == expected),
            "row {y} should be flat {value}"
        );
    }
    Ok(())
}

#[test]
fn lazy_conversion_matches_the_baseline_path() -> Result<()> {
    let (frame, data) = banded_gray((29, 21));

    let mut baseline = SpectralConverter::<Rgb8>::new(contiguous());
    baseline.inject_frame_data(&frame, &data)?;
    for _ in 0..3 {
        baseline.convert_stride_baseline(&data);
    }
    baseline.commit_conversion();
    let expected = baseline.take_pixel_buffer(&data, &CancelFlag::new())?;

    let mut lazy = SpectralConverter::<Rgb8>::new(contiguous());
    lazy.inject_frame_data(&frame, &data)?;
    let got = lazy.take_pixel_buffer(&data, &CancelFlag::new())?;

    assert_buffers_equal(&expected, &got);
    Ok(())
}

#[test]
fn flat_grayscale_round_trips_to_the_same_byte() -> Result<()> {
    let (frame, data) = flat_gray((16, 16), 200);
    let mut converter = SpectralConverter::<Rgba8>::new(contiguous());
    converter.inject_frame_data(&frame, &data)?;
    let buffer = converter.take_pixel_buffer(&data, &CancelFlag::new())?;
    let expected = Rgba8 {
        r: 200,
        g: 200,
        b: 200,
        a: 255,
    };
    for y in 0..16 {
        assert!(buffer.row(y).iter().all(|p| *p == expected));
    }
    Ok(())
}

#[test]
fn subsampled_chroma_is_upsampled_to_the_luma_grid() -> Result<()> {
    // 4:2:0 with neutral chroma blocks: the output is achromatic at the
    // luma's sample value.
    let frame = Frame::new((16, 16), 8, &[(2, 2), (1, 1), (1, 1)])?;
    let mut data = RawJpegData::new(&frame, JpegColorSpace::Ycbcr)?;
    data.fill_component(0, flat_dc(120));
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data)?;
    let buffer = converter.take_pixel_buffer(&data, &CancelFlag::new())?;
    let expected = Rgb8::from_rgb(120, 120, 120);
    for y in 0..16 {
        assert!(buffer.row(y).iter().all(|p| *p == expected), "row {y}");
    }
    Ok(())
}

#[test]
fn cmyk_frames_convert_through_the_k_plane() -> Result<()> {
    let frame = Frame::new((8, 8), 8, &[(1, 1); 4])?;
    let mut data = RawJpegData::new(&frame, JpegColorSpace::Cmyk)?;
    for component in 0..3 {
        data.fill_component(component, flat_dc(200));
    }
    data.fill_component(3, flat_dc(255));
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data)?;
    let buffer = converter.take_pixel_buffer(&data, &CancelFlag::new())?;
    let expected = Rgb8::from_rgb(200, 200, 200);
    for y in 0..8 {
        assert!(buffer.row(y).iter().all(|p| *p == expected));
    }
    Ok(())
}

#[test]
fn twelve_bit_samples_use_the_wider_level_shift() -> Result<()> {
    let frame = Frame::new((8, 8), 12, &[(1, 1)])?;
    let mut data = RawJpegData::new(&frame, JpegColorSpace::Grayscale)?;
    // Full-scale 12-bit sample: 8 * (4095 - 2048).
    data.fill_component(0, SpectralBlock::from_dc(8.0 * 2047.0));
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data)?;
    let buffer = converter.take_pixel_buffer(&data, &CancelFlag::new())?;
    assert!(buffer.row(0).iter().all(|p| *p == Rgb8::from_rgb(255, 255, 255)));
    Ok(())
}

#[test]
fn scaled_decode_materializes_the_planned_size() -> Result<()> {
    let (frame, data) = flat_gray((100, 50), 90);
    let mut converter = SpectralConverter::<Rgb8>::new(ConverterOptions {
        target_size: Some((20, 20)),
        prefer_contiguous: true,
    });
    converter.inject_frame_data(&frame, &data)?;
    assert_eq!(converter.output_size(), Some((50, 25)));
    let buffer = converter.take_pixel_buffer(&data, &CancelFlag::new())?;
    assert_eq!(buffer.size(), (50, 25));
    let expected = Rgb8::from_rgb(90, 90, 90);
    for y in 0..25 {
        assert!(buffer.row(y).iter().all(|p| *p == expected), "row {y}");
    }
    Ok(())
}

#[test]
fn segmented_output_matches_contiguous_output() -> Result<()> {
    // Rgba rows of 500 bytes segment the destination well below the image
    // height, forcing the proxy-row path at every segment boundary; 125 is
    // deliberately not a multiple of the packing batch.
    let (frame, data) = banded_gray((125, 200));

    let mut direct = SpectralConverter::<Rgba8>::new(contiguous());
    direct.inject_frame_data(&frame, &data)?;
    let expected = direct.take_pixel_buffer(&data, &CancelFlag::new())?;
    assert_eq!(expected.segment_count(), 1);

    let mut segmented = SpectralConverter::<Rgba8>::new(ConverterOptions::new());
    segmented.inject_frame_data(&frame, &data)?;
    let got = segmented.take_pixel_buffer(&data, &CancelFlag::new())?;
    assert!(got.segment_count() > 1);

    assert_buffers_equal(&expected, &got);
    Ok(())
}

#[test]
fn cancellation_before_any_stride_returns_no_buffer() -> Result<()> {
    let (frame, data) = flat_gray((16, 16), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data)?;
    let cancel = CancelFlag::new();
    cancel.cancel();
    assert!(matches!(
        converter.take_pixel_buffer(&data, &cancel),
        Err(Error::Cancelled)
    ));
    Ok(())
}

#[test]
#[should_panic(expected = "converter unusable after cancellation")]
fn cancelled_converters_refuse_further_use() {
    let (frame, data) = flat_gray((16, 16), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data).unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let _ = converter.take_pixel_buffer(&data, &cancel);
    let _ = converter.take_pixel_buffer(&data, &CancelFlag::new());
}

#[test]
#[should_panic(expected = "pixel buffer already taken")]
fn the_pixel_buffer_transfers_ownership_once() {
    let (frame, data) = flat_gray((16, 16), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data).unwrap();
    let first = converter.take_pixel_buffer(&data, &CancelFlag::new());
    assert!(first.is_ok());
    let _ = converter.take_pixel_buffer(&data, &CancelFlag::new());
}

#[test]
#[should_panic(expected = "conversion committed twice")]
fn committing_twice_fails_fast() {
    let (frame, data) = flat_gray((8, 8), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data).unwrap();
    converter.convert_stride_baseline(&data);
    converter.commit_conversion();
    converter.commit_conversion();
}

#[test]
#[should_panic(expected = "frame data injected twice")]
fn injecting_twice_fails_fast() {
    let (frame, data) = flat_gray((8, 8), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data).unwrap();
    let _ = converter.inject_frame_data(&frame, &data);
}

#[test]
#[should_panic(expected = "all strides already converted")]
fn converting_past_the_last_stride_fails_fast() {
    let (frame, data) = flat_gray((8, 8), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data).unwrap();
    converter.convert_stride_baseline(&data);
    converter.convert_stride_baseline(&data);
}

#[test]
#[should_panic(expected = "stride conversion after commit")]
fn converting_after_commit_fails_fast() {
    let (frame, data) = flat_gray((16, 16), 10);
    let mut converter = SpectralConverter::<Rgb8>::new(contiguous());
    converter.inject_frame_data(&frame, &data).unwrap();
    converter.convert_stride_baseline(&data);
    converter.commit_conversion();
    converter.convert_stride_baseline(&data);
}

fn assert_buffers_equal<P: jpeg_spectral::pixels::Pixel>(
    expected: &PixelBuffer<P>,
    got: &PixelBuffer<P>,
) {
    assert_eq!(expected.size(), got.size());
    for y in 0..expected.size().1 {
        assert_eq!(expected.row(y), got.row(y), "row {y}");
    }
}
