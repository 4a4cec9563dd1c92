// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::color::ColorTransform;
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameComponent};
use crate::idct::ScaledIdct;
use crate::image::Image;
use crate::options::ConverterOptions;
use crate::pixels::{pack_rgb_row, Pixel, PixelBuffer, ROW_PACK_PADDING};
use crate::planner::plan_resolution;
use crate::spectral::CoefficientSource;
use crate::util::round_up;
use crate::util::tracing_wrappers::*;
use crate::{BLOCK_DIM, BLOCK_SIZE};

/// Cooperative cancellation flag, observed between strides (never
/// mid-stride).
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sizes fixed at frame injection and never recomputed.
#[derive(Clone, Copy, Debug)]
struct StridePlan {
    output_size: (usize, usize),
    padded_width: usize,
    rows_per_step: usize,
    stride_count: usize,
}

/// Per-component state turning queued spectral blocks for one stride into a
/// strip of centered color samples at the majority sampling grid.
struct ComponentProcessor {
    idct: ScaledIdct,
    h_up: usize,
    v_up: usize,
    blocks_wide: usize,
    blocks_tall: usize,
    block_rows_per_stride: usize,
    sample_scale: f32,
    buffer: Image<f32>,
    next_block_row: usize,
    stride_in_flight: bool,
}

impl ComponentProcessor {
    fn new(
        component: &FrameComponent,
        scale: usize,
        max_sampling: (u32, u32),
        padded_width: usize,
        rows_per_step: usize,
        sample_scale: f32,
    ) -> Result<ComponentProcessor> {
        Ok(ComponentProcessor {
            idct: ScaledIdct::new(scale),
            h_up: (max_sampling.0 / component.horizontal_sampling_factor) as usize,
            v_up: (max_sampling.1 / component.vertical_sampling_factor) as usize,
            blocks_wide: component.blocks_wide,
            blocks_tall: component.blocks_tall,
            block_rows_per_stride: component.vertical_sampling_factor as usize,
            sample_scale,
            buffer: Image::new((padded_width, rows_per_step))?,
            next_block_row: 0,
            stride_in_flight: false,
        })
    }

    /// One strip of the component's blocks through the scaled inverse DCT
    /// into the strip buffer. Advances the block-row cursor; a stride is
    /// never re-read.
    fn copy_blocks_to_color_buffer<S: CoefficientSource>(
        &mut self,
        source: &S,
        component: usize,
        stride_index: usize,
    ) {
        debug_assert!(
            !self.stride_in_flight,
            "spectral state not cleared since the previous stride"
        );
        debug_assert_eq!(
            self.next_block_row,
            stride_index * self.block_rows_per_stride,
            "processor cursor out of step with stride progress"
        );
        self.stride_in_flight = true;
        let mut samples = [0.0f32; BLOCK_SIZE];
        for local_row in 0..self.block_rows_per_stride {
            let block_row = self.next_block_row + local_row;
            debug_assert!(block_row < self.blocks_tall);
            let blocks = source.block_row(component, block_row);
            debug_assert!(blocks.len() >= self.blocks_wide);
            for bx in 0..self.blocks_wide {
                self.idct.transform(&blocks[bx].0, &mut samples);
                self.spread_block(local_row, bx, &samples);
            }
        }
        self.next_block_row += self.block_rows_per_stride;
    }

    /// Writes one transformed block into the strip buffer, duplicating
    /// samples horizontally and vertically to upsample subsampled components.
    fn spread_block(&mut self, local_row: usize, bx: usize, samples: &[f32; BLOCK_SIZE]) {
        let n = self.idct.points();
        for sy in 0..n {
            let row_base = (local_row * n + sy) * self.v_up;
            for dup in 0..self.v_up {
                let row = self.buffer.row_mut(row_base + dup);
                let mut x = bx * n * self.h_up;
                for sx in 0..n {
                    let value = samples[sy * n + sx] * self.sample_scale;
                    for _ in 0..self.h_up {
                        row[x] = value;
                        x += 1;
                    }
                }
            }
        }
    }

    /// Resets per-stride read state. The absolute cursor stays put, keeping
    /// the no-re-read invariant intact.
    fn clear_spectral_buffers(&mut self) {
        self.stride_in_flight = false;
    }
}

/// Round-half-up saturation of normalized samples to bytes: values at or
/// below 0 map to 0, at or above 1 to 255.
fn quantize_row(samples: &[f32], out: &mut [u8]) {
    debug_assert_eq!(samples.len(), out.len());
    for (sample, byte) in samples.iter().zip(out.iter_mut()) {
        *byte = (sample * 255.0 + 0.5).floor().clamp(0.0, 255.0) as u8;
    }
}

/// Converts decoded spectral data into pixels of type `P`.
///
/// Lifecycle: `inject_frame_data` exactly once, then either one
/// `convert_stride_baseline` per decoded stride followed by
/// `commit_conversion`, or a direct `take_pixel_buffer` that converts every
/// remaining stride lazily. The pixel buffer can be taken exactly once;
/// lifecycle violations are programmer errors and fail fast.
pub struct SpectralConverter<P: Pixel> {
    options: ConverterOptions,
    plan: Option<StridePlan>,
    color: Option<ColorTransform>,
    processors: Vec<ComponentProcessor>,
    // Shared scratch, overwritten every row: three byte planes plus one
    // padded proxy row for destination rows without write-ahead space.
    rgb_scratch: Vec<u8>,
    proxy_row: Vec<P>,
    pixel_buffer: Option<PixelBuffer<P>>,
    converted_strides: usize,
    converted: bool,
    cancelled: bool,
}

impl<P: Pixel> SpectralConverter<P> {
    pub fn new(options: ConverterOptions) -> SpectralConverter<P> {
        SpectralConverter {
            options,
            plan: None,
            color: None,
            processors: Vec::new(),
            rgb_scratch: Vec::new(),
            proxy_row: Vec::new(),
            pixel_buffer: None,
            converted_strides: 0,
            converted: false,
            cancelled: false,
        }
    }

    /// Output size decided at frame injection.
    pub fn output_size(&self) -> Option<(usize, usize)> {
        self.plan.map(|p| p.output_size)
    }

    /// Rows already materialized into the pixel buffer.
    pub fn converted_rows(&self) -> usize {
        self.plan.map_or(0, |p| {
            (self.converted_strides * p.rows_per_step).min(p.output_size.1)
        })
    }

    /// Fixes output geometry and allocates every buffer the conversion will
    /// use. Called exactly once, as soon as the frame header is known.
    pub fn inject_frame_data<S: CoefficientSource>(
        &mut self,
        frame: &Frame,
        source: &S,
    ) -> Result<()> {
        assert!(self.plan.is_none(), "frame data injected twice");
        let components = frame.components();
        debug_assert_eq!(components.len(), source.component_count());
        let color = ColorTransform::for_frame(
            source.color_space(),
            frame.precision(),
            components.len(),
        )?;
        let resolution = plan_resolution(frame.size(), self.options.target_size);
        let scale = resolution.block_pixel_size;
        let (h_max, v_max) = frame.max_sampling_factors();
        let rows_per_step = v_max as usize * scale;
        let mcu_cols = frame.size().0.div_ceil(BLOCK_DIM * h_max as usize);
        let padded_width = round_up(
            mcu_cols * h_max as usize * scale,
            color.elements_per_batch(),
        );
        let (output_width, output_height) = resolution.size;
        let plan = StridePlan {
            output_size: resolution.size,
            padded_width,
            rows_per_step,
            stride_count: output_height.div_ceil(rows_per_step),
        };
        debug!(
            native_size = ?frame.size(),
            output_size = ?plan.output_size,
            block_pixel_size = scale,
            rows_per_step,
            stride_count = plan.stride_count,
            "frame data injected"
        );
        let sample_scale = 1.0 / frame.sample_max();
        let mut processors = Vec::with_capacity(components.len());
        for component in components {
            processors.push(ComponentProcessor::new(
                component,
                scale,
                (h_max, v_max),
                padded_width,
                rows_per_step,
                sample_scale,
            )?);
        }
        let mut rgb_scratch = Vec::new();
        rgb_scratch.try_reserve_exact(3 * output_width)?;
        rgb_scratch.resize(3 * output_width, 0u8);
        let mut proxy_row = Vec::new();
        proxy_row.try_reserve_exact(output_width + ROW_PACK_PADDING)?;
        proxy_row.resize(output_width + ROW_PACK_PADDING, P::default());
        self.pixel_buffer = Some(PixelBuffer::new(
            resolution.size,
            self.options.prefer_contiguous,
        )?);
        self.processors = processors;
        self.rgb_scratch = rgb_scratch;
        self.proxy_row = proxy_row;
        self.color = Some(color);
        self.plan = Some(plan);
        Ok(())
    }

    /// Converts the stride at the current progress and clears per-stride
    /// spectral state. Baseline images call this as soon as a stride's
    /// coefficient data has been entropy-decoded.
    pub fn convert_stride_baseline<S: CoefficientSource>(&mut self, source: &S) {
        let plan = self.plan.expect("no frame data injected");
        assert!(!self.converted, "stride conversion after commit");
        assert!(
            self.converted_strides < plan.stride_count,
            "all strides already converted"
        );
        self.convert_stride(source, self.converted_strides);
        self.finish_stride();
    }

    /// Marks a baseline conversion finished, after its last stride.
    pub fn commit_conversion(&mut self) {
        assert!(self.plan.is_some(), "no frame data injected");
        assert!(!self.converted, "conversion committed twice");
        self.converted = true;
    }

    /// Converts any remaining strides, then moves the finished buffer out.
    /// The sole consumption point; a second call is a protocol violation.
    /// Cancellation is observed between strides and leaves the converter
    /// unusable, with no partial buffer returned.
    pub fn take_pixel_buffer<S: CoefficientSource>(
        &mut self,
        source: &S,
        cancel: &CancelFlag,
    ) -> Result<PixelBuffer<P>> {
        let plan = self.plan.expect("no frame data injected");
        assert!(!self.cancelled, "converter unusable after cancellation");
        if !self.converted {
            while self.converted_strides < plan.stride_count {
                if cancel.is_cancelled() {
                    warn!(
                        converted_strides = self.converted_strides,
                        "conversion cancelled"
                    );
                    self.cancelled = true;
                    self.pixel_buffer = None;
                    return Err(Error::Cancelled);
                }
                self.convert_stride(source, self.converted_strides);
                self.finish_stride();
            }
            self.converted = true;
        }
        Ok(self.pixel_buffer.take().expect("pixel buffer already taken"))
    }

    fn finish_stride(&mut self) {
        for processor in &mut self.processors {
            processor.clear_spectral_buffers();
        }
        self.converted_strides += 1;
    }

    fn convert_stride<S: CoefficientSource>(&mut self, source: &S, stride_index: usize) {
        let plan = self.plan.expect("no frame data injected");
        let (output_width, output_height) = plan.output_size;
        let base_row = stride_index * plan.rows_per_step;
        let rows = plan.rows_per_step.min(output_height - base_row);
        trace!(stride_index, base_row, rows, "converting stride");
        for (component, processor) in self.processors.iter_mut().enumerate() {
            processor.copy_blocks_to_color_buffer(source, component, stride_index);
        }
        let color = self.color.as_ref().expect("no frame data injected");
        let buffer = self
            .pixel_buffer
            .as_mut()
            .expect("pixel buffer already taken");
        let proxy_row = &mut self.proxy_row;
        let (r_bytes, rest) = self.rgb_scratch.split_at_mut(output_width);
        let (g_bytes, b_bytes) = rest.split_at_mut(output_width);
        for y in 0..rows {
            let mut planes: Vec<&mut [f32]> = self
                .processors
                .iter_mut()
                .map(|p| p.buffer.row_mut(y))
                .collect();
            debug_assert!(planes.iter().all(|p| p.len() == plan.padded_width));
            color.convert_in_place(&mut planes);
            if color.output_planes() == 1 {
                quantize_row(&planes[0][..output_width], r_bytes);
                g_bytes.copy_from_slice(r_bytes);
                b_bytes.copy_from_slice(r_bytes);
            } else {
                quantize_row(&planes[0][..output_width], r_bytes);
                quantize_row(&planes[1][..output_width], g_bytes);
                quantize_row(&planes[2][..output_width], b_bytes);
            }
            let row_index = base_row + y;
            // Pack in place when the destination row has write-ahead space;
            // fall back to the proxy row at segment boundaries and on the
            // last image row.
            match buffer.padded_row_mut(row_index) {
                Some(dst) => pack_rgb_row(r_bytes, g_bytes, b_bytes, dst),
                None => {
                    pack_rgb_row(r_bytes, g_bytes, b_bytes, proxy_row);
                    buffer
                        .row_mut(row_index)
                        .copy_from_slice(&proxy_row[..output_width]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_rounds_half_up_and_saturates() {
        let samples = [
            -1.0f32,
            -0.001,
            0.0,
            0.5,
            127.0 / 255.0,
            127.5 / 255.0,
            1.0,
            1.5,
        ];
        let mut out = [0u8; 8];
        quantize_row(&samples, &mut out);
        assert_eq!(out, [0, 0, 0, 128, 127, 128, 255, 255]);
    }

    #[test]
    fn cancel_flag_is_sticky_and_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
