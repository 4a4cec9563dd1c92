// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::BLOCK_DIM;

/// One color component of a decoded frame.
///
/// The block grid is padded to whole MCUs, matching the layout an interleaved
/// scan decoder produces.
#[derive(Debug, Clone)]
pub struct FrameComponent {
    pub horizontal_sampling_factor: u32,
    pub vertical_sampling_factor: u32,
    pub blocks_wide: usize,
    pub blocks_tall: usize,
}

/// Immutable description of a decoded JPEG frame: native pixel size, sample
/// precision and per-component sampling geometry. Owned by the scan decoder;
/// read-only to the conversion core.
#[derive(Debug, Clone)]
pub struct Frame {
    size: (usize, usize),
    precision: u8,
    components: Vec<FrameComponent>,
}

impl Frame {
    pub fn new(
        size: (usize, usize),
        precision: u8,
        sampling_factors: &[(u32, u32)],
    ) -> Result<Frame> {
        if size.0 == 0 || size.1 == 0 {
            return Err(Error::InvalidImageSize(size.0, size.1));
        }
        if !(1..=16).contains(&precision) {
            return Err(Error::InvalidSamplePrecision(precision));
        }
        if sampling_factors.is_empty() || sampling_factors.len() > 4 {
            return Err(Error::InvalidComponentCount(sampling_factors.len()));
        }
        let h_max = sampling_factors.iter().map(|s| s.0).max().unwrap_or(1);
        let v_max = sampling_factors.iter().map(|s| s.1).max().unwrap_or(1);
        let mcu_cols = size.0.div_ceil(BLOCK_DIM * h_max as usize);
        let mcu_rows = size.1.div_ceil(BLOCK_DIM * v_max as usize);
        let mut components = Vec::with_capacity(sampling_factors.len());
        for &(h, v) in sampling_factors {
            let valid = (1..=4).contains(&h)
                && (1..=4).contains(&v)
                && h_max % h == 0
                && v_max % v == 0;
            if !valid {
                return Err(Error::InvalidSamplingFactors(h, v, h_max, v_max));
            }
            components.push(FrameComponent {
                horizontal_sampling_factor: h,
                vertical_sampling_factor: v,
                blocks_wide: mcu_cols * h as usize,
                blocks_tall: mcu_rows * v as usize,
            });
        }
        Ok(Frame {
            size,
            precision,
            components,
        })
    }

    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn components(&self) -> &[FrameComponent] {
        &self.components
    }

    pub fn max_sampling_factors(&self) -> (u32, u32) {
        let h_max = self
            .components
            .iter()
            .map(|c| c.horizontal_sampling_factor)
            .max()
            .unwrap_or(1);
        let v_max = self
            .components
            .iter()
            .map(|c| c.vertical_sampling_factor)
            .max()
            .unwrap_or(1);
        (h_max, v_max)
    }

    /// Largest representable sample value for the frame's precision.
    pub fn sample_max(&self) -> f32 {
        ((1u32 << self.precision) - 1) as f32
    }
}
