// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::color::JpegColorSpace;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::BLOCK_SIZE;

/// One 8x8 block of dequantized frequency-domain coefficients, row-major
/// (frequency v selects the row, u the column).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralBlock(pub [f32; BLOCK_SIZE]);

impl Default for SpectralBlock {
    fn default() -> Self {
        SpectralBlock([0.0; BLOCK_SIZE])
    }
}

impl SpectralBlock {
    /// Block holding only a DC coefficient; decodes to a flat 8x8 patch of
    /// value `dc / 8`.
    pub fn from_dc(dc: f32) -> Self {
        let mut block = Self::default();
        block.0[0] = dc;
        block
    }
}

/// Pull-based access to decoded coefficient data, one block row at a time.
///
/// The scan decoder owns the storage; the conversion core reads each block
/// row exactly once, in order. A windowed implementation may discard a block
/// row as soon as the next one is requested.
pub trait CoefficientSource {
    fn color_space(&self) -> JpegColorSpace;
    fn component_count(&self) -> usize;
    /// All blocks of `component`'s block row `block_row`, left to right.
    fn block_row(&self, component: usize, block_row: usize) -> &[SpectralBlock];
}

struct BlockGrid {
    blocks_wide: usize,
    blocks: Vec<SpectralBlock>,
}

/// In-memory coefficient storage holding the MCU-padded block grid of every
/// component for a whole frame.
pub struct RawJpegData {
    color_space: JpegColorSpace,
    grids: Vec<BlockGrid>,
}

impl RawJpegData {
    pub fn new(frame: &Frame, color_space: JpegColorSpace) -> Result<RawJpegData> {
        let mut grids = Vec::with_capacity(frame.components().len());
        for component in frame.components() {
            let total = component
                .blocks_wide
                .checked_mul(component.blocks_tall)
                .ok_or(Error::ImageSizeTooLarge(
                    component.blocks_wide,
                    component.blocks_tall,
                ))?;
            let mut blocks = Vec::new();
            blocks.try_reserve_exact(total)?;
            blocks.resize(total, SpectralBlock::default());
            grids.push(BlockGrid {
                blocks_wide: component.blocks_wide,
                blocks,
            });
        }
        Ok(RawJpegData { color_space, grids })
    }

    pub fn block_mut(&mut self, component: usize, bx: usize, by: usize) -> &mut SpectralBlock {
        let grid = &mut self.grids[component];
        assert!(bx < grid.blocks_wide);
        &mut grid.blocks[by * grid.blocks_wide + bx]
    }

    /// Fills every block of `component` with the same coefficients.
    pub fn fill_component(&mut self, component: usize, block: SpectralBlock) {
        self.grids[component].blocks.fill(block);
    }
}

impl CoefficientSource for RawJpegData {
    fn color_space(&self) -> JpegColorSpace {
        self.color_space
    }

    fn component_count(&self) -> usize {
        self.grids.len()
    }

    fn block_row(&self, component: usize, block_row: usize) -> &[SpectralBlock] {
        let grid = &self.grids[component];
        let start = block_row * grid.blocks_wide;
        &grid.blocks[start..start + grid.blocks_wide]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dc_sets_only_the_first_coefficient() {
        let block = SpectralBlock::from_dc(24.0);
        assert_eq!(block.0[0], 24.0);
        assert!(block.0[1..].iter().all(|c| *c == 0.0));
    }

    #[test]
    fn block_rows_cover_the_grid_in_order() -> Result<()> {
        let frame = Frame::new((24, 16), 8, &[(1, 1)])?;
        let mut data = RawJpegData::new(&frame, JpegColorSpace::Grayscale)?;
        assert_eq!(data.component_count(), 1);
        for by in 0..2 {
            for bx in 0..3 {
                data.block_mut(0, bx, by).0[0] = (by * 3 + bx) as f32;
            }
        }
        let row = data.block_row(0, 1);
        assert_eq!(row.len(), 3);
        assert_eq!(row[2].0[0], 5.0);
        Ok(())
    }
}
