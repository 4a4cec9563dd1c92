// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::BLOCK_DIM;

/// Resolution the decoder should materialize, together with the number of
/// output pixels one native 8-pixel block edge expands to (1, 2, 4 or 8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaledResolution {
    pub size: (usize, usize),
    pub block_pixel_size: usize,
}

impl ScaledResolution {
    pub fn native(size: (usize, usize)) -> ScaledResolution {
        ScaledResolution {
            size,
            block_pixel_size: BLOCK_DIM,
        }
    }
}

/// Picks the smallest spectral scale whose output still covers `target` on
/// both axes. With no target, decodes at native resolution. Sizes feed buffer
/// allocation downstream, so the arithmetic is exact integer math throughout.
pub fn plan_resolution(
    native: (usize, usize),
    target: Option<(usize, usize)>,
) -> ScaledResolution {
    let Some(target) = target else {
        return ScaledResolution::native(native);
    };
    for factor in [1usize, 2, 4] {
        let scaled = (scale_axis(native.0, factor), scale_axis(native.1, factor));
        if scaled.0 >= target.0 && scaled.1 >= target.1 {
            return ScaledResolution {
                size: scaled,
                block_pixel_size: factor,
            };
        }
    }
    ScaledResolution::native(native)
}

fn scale_axis(size: usize, factor: usize) -> usize {
    let full_blocks = size / BLOCK_DIM;
    let remainder = size % BLOCK_DIM;
    full_blocks * factor + (remainder * factor).div_ceil(BLOCK_DIM)
}
