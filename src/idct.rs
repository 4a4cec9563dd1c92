// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use array_init::array_init;

use crate::{BLOCK_DIM, BLOCK_SIZE};

/// Separable inverse DCT evaluated at `n` output points per axis, reading
/// only the `n`x`n` low-frequency corner of an 8x8 coefficient block.
///
/// The normalization keeps the DC level independent of `n`: a DC-only block
/// decodes to the flat value `dc / 8` at every scale, so a downscaled decode
/// reproduces the averages of the full-resolution one.
pub struct ScaledIdct {
    n: usize,
    basis: [[f32; BLOCK_DIM]; BLOCK_DIM],
}

impl ScaledIdct {
    pub fn new(n: usize) -> ScaledIdct {
        assert!(matches!(n, 1 | 2 | 4 | 8), "unsupported IDCT size {n}");
        let basis = array_init(|x| {
            array_init(|u| {
                if x >= n || u >= n {
                    return 0.0;
                }
                let c = if u == 0 { FRAC_1_SQRT_2 } else { 1.0 };
                let angle = ((2 * x + 1) * u) as f32 * PI / (2 * n) as f32;
                c * angle.cos()
            })
        });
        ScaledIdct { n, basis }
    }

    /// Output points per axis.
    pub fn points(&self) -> usize {
        self.n
    }

    /// Writes the `n`x`n` spatial samples of `coefficients` into the first
    /// `n * n` entries of `out`, row-major with `n` samples per row.
    pub fn transform(&self, coefficients: &[f32; BLOCK_SIZE], out: &mut [f32]) {
        let n = self.n;
        debug_assert!(out.len() >= n * n);
        // Columns first, rows second; tmp[v] holds one partially transformed
        // frequency row.
        let mut tmp = [[0.0f32; BLOCK_DIM]; BLOCK_DIM];
        for v in 0..n {
            for x in 0..n {
                let mut acc = 0.0f32;
                for u in 0..n {
                    acc = self.basis[x][u].mul_add(coefficients[v * BLOCK_DIM + u], acc);
                }
                tmp[v][x] = acc;
            }
        }
        for y in 0..n {
            for x in 0..n {
                let mut acc = 0.0f32;
                for v in 0..n {
                    acc = self.basis[y][v].mul_add(tmp[v][x], acc);
                }
                out[y * n + x] = 0.25 * acc;
            }
        }
    }
}
