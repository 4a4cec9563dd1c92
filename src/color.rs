// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::{Error, Result};

/// Color space of the encoded component planes, as declared by the stream
/// (component count plus Adobe APP14 transform, resolved upstream).
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum JpegColorSpace {
    Grayscale = 0,
    Ycbcr = 1,
    Rgb = 2,
    Cmyk = 3,
    Ycck = 4,
}

impl JpegColorSpace {
    pub fn from_id(id: u32) -> Result<JpegColorSpace> {
        JpegColorSpace::from_u32(id).ok_or(Error::UnknownColorSpace(id))
    }

    pub fn component_count(self) -> usize {
        match self {
            JpegColorSpace::Grayscale => 1,
            JpegColorSpace::Ycbcr | JpegColorSpace::Rgb => 3,
            JpegColorSpace::Cmyk | JpegColorSpace::Ycck => 4,
        }
    }
}

/// In-place transform from JPEG color planes to RGB, normalized to [0, 1].
///
/// Input planes hold centered samples in [-0.5, 0.5]; the level-shift
/// constant depends on the frame's sample precision and is fixed when the
/// transform is selected. The transform never clips: saturation to bytes
/// happens downstream.
pub struct ColorTransform {
    color_space: JpegColorSpace,
    center: f32,
}

impl ColorTransform {
    pub fn for_frame(
        color_space: JpegColorSpace,
        precision: u8,
        component_count: usize,
    ) -> Result<ColorTransform> {
        if !matches!(precision, 8 | 12 | 16) {
            return Err(Error::InvalidSamplePrecision(precision));
        }
        if component_count != color_space.component_count() {
            return Err(Error::ComponentCountMismatch(
                color_space,
                color_space.component_count(),
                component_count,
            ));
        }
        let sample_max = ((1u32 << precision) - 1) as f32;
        Ok(ColorTransform {
            color_space,
            // e.g. 128/255 for 8-bit samples, matching the JPEG level shift.
            center: (1u32 << (precision - 1)) as f32 / sample_max,
        })
    }

    /// Samples a vectorized kernel consumes per step. Plane widths are padded
    /// to a multiple of this so kernels may overrun the logical row end.
    pub fn elements_per_batch(&self) -> usize {
        8
    }

    /// Number of leading planes holding meaningful output: 3 (R, G, B) for
    /// multi-component spaces, 1 (gray) for grayscale.
    pub fn output_planes(&self) -> usize {
        match self.color_space {
            JpegColorSpace::Grayscale => 1,
            _ => 3,
        }
    }

    /// Overwrites the leading planes with R, G, B (or gray) over the planes'
    /// whole length.
    pub fn convert_in_place(&self, planes: &mut [&mut [f32]]) {
        match self.color_space {
            JpegColorSpace::Grayscale => {
                let [luma] = planes else {
                    panic!(
                        "incorrect number of planes; expected 1, found {}",
                        planes.len()
                    );
                };
                for v in luma.iter_mut() {
                    *v += self.center;
                }
            }
            JpegColorSpace::Ycbcr => {
                let [row_y, row_cb, row_cr] = planes else {
                    panic!(
                        "incorrect number of planes; expected 3, found {}",
                        planes.len()
                    );
                };
                ycbcr_to_rgb(row_y, row_cb, row_cr, self.center);
            }
            JpegColorSpace::Rgb => {
                let [row_r, row_g, row_b] = planes else {
                    panic!(
                        "incorrect number of planes; expected 3, found {}",
                        planes.len()
                    );
                };
                for idx in 0..row_r.len() {
                    row_r[idx] += self.center;
                    row_g[idx] += self.center;
                    row_b[idx] += self.center;
                }
            }
            JpegColorSpace::Cmyk => {
                let [row_c, row_m, row_y, row_k] = planes else {
                    panic!(
                        "incorrect number of planes; expected 4, found {}",
                        planes.len()
                    );
                };
                // Adobe CMYK stores inverted ink values, so the stored sample
                // scaled by the stored K is already the additive channel.
                for idx in 0..row_c.len() {
                    let k = row_k[idx] + self.center;
                    row_c[idx] = (row_c[idx] + self.center) * k;
                    row_m[idx] = (row_m[idx] + self.center) * k;
                    row_y[idx] = (row_y[idx] + self.center) * k;
                }
            }
            JpegColorSpace::Ycck => {
                let [row_y, row_cb, row_cr, row_k] = planes else {
                    panic!(
                        "incorrect number of planes; expected 4, found {}",
                        planes.len()
                    );
                };
                ycbcr_to_rgb(row_y, row_cb, row_cr, self.center);
                for idx in 0..row_y.len() {
                    let k = row_k[idx] + self.center;
                    row_y[idx] *= k;
                    row_cb[idx] *= k;
                    row_cr[idx] *= k;
                }
            }
        }
    }
}

/// Full-range BT.601 as defined by JFIF Clause 7:
/// https://www.itu.int/rec/T-REC-T.871-201105-I/en
fn ycbcr_to_rgb(row_y: &mut [f32], row_cb: &mut [f32], row_cr: &mut [f32], center: f32) {
    for idx in 0..row_y.len() {
        let y = row_y[idx] + center;
        let cb = row_cb[idx];
        let cr = row_cr[idx];

        row_y[idx] = cr.mul_add(1.402, y);
        row_cb[idx] = cr.mul_add(
            -0.299 * 1.402 / 0.587,
            cb.mul_add(-0.114 * 1.772 / 0.587, y),
        );
        row_cr[idx] = cb.mul_add(1.772, y);
    }
}
