// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Options controlling spectral-to-pixel conversion.
#[derive(Debug, Clone, Default)]
pub struct ConverterOptions {
    /// Requested output size. The planner picks the smallest spectral scale
    /// whose output covers it on both axes; `None` decodes at native
    /// resolution.
    pub target_size: Option<(usize, usize)>,
    /// Prefer one contiguous backing allocation for the pixel buffer over
    /// allocator-chosen row segments.
    pub prefer_contiguous: bool,
}

impl ConverterOptions {
    /// Full-resolution decode into a segmented buffer.
    pub fn new() -> ConverterOptions {
        ConverterOptions::default()
    }

    pub fn with_target_size(size: (usize, usize)) -> ConverterOptions {
        ConverterOptions {
            target_size: Some(size),
            ..ConverterOptions::default()
        }
    }
}
