// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::color::JpegColorSpace;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Image size too large: {0}x{1}")]
    ImageSizeTooLarge(usize, usize),
    #[error("Invalid sample precision: {0}")]
    InvalidSamplePrecision(u8),
    #[error("Invalid component count: {0}")]
    InvalidComponentCount(usize),
    #[error("Color space {0:?} requires {1} components, frame declares {2}")]
    ComponentCountMismatch(JpegColorSpace, usize, usize),
    #[error("Unknown color space id {0}")]
    UnknownColorSpace(u32),
    #[error("Sampling factors {0}x{1} incompatible with frame maximum {2}x{3}")]
    InvalidSamplingFactors(u32, u32, u32, u32),
    #[error("Conversion cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
