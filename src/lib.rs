// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![deny(unsafe_code)]
pub mod color;
pub mod convert;
pub mod error;
pub mod frame;
pub mod idct;
pub mod image;
pub mod options;
pub mod pixels;
pub mod planner;
pub mod spectral;
pub mod util;

const BLOCK_DIM: usize = 8;
const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;
