// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed 2D pixel buffers.
//!
//! A [`Buffer2D`] backs render targets, depth buffers and textures. The
//! pixel format fixes the byte layout: row `y` starts at byte offset
//! `y * bytes_per_row` with `bytes_per_row = width * bytes_per_pixel`, rows
//! are tightly packed. Reads normalize to `f32`, writes clamp to [0, 1]
//! before narrowing to integer formats, and sampling wraps coordinates by
//! their fractional part.

use std::cell::UnsafeCell;
use std::ptr;

use rastra_common::simd::pack_unorm4x8;
use rastra_common::{PixelFormat, RenderError};

/// A 2D array of pixels with a semantic format.
///
/// All access goes through `&self`: the rasterizer partitions the screen
/// into tiles owned by exactly one worker each, so concurrent writers never
/// touch the same pixel. That partition is the soundness argument for the
/// `Sync` impl below; callers outside the pipeline must not write while a
/// frame is in flight.
pub struct Buffer2D {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes_per_pixel: usize,
    bytes_per_row: usize,
    storage: Box<[UnsafeCell<u8>]>,
}

// Safety: pixel bytes are only mutated through disjoint regions (the tile
// partition for raster writes, a drained pipeline for host writes).
unsafe impl Send for Buffer2D {}
unsafe impl Sync for Buffer2D {}

impl Buffer2D {
    /// Allocate a zero-filled buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }

        let bytes_per_pixel = format.bytes_per_pixel();
        let bytes_per_row = width as usize * bytes_per_pixel;
        let len = bytes_per_row * height as usize;
        let storage = (0..len).map(|_| UnsafeCell::new(0)).collect();

        Ok(Self {
            width,
            height,
            format,
            bytes_per_pixel,
            bytes_per_row,
            storage,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    /// Total byte length of the pixel store.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[inline]
    fn base_ptr(&self) -> *mut u8 {
        self.storage.as_ptr() as *mut u8
    }

    /// Entire pixel store as bytes, for host blitting.
    ///
    /// Must not be called while tile workers hold unflushed commands
    /// referencing this buffer.
    pub fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base_ptr(), self.storage.len()) }
    }

    /// Bytes of row `y`, `bytes_per_row` long.
    pub fn row_bytes(&self, y: u32) -> &[u8] {
        debug_assert!(y < self.height);
        let start = y as usize * self.bytes_per_row;
        &self.bytes()[start..start + self.bytes_per_row]
    }

    /// Byte offset of pixel `(x, y)`, or `None` when out of bounds.
    #[inline]
    fn pixel_offset(&self, x: u32, y: u32) -> Option<usize> {
        debug_assert!(x < self.width && y < self.height, "pixel ({x},{y}) out of bounds");
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.bytes_per_row + x as usize * self.bytes_per_pixel)
    }

    #[inline]
    fn read_raw<const N: usize>(&self, offset: usize) -> [u8; N] {
        debug_assert!(offset + N <= self.storage.len());
        let mut out = [0u8; N];
        unsafe {
            ptr::copy_nonoverlapping(self.base_ptr().add(offset) as *const u8, out.as_mut_ptr(), N);
        }
        out
    }

    #[inline]
    fn write_raw(&self, offset: usize, bytes: &[u8]) {
        debug_assert!(offset + bytes.len() <= self.storage.len());
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.base_ptr().add(offset), bytes.len());
        }
    }

    /// Read pixel `(x, y)` as normalized RGBA.
    ///
    /// Single-channel formats fill R and report zero G/B with opaque alpha.
    pub fn read_rgba(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        let offset = self.pixel_offset(x, y)?;
        Some(match self.format {
            PixelFormat::U16 => {
                let v = u16::from_le_bytes(self.read_raw::<2>(offset));
                [v as f32 / 65535.0, 0.0, 0.0, 1.0]
            }
            PixelFormat::F32 => {
                let v = f32::from_le_bytes(self.read_raw::<4>(offset));
                [v, 0.0, 0.0, 1.0]
            }
            PixelFormat::Rgb8 => {
                let [r, g, b] = self.read_raw::<3>(offset);
                [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
            }
            PixelFormat::Rgba8 => {
                let [r, g, b, a] = self.read_raw::<4>(offset);
                [
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                    a as f32 / 255.0,
                ]
            }
            PixelFormat::RgbF32 => {
                let bytes = self.read_raw::<12>(offset);
                [
                    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                    f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
                    f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
                    1.0,
                ]
            }
            PixelFormat::RgbaF32 => {
                let bytes = self.read_raw::<16>(offset);
                [
                    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                    f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
                    f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
                    f32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
                ]
            }
        })
    }

    /// Read the first channel of pixel `(x, y)` as a normalized scalar.
    pub fn read_scalar(&self, x: u32, y: u32) -> Option<f32> {
        let offset = self.pixel_offset(x, y)?;
        Some(match self.format {
            PixelFormat::U16 => u16::from_le_bytes(self.read_raw::<2>(offset)) as f32 / 65535.0,
            PixelFormat::F32 | PixelFormat::RgbF32 | PixelFormat::RgbaF32 => {
                f32::from_le_bytes(self.read_raw::<4>(offset))
            }
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
                self.read_raw::<1>(offset)[0] as f32 / 255.0
            }
        })
    }

    /// Read pixel `(x, y)` as a raw u16. Only supported for `U16`.
    pub fn read_u16(&self, x: u32, y: u32) -> Option<u16> {
        let offset = self.pixel_offset(x, y)?;
        match self.format {
            PixelFormat::U16 => Some(u16::from_le_bytes(self.read_raw::<2>(offset))),
            _ => None,
        }
    }

    /// Encode one RGBA pixel into `out[..bytes_per_pixel]`.
    fn encode_rgba(&self, rgba: [f32; 4], out: &mut [u8; 16]) {
        match self.format {
            PixelFormat::U16 => {
                let v = (rgba[0].clamp(0.0, 1.0) * 65535.0) as u16;
                out[..2].copy_from_slice(&v.to_le_bytes());
            }
            PixelFormat::F32 => {
                out[..4].copy_from_slice(&rgba[0].to_le_bytes());
            }
            PixelFormat::Rgb8 => {
                let packed = pack_unorm4x8(rgba);
                out[..3].copy_from_slice(&packed[..3]);
            }
            PixelFormat::Rgba8 => {
                out[..4].copy_from_slice(&pack_unorm4x8(rgba));
            }
            PixelFormat::RgbF32 => {
                out[..4].copy_from_slice(&rgba[0].to_le_bytes());
                out[4..8].copy_from_slice(&rgba[1].to_le_bytes());
                out[8..12].copy_from_slice(&rgba[2].to_le_bytes());
            }
            PixelFormat::RgbaF32 => {
                out[..4].copy_from_slice(&rgba[0].to_le_bytes());
                out[4..8].copy_from_slice(&rgba[1].to_le_bytes());
                out[8..12].copy_from_slice(&rgba[2].to_le_bytes());
                out[12..16].copy_from_slice(&rgba[3].to_le_bytes());
            }
        }
    }

    /// Write an RGBA pixel, clamping to [0, 1] before narrowing to integer
    /// formats. Returns `false` (and writes nothing) when out of bounds.
    pub fn write_rgba(&self, x: u32, y: u32, rgba: [f32; 4]) -> bool {
        let Some(offset) = self.pixel_offset(x, y) else {
            return false;
        };
        let mut pixel = [0u8; 16];
        self.encode_rgba(rgba, &mut pixel);
        self.write_raw(offset, &pixel[..self.bytes_per_pixel]);
        true
    }

    /// Write a scalar into the first channel of pixel `(x, y)`.
    ///
    /// For float formats the value is stored untouched (depth buffers hold
    /// raw post-divide z); integer formats clamp and narrow.
    pub fn write_scalar(&self, x: u32, y: u32, value: f32) -> bool {
        let Some(offset) = self.pixel_offset(x, y) else {
            return false;
        };
        match self.format {
            PixelFormat::U16 => {
                let v = (value.clamp(0.0, 1.0) * 65535.0) as u16;
                self.write_raw(offset, &v.to_le_bytes());
            }
            PixelFormat::F32 | PixelFormat::RgbF32 | PixelFormat::RgbaF32 => {
                self.write_raw(offset, &value.to_le_bytes());
            }
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
                let v = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
                self.write_raw(offset, &[v]);
            }
        }
        true
    }

    /// Write a raw u16. Unsupported for 8-bit integer formats.
    pub fn write_u16(&self, x: u32, y: u32, value: u16) -> bool {
        let Some(offset) = self.pixel_offset(x, y) else {
            return false;
        };
        match self.format {
            PixelFormat::U16 => {
                self.write_raw(offset, &value.to_le_bytes());
                true
            }
            PixelFormat::F32 | PixelFormat::RgbF32 | PixelFormat::RgbaF32 => {
                let v = value as f32 / 65535.0;
                self.write_raw(offset, &v.to_le_bytes());
                true
            }
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => false,
        }
    }

    /// Fill the whole buffer with one color: encode once, fill row 0, then
    /// replicate row 0 over the remaining rows.
    pub fn clear(&self, rgba: [f32; 4]) {
        let mut pixel = [0u8; 16];
        self.encode_rgba(rgba, &mut pixel);

        for x in 0..self.width {
            self.write_raw(x as usize * self.bytes_per_pixel, &pixel[..self.bytes_per_pixel]);
        }
        let base = self.base_ptr();
        for y in 1..self.height as usize {
            unsafe {
                ptr::copy_nonoverlapping(
                    base as *const u8,
                    base.add(y * self.bytes_per_row),
                    self.bytes_per_row,
                );
            }
        }
    }

    /// Copy the full contents of `src`. Formats and dimensions must match.
    pub fn copy_from(&self, src: &Buffer2D) -> Result<(), RenderError> {
        if src.format != self.format {
            return Err(RenderError::UnsupportedFormat(src.format));
        }
        if src.width != self.width || src.height != self.height {
            return Err(RenderError::InvalidDimensions {
                width: src.width,
                height: src.height,
            });
        }
        unsafe {
            ptr::copy_nonoverlapping(src.base_ptr() as *const u8, self.base_ptr(), self.storage.len());
        }
        Ok(())
    }

    /// Nearest-neighbor sample at `(u, v)`, wrapping by the fractional part.
    pub fn sample_nearest(&self, u: f32, v: f32) -> [f32; 4] {
        let (cx, cy) = (wrap01(u) * self.width as f32, wrap01(v) * self.height as f32);
        let x = (cx as u32).min(self.width - 1);
        let y = (cy as u32).min(self.height - 1);
        self.read_rgba(x, y).unwrap_or([0.0; 4])
    }

    /// Bilinear sample at `(u, v)`, wrapping by the fractional part.
    ///
    /// The base texel is `floor(u' * w)` and the blend weight its fractional
    /// part, so `(u + 1, v)` blends the same texels as `(u, v)` (equal up to
    /// f32 rounding of the wrapped coordinate) and a sample at an
    /// integer-aligned texel coordinate returns that texel exactly.
    pub fn sample_linear(&self, u: f32, v: f32) -> [f32; 4] {
        let cx = wrap01(u) * self.width as f32;
        let cy = wrap01(v) * self.height as f32;

        let x0 = (cx as u32).min(self.width - 1);
        let y0 = (cy as u32).min(self.height - 1);
        let x1 = (x0 + 1) % self.width;
        let y1 = (y0 + 1) % self.height;
        let tu = cx - cx.floor();
        let tv = cy - cy.floor();

        let c0 = self.read_rgba(x0, y0).unwrap_or([0.0; 4]);
        let c1 = self.read_rgba(x1, y0).unwrap_or([0.0; 4]);
        let c2 = self.read_rgba(x0, y1).unwrap_or([0.0; 4]);
        let c3 = self.read_rgba(x1, y1).unwrap_or([0.0; 4]);

        let mut out = [0.0f32; 4];
        for k in 0..4 {
            let top = c0[k] + (c1[k] - c0[k]) * tu;
            let bot = c2[k] + (c3[k] - c2[k]) * tu;
            out[k] = top + (bot - top) * tv;
        }
        out
    }
}

/// Wrap a texture coordinate into [0, 1) by its fractional part.
#[inline]
fn wrap01(c: f32) -> f32 {
    let f = c - c.floor();
    // floor can round f to exactly 1.0 for tiny negative inputs
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}
