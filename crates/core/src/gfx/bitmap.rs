//! Indexed-pixel bitmap.

use super::palette::IndexedPalette;
use crate::types::Frame;
use serde::{Deserialize, Serialize};

/// Row-major buffer of 8-bit palette indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedBitmap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl IndexedBitmap {
    /// New bitmap filled with index 0.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Wrap existing pixels. Returns `None` if the buffer length does not
    /// match `width * height`.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if width.checked_mul(height)? != pixels.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at (x, y), or `None` outside the bitmap.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Write a pixel. Returns false (and writes nothing) outside the bitmap.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, index: u8) -> bool {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = index;
            true
        } else {
            false
        }
    }

    pub fn fill(&mut self, index: u8) {
        self.pixels.fill(index);
    }

    /// Fill a rectangle, clipped to the bitmap.
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, index: u8) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.pixels[start + x.min(x_end)..start + x_end].fill(index);
        }
    }

    /// Apply a palette, producing an ARGB frame.
    pub fn to_frame(&self, palette: &dyn IndexedPalette) -> Frame {
        let mut frame = Frame::new(self.width as u32, self.height as u32);
        for (dst, &index) in frame.pixels.iter_mut().zip(&self.pixels) {
            *dst = palette.get_color(index as usize);
        }
        frame
    }
}
