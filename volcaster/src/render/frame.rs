use std::ops::Range;

use crate::color::{self, RGB, RGBA};

/// Rendered image, premultiplied RGBA pixels in rows, row 0 is the top
///
/// A frame is always complete. Renders build a new one and swap it in whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    background: RGB,
    pixels: Vec<RGBA>,
}

impl Frame {
    /// Transparent frame
    pub fn new(width: usize, height: usize, background: RGB) -> Frame {
        Frame {
            width,
            height,
            background,
            pixels: vec![color::zero(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn background(&self) -> RGB {
        self.background
    }

    pub fn pixels(&self) -> &[RGBA] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<RGBA> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(x + y * self.width).copied()
    }

    /// Copy a rendered rectangle in, `colors` are in rows of `x.len()` pixels
    pub(crate) fn write_tile(&mut self, x: Range<usize>, y: Range<usize>, colors: &[RGBA]) {
        let tile_width = x.len();
        for (row, frame_y) in y.enumerate() {
            let start = x.start + frame_y * self.width;
            let src = &colors[row * tile_width..(row + 1) * tile_width];
            self.pixels[start..start + tile_width].copy_from_slice(src);
        }
    }

    /// Opaque 8 bit RGBA bytes, pixels blended over the background
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            let rgb = color::over_background(pixel, self.background);
            bytes.extend(rgb.iter().map(|&c| color::channel_to_u8(c)));
            bytes.push(u8::MAX);
        }
        bytes
    }

    /// 8 bit RGB bytes, pixels blended over the background
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&pixel| {
                let rgb = color::over_background(pixel, self.background);
                [
                    color::channel_to_u8(rgb.x),
                    color::channel_to_u8(rgb.y),
                    color::channel_to_u8(rgb.z),
                ]
            })
            .collect()
    }
}
