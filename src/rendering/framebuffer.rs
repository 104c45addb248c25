//! RGBA pixel surface the painter draws into.

use crate::color::Color;
use crate::error::{Error, Result};

/// A fixed-size RGBA8 buffer with coverage blending and PNG encoding.
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a surface filled entirely with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let px = background.rgba();
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Blend `color` over the pixel at (x, y) with glyph coverage as alpha.
    /// Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        if coverage == 0 {
            return;
        }

        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let a = coverage as u32;
        let inv = 255 - a;

        let blend = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * inv) / 255) as u8;
        self.data[idx] = blend(color.r, self.data[idx]);
        self.data[idx + 1] = blend(color.g, self.data[idx + 1]);
        self.data[idx + 2] = blend(color.b, self.data[idx + 2]);
        self.data[idx + 3] = 255;
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Encode the surface as an RGBA8 PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| Error::Encode(e.to_string()))?;
            writer
                .write_image_data(&self.data)
                .map_err(|e| Error::Encode(e.to_string()))?;
            writer.finish().map_err(|e| Error::Encode(e.to_string()))?;
        }
        Ok(out)
    }
}
