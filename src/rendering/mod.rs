//! Rendering: font store, line layout, and the raster painter.

pub mod fonts;
pub mod framebuffer;
pub mod layout;
pub mod raster;

use base64::Engine as _;

/// An encoded render of one composition: PNG bytes plus the dimensions of
/// the pixel buffer and the model version the render was derived from.
///
/// Bitmaps are derived values. They are never edited in place; each render
/// supersedes the previous one wholesale.
#[derive(Debug, Clone)]
pub struct RenderedBitmap {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
    pub version: u64,
}

impl RenderedBitmap {
    /// `data:image/png;base64,…` form, suitable for an inline preview
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png_data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_is_png_prefixed() {
        let bitmap = RenderedBitmap {
            width: 2,
            height: 2,
            png_data: vec![1, 2, 3],
            version: 0,
        };
        let url = bitmap.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > "data:image/png;base64,".len());
    }
}
