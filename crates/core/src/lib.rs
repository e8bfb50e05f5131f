//! Core ROM access, graphics primitives and logging.

pub mod gfx;
pub mod logging;
pub mod rom;

pub use rom::{snes_to_pc, RomError, RomImage, RomSource};

pub mod types {
    use serde::{Deserialize, Serialize};

    /// ARGB8888 framebuffer (0xAARRGGBB per pixel).
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Pixels as RGBA bytes, row-major, for image encoders.
        pub fn to_rgba_bytes(&self) -> Vec<u8> {
            let mut out = Vec::with_capacity(self.pixels.len() * 4);
            for &argb in &self.pixels {
                out.extend_from_slice(&[
                    (argb >> 16) as u8,
                    (argb >> 8) as u8,
                    argb as u8,
                    (argb >> 24) as u8,
                ]);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_initialization() {
        let f = types::Frame::new(10, 10);
        assert_eq!(f.pixels.len(), 100);
        assert_eq!(f.width, 10);
        assert_eq!(f.height, 10);
    }

    #[test]
    fn frame_rgba_byte_order() {
        let mut f = types::Frame::new(1, 1);
        f.pixels[0] = 0x80112233;
        assert_eq!(f.to_rgba_bytes(), vec![0x11, 0x22, 0x33, 0x80]);
    }

    #[test]
    fn frame_serde_roundtrip() {
        let f = types::Frame::new(2, 1);
        let s = serde_json::to_string(&f).expect("serialize");
        let back: types::Frame = serde_json::from_str(&s).expect("deserialize");
        assert_eq!(back.pixels, f.pixels);
    }
}
