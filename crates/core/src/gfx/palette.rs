//! Indexed palettes.
//!
//! Pixel data everywhere in the pipeline is a palette index; a palette maps
//! those indices to 32-bit ARGB colours (0xAARRGGBB) only at presentation time.

/// Maximum number of colours a SNES palette (CGRAM) can hold.
pub const MAX_COLORS: usize = 256;

/// Colour returned for indices past the end of a palette.
const MISSING_COLOR: u32 = 0xFF000000;

/// Generic indexed palette that maps colour indices to ARGB values.
pub trait IndexedPalette {
    /// Get the ARGB colour for a palette index.
    fn get_color(&self, index: usize) -> u32;

    /// Set the ARGB colour for a palette index.
    fn set_color(&mut self, index: usize, color: u32);

    /// Get the number of colours in this palette.
    fn len(&self) -> usize;

    /// Check if the palette is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A plain list of ARGB colours.
///
/// No size limit is enforced here; renderers validate the colour count
/// against [`MAX_COLORS`] at their entry points.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<u32>,
}

impl Palette {
    /// Create a palette of `size` opaque black colours.
    pub fn new(size: usize) -> Self {
        Self {
            colors: vec![MISSING_COLOR; size],
        }
    }

    pub fn from_colors(colors: Vec<u32>) -> Self {
        Self { colors }
    }

    /// Convert SNES CGRAM words (0bbbbbgg gggrrrrr) to ARGB.
    ///
    /// 5-bit channels are expanded to 8 bits by replicating the top bits.
    pub fn from_bgr555(words: &[u16]) -> Self {
        let colors = words.iter().map(|&w| bgr555_to_argb(w)).collect();
        Self { colors }
    }

    /// Evenly spaced grey ramp, index 0 black.
    ///
    /// Useful for inspecting raw tile data when no CGRAM dump is at hand.
    pub fn greyscale(size: usize) -> Self {
        let steps = size.saturating_sub(1).max(1) as u32;
        let colors = (0..size as u32)
            .map(|i| {
                let v = (i * 255 / steps) & 0xFF;
                0xFF000000 | (v << 16) | (v << 8) | v
            })
            .collect();
        Self { colors }
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }
}

/// Expand one BGR555 word to ARGB8888.
pub fn bgr555_to_argb(word: u16) -> u32 {
    let expand = |c: u16| -> u32 {
        let c = (c & 0x1F) as u32;
        (c << 3) | (c >> 2)
    };
    let r = expand(word);
    let g = expand(word >> 5);
    let b = expand(word >> 10);
    0xFF000000 | (r << 16) | (g << 8) | b
}

impl IndexedPalette for Palette {
    fn get_color(&self, index: usize) -> u32 {
        self.colors.get(index).copied().unwrap_or(MISSING_COLOR)
    }

    fn set_color(&mut self, index: usize, color: u32) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    fn len(&self) -> usize {
        self.colors.len()
    }
}
