use serde::{Deserialize, Serialize};

/// One packed 32-bit framebuffer-ready color.
///
/// The engine never interprets channel order; palettes already contain
/// framebuffer-ready words, so this is a thin newtype over `u32` rather than
/// a four-channel struct.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Rgba(pub u32);

impl From<u32> for Rgba {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Rgba> for u32 {
    fn from(value: Rgba) -> Self {
        value.0
    }
}

/// A 256-entry indexed-color palette.
///
/// Index 0 is transparent by convention (the color-key); its stored value is
/// never read by a blitter but is kept so `data[idx]` stays branch-free.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Palette {
    pub data: Box<[Rgba; 256]>,
}

impl Palette {
    #[must_use]
    pub fn new(data: [Rgba; 256]) -> Self {
        Self {
            data: Box::new(data),
        }
    }

    #[must_use]
    pub fn color(&self, index: u8) -> Rgba {
        self.data[index as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            data: Box::new([Rgba::default(); 256]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_looks_up_by_index() {
        let mut colors = [Rgba::default(); 256];
        colors[5] = Rgba(0x00FF_00FF);
        let palette = Palette::new(colors);
        assert_eq!(palette.color(5), Rgba(0x00FF_00FF));
        assert_eq!(palette.color(0), Rgba(0));
    }
}
