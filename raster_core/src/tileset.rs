use std::sync::Arc;

use crate::color::Palette;
use crate::error::RasterError;

/// Fixed-dimension, indexed-color tiles plus a palette and per-row color-key bits.
///
/// Tile dimensions must be powers of two: sampling uses shift/mask pairs
/// rather than division so a single tileset can back scanline-rate lookups.
#[derive(Clone, Debug)]
pub struct Tileset {
    pub width: u32,
    pub height: u32,
    hshift: u32,
    vshift: u32,
    hmask: u32,
    vmask: u32,
    /// Logical tile index -> physical tile index within `pixels`.
    pub tiles: Vec<u16>,
    /// Packed pixel data, one byte per palette index, `width*height` per physical tile.
    pixels: Vec<u8>,
    /// One bit per physical tile row: true if the row has no transparent pixel.
    color_key: Vec<bool>,
    pub palette: Arc<Palette>,
}

impl Tileset {
    /// # Errors
    /// Returns [`RasterError::TilesetDimensionsNotPowerOfTwo`] if `width`/`height` is not a power of two.
    pub fn new(
        width: u32,
        height: u32,
        tiles: Vec<u16>,
        pixels: Vec<u8>,
        color_key: Vec<bool>,
        palette: Arc<Palette>,
    ) -> Result<Self, RasterError> {
        if !width.is_power_of_two() || !height.is_power_of_two() {
            return Err(RasterError::TilesetDimensionsNotPowerOfTwo { width, height });
        }
        Ok(Self {
            width,
            height,
            hshift: width.trailing_zeros(),
            vshift: height.trailing_zeros(),
            hmask: width - 1,
            vmask: height - 1,
            tiles,
            pixels,
            color_key,
            palette,
        })
    }

    #[must_use]
    pub const fn hshift(&self) -> u32 {
        self.hshift
    }

    #[must_use]
    pub const fn vshift(&self) -> u32 {
        self.vshift
    }

    #[must_use]
    pub const fn hmask(&self) -> u32 {
        self.hmask
    }

    #[must_use]
    pub const fn vmask(&self) -> u32 {
        self.vmask
    }

    /// Physical row index within `pixels` for `tile_index`'s row `srcy`; used to index `color_key`.
    #[must_use]
    pub fn tileset_line(&self, tile_index: u16, srcy: i32) -> usize {
        tile_index as usize * self.height as usize + srcy as usize
    }

    /// One source palette index at `(x, y)` within physical tile `tile_index`.
    #[must_use]
    pub fn tileset_pixel(&self, tile_index: u16, x: i32, y: i32) -> u8 {
        let line = self.tileset_line(tile_index, y);
        self.pixels[line * self.width as usize + x as usize]
    }

    /// Contiguous pixel data for one physical tile, addressable by flat
    /// `y*width + x` offset. Exposed so painters can walk it with a raw
    /// stride (including negative/column strides for flip/rotate) the way
    /// the source walks a raw pointer, instead of recomputing `(x, y)` per pixel.
    #[must_use]
    pub fn tile_pixels(&self, tile_index: u16) -> &[u8] {
        let len = (self.width * self.height) as usize;
        let start = tile_index as usize * len;
        &self.pixels[start..start + len]
    }

    #[must_use]
    pub fn color_key_bit(&self, tile_index: u16, srcy: i32) -> bool {
        self.color_key[self.tileset_line(tile_index, srcy)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    fn palette() -> Arc<Palette> {
        Arc::new(Palette::new([Rgba::default(); 256]))
    }

    #[test]
    fn rejects_non_power_of_two_dimensions() {
        let err = Tileset::new(3, 4, vec![0], vec![0; 12], vec![false; 4], palette());
        assert!(matches!(
            err,
            Err(RasterError::TilesetDimensionsNotPowerOfTwo { width: 3, height: 4 })
        ));
    }

    #[test]
    fn samples_pixel_at_expected_offset() {
        let pixels = vec![1, 2, 3, 4];
        let tileset = Tileset::new(2, 2, vec![0, 0], pixels, vec![true, true], palette()).unwrap();
        assert_eq!(tileset.tileset_pixel(0, 0, 0), 1);
        assert_eq!(tileset.tileset_pixel(0, 1, 1), 4);
        assert_eq!(tileset.hshift(), 1);
        assert_eq!(tileset.hmask(), 1);
    }
}
