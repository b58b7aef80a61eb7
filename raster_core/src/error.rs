use thiserror::Error;

/// Fallible construction/configuration errors.
///
/// Per-scanline rendering itself (`DrawScanline`) is infallible once a frame
/// is underway; everything here is raised while building or mutating the
/// data model, not while painting a line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RasterError {
    #[error("tileset dimensions {width}x{height} are not both powers of two")]
    TilesetDimensionsNotPowerOfTwo { width: u32, height: u32 },

    #[error("tile references tileset index {index} but tilemap only has {available} tilesets")]
    TilesetIndexOutOfRange { index: u8, available: usize },

    #[error("global palette slot {slot} is out of range (0..{capacity})")]
    PaletteSlotOutOfRange { slot: u8, capacity: usize },

    #[error("pixel map has {got} entries, expected {expected} (width * height)")]
    PixelMapSizeMismatch { got: usize, expected: usize },

    #[error("layer index {index} is out of range (0..{capacity})")]
    LayerIndexOutOfRange { index: usize, capacity: usize },

    #[error("sprite index {index} is out of range (0..{capacity})")]
    SpriteIndexOutOfRange { index: usize, capacity: usize },

    #[error("pixel-map bitmap layer has no palette override and no fallback is defined")]
    PixelMapBitmapLayerMissingPalette,
}
