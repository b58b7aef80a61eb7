pub mod bitmap;
pub mod object;
pub mod tiled;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;
use crate::blit::BlendFn;
use crate::color::Palette;
use crate::error::RasterError;
use crate::fixed::Fixed;
use crate::geometry::Rect;
use crate::object::ObjectList;
use crate::scratch::MosaicBuffer;
use crate::tilemap::Tilemap;

/// One of the four spatial sampling modes shared by tiled and bitmap layers.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum LayerMode {
    Flat,
    Scaling,
    Affine,
    PixelMap,
}

/// A 2x3 affine transform (the source's 3x3 matrix, with the unused
/// homogeneous row dropped since it is always `[0 0 1]`).
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine2 {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.tx, self.b * x + self.d * y + self.ty)
    }
}

/// Per-pixel `{dx,dy}` offset, as looked up in `pixel_map[line*W + x]`.
#[derive(Copy, Clone, Debug, Default)]
pub struct PixelMapEntry {
    pub dx: i32,
    pub dy: i32,
}

/// Exactly one of these backs a [`Layer`]'s content.
#[derive(Clone)]
pub enum LayerSource {
    Tiled(Arc<Tilemap>),
    Bitmap(Arc<Bitmap>),
    Objects(ObjectList),
}

/// A polymorphic scrolling background.
pub struct Layer {
    pub ok: bool,
    pub clip: Rect,
    pub hstart: i32,
    pub vstart: i32,
    pub width: i32,
    pub height: i32,
    pub mode: LayerMode,
    pub palette: Option<Arc<Palette>>,
    pub blend: Option<BlendFn>,
    /// Per-column vertical scroll offset (parallax).
    pub column: Option<Vec<i32>>,
    pub mosaic: MosaicBuffer,
    pub dx: Fixed,
    pub dy: Fixed,
    pub xfactor: Fixed,
    pub transform: Affine2,
    pub pixel_map: Option<Vec<PixelMapEntry>>,
    /// Whole-layer priority flag: drawn in the second, post-sprite pass.
    pub priority: bool,
    pub dirty: bool,
    pub source: LayerSource,
    /// Compatibility switch for the FLAT painter's color-key handling:
    /// `false` reproduces the original hardcoded-keyed blitter selection
    /// bit-exact, `true` honors the computed per-row color-key bit the way
    /// the SCALING painter already does.
    pub flat_honors_color_key: bool,
}

impl Layer {
    #[must_use]
    pub fn column_offset(&self, column: i32) -> i32 {
        self.column
            .as_ref()
            .map_or(0, |cols| cols[column as usize % cols.len()])
    }

    /// Installs a `PIXEL_MAP`-mode offset table and switches the layer into
    /// that mode.
    ///
    /// # Errors
    /// Returns [`RasterError::PixelMapSizeMismatch`] if `entries.len() !=
    /// width * height`, and [`RasterError::PixelMapBitmapLayerMissingPalette`]
    /// if the source is a bitmap and no palette override is set — a
    /// pixel-map bitmap layer has no fallback to the bitmap's own palette.
    pub fn set_pixel_map(&mut self, entries: Vec<PixelMapEntry>, width: usize, height: usize) -> Result<(), RasterError> {
        let expected = width * height;
        if entries.len() != expected {
            return Err(RasterError::PixelMapSizeMismatch { got: entries.len(), expected });
        }
        if matches!(self.source, LayerSource::Bitmap(_)) && self.palette.is_none() {
            return Err(RasterError::PixelMapBitmapLayerMissingPalette);
        }
        self.pixel_map = Some(entries);
        self.mode = LayerMode::PixelMap;
        Ok(())
    }
}
