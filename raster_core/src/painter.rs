//! Layer-kind x layer-mode dispatch.
//!
//! The source resolves a `painters[kind][mode]` function-pointer table per
//! layer at configuration time, with null entries for unsupported
//! combinations (e.g. an object layer has no SCALING mode). Here the
//! `(kind, mode)` axis is just [`LayerSource`] and [`LayerMode`], already
//! distinct types, so dispatch is one `match` rather than a lookup table;
//! unsupported combinations fall through to a no-op instead of a null pointer.

use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::color::{Palette, Rgba};
use crate::layer::{bitmap as bitmap_painter, object as object_painter, tiled as tiled_painter, Layer, LayerMode, LayerSource};
use crate::tilemap::Tilemap;

enum Kind {
    Tiled(Arc<Tilemap>),
    Bitmap(Arc<Bitmap>),
    Objects,
}

/// Runs whichever painter `layer.source`/`layer.mode` selects for one
/// scanline. Returns whether the layer routed any pixels to the priority buffer.
pub fn draw_layer(
    layer: &mut Layer,
    line: i32,
    fb_line: &mut [Rgba],
    priority_buf: &mut [Rgba],
    linebuffer: &mut [Rgba],
    global_palettes: &[Option<Arc<Palette>>],
) -> bool {
    let kind = match &layer.source {
        LayerSource::Tiled(t) => Kind::Tiled(t.clone()),
        LayerSource::Bitmap(b) => Kind::Bitmap(b.clone()),
        LayerSource::Objects(_) => Kind::Objects,
    };

    match (kind, layer.mode) {
        (Kind::Tiled(tilemap), LayerMode::Flat) => {
            tiled_painter::draw_flat(layer, &tilemap, line, fb_line, priority_buf, global_palettes)
        }
        (Kind::Tiled(tilemap), LayerMode::Scaling) => {
            tiled_painter::draw_scaling(layer, &tilemap, line, fb_line, global_palettes);
            false
        }
        (Kind::Tiled(tilemap), LayerMode::Affine) => {
            tiled_painter::draw_affine(layer, &tilemap, line, fb_line, linebuffer, global_palettes);
            false
        }
        (Kind::Tiled(tilemap), LayerMode::PixelMap) => {
            tiled_painter::draw_pixel_map(layer, &tilemap, line, fb_line, linebuffer, global_palettes);
            false
        }
        (Kind::Bitmap(bitmap), LayerMode::Flat) => {
            bitmap_painter::draw_flat(layer, &bitmap, line, fb_line);
            false
        }
        (Kind::Bitmap(bitmap), LayerMode::Scaling) => {
            bitmap_painter::draw_scaling(layer, &bitmap, line, fb_line);
            false
        }
        (Kind::Bitmap(bitmap), LayerMode::Affine) => {
            bitmap_painter::draw_affine(layer, &bitmap, line, fb_line, linebuffer);
            false
        }
        (Kind::Bitmap(bitmap), LayerMode::PixelMap) => {
            bitmap_painter::draw_pixel_map(layer, &bitmap, line, fb_line, linebuffer);
            false
        }
        // Object layers have one painter regardless of `mode`; configuration never
        // assigns them a mode other than Flat, but the match stays exhaustive.
        (Kind::Objects, _) => {
            let LayerSource::Objects(objects) = &layer.source else {
                unreachable!("Kind::Objects only constructed from LayerSource::Objects")
            };
            object_painter::draw(&*layer, objects, line, fb_line, priority_buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::int2fix;
    use crate::geometry::Rect;
    use crate::layer::Affine2;
    use crate::object::ObjectList;
    use crate::scratch::MosaicBuffer;

    #[test]
    fn empty_object_layer_draws_nothing_and_reports_no_priority() {
        let mut layer = Layer {
            ok: true,
            clip: Rect { x1: 0, y1: 0, x2: 4, y2: 1 },
            hstart: 0,
            vstart: 0,
            width: 4,
            height: 1,
            mode: LayerMode::Flat,
            palette: None,
            blend: None,
            column: None,
            mosaic: MosaicBuffer::new(4),
            dx: int2fix(1),
            dy: int2fix(1),
            xfactor: int2fix(1),
            transform: Affine2::identity(),
            pixel_map: None,
            priority: false,
            dirty: true,
            source: LayerSource::Objects(ObjectList::default()),
            flat_honors_color_key: false,
        };
        let mut fb = vec![Rgba::default(); 4];
        let mut prio = vec![Rgba::default(); 4];
        let mut linebuf = vec![Rgba::default(); 4];
        let routed = draw_layer(&mut layer, 0, &mut fb, &mut prio, &mut linebuf, &[]);
        assert!(!routed);
        assert_eq!(fb, vec![Rgba::default(); 4]);
    }
}
