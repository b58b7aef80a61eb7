use crate::blit::blit_keyed;
use crate::color::Rgba;
use crate::object::{is_object_in_line, Object, ObjectList};
use crate::transform::{process_flip_rotation, Tilescan};

use super::Layer;

/// Object-layer painter. Iterates the externally-managed object list
/// front-to-back, painting each object's row for the current scanline
/// through the keyed blitter. Returns whether any drawn object routed to the
/// priority buffer.
pub fn draw(layer: &Layer, objects: &ObjectList, line: i32, fb_line: &mut [Rgba], priority_buf: &mut [Rgba]) -> bool {
    let mut priority = false;

    for object in objects.iter() {
        if !object.visible {
            continue;
        }
        let Some(bitmap) = object.bitmap.as_ref() else {
            continue;
        };
        let (painted_w, painted_h) = object.painted_dimensions();
        if !is_object_in_line(object.x, object.y, painted_w, painted_h, layer.clip.x1, layer.clip.x2, line) {
            continue;
        }

        let mut x1 = object.x;
        let mut srcx = 0;
        if x1 < layer.clip.x1 {
            srcx = layer.clip.x1 - x1;
            x1 = layer.clip.x1;
        }
        let x2 = (object.x + painted_w).min(layer.clip.x2);
        let width = (x2 - x1).max(0) as usize;
        if width == 0 {
            continue;
        }

        let srcy = line - object.y;
        draw_object(object, bitmap, srcx, srcy, width, x1, layer, fb_line, priority_buf, &mut priority);
    }

    priority
}

#[allow(clippy::too_many_arguments)]
fn draw_object(
    object: &Object,
    bitmap: &crate::bitmap::Bitmap,
    srcx: i32,
    srcy: i32,
    width: usize,
    x1: i32,
    layer: &Layer,
    fb_line: &mut [Rgba],
    priority_buf: &mut [Rgba],
    priority: &mut bool,
) {
    let stride_full = bitmap.pitch as i32;
    let mut scan = Tilescan {
        width: object.width,
        height: object.height,
        stride: stride_full,
        srcx,
        srcy,
        dx: 1,
    };
    if object.flags.any_flip_or_rotate() {
        process_flip_rotation(object.flags, &mut scan);
    }

    let pixels = bitmap.pixels();
    let addr = scan.srcy * stride_full + scan.srcx;
    let stride = scan.dx;
    let sampler = move |i: usize| pixels[(addr + stride * i as i32) as usize];

    let palette = layer.palette.clone().unwrap_or_else(|| bitmap.palette.clone());
    let routed_to_priority = object.flags.priority();
    if routed_to_priority {
        *priority = true;
    }
    let dst: &mut [Rgba] = if routed_to_priority {
        &mut priority_buf[x1 as usize..]
    } else {
        &mut fb_line[x1 as usize..]
    };
    blit_keyed(dst, width, &palette, layer.blend, sampler);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bitmap::Bitmap;
    use crate::color::{Palette, Rgba};
    use crate::fixed::int2fix;
    use crate::geometry::Rect;
    use crate::layer::{Affine2, LayerMode, LayerSource};
    use crate::scratch::MosaicBuffer;
    use crate::tilemap::TileFlags;

    fn palette_with_second_entry() -> Arc<Palette> {
        let mut data = [Rgba::default(); 256];
        data[1] = Rgba(0x11);
        Arc::new(Palette::new(data))
    }

    fn bitmap() -> Arc<Bitmap> {
        Arc::new(Bitmap::new(2, 2, 2, vec![1, 0, 0, 1], palette_with_second_entry()))
    }

    fn layer(clip_x2: i32) -> Layer {
        Layer {
            ok: true,
            clip: Rect { x1: 0, y1: 0, x2: clip_x2, y2: 4 },
            hstart: 0,
            vstart: 0,
            width: clip_x2,
            height: 4,
            mode: LayerMode::Flat,
            palette: None,
            blend: None,
            column: None,
            mosaic: MosaicBuffer::new(clip_x2 as usize),
            dx: int2fix(1),
            dy: int2fix(1),
            xfactor: int2fix(1),
            transform: Affine2::identity(),
            pixel_map: None,
            priority: false,
            dirty: true,
            source: LayerSource::Objects(ObjectList::default()),
            flat_honors_color_key: false,
        }
    }

    fn object(x: i32, y: i32, flags: TileFlags) -> Object {
        Object {
            x,
            y,
            width: 2,
            height: 2,
            flags,
            visible: true,
            bitmap: Some(bitmap()),
            next: None,
        }
    }

    #[test]
    fn draws_opaque_pixels_only() {
        let layer = layer(4);
        let objects = ObjectList {
            head: Some(0),
            objects: vec![object(1, 0, TileFlags::default())],
        };
        let mut fb = vec![Rgba::default(); 4];
        let mut prio = vec![Rgba::default(); 4];
        draw(&layer, &objects, 0, &mut fb, &mut prio);
        assert_eq!(fb[1], Rgba(0x11));
        assert_eq!(fb[2], Rgba::default());
    }

    #[test]
    fn left_clip_trim_offsets_source() {
        let mut layer = layer(4);
        layer.clip.x1 = 1;
        let objects = ObjectList {
            head: Some(0),
            objects: vec![object(0, 0, TileFlags::default())],
        };
        let mut fb = vec![Rgba::default(); 4];
        let mut prio = vec![Rgba::default(); 4];
        draw(&layer, &objects, 1, &mut fb, &mut prio);
        assert_eq!(fb[1], Rgba(0x11));
    }

    #[test]
    fn priority_flag_routes_to_priority_buffer() {
        let layer = layer(4);
        let objects = ObjectList {
            head: Some(0),
            objects: vec![object(0, 0, TileFlags(1 << TileFlags::PRIORITY))],
        };
        let mut fb = vec![Rgba::default(); 4];
        let mut prio = vec![Rgba::default(); 4];
        let routed = draw(&layer, &objects, 0, &mut fb, &mut prio);
        assert!(routed);
        assert_eq!(prio[0], Rgba(0x11));
        assert_eq!(fb[0], Rgba::default());
    }
}
