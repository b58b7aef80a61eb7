use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::blit::{blit_buffer32, blit_keyed, blit_mosaic};
use crate::color::{Palette, Rgba};
use crate::fixed::{fix2int, int2fix};
use crate::geometry::wrap;

use super::Layer;

fn resolve_palette(layer: &Layer, bitmap: &Bitmap) -> Arc<Palette> {
    layer.palette.clone().unwrap_or_else(|| bitmap.palette.clone())
}

/// FLAT mode. Wraps horizontally on `layer.width`, drawing one run per
/// wrap crossing; always goes through the keyed blitter, there being no
/// per-row color-key table for a plain bitmap.
pub fn draw_flat(layer: &mut Layer, bitmap: &Bitmap, line: i32, fb_line: &mut [Rgba]) {
    if layer.mosaic.enabled() {
        if !layer.mosaic.samples_on(line) {
            blit_mosaic(
                &mut fb_line[layer.clip.x1 as usize..],
                &layer.mosaic.buffer[layer.clip.x1 as usize..],
                layer.clip.width() as usize,
                layer.mosaic.w,
                layer.blend,
            );
            return;
        }
        layer.mosaic.buffer.fill(Rgba::default());
    }

    let palette = resolve_palette(layer, bitmap);
    let ypos = wrap(layer.vstart + line, layer.height) as u32;

    let mut x = layer.clip.x1;
    let mut xpos = wrap(layer.hstart + x, layer.width);
    while x < layer.clip.x2 {
        let run = (layer.width - xpos).min(layer.clip.x2 - x);
        let width = run.max(0) as usize;
        let row = bitmap.row_from(xpos, ypos as i32);

        let dst: &mut [Rgba] = if layer.mosaic.enabled() {
            &mut layer.mosaic.buffer[x as usize..]
        } else {
            &mut fb_line[x as usize..]
        };
        blit_keyed(dst, width, &palette, layer.blend, |i| row[i]);

        x += run;
        xpos = 0;
    }

    if layer.mosaic.enabled() {
        blit_mosaic(
            &mut fb_line[layer.clip.x1 as usize..],
            &layer.mosaic.buffer[layer.clip.x1 as usize..],
            layer.clip.width() as usize,
            layer.mosaic.w,
            layer.blend,
        );
    }
}

/// SCALING mode. Same run-wrapping as FLAT but with a fixed-point
/// per-pixel source stride, exactly mirroring the tiled SCALING painter with
/// the whole bitmap standing in for a single giant tile.
pub fn draw_scaling(layer: &mut Layer, bitmap: &Bitmap, line: i32, fb_line: &mut [Rgba]) {
    if layer.mosaic.enabled() {
        if !layer.mosaic.samples_on(line) {
            blit_mosaic(
                &mut fb_line[layer.clip.x1 as usize..],
                &layer.mosaic.buffer[layer.clip.x1 as usize..],
                layer.clip.width() as usize,
                layer.mosaic.w,
                layer.blend,
            );
            return;
        }
        layer.mosaic.buffer.fill(Rgba::default());
    }

    let palette = resolve_palette(layer, bitmap);

    let mut x = layer.clip.x1;
    let mut xpos = wrap(layer.hstart + fix2int(x * layer.dx), layer.width);
    let mut fix_x = int2fix(x);

    let ypos = {
        let raw = layer.vstart + fix2int(line * layer.dy);
        if raw < 0 { layer.height + raw } else { raw % layer.height }
    };

    while x < layer.clip.x2 {
        let runwidth = layer.width - xpos;
        let mut dx = int2fix(runwidth);
        let fix_runwidth = runwidth * layer.xfactor;
        fix_x += fix_runwidth;
        let x1 = fix2int(fix_x);
        let scalewidth = x1 - x;
        dx = if scalewidth != 0 { dx / scalewidth } else { 0 };

        let x1 = x1.min(layer.clip.x2);
        let width = (x1 - x).max(0) as usize;

        let row = bitmap.row_from(xpos, ypos);
        let sampler = move |i: usize| row[fix2int(dx * i as i32) as usize];

        let dst: &mut [Rgba] = if layer.mosaic.enabled() {
            &mut layer.mosaic.buffer[x as usize..]
        } else {
            &mut fb_line[x as usize..]
        };
        blit_keyed(dst, width, &palette, layer.blend, sampler);

        x = x1;
        xpos = 0;
    }

    if layer.mosaic.enabled() {
        blit_mosaic(
            &mut fb_line[layer.clip.x1 as usize..],
            &layer.mosaic.buffer[layer.clip.x1 as usize..],
            layer.clip.width() as usize,
            layer.mosaic.w,
            layer.blend,
        );
    }
}

/// AFFINE mode. Writes into `linebuffer` one opaque pixel at a time;
/// bitmap layers carry no per-tile flags, so there is no flip/rotate step.
pub fn draw_affine(layer: &Layer, bitmap: &Bitmap, line: i32, fb_line: &mut [Rgba], linebuffer: &mut [Rgba]) {
    if layer.mosaic.enabled() && !layer.mosaic.samples_on(line) {
        blit_mosaic(
            &mut fb_line[layer.clip.x1 as usize..],
            &layer.mosaic.buffer[layer.clip.x1 as usize..],
            layer.clip.width() as usize,
            layer.mosaic.w,
            layer.blend,
        );
        return;
    }
    linebuffer.fill(Rgba::default());

    let palette = resolve_palette(layer, bitmap);
    let width = layer.clip.x2;

    let (px1, py1) = layer.transform.apply(f64::from(layer.hstart), f64::from(layer.vstart + line));
    let (px2, py2) = layer
        .transform
        .apply(f64::from(layer.hstart + width), f64::from(layer.vstart + line));

    let x1 = crate::fixed::float2fix(px1);
    let y1 = crate::fixed::float2fix(py1);
    let x2 = crate::fixed::float2fix(px2);
    let y2 = crate::fixed::float2fix(py2);
    let dx = (x2 - x1) / width;
    let dy = (y2 - y1) / width;

    let mut fx = x1;
    let mut fy = y1;
    let mut x = layer.clip.x1;
    while x < width {
        let xpos = (fix2int(fx) + layer.width).unsigned_abs() as i32 % layer.width;
        let ypos = (fix2int(fy) + layer.height).unsigned_abs() as i32 % layer.height;
        let sample = bitmap.pixel(xpos, ypos);
        linebuffer[(x - layer.clip.x1) as usize] = palette.color(sample);

        x += 1;
        fx += dx;
        fy += dy;
    }

    blit_buffer32(
        &mut fb_line[layer.clip.x1 as usize..],
        linebuffer,
        layer.clip.width() as usize,
        layer.blend,
    );
}

/// `PIXEL_MAP` mode. Same scratch discipline as AFFINE; looks the
/// palette up through `layer.palette` only, with no fallback to the bitmap's
/// own palette — construction is expected to have already rejected a
/// pixel-map bitmap layer with no palette override.
pub fn draw_pixel_map(layer: &Layer, bitmap: &Bitmap, line: i32, fb_line: &mut [Rgba], linebuffer: &mut [Rgba]) {
    if layer.mosaic.enabled() && !layer.mosaic.samples_on(line) {
        blit_mosaic(
            &mut fb_line[layer.clip.x1 as usize..],
            &layer.mosaic.buffer[layer.clip.x1 as usize..],
            layer.clip.width() as usize,
            layer.mosaic.w,
            layer.blend,
        );
        return;
    }
    linebuffer.fill(Rgba::default());

    let palette = layer
        .palette
        .as_ref()
        .expect("pixel-map bitmap layer must be constructed with a palette override");

    let hstart = layer.hstart + layer.width;
    let vstart = layer.vstart + layer.height;
    let framebuffer_width = fb_line.len() as i32;
    let pixel_map = layer.pixel_map.as_ref().expect("PixelMap layer requires a pixel map");

    let width = layer.clip.x2 - layer.clip.x1;
    let mut x = layer.clip.x1;
    while x < width {
        let entry = &pixel_map[(line * framebuffer_width + x) as usize];
        let xpos = (hstart + entry.dx).unsigned_abs() as i32 % layer.width;
        let ypos = (vstart + entry.dy).unsigned_abs() as i32 % layer.height;
        let sample = bitmap.pixel(xpos, ypos);
        linebuffer[x as usize] = palette.color(sample);
        x += 1;
    }

    blit_buffer32(
        &mut fb_line[layer.clip.x1 as usize..],
        linebuffer,
        layer.clip.width() as usize,
        layer.blend,
    );
}
