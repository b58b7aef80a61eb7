use std::sync::Arc;

use crate::blit::{blit_buffer32, blit_keyed, blit_mosaic, blit_opaque};
use crate::color::{Palette, Rgba};
use crate::fixed::{fix2int, int2fix};
use crate::geometry::wrap;
use crate::tilemap::Tilemap;
use crate::transform::{process_flip, process_flip_rotation, Tilescan};

use super::Layer;

fn resolve_palette(
    layer: &Layer,
    tile_palette_slot: Option<u8>,
    tileset_palette: &Arc<Palette>,
    global_palettes: &[Option<Arc<Palette>>],
) -> Arc<Palette> {
    if let Some(p) = &layer.palette {
        return p.clone();
    }
    if let Some(slot) = tile_palette_slot {
        if let Some(Some(p)) = global_palettes.get(slot as usize) {
            return p.clone();
        }
    }
    tileset_palette.clone()
}

/// FLAT mode.
pub fn draw_flat(
    layer: &mut Layer,
    tilemap: &Tilemap,
    line: i32,
    fb_line: &mut [Rgba],
    priority_buf: &mut [Rgba],
    global_palettes: &[Option<Arc<Palette>>],
) -> bool {
    let mut priority = false;

    if layer.mosaic.enabled() {
        if !layer.mosaic.samples_on(line) {
            blit_mosaic(&mut fb_line[layer.clip.x1 as usize..], &layer.mosaic.buffer[layer.clip.x1 as usize..], layer.clip.width() as usize, layer.mosaic.w, layer.blend);
            return false;
        }
        layer.mosaic.buffer.fill(Rgba::default());
    }

    let tileset = &tilemap.tilesets[0];
    let mut x = layer.clip.x1;
    let xpos0 = wrap(layer.hstart + x, layer.width);
    let mut xtile = xpos0 >> tileset.hshift();
    let mut scan = Tilescan {
        width: tileset.width as i32,
        height: tileset.height as i32,
        stride: tileset.width as i32,
        srcx: xpos0 & tileset.hmask() as i32,
        srcy: 0,
        dx: 1,
    };
    let mut column = x % tileset.width as i32;

    while x < layer.clip.x2 {
        let ypos = layer
            .column
            .as_ref()
            .map_or_else(
                || wrap(layer.vstart + line, layer.height),
                |_| wrap(layer.vstart + line + layer.column_offset(column), layer.height),
            );
        let ytile = ypos >> tileset.vshift();
        scan.srcy = ypos & tileset.vmask() as i32;

        let tile = tilemap.tile_at(xtile as u32, ytile as u32);

        let tilewidth = tileset.width as i32 - scan.srcx;
        let mut x1 = x + tilewidth;
        if x1 > layer.clip.x2 {
            x1 = layer.clip.x2;
        }
        let width = (x1 - x).max(0) as usize;

        if tile.index != 0 {
            let tile_tileset = tilemap.tileset_for(tile);
            let tile_index = tile_tileset.tiles[tile.index as usize];
            let palette = resolve_palette(layer, tile.palette, &tile_tileset.palette, global_palettes);

            scan.dx = 1;
            if tile.flags.any_flip_or_rotate() {
                process_flip_rotation(tile.flags, &mut scan);
            }

            let color_key = tile_tileset.color_key_bit(tile_index, scan.srcy);
            let honor_color_key = layer.flat_honors_color_key && color_key;

            let pixels = tile_tileset.tile_pixels(tile_index);
            let addr = scan.srcy * tileset.width as i32 + scan.srcx;
            let stride = scan.dx;
            let sampler = move |i: usize| pixels[(addr + stride * i as i32) as usize];

            let routed_to_priority = tile.flags.priority();
            if routed_to_priority {
                priority = true;
            }
            let dst: &mut [Rgba] = if routed_to_priority {
                &mut priority_buf[x as usize..]
            } else if layer.mosaic.enabled() {
                &mut layer.mosaic.buffer[x as usize..]
            } else {
                &mut fb_line[x as usize..]
            };

            // FLAT always uses the keyed blitter regardless of the computed
            // color-key bit, unless `flat_honors_color_key` opts into honoring it.
            if honor_color_key {
                blit_opaque(dst, width, &palette, layer.blend, sampler);
            } else {
                blit_keyed(dst, width, &palette, layer.blend, sampler);
            }
        }

        x += width as i32;
        xtile = (xtile + 1) % tilemap.cols as i32;
        scan.srcx = 0;
        column += 1;
    }

    if layer.mosaic.enabled() {
        blit_mosaic(&mut fb_line[layer.clip.x1 as usize..], &layer.mosaic.buffer[layer.clip.x1 as usize..], layer.clip.width() as usize, layer.mosaic.w, layer.blend);
    }

    priority
}

/// SCALING mode.
pub fn draw_scaling(
    layer: &mut Layer,
    tilemap: &Tilemap,
    line: i32,
    fb_line: &mut [Rgba],
    global_palettes: &[Option<Arc<Palette>>],
) -> bool {
    if layer.mosaic.enabled() {
        if !layer.mosaic.samples_on(line) {
            blit_mosaic(&mut fb_line[layer.clip.x1 as usize..], &layer.mosaic.buffer[layer.clip.x1 as usize..], layer.clip.width() as usize, layer.mosaic.w, layer.blend);
            return false;
        }
        layer.mosaic.buffer.fill(Rgba::default());
    }

    let tileset = &tilemap.tilesets[0];
    let mut x = layer.clip.x1;
    let xpos0 = wrap(layer.hstart + fix2int(x * layer.dx), layer.width);
    let mut xtile = xpos0 >> tileset.hshift();
    let mut scan = Tilescan {
        width: tileset.width as i32,
        height: tileset.height as i32,
        stride: tileset.width as i32,
        srcx: xpos0 & tileset.hmask() as i32,
        srcy: 0,
        dx: 1,
    };

    let mut fix_x = int2fix(x);
    let mut column = x % tileset.width as i32;

    while x < layer.clip.x2 {
        let mut ypos = line;
        if layer.column.is_some() {
            ypos += layer.column_offset(column);
        }
        let ypos = {
            let raw = layer.vstart + fix2int(ypos * layer.dy);
            if raw < 0 { layer.height + raw } else { raw % layer.height }
        };
        let ytile = ypos >> tileset.vshift();
        scan.srcy = ypos & tileset.vmask() as i32;

        let tile = tilemap.tile_at(xtile as u32, ytile as u32);

        let tilewidth = tileset.width as i32 - scan.srcx;
        let mut dx = int2fix(tilewidth);
        let fix_tilewidth = tilewidth * layer.xfactor;
        fix_x += fix_tilewidth;
        let x1 = fix2int(fix_x);
        let tilescalewidth = x1 - x;
        dx = if tilescalewidth != 0 { dx / tilescalewidth } else { 0 };

        let x1 = x1.min(layer.clip.x2);
        let width = (x1 - x).max(0) as usize;

        if tile.index != 0 {
            let tile_tileset = tilemap.tileset_for(tile);
            let tile_index = tile_tileset.tiles[tile.index as usize];
            let palette = resolve_palette(layer, tile.palette, &tile_tileset.palette, global_palettes);

            scan.dx = dx;
            if tile.flags.flipx() || tile.flags.flipy() {
                process_flip(tile.flags, &mut scan);
            }

            let color_key = tile_tileset.color_key_bit(tile_index, scan.srcy);
            let pixels = tile_tileset.tile_pixels(tile_index);
            let addr = scan.srcy * tileset.width as i32 + scan.srcx;
            let stride = scan.dx;
            let sampler = move |i: usize| {
                let step = fix2int(stride * i as i32);
                pixels[(addr + step) as usize]
            };

            let dst: &mut [Rgba] = if layer.mosaic.enabled() {
                &mut layer.mosaic.buffer[x as usize..]
            } else {
                &mut fb_line[x as usize..]
            };
            if color_key {
                blit_keyed(dst, width, &palette, layer.blend, sampler);
            } else {
                blit_opaque(dst, width, &palette, layer.blend, sampler);
            }
        }

        x = x1;
        xtile = (xtile + 1) % tilemap.cols as i32;
        scan.srcx = 0;
        column += 1;
    }

    if layer.mosaic.enabled() {
        blit_mosaic(&mut fb_line[layer.clip.x1 as usize..], &layer.mosaic.buffer[layer.clip.x1 as usize..], layer.clip.width() as usize, layer.mosaic.w, layer.blend);
    }

    false
}

/// AFFINE mode. Writes into the scheduler's `linebuffer` scratch, then
/// blits it to the framebuffer unconditionally (opaque-only; never priority).
pub fn draw_affine(
    layer: &Layer,
    tilemap: &Tilemap,
    line: i32,
    fb_line: &mut [Rgba],
    linebuffer: &mut [Rgba],
    global_palettes: &[Option<Arc<Palette>>],
) {
    let mosaic_active = layer.mosaic.enabled();
    let dstpixel: &mut [Rgba] = if mosaic_active {
        if !layer.mosaic.samples_on(line) {
            blit_mosaic(&mut fb_line[layer.clip.x1 as usize..], &layer.mosaic.buffer[layer.clip.x1 as usize..], layer.clip.width() as usize, layer.mosaic.w, layer.blend);
            return;
        }
        linebuffer
    } else {
        linebuffer
    };
    dstpixel.fill(Rgba::default());

    let width = layer.clip.x2;
    let tileset = &tilemap.tilesets[0];

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
        let xtile = xpos >> tileset.hshift();
        let ytile = ypos >> tileset.vshift();
        let srcx = xpos & tileset.hmask() as i32;
        let srcy = ypos & tileset.vmask() as i32;

        let tile = tilemap.tile_at(xtile as u32, ytile as u32);
        if tile.index != 0 {
            let tile_tileset = tilemap.tileset_for(tile);
            let tile_index = tile_tileset.tiles[tile.index as usize];
            let mut scan = Tilescan {
                width: tile_tileset.width as i32,
                height: tile_tileset.height as i32,
                stride: tile_tileset.width as i32,
                srcx,
                srcy,
                dx: 1,
            };
            if tile.flags.any_flip_or_rotate() {
                process_flip_rotation(tile.flags, &mut scan);
            }
            let palette = resolve_palette(layer, tile.palette, &tile_tileset.palette, global_palettes);
            let sample = tile_tileset.tileset_pixel(tile_index, scan.srcx, scan.srcy);
            dstpixel[(x - layer.clip.x1) as usize] = palette.color(sample);
        }

        x += 1;
        fx += dx;
        fy += dy;
    }

    blit_buffer32(
        &mut fb_line[layer.clip.x1 as usize..],
        dstpixel,
        layer.clip.width() as usize,
        layer.blend,
    );
}

/// `PIXEL_MAP` mode, same scratch-buffer discipline as AFFINE.
pub fn draw_pixel_map(
    layer: &Layer,
    tilemap: &Tilemap,
    line: i32,
    fb_line: &mut [Rgba],
    linebuffer: &mut [Rgba],
    global_palettes: &[Option<Arc<Palette>>],
) {
    if layer.mosaic.enabled() && !layer.mosaic.samples_on(line) {
        blit_mosaic(&mut fb_line[layer.clip.x1 as usize..], &layer.mosaic.buffer[layer.clip.x1 as usize..], layer.clip.width() as usize, layer.mosaic.w, layer.blend);
        return;
    }
    linebuffer.fill(Rgba::default());

    let tileset = &tilemap.tilesets[0];
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
        let xtile = xpos >> tileset.hshift();
        let ytile = ypos >> tileset.vshift();
        let srcx = xpos & tileset.hmask() as i32;
        let srcy = ypos & tileset.vmask() as i32;

        let tile = tilemap.tile_at(xtile as u32, ytile as u32);
        if tile.index != 0 {
            let tile_tileset = tilemap.tileset_for(tile);
            let tile_index = tile_tileset.tiles[tile.index as usize];
            let mut scan = Tilescan {
                width: tile_tileset.width as i32,
                height: tile_tileset.height as i32,
                stride: tile_tileset.width as i32,
                srcx,
                srcy,
                dx: 1,
            };
            if tile.flags.any_flip_or_rotate() {
                process_flip_rotation(tile.flags, &mut scan);
            }
            let palette = resolve_palette(layer, tile.palette, &tile_tileset.palette, global_palettes);
            let sample = tile_tileset.tileset_pixel(tile_index, scan.srcx, scan.srcy);
            linebuffer[x as usize] = palette.color(sample);
        }
        x += 1;
    }

    blit_buffer32(
        &mut fb_line[layer.clip.x1 as usize..],
        linebuffer,
        layer.clip.width() as usize,
        layer.blend,
    );
}
