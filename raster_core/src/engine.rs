//! The scanline scheduler: owns all per-frame state and drives
//! `DrawScanline`, the engine's only per-line entry point.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;
use crate::blit::{blit_color, blit_opaque, overlay_nonzero};
use crate::color::{Palette, Rgba};
use crate::error::RasterError;
use crate::framebuffer::Framebuffer;
use crate::layer::Layer;
use crate::painter;
use crate::scratch::ScratchBuffers;
use crate::sprite::{Sprite, SpriteList, SpriteListNode, NONE};
use crate::sprite_painter;

/// Number of global palette slots a tile/sprite's `palette` field can select.
pub const NUM_PALETTES: usize = 8;

/// Construction-time configuration for an [`Engine`]. Round-trips through
/// `serde` so a host can snapshot or replay a configuration without reaching
/// into engine internals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub max_layers: usize,
    pub max_sprites: usize,
    pub bgcolor: Option<Rgba>,
    /// `false` reproduces the FLAT tiled painter's hardcoded-keyed
    /// blitter selection bit-exact; `true` honors the computed per-row
    /// color-key bit the way the SCALING painter already does.
    pub flat_honors_color_key: bool,
}

/// The raster-effect hook. Invoked synchronously
/// at the start of every scanline; may mutate any engine state.
pub type RasterCallback = Box<dyn FnMut(&mut Engine, i32)>;

/// Process-wide rendering state. Owns the framebuffer, every
/// layer/sprite, the global palette slots, and the per-scanline scratch buffers.
pub struct Engine {
    pub framebuffer: Framebuffer,
    pub layers: Vec<Layer>,
    pub sprites: Vec<Sprite>,
    pub list_sprites: SpriteList,
    pub palettes: [Option<Arc<Palette>>; NUM_PALETTES],
    scratch: ScratchBuffers,
    pub line: i32,
    pub dirty: bool,
    pub sprite_mask_top: i32,
    pub sprite_mask_bottom: i32,
    pub xworld: i32,
    pub yworld: i32,
    pub bgcolor: Option<Rgba>,
    pub bgbitmap: Option<Arc<Bitmap>>,
    pub bgpalette: Option<Arc<Palette>>,
    pub flat_honors_color_key: bool,
    cb_raster: Option<RasterCallback>,
}

impl Engine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let width = config.width as usize;
        let height = config.height as usize;
        logger::log(format!(
            "engine: constructing {width}x{height}, max_layers={}, max_sprites={}",
            config.max_layers, config.max_sprites
        ));
        Self {
            framebuffer: Framebuffer::new(width, height),
            layers: Vec::with_capacity(config.max_layers),
            sprites: Vec::with_capacity(config.max_sprites),
            list_sprites: SpriteList { first: NONE, last: NONE },
            palettes: Default::default(),
            scratch: ScratchBuffers::new(width),
            line: 0,
            dirty: true,
            sprite_mask_top: 0,
            sprite_mask_bottom: 0,
            xworld: 0,
            yworld: 0,
            bgcolor: config.bgcolor,
            bgbitmap: None,
            bgpalette: None,
            flat_honors_color_key: config.flat_honors_color_key,
            cb_raster: None,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.framebuffer.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.framebuffer.height()
    }

    pub fn set_raster_callback(&mut self, cb: RasterCallback) {
        self.cb_raster = Some(cb);
    }

    /// # Errors
    /// Returns [`RasterError::PaletteSlotOutOfRange`] if `slot >= NUM_PALETTES`.
    pub fn set_palette(&mut self, slot: u8, palette: Arc<Palette>) -> Result<(), RasterError> {
        let slot = slot as usize;
        if slot >= NUM_PALETTES {
            return Err(RasterError::PaletteSlotOutOfRange { slot: slot as u8, capacity: NUM_PALETTES });
        }
        self.palettes[slot] = Some(palette);
        Ok(())
    }

    /// # Errors
    /// Returns [`RasterError::LayerIndexOutOfRange`] if `index` is not a configured layer.
    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer, RasterError> {
        let capacity = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(RasterError::LayerIndexOutOfRange { index, capacity })
    }

    /// Appends a sprite to the back of the draw-order list (drawn last, on top).
    pub fn add_sprite(&mut self, mut sprite: Sprite) -> usize {
        let index = self.sprites.len() as i32;
        let last = self.list_sprites.last;
        sprite.list_node = SpriteListNode { prev: last, next: NONE };
        self.sprites.push(sprite);
        if last != NONE {
            self.sprites[last as usize].list_node.next = index;
        } else {
            self.list_sprites.first = index;
        }
        self.list_sprites.last = index;
        index as usize
    }

    /// # Errors
    /// Returns [`RasterError::SpriteIndexOutOfRange`] if `index` is not a configured sprite.
    pub fn sprite_mut(&mut self, index: usize) -> Result<&mut Sprite, RasterError> {
        let capacity = self.sprites.len();
        self.sprites
            .get_mut(index)
            .ok_or(RasterError::SpriteIndexOutOfRange { index, capacity })
    }

    /// `DrawScanline`: paints `framebuffer[line]` and advances `line`.
    /// Returns `true` if another scanline remains to be drawn.
    pub fn draw_scanline(&mut self) -> bool {
        let line = self.line;
        logger::log(format!("engine: drawing scanline {line}"));

        if let Some(mut cb) = self.cb_raster.take() {
            cb(self, line);
            self.cb_raster = Some(cb);
        }

        let line_usize = self.line as usize;
        let width = self.framebuffer.width();

        self.fill_background(line_usize);
        self.scratch.clear_priority();

        let background_priority = self.draw_background_layers(line, false);

        let sprite_priority = self.draw_sprites(line, false);

        let top_priority = self.draw_background_layers(line, true);
        let background_priority = background_priority || top_priority;

        if background_priority {
            let fb_line = self.framebuffer.line_mut(line_usize);
            overlay_nonzero(fb_line, &self.scratch.priority[..width]);
        }

        if sprite_priority {
            self.draw_sprites(line, true);
        }

        self.dirty = false;
        self.line += 1;
        self.line < self.framebuffer.height() as i32
    }

    fn fill_background(&mut self, line_usize: usize) {
        let width = self.framebuffer.width();
        let fb_line = self.framebuffer.line_mut(line_usize);
        if let Some(bitmap) = &self.bgbitmap {
            if (line_usize as u32) < bitmap.height {
                let run = width.min(bitmap.width as usize);
                let row = bitmap.row_from(0, line_usize as i32);
                let palette = self.bgpalette.clone().unwrap_or_else(|| bitmap.palette.clone());
                blit_opaque(fb_line, run, &palette, None, |i| row[i]);
            }
        } else if let Some(color) = self.bgcolor {
            blit_color(fb_line, width, color);
        }
    }

    /// Runs every `ok`, mode-matching background layer in reverse index
    /// order (deepest first). `wants_priority` selects whole-layer-priority
    /// layers on the second pass over the same set.
    fn draw_background_layers(&mut self, line: i32, wants_priority: bool) -> bool {
        let mut any_priority = false;
        let line_usize = line as usize;

        for idx in (0..self.layers.len()).rev() {
            let intersects = {
                let layer = &self.layers[idx];
                layer.ok && layer.priority == wants_priority && layer.clip.contains_line(line)
            };
            if !intersects {
                continue;
            }

            if self.dirty || self.layers[idx].dirty {
                logger::log(format!("engine: recomputing layer {idx} (dirty)"));
                self.layers[idx].dirty = false;
            }

            let fb_line = self.framebuffer.line_mut(line_usize);
            let ScratchBuffers { priority, linebuffer, .. } = &mut self.scratch;
            let layer = &mut self.layers[idx];
            let routed = painter::draw_layer(layer, line, fb_line, priority, linebuffer, &self.palettes);
            any_priority = any_priority || routed;
        }

        any_priority
    }

    /// Walks the sprite draw-order list forward, drawing every sprite whose
    /// priority flag matches `wants_priority`. Clears the collision buffer
    /// and runs coverage/world-space recompute only on the non-priority pass.
    fn draw_sprites(&mut self, line: i32, wants_priority: bool) -> bool {
        if !wants_priority {
            self.scratch.clear_collision();
        }

        let mut any_priority = false;
        let mut cursor = self.list_sprites.first;
        while cursor != NONE {
            let idx = cursor as usize;
            cursor = self.sprites[idx].list_node.next;

            if !wants_priority {
                self.update_sprite_world_space(idx);
            }

            let covered = self.sprites[idx].covers_line(line, self.sprite_mask_top, self.sprite_mask_bottom);
            if !covered {
                continue;
            }

            let is_priority = self.sprites[idx].flags.priority();
            if is_priority != wants_priority {
                any_priority = any_priority || (is_priority && !wants_priority);
                continue;
            }

            let fb_line = self.framebuffer.line_mut(line as usize);
            let mut collided = Vec::new();
            {
                let sprite = &self.sprites[idx];
                let collision = &mut self.scratch.collision;
                if sprite.scaling {
                    sprite_painter::draw_scaling(sprite, line, fb_line, collision, idx as u16, |id| {
                        collided.push(id);
                    });
                } else {
                    sprite_painter::draw_flat(sprite, line, fb_line, collision, idx as u16, |id| {
                        collided.push(id);
                    });
                }
            }
            for id in collided {
                self.sprites[id as usize].collision = true;
            }
        }

        any_priority
    }

    fn update_sprite_world_space(&mut self, idx: usize) {
        let sprite = &mut self.sprites[idx];
        if !sprite.world_space || !sprite.dirty {
            return;
        }
        let width = sprite.dstrect.x2 - sprite.dstrect.x1;
        let height = sprite.dstrect.y2 - sprite.dstrect.y1;
        sprite.x = sprite.xworld - self.xworld;
        sprite.y = sprite.yworld - self.yworld;
        sprite.dstrect.x1 = sprite.x;
        sprite.dstrect.x2 = sprite.x + width;
        sprite.dstrect.y1 = sprite.y;
        sprite.dstrect.y2 = sprite.y + height;
        sprite.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::color::Rgba;
    use crate::fixed::int2fix;
    use crate::geometry::Rect;
    use crate::layer::{Affine2, LayerMode, LayerSource};
    use crate::scratch::MosaicBuffer;
    use crate::tilemap::{Tile, TileFlags, Tilemap};
    use crate::tileset::Tileset;

    fn config(w: u32, h: u32) -> EngineConfig {
        EngineConfig {
            width: w,
            height: h,
            max_layers: 4,
            max_sprites: 8,
            bgcolor: None,
            flat_honors_color_key: false,
        }
    }

    fn palette_identity_rgba() -> Arc<Palette> {
        let mut data = [Rgba::default(); 256];
        data[1] = Rgba(0x0000_00FF);
        data[2] = Rgba(0x0000_FF00);
        data[3] = Rgba(0x00FF_0000);
        data[4] = Rgba(0xFFFF_FF00);
        Arc::new(Palette::new(data))
    }

    fn single_tile_layer(flipx: bool) -> Layer {
        let palette = palette_identity_rgba();
        let tileset = Arc::new(
            Tileset::new(
                4,
                4,
                vec![0, 0],
                vec![1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                vec![false; 4],
                palette,
            )
            .unwrap(),
        );
        let tilemap = Arc::new(Tilemap {
            cols: 1,
            rows: 1,
            tiles: vec![Tile {
                index: 1,
                tileset: 0,
                palette: None,
                flags: if flipx {
                    TileFlags(1 << TileFlags::FLIPX)
                } else {
                    TileFlags::default()
                },
            }],
            tilesets: vec![tileset],
        });
        Layer {
            ok: true,
            clip: Rect { x1: 0, y1: 0, x2: 4, y2: 1 },
            hstart: 0,
            vstart: 0,
            width: 4,
            height: 4,
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
            source: LayerSource::Tiled(tilemap),
            flat_honors_color_key: false,
        }
    }

    #[test]
    fn scan_advance_reaches_height_then_stops() {
        let mut engine = Engine::new(&config(4, 3));
        assert!(engine.draw_scanline());
        assert!(engine.draw_scanline());
        assert!(!engine.draw_scanline());
        assert_eq!(engine.line, 3);
    }

    #[test]
    fn background_color_fills_every_pixel_with_no_layers() {
        let mut engine = Engine::new(&config(4, 1));
        engine.bgcolor = Some(Rgba(0x1234_5678));
        engine.draw_scanline();
        assert_eq!(engine.framebuffer.line(0), &[Rgba(0x1234_5678); 4]);
    }

    // S1
    #[test]
    fn flat_tile_row_matches_expected_colors() {
        let mut engine = Engine::new(&config(4, 1));
        engine.layers.push(single_tile_layer(false));
        engine.draw_scanline();
        assert_eq!(
            engine.framebuffer.line(0),
            &[Rgba(0x0000_00FF), Rgba(0x0000_FF00), Rgba(0x00FF_0000), Rgba(0xFFFF_FF00)]
        );
    }

    // S2
    #[test]
    fn flipped_tile_row_is_mirrored() {
        let mut engine = Engine::new(&config(4, 1));
        engine.layers.push(single_tile_layer(true));
        engine.draw_scanline();
        assert_eq!(
            engine.framebuffer.line(0),
            &[Rgba(0xFFFF_FF00), Rgba(0x00FF_0000), Rgba(0x0000_FF00), Rgba(0x0000_00FF)]
        );
    }

    // S3
    #[test]
    fn overlapping_sprites_both_collide_and_later_wins() {
        let mut engine = Engine::new(&config(2, 1));
        let palette = palette_identity_rgba();
        let make = |x: i32| Sprite {
            srcrect: Rect { x1: 0, y1: 0, x2: 1, y2: 1 },
            dstrect: Rect { x1: x, y1: 0, x2: x + 1, y2: 1 },
            info: crate::sprite::SpriteInfo { w: 1, h: 1 },
            pixels: Arc::new(vec![4]),
            pitch: 1,
            palette: palette.clone(),
            blend: None,
            flags: TileFlags::default(),
            dx: int2fix(1),
            dy: int2fix(1),
            x,
            y: 0,
            xworld: 0,
            yworld: 0,
            world_space: false,
            do_collision: true,
            collision: false,
            dirty: false,
            scaling: false,
            ok: true,
            list_node: SpriteListNode::default(),
        };
        engine.add_sprite(make(0));
        engine.add_sprite(make(1));
        engine.draw_scanline();

        assert!(engine.sprites[0].collision);
        assert!(engine.sprites[1].collision);
    }

    // S5
    #[test]
    fn mosaic_replicates_every_block() {
        let mut engine = Engine::new(&config(8, 1));
        let palette = {
            let mut data = [Rgba::default(); 256];
            for (i, v) in (1_u8..=8).enumerate() {
                data[v as usize] = Rgba(u32::from(i as u8 + 1));
            }
            Arc::new(Palette::new(data))
        };
        let pixels = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let tileset = Arc::new(Tileset::new(8, 1, vec![0, 0], pixels, vec![false; 1], palette).unwrap());
        let tilemap = Arc::new(Tilemap {
            cols: 1,
            rows: 1,
            tiles: vec![Tile { index: 1, tileset: 0, palette: None, flags: TileFlags::default() }],
            tilesets: vec![tileset],
        });
        let mut layer = Layer {
            ok: true,
            clip: Rect { x1: 0, y1: 0, x2: 8, y2: 1 },
            hstart: 0,
            vstart: 0,
            width: 8,
            height: 1,
            mode: LayerMode::Flat,
            palette: None,
            blend: None,
            column: None,
            mosaic: MosaicBuffer::new(8),
            dx: int2fix(1),
            dy: int2fix(1),
            xfactor: int2fix(1),
            transform: Affine2::identity(),
            pixel_map: None,
            priority: false,
            dirty: true,
            source: LayerSource::Tiled(tilemap),
            flat_honors_color_key: false,
        };
        layer.mosaic.w = 2;
        layer.mosaic.h = 1;
        engine.layers.push(layer);
        engine.draw_scanline();

        let row = engine.framebuffer.line(0);
        assert_eq!(row[0], row[1]);
        assert_eq!(row[2], row[3]);
        assert_ne!(row[0], row[2]);
    }

    #[test]
    fn affine_identity_transform_samples_tile_directly() {
        let mut engine = Engine::new(&config(4, 1));
        let mut layer = single_tile_layer(false);
        layer.mode = LayerMode::Affine;
        layer.transform = Affine2 {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        };
        engine.layers.push(layer);
        engine.draw_scanline();
        assert_eq!(engine.framebuffer.line(0)[0], Rgba(0x0000_00FF));
    }
}
