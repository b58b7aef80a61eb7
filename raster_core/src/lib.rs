//! Scanline rasterization core for a 2D retro-style tile/sprite graphics engine.
//!
//! This crate owns the per-scanline compositor: the scheduler
//! ([`engine::Engine::draw_scanline`]), the tiled/bitmap/object layer
//! painters, the sprite painters, and the shared scratch buffers they
//! collaborate through. Asset loading, animation, and presentation are host
//! concerns and live outside this crate.

pub mod bitmap;
pub mod bitwise;
pub mod blit;
pub mod color;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod framebuffer;
pub mod geometry;
pub mod layer;
pub mod object;
pub mod painter;
pub mod scratch;
pub mod sprite;
pub mod sprite_painter;
pub mod tilemap;
pub mod tileset;
pub mod transform;

pub use bitmap::Bitmap;
pub use color::{Palette, Rgba};
pub use engine::{Engine, EngineConfig};
pub use error::RasterError;
pub use framebuffer::Framebuffer;
pub use layer::{Affine2, Layer, LayerMode, LayerSource, PixelMapEntry};
pub use object::{Object, ObjectList};
pub use sprite::{Sprite, SpriteList};
pub use tilemap::{Tile, TileFlags, Tilemap};
pub use tileset::Tileset;
