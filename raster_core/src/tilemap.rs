use crate::bitwise::Bits;
use crate::tileset::Tileset;
use std::sync::Arc;

/// Per-tile flag bits, stored packed the way the source packs `FLAG_FLIPX`/`FLAG_FLIPY`/etc.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct TileFlags(pub u16);

impl TileFlags {
    pub const FLIPX: u8 = 0;
    pub const FLIPY: u8 = 1;
    pub const ROTATE: u8 = 2;
    pub const PRIORITY: u8 = 3;
    pub const MASKED: u8 = 4;

    #[must_use]
    pub fn flipx(self) -> bool {
        self.0.get_bit(Self::FLIPX)
    }

    #[must_use]
    pub fn flipy(self) -> bool {
        self.0.get_bit(Self::FLIPY)
    }

    #[must_use]
    pub fn rotate(self) -> bool {
        self.0.get_bit(Self::ROTATE)
    }

    #[must_use]
    pub fn priority(self) -> bool {
        self.0.get_bit(Self::PRIORITY)
    }

    #[must_use]
    pub fn masked(self) -> bool {
        self.0.get_bit(Self::MASKED)
    }

    #[must_use]
    pub fn any_flip_or_rotate(self) -> bool {
        self.flipx() || self.flipy() || self.rotate()
    }
}

/// One cell of a [`Tilemap`]. `index == 0` means fully transparent, never sampled.
#[derive(Copy, Clone, Debug, Default)]
pub struct Tile {
    pub index: u16,
    /// Which tileset in the owning `Tilemap::tilesets` this tile draws from.
    pub tileset: u8,
    /// Global palette slot override (`engine.palettes[palette]`), or `None` for the tileset default.
    pub palette: Option<u8>,
    pub flags: TileFlags,
}

/// `cols x rows` grid of [`Tile`] cells, referencing one or more tilesets.
#[derive(Clone, Debug)]
pub struct Tilemap {
    pub cols: u32,
    pub rows: u32,
    pub tiles: Vec<Tile>,
    pub tilesets: Vec<Arc<Tileset>>,
}

impl Tilemap {
    #[must_use]
    pub fn tile_at(&self, col: u32, row: u32) -> &Tile {
        &self.tiles[(row * self.cols + col) as usize]
    }

    #[must_use]
    pub fn tileset_for(&self, tile: &Tile) -> &Arc<Tileset> {
        &self.tilesets[tile.tileset as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_report_individual_bits() {
        let mut flags = TileFlags::default();
        flags.0.set_bit(TileFlags::FLIPX, true);
        flags.0.set_bit(TileFlags::PRIORITY, true);
        assert!(flags.flipx());
        assert!(flags.priority());
        assert!(!flags.flipy());
        assert!(flags.any_flip_or_rotate());
    }
}
