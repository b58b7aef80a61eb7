use crate::tilemap::TileFlags;

/// Sampling origin and stride for one tile/sprite scanline, rewritten in
/// place by [`process_flip`]/[`process_flip_rotation`] according to the
/// element's flip/rotate flags.
#[derive(Copy, Clone, Debug, Default)]
pub struct Tilescan {
    pub width: i32,
    pub height: i32,
    pub srcx: i32,
    pub srcy: i32,
    pub dx: i32,
    pub stride: i32,
}

/// Flip-only remap, used by the scaling tiled painter (no rotate support there).
pub fn process_flip(flags: TileFlags, scan: &mut Tilescan) {
    if flags.flipx() {
        scan.dx = -scan.dx;
        scan.srcx = scan.width - 1;
    }
    if flags.flipy() {
        scan.srcy = scan.height - scan.srcy - 1;
    }
}

/// Combined flip + rotate remap: tiles in FLAT mode, sprites, and objects all
/// route through this one. Preserves the source's asymmetry between this
/// path's non-rotated `FLIPX` formula (`width - srcx - 1`) and
/// [`process_flip`]'s (`width - 1`) — callers here always pre-zero `srcx`
/// before calling, so the two are equivalent at every real call site, but
/// the formulas themselves are kept distinct rather than unified.
pub fn process_flip_rotation(flags: TileFlags, scan: &mut Tilescan) {
    if flags.rotate() {
        std::mem::swap(&mut scan.srcx, &mut scan.srcy);
        scan.dx *= scan.stride;

        if flags.flipx() {
            scan.dx = -scan.dx;
            scan.srcy = scan.height - scan.srcy - 1;
        }
        if flags.flipy() {
            scan.srcx = scan.width - scan.srcx - 1;
        }
    } else {
        if flags.flipx() {
            scan.dx = -scan.dx;
            scan.srcx = scan.width - scan.srcx - 1;
        }
        if flags.flipy() {
            scan.srcy = scan.height - scan.srcy - 1;
        }
    }
}

/// Rotation only makes visual sense on square source blocks; callers for
/// non-square sprites strip the flag before transforming.
#[must_use]
pub fn strip_rotate_if_not_square(mut flags: TileFlags, width: i32, height: i32) -> TileFlags {
    if flags.rotate() && width != height {
        flags.0 &= !(1 << TileFlags::ROTATE);
    }
    flags
}
