use crate::color::{Palette, Rgba};

/// Optional per-pixel blend, applied as `blend(src, dst) -> composited`.
///
/// This is the Rust-idiomatic stand-in for the source's blend function
/// pointer; `None` means a straight overwrite.
pub type BlendFn = fn(Rgba, Rgba) -> Rgba;

fn composite(dst: &mut Rgba, color: Rgba, blend: Option<BlendFn>) {
    *dst = blend.map_or(color, |f| f(color, *dst));
}

/// Blits `width` pixels, sampling a source palette index per destination
/// column through `sample`, with no transparency test.
///
/// This plays the role of the source's opaque blitter slot
/// (`layer.blitters[0]`/`sprite.blitter` when the row has no color-key),
/// generalized from a raw-pointer-plus-stride signature to a sampling
/// closure so callers (painters) own the fixed-point/flip bookkeeping
/// instead of encoding it into a pointer stride.
pub fn blit_opaque(
    dst: &mut [Rgba],
    width: usize,
    palette: &Palette,
    blend: Option<BlendFn>,
    mut sample: impl FnMut(usize) -> u8,
) {
    for (i, pixel) in dst.iter_mut().take(width).enumerate() {
        let index = sample(i);
        composite(pixel, palette.color(index), blend);
    }
}

/// Like [`blit_opaque`] but skips writes where the sampled index is 0
/// (the color-key / transparent convention).
pub fn blit_keyed(
    dst: &mut [Rgba],
    width: usize,
    palette: &Palette,
    blend: Option<BlendFn>,
    mut sample: impl FnMut(usize) -> u8,
) {
    for (i, pixel) in dst.iter_mut().take(width).enumerate() {
        let index = sample(i);
        if index != 0 {
            composite(pixel, palette.color(index), blend);
        }
    }
}

/// Fills `width` destination pixels with a single solid color (background fill).
pub fn blit_color(dst: &mut [Rgba], width: usize, color: Rgba) {
    for pixel in dst.iter_mut().take(width) {
        *pixel = color;
    }
}

/// Copies the mosaic buffer to the framebuffer line, replicating every
/// `block_w` pixels horizontally.
pub fn blit_mosaic(dst: &mut [Rgba], src: &[Rgba], width: usize, block_w: u32, blend: Option<BlendFn>) {
    let block_w = block_w.max(1) as usize;
    for i in 0..width {
        let sample = src[(i / block_w) * block_w];
        composite(&mut dst[i], sample, blend);
    }
}

/// Unconditional copy of a 32-bit scratch buffer (the affine/pixel-map
/// `linebuffer`) into the framebuffer line; transparent source pixels are
/// copied as-is, since affine/pixel-map layers always cover their clip span.
pub fn blit_buffer32(dst: &mut [Rgba], src: &[Rgba], width: usize, blend: Option<BlendFn>) {
    for i in 0..width {
        composite(&mut dst[i], src[i], blend);
    }
}

/// Copies non-zero pixels from `src` over `dst` (the priority-overlay composite pass).
pub fn overlay_nonzero(dst: &mut [Rgba], src: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        if s.0 != 0 {
            *d = *s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        let mut data = [Rgba::default(); 256];
        data[1] = Rgba(0x11);
        data[2] = Rgba(0x22);
        Palette::new(data)
    }

    #[test]
    fn keyed_blit_skips_transparent_index() {
        let palette = palette();
        let mut dst = [Rgba(0xDEAD), Rgba(0xDEAD)];
        let src = [0u8, 1];
        blit_keyed(&mut dst, 2, &palette, None, |i| src[i]);
        assert_eq!(dst[0], Rgba(0xDEAD));
        assert_eq!(dst[1], Rgba(0x11));
    }

    #[test]
    fn opaque_blit_overwrites_everything() {
        let palette = palette();
        let mut dst = [Rgba(0xDEAD)];
        blit_opaque(&mut dst, 1, &palette, None, |_| 0);
        assert_eq!(dst[0], palette.color(0));
    }

    #[test]
    fn mosaic_replicates_blocks() {
        let src = [Rgba(1), Rgba(2), Rgba(3), Rgba(4)];
        let mut dst = [Rgba(0); 4];
        blit_mosaic(&mut dst, &src, 4, 2, None);
        assert_eq!(dst, [Rgba(1), Rgba(1), Rgba(3), Rgba(3)]);
    }

    #[test]
    fn overlay_nonzero_leaves_zero_pixels_untouched() {
        let mut dst = [Rgba(5), Rgba(6)];
        let src = [Rgba(0), Rgba(9)];
        overlay_nonzero(&mut dst, &src);
        assert_eq!(dst, [Rgba(5), Rgba(9)]);
    }
}
