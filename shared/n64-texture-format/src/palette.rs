use byteorder::{BigEndian, WriteBytesExt};

use crate::error::Error;
use crate::format::{PaletteFormat, TextureFormat};
use crate::nibble::compact_nibble_array;
use crate::pixel_buf::PixelBuf;

/// An ordered color table for a CI texture.
///
/// Entry order is first-seen order in RDP scan order, and downstream index
/// buffers depend on it staying put; nothing here ever reorders the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    format: PaletteFormat,
    colors: Vec<u16>,
}

impl Palette {
    pub fn format(&self) -> PaletteFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[u16] {
        &self.colors
    }

    pub fn index_of(&self, color: u16) -> Option<usize> {
        self.colors.iter().position(|&c| c == color)
    }

    /// Packed big-endian color-table payload for a TLUT load.
    pub fn tlut_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.colors.len() * 2);
        for &color in &self.colors {
            data.write_u16::<BigEndian>(color).unwrap();
        }
        data
    }
}

/// Collects the distinct packed colors of `pixels` in first-seen order,
/// scanning the way the RDP will (bottom row first).
pub fn extract_palette(pixels: &PixelBuf, format: PaletteFormat) -> Palette {
    let mut colors = Vec::new();
    for texel in pixels.n64_scan() {
        let packed = format.pack_entry(texel);
        if !colors.contains(&packed) {
            colors.push(packed);
        }
    }
    Palette { format, colors }
}

/// Concatenates two palettes: all of `a`, then the colors of `b` not already
/// present. `a`'s colors keep their original indices.
pub fn merge_palettes(a: &Palette, b: &Palette) -> Palette {
    assert_eq!(a.format, b.format, "cannot merge palettes of differing formats");
    let mut colors = a.colors.clone();
    for &color in &b.colors {
        if !colors.contains(&color) {
            colors.push(color);
        }
    }
    Palette {
        format: a.format,
        colors,
    }
}

/// Maps every texel of `pixels` to its palette index, packed for `target`
/// (nibbles for CI4, bytes for CI8).
pub fn to_index_buffer(
    image: &str,
    pixels: &PixelBuf,
    palette: &Palette,
    target: TextureFormat,
) -> Result<Vec<u8>, Error> {
    let max = target
        .palette_capacity()
        .ok_or(Error::UnsupportedFormat {
            format: target,
            reason: "only color-indexed formats take an index buffer",
        })?;
    if palette.len() > max {
        return Err(Error::PaletteOverflow {
            image: image.to_owned(),
            count: palette.len(),
            max,
            format: target,
        });
    }

    let mut indices = Vec::with_capacity(pixels.texel_count());
    for texel in pixels.n64_scan() {
        let color = palette.format.pack_entry(texel);
        let index = palette
            .index_of(color)
            .ok_or_else(|| Error::ColorNotInPalette {
                image: image.to_owned(),
                color,
            })?;
        indices.push(index as u8);
    }

    Ok(match target {
        TextureFormat::Ci4 => compact_nibble_array(&indices),
        _ => indices,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_palette, merge_palettes, to_index_buffer};
    use crate::error::Error;
    use crate::format::{PaletteFormat, TextureFormat};
    use crate::pixel_buf::PixelBuf;

    /// `count` texels with distinct 5-bit red levels, one per texel.
    fn distinct_reds(width: u32, height: u32, count: usize) -> PixelBuf {
        let texels = (0..width as usize * height as usize)
            .map(|i| [(i % count) as f32 / 31.0, 0.0, 0.0, 1.0])
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }

    #[test]
    fn indices_follow_first_seen_order() {
        let buf = distinct_reds(16, 1, 16);
        let palette = extract_palette(&buf, PaletteFormat::Rgba16);
        assert_eq!(palette.len(), 16);
        for (index, &color) in palette.colors().iter().enumerate() {
            assert_eq!(color >> 11, index as u16);
        }

        let indices = to_index_buffer("reds", &buf, &palette, TextureFormat::Ci8).unwrap();
        assert_eq!(indices, (0u8..16).collect::<Vec<u8>>());
    }

    #[test]
    fn extraction_is_deterministic() {
        let buf = distinct_reds(8, 4, 11);
        let a = extract_palette(&buf, PaletteFormat::Rgba16);
        let b = extract_palette(&buf, PaletteFormat::Rgba16);
        assert_eq!(a, b);
    }

    #[test]
    fn seventeen_colors_overflow_ci4() {
        let buf = distinct_reds(17, 1, 17);
        let palette = extract_palette(&buf, PaletteFormat::Rgba16);
        assert_eq!(palette.len(), 17);
        let err = to_index_buffer("overflow", &buf, &palette, TextureFormat::Ci4).unwrap_err();
        match &err {
            Error::PaletteOverflow { count, max, .. } => {
                assert_eq!(*count, 17);
                assert_eq!(*max, 16);
            }
            other => panic!("expected PaletteOverflow, got {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("17"), "{message}");
        assert!(message.contains("16"), "{message}");
    }

    #[test]
    fn ci4_index_buffer_nibble_packs() {
        let buf = distinct_reds(64, 32, 16);
        let palette = extract_palette(&buf, PaletteFormat::Rgba16);
        let packed = to_index_buffer("grid", &buf, &palette, TextureFormat::Ci4).unwrap();
        // 2048 raw indices pack two per byte.
        assert_eq!(packed.len(), 1024);

        let half = distinct_reds(32, 32, 16);
        let palette = extract_palette(&half, PaletteFormat::Rgba16);
        let packed = to_index_buffer("grid", &half, &palette, TextureFormat::Ci4).unwrap();
        assert_eq!(packed.len(), 512);
    }

    #[test]
    fn merge_keeps_left_indices_stable() {
        let a = extract_palette(&distinct_reds(4, 1, 4), PaletteFormat::Rgba16);
        let b = extract_palette(&distinct_reds(8, 1, 8), PaletteFormat::Rgba16);
        let merged = merge_palettes(&a, &b);
        assert_eq!(merged.len(), 8);
        assert_eq!(&merged.colors()[..4], a.colors());
    }
}
