//! TMEM cost arithmetic: word usage, line strides, and the load-block
//! legality rule. Everything here must match the hardware exactly since it
//! gates every load-strategy decision downstream.

use f3d::dp::{ImageFormat, TexelSize};
use n64_texture_format::TextureFormat;

/// Total TMEM capacity in 64-bit words.
pub const TMEM_WORDS: u32 = 512;

/// First word of the upper half, where color tables live.
pub const TLUT_BASE_WORD: u32 = 256;

/// Word stride between CI4 palette slots (16 entries, one word each).
pub const TLUT_SLOT_WORDS: u32 = 16;

pub fn rdp_format(format: TextureFormat) -> ImageFormat {
    match format {
        TextureFormat::Rgba16 | TextureFormat::Rgba32 => ImageFormat::Rgba,
        TextureFormat::Ci4 | TextureFormat::Ci8 => ImageFormat::Ci,
        TextureFormat::Ia4 | TextureFormat::Ia8 | TextureFormat::Ia16 => ImageFormat::Ia,
        TextureFormat::I4 | TextureFormat::I8 => ImageFormat::I,
        TextureFormat::Yuv16 => ImageFormat::Yuv,
    }
}

pub fn rdp_size(format: TextureFormat) -> TexelSize {
    match format.bits_per_texel() {
        4 => TexelSize::Bits4,
        8 => TexelSize::Bits8,
        16 => TexelSize::Bits16,
        _ => TexelSize::Bits32,
    }
}

/// 64-bit words occupied by one row of `width` texels.
pub fn words_per_row(format: TextureFormat, width: u32) -> u32 {
    width.div_ceil(format.texels_per_word())
}

/// TMEM words committed by a `width` x `height` rectangle.
pub fn tmem_word_usage(format: TextureFormat, width: u32, height: u32) -> u32 {
    words_per_row(format, width) * height
}

/// Texel words available to textures of this format. Color-indexed texels
/// may only use the lower half; the upper half belongs to their color
/// tables.
pub fn tmem_budget_words(format: TextureFormat) -> u32 {
    if format.is_color_indexed() {
        TLUT_BASE_WORD
    } else {
        TMEM_WORDS
    }
}

/// The SetTile `line` field for a render tile of `width` texels. RGBA32
/// lines count 16 bits per texel because the RDP splits the texel across
/// both banks.
pub fn tile_line_words(format: TextureFormat, width: u32) -> u32 {
    let line_bits = match format {
        TextureFormat::Rgba32 => 16,
        _ => format.bits_per_texel(),
    };
    (width * line_bits).div_ceil(64)
}

/// The SetTile `line` field for a load tile, which advances by the texels'
/// true byte footprint per row.
pub fn tile_load_line_words(format: TextureFormat, width: u32) -> u32 {
    (width * format.bits_per_texel()).div_ceil(64)
}

/// Whether a single contiguous LoadBlock can replace a row-by-row LoadTile.
///
/// Two conditions: the row must pad to a whole number of words (no gaps for
/// the block copy to swallow), and the hardware's fixed-point DXT row
/// counter must not drift onto a wrong row before `height` rows finish. The
/// RDP computes row advances from an 11-bit reciprocal approximation; its
/// per-row error is `dxt * words_per_row - 2048`, and the first corrupted
/// row is `ceil(dxt / error)`.
pub fn can_use_load_block(format: TextureFormat, width: u32, height: u32) -> bool {
    if width == 0 || width % format.texels_per_word() != 0 {
        return false;
    }
    let words = width / format.texels_per_word();
    let dxt = (1u32 << 11).div_ceil(words);
    let error = dxt * words - (1 << 11);
    if error == 0 {
        return true;
    }
    let first_corrupt_row = dxt.div_ceil(error);
    height <= first_corrupt_row
}

/// The LoadBlock `dxt` field: the per-word fraction-of-a-row increment in
/// 1.11 fixed point.
pub fn calc_dxt(format: TextureFormat, width: u32) -> u16 {
    let words = words_per_row(format, width).max(1);
    (1u32 << 11).div_ceil(words) as u16
}

/// Block loads address sub-16-bit formats as pairs: 4-bit texels load as
/// 8-bit, 8-bit texels as 16-bit. 16- and 32-bit formats load as themselves.
pub fn load_block_size(format: TextureFormat) -> TexelSize {
    match format.bits_per_texel() {
        4 => TexelSize::Bits8,
        8 => TexelSize::Bits16,
        16 => TexelSize::Bits16,
        _ => TexelSize::Bits32,
    }
}

/// Texel count as a LoadBlock sees it, in [`load_block_size`] units.
pub fn load_block_texel_count(format: TextureFormat, width: u32, height: u32) -> u32 {
    let texels = width * height;
    match format.bits_per_texel() {
        4 | 8 => texels.div_ceil(2),
        _ => texels,
    }
}

#[cfg(test)]
mod tests {
    use n64_texture_format::TextureFormat;
    use quickcheck_macros::quickcheck;

    use super::*;

    const ALL_FORMATS: [TextureFormat; 9] = [
        TextureFormat::Rgba16,
        TextureFormat::Rgba32,
        TextureFormat::Ci4,
        TextureFormat::Ci8,
        TextureFormat::Ia4,
        TextureFormat::Ia8,
        TextureFormat::Ia16,
        TextureFormat::I4,
        TextureFormat::I8,
    ];

    #[test]
    fn word_usage_examples() {
        // 32x32 RGBA16: 8 words per row.
        assert_eq!(tmem_word_usage(TextureFormat::Rgba16, 32, 32), 256);
        // 32x32 RGBA32 fills all of TMEM.
        assert_eq!(tmem_word_usage(TextureFormat::Rgba32, 32, 32), 512);
        // Partial words round up.
        assert_eq!(tmem_word_usage(TextureFormat::I4, 17, 1), 2);
    }

    #[quickcheck]
    fn word_usage_is_monotonic(width: u8, height: u8) -> bool {
        let (width, height) = (width as u32 % 64 + 1, height as u32 % 64 + 1);
        ALL_FORMATS.iter().all(|&format| {
            tmem_word_usage(format, width, height) <= tmem_word_usage(format, width + 1, height)
                && tmem_word_usage(format, width, height)
                    <= tmem_word_usage(format, width, height + 1)
        })
    }

    #[test]
    fn load_block_requires_whole_words() {
        for &format in &ALL_FORMATS {
            for width in 1..=128u32 {
                if width % format.texels_per_word() != 0 {
                    assert!(
                        !can_use_load_block(format, width, 16),
                        "{format} width {width} should not block-load",
                    );
                }
            }
        }
    }

    #[test]
    fn load_block_dxt_drift() {
        // 64 RGBA16 texels per row is exactly 16 words: no drift, any height.
        assert!(can_use_load_block(TextureFormat::Rgba16, 64, 256));
        // 24 texels per row is 6 words: dxt = ceil(2048/6) = 342, error 4,
        // first corrupt row = ceil(342/4) = 86.
        assert!(can_use_load_block(TextureFormat::Rgba16, 24, 86));
        assert!(!can_use_load_block(TextureFormat::Rgba16, 24, 87));
    }

    #[test]
    fn line_words_examples() {
        assert_eq!(tile_line_words(TextureFormat::Rgba16, 32), 8);
        assert_eq!(tile_line_words(TextureFormat::I4, 16), 1);
        // RGBA32 lines count half the texel's bits.
        assert_eq!(tile_line_words(TextureFormat::Rgba32, 32), 8);
        assert_eq!(tile_load_line_words(TextureFormat::Rgba32, 32), 16);
    }

    #[test]
    fn four_bit_block_loads_address_pairs() {
        assert_eq!(load_block_size(TextureFormat::I4), TexelSize::Bits8);
        assert_eq!(load_block_texel_count(TextureFormat::I4, 16, 16), 128);
        assert_eq!(calc_dxt(TextureFormat::I4, 16), 2048);
    }
}
