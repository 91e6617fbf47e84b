use core::fmt;
use core::str::FromStr;

/// The native RDP texel encodings.
///
/// `Ci4`/`Ci8` texels are palette indices and always pair with a
/// [`PaletteFormat`] describing their 16-bit color-table entries. `Yuv16`
/// exists so that callers can name it; no encoder is provided for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba16,
    Rgba32,
    Ci4,
    Ci8,
    Ia4,
    Ia8,
    Ia16,
    I4,
    I8,
    Yuv16,
}

impl TextureFormat {
    pub fn bits_per_texel(self) -> u32 {
        match self {
            Self::Rgba32 => 32,
            Self::Rgba16 | Self::Ia16 | Self::Yuv16 => 16,
            Self::Ci8 | Self::Ia8 | Self::I8 => 8,
            Self::Ci4 | Self::Ia4 | Self::I4 => 4,
        }
    }

    /// Texels per 64-bit TMEM word.
    pub fn texels_per_word(self) -> u32 {
        64 / self.bits_per_texel()
    }

    pub fn is_4_bit(self) -> bool {
        self.bits_per_texel() == 4
    }

    pub fn is_color_indexed(self) -> bool {
        matches!(self, Self::Ci4 | Self::Ci8)
    }

    /// Number of palette entries a color-indexed format can address.
    pub fn palette_capacity(self) -> Option<usize> {
        match self {
            Self::Ci4 => Some(16),
            Self::Ci8 => Some(256),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgba16 => "RGBA16",
            Self::Rgba32 => "RGBA32",
            Self::Ci4 => "CI4",
            Self::Ci8 => "CI8",
            Self::Ia4 => "IA4",
            Self::Ia8 => "IA8",
            Self::Ia16 => "IA16",
            Self::I4 => "I4",
            Self::I8 => "I8",
            Self::Yuv16 => "YUV16",
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "rgba16" => Self::Rgba16,
            "rgba32" => Self::Rgba32,
            "ci4" => Self::Ci4,
            "ci8" => Self::Ci8,
            "ia4" => Self::Ia4,
            "ia8" => Self::Ia8,
            "ia16" => Self::Ia16,
            "i4" => Self::I4,
            "i8" => Self::I8,
            "yuv16" => Self::Yuv16,
            _ => return Err(format!("unknown texture format: {s:?}")),
        })
    }
}

/// Encoding of the 16-bit color-table entries backing a CI texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteFormat {
    Rgba16,
    Ia16,
}

impl PaletteFormat {
    /// The texel format a color table's entries are encoded as.
    pub fn entry_format(self) -> TextureFormat {
        match self {
            Self::Rgba16 => TextureFormat::Rgba16,
            Self::Ia16 => TextureFormat::Ia16,
        }
    }

    /// Packs one RGBA pixel as a 16-bit color-table entry.
    pub fn pack_entry(self, rgba: [f32; 4]) -> u16 {
        match self {
            Self::Rgba16 => crate::codec::pack_rgba16(rgba),
            Self::Ia16 => crate::codec::pack_ia16(rgba),
        }
    }
}

impl fmt::Display for PaletteFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Rgba16 => "RGBA16",
            Self::Ia16 => "IA16",
        })
    }
}

impl FromStr for PaletteFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "rgba16" => Self::Rgba16,
            "ia16" => Self::Ia16,
            _ => return Err(format!("unknown palette format: {s:?}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::TextureFormat;

    #[test]
    fn texels_per_word() {
        assert_eq!(TextureFormat::Rgba32.texels_per_word(), 2);
        assert_eq!(TextureFormat::Rgba16.texels_per_word(), 4);
        assert_eq!(TextureFormat::Ci8.texels_per_word(), 8);
        assert_eq!(TextureFormat::I4.texels_per_word(), 16);
    }
}
