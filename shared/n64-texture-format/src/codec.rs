use crate::error::Error;
use crate::format::TextureFormat;
use crate::pixel_buf::PixelBuf;

pub mod i4;
pub mod i8;
pub mod ia16;
pub mod ia4;
pub mod ia8;
pub mod rgba16;
pub mod rgba32;

pub(crate) trait Codec {
    const FORMAT: TextureFormat;

    /// Packs texels in RDP scan order (bottom row first).
    fn encode(pixels: &PixelBuf) -> Vec<u8>;

    /// Inverse of `encode`, up to quantization.
    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf;
}

pub(crate) trait DynCodec {
    fn format(&self) -> TextureFormat;

    fn encode(&self, pixels: &PixelBuf) -> Vec<u8>;

    fn decode(&self, data: &[u8], width: u32, height: u32) -> PixelBuf;
}

impl<C: Codec> DynCodec for C {
    fn format(&self) -> TextureFormat {
        C::FORMAT
    }

    fn encode(&self, pixels: &PixelBuf) -> Vec<u8> {
        C::encode(pixels)
    }

    fn decode(&self, data: &[u8], width: u32, height: u32) -> PixelBuf {
        C::decode(data, width, height)
    }
}

impl TextureFormat {
    pub(crate) fn dyn_codec(self) -> Result<&'static dyn DynCodec, Error> {
        Ok(match self {
            Self::Rgba16 => &rgba16::Rgba16,
            Self::Rgba32 => &rgba32::Rgba32,
            Self::Ia4 => &ia4::Ia4,
            Self::Ia8 => &ia8::Ia8,
            Self::Ia16 => &ia16::Ia16,
            Self::I4 => &i4::I4,
            Self::I8 => &i8::I8,
            Self::Ci4 | Self::Ci8 => {
                return Err(Error::UnsupportedFormat {
                    format: self,
                    reason: "color-indexed data must be built through a palette",
                })
            }
            Self::Yuv16 => {
                return Err(Error::UnsupportedFormat {
                    format: self,
                    reason: "no YUV encoder exists",
                })
            }
        })
    }
}

/// Packs a pixel buffer into `format`'s wire layout.
pub fn encode(pixels: &PixelBuf, format: TextureFormat) -> Result<Vec<u8>, Error> {
    Ok(format.dyn_codec()?.encode(pixels))
}

/// Unpacks `format` wire data back to floats. Lossy formats return the
/// nearest representable values.
pub fn decode(
    data: &[u8],
    format: TextureFormat,
    width: u32,
    height: u32,
) -> Result<PixelBuf, Error> {
    Ok(format.dyn_codec()?.decode(data, width, height))
}

/// Round-to-nearest quantization to an unsigned field of `bits` bits.
pub(crate) fn quantize(value: f32, bits: u32) -> u32 {
    let max = (1u32 << bits) - 1;
    (value.clamp(0.0, 1.0) * max as f32).round() as u32
}

pub(crate) fn dequantize(value: u32, bits: u32) -> f32 {
    let max = (1u32 << bits) - 1;
    value as f32 / max as f32
}

/// BT.601 luma weights, the RDP's intensity convention.
pub(crate) fn luminance(rgba: [f32; 4]) -> f32 {
    0.299 * rgba[0] + 0.587 * rgba[1] + 0.114 * rgba[2]
}

/// 5-5-5-1 pack; alpha thresholds at one half.
pub(crate) fn pack_rgba16(rgba: [f32; 4]) -> u16 {
    let r = quantize(rgba[0], 5) as u16;
    let g = quantize(rgba[1], 5) as u16;
    let b = quantize(rgba[2], 5) as u16;
    let a = (rgba[3] >= 0.5) as u16;
    r << 11 | g << 6 | b << 1 | a
}

pub(crate) fn unpack_rgba16(texel: u16) -> [f32; 4] {
    [
        dequantize((texel >> 11) as u32 & 0x1f, 5),
        dequantize((texel >> 6) as u32 & 0x1f, 5),
        dequantize((texel >> 1) as u32 & 0x1f, 5),
        (texel & 1) as f32,
    ]
}

pub(crate) fn pack_ia16(rgba: [f32; 4]) -> u16 {
    let i = quantize(luminance(rgba), 8) as u16;
    let a = quantize(rgba[3], 8) as u16;
    i << 8 | a
}

pub(crate) fn unpack_ia16(texel: u16) -> [f32; 4] {
    let i = dequantize((texel >> 8) as u32, 8);
    let a = dequantize((texel & 0xff) as u32, 8);
    [i, i, i, a]
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use crate::{decode, encode, Error, PixelBuf, TextureFormat};

    fn arbitrary_buf(width: u32, height: u32, seed: Vec<u8>) -> PixelBuf {
        let count = width as usize * height as usize;
        let data = (0..count)
            .map(|i| {
                let sample = |c: usize| {
                    let byte = seed
                        .get((4 * i + c) % seed.len().max(1))
                        .copied()
                        .unwrap_or(0);
                    byte as f32 / 255.0
                };
                [sample(0), sample(1), sample(2), sample(3)]
            })
            .collect();
        PixelBuf::new(width, height, data)
    }

    /// One quantization step for the format's color/intensity field.
    fn tolerance(format: TextureFormat) -> f32 {
        match format {
            TextureFormat::Rgba16 => 1.0 / 31.0,
            TextureFormat::Rgba32 | TextureFormat::Ia16 | TextureFormat::I8 => 1.0 / 255.0,
            TextureFormat::Ia8 | TextureFormat::I4 => 1.0 / 15.0,
            TextureFormat::Ia4 => 1.0 / 7.0,
            _ => unreachable!(),
        }
    }

    #[quickcheck]
    fn round_trip_stays_within_quantization(seed: Vec<u8>) -> bool {
        const FORMATS: [TextureFormat; 7] = [
            TextureFormat::Rgba16,
            TextureFormat::Rgba32,
            TextureFormat::Ia4,
            TextureFormat::Ia8,
            TextureFormat::Ia16,
            TextureFormat::I4,
            TextureFormat::I8,
        ];
        let buf = arbitrary_buf(8, 4, seed);
        FORMATS.iter().all(|&format| {
            let encoded = encode(&buf, format).unwrap();
            let decoded = decode(&encoded, format, 8, 4).unwrap();
            let grey = matches!(
                format,
                TextureFormat::I4 | TextureFormat::I8 | TextureFormat::Ia4
                    | TextureFormat::Ia8
                    | TextureFormat::Ia16
            );
            let alpha_1_bit = matches!(format, TextureFormat::Rgba16 | TextureFormat::Ia4);
            (0..4).all(|y| {
                (0..8).all(|x| {
                    let src = buf.get(x, y);
                    let dst = decoded.get(x, y);
                    let color_ok = if grey {
                        // Intensity formats collapse RGB to luma; compare
                        // against the luma of the source instead.
                        let luma = super::luminance(src);
                        (dst[0] - luma).abs() <= tolerance(format) / 2.0 + 1e-6
                    } else {
                        (0..3).all(|c| (dst[c] - src[c]).abs() <= tolerance(format) / 2.0 + 1e-6)
                    };
                    let alpha_ok = if matches!(format, TextureFormat::I4 | TextureFormat::I8) {
                        // No alpha channel; decode reports intensity.
                        true
                    } else if alpha_1_bit {
                        dst[3] == (src[3] >= 0.5) as u32 as f32
                    } else {
                        (dst[3] - src[3]).abs() <= tolerance(format) / 2.0 + 1e-6
                    };
                    color_ok && alpha_ok
                })
            })
        })
    }

    #[test]
    fn color_indexed_encode_is_refused() {
        let buf = PixelBuf::solid(4, 4, [0.0, 0.0, 0.0, 1.0]);
        match encode(&buf, TextureFormat::Ci4) {
            Err(Error::UnsupportedFormat { format, .. }) => {
                assert_eq!(format, TextureFormat::Ci4)
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn yuv_encode_is_refused() {
        let buf = PixelBuf::solid(4, 4, [0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            encode(&buf, TextureFormat::Yuv16),
            Err(Error::UnsupportedFormat {
                format: TextureFormat::Yuv16,
                ..
            })
        ));
    }
}
