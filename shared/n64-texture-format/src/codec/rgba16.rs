use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::{pack_rgba16, unpack_rgba16, Codec};
use crate::format::TextureFormat;
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct Rgba16;

impl Codec for Rgba16 {
    const FORMAT: TextureFormat = TextureFormat::Rgba16;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        let mut data = Vec::with_capacity(pixels.texel_count() * 2);
        for texel in pixels.n64_scan() {
            data.write_u16::<BigEndian>(pack_rgba16(texel)).unwrap();
        }
        data
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        assert_eq!(data.len(), width as usize * height as usize * 2);
        let texels = data
            .chunks_exact(2)
            .map(|pair| unpack_rgba16(u16::from_be_bytes([pair[0], pair[1]])))
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}

#[cfg(test)]
mod tests {
    use super::Rgba16;
    use crate::codec::Codec;
    use crate::pixel_buf::PixelBuf;

    #[test]
    fn solid_red_packs_to_f801() {
        let buf = PixelBuf::solid(32, 32, [1.0, 0.0, 0.0, 1.0]);
        let data = Rgba16::encode(&buf);
        assert_eq!(data.len(), 2048);
        for texel in data.chunks_exact(2) {
            assert_eq!(texel, [0xf8, 0x01]);
        }
    }

    #[test]
    fn alpha_thresholds_at_one_half() {
        let opaque = Rgba16::encode(&PixelBuf::solid(1, 1, [0.0, 0.0, 0.0, 0.5]));
        let clear = Rgba16::encode(&PixelBuf::solid(1, 1, [0.0, 0.0, 0.0, 0.49]));
        assert_eq!(opaque, [0x00, 0x01]);
        assert_eq!(clear, [0x00, 0x00]);
    }

    #[test]
    fn rounds_to_nearest_level() {
        // 0.5 * 31 = 15.5 rounds to 16, not 15.
        let data = Rgba16::encode(&PixelBuf::solid(1, 1, [0.5, 0.0, 0.0, 0.0]));
        assert_eq!(data, [16 << 3, 0x00]);
    }
}
