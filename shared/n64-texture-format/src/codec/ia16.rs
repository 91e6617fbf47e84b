use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::{pack_ia16, unpack_ia16, Codec};
use crate::format::TextureFormat;
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct Ia16;

impl Codec for Ia16 {
    const FORMAT: TextureFormat = TextureFormat::Ia16;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        let mut data = Vec::with_capacity(pixels.texel_count() * 2);
        for texel in pixels.n64_scan() {
            data.write_u16::<BigEndian>(pack_ia16(texel)).unwrap();
        }
        data
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        assert_eq!(data.len(), width as usize * height as usize * 2);
        let texels = data
            .chunks_exact(2)
            .map(|pair| unpack_ia16(u16::from_be_bytes([pair[0], pair[1]])))
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}

#[cfg(test)]
mod tests {
    use super::Ia16;
    use crate::codec::Codec;
    use crate::pixel_buf::PixelBuf;

    #[test]
    fn luma_weights_are_bt601() {
        // Pure green: 0.587 * 255 = 149.685 rounds to 150.
        let data = Ia16::encode(&PixelBuf::solid(1, 1, [0.0, 1.0, 0.0, 1.0]));
        assert_eq!(data, [150, 0xff]);
    }
}
