use crate::codec::{dequantize, luminance, quantize, Codec};
use crate::format::TextureFormat;
use crate::nibble::{compact_nibble_array, expand_nibble_array};
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct I4;

impl Codec for I4 {
    const FORMAT: TextureFormat = TextureFormat::I4;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        let nibbles: Vec<u8> = pixels
            .n64_scan()
            .map(|texel| quantize(luminance(texel), 4) as u8)
            .collect();
        compact_nibble_array(&nibbles)
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        let count = width as usize * height as usize;
        let texels = expand_nibble_array(data, count)
            .into_iter()
            .map(|nibble| {
                let i = dequantize(nibble as u32, 4);
                [i, i, i, i]
            })
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}

#[cfg(test)]
mod tests {
    use super::I4;
    use crate::codec::Codec;
    use crate::pixel_buf::PixelBuf;

    #[test]
    fn odd_texel_count_pads_with_last_nibble() {
        let buf = PixelBuf::new(
            3,
            1,
            vec![[0.0; 4], [1.0, 1.0, 1.0, 1.0], [0.5, 0.5, 0.5, 1.0]],
        );
        // Nibbles 0x0, 0xf, 0x8; the tail byte repeats 0x8.
        assert_eq!(I4::encode(&buf), [0x0f, 0x88]);
    }
}
