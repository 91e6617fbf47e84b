use crate::codec::{dequantize, luminance, quantize, Codec};
use crate::format::TextureFormat;
use crate::nibble::{compact_nibble_array, expand_nibble_array};
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct Ia4;

impl Codec for Ia4 {
    const FORMAT: TextureFormat = TextureFormat::Ia4;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        let nibbles: Vec<u8> = pixels
            .n64_scan()
            .map(|texel| {
                let i = quantize(luminance(texel), 3) as u8;
                let a = (texel[3] >= 0.5) as u8;
                i << 1 | a
            })
            .collect();
        compact_nibble_array(&nibbles)
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        let count = width as usize * height as usize;
        let texels = expand_nibble_array(data, count)
            .into_iter()
            .map(|nibble| {
                let i = dequantize((nibble >> 1) as u32, 3);
                let a = (nibble & 1) as f32;
                [i, i, i, a]
            })
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}
