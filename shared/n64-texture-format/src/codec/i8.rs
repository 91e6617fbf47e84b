use crate::codec::{dequantize, luminance, quantize, Codec};
use crate::format::TextureFormat;
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct I8;

impl Codec for I8 {
    const FORMAT: TextureFormat = TextureFormat::I8;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        pixels
            .n64_scan()
            .map(|texel| quantize(luminance(texel), 8) as u8)
            .collect()
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        assert_eq!(data.len(), width as usize * height as usize);
        let texels = data
            .iter()
            .map(|&byte| {
                let i = dequantize(byte as u32, 8);
                [i, i, i, i]
            })
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}
