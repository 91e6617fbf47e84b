use crate::codec::{dequantize, quantize, Codec};
use crate::format::TextureFormat;
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct Rgba32;

impl Codec for Rgba32 {
    const FORMAT: TextureFormat = TextureFormat::Rgba32;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        let mut data = Vec::with_capacity(pixels.texel_count() * 4);
        for texel in pixels.n64_scan() {
            for channel in texel {
                data.push(quantize(channel, 8) as u8);
            }
        }
        data
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        assert_eq!(data.len(), width as usize * height as usize * 4);
        let texels = data
            .chunks_exact(4)
            .map(|px| {
                [
                    dequantize(px[0] as u32, 8),
                    dequantize(px[1] as u32, 8),
                    dequantize(px[2] as u32, 8),
                    dequantize(px[3] as u32, 8),
                ]
            })
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}
