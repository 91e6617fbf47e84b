use crate::codec::{dequantize, luminance, quantize, Codec};
use crate::format::TextureFormat;
use crate::pixel_buf::PixelBuf;

#[derive(Debug)]
pub struct Ia8;

impl Codec for Ia8 {
    const FORMAT: TextureFormat = TextureFormat::Ia8;

    fn encode(pixels: &PixelBuf) -> Vec<u8> {
        let mut data = Vec::with_capacity(pixels.texel_count());
        for texel in pixels.n64_scan() {
            let i = quantize(luminance(texel), 4) as u8;
            let a = quantize(texel[3], 4) as u8;
            data.push(i << 4 | a);
        }
        data
    }

    fn decode(data: &[u8], width: u32, height: u32) -> PixelBuf {
        assert_eq!(data.len(), width as usize * height as usize);
        let texels = data
            .iter()
            .map(|&byte| {
                let i = dequantize((byte >> 4) as u32, 4);
                let a = dequantize((byte & 0xf) as u32, 4);
                [i, i, i, a]
            })
            .collect();
        PixelBuf::from_n64_scan(width, height, texels)
    }
}

#[cfg(test)]
mod tests {
    use super::Ia8;
    use crate::codec::Codec;
    use crate::pixel_buf::PixelBuf;

    #[test]
    fn packs_intensity_high_alpha_low() {
        let data = Ia8::encode(&PixelBuf::solid(1, 1, [1.0, 1.0, 1.0, 0.0]));
        assert_eq!(data, [0xf0]);
    }
}
