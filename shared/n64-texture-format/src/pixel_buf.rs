/// An owned RGBA float image, each channel in [0, 1].
///
/// Rows are stored top-down as authoring tools produce them. The RDP scans
/// textures bottom-to-top; that flip is applied by iteration order at the
/// codec and palette boundary ([`PixelBuf::n64_scan`]), never by mutating the
/// buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuf {
    width: u32,
    height: u32,
    data: Vec<[f32; 4]>,
}

impl PixelBuf {
    pub fn new(width: u32, height: u32, data: Vec<[f32; 4]>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "pixel data does not match {width}x{height}",
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Builds a buffer from top-down 8-bit RGBA rows.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), width as usize * height as usize * 4);
        let data = bytes
            .chunks_exact(4)
            .map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Rebuilds a top-down buffer from texels in RDP scan order (bottom row
    /// first). Inverse of collecting [`PixelBuf::n64_scan`].
    pub fn from_n64_scan(width: u32, height: u32, texels: Vec<[f32; 4]>) -> Self {
        assert_eq!(texels.len(), width as usize * height as usize);
        let w = width as usize;
        let mut data = vec![[0.0; 4]; texels.len()];
        for (i, texel) in texels.into_iter().enumerate() {
            let x = i % w;
            let y = height as usize - 1 - i / w;
            data[y * w + x] = texel;
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn solid(width: u32, height: u32, rgba: [f32; 4]) -> Self {
        Self {
            width,
            height,
            data: vec![rgba; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel_count(&self) -> usize {
        self.data.len()
    }

    /// Texel at (x, y) with y measured top-down.
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        assert!(x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Texels in RDP scan order: bottom row first, left to right within each
    /// row.
    pub fn n64_scan(&self) -> impl Iterator<Item = [f32; 4]> + '_ {
        self.data
            .chunks_exact(self.width as usize)
            .rev()
            .flatten()
            .copied()
    }
}
