//! Derived images: box-filtered mip chains and the intensity-high-quality
//! (IHQ) split that approximates high color depth with a low-resolution
//! RGBA16 base plus a full-resolution intensity adjustment layer.

use n64_texture_format::{PixelBuf, TextureFormat};
use ordered_float::NotNan;

use crate::tmem;

/// Box filter by integer factors; samples past the edge repeat the edge
/// texel, so dimensions need not divide evenly.
pub fn box_downsample(pixels: &PixelBuf, fx: u32, fy: u32) -> PixelBuf {
    let out_w = pixels.width().div_ceil(fx).max(1);
    let out_h = pixels.height().div_ceil(fy).max(1);
    let mut data = Vec::with_capacity((out_w * out_h) as usize);
    for oy in 0..out_h {
        for ox in 0..out_w {
            let mut sum = [0.0f32; 4];
            for dy in 0..fy {
                for dx in 0..fx {
                    let x = (ox * fx + dx).min(pixels.width() - 1);
                    let y = (oy * fy + dy).min(pixels.height() - 1);
                    let texel = pixels.get(x, y);
                    for (acc, channel) in sum.iter_mut().zip(texel) {
                        *acc += channel;
                    }
                }
            }
            let samples = (fx * fy) as f32;
            data.push(sum.map(|total| total / samples));
        }
    }
    PixelBuf::new(out_w, out_h, data)
}

/// Bilinear resample to `out_w` x `out_h`, matching the filtering the RDP
/// applies when a low-resolution base tile is stretched at draw time.
pub fn bilinear_upsample(pixels: &PixelBuf, out_w: u32, out_h: u32) -> PixelBuf {
    let src_w = pixels.width();
    let src_h = pixels.height();
    let mut data = Vec::with_capacity((out_w * out_h) as usize);
    for oy in 0..out_h {
        for ox in 0..out_w {
            let sx = ((ox as f32 + 0.5) * src_w as f32 / out_w as f32 - 0.5).max(0.0);
            let sy = ((oy as f32 + 0.5) * src_h as f32 / out_h as f32 - 0.5).max(0.0);
            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let x1 = (x0 + 1).min(src_w - 1);
            let y1 = (y0 + 1).min(src_h - 1);
            let tx = sx - x0 as f32;
            let ty = sy - y0 as f32;

            let mut texel = [0.0f32; 4];
            for c in 0..4 {
                let top = pixels.get(x0, y0)[c] * (1.0 - tx) + pixels.get(x1, y0)[c] * tx;
                let bottom = pixels.get(x0, y1)[c] * (1.0 - tx) + pixels.get(x1, y1)[c] * tx;
                texel[c] = top * (1.0 - ty) + bottom * ty;
            }
            data.push(texel);
        }
    }
    PixelBuf::new(out_w, out_h, data)
}

/// Successive 2x2-filtered halvings of `pixels`, excluding the base level.
/// Stops when a dimension would drop below 4 texels or when the base plus
/// all levels would overrun the format's TMEM budget.
pub fn mip_chain(pixels: &PixelBuf, format: TextureFormat) -> Vec<PixelBuf> {
    let budget = tmem::tmem_budget_words(format);
    let mut used = tmem::tmem_word_usage(format, pixels.width(), pixels.height());
    let mut levels = Vec::new();
    let mut current = pixels.clone();
    loop {
        let w = current.width() / 2;
        let h = current.height() / 2;
        if w < 4 || h < 4 {
            break;
        }
        let usage = tmem::tmem_word_usage(format, w, h);
        if used + usage > budget {
            break;
        }
        let level = box_downsample(&current, 2, 2);
        used += usage;
        levels.push(level.clone());
        current = level;
    }
    levels
}

/// BT.601.
fn yuv(rgb: [f32; 3]) -> [f32; 3] {
    let y = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
    [y, 0.492 * (rgb[2] - y), 0.877 * (rgb[0] - y)]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[derive(Clone, Copy, Debug)]
pub struct IhqCandidate {
    pub blend: f32,
    pub error: f32,
}

/// For one candidate blend strength, the least-squares intensity for one
/// texel: how far along the white-point direction to push the faded base
/// color so it lands nearest the target, in YUV space.
fn best_intensity(target: [f32; 3], base: [f32; 3], blend: f32) -> f32 {
    let white = yuv([blend, blend, blend]);
    let norm = dot(white, white);
    let faded = base.map(|c| c * (1.0 - blend));
    let residual = [
        target[0] - faded[0],
        target[1] - faded[1],
        target[2] - faded[2],
    ];
    (dot(residual, white) / norm).clamp(0.0, 1.0)
}

fn texel_yuv(texel: [f32; 4]) -> [f32; 3] {
    yuv([texel[0], texel[1], texel[2]])
}

/// Total squared YUV error of the reconstruction at one blend strength.
pub fn sweep_blend_errors(target: &PixelBuf, upsampled_base: &PixelBuf) -> Vec<IhqCandidate> {
    (1..=10)
        .map(|step| {
            let blend = step as f32 * 0.05;
            let white = yuv([blend, blend, blend]);
            let mut error = 0.0;
            for y in 0..target.height() {
                for x in 0..target.width() {
                    let t = texel_yuv(target.get(x, y));
                    let b = texel_yuv(upsampled_base.get(x, y));
                    let i = best_intensity(t, b, blend);
                    for c in 0..3 {
                        let recon = b[c] * (1.0 - blend) + white[c] * i;
                        error += (t[c] - recon) * (t[c] - recon);
                    }
                }
            }
            IhqCandidate { blend, error }
        })
        .collect()
}

fn intensity_plane(target: &PixelBuf, upsampled_base: &PixelBuf, blend: f32) -> PixelBuf {
    let mut data = Vec::with_capacity(target.texel_count());
    for y in 0..target.height() {
        for x in 0..target.width() {
            let t = texel_yuv(target.get(x, y));
            let b = texel_yuv(upsampled_base.get(x, y));
            let i = best_intensity(t, b, blend);
            data.push([i, i, i, 1.0]);
        }
    }
    PixelBuf::new(target.width(), target.height(), data)
}

pub struct IhqSplit {
    /// Low-resolution color base, destined for RGBA16.
    pub base: PixelBuf,
    /// Full-resolution intensity adjustment layer, destined for I8.
    pub intensity: PixelBuf,
    /// The winning blend strength.
    pub blend: f32,
}

/// Decomposes an image into a box-downsampled color base plus an intensity
/// layer, sweeping candidate blend strengths and keeping the one with least
/// total squared YUV error. The 4x reduction goes on the axis divisible by
/// four.
pub fn ihq_split(pixels: &PixelBuf) -> IhqSplit {
    let (fx, fy) = if pixels.width() % 4 == 0 { (4, 2) } else { (2, 4) };
    let base = box_downsample(pixels, fx, fy);
    let upsampled = bilinear_upsample(&base, pixels.width(), pixels.height());

    let candidates = sweep_blend_errors(pixels, &upsampled);
    let best = candidates
        .iter()
        .min_by_key(|c| NotNan::new(c.error).unwrap())
        .unwrap();

    IhqSplit {
        intensity: intensity_plane(pixels, &upsampled, best.blend),
        base,
        blend: best.blend,
    }
}

#[cfg(test)]
mod tests {
    use n64_texture_format::{PixelBuf, TextureFormat};

    use super::*;

    #[test]
    fn box_filter_averages() {
        let buf = PixelBuf::new(
            2,
            2,
            vec![[0.0; 4], [1.0; 4], [0.0; 4], [1.0; 4]],
        );
        let down = box_downsample(&buf, 2, 2);
        assert_eq!(down.width(), 1);
        assert_eq!(down.get(0, 0), [0.5; 4]);
    }

    #[test]
    fn box_filter_repeats_edges() {
        let buf = PixelBuf::new(3, 1, vec![[0.0; 4], [0.0; 4], [1.0; 4]]);
        let down = box_downsample(&buf, 2, 1);
        assert_eq!(down.width(), 2);
        assert_eq!(down.get(0, 0), [0.0; 4]);
        // The second sample pairs the edge texel with itself.
        assert_eq!(down.get(1, 0), [1.0; 4]);
    }

    #[test]
    fn bilinear_upsample_preserves_constants() {
        let buf = PixelBuf::solid(2, 2, [0.25, 0.5, 0.75, 1.0]);
        let up = bilinear_upsample(&buf, 8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let texel = up.get(x, y);
                for (a, b) in texel.iter().zip([0.25, 0.5, 0.75, 1.0]) {
                    assert!((a - b).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn mip_chain_stops_below_four_texels() {
        let buf = PixelBuf::solid(16, 16, [0.5; 4]);
        let levels = mip_chain(&buf, TextureFormat::Rgba16);
        let dims: Vec<_> = levels.iter().map(|l| (l.width(), l.height())).collect();
        assert_eq!(dims, [(8, 8), (4, 4)]);
    }

    #[test]
    fn mip_chain_respects_tmem_budget() {
        // 64x32 RGBA16 fills all 512 words by itself; no level fits after.
        let full = PixelBuf::solid(64, 32, [0.5; 4]);
        assert!(mip_chain(&full, TextureFormat::Rgba16).is_empty());

        // 32x32 leaves room for the whole chain down to 4x4.
        let half = PixelBuf::solid(32, 32, [0.5; 4]);
        let levels = mip_chain(&half, TextureFormat::Rgba16);
        let mut words = crate::tmem::tmem_word_usage(TextureFormat::Rgba16, 32, 32);
        for level in &levels {
            words +=
                crate::tmem::tmem_word_usage(TextureFormat::Rgba16, level.width(), level.height());
        }
        assert!(words <= crate::tmem::TMEM_WORDS);
        assert_eq!(levels.len(), 3);
    }

    #[test]
    fn ihq_picks_the_least_error_candidate() {
        let data = (0..256)
            .map(|i| {
                let v = i as f32 / 255.0;
                [v, 1.0 - v, (i % 16) as f32 / 15.0, 1.0]
            })
            .collect();
        let buf = PixelBuf::new(16, 16, data);
        let (fx, fy) = (4, 2);
        let base = box_downsample(&buf, fx, fy);
        let up = bilinear_upsample(&base, 16, 16);
        let candidates = sweep_blend_errors(&buf, &up);
        assert_eq!(candidates.len(), 10);

        let split = ihq_split(&buf);
        let chosen = candidates
            .iter()
            .find(|c| (c.blend - split.blend).abs() < 1e-6)
            .unwrap();
        for candidate in &candidates {
            assert!(chosen.error <= candidate.error + 1e-6);
        }

        // The running best never worsens as the sweep proceeds.
        let mut best_so_far = f32::INFINITY;
        for candidate in &candidates {
            let next = best_so_far.min(candidate.error);
            assert!(next <= best_so_far);
            best_so_far = next;
        }
    }

    #[test]
    fn ihq_base_reduction_follows_divisibility() {
        let wide = PixelBuf::solid(16, 8, [0.5; 4]);
        let split = ihq_split(&wide);
        assert_eq!((split.base.width(), split.base.height()), (4, 4));

        let narrow = PixelBuf::solid(6, 8, [0.5; 4]);
        let split = ihq_split(&narrow);
        assert_eq!((split.base.width(), split.base.height()), (3, 2));
    }
}
