//! Large-texture tiling: when a texture's TMEM footprint exceeds the
//! hardware budget, each draw call only loads the texel rectangle its
//! triangle actually touches, and triangles are greedily grouped into the
//! fewest loads that each still fit.
//!
//! The grouping is first-fit in face order with no backtracking: once a face
//! joins a load it never moves, and a successful merge permanently grows
//! that load. Keep it that way; output determinism depends on it.

use f3d::display_list::{Command, DisplayList, TileRect};
use f3d::dp::{TexelSize, LOAD_TILE};
use n64_texture_format::TextureFormat;

use crate::error::PackError;
use crate::tex_loader::{DlState, TexLayout};
use crate::tmem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LargeEdges {
    Clamp,
    Wrap,
}

#[derive(Clone, Copy, Debug)]
pub struct TilerOptions {
    pub edges: LargeEdges,
    /// Point sampling covers one fewer texel than bilinear filtering.
    pub point_sampled: bool,
}

/// Inclusive per-face texel bounds before normalization. May extend past the
/// image on any side (wrapping UVs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBounds {
    pub sl: i32,
    pub sh: i32,
    pub tl: i32,
    pub th: i32,
}

impl FaceBounds {
    fn union(self, other: Self) -> Self {
        Self {
            sl: self.sl.min(other.sl),
            sh: self.sh.max(other.sh),
            tl: self.tl.min(other.tl),
            th: self.th.max(other.th),
        }
    }
}

/// A normalized inclusive load rectangle plus the per-axis offsets that were
/// subtracted to bring its start into `[0, dimension)`. Draw-time UVs must
/// undo the offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRegion {
    pub sl: i32,
    pub sh: i32,
    pub tl: i32,
    pub th: i32,
    pub s_offset: i32,
    pub t_offset: i32,
}

impl TileRegion {
    pub fn width(&self) -> u32 {
        (self.sh - self.sl + 1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.th - self.tl + 1) as u32
    }

    pub fn wraps_s(&self, image_width: u32) -> bool {
        self.sh >= image_width as i32
    }

    pub fn wraps_t(&self, image_height: u32) -> bool {
        self.th >= image_height as i32
    }
}

/// One planned TMEM load and the faces that draw from it.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingLoad {
    /// Union of the raw face bounds, kept for further merges.
    raw: FaceBounds,
    pub region: TileRegion,
    pub faces: Vec<usize>,
}

/// The texel rectangle a face's pixel-space UVs touch.
pub fn face_bounds(
    uvs: &[[f32; 2]],
    format: TextureFormat,
    width: u32,
    height: u32,
    opts: &TilerOptions,
) -> FaceBounds {
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for uv in uvs {
        for axis in 0..2 {
            min[axis] = min[axis].min(uv[axis]);
            max[axis] = max[axis].max(uv[axis]);
        }
    }

    let cover = if opts.point_sampled { 0 } else { 1 };
    let mut sl = min[0].floor() as i32;
    let mut sh = max[0].ceil() as i32 - 1 + cover;
    let mut tl = min[1].floor() as i32;
    let mut th = max[1].ceil() as i32 - 1 + cover;

    if opts.edges == LargeEdges::Clamp {
        sl = sl.clamp(0, width as i32 - 1);
        sh = sh.clamp(0, width as i32 - 1);
        tl = tl.clamp(0, height as i32 - 1);
        th = th.clamp(0, height as i32 - 1);
    }
    sh = sh.max(sl);
    th = th.max(tl);

    // 4-bit loads move texel pairs: S must start even and end odd.
    if format.is_4_bit() {
        sl &= !1;
        sh |= 1;
    }

    FaceBounds { sl, sh, tl, th }
}

/// Normalizes raw bounds into the RDP's tile coordinate range, recording the
/// subtracted wrap offsets and enforcing the hardware's split alignment for
/// regions that straddle an image edge.
pub fn fix_region(
    image: &str,
    raw: FaceBounds,
    format: TextureFormat,
    width: u32,
    height: u32,
) -> Result<TileRegion, PackError> {
    let w = width as i32;
    let h = height as i32;
    let s_offset = raw.sl.div_euclid(w) * w;
    let t_offset = raw.tl.div_euclid(h) * h;
    let mut sl = raw.sl - s_offset;
    let sh = raw.sh - s_offset;
    let mut tl = raw.tl - t_offset;
    let th = raw.th - t_offset;

    if sh >= 1024 {
        return Err(PackError::RegionUnrepresentable {
            image: image.to_owned(),
            axis: "S",
            lo: sl,
            hi: sh,
            width,
            height,
        });
    }
    if th >= 1024 {
        return Err(PackError::RegionUnrepresentable {
            image: image.to_owned(),
            axis: "T",
            lo: tl,
            hi: th,
            width,
            height,
        });
    }

    let wraps_s = sh >= w;
    let wraps_t = th >= h;
    if wraps_s && wraps_t {
        // A load splits along one axis at most.
        return Err(PackError::RegionUnrepresentable {
            image: image.to_owned(),
            axis: "both S and T",
            lo: sl,
            hi: sh,
            width,
            height,
        });
    }

    if wraps_s {
        // The split at the right edge must land on a whole TMEM word,
        // measured from that edge; widen the region leftward until it does.
        let tpw = format.texels_per_word() as i32;
        let over = (w - sl).rem_euclid(tpw);
        if over != 0 {
            sl -= tpw - over;
        }
        if sl < 0 {
            return Err(PackError::WrapTooNarrow {
                image: image.to_owned(),
                axis: "S",
                alignment: tpw as u32,
                dim: width,
            });
        }
    }
    if wraps_t {
        // TMEM bank interleaving: the split must land on an even row.
        if (h - tl) % 2 != 0 {
            tl -= 1;
        }
        if tl < 0 {
            return Err(PackError::WrapTooNarrow {
                image: image.to_owned(),
                axis: "T",
                alignment: 2,
                dim: height,
            });
        }
    }

    Ok(TileRegion {
        sl,
        sh,
        tl,
        th,
        s_offset,
        t_offset,
    })
}

pub fn region_fits(format: TextureFormat, region: &TileRegion) -> bool {
    tmem::tmem_word_usage(format, region.width(), region.height())
        <= tmem::tmem_budget_words(format)
}

/// Merges `face` into the first pending load whose grown region still fits,
/// or opens a new load seeded by the face alone.
pub fn assign_face(
    image: &str,
    loads: &mut Vec<PendingLoad>,
    face: usize,
    bounds: FaceBounds,
    format: TextureFormat,
    width: u32,
    height: u32,
) -> Result<(), PackError> {
    for load in loads.iter_mut() {
        let union = load.raw.union(bounds);
        if let Ok(region) = fix_region(image, union, format, width, height) {
            if region_fits(format, &region) {
                load.raw = union;
                load.region = region;
                load.faces.push(face);
                return Ok(());
            }
        }
    }

    // The face starts its own load; here a failure is terminal.
    let region = fix_region(image, bounds, format, width, height)?;
    if !region_fits(format, &region) {
        return Err(PackError::TileTooLarge {
            image: image.to_owned(),
            sl: region.sl,
            sh: region.sh,
            tl: region.tl,
            th: region.th,
            words: tmem::tmem_word_usage(format, region.width(), region.height()),
            budget: tmem::tmem_budget_words(format),
        });
    }
    loads.push(PendingLoad {
        raw: bounds,
        region,
        faces: vec![face],
    });
    Ok(())
}

/// Plans the loads for one mesh's faces, in face order.
pub fn plan_loads(
    image: &str,
    faces: &[Vec<[f32; 2]>],
    format: TextureFormat,
    width: u32,
    height: u32,
    opts: &TilerOptions,
) -> Result<Vec<PendingLoad>, PackError> {
    let mut loads = Vec::new();
    for (face, uvs) in faces.iter().enumerate() {
        let bounds = face_bounds(uvs, format, width, height, opts);
        assign_face(image, &mut loads, face, bounds, format, width, height)?;
    }
    Ok(loads)
}

/// 10.2 rectangle of a normalized region.
pub fn region_rect(region: &TileRegion) -> TileRect {
    TileRect {
        uls: ((region.sl as u32) << 2) as u16,
        ult: ((region.tl as u32) << 2) as u16,
        lrs: ((region.sh as u32) << 2) as u16,
        lrt: ((region.th as u32) << 2) as u16,
    }
}

/// Emits one planned load: load-tile setup, one LoadTile per side of the
/// wrap (if any), and the render tile configured over the region.
pub fn emit_load(
    dl: &mut DisplayList,
    state: &mut DlState,
    render_tile: u8,
    layout: &TexLayout,
    load: &PendingLoad,
) {
    let format = layout.format;
    let region = &load.region;
    let w = layout.width as i32;
    let h = layout.height as i32;

    let (size, sdiv) = if format.is_4_bit() {
        (TexelSize::Bits8, 2)
    } else {
        (tmem::rdp_size(format), 1)
    };
    let load_image_width = if format.is_4_bit() {
        layout.width.div_ceil(2)
    } else {
        layout.width
    };
    let load_line = tmem::tile_load_line_words(format, region.width()) as u16;

    state.set_texture_image(
        dl,
        tmem::rdp_format(format),
        size,
        load_image_width as u16,
        layout.image,
    );

    // (sl, sh, tl, th, TMEM word offset) per side of the wrap.
    let mut chunks: Vec<(i32, i32, i32, i32, u32)> = Vec::new();
    if region.wraps_s(layout.width) {
        let first_words = (w - region.sl) as u32 / format.texels_per_word();
        chunks.push((region.sl, w - 1, region.tl, region.th, 0));
        chunks.push((0, region.sh - w, region.tl, region.th, first_words));
    } else if region.wraps_t(layout.height) {
        let first_rows = (h - region.tl) as u32;
        chunks.push((region.sl, region.sh, region.tl, h - 1, 0));
        chunks.push((
            region.sl,
            region.sh,
            0,
            region.th - h,
            first_rows * load_line as u32,
        ));
    } else {
        chunks.push((region.sl, region.sh, region.tl, region.th, 0));
    }

    for (sl, sh, tl, th, word_offset) in chunks {
        let mut params = layout.load_params(size, load_line);
        params.tmem += word_offset as u16;
        state.set_tile(dl, LOAD_TILE, params);
        dl.commands.push(Command::LoadSync);
        dl.commands.push(Command::LoadTile {
            tile: LOAD_TILE,
            rect: TileRect {
                uls: ((sl / sdiv) << 2) as u16,
                ult: (tl << 2) as u16,
                lrs: ((sh / sdiv) << 2) as u16,
                lrt: (th << 2) as u16,
            },
        });
    }
    dl.commands.push(Command::PipeSync);

    let mut render = layout.render_params();
    render.line = tmem::tile_line_words(format, region.width()) as u16;
    state.set_tile(dl, render_tile, render);
    dl.commands.push(Command::SetTileSize {
        tile: render_tile,
        rect: region_rect(region),
    });
}
