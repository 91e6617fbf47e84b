//! Per-material coordination: resolves texture slots (multitexture, mip
//! chains, the IHQ split), assigns TMEM addresses, and drives the load
//! emitters in slot order.
//!
//! Tile emission and TMEM addressing both run in descending slot order
//! (tile 1 before tile 0); later tiles may legally alias earlier ones, so
//! the order is part of the output contract.

use f3d::display_list::{Command, DisplayList, Reference};
use f3d::dp::ClampMirror;
use n64_texture_format::{
    encode, extract_palette, merge_palettes, to_index_buffer, Palette, PaletteFormat, PixelBuf,
    TextureFormat,
};

use crate::error::PackError;
use crate::large_texture::{self, LargeEdges, PendingLoad, TilerOptions};
use crate::mipmap;
use crate::tex_loader::{self, DlState, TexLayout};
use crate::texture_key::{TextureIdAllocator, TextureKey};
use crate::tmem;

/// Passed through to the (out-of-scope) CI quantizer; nothing here reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dithering {
    None,
    Ordered,
    Floyd,
}

#[derive(Clone, Copy, Debug)]
pub struct AxisParams {
    pub clamp: bool,
    pub mirror: bool,
    pub mask: u8,
    pub shift: u8,
}

impl AxisParams {
    /// Wrapping over a power-of-two dimension.
    pub fn wrap(dimension: u32) -> Self {
        Self {
            clamp: false,
            mirror: false,
            mask: log2(dimension),
            shift: 0,
        }
    }

    pub fn clamp(dimension: u32) -> Self {
        Self {
            clamp: true,
            mirror: false,
            mask: log2(dimension),
            shift: 0,
        }
    }

    pub fn clamp_mirror(&self) -> ClampMirror {
        match (self.clamp, self.mirror) {
            (false, false) => ClampMirror::Wrap,
            (false, true) => ClampMirror::Mirror,
            (true, false) => ClampMirror::Clamp,
            (true, true) => ClampMirror::MirrorClamp,
        }
    }
}

fn log2(dimension: u32) -> u8 {
    if dimension.is_power_of_two() {
        dimension.trailing_zeros() as u8
    } else {
        0
    }
}

/// One texture slot as the material layer hands it over.
#[derive(Clone, Debug)]
pub struct TextureProps {
    pub name: String,
    pub pixels: PixelBuf,
    pub format: TextureFormat,
    pub palette_format: PaletteFormat,
    pub s: AxisParams,
    pub t: AxisParams,
}

#[derive(Clone, Copy, Debug)]
pub struct MaterialOptions {
    pub dithering: Dithering,
    pub large_edges: LargeEdges,
    pub point_sampled: bool,
    pub mipmaps: bool,
    pub intensity_hq: bool,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            dithering: Dithering::None,
            large_edges: LargeEdges::Clamp,
            point_sampled: false,
            mipmaps: false,
            intensity_hq: false,
        }
    }
}

/// A payload newly packed by this material (already-seen ids are not
/// re-emitted).
#[derive(Clone, Debug)]
pub struct PackedTexture {
    pub id: u16,
    pub symbol: String,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct PackedTlut {
    pub id: u16,
    pub symbol: String,
    pub count: u16,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct PackedMaterial {
    pub name: String,
    pub display_list: DisplayList,
    pub textures: Vec<PackedTexture>,
    pub tluts: Vec<PackedTlut>,
    pub dithering: Dithering,
    pub ihq_blend: Option<f32>,
    pub large_loads: Vec<PendingLoad>,
}

struct Slot {
    props: TextureProps,
    tmem: u16,
    palette: u8,
    tlut: Option<Palette>,
}

fn layout_for(slot: &Slot, image: Reference) -> TexLayout {
    TexLayout {
        format: slot.props.format,
        width: slot.props.pixels.width(),
        height: slot.props.pixels.height(),
        tmem: slot.tmem,
        palette: slot.palette,
        image,
        clamp_mirror_s: slot.props.s.clamp_mirror(),
        mask_s: slot.props.s.mask,
        shift_s: slot.props.s.shift,
        clamp_mirror_t: slot.props.t.clamp_mirror(),
        mask_t: slot.props.t.mask,
        shift_t: slot.props.t.shift,
    }
}

/// Packs one slot's payload, deduplicating against `ids`. Returns the
/// texture reference and, for first encounters, the payload itself.
fn pack_payload(
    slot: &Slot,
    ids: &mut TextureIdAllocator,
) -> Result<(u16, Option<PackedTexture>), PackError> {
    let props = &slot.props;
    let mut key = TextureKey::for_pixels(&props.pixels, props.format);
    let data = match &slot.tlut {
        Some(palette) => {
            key = key.with_palette(palette.colors());
            to_index_buffer(&props.name, &props.pixels, palette, props.format)?
        }
        None => encode(&props.pixels, props.format)?,
    };
    let (id, is_new) = ids.get(&key);
    let packed = is_new.then(|| PackedTexture {
        id,
        symbol: symbol(&props.name),
        format: props.format,
        width: props.pixels.width(),
        height: props.pixels.height(),
        data,
    });
    Ok((id, packed))
}

/// C-safe symbol from a texture name.
pub fn symbol(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Resolves, addresses, and emits a 1- or 2-slot material.
pub fn pack_material(
    name: &str,
    textures: &[TextureProps],
    opts: &MaterialOptions,
    ids: &mut TextureIdAllocator,
) -> Result<PackedMaterial, PackError> {
    assert!(
        (1..=2).contains(&textures.len()),
        "a material resolves one or two texture slots",
    );

    let mut ihq_blend = None;
    let mut props: Vec<TextureProps> = textures.to_vec();
    if opts.intensity_hq && textures.len() == 1 {
        let (base, intensity, blend) = ihq_slots(&textures[0]);
        ihq_blend = Some(blend);
        props = vec![base, intensity];
    }

    // Mip levels only attach to a single-texture material. Box-filtered
    // levels of a color-indexed texture would need colors outside its
    // palette, so CI formats never mip.
    let mip_levels = if opts.mipmaps && props.len() == 1 && !props[0].format.is_color_indexed() {
        mipmap::mip_chain(&props[0].pixels, props[0].format)
    } else {
        Vec::new()
    };

    // TMEM addresses, descending by slot index.
    let any_ci = props.iter().any(|p| p.format.is_color_indexed());
    let budget = if any_ci {
        tmem::TLUT_BASE_WORD
    } else {
        tmem::TMEM_WORDS
    };
    let mut cursor: u32 = 0;
    let mut slots: Vec<Slot> = Vec::with_capacity(props.len());
    for slot_props in props.iter().rev() {
        let words = tmem::tmem_word_usage(
            slot_props.format,
            slot_props.pixels.width(),
            slot_props.pixels.height(),
        );
        slots.push(Slot {
            props: slot_props.clone(),
            tmem: cursor as u16,
            palette: 0,
            tlut: None,
        });
        cursor += words;
    }
    for level in &mip_levels {
        cursor += tmem::tmem_word_usage(props[0].format, level.width(), level.height());
    }
    if cursor > budget {
        return Err(PackError::TmemBudgetExceeded {
            image: name.to_owned(),
            words: cursor,
            budget,
        });
    }
    slots.reverse(); // back to ascending slot index for bookkeeping

    // Color tables. Two CI8 slots share the one 256-entry table; CI4 slots
    // take their own 16-word palette slot each.
    let ci_count = slots
        .iter()
        .filter(|s| s.props.format.is_color_indexed())
        .count();
    let merged_ci8 =
        ci_count == 2 && slots.iter().all(|s| s.props.format == TextureFormat::Ci8);
    if merged_ci8 {
        let a = extract_palette(&slots[0].props.pixels, slots[0].props.palette_format);
        let b = extract_palette(&slots[1].props.pixels, slots[1].props.palette_format);
        let merged = merge_palettes(&a, &b);
        for slot in &mut slots {
            slot.tlut = Some(merged.clone());
        }
    } else {
        for (index, slot) in slots.iter_mut().enumerate() {
            if slot.props.format.is_color_indexed() {
                slot.tlut = Some(extract_palette(
                    &slot.props.pixels,
                    slot.props.palette_format,
                ));
                if slot.props.format == TextureFormat::Ci4 {
                    slot.palette = index as u8;
                }
            }
        }
    }

    let mut packed = PackedMaterial {
        name: name.to_owned(),
        display_list: DisplayList::new(),
        textures: Vec::new(),
        tluts: Vec::new(),
        dithering: opts.dithering,
        ihq_blend,
        large_loads: Vec::new(),
    };
    let mut state = DlState::new();
    let mut emitted_merged_tlut = false;

    for (index, slot) in slots.iter().enumerate().rev() {
        let (id, payload) = pack_payload(slot, ids)?;
        let is_new = payload.is_some();
        if let Some(payload) = payload {
            log::debug!(
                "{name}: packed {} as {} ({} bytes)",
                slot.props.name,
                slot.props.format,
                payload.data.len(),
            );
            packed.textures.push(payload);
        }

        if let Some(palette) = &slot.tlut {
            if !(merged_ci8 && emitted_merged_tlut) {
                let base_word = tmem::TLUT_BASE_WORD + slot.palette as u32 * tmem::TLUT_SLOT_WORDS;
                tex_loader::emit_tlut_load(
                    &mut packed.display_list,
                    &mut state,
                    Reference::Tlut(id),
                    base_word as u16,
                    palette.len() as u16,
                );
                if is_new {
                    packed.tluts.push(PackedTlut {
                        id,
                        symbol: format!("{}_tlut", symbol(&slot.props.name)),
                        count: palette.len() as u16,
                        data: palette.tlut_bytes(),
                    });
                }
                if merged_ci8 {
                    emitted_merged_tlut = true;
                }
            }
        }

        let layout = layout_for(slot, Reference::Texture(id));
        tex_loader::emit_texture_load(&mut packed.display_list, &mut state, &layout);
        tex_loader::emit_render_tile(
            &mut packed.display_list,
            &mut state,
            index as u8,
            &layout,
            tex_loader::full_image_rect(layout.width, layout.height),
        );
    }

    // Mip levels go on ascending tiles after the base, one shift step per
    // level.
    if !mip_levels.is_empty() {
        let base = &slots[0];
        let mut level_tmem = (0..slots.len()).fold(0u32, |acc, i| {
            acc + tmem::tmem_word_usage(
                slots[i].props.format,
                slots[i].props.pixels.width(),
                slots[i].props.pixels.height(),
            )
        });
        for (level_index, level) in mip_levels.iter().enumerate() {
            let level_props = TextureProps {
                name: format!("{}_mip{}", base.props.name, level_index + 1),
                pixels: level.clone(),
                format: base.props.format,
                palette_format: base.props.palette_format,
                s: AxisParams {
                    mask: base.props.s.mask.saturating_sub(level_index as u8 + 1),
                    shift: base.props.s.shift + level_index as u8 + 1,
                    ..base.props.s
                },
                t: AxisParams {
                    mask: base.props.t.mask.saturating_sub(level_index as u8 + 1),
                    shift: base.props.t.shift + level_index as u8 + 1,
                    ..base.props.t
                },
            };
            let level_slot = Slot {
                props: level_props,
                tmem: level_tmem as u16,
                palette: base.palette,
                tlut: base.tlut.clone(),
            };
            let (id, payload) = pack_payload(&level_slot, ids)?;
            if let Some(payload) = payload {
                packed.textures.push(payload);
            }
            let layout = layout_for(&level_slot, Reference::Texture(id));
            tex_loader::emit_texture_load(&mut packed.display_list, &mut state, &layout);
            tex_loader::emit_render_tile(
                &mut packed.display_list,
                &mut state,
                level_index as u8 + 1,
                &layout,
                tex_loader::full_image_rect(layout.width, layout.height),
            );
            level_tmem += tmem::tmem_word_usage(layout.format, layout.width, layout.height);
        }
    }

    packed.display_list.commands.push(Command::EndDisplayList);
    Ok(packed)
}

/// Splits one source into the IHQ base + intensity pair of slots.
fn ihq_slots(source: &TextureProps) -> (TextureProps, TextureProps, f32) {
    let split = mipmap::ihq_split(&source.pixels);
    let fx = source.pixels.width() / split.base.width();
    let fy = source.pixels.height() / split.base.height();
    let base = TextureProps {
        name: format!("{}_base", source.name),
        format: TextureFormat::Rgba16,
        palette_format: source.palette_format,
        s: AxisParams {
            mask: log2(split.base.width()),
            shift: source.s.shift + log2_factor(fx),
            ..source.s
        },
        t: AxisParams {
            mask: log2(split.base.height()),
            shift: source.t.shift + log2_factor(fy),
            ..source.t
        },
        pixels: split.base,
    };
    let intensity = TextureProps {
        name: format!("{}_ihq", source.name),
        format: TextureFormat::I8,
        palette_format: source.palette_format,
        s: source.s,
        t: source.t,
        pixels: split.intensity,
    };
    (base, intensity, split.blend)
}

fn log2_factor(factor: u32) -> u8 {
    match factor {
        4 => 2,
        2 => 1,
        _ => 0,
    }
}

/// Packs a material whose single texture exceeds TMEM: the payload packs
/// whole, and the display list carries one load per greedy face group.
pub fn pack_large_material(
    name: &str,
    texture: &TextureProps,
    faces: &[Vec<[f32; 2]>],
    opts: &MaterialOptions,
    ids: &mut TextureIdAllocator,
) -> Result<PackedMaterial, PackError> {
    let tiler = TilerOptions {
        edges: opts.large_edges,
        point_sampled: opts.point_sampled,
    };
    let loads = large_texture::plan_loads(
        &texture.name,
        faces,
        texture.format,
        texture.pixels.width(),
        texture.pixels.height(),
        &tiler,
    )?;
    log::info!(
        "{name}: {} faces grouped into {} TMEM loads",
        faces.len(),
        loads.len(),
    );

    let slot = Slot {
        props: texture.clone(),
        tmem: 0,
        palette: 0,
        tlut: texture
            .format
            .is_color_indexed()
            .then(|| extract_palette(&texture.pixels, texture.palette_format)),
    };
    let (id, payload) = pack_payload(&slot, ids)?;

    let mut packed = PackedMaterial {
        name: name.to_owned(),
        display_list: DisplayList::new(),
        textures: payload.into_iter().collect(),
        tluts: Vec::new(),
        dithering: opts.dithering,
        ihq_blend: None,
        large_loads: Vec::new(),
    };
    let mut state = DlState::new();

    if let Some(palette) = &slot.tlut {
        tex_loader::emit_tlut_load(
            &mut packed.display_list,
            &mut state,
            Reference::Tlut(id),
            tmem::TLUT_BASE_WORD as u16,
            palette.len() as u16,
        );
        if !packed.textures.is_empty() {
            packed.tluts.push(PackedTlut {
                id,
                symbol: format!("{}_tlut", symbol(&texture.name)),
                count: palette.len() as u16,
                data: palette.tlut_bytes(),
            });
        }
    }

    let layout = layout_for(&slot, Reference::Texture(id));
    for load in &loads {
        large_texture::emit_load(
            &mut packed.display_list,
            &mut state,
            f3d::dp::RENDER_TILE,
            &layout,
            load,
        );
    }
    packed.display_list.commands.push(Command::EndDisplayList);
    packed.large_loads = loads;
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use f3d::display_list::{Command, Reference};
    use n64_texture_format::{PaletteFormat, PixelBuf, TextureFormat};

    use crate::texture_key::TextureIdAllocator;

    use super::*;

    fn props(name: &str, format: TextureFormat, width: u32, height: u32) -> TextureProps {
        TextureProps {
            name: name.to_owned(),
            pixels: PixelBuf::solid(width, height, [1.0, 0.0, 0.0, 1.0]),
            format,
            palette_format: PaletteFormat::Rgba16,
            s: AxisParams::wrap(width),
            t: AxisParams::wrap(height),
        }
    }

    #[test]
    fn single_texture_material() {
        let mut ids = TextureIdAllocator::new();
        let packed = pack_material(
            "mat",
            &[props("red", TextureFormat::Rgba16, 32, 32)],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap();
        assert_eq!(packed.textures.len(), 1);
        assert_eq!(packed.textures[0].data.len(), 2048);
        assert!(packed
            .display_list
            .commands
            .iter()
            .any(|c| matches!(c, Command::LoadBlock { .. })));
        assert!(matches!(
            packed.display_list.commands.last(),
            Some(Command::EndDisplayList)
        ));
    }

    #[test]
    fn multitexture_addresses_descend_by_slot() {
        let mut ids = TextureIdAllocator::new();
        let packed = pack_material(
            "mat",
            &[
                props("a", TextureFormat::Rgba16, 32, 32),
                props("b", TextureFormat::I8, 32, 32),
            ],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap();

        // Slot 1 loads first, at TMEM 0; slot 0 lands after it.
        let tiles: Vec<(u8, u16)> = packed
            .display_list
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::SetTile { tile, params } if *tile != 7 => Some((*tile, params.tmem)),
                _ => None,
            })
            .collect();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].0, 1);
        assert_eq!(tiles[0].1, 0);
        assert_eq!(tiles[1].0, 0);
        // Slot 1 is 32x32 I8: 4 words per row, 128 words.
        assert_eq!(tiles[1].1, 128);
    }

    #[test]
    fn materials_share_identical_textures() {
        let mut ids = TextureIdAllocator::new();
        let first = pack_material(
            "mat_a",
            &[props("red", TextureFormat::Rgba16, 16, 16)],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap();
        let second = pack_material(
            "mat_b",
            &[props("red", TextureFormat::Rgba16, 16, 16)],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap();
        assert_eq!(first.textures.len(), 1);
        // The second material references the first payload instead of
        // re-packing it.
        assert!(second.textures.is_empty());
        let reference = second
            .display_list
            .commands
            .iter()
            .find_map(|c| match c {
                Command::SetTextureImage { image, .. } => Some(*image),
                _ => None,
            })
            .unwrap();
        assert_eq!(reference, Reference::Texture(first.textures[0].id));
    }

    #[test]
    fn oversized_material_is_rejected() {
        let mut ids = TextureIdAllocator::new();
        let err = pack_material(
            "mat",
            &[
                props("a", TextureFormat::Rgba16, 64, 32),
                props("b", TextureFormat::Rgba16, 64, 32),
            ],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap_err();
        match err {
            PackError::TmemBudgetExceeded { words, budget, .. } => {
                assert_eq!(words, 1024);
                assert_eq!(budget, 512);
            }
            other => panic!("expected TmemBudgetExceeded, got {other:?}"),
        }
    }

    #[test]
    fn ci4_material_loads_its_palette() {
        let mut ids = TextureIdAllocator::new();
        let packed = pack_material(
            "mat",
            &[props("flat", TextureFormat::Ci4, 32, 32)],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap();
        assert_eq!(packed.tluts.len(), 1);
        assert_eq!(packed.tluts[0].count, 1);
        let tlut_loads: Vec<u16> = packed
            .display_list
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::LoadTlut { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(tlut_loads, [1]);
        // The index payload nibble-packs to half a byte per texel.
        assert_eq!(packed.textures[0].data.len(), 512);
    }

    #[test]
    fn mipmapped_material_descends_tiles() {
        let mut ids = TextureIdAllocator::new();
        let packed = pack_material(
            "mat",
            &[props("base", TextureFormat::Rgba16, 32, 32)],
            &MaterialOptions {
                mipmaps: true,
                ..Default::default()
            },
            &mut ids,
        )
        .unwrap();
        // Base plus 16x16, 8x8, 4x4 levels.
        assert_eq!(packed.textures.len(), 4);
        let sizes: Vec<(u32, u32)> = packed
            .textures
            .iter()
            .map(|t| (t.width, t.height))
            .collect();
        assert_eq!(sizes, [(32, 32), (16, 16), (8, 8), (4, 4)]);
    }

    #[test]
    fn ihq_material_splits_into_two_slots() {
        let mut ids = TextureIdAllocator::new();
        let packed = pack_material(
            "mat",
            &[props("photo", TextureFormat::Rgba16, 16, 16)],
            &MaterialOptions {
                intensity_hq: true,
                ..Default::default()
            },
            &mut ids,
        )
        .unwrap();
        assert!(packed.ihq_blend.is_some());
        assert_eq!(packed.textures.len(), 2);
        // Slot 1 (emitted first) is the full-resolution intensity layer;
        // slot 0 is the downsampled base.
        assert_eq!(packed.textures[0].format, TextureFormat::I8);
        assert_eq!((packed.textures[0].width, packed.textures[0].height), (16, 16));
        assert_eq!(packed.textures[1].format, TextureFormat::Rgba16);
        assert_eq!((packed.textures[1].width, packed.textures[1].height), (4, 8));
    }
}
