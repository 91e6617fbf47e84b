//! Emits the command sequence that loads one texture (or color table) into
//! TMEM and configures its render tile.
//!
//! The emitter itself is stateless; redundancy elision runs off a
//! caller-owned [`DlState`] so independent materials never share hidden
//! state.

use f3d::display_list::{Command, DisplayList, Reference, TileParams, TileRect};
use f3d::dp::{ClampMirror, ImageFormat, TexelSize, LOAD_TILE};
use n64_texture_format::TextureFormat;

use crate::tmem;

/// The texture image and tile descriptors currently active in a display
/// list. Re-emitting an identical SetTextureImage or SetTile is skipped.
pub struct DlState {
    image: Option<(ImageFormat, TexelSize, u16, Reference)>,
    tiles: [Option<TileParams>; 8],
}

impl DlState {
    pub fn new() -> Self {
        Self {
            image: None,
            tiles: [None; 8],
        }
    }

    pub fn set_texture_image(
        &mut self,
        dl: &mut DisplayList,
        format: ImageFormat,
        size: TexelSize,
        width: u16,
        image: Reference,
    ) {
        if self.image == Some((format, size, width, image)) {
            return;
        }
        self.image = Some((format, size, width, image));
        dl.commands.push(Command::SetTextureImage {
            format,
            size,
            width,
            image,
        });
    }

    pub fn set_tile(&mut self, dl: &mut DisplayList, tile: u8, params: TileParams) {
        if self.tiles[tile as usize] == Some(params) {
            return;
        }
        self.tiles[tile as usize] = Some(params);
        dl.commands.push(Command::SetTile { tile, params });
    }
}

/// A texture slot resolved to its TMEM home.
#[derive(Clone, Debug)]
pub struct TexLayout {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// TMEM word address of the load.
    pub tmem: u16,
    /// Color-table slot for CI formats.
    pub palette: u8,
    pub image: Reference,
    pub clamp_mirror_s: ClampMirror,
    pub mask_s: u8,
    pub shift_s: u8,
    pub clamp_mirror_t: ClampMirror,
    pub mask_t: u8,
    pub shift_t: u8,
}

impl TexLayout {
    pub(crate) fn load_params(&self, size: TexelSize, line: u16) -> TileParams {
        TileParams {
            format: tmem::rdp_format(self.format),
            size,
            line,
            tmem: self.tmem,
            palette: 0,
            clamp_mirror_s: self.clamp_mirror_s,
            mask_s: self.mask_s,
            shift_s: self.shift_s,
            clamp_mirror_t: self.clamp_mirror_t,
            mask_t: self.mask_t,
            shift_t: self.shift_t,
        }
    }

    pub fn render_params(&self) -> TileParams {
        TileParams {
            format: tmem::rdp_format(self.format),
            size: tmem::rdp_size(self.format),
            line: tmem::tile_line_words(self.format, self.width) as u16,
            tmem: self.tmem,
            palette: self.palette,
            clamp_mirror_s: self.clamp_mirror_s,
            mask_s: self.mask_s,
            shift_s: self.shift_s,
            clamp_mirror_t: self.clamp_mirror_t,
            mask_t: self.mask_t,
            shift_t: self.shift_t,
        }
    }
}

/// 10.2 rectangle covering a whole image.
pub fn full_image_rect(width: u32, height: u32) -> TileRect {
    TileRect {
        uls: 0,
        ult: 0,
        lrs: ((width - 1) << 2) as u16,
        lrt: ((height - 1) << 2) as u16,
    }
}

/// Loads a whole (non-large) texture: one LoadBlock when the contiguous copy
/// is legal, otherwise a row-by-row LoadTile.
pub fn emit_texture_load(dl: &mut DisplayList, state: &mut DlState, layout: &TexLayout) {
    let format = layout.format;
    if tmem::can_use_load_block(format, layout.width, layout.height) {
        // Block loads address sub-16-bit texels in pairs, so the size class
        // doubles and the count halves. Getting this wrong corrupts every
        // other row on hardware.
        let size = tmem::load_block_size(format);
        state.set_texture_image(dl, tmem::rdp_format(format), size, 1, layout.image);
        state.set_tile(dl, LOAD_TILE, layout.load_params(size, 0));
        dl.commands.push(Command::LoadSync);
        dl.commands.push(Command::LoadBlock {
            tile: LOAD_TILE,
            uls: 0,
            ult: 0,
            lrs: (tmem::load_block_texel_count(format, layout.width, layout.height) - 1) as u16,
            dxt: tmem::calc_dxt(format, layout.width),
        });
    } else {
        // 4-bit formats have no load path of their own; they load as 8-bit
        // with halved S coordinates.
        let (size, load_width) = if format.is_4_bit() {
            (TexelSize::Bits8, layout.width.div_ceil(2))
        } else {
            (tmem::rdp_size(format), layout.width)
        };
        let line = tmem::tile_load_line_words(format, layout.width) as u16;
        state.set_texture_image(
            dl,
            tmem::rdp_format(format),
            size,
            load_width as u16,
            layout.image,
        );
        state.set_tile(dl, LOAD_TILE, layout.load_params(size, line));
        dl.commands.push(Command::LoadSync);
        dl.commands.push(Command::LoadTile {
            tile: LOAD_TILE,
            rect: full_image_rect(load_width, layout.height),
        });
    }
    dl.commands.push(Command::PipeSync);
}

/// Configures `tile` to render the loaded texture over `rect`.
pub fn emit_render_tile(
    dl: &mut DisplayList,
    state: &mut DlState,
    tile: u8,
    layout: &TexLayout,
    rect: TileRect,
) {
    state.set_tile(dl, tile, layout.render_params());
    dl.commands.push(Command::SetTileSize { tile, rect });
}

/// Loads a color table into the upper half of TMEM.
pub fn emit_tlut_load(
    dl: &mut DisplayList,
    state: &mut DlState,
    tlut: Reference,
    base_word: u16,
    count: u16,
) {
    state.set_texture_image(dl, ImageFormat::Rgba, TexelSize::Bits16, 1, tlut);
    dl.commands.push(Command::TileSync);
    state.set_tile(
        dl,
        LOAD_TILE,
        TileParams {
            format: ImageFormat::Rgba,
            size: TexelSize::Bits4,
            line: 0,
            tmem: base_word,
            palette: 0,
            clamp_mirror_s: ClampMirror::Wrap,
            mask_s: 0,
            shift_s: 0,
            clamp_mirror_t: ClampMirror::Wrap,
            mask_t: 0,
            shift_t: 0,
        },
    );
    dl.commands.push(Command::LoadSync);
    dl.commands.push(Command::LoadTlut {
        tile: LOAD_TILE,
        count,
    });
    dl.commands.push(Command::PipeSync);
}
