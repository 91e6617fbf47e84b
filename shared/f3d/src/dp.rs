//! RDP command words, packed MSB-first exactly as the hardware reads them.

use modular_bitfield_msb::prelude::*;

/// Image format field of SetTextureImage/SetTile.
#[derive(BitfieldSpecifier, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[bits = 3]
pub enum ImageFormat {
    Rgba = 0,
    Yuv = 1,
    Ci = 2,
    Ia = 3,
    I = 4,
}

impl ImageFormat {
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Rgba => "G_IM_FMT_RGBA",
            Self::Yuv => "G_IM_FMT_YUV",
            Self::Ci => "G_IM_FMT_CI",
            Self::Ia => "G_IM_FMT_IA",
            Self::I => "G_IM_FMT_I",
        }
    }
}

/// Texel size field of SetTextureImage/SetTile.
#[derive(BitfieldSpecifier, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[bits = 2]
pub enum TexelSize {
    Bits4 = 0,
    Bits8 = 1,
    Bits16 = 2,
    Bits32 = 3,
}

impl TexelSize {
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Bits4 => "G_IM_SIZ_4b",
            Self::Bits8 => "G_IM_SIZ_8b",
            Self::Bits16 => "G_IM_SIZ_16b",
            Self::Bits32 => "G_IM_SIZ_32b",
        }
    }
}

/// Per-axis clamp/mirror flags of SetTile.
#[derive(BitfieldSpecifier, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[bits = 2]
pub enum ClampMirror {
    Wrap = 0,
    Mirror = 1,
    Clamp = 2,
    MirrorClamp = 3,
}

impl ClampMirror {
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Wrap => "G_TX_NOMIRROR | G_TX_WRAP",
            Self::Mirror => "G_TX_MIRROR | G_TX_WRAP",
            Self::Clamp => "G_TX_NOMIRROR | G_TX_CLAMP",
            Self::MirrorClamp => "G_TX_MIRROR | G_TX_CLAMP",
        }
    }
}

#[bitfield]
#[derive(Clone, Copy)]
pub struct SetTextureImageCmd {
    pub opcode: B8,
    pub format: ImageFormat,
    pub size: TexelSize,
    #[skip]
    __: B7,
    pub width_minus_one: B12,
    pub address: B32,
}

impl SetTextureImageCmd {
    pub const OPCODE: u8 = 0xfd;
}

#[bitfield]
#[derive(Clone, Copy)]
pub struct SetTileCmd {
    pub opcode: B8,
    pub format: ImageFormat,
    pub size: TexelSize,
    #[skip]
    __: B1,
    pub line: B9,
    pub tmem: B9,
    #[skip]
    __: B5,
    pub tile: B3,
    pub palette: B4,
    pub clamp_mirror_t: ClampMirror,
    pub mask_t: B4,
    pub shift_t: B4,
    pub clamp_mirror_s: ClampMirror,
    pub mask_s: B4,
    pub shift_s: B4,
}

impl SetTileCmd {
    pub const OPCODE: u8 = 0xf5;
}

/// Shared layout of SetTileSize and LoadTile: four 10.2 fixed-point texel
/// coordinates.
#[bitfield]
#[derive(Clone, Copy)]
pub struct TileRectCmd {
    pub opcode: B8,
    pub uls: B12,
    pub ult: B12,
    #[skip]
    __: B5,
    pub tile: B3,
    pub lrs: B12,
    pub lrt: B12,
}

impl TileRectCmd {
    pub const SET_TILE_SIZE_OPCODE: u8 = 0xf2;
    pub const LOAD_TILE_OPCODE: u8 = 0xf4;
}

#[bitfield]
#[derive(Clone, Copy)]
pub struct LoadBlockCmd {
    pub opcode: B8,
    pub uls: B12,
    pub ult: B12,
    #[skip]
    __: B5,
    pub tile: B3,
    pub lrs: B12,
    pub dxt: B12,
}

impl LoadBlockCmd {
    pub const OPCODE: u8 = 0xf3;
}

#[bitfield]
#[derive(Clone, Copy)]
pub struct LoadTlutCmd {
    pub opcode: B8,
    #[skip]
    __: B24,
    #[skip]
    __: B5,
    pub tile: B3,
    pub count_minus_one: B10,
    #[skip]
    __: B14,
}

impl LoadTlutCmd {
    pub const OPCODE: u8 = 0xf0;
}

pub const G_RDPLOADSYNC: u8 = 0xe6;
pub const G_RDPPIPESYNC: u8 = 0xe7;
pub const G_RDPTILESYNC: u8 = 0xe8;
pub const G_ENDDL: u8 = 0xdf;

/// The RDP's tile descriptor reserved for loads (`G_TX_LOADTILE`).
pub const LOAD_TILE: u8 = 7;
/// The first render tile (`G_TX_RENDERTILE`).
pub const RENDER_TILE: u8 = 0;

pub fn tile_c_name(tile: u8) -> String {
    match tile {
        0 => "G_TX_RENDERTILE".to_owned(),
        7 => "G_TX_LOADTILE".to_owned(),
        n => n.to_string(),
    }
}
