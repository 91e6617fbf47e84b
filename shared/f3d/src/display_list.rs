use std::fmt::Write as _;
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::dp::{
    tile_c_name, ClampMirror, ImageFormat, LoadBlockCmd, LoadTlutCmd, SetTextureImageCmd,
    SetTileCmd, TexelSize, TileRectCmd, G_ENDDL, G_RDPLOADSYNC, G_RDPPIPESYNC, G_RDPTILESYNC,
};

/// A value resolved at emission time: texture and palette payloads get their
/// RDRAM addresses (binary) or symbol names (C) assigned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reference {
    Texture(u16),
    Tlut(u16),
}

/// SetTile fields other than the tile index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileParams {
    pub format: ImageFormat,
    pub size: TexelSize,
    pub line: u16,
    pub tmem: u16,
    pub palette: u8,
    pub clamp_mirror_s: ClampMirror,
    pub mask_s: u8,
    pub shift_s: u8,
    pub clamp_mirror_t: ClampMirror,
    pub mask_t: u8,
    pub shift_t: u8,
}

/// Four 10.2 fixed-point texel coordinates, as carried by SetTileSize and
/// LoadTile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub uls: u16,
    pub ult: u16,
    pub lrs: u16,
    pub lrt: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetTextureImage {
        format: ImageFormat,
        size: TexelSize,
        width: u16,
        image: Reference,
    },
    SetTile {
        tile: u8,
        params: TileParams,
    },
    SetTileSize {
        tile: u8,
        rect: TileRect,
    },
    LoadBlock {
        tile: u8,
        uls: u16,
        ult: u16,
        /// Texel count minus one, in the load size class's units.
        lrs: u16,
        dxt: u16,
    },
    LoadTile {
        tile: u8,
        rect: TileRect,
    },
    LoadTlut {
        tile: u8,
        /// Number of 16-bit entries.
        count: u16,
    },
    TileSync,
    LoadSync,
    PipeSync,
    EndDisplayList,
}

impl Command {
    /// Every Gfx word pair is eight bytes.
    pub fn len(&self) -> usize {
        8
    }

    fn encode(&self) -> [u8; 8] {
        match *self {
            Command::SetTextureImage {
                format,
                size,
                width,
                ..
            } => SetTextureImageCmd::new()
                .with_opcode(SetTextureImageCmd::OPCODE)
                .with_format(format)
                .with_size(size)
                .with_width_minus_one(width - 1)
                .with_address(0)
                .into_bytes(),
            Command::SetTile { tile, params } => SetTileCmd::new()
                .with_opcode(SetTileCmd::OPCODE)
                .with_format(params.format)
                .with_size(params.size)
                .with_line(params.line)
                .with_tmem(params.tmem)
                .with_tile(tile)
                .with_palette(params.palette)
                .with_clamp_mirror_t(params.clamp_mirror_t)
                .with_mask_t(params.mask_t)
                .with_shift_t(params.shift_t)
                .with_clamp_mirror_s(params.clamp_mirror_s)
                .with_mask_s(params.mask_s)
                .with_shift_s(params.shift_s)
                .into_bytes(),
            Command::SetTileSize { tile, rect } => TileRectCmd::new()
                .with_opcode(TileRectCmd::SET_TILE_SIZE_OPCODE)
                .with_uls(rect.uls)
                .with_ult(rect.ult)
                .with_tile(tile)
                .with_lrs(rect.lrs)
                .with_lrt(rect.lrt)
                .into_bytes(),
            Command::LoadBlock {
                tile,
                uls,
                ult,
                lrs,
                dxt,
            } => LoadBlockCmd::new()
                .with_opcode(LoadBlockCmd::OPCODE)
                .with_uls(uls)
                .with_ult(ult)
                .with_tile(tile)
                .with_lrs(lrs)
                .with_dxt(dxt)
                .into_bytes(),
            Command::LoadTile { tile, rect } => TileRectCmd::new()
                .with_opcode(TileRectCmd::LOAD_TILE_OPCODE)
                .with_uls(rect.uls)
                .with_ult(rect.ult)
                .with_tile(tile)
                .with_lrs(rect.lrs)
                .with_lrt(rect.lrt)
                .into_bytes(),
            Command::LoadTlut { tile, count } => LoadTlutCmd::new()
                .with_opcode(LoadTlutCmd::OPCODE)
                .with_tile(tile)
                .with_count_minus_one(count - 1)
                .into_bytes(),
            Command::TileSync => sync_words(G_RDPTILESYNC),
            Command::LoadSync => sync_words(G_RDPLOADSYNC),
            Command::PipeSync => sync_words(G_RDPPIPESYNC),
            Command::EndDisplayList => sync_words(G_ENDDL),
        }
    }

    pub fn write_to<W: Write>(
        &self,
        w: &mut W,
        mut emit_reference: impl FnMut(&W, Reference),
    ) -> io::Result<()> {
        let bytes = self.encode();
        if let Command::SetTextureImage { image, .. } = self {
            // The address word is patched in by the caller; record where it
            // landed and leave zeroes behind.
            w.write_all(&bytes[..4])?;
            emit_reference(w, *image);
            w.write_u32::<BigEndian>(0)?;
        } else {
            w.write_all(&bytes)?;
        }
        Ok(())
    }

    /// Renders the command as the `gsDP*` static display-list macro.
    pub fn to_static_c(&self, resolve: &dyn Fn(Reference) -> String) -> String {
        match *self {
            Command::SetTextureImage {
                format,
                size,
                width,
                image,
            } => format!(
                "gsDPSetTextureImage({}, {}, {}, {})",
                format.c_name(),
                size.c_name(),
                width,
                resolve(image),
            ),
            Command::SetTile { tile, params } => format!(
                "gsDPSetTile({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                params.format.c_name(),
                params.size.c_name(),
                params.line,
                params.tmem,
                tile_c_name(tile),
                params.palette,
                params.clamp_mirror_t.c_name(),
                params.mask_t,
                params.shift_t,
                params.clamp_mirror_s.c_name(),
                params.mask_s,
                params.shift_s,
            ),
            Command::SetTileSize { tile, rect } => format!(
                "gsDPSetTileSize({}, {}, {}, {}, {})",
                tile_c_name(tile),
                rect.uls,
                rect.ult,
                rect.lrs,
                rect.lrt,
            ),
            Command::LoadBlock {
                tile,
                uls,
                ult,
                lrs,
                dxt,
            } => format!(
                "gsDPLoadBlock({}, {}, {}, {}, {})",
                tile_c_name(tile),
                uls,
                ult,
                lrs,
                dxt,
            ),
            Command::LoadTile { tile, rect } => format!(
                "gsDPLoadTile({}, {}, {}, {}, {})",
                tile_c_name(tile),
                rect.uls,
                rect.ult,
                rect.lrs,
                rect.lrt,
            ),
            Command::LoadTlut { tile, count } => {
                format!("gsDPLoadTLUTCmd({}, {})", tile_c_name(tile), count - 1)
            }
            Command::TileSync => "gsDPTileSync()".to_owned(),
            Command::LoadSync => "gsDPLoadSync()".to_owned(),
            Command::PipeSync => "gsDPPipeSync()".to_owned(),
            Command::EndDisplayList => "gsSPEndDisplayList()".to_owned(),
        }
    }
}

fn sync_words(opcode: u8) -> [u8; 8] {
    [opcode, 0, 0, 0, 0, 0, 0, 0]
}

#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    pub commands: Vec<Command>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.iter().map(Command::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn write_to<W: Write>(
        &self,
        w: &mut W,
        mut emit_reference: impl FnMut(&W, Reference),
    ) -> io::Result<()> {
        for command in &self.commands {
            command.write_to(w, &mut emit_reference)?;
        }
        Ok(())
    }

    /// Renders the list as a `Gfx` array definition.
    pub fn to_static_c(&self, name: &str, resolve: &dyn Fn(Reference) -> String) -> String {
        let mut out = format!("Gfx {name}[] = {{\n");
        for command in &self.commands {
            writeln!(out, "\t{},", command.to_static_c(resolve)).unwrap();
        }
        out.push_str("};\n");
        out
    }
}
