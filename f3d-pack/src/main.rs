use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use n64_texture_format::{PaletteFormat, PixelBuf, TextureFormat};

use crate::c_output::SymbolTable;
use crate::large_texture::LargeEdges;
use crate::material::{
    pack_large_material, pack_material, AxisParams, Dithering, MaterialOptions, TextureProps,
};
use crate::texture_key::TextureIdAllocator;

mod c_output;
mod counter;
mod error;
mod large_texture;
mod material;
mod mipmap;
mod tex_loader;
mod texture_key;
mod tmem;

#[derive(Parser)]
#[command(
    name = "f3d-pack",
    version,
    about = "Packs textures into F3D texture loads for N64 targets"
)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Packs a single texture into texel data plus its load display list.
    PackTexture {
        image: PathBuf,
        #[arg(long)]
        format: TextureFormat,
        /// Color-table entry format for CI textures.
        #[arg(long, default_value = "rgba16")]
        palette_format: PaletteFormat,
        /// Clamp both axes instead of wrapping.
        #[arg(long)]
        clamp: bool,
        /// Write `.inc.c` source here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write a big-endian binary blob here.
        #[arg(long)]
        bin: Option<PathBuf>,
        /// Base RDRAM address for binary image pointers.
        #[arg(long, default_value_t = 0, value_parser = parse_address)]
        base_address: u32,
    },
    /// Packs a one- or two-texture material through the full coordinator.
    PackMaterial {
        #[arg(required = true, num_args = 1..=2)]
        images: Vec<PathBuf>,
        #[arg(long, required = true, num_args = 1..=2)]
        format: Vec<TextureFormat>,
        #[arg(long, default_value = "rgba16")]
        palette_format: PaletteFormat,
        /// Generate a box-filtered mip chain (single-texture materials).
        #[arg(long)]
        mipmaps: bool,
        /// Split into an RGBA16 base plus intensity layer.
        #[arg(long)]
        ihq: bool,
        /// Tile the texture per-face instead of loading it whole.
        #[arg(long, requires = "faces")]
        large: bool,
        /// Face UVs for --large: one face per line, "s,t" pairs separated
        /// by spaces, in pixel space.
        #[arg(long)]
        faces: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = EdgesArg::Clamp)]
        edges: EdgesArg,
        /// Passed through to the downstream CI quantizer.
        #[arg(long, value_enum, default_value_t = DitheringArg::None)]
        dithering: DitheringArg,
        #[arg(long)]
        point_sampled: bool,
        #[arg(long)]
        clamp: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Prints an image's TMEM characteristics without packing it.
    DescribeTexture {
        image: PathBuf,
        #[arg(long)]
        format: TextureFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EdgesArg {
    Clamp,
    Wrap,
}

impl From<EdgesArg> for LargeEdges {
    fn from(edges: EdgesArg) -> Self {
        match edges {
            EdgesArg::Clamp => LargeEdges::Clamp,
            EdgesArg::Wrap => LargeEdges::Wrap,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DitheringArg {
    None,
    Ordered,
    Floyd,
}

impl From<DitheringArg> for Dithering {
    fn from(dithering: DitheringArg) -> Self {
        match dithering {
            DitheringArg::None => Dithering::None,
            DitheringArg::Ordered => Dithering::Ordered,
            DitheringArg::Floyd => Dithering::Floyd,
        }
    }
}

fn parse_address(s: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    match Args::parse().command {
        Cmd::PackTexture {
            image,
            format,
            palette_format,
            clamp,
            out,
            bin,
            base_address,
        } => pack_texture(
            &image,
            format,
            palette_format,
            clamp,
            out.as_deref(),
            bin.as_deref(),
            base_address,
        ),
        Cmd::PackMaterial {
            images,
            format,
            palette_format,
            mipmaps,
            ihq,
            large,
            faces,
            edges,
            dithering,
            point_sampled,
            clamp,
            out,
        } => {
            if format.len() != images.len() {
                bail!(
                    "{} images but {} formats given",
                    images.len(),
                    format.len(),
                );
            }
            let opts = MaterialOptions {
                dithering: dithering.into(),
                large_edges: edges.into(),
                point_sampled,
                mipmaps,
                intensity_hq: ihq,
            };
            pack_material_cmd(
                &images,
                &format,
                palette_format,
                clamp,
                large,
                faces.as_deref(),
                &opts,
                out.as_deref(),
            )
        }
        Cmd::DescribeTexture { image, format } => describe_texture(&image, format),
    }
}

fn texture_props(
    path: &Path,
    format: TextureFormat,
    palette_format: PaletteFormat,
    clamp: bool,
) -> Result<TextureProps> {
    let (name, pixels) = load_png(path)?;
    let axis = if clamp {
        AxisParams::clamp
    } else {
        AxisParams::wrap
    };
    Ok(TextureProps {
        name,
        s: axis(pixels.width()),
        t: axis(pixels.height()),
        pixels,
        format,
        palette_format,
    })
}

fn pack_texture(
    image: &Path,
    format: TextureFormat,
    palette_format: PaletteFormat,
    clamp: bool,
    out: Option<&Path>,
    bin: Option<&Path>,
    base_address: u32,
) -> Result<()> {
    let props = texture_props(image, format, palette_format, clamp)?;
    let name = props.name.clone();
    let mut ids = TextureIdAllocator::new();
    let packed = pack_material(&name, &[props], &MaterialOptions::default(), &mut ids)
        .with_context(|| format!("Packing {}", image.display()))?;

    let mut symbols = SymbolTable::new();
    symbols.record(&packed);
    let text = c_output::material_inc_c(&packed, &symbols);
    match out {
        Some(path) => fs::write(path, &text)
            .with_context(|| format!("Writing {}", path.display()))?,
        None => print!("{text}"),
    }
    if let Some(path) = bin {
        let mut locations = HashMap::new();
        let blob = c_output::material_binary(&packed, base_address, &mut locations);
        fs::write(path, blob).with_context(|| format!("Writing {}", path.display()))?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn pack_material_cmd(
    images: &[PathBuf],
    formats: &[TextureFormat],
    palette_format: PaletteFormat,
    clamp: bool,
    large: bool,
    faces: Option<&Path>,
    opts: &MaterialOptions,
    out: Option<&Path>,
) -> Result<()> {
    let mut textures = Vec::new();
    for (image, &format) in images.iter().zip(formats) {
        textures.push(texture_props(image, format, palette_format, clamp)?);
    }
    let name = textures[0].name.clone();
    let mut ids = TextureIdAllocator::new();

    let packed = if large {
        if textures.len() != 1 {
            bail!("--large packs exactly one texture");
        }
        let face_uvs = parse_faces(faces.unwrap())?;
        pack_large_material(&name, &textures[0], &face_uvs, opts, &mut ids)
            .with_context(|| format!("Packing {} in large-texture mode", images[0].display()))?
    } else {
        pack_material(&name, &textures, opts, &mut ids)
            .with_context(|| format!("Packing material {name}"))?
    };

    if let Some(blend) = packed.ihq_blend {
        log::info!("{name}: intensity blend {blend:.2}");
    }
    log::debug!("{name}: dithering {:?} (forwarded to the CI quantizer)", packed.dithering);
    if !packed.large_loads.is_empty() {
        log::info!("{name}: {} TMEM loads", packed.large_loads.len());
    }

    let mut symbols = SymbolTable::new();
    symbols.record(&packed);
    let text = c_output::material_inc_c(&packed, &symbols);
    match out {
        Some(path) => fs::write(path, &text)
            .with_context(|| format!("Writing {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn describe_texture(image: &Path, format: TextureFormat) -> Result<()> {
    let (name, pixels) = load_png(image)?;
    let (width, height) = (pixels.width(), pixels.height());
    let words = tmem::tmem_word_usage(format, width, height);
    let budget = tmem::tmem_budget_words(format);
    println!("{name}: {width}x{height} {format}");
    println!("  tmem words: {words} of {budget}");
    println!("  line words: {}", tmem::tile_line_words(format, width));
    println!(
        "  load block: {}",
        if tmem::can_use_load_block(format, width, height) {
            "yes"
        } else {
            "no"
        }
    );
    if words > budget {
        println!("  oversized: needs large-texture tiling");
    }
    Ok(())
}

fn load_png(path: &Path) -> Result<(String, PixelBuf)> {
    let file =
        File::open(path).with_context(|| format!("Opening image {}", path.display()))?;
    let decoder = png::Decoder::new(file);
    let mut reader = decoder
        .read_info()
        .with_context(|| format!("Decoding {}", path.display()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .with_context(|| format!("Decoding {}", path.display()))?;
    if info.bit_depth != png::BitDepth::Eight {
        bail!(
            "{}: only 8-bit PNGs are supported, not {:?}",
            path.display(),
            info.bit_depth,
        );
    }
    let bytes = &buf[..info.buffer_size()];
    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => bytes.to_vec(),
        png::ColorType::Rgb => bytes
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 0xff])
            .collect(),
        png::ColorType::Grayscale => bytes.iter().flat_map(|&g| [g, g, g, 0xff]).collect(),
        png::ColorType::GrayscaleAlpha => bytes
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[0], c[0], c[1]])
            .collect(),
        other => bail!(
            "{}: unsupported PNG color type {:?}",
            path.display(),
            other,
        ),
    };
    let name = path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    Ok((name, PixelBuf::from_rgba8(info.width, info.height, &rgba)))
}

/// One face per line: whitespace-separated "s,t" pairs in pixel space.
/// Blank lines and `#` comments are skipped.
fn parse_faces(path: &Path) -> Result<Vec<Vec<[f32; 2]>>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut faces = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut uvs = Vec::new();
        for token in line.split_whitespace() {
            let (s, t) = token
                .split_once(',')
                .with_context(|| format!("{}:{}: expected s,t", path.display(), line_number + 1))?;
            uvs.push([
                s.parse()
                    .with_context(|| format!("{}:{}: bad S value", path.display(), line_number + 1))?,
                t.parse()
                    .with_context(|| format!("{}:{}: bad T value", path.display(), line_number + 1))?,
            ]);
        }
        if uvs.len() < 3 {
            bail!(
                "{}:{}: a face needs at least three UVs",
                path.display(),
                line_number + 1,
            );
        }
        faces.push(uvs);
    }
    Ok(faces)
}
