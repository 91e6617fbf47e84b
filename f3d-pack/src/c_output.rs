//! Output renditions of a packed material: `.inc.c` source for
//! decompilation targets and raw big-endian binary for ROM patching.

use std::collections::HashMap;
use std::fmt::Write as _;

use byteorder::{BigEndian, ByteOrder};
use f3d::display_list::Reference;

use crate::material::{symbol, PackedMaterial};

/// Maps payload references to the symbols they were emitted under, across
/// every material packed so far. Caller-owned so de-duplicated textures
/// resolve to their first emission.
#[derive(Default)]
pub struct SymbolTable {
    map: HashMap<Reference, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, packed: &PackedMaterial) {
        for texture in &packed.textures {
            self.map
                .insert(Reference::Texture(texture.id), texture.symbol.clone());
        }
        for tlut in &packed.tluts {
            self.map
                .insert(Reference::Tlut(tlut.id), tlut.symbol.clone());
        }
    }

    pub fn resolve(&self, reference: Reference) -> String {
        self.map
            .get(&reference)
            .unwrap_or_else(|| panic!("unrecorded reference {reference:?}"))
            .clone()
    }
}

/// Texel payloads emit as u64 arrays so the data lands 8-byte aligned; a
/// short tail pads with zeroes.
pub fn data_c_array(symbol: &str, data: &[u8]) -> String {
    let mut out = format!("u64 {symbol}[] = {{");
    for (i, chunk) in data.chunks(8).enumerate() {
        if i % 4 == 0 {
            out.push_str("\n\t");
        } else {
            out.push(' ');
        }
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        write!(out, "{:#018x},", u64::from_be_bytes(word)).unwrap();
    }
    out.push_str("\n};\n");
    out
}

/// The whole material as `.inc.c` source: payload arrays, then the Gfx
/// list.
pub fn material_inc_c(packed: &PackedMaterial, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    for texture in &packed.textures {
        out.push_str(&data_c_array(&texture.symbol, &texture.data));
        out.push('\n');
    }
    for tlut in &packed.tluts {
        out.push_str(&data_c_array(&tlut.symbol, &tlut.data));
        out.push('\n');
    }
    let dl_name = format!("{}_dl", symbol(&packed.name));
    out.push_str(
        &packed
            .display_list
            .to_static_c(&dl_name, &|reference| symbols.resolve(reference)),
    );
    out
}

/// The whole material as one big-endian blob: payloads first (8-byte
/// aligned), then the display list with every image address patched to its
/// payload's location. `locations` carries addresses across materials.
pub fn material_binary(
    packed: &PackedMaterial,
    base_address: u32,
    locations: &mut HashMap<Reference, u32>,
) -> Vec<u8> {
    let mut out = Vec::new();
    for texture in &packed.textures {
        locations.insert(
            Reference::Texture(texture.id),
            base_address + out.len() as u32,
        );
        out.extend_from_slice(&texture.data);
        while out.len() % 8 != 0 {
            out.push(0);
        }
    }
    for tlut in &packed.tluts {
        locations.insert(Reference::Tlut(tlut.id), base_address + out.len() as u32);
        out.extend_from_slice(&tlut.data);
        while out.len() % 8 != 0 {
            out.push(0);
        }
    }

    let mut patches = Vec::new();
    packed
        .display_list
        .write_to(&mut out, |out: &Vec<u8>, reference| {
            patches.push((out.len(), reference));
        })
        .unwrap();
    for (offset, reference) in patches {
        let address = locations
            .get(&reference)
            .unwrap_or_else(|| panic!("unrecorded reference {reference:?}"));
        BigEndian::write_u32(&mut out[offset..offset + 4], *address);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use n64_texture_format::{PaletteFormat, PixelBuf, TextureFormat};

    use crate::material::{pack_material, AxisParams, MaterialOptions, TextureProps};
    use crate::texture_key::TextureIdAllocator;

    use super::*;

    fn packed_red() -> crate::material::PackedMaterial {
        let mut ids = TextureIdAllocator::new();
        pack_material(
            "solid",
            &[TextureProps {
                name: "red".to_owned(),
                pixels: PixelBuf::solid(8, 8, [1.0, 0.0, 0.0, 1.0]),
                format: TextureFormat::Rgba16,
                palette_format: PaletteFormat::Rgba16,
                s: AxisParams::wrap(8),
                t: AxisParams::wrap(8),
            }],
            &MaterialOptions::default(),
            &mut ids,
        )
        .unwrap()
    }

    #[test]
    fn c_array_packs_big_endian_words() {
        let text = data_c_array("tex", &[0xf8, 0x01, 0xf8, 0x01, 0xf8, 0x01, 0xf8, 0x01]);
        assert_eq!(text, "u64 tex[] = {\n\t0xf801f801f801f801,\n};\n");
    }

    #[test]
    fn c_array_pads_short_tails() {
        let text = data_c_array("tail", &[0xab, 0xcd]);
        assert_eq!(text, "u64 tail[] = {\n\t0xabcd000000000000,\n};\n");
    }

    #[test]
    fn inc_c_resolves_texture_symbols() {
        let packed = packed_red();
        let mut symbols = SymbolTable::new();
        symbols.record(&packed);
        let text = material_inc_c(&packed, &symbols);
        assert!(text.contains("u64 red[] = {"), "{text}");
        assert!(text.contains("Gfx solid_dl[] = {"), "{text}");
        assert!(text.contains("gsDPSetTextureImage(G_IM_FMT_RGBA, G_IM_SIZ_16b, 1, red)"));
        assert!(text.ends_with("\tgsSPEndDisplayList(),\n};\n"));
    }

    #[test]
    fn binary_patches_image_addresses() {
        let packed = packed_red();
        let mut locations = HashMap::new();
        let blob = material_binary(&packed, 0x0d000000, &mut locations);
        // 8x8 RGBA16 payload is 128 bytes; the SetTextureImage address word
        // points at the blob's base.
        let image_word_offset = 128 + 4;
        assert_eq!(
            &blob[image_word_offset..image_word_offset + 4],
            &[0x0d, 0x00, 0x00, 0x00],
        );
    }
}
