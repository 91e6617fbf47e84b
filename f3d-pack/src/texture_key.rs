use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use n64_texture_format::{PixelBuf, TextureFormat};

use crate::counter::Counter;

/// Value identity of one packed texture. Two materials whose slots resolve
/// to the same key share a single payload, symbol, and TMEM load.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub digest: u64,
}

impl TextureKey {
    pub fn for_pixels(pixels: &PixelBuf, format: TextureFormat) -> Self {
        let mut hasher = DefaultHasher::new();
        for texel in pixels.n64_scan() {
            for channel in texel {
                channel.to_bits().hash(&mut hasher);
            }
        }
        Self {
            format,
            width: pixels.width(),
            height: pixels.height(),
            digest: hasher.finish(),
        }
    }

    /// Color-indexed payloads depend on their palette too: the same pixels
    /// indexed against a merged table pack differently.
    pub fn with_palette(mut self, colors: &[u16]) -> Self {
        let mut hasher = DefaultHasher::new();
        self.digest.hash(&mut hasher);
        colors.hash(&mut hasher);
        self.digest = hasher.finish();
        self
    }
}

/// Assigns dense ids to texture keys in first-request order.
pub struct TextureIdAllocator {
    ids: HashMap<TextureKey, u16>,
    keys: Vec<TextureKey>,
    counter: Counter<u16>,
}

impl TextureIdAllocator {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: Vec::new(),
            counter: Counter::new(),
        }
    }

    /// Returns the key's id and whether this call allocated it.
    pub fn get(&mut self, key: &TextureKey) -> (u16, bool) {
        if let Some(&id) = self.ids.get(key) {
            return (id, false);
        }
        let id = self.counter.next();
        self.ids.insert(key.clone(), id);
        self.keys.push(key.clone());
        (id, true)
    }

    pub fn keys(&self) -> &[TextureKey] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use n64_texture_format::{PixelBuf, TextureFormat};

    use super::{TextureIdAllocator, TextureKey};

    #[test]
    fn identical_content_shares_an_id() {
        let a = PixelBuf::solid(8, 8, [1.0, 0.0, 0.0, 1.0]);
        let b = PixelBuf::solid(8, 8, [1.0, 0.0, 0.0, 1.0]);
        let mut ids = TextureIdAllocator::new();
        let (id_a, new_a) = ids.get(&TextureKey::for_pixels(&a, TextureFormat::Rgba16));
        let (id_b, new_b) = ids.get(&TextureKey::for_pixels(&b, TextureFormat::Rgba16));
        assert_eq!(id_a, id_b);
        assert!(new_a);
        assert!(!new_b);
        assert_eq!(ids.keys().len(), 1);
    }

    #[test]
    fn format_is_part_of_the_identity() {
        let pixels = PixelBuf::solid(8, 8, [1.0, 0.0, 0.0, 1.0]);
        let mut ids = TextureIdAllocator::new();
        let (id_a, _) = ids.get(&TextureKey::for_pixels(&pixels, TextureFormat::Rgba16));
        let (id_b, _) = ids.get(&TextureKey::for_pixels(&pixels, TextureFormat::I8));
        assert_ne!(id_a, id_b);
    }
}
