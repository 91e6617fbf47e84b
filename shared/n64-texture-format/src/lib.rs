mod codec;
mod error;
mod format;
mod nibble;
mod palette;
mod pixel_buf;

pub use crate::codec::{decode, encode};
pub use crate::error::Error;
pub use crate::format::{PaletteFormat, TextureFormat};
pub use crate::nibble::{compact_nibble_array, expand_nibble_array};
pub use crate::palette::{extract_palette, merge_palettes, to_index_buffer, Palette};
pub use crate::pixel_buf::PixelBuf;
