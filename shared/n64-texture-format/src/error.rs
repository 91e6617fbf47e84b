use thiserror::Error;

use crate::format::TextureFormat;

/// Content errors surfaced to the user. None of these are retried; the
/// caller aborts the current texture's export and reports the message.
#[derive(Debug, Error)]
pub enum Error {
    /// The format has no direct texel encoder (YUV, or a color-indexed
    /// format that must go through a palette first).
    #[error("{format} texels cannot be encoded directly: {reason}")]
    UnsupportedFormat {
        format: TextureFormat,
        reason: &'static str,
    },

    /// More distinct colors than the color-indexed bit depth can address.
    #[error("{image}: {count} distinct colors exceed the {max}-entry limit of {format}")]
    PaletteOverflow {
        image: String,
        count: usize,
        max: usize,
        format: TextureFormat,
    },

    /// A texel's packed color is absent from the palette built for it. This
    /// indicates an upstream bug, not a content problem.
    #[error("{image}: color {color:#06x} is missing from the palette")]
    ColorNotInPalette { image: String, color: u16 },
}
