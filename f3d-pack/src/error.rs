use thiserror::Error;

/// Content errors surfaced to the user. Every one of these aborts the
/// current material's export; nothing is retried or silently clamped.
#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Codec(#[from] n64_texture_format::Error),

    /// A tile rectangle ran past the RDP's 10-bit texel coordinate range.
    #[error(
        "{image}: tile needs texels {lo}-{hi} along {axis}, exceeding the \
         1024-texel tile coordinate range (image is {width}x{height})"
    )]
    RegionUnrepresentable {
        image: String,
        axis: &'static str,
        lo: i32,
        hi: i32,
        width: u32,
        height: u32,
    },

    /// A single tile rectangle outgrew TMEM and cannot be split further.
    #[error(
        "{image}: tile {sl}..{sh} x {tl}..{th} needs {words} TMEM words \
         but the budget is {budget}"
    )]
    TileTooLarge {
        image: String,
        sl: i32,
        sh: i32,
        tl: i32,
        th: i32,
        words: u32,
        budget: u32,
    },

    /// The resolved texture slots (plus palettes and mip levels) do not fit
    /// in TMEM together.
    #[error("{image}: needs {words} TMEM words but only {budget} are available")]
    TmemBudgetExceeded {
        image: String,
        words: u32,
        budget: u32,
    },

    /// A wrapping load must split on a hardware boundary the image is too
    /// small to honor.
    #[error(
        "{image}: a load that wraps past the {axis} edge must split on a \
         {alignment}-texel boundary; the image must be at least {alignment} \
         texels along {axis} (it is {dim})"
    )]
    WrapTooNarrow {
        image: String,
        axis: &'static str,
        alignment: u32,
        dim: u32,
    },
}
