//! Public data types: the decoded image, and encode/decode configuration
//! (SPEC_FULL.md §10.3).

/// A decoded image: interleaved RGBA, row-major, top-to-bottom. Alpha is
/// always 255 (spec.md §6).
#[derive(Clone)]
pub struct Image {
    pub width: u16,
    pub height: u16,
    pub rgba: Vec<u8>,
    /// Set when the scan ended before the declared dimensions were fully
    /// decoded; the remainder was zero-filled (spec.md §7, `Truncated`).
    pub truncated: bool,
}

impl Image {
    pub(crate) fn new(width: u16, height: u16) -> Image {
        Image {
            width,
            height,
            rgba: vec![0u8; usize::from(width) * usize::from(height) * 4],
            truncated: false,
        }
    }
}

/// Color space an encoded image is produced in (spec.md §6).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ColorSpace {
    Grayscale,
    YCbCr,
}

/// Chroma subsampling ratio for encoding (spec.md §4.12/§6).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChromaSubsampling {
    /// 4:4:4, no subsampling.
    Yuv444,
    /// 4:2:2, horizontal-only.
    Yuv422,
    /// 4:2:0, both directions.
    Yuv420,
}

impl ChromaSubsampling {
    /// `(h_sampling, v_sampling)` for the luma component; chroma
    /// components always carry sampling factors `(1, 1)`.
    pub(crate) fn luma_sampling_factors(self) -> (u8, u8) {
        match self {
            ChromaSubsampling::Yuv444 => (1, 1),
            ChromaSubsampling::Yuv422 => (2, 1),
            ChromaSubsampling::Yuv420 => (2, 2),
        }
    }
}

/// Encoder configuration (spec.md §6).
#[derive(Copy, Clone, Debug)]
pub struct EncodeOptions {
    pub quality: u8,
    pub color_space: ColorSpace,
    pub chroma_subsampling: ChromaSubsampling,
    /// Emit DRI/RST markers every this many MCUs; 0 disables restarts.
    pub restart_interval: u16,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            quality: 75,
            color_space: ColorSpace::YCbCr,
            chroma_subsampling: ChromaSubsampling::Yuv420,
            restart_interval: 0,
        }
    }
}

impl EncodeOptions {
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn with_chroma_subsampling(mut self, chroma_subsampling: ChromaSubsampling) -> Self {
        self.chroma_subsampling = chroma_subsampling;
        self
    }

    pub fn with_restart_interval(mut self, restart_interval: u16) -> Self {
        self.restart_interval = restart_interval;
        self
    }
}

/// Decoder configuration (SPEC_FULL.md §10.3).
#[derive(Copy, Clone, Debug, Default)]
pub struct DecoderOptions {
    /// When set, any recoverable condition (`Truncated`, resynchronized
    /// `CorruptEntropy`) is reported as an error instead of a best-effort
    /// image.
    pub strict_mode: bool,
}
