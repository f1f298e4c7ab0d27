//! MPEG encoder constants and small numeric helpers
//!
//! These are handed to the encoder explicitly through [`EncoderConstants`]
//! instead of living in shared global state, so any number of encoders can be
//! built side by side.

/// Largest MP3 buffer the frame encoder can produce in one call.
pub const LAME_MAXMP3BUFFER: usize = 16384 + 128 * 1024;
/// Encoder delay in samples added at the start of the stream.
pub const ENCDELAY: usize = 576;
/// Padding in samples appended after the last input sample.
pub const POSTDELAY: usize = 288;
/// Delay introduced by the MDCT filterbank.
pub const MDCTDELAY: usize = 48;
/// Offset of the FFT window inside a granule.
pub const FFTOFFSET: usize = 224;
/// Long-block FFT size of the psychoacoustic model.
pub const BLKSIZE: usize = 1024;
/// Scalefactor bands in a long block.
pub const SBMAX_L: usize = 22;
/// Scalefactor bands in a short block.
pub const SBMAX_S: usize = 13;
/// Partitions of the long-block band 21.
pub const PSFB21: usize = 6;
/// Partitions of the short-block band 12.
pub const PSFB12: usize = 6;
/// LAME quality used when none is configured (0 best, 9 fastest).
pub const LAME_DEFAULT_QUALITY: u8 = 5;

/// Samples per channel fed to the encoder per call (one MPEG-1 Layer III frame).
pub const FRAME_GRANULE: usize = 1152;

/// Output buffer reserved for the final flush.
pub const FLUSH_BUFFER_SIZE: usize = 7200;

/// Sample rates an MPEG audio frame can carry.
pub const MP3_FREQUENCIES: [u32; 9] = [
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000,
];

const FLOAT_EPSILON: f64 = 1e-10;

/// Channel layout of the encoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
    NotSet,
}

impl MpegMode {
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Stereo => 0,
            Self::JointStereo => 1,
            Self::DualChannel => 2,
            Self::Mono => 3,
            Self::NotSet => 4,
        }
    }

    /// Mode the encoder picks for a given input channel count.
    pub fn for_channels(channels: u16) -> Self {
        match channels {
            1 => Self::Mono,
            2 => Self::JointStereo,
            _ => Self::NotSet,
        }
    }
}

/// Block switching policy of the psychoacoustic model. The LAME bindings
/// expose no setter for it, so LAME keeps its own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortBlock {
    #[default]
    NotSet,
    Allowed,
    Coupled,
    Dispensed,
    Forced,
}

impl ShortBlock {
    pub fn value(self) -> i8 {
        match self {
            Self::NotSet => -1,
            Self::Allowed => 0,
            Self::Coupled => 1,
            Self::Dispensed => 2,
            Self::Forced => 3,
        }
    }
}

/// Variable bitrate algorithm; `Off` means constant bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VbrMode {
    #[default]
    Off,
    Mt,
    Rh,
    Abr,
    Mtrh,
}

impl VbrMode {
    pub fn value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Mt => 1,
            Self::Rh => 2,
            Self::Abr => 3,
            Self::Mtrh => 4,
        }
    }
}

/// Explicit encoder parameters, built per encoder instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConstants {
    pub mode: MpegMode,
    pub vbr: VbrMode,
    /// 0 (best) to 9 (worst).
    pub quality: u8,
}

impl EncoderConstants {
    pub fn for_channels(channels: u16, quality: u8) -> Self {
        Self {
            mode: MpegMode::for_channels(channels),
            vbr: VbrMode::Off,
            quality: quality.min(9),
        }
    }
}

impl Default for EncoderConstants {
    fn default() -> Self {
        Self {
            mode: MpegMode::NotSet,
            vbr: VbrMode::Off,
            quality: LAME_DEFAULT_QUALITY,
        }
    }
}

/// Linear interpolation: `a + t * (b - a)`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Snap an arbitrary sample rate up to the nearest MPEG frequency.
pub fn map_to_mp3_frequency(freq: u32) -> u32 {
    MP3_FREQUENCIES
        .iter()
        .copied()
        .find(|&f| freq <= f)
        .unwrap_or(48000)
}

/// Equality within 1e-10.
pub fn float_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_EPSILON
}

/// Inequality beyond 1e-10.
pub fn float_ne(a: f64, b: f64) -> bool {
    !float_eq(a, b)
}
