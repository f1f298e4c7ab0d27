//! MP3 encoding module
//! Feeds 16-bit PCM to LAME one frame granule at a time and collects the output

use mp3lame_encoder::{
    max_required_buffer_size, Bitrate, Builder, DualPcm, Encoder, FlushNoGap, Mode, MonoPcm,
    Quality, VbrMode as LameVbrMode,
};
use std::mem::MaybeUninit;

use crate::constants::{
    map_to_mp3_frequency, EncoderConstants, MpegMode, VbrMode, FLUSH_BUFFER_SIZE, FRAME_GRANULE,
    LAME_DEFAULT_QUALITY,
};
use crate::error::{AudioError, Result};
use crate::pcm::PcmStream;

/// Bitrates (kbps) a Layer III frame can declare.
const BITRATES: [u32; 16] = [
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Everything needed to build one encoder context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub channels: u16,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    pub constants: EncoderConstants,
}

impl EncoderSettings {
    pub fn new(channels: u16, sample_rate: u32, bitrate_kbps: u32) -> Self {
        Self {
            channels,
            sample_rate,
            bitrate_kbps,
            constants: EncoderConstants::for_channels(channels, LAME_DEFAULT_QUALITY),
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.constants.quality = quality.min(9);
        self
    }

    pub fn with_mode(mut self, mode: MpegMode) -> Self {
        self.constants.mode = mode;
        self
    }

    pub fn with_vbr(mut self, vbr: VbrMode) -> Self {
        self.constants.vbr = vbr;
        self
    }
}

/// MP3 encoder wrapper, one per conversion
pub struct Mp3Encoder {
    encoder: Encoder,
    channels: u16,
    /// Upper bound on output samples per input sample (LAME may upsample).
    resample_ratio: usize,
    mp3_buffer: Vec<MaybeUninit<u8>>,
}

impl Mp3Encoder {
    /// Create a new MP3 encoder
    pub fn new(settings: &EncoderSettings) -> Result<Self> {
        let channels = settings.channels;
        if !(1..=2).contains(&channels) {
            return Err(AudioError::UnsupportedFormat(format!(
                "MP3 supports mono or stereo input, got {} channels",
                channels
            )));
        }

        let mut builder = Builder::new()
            .ok_or_else(|| failure("failed to create MP3 encoder builder"))?;

        builder
            .set_sample_rate(settings.sample_rate)
            .map_err(|e| failure(format!("set_sample_rate: {:?}", e)))?;
        builder
            .set_num_channels(channels as u8)
            .map_err(|e| failure(format!("set_num_channels: {:?}", e)))?;
        builder
            .set_brate(bitrate(settings.bitrate_kbps))
            .map_err(|e| failure(format!("set_brate: {:?}", e)))?;
        builder
            .set_quality(quality(settings.constants.quality))
            .map_err(|e| failure(format!("set_quality: {:?}", e)))?;
        builder
            .set_mode(mode(settings.constants.mode))
            .map_err(|e| failure(format!("set_mode: {:?}", e)))?;
        builder
            .set_vbr_mode(vbr_mode(settings.constants.vbr))
            .map_err(|e| failure(format!("set_vbr_mode: {:?}", e)))?;

        let encoder = builder
            .build()
            .map_err(|e| failure(format!("build: {:?}", e)))?;

        let out_rate = map_to_mp3_frequency(settings.sample_rate);
        if out_rate != settings.sample_rate {
            log::info!(
                "Input rate {}Hz is not an MPEG frequency; frames will carry {}Hz or lower",
                settings.sample_rate,
                out_rate
            );
        }
        log::debug!(
            "MP3 encoder created: {}Hz, mode {} ({:?}), vbr {}, {}kbps, quality {}",
            settings.sample_rate,
            settings.constants.mode.ordinal(),
            settings.constants.mode,
            settings.constants.vbr.value(),
            settings.bitrate_kbps,
            settings.constants.quality
        );

        let sample_rate = settings.sample_rate.max(1);
        let resample_ratio = out_rate.div_ceil(sample_rate).max(1) as usize;

        Ok(Self {
            encoder,
            channels,
            resample_ratio,
            mp3_buffer: Vec::new(),
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Encode one block of mono samples
    pub fn encode_mono(&mut self, block: &[i16]) -> Result<Vec<u8>> {
        self.reserve_output(block.len());
        let encoded_size = self
            .encoder
            .encode(MonoPcm(block), &mut self.mp3_buffer)
            .map_err(|e| failure(format!("encode: {:?}", e)))?;
        Ok(initialized(&self.mp3_buffer, encoded_size))
    }

    /// Encode one block of planar stereo samples
    pub fn encode_stereo(&mut self, left: &[i16], right: &[i16]) -> Result<Vec<u8>> {
        self.reserve_output(left.len().max(right.len()));
        let encoded_size = self
            .encoder
            .encode(DualPcm { left, right }, &mut self.mp3_buffer)
            .map_err(|e| failure(format!("encode: {:?}", e)))?;
        Ok(initialized(&self.mp3_buffer, encoded_size))
    }

    // Sized for the samples LAME sees after resampling, reused across blocks.
    fn reserve_output(&mut self, samples_per_channel: usize) {
        let needed = max_required_buffer_size(samples_per_channel.saturating_mul(self.resample_ratio));
        if self.mp3_buffer.len() < needed {
            self.mp3_buffer.resize(needed, MaybeUninit::uninit());
        }
    }

    /// Flush the encoder
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        let mut mp3_buffer: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); FLUSH_BUFFER_SIZE];
        let encoded_size = self
            .encoder
            .flush::<FlushNoGap>(&mut mp3_buffer)
            .map_err(|e| failure(format!("flush: {:?}", e)))?;
        Ok(initialized(&mp3_buffer, encoded_size))
    }
}

/// Encode a whole PCM stream with default quality.
pub fn encode(pcm: &PcmStream, bitrate_kbps: u32) -> Result<Vec<u8>> {
    encode_with(
        pcm,
        &EncoderSettings::new(pcm.channels, pcm.sample_rate, bitrate_kbps),
    )
}

/// Encode a whole PCM stream into one contiguous MP3 buffer.
///
/// Samples are fed in blocks of [`FRAME_GRANULE`] per channel. The encoder is
/// flushed exactly once after the last block. An empty stream yields an empty
/// buffer without building an encoder.
pub fn encode_with(pcm: &PcmStream, settings: &EncoderSettings) -> Result<Vec<u8>> {
    if pcm.samples.is_empty() {
        log::debug!("Empty PCM stream, nothing to encode");
        return Ok(Vec::new());
    }

    let mut encoder = Mp3Encoder::new(settings)?;
    let block_len = FRAME_GRANULE * encoder.channels() as usize;
    let mut frames: Vec<Vec<u8>> = Vec::new();

    for block in pcm.samples.chunks(block_len) {
        let mp3_buf = if encoder.channels() == 1 {
            encoder.encode_mono(block)?
        } else {
            let (left, right) = deinterleave(block);
            encoder.encode_stereo(&left, &right)?
        };
        if !mp3_buf.is_empty() {
            frames.push(mp3_buf);
        }
    }

    let tail = encoder.flush()?;
    if !tail.is_empty() {
        frames.push(tail);
    }

    let mp3 = frames.concat();
    log::debug!(
        "Encoded {} samples into {} bytes ({} chunks)",
        pcm.samples.len(),
        mp3.len(),
        frames.len()
    );
    Ok(mp3)
}

/// Split an interleaved stereo block into two granule-sized buffers,
/// zero-filling positions past the end of input.
pub fn deinterleave(block: &[i16]) -> (Vec<i16>, Vec<i16>) {
    let mut left = vec![0i16; FRAME_GRANULE];
    let mut right = vec![0i16; FRAME_GRANULE];
    for (j, frame) in block.chunks(2).take(FRAME_GRANULE).enumerate() {
        left[j] = frame[0];
        right[j] = frame.get(1).copied().unwrap_or(0);
    }
    (left, right)
}

/// Snap a requested bitrate up to the nearest supported one.
pub fn snap_bitrate(kbps: u32) -> u32 {
    let snapped = BITRATES.iter().copied().find(|&b| kbps <= b).unwrap_or(320);
    if snapped != kbps {
        log::warn!("Bitrate {}kbps is not supported, using {}kbps", kbps, snapped);
    }
    snapped
}

fn bitrate(kbps: u32) -> Bitrate {
    match snap_bitrate(kbps) {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

fn quality(level: u8) -> Quality {
    match level {
        0 => Quality::Best,
        1 => Quality::SecondBest,
        2 => Quality::NearBest,
        3 => Quality::VeryNice,
        4 => Quality::Nice,
        5 => Quality::Good,
        6 => Quality::Decent,
        7 => Quality::Ok,
        8 => Quality::SecondWorst,
        _ => Quality::Worst,
    }
}

fn failure(message: impl Into<String>) -> AudioError {
    AudioError::EncodingFailure(message.into())
}

fn mode(mode: MpegMode) -> Mode {
    match mode {
        MpegMode::Stereo => Mode::Stereo,
        MpegMode::JointStereo => Mode::JointStereo,
        MpegMode::DualChannel => Mode::DaulChannel,
        MpegMode::Mono => Mode::Mono,
        MpegMode::NotSet => Mode::NotSet,
    }
}

fn vbr_mode(vbr: VbrMode) -> LameVbrMode {
    match vbr {
        VbrMode::Off => LameVbrMode::Off,
        VbrMode::Mt => LameVbrMode::Mt,
        VbrMode::Rh => LameVbrMode::Rh,
        VbrMode::Abr => LameVbrMode::Abr,
        VbrMode::Mtrh => LameVbrMode::Mtrh,
    }
}

fn initialized(buffer: &[MaybeUninit<u8>], len: usize) -> Vec<u8> {
    buffer[..len]
        .iter()
        .map(|m| unsafe { m.assume_init() })
        .collect()
}
