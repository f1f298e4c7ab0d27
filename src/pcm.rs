//! PCM/WAV frame parser
//! Extracts 16-bit PCM samples from a RIFF/WAVE file or a headerless buffer

use crate::error::{AudioError, Result};

/// Canonical 44-byte RIFF/WAVE header size.
pub const MIN_WAV_SIZE: usize = 44;

const RIFF_HEADER_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;
const FMT_BODY_MIN: usize = 16;
const WAVE_FORMAT_PCM: u16 = 1;

/// Decoded interleaved 16-bit PCM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmStream {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmStream {
    /// Build a stream, zero-padding a trailing partial frame.
    pub fn new(mut samples: Vec<i16>, channels: u16, sample_rate: u32) -> Self {
        if channels > 1 {
            let partial = samples.len() % channels as usize;
            if partial != 0 {
                let padded = samples.len() + channels as usize - partial;
                samples.resize(padded, 0);
            }
        }
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Layout assumed for buffers without a RIFF/WAVE header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmDefaults {
    pub channels: u16,
    pub sample_rate: u32,
}

impl Default for PcmDefaults {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 24000,
        }
    }
}

/// Fields read from a `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

/// True when the buffer carries `RIFF` at offset 0 and `WAVE` at offset 8.
pub fn is_wav(buffer: &[u8]) -> bool {
    buffer.len() >= RIFF_HEADER_SIZE && &buffer[0..4] == b"RIFF" && &buffer[8..12] == b"WAVE"
}

/// Parse a WAV file or headerless little-endian PCM.
pub fn parse(buffer: &[u8], defaults: PcmDefaults) -> Result<PcmStream> {
    if is_wav(buffer) {
        log::debug!("Parsing WAV container ({} bytes)", buffer.len());
        return parse_wav(buffer);
    }

    if buffer.len() % 2 != 0 {
        log::warn!("Headerless PCM has an odd byte count; ignoring the trailing byte");
    }
    let samples = samples_from_le_bytes(buffer);
    log::debug!(
        "Headerless PCM: {} samples at {}Hz, {} channel(s)",
        samples.len(),
        defaults.sample_rate,
        defaults.channels
    );
    Ok(PcmStream::new(samples, defaults.channels, defaults.sample_rate))
}

/// Parse a RIFF/WAVE container holding 16-bit PCM.
pub fn parse_wav(buffer: &[u8]) -> Result<PcmStream> {
    if buffer.len() < MIN_WAV_SIZE {
        return Err(AudioError::TruncatedInput(format!(
            "WAV needs at least {} bytes, got {}",
            MIN_WAV_SIZE,
            buffer.len()
        )));
    }
    if &buffer[0..4] != b"RIFF" {
        return Err(AudioError::MalformedContainer("missing RIFF tag".to_string()));
    }
    if &buffer[8..12] != b"WAVE" {
        return Err(AudioError::MalformedContainer("missing WAVE tag".to_string()));
    }

    let mut format: Option<WavFormat> = None;
    let mut offset = RIFF_HEADER_SIZE;

    while let Some((id, length)) = read_chunk_header(buffer, offset) {
        let body_start = offset + CHUNK_HEADER_SIZE;

        match (&id, format) {
            (b"fmt ", None) => {
                let fmt = parse_fmt(buffer, body_start, length)?;
                log::debug!(
                    "fmt: {} channel(s), {}Hz, {}-bit",
                    fmt.channels,
                    fmt.sample_rate,
                    fmt.bits_per_sample
                );
                format = Some(fmt);
            }
            (b"data", Some(fmt)) => {
                let available = buffer.len() - body_start;
                let declared = length as usize;
                if declared > available {
                    log::warn!(
                        "data chunk declares {} bytes but only {} remain; clamping",
                        declared,
                        available
                    );
                }
                let body = &buffer[body_start..body_start + declared.min(available)];
                let samples = samples_from_le_bytes(body);
                return Ok(PcmStream::new(samples, fmt.channels, fmt.sample_rate));
            }
            _ => {
                log::debug!(
                    "Skipping chunk {:?} ({} bytes)",
                    String::from_utf8_lossy(&id),
                    length
                );
            }
        }

        offset = body_start.saturating_add(length as usize);
    }

    match format {
        Some(_) => Err(AudioError::MalformedContainer("no data chunk".to_string())),
        None => Err(AudioError::MalformedContainer("no fmt chunk".to_string())),
    }
}

fn read_chunk_header(buffer: &[u8], offset: usize) -> Option<([u8; 4], u32)> {
    let header = buffer.get(offset..offset.checked_add(CHUNK_HEADER_SIZE)?)?;
    let id = [header[0], header[1], header[2], header[3]];
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    Some((id, length))
}

fn parse_fmt(buffer: &[u8], body_start: usize, length: u32) -> Result<WavFormat> {
    let body = buffer
        .get(body_start..body_start + FMT_BODY_MIN)
        .filter(|_| length as usize >= FMT_BODY_MIN)
        .ok_or_else(|| {
            AudioError::TruncatedInput(format!("fmt chunk shorter than {} bytes", FMT_BODY_MIN))
        })?;

    let fmt = WavFormat {
        audio_format: u16::from_le_bytes([body[0], body[1]]),
        channels: u16::from_le_bytes([body[2], body[3]]),
        sample_rate: u32::from_le_bytes([body[4], body[5], body[6], body[7]]),
        bits_per_sample: u16::from_le_bytes([body[14], body[15]]),
    };

    if fmt.bits_per_sample != 16 {
        return Err(AudioError::UnsupportedFormat(format!(
            "only 16-bit PCM is supported, got {}-bit",
            fmt.bits_per_sample
        )));
    }
    if fmt.audio_format != WAVE_FORMAT_PCM {
        return Err(AudioError::UnsupportedFormat(format!(
            "only integer PCM is supported, got format tag {:#06x}",
            fmt.audio_format
        )));
    }
    if fmt.channels == 0 || fmt.sample_rate == 0 {
        return Err(AudioError::MalformedContainer(
            "fmt chunk declares zero channels or zero sample rate".to_string(),
        ));
    }

    Ok(fmt)
}

fn samples_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt_chunk(format_tag: u16, channels: u16, sample_rate: u32, bits: u16) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let mut chunk = Vec::new();
        chunk.extend_from_slice(b"fmt ");
        chunk.extend_from_slice(&16u32.to_le_bytes());
        chunk.extend_from_slice(&format_tag.to_le_bytes());
        chunk.extend_from_slice(&channels.to_le_bytes());
        chunk.extend_from_slice(&sample_rate.to_le_bytes());
        chunk.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        chunk.extend_from_slice(&block_align.to_le_bytes());
        chunk.extend_from_slice(&bits.to_le_bytes());
        chunk
    }

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut chunk = Vec::new();
        chunk.extend_from_slice(id);
        chunk.extend_from_slice(&(body.len() as u32).to_le_bytes());
        chunk.extend_from_slice(body);
        chunk
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn mono_wav_yields_all_samples() {
        let samples: Vec<i16> = (0..100).map(|i| i * 3 - 150).collect();
        let wav = riff(&[fmt_chunk(1, 1, 22050, 16), chunk(b"data", &pcm_bytes(&samples))]);

        let pcm = parse(&wav, PcmDefaults::default()).unwrap();
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.sample_rate, 22050);
        assert_eq!(pcm.samples, samples);
    }

    #[test]
    fn skips_chunks_between_fmt_and_data() {
        let samples = [1i16, -1, 2, -2];
        let wav = riff(&[
            fmt_chunk(1, 2, 48000, 16),
            chunk(b"LIST", b"INFOISFT\x05\x00\x00\x00test\x00"),
            chunk(b"data", &pcm_bytes(&samples)),
        ]);

        let pcm = parse(&wav, PcmDefaults::default()).unwrap();
        assert_eq!(pcm.channels, 2);
        assert_eq!(pcm.samples, samples);
    }

    #[test]
    fn skips_chunks_before_fmt() {
        let samples = [7i16; 16];
        let wav = riff(&[
            chunk(b"JUNK", &[0u8; 12]),
            fmt_chunk(1, 1, 16000, 16),
            chunk(b"data", &pcm_bytes(&samples)),
        ]);

        let pcm = parse(&wav, PcmDefaults::default()).unwrap();
        assert_eq!(pcm.samples.len(), 16);
        assert_eq!(pcm.sample_rate, 16000);
    }

    #[test]
    fn short_riff_buffer_is_truncated() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"RIFF");
        buffer.extend_from_slice(&0u32.to_le_bytes());
        buffer.extend_from_slice(b"WAVE");
        buffer.extend_from_slice(&[0u8; 20]);

        let err = parse(&buffer, PcmDefaults::default()).unwrap_err();
        assert!(matches!(err, AudioError::TruncatedInput(_)));
    }

    #[test]
    fn eight_bit_is_unsupported() {
        let wav = riff(&[fmt_chunk(1, 1, 8000, 8), chunk(b"data", &[128u8; 32])]);
        let err = parse(&wav, PcmDefaults::default()).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }

    #[test]
    fn extensible_format_is_unsupported() {
        let wav = riff(&[fmt_chunk(0xFFFE, 2, 44100, 16), chunk(b"data", &[0u8; 32])]);
        let err = parse(&wav, PcmDefaults::default()).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }

    #[test]
    fn data_before_fmt_is_skipped() {
        let wav = riff(&[
            chunk(b"data", &[9u8; 8]),
            fmt_chunk(1, 1, 24000, 16),
            chunk(b"data", &[1, 0, 2, 0, 3, 0]),
        ]);
        let pcm = parse(&wav, PcmDefaults::default()).unwrap();
        assert_eq!(pcm.samples, vec![1, 2, 3]);
        assert_eq!(pcm.sample_rate, 24000);
    }

    #[test]
    fn data_only_before_fmt_is_malformed() {
        let wav = riff(&[chunk(b"data", &[0u8; 32]), fmt_chunk(1, 1, 8000, 16)]);
        let err = parse(&wav, PcmDefaults::default()).unwrap_err();
        assert_eq!(err, AudioError::MalformedContainer("no data chunk".to_string()));
    }

    #[test]
    fn missing_data_is_malformed() {
        let wav = riff(&[fmt_chunk(1, 1, 8000, 16), chunk(b"LIST", &[0u8; 24])]);
        let err = parse(&wav, PcmDefaults::default()).unwrap_err();
        assert_eq!(err, AudioError::MalformedContainer("no data chunk".to_string()));
    }

    #[test]
    fn missing_fmt_is_malformed() {
        let wav = riff(&[chunk(b"LIST", &[0u8; 40])]);
        let err = parse(&wav, PcmDefaults::default()).unwrap_err();
        assert_eq!(err, AudioError::MalformedContainer("no fmt chunk".to_string()));
    }

    #[test]
    fn oversized_data_length_is_clamped() {
        let mut wav = riff(&[fmt_chunk(1, 1, 24000, 16), chunk(b"data", &pcm_bytes(&[5, 6, 7]))]);
        let len = wav.len();
        wav[len - 10..len - 6].copy_from_slice(&u32::MAX.to_le_bytes());

        let pcm = parse(&wav, PcmDefaults::default()).unwrap();
        assert_eq!(pcm.samples, vec![5, 6, 7]);
    }

    #[test]
    fn headerless_pcm_uses_defaults() {
        let bytes = pcm_bytes(&[100, -100, 200]);
        let defaults = PcmDefaults {
            channels: 1,
            sample_rate: 24000,
        };

        let pcm = parse(&bytes, defaults).unwrap();
        assert_eq!(pcm.samples, vec![100, -100, 200]);
        assert_eq!(pcm.sample_rate, 24000);
        assert!(!is_wav(&bytes));
    }

    #[test]
    fn headerless_stereo_pads_partial_frame() {
        let bytes = pcm_bytes(&[1, 2, 3]);
        let defaults = PcmDefaults {
            channels: 2,
            sample_rate: 24000,
        };

        let pcm = parse(&bytes, defaults).unwrap();
        assert_eq!(pcm.samples, vec![1, 2, 3, 0]);
        assert_eq!(pcm.frames(), 2);
    }

    #[test]
    fn empty_buffer_is_empty_pcm() {
        let pcm = parse(&[], PcmDefaults::default()).unwrap();
        assert!(pcm.samples.is_empty());
        assert_eq!(pcm.duration_secs(), 0.0);
    }
}
