//! Conversion pipeline: Base64 -> PCM/WAV -> MP3 -> Base64 or cache
//!
//! Every stage failure aborts the whole call with one [`AudioError`]; nothing
//! is retried here.

use crossbeam_channel::{self, Receiver};
use std::thread;

use crate::cache::{HandleRegistry, MediaCache, MediaKind};
use crate::config::Config;
use crate::encoder::{self, EncoderSettings};
use crate::error::{AudioError, Result};
use crate::pcm::{self, PcmDefaults};
use crate::transcode;

/// Settings for one converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertSettings {
    pub bitrate_kbps: u32,
    pub quality: u8,
    pub defaults: PcmDefaults,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ConvertSettings {
    fn from(config: &Config) -> Self {
        Self {
            bitrate_kbps: config.bitrate,
            quality: config.quality,
            defaults: config.pcm_defaults(),
        }
    }
}

/// Turns speech-synthesis audio into MP3
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioConverter {
    settings: ConvertSettings,
}

impl AudioConverter {
    pub fn new(settings: ConvertSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ConvertSettings {
        &self.settings
    }

    /// WAV or headerless PCM bytes to MP3 bytes.
    pub fn convert_bytes(&self, audio: &[u8]) -> Result<Vec<u8>> {
        log::debug!("Audio data size: {} bytes", audio.len());

        let pcm = pcm::parse(audio, self.settings.defaults)?;
        log::debug!(
            "PCM: {} samples, {} channel(s), {}Hz ({:.2}s)",
            pcm.samples.len(),
            pcm.channels,
            pcm.sample_rate,
            pcm.duration_secs()
        );

        let settings = EncoderSettings::new(pcm.channels, pcm.sample_rate, self.settings.bitrate_kbps)
            .with_quality(self.settings.quality);
        let mp3 = encoder::encode_with(&pcm, &settings)?;

        log::info!("MP3 conversion complete: {} bytes", mp3.len());
        Ok(mp3)
    }

    /// Base64 WAV or PCM (data-URL prefix allowed) to MP3 bytes.
    pub fn convert_base64(&self, audio_base64: &str) -> Result<Vec<u8>> {
        let audio = transcode::decode(audio_base64)?;
        self.convert_bytes(&audio)
    }

    /// Base64 WAV or PCM to Base64 MP3 (no data-URL prefix).
    pub fn convert_to_mp3(&self, audio_base64: &str) -> Result<String> {
        self.convert_base64(audio_base64)
            .map(|mp3| transcode::encode(&mp3))
            .map_err(log_failure)
    }

    /// Convert and store the MP3 in `cache`, returning its id.
    pub fn convert_and_cache<R: HandleRegistry>(
        &self,
        cache: &MediaCache<R>,
        audio_base64: &str,
    ) -> Result<String> {
        let mp3 = self.convert_base64(audio_base64).map_err(log_failure)?;
        Ok(cache.store(MediaKind::Audio, "mp3", mp3))
    }

    /// Run one conversion on a background thread.
    ///
    /// The receiver yields exactly one result. Dropping it discards the result;
    /// the conversion itself always runs to completion.
    pub fn spawn(&self, audio_base64: String) -> Receiver<Result<Vec<u8>>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let converter = *self;

        thread::spawn(move || {
            let result = converter.convert_base64(&audio_base64).map_err(log_failure);
            if tx.send(result).is_err() {
                log::debug!("Conversion result discarded by caller");
            }
        });

        rx
    }
}

fn log_failure(error: AudioError) -> AudioError {
    log::error!("Audio conversion failed [{}]: {}", error.code(), error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_base64(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        transcode::encode(&bytes)
    }

    #[test]
    fn headerless_pcm_converts() {
        let converter = AudioConverter::default();
        let mp3 = converter.convert_base64(&pcm_base64(&[0; 4800])).unwrap();
        assert!(!mp3.is_empty());
    }

    #[test]
    fn empty_payload_converts_to_empty_mp3() {
        let converter = AudioConverter::default();
        assert_eq!(converter.convert_to_mp3("").unwrap(), "");
    }

    #[test]
    fn invalid_base64_aborts() {
        let converter = AudioConverter::default();
        let err = converter.convert_to_mp3("***").unwrap_err();
        assert_eq!(err.code(), "invalid_encoding");
    }

    #[test]
    fn converted_audio_lands_in_cache() {
        let converter = AudioConverter::default();
        let cache = MediaCache::new(4);

        let id = converter
            .convert_and_cache(&cache, &pcm_base64(&[0; 2400]))
            .unwrap();
        let media = cache.get(&id).unwrap();
        assert_eq!(media.kind, MediaKind::Audio);
        assert_eq!(media.handle.mime(), "audio/mp3");
        assert!(media.size_bytes > 0);
    }

    #[test]
    fn background_conversion_matches_inline() {
        let converter = AudioConverter::default();
        let payload = pcm_base64(&[0; 4800]);

        let inline = converter.convert_base64(&payload).unwrap();
        let background = converter.spawn(payload).recv().unwrap().unwrap();
        assert_eq!(inline, background);
    }

    #[test]
    fn settings_follow_config() {
        let config = Config {
            bitrate: 64,
            default_channels: 2,
            ..Config::default()
        };
        let settings = ConvertSettings::from(&config);
        assert_eq!(settings.bitrate_kbps, 64);
        assert_eq!(settings.defaults.channels, 2);
    }
}
