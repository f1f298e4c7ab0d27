//! VoxCast - speech-synthesis audio to downloadable MP3
//!
//! Takes the audio payload of a generative-AI speech response (Base64 WAV or
//! headerless 16-bit PCM), encodes it to MP3 and keeps generated media in a
//! bounded handle cache.
//!
//! - `transcode`: Base64 in and out, data-URL tolerant
//! - `pcm`: RIFF/WAVE and headerless PCM parsing
//! - `encoder`: LAME-backed MP3 encoding driver
//! - `cache`: LRU cache of media handles
//! - `converter`: the whole pipeline, inline or on a background thread

pub mod cache;
pub mod config;
pub mod constants;
pub mod converter;
pub mod encoder;
pub mod error;
pub mod pcm;
pub mod transcode;

pub use cache::{CachedMedia, MediaCache, MediaKind};
pub use config::Config;
pub use converter::{AudioConverter, ConvertSettings};
pub use error::{AudioError, Result};
pub use pcm::{PcmDefaults, PcmStream};
