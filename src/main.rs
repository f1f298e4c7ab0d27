//! VoxCast - convert speech-synthesis audio to MP3
//!
//! Usage: `voxcast <input> [output.mp3]`
//!
//! Inputs ending in `.b64` or `.txt` are read as Base64 text (data-URL
//! prefixes allowed); anything else is read as WAV or headerless PCM bytes.

use std::fs;
use std::path::{Path, PathBuf};

use voxcast::cache::MediaKind;
use voxcast::{AudioConverter, Config, ConvertSettings, MediaCache};

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(Some(env_logger::TimestampPrecision::Seconds))
        .init();

    let config = Config::load();
    log::info!(
        "Configuration: bitrate={}kbps, headerless={}ch@{}Hz",
        config.bitrate,
        config.default_channels,
        config.default_sample_rate
    );

    if let Err(e) = run(config) {
        log::error!("Application error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: voxcast <input> [output.mp3]")?;
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension("mp3"));

    let converter = AudioConverter::new(ConvertSettings::from(&config));
    let cache = MediaCache::new(config.cache_capacity);

    let id = if is_base64_input(&input) {
        let text = fs::read_to_string(&input)?;
        converter.convert_and_cache(&cache, &text)?
    } else {
        let bytes = fs::read(&input)?;
        let mp3 = converter.convert_bytes(&bytes)?;
        cache.store(MediaKind::Audio, "mp3", mp3)
    };

    let media = cache.get(&id).ok_or("converted audio missing from cache")?;
    let mp3 = cache
        .registry()
        .resolve(media.handle.url())
        .ok_or("converted audio handle already released")?;
    fs::write(&output, &mp3[..])?;

    log::info!("Wrote {:?} ({})", output, voxcast::cache::format_size(media.size_bytes));
    log::debug!("Cache: {}", serde_json::to_string(&cache.stats())?);
    Ok(())
}

fn is_base64_input(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("b64") | Some("txt")
    )
}
