//! Media handle cache
//!
//! Maps an opaque id to a generated image or audio artifact. Each artifact's
//! bytes live behind a [`MediaHandle`] issued by a [`HandleRegistry`]; the cache
//! releases the handle when the entry is removed, evicted or cleared, and on
//! drop. Capacity is bounded with least-recently-used eviction.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::transcode;

pub const DEFAULT_CAPACITY: usize = 100;

const HANDLE_SCHEME: &str = "media://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// MIME type for a format such as `png` or `mp3`.
    pub fn mime(self, format: &str) -> String {
        format!("{}/{}", self.as_str(), format)
    }
}

/// Addressable reference to bytes held by a [`HandleRegistry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    url: String,
    mime: String,
}

impl MediaHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }
}

/// Issues and releases media handles.
pub trait HandleRegistry: Send + Sync {
    fn create(&self, id: &str, mime: &str, bytes: Vec<u8>) -> MediaHandle;

    /// Releasing an unknown or already-released handle is a no-op.
    fn release(&self, handle: &MediaHandle);
}

/// Registry keeping blobs in process memory
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    blobs: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes behind a live handle URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.blobs.lock().get(url).cloned()
    }

    /// Number of handles not yet released.
    pub fn live_handles(&self) -> usize {
        self.blobs.lock().len()
    }
}

impl HandleRegistry for InMemoryRegistry {
    fn create(&self, id: &str, mime: &str, bytes: Vec<u8>) -> MediaHandle {
        let url = format!("{}{}", HANDLE_SCHEME, id);
        self.blobs.lock().insert(url.clone(), Arc::from(bytes));
        MediaHandle {
            url,
            mime: mime.to_string(),
        }
    }

    fn release(&self, handle: &MediaHandle) {
        self.blobs.lock().remove(&handle.url);
    }
}

/// A cached artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMedia {
    pub id: String,
    pub kind: MediaKind,
    pub format: String,
    pub handle: MediaHandle,
    /// Refreshed on every read.
    pub created_at: SystemTime,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheItemStats {
    pub id: String,
    pub kind: MediaKind,
    pub format: String,
    pub size: usize,
    pub timestamp_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_items: usize,
    pub total_size: usize,
    pub formatted_size: String,
    pub items: Vec<CacheItemStats>,
}

struct Slot {
    media: CachedMedia,
    last_access: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Slot>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded LRU cache of media handles
pub struct MediaCache<R: HandleRegistry = InMemoryRegistry> {
    registry: Arc<R>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl MediaCache<InMemoryRegistry> {
    pub fn new(capacity: usize) -> Self {
        Self::with_registry(capacity, Arc::new(InMemoryRegistry::new()))
    }
}

impl Default for MediaCache<InMemoryRegistry> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<R: HandleRegistry> MediaCache<R> {
    pub fn with_registry(capacity: usize, registry: Arc<R>) -> Self {
        Self {
            registry,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store an artifact and return its id, evicting the least recently
    /// used entry when full.
    pub fn store(&self, kind: MediaKind, format: &str, bytes: Vec<u8>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let size_bytes = bytes.len();
        let handle = self.registry.create(&id, &kind.mime(format), bytes);

        let media = CachedMedia {
            id: id.clone(),
            kind,
            format: format.to_string(),
            handle,
            created_at: SystemTime::now(),
            size_bytes,
        };

        let mut state = self.state.lock();
        while state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(id, _)| id.clone());
            match oldest.and_then(|oldest| state.entries.remove(&oldest)) {
                Some(evicted) => {
                    log::debug!("Evicting cached media {}", evicted.media.id);
                    self.registry.release(&evicted.media.handle);
                }
                None => break,
            }
        }
        let last_access = state.tick();
        state.entries.insert(id.clone(), Slot { media, last_access });

        log::debug!(
            "Cached media {} ({}, {})",
            id,
            kind.as_str(),
            format_size(size_bytes)
        );
        id
    }

    /// Decode a Base64 payload (data-URL prefix allowed) and store it.
    pub fn store_base64(&self, kind: MediaKind, format: &str, text: &str) -> Result<String> {
        let bytes = transcode::decode(text)?;
        Ok(self.store(kind, format, bytes))
    }

    /// Look up an entry, marking it as recently used.
    pub fn get(&self, id: &str) -> Option<CachedMedia> {
        let mut state = self.state.lock();
        let tick = state.tick();
        let slot = state.entries.get_mut(id)?;
        slot.last_access = tick;
        slot.media.created_at = SystemTime::now();
        Some(slot.media.clone())
    }

    /// Handle URL of an entry, marking it as recently used.
    pub fn url(&self, id: &str) -> Option<String> {
        self.get(id).map(|media| media.handle.url)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().entries.contains_key(id)
    }

    pub fn remove(&self, id: &str) {
        let removed = self.state.lock().entries.remove(id);
        if let Some(slot) = removed {
            self.registry.release(&slot.media.handle);
        }
    }

    /// Remove every entry and release all handles.
    pub fn clear(&self) {
        let drained: Vec<Slot> = self.state.lock().entries.drain().map(|(_, slot)| slot).collect();
        for slot in &drained {
            self.registry.release(&slot.media.handle);
        }
        if !drained.is_empty() {
            log::debug!("Released {} cached media handles", drained.len());
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut slots: Vec<&Slot> = state.entries.values().collect();
        slots.sort_by_key(|slot| slot.last_access);

        let items: Vec<CacheItemStats> = slots
            .iter()
            .map(|slot| CacheItemStats {
                id: slot.media.id.clone(),
                kind: slot.media.kind,
                format: slot.media.format.clone(),
                size: slot.media.size_bytes,
                timestamp_ms: slot
                    .media
                    .created_at
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0),
            })
            .collect();
        let total_size = items.iter().map(|item| item.size).sum();

        CacheStats {
            total_items: items.len(),
            total_size,
            formatted_size: format_size(total_size),
            items,
        }
    }
}

impl<R: HandleRegistry> Drop for MediaCache<R> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Human-readable size, e.g. `1.5 KB`.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
