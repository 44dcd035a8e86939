use crate::error::AutocapResult;
use crate::transcript::{TranscribeOptions, TranscriptionProvider, Word};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

/// Transcribe with file-based caching.
///
/// Cache key is SHA-256 of `"{provider}\0{language}\0{punctuate}\0"` followed
/// by the raw media bytes. Entries are stored as `<cache_dir>/<hash>.json`.
pub fn transcribe_cached(
    provider: &dyn TranscriptionProvider,
    media: &[u8],
    mime_type: &str,
    options: &TranscribeOptions,
    cache_dir: &Path,
) -> AutocapResult<Vec<Word>> {
    let hash = cache_key(provider.provider_name(), options, media);
    let entry = cache_dir.join(format!("{hash}.json"));

    if let Some(words) = read_entry(&entry) {
        debug!("Transcript cache hit: {}", entry.display());
        return Ok(words);
    }

    let words = provider.transcribe(media, mime_type, options)?;

    if let Err(e) = std::fs::create_dir_all(cache_dir).and_then(|_| write_entry(&entry, &words)) {
        warn!("Failed to write transcript cache {}: {e}", entry.display());
    }

    Ok(words)
}

fn cache_key(provider_name: &str, options: &TranscribeOptions, media: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{provider_name}\0{}\0{}\0", options.language, options.punctuate));
    hasher.update(media);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Read a cached word list. Returns `None` on any error so a corrupt entry is refetched.
fn read_entry(path: &Path) -> Option<Vec<Word>> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_entry(path: &Path, words: &[Word]) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(words).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}
