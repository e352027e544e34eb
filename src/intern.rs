//! Process-global interning of short map keys.
//!
//! Documents tend to repeat the same small set of keys, so the decoder
//! keeps a fixed-size direct-mapped table of previously seen key strings.
//! Slots are published write-once through `OnceLock`: concurrent readers
//! race at most one writer per slot and either see the published string or
//! fall through to the slow path. A hit clones the cached `Arc<str>`, so
//! every repeat of a key shares one validated allocation; a miss is
//! exactly the slow path. Results never differ either way.

use std::str::Utf8Error;
use std::sync::{Arc, OnceLock};

/// Keys longer than this skip the table entirely.
pub(crate) const MAX_KEY_LEN: usize = 64;

const SLOTS: usize = 512;

static TABLE: [OnceLock<Arc<str>>; SLOTS] = [const { OnceLock::new() }; SLOTS];

/// FNV-1a over the length and bytes of the key.
fn slot_of(bytes: &[u8]) -> usize {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    h ^= bytes.len() as u64;
    h = h.wrapping_mul(0x0000_0100_0000_01b3);
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (h as usize) & (SLOTS - 1)
}

/// Turn a raw key into shared text, consulting the intern table for short
/// keys.
pub(crate) fn intern_key(bytes: &[u8]) -> Result<Arc<str>, Utf8Error> {
    if bytes.len() > MAX_KEY_LEN {
        return Ok(Arc::from(std::str::from_utf8(bytes)?));
    }
    let slot = &TABLE[slot_of(bytes)];
    if let Some(cached) = slot.get() {
        if cached.as_bytes() == bytes {
            return Ok(cached.clone());
        }
        // Direct-mapped with write-once slots: a colliding key just takes
        // the slow path forever.
        return Ok(Arc::from(std::str::from_utf8(bytes)?));
    }
    let s: Arc<str> = Arc::from(std::str::from_utf8(bytes)?);
    let _ = slot.set(s.clone());
    Ok(s)
}
