//! Test fixtures and data generators

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use mememori_core::{ItemId, PendingFile, UserId};

pub const ALICE: UserId = UserId::new(1);
pub const BOB: UserId = UserId::new(2);

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// An item id no other test uses
pub fn unique_item() -> ItemId {
    ItemId::new(format!("item-{}", unique_suffix()))
}

/// UTC instant for seeded rows
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A small PNG-looking file
pub fn photo() -> PendingFile {
    PendingFile::new("photo.png", "image/png", vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a])
}

/// A short recorded clip
pub fn voice_clip() -> Vec<u8> {
    vec![0x1a, 0x45, 0xdf, 0xa3, 0x00, 0x01]
}
