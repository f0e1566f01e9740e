//! File and room fixtures.

use ingest_core::models::{MediaFile, TargetRecord};

pub const MIB: usize = 1024 * 1024;

pub fn image(name: &str) -> MediaFile {
    MediaFile::from_name(name, name.as_bytes().repeat(64))
}

pub fn video(name: &str, size: usize) -> MediaFile {
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    MediaFile::from_name(name, data)
}

/// `count` rooms of one category, named `{category} {n}`.
pub fn rooms(category: &str, count: usize) -> Vec<TargetRecord> {
    (1..=count)
        .map(|n| TargetRecord::new(format!("{} {}", category, n), category))
        .collect()
}
