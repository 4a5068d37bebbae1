#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

// 2021-06-15 12:00:00 UTC
pub const MID_JUNE_2021: u64 = 1_623_758_400;

/// Minimal little-endian TIFF stream with a single IFD0 `DateTime` entry.
pub fn tiff_with_datetime(date: &str) -> Vec<u8> {
    let mut value = date.as_bytes().to_vec();
    value.push(0);
    let value_offset: u32 = 8 + 2 + 12 + 4;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&42u16.to_le_bytes());
    buf.extend_from_slice(&8u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&0x0132u16.to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(&value_offset.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&value);
    buf
}

pub fn set_mtime(path: &Path, unix_secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(unix_secs))
        .unwrap();
}

/// Source tree with 3 images, 2 videos and one unrelated text file.
///
/// `a.jpg` and `b.jpg` carry EXIF dates; the rest rely on modification time.
pub fn setup_mixed_source(temp_dir: &TempDir) -> ChildPath {
    let source = temp_dir.child("source");
    source
        .child("a.jpg")
        .write_binary(&tiff_with_datetime("2024:03:09 08:00:00"))
        .unwrap();
    source
        .child("trip/b.jpg")
        .write_binary(&tiff_with_datetime("2023:12:31 23:59:59"))
        .unwrap();
    source.child("trip/c.png").write_str("no exif here").unwrap();
    source.child("clips/d.mp4").write_str("video").unwrap();
    source.child("clips/e.MOV").write_str("video").unwrap();
    source.child("notes.txt").write_str("not media").unwrap();

    for name in ["trip/c.png", "clips/d.mp4", "clips/e.MOV"] {
        set_mtime(source.child(name).path(), MID_JUNE_2021);
    }
    source
}

pub fn mediabackup_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mediabackup").unwrap();
    cmd.current_dir(temp_dir.path());
    cmd
}
