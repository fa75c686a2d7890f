//! Writing result documents to disk.
//!
//! Files are named `plausible_stats[_<tag>]_<YYYYMMDD_HHMMSS>.json` and never
//! overwritten; a numbered suffix is added when the name is taken.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_FILENAME_LEN: usize = 200;

const FILENAME_PREFIX: &str = "plausible_stats";
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make `name` safe to use as a single path component.
///
/// Reserved and control characters become `_`. Names longer than
/// [`MAX_FILENAME_LEN`] characters are cut down, keeping the extension.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return "output".to_string();
    }

    truncate_preserving_extension(cleaned, MAX_FILENAME_LEN)
}

fn truncate_preserving_extension(name: &str, max_len: usize) -> String {
    let len = name.chars().count();
    if len <= max_len {
        return name.to_string();
    }

    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            let ext_len = ext.chars().count() + 1;
            (ext_len < max_len).then(|| format!(".{}", ext))
        }
        _ => None,
    };

    match ext {
        Some(ext) => {
            let keep = max_len - ext.chars().count();
            let stem: String = name.chars().take(keep).collect();
            format!("{}{}", stem, ext)
        }
        None => name.chars().take(max_len).collect(),
    }
}

/// Build the file name for a result document written at `now`.
pub fn output_filename(tag: Option<&str>, now: DateTime<Local>) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    let name = match tag {
        Some(tag) => format!("{}_{}_{}.json", FILENAME_PREFIX, tag, timestamp),
        None => format!("{}_{}.json", FILENAME_PREFIX, timestamp),
    };
    sanitize_filename(&name)
}

/// First path in `dir` named `file_name` (or `stem-N.ext`) that does not exist.
pub fn find_available_file_path(dir: &Path, file_name: &str) -> PathBuf {
    let mut candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let ext = candidate
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("json")
        .to_string();
    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(FILENAME_PREFIX)
        .to_string();

    for i in 2..1000 {
        candidate = dir.join(format!("{}-{}.{}", stem, i, ext));
        if !candidate.exists() {
            return candidate;
        }
    }

    let nanos = Local::now().timestamp_nanos_opt().unwrap_or_default();
    dir.join(format!("{}-{}.{}", stem, nanos, ext))
}

/// Serialize `data` as 2-space indented JSON into `dir`.
///
/// Creates `dir` if needed and returns the path written.
pub fn save_json<T: Serialize>(data: &T, dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = find_available_file_path(dir, &sanitize_filename(file_name));
    let mut json = serde_json::to_string_pretty(data).context("Failed to serialize output")?;
    json.push('\n');

    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
