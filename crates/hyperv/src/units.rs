//! Human-readable size strings.
//!
//! Sizes use PowerShell's binary multipliers: `1KB` is 1024 bytes, `1GB` is
//! 1073741824 bytes. Hyper-V reports memory and disk sizes as byte counts,
//! so every declared size is normalized with [`parse_size`] before it is
//! compared or rendered.

use crate::error::{Error, Result};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Parse human-readable size string (e.g., "512MB", "40GB", "1.5TB", "4096")
///
/// Supports suffixes: B, KB, MB, GB, TB (case-insensitive).
/// Returns bytes as u64.
pub fn parse_size(size_str: &str) -> Result<u64> {
    let normalized = size_str.trim().to_uppercase();

    if normalized.is_empty() {
        return Err(Error::InvalidSize("empty size string".to_string()));
    }

    let (num_str, multiplier) = if let Some(num) = normalized.strip_suffix("TB") {
        (num, TB)
    } else if let Some(num) = normalized.strip_suffix("GB") {
        (num, GB)
    } else if let Some(num) = normalized.strip_suffix("MB") {
        (num, MB)
    } else if let Some(num) = normalized.strip_suffix("KB") {
        (num, KB)
    } else if let Some(num) = normalized.strip_suffix('B') {
        (num, 1u64)
    } else {
        // Assume bytes if no suffix
        (normalized.as_str(), 1u64)
    };

    let num_str = num_str.trim();

    // Whole numbers stay exact
    if let Ok(whole) = num_str.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| Error::InvalidSize(format!("size out of range: '{}'", size_str)));
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| Error::InvalidSize(format!("invalid number in size: '{}'", size_str)))?;

    if !num.is_finite() || num < 0.0 {
        return Err(Error::InvalidSize(format!(
            "size cannot be negative: '{}'",
            size_str
        )));
    }

    Ok((num * multiplier as f64) as u64)
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= TB && bytes % TB == 0 {
        format!("{}TB", bytes / TB)
    } else if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{}B", bytes)
    }
}
