//! File-version discovery for the update-agent executable.
//!
//! The agent's build stamps a `VS_FIXEDFILEINFO` block into the executable's
//! version resource. Rather than walking the PE resource directory, the block
//! is located by its fixed signature dword; the four-part file version sits
//! in the two dwords that follow the structure version.
//!
//! The discovered version becomes a path segment in the composed layout, so a
//! missing or zero version is fatal here, before any path is built from it.

use std::fs;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// `VS_FIXEDFILEINFO.dwSignature`.
const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;

/// Bytes needed from the signature through `dwFileVersionLS`.
const FIXED_INFO_PREFIX_LEN: usize = 16;

/// Read the embedded file version of `path`, formatted `a.b.c.d`.
pub fn discover(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    scan_fixed_file_info(&data).ok_or_else(|| PipelineError::Metadata {
        path: path.to_path_buf(),
    })
}

/// Find the fixed-file-info block and extract a non-zero file version.
fn scan_fixed_file_info(data: &[u8]) -> Option<String> {
    let signature = FIXED_FILE_INFO_SIGNATURE.to_le_bytes();

    let mut offset = 0;
    while offset + FIXED_INFO_PREFIX_LEN <= data.len() {
        let Some(found) = find_bytes(&data[offset..], &signature) else {
            return None;
        };
        let start = offset + found;
        if start + FIXED_INFO_PREFIX_LEN > data.len() {
            return None;
        }

        let word = |i: usize| {
            u32::from_le_bytes([
                data[start + i],
                data[start + i + 1],
                data[start + i + 2],
                data[start + i + 3],
            ])
        };
        let version_ms = word(8);
        let version_ls = word(12);

        if version_ms != 0 || version_ls != 0 {
            return Some(format!(
                "{}.{}.{}.{}",
                version_ms >> 16,
                version_ms & 0xFFFF,
                version_ls >> 16,
                version_ls & 0xFFFF
            ));
        }

        // A zero version is as useless as no block at all; keep scanning in
        // case a later resource section carries the real one.
        offset = start + 4;
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
