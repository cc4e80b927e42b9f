//! Filter-stream decoder for the setup stub's embedded resource.
//!
//! The resource blob is LZMA-alone compressed. Its decompressed payload is a
//! 20-byte little-endian header (final output size plus the four BCJ2 stream
//! sizes) followed by the streams themselves; reversing the BCJ2 filter
//! yields a tar archive that is materialized directly into the destination
//! directory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::bcj2;

/// Framing header in front of the BCJ2 streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Size of the decoded output.
    pub original_size: u32,
    /// Main bytecode stream size.
    pub main_size: u32,
    /// CALL address stream size.
    pub call_size: u32,
    /// JMP/JCC address stream size.
    pub jump_size: u32,
    /// Range coder bitstream size.
    pub rc_size: u32,
}

impl StreamHeader {
    /// Encoded header length in bytes.
    pub const LEN: usize = 20;

    /// Parse the header off the front of the decompressed payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            bail!(
                "payload too small for stream header: {} bytes, need {}",
                data.len(),
                Self::LEN
            );
        }
        let word = |i: usize| {
            u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
        };
        Ok(Self {
            original_size: word(0),
            main_size: word(4),
            call_size: word(8),
            jump_size: word(12),
            rc_size: word(16),
        })
    }

    /// Slice the four streams out of the payload following the header.
    pub fn split<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8], &'a [u8], &'a [u8])> {
        let expected = self.main_size as usize
            + self.call_size as usize
            + self.jump_size as usize
            + self.rc_size as usize;
        let available = data.len() - Self::LEN;
        if expected != available {
            bail!(
                "stream sizes disagree with payload: header says {} bytes, have {}",
                expected,
                available
            );
        }

        let mut pos = Self::LEN;
        let mut take = |len: usize| {
            let slice = &data[pos..pos + len];
            pos += len;
            slice
        };
        Ok((
            take(self.main_size as usize),
            take(self.call_size as usize),
            take(self.jump_size as usize),
            take(self.rc_size as usize),
        ))
    }
}

/// Decode the resource blob at `blob` and materialize its tar contents under
/// `dest`.
pub fn decode(blob: &Path, dest: &Path) -> Result<()> {
    let raw = fs::read(blob).with_context(|| format!("Failed to read {}", blob.display()))?;

    let plain = lzma_decompress(&raw).context("LZMA decompression of resource blob failed")?;
    let header = StreamHeader::parse(&plain)?;
    let (main, call, jump, rc) = header.split(&plain)?;

    let tar_bytes = bcj2::decode(main, call, jump, rc, header.original_size as usize)
        .context("BCJ2 filter reversal failed")?;

    fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    archive
        .unpack(dest)
        .with_context(|| format!("Failed to unpack decoded tar into {}", dest.display()))?;
    Ok(())
}

/// Decompress an LZMA-alone stream in memory.
fn lzma_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)?;
    let mut decoder = xz2::read::XzDecoder::new_stream(data, stream);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
