//! Archive engine boundary.
//!
//! All container formats in the unwrap chain (installer package, PE resource
//! section, product payload archive) are opened by one general-purpose
//! engine. It is a trait so the unwrap chain can be exercised in tests with a
//! stub engine instead of real containers.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::process::Cmd;

/// Binary name of the host extraction tool.
pub const SEVEN_ZIP_BIN: &str = "7z";

/// Extracts entries from the container formats in the unwrap chain.
pub trait ArchiveEngine {
    /// Extract the single entry at `internal_path` from `container` into
    /// `dest_dir`, returning the path of the produced file.
    ///
    /// A container that opens fine but holds no such entry is an error; the
    /// caller decides which hop that kills.
    fn extract_entry(&self, container: &Path, internal_path: &str, dest_dir: &Path)
        -> Result<PathBuf>;

    /// Extract the full contents of `container` into `dest_dir`.
    fn extract_all(&self, container: &Path, dest_dir: &Path) -> Result<()>;
}

/// The real engine: `7z` on the host.
pub struct SevenZip;

impl ArchiveEngine for SevenZip {
    fn extract_entry(
        &self,
        container: &Path,
        internal_path: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)?;

        Cmd::new(SEVEN_ZIP_BIN)
            .args(["e", "-y"])
            .arg(format!("-o{}", dest_dir.display()))
            .arg_path(container)
            .arg(internal_path)
            .error_msg(format!(
                "7z could not extract {} from {}",
                internal_path,
                container.display()
            ))
            .run()?;

        // 7z exits zero even when the pattern matched nothing, so the
        // produced file is the real success signal.
        let file_name = internal_path
            .rsplit('/')
            .next()
            .expect("rsplit yields at least one element");
        let produced = dest_dir.join(file_name);
        if !produced.is_file() {
            bail!(
                "container {} has no entry {}",
                container.display(),
                internal_path
            );
        }
        Ok(produced)
    }

    fn extract_all(&self, container: &Path, dest_dir: &Path) -> Result<()> {
        fs::create_dir_all(dest_dir)?;

        Cmd::new(SEVEN_ZIP_BIN)
            .args(["x", "-y"])
            .arg(format!("-o{}", dest_dir.display()))
            .arg_path(container)
            .error_msg(format!("7z could not expand {}", container.display()))
            .run()
            .with_context(|| format!("expanding {}", container.display()))?;
        Ok(())
    }
}
