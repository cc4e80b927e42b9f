//! Final image capture.
//!
//! The composed staging root is handed to `wimlib-imagex` exactly once,
//! requesting solid LZMS compression (the highest ratio the deployment tool
//! accepts). The image's internal root corresponds 1:1 to the staging root.

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::feed::Arch;
use crate::process::Cmd;

/// Binary name of the host capture tool.
pub const WIMLIB_BIN: &str = "wimlib-imagex";

/// File name of the final image for an architecture.
pub fn image_file_name(arch: Arch) -> String {
    format!("image-{}.wim", arch)
}

/// Capture `staging_root` into a WIM at `output`, labelled `image_name`.
pub fn capture(staging_root: &Path, output: &Path, image_name: &str) -> Result<()> {
    Cmd::new(WIMLIB_BIN)
        .arg("capture")
        .arg_path(staging_root)
        .arg_path(output)
        .arg(image_name)
        .args(["--compress=LZMS", "--solid"])
        .error_msg("wimlib-imagex capture failed")
        .run()
        .map_err(|e| PipelineError::Packaging {
            reason: format!("{e:#}"),
        })?;
    Ok(())
}
