//! Nested-container unwrap chain.
//!
//! The vendor nests its product four containers deep: the installer package
//! carries a setup executable as a named binary entry; the setup executable
//! carries a compressed blob in its resource section; the blob decodes to a
//! tar stream of update-agent files plus the product installer; the product
//! installer finally carries the payload archive with the actual product
//! tree. Each hop expects exactly one named entry, and a miss at any hop
//! means the upstream packaging changed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveEngine;
use crate::decoder;
use crate::error::{Hop, PipelineError, Result};

/// Internal path of the setup executable inside the installer package.
pub const PACKAGE_SETUP_ENTRY: &str = "Binary.UpdateSetup";

/// Name the extracted setup binary is given to make it addressable as a PE.
pub const SETUP_EXE_NAME: &str = "UpdateSetup.exe";

/// Locale-neutral resource identifier path of the compressed payload blob
/// inside the setup executable's resource section.
pub const RESOURCE_ENTRY: &str = ".rsrc/B/102";

/// Suffix of the one agent-tree file that is the product installer with the
/// update agent stripped off. The rest of the name is version-templated and
/// changes every release.
pub const INSTALLER_SUFFIX: &str = "_untagged.exe";

/// Fixed name the product installer is relocated to.
pub const INSTALLER_NAME: &str = "installer.exe";

/// Informational packaging manifest in the agent tree; discarded.
pub const MANIFEST_NAME: &str = "manifest.xml";

/// The update-agent executable whose file version names the agent directory
/// in the composed layout.
pub const UPDATE_AGENT_EXE: &str = "UpdateAgent.exe";

/// Internal entry of the product payload archive inside the installer.
pub const PAYLOAD_ENTRY: &str = "app.7z";

/// Root directory the payload archive expands to.
pub const PAYLOAD_ROOT: &str = "app";

fn unwrap_err(hop: Hop, entry: &str, err: anyhow::Error) -> PipelineError {
    PipelineError::Unwrap {
        hop,
        entry: entry.to_string(),
        reason: format!("{err:#}"),
    }
}

/// Hop 1: extract the setup binary from the installer package and rename it
/// to an executable.
pub fn extract_setup(
    engine: &dyn ArchiveEngine,
    package: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    let produced = engine
        .extract_entry(package, PACKAGE_SETUP_ENTRY, work_dir)
        .map_err(|e| unwrap_err(Hop::Package, PACKAGE_SETUP_ENTRY, e))?;

    let setup = work_dir.join(SETUP_EXE_NAME);
    fs::rename(&produced, &setup)?;
    Ok(setup)
}

/// Hop 2: extract the compressed resource blob from the setup executable's
/// resource section.
pub fn extract_resource(
    engine: &dyn ArchiveEngine,
    setup: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    engine
        .extract_entry(setup, RESOURCE_ENTRY, work_dir)
        .map_err(|e| unwrap_err(Hop::Resource, RESOURCE_ENTRY, e))
}

/// Hop 3: decode the resource blob and materialize the agent tree.
pub fn decode_resource(blob: &Path, agent_dir: &Path) -> Result<()> {
    decoder::decode(blob, agent_dir).map_err(|e| unwrap_err(Hop::FilterStream, RESOURCE_ENTRY, e))
}

/// Hop 4: relocate the product installer to its fixed name and drop the
/// packaging manifest, leaving the agent file set behind.
pub fn relocate_installer(agent_dir: &Path) -> Result<PathBuf> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(agent_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(INSTALLER_SUFFIX) {
            matches.push(entry.path());
        }
    }

    let pattern = format!("*{}", INSTALLER_SUFFIX);
    let source = match matches.as_slice() {
        [single] => single.clone(),
        [] => {
            return Err(PipelineError::Unwrap {
                hop: Hop::AgentTree,
                entry: pattern,
                reason: "no matching file in decoded tree".to_string(),
            })
        }
        many => {
            return Err(PipelineError::Unwrap {
                hop: Hop::AgentTree,
                entry: pattern,
                reason: format!("{} matching files, expected exactly one", many.len()),
            })
        }
    };

    let installer = agent_dir.join(INSTALLER_NAME);
    fs::rename(&source, &installer)?;

    let manifest = agent_dir.join(MANIFEST_NAME);
    if manifest.exists() {
        fs::remove_file(&manifest)?;
    }

    Ok(installer)
}

/// Extract the product payload archive from the relocated installer.
pub fn extract_payload_archive(
    engine: &dyn ArchiveEngine,
    installer: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    engine
        .extract_entry(installer, PAYLOAD_ENTRY, work_dir)
        .map_err(|e| unwrap_err(Hop::ProductPayload, PAYLOAD_ENTRY, e))
}

/// Fully expand the payload archive and return the product tree root.
pub fn expand_payload(
    engine: &dyn ArchiveEngine,
    archive: &Path,
    payload_dir: &Path,
) -> Result<PathBuf> {
    engine
        .extract_all(archive, payload_dir)
        .map_err(|e| unwrap_err(Hop::ProductPayload, PAYLOAD_ENTRY, e))?;

    let product_root = payload_dir.join(PAYLOAD_ROOT);
    if !product_root.is_dir() {
        return Err(PipelineError::Unwrap {
            hop: Hop::ProductPayload,
            entry: PAYLOAD_ROOT.to_string(),
            reason: "payload archive did not expand to the expected root".to_string(),
        });
    }
    Ok(product_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn agent_tree(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for name in files {
            fs::write(tmp.path().join(name), name).unwrap();
        }
        tmp
    }

    #[test]
    fn relocates_single_installer_and_drops_manifest() {
        let tmp = agent_tree(&[
            "UpdateAgent.exe",
            "UpdateAgentBroker.exe",
            "product_120.0.1.1_x64_untagged.exe",
            "manifest.xml",
        ]);

        let installer = relocate_installer(tmp.path()).unwrap();
        assert_eq!(installer, tmp.path().join("installer.exe"));
        assert!(installer.is_file());
        assert!(!tmp.path().join("product_120.0.1.1_x64_untagged.exe").exists());
        assert!(!tmp.path().join("manifest.xml").exists());
        assert!(tmp.path().join("UpdateAgent.exe").exists());
    }

    #[test]
    fn missing_installer_is_agent_tree_unwrap_error() {
        let tmp = agent_tree(&["UpdateAgent.exe", "manifest.xml"]);

        let err = relocate_installer(tmp.path()).unwrap_err();
        match err {
            PipelineError::Unwrap { hop, entry, .. } => {
                assert_eq!(hop, Hop::AgentTree);
                assert!(entry.contains("_untagged.exe"));
            }
            other => panic!("expected Unwrap error, got {other}"),
        }
    }

    #[test]
    fn ambiguous_installer_match_is_an_error() {
        let tmp = agent_tree(&["a_untagged.exe", "b_untagged.exe"]);

        let err = relocate_installer(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn missing_manifest_is_tolerated() {
        // The manifest is informational and discarded anyway; its absence
        // does not change anything downstream.
        let tmp = agent_tree(&["UpdateAgent.exe", "product_1_untagged.exe"]);
        relocate_installer(tmp.path()).unwrap();
        assert!(tmp.path().join("installer.exe").is_file());
    }
}
