//! Pipeline orchestration.
//!
//! Stages run strictly in sequence; each stage's output is wrapped in an
//! [`Intermediate`] that the orchestrator retires as soon as the consuming
//! stage has succeeded, so at most one generation of intermediate artifacts
//! exists on disk at a time. On failure the run aborts immediately and
//! whatever intermediates exist are left in place for inspection.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveEngine, SevenZip};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::feed::{self, Arch, ReleaseDescriptor, STABLE_CHANNEL};
use crate::fetch;
use crate::fsutil;
use crate::layout::{self, ComponentVersionSet};
use crate::packager;
use crate::pe_version;
use crate::unwrap::{self, UPDATE_AGENT_EXE};

/// File the resolved product version is written to in check-only mode.
pub const VERSION_FILE: &str = "product-version.txt";

/// Download target name for the installer package.
const PACKAGE_FILE: &str = "package.msi";
/// Decoded agent tree directory under the work dir.
const AGENT_DIR: &str = "agent";
/// Expanded product payload directory under the work dir.
const PAYLOAD_DIR: &str = "payload";
/// Composed staging root under the work dir.
const STAGING_DIR: &str = "staging";

/// One stage output, owned until its consumer has finished with it.
///
/// Retirement is explicit rather than drop-based: a failed run must leave
/// intermediates on disk, so nothing is deleted unless the orchestrator says
/// the consuming stage succeeded.
pub struct Intermediate {
    path: PathBuf,
}

impl Intermediate {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact now that its consumer has succeeded.
    pub fn retire(self) {
        let result = if self.path.is_dir() {
            fs::remove_dir_all(&self.path)
        } else {
            fs::remove_file(&self.path)
        };
        if let Err(e) = result {
            eprintln!(
                "  [WARN] Failed to remove intermediate {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Run the pipeline for one architecture.
pub fn run(config: &Config, arch: Arch, check_only: bool) -> Result<()> {
    println!("Resolving {} release for {}...", STABLE_CHANNEL, arch);
    let products = feed::fetch_products(&config.feed_url)?;
    let descriptor = feed::resolve(&products, arch)?;
    println!("  Product version: {}", descriptor.product_version);

    if check_only {
        return write_version_file(&descriptor, &config.output_dir);
    }

    run_repackage(config, arch, &descriptor, &SevenZip)
}

/// Check-only mode: record the resolved version and touch nothing else.
pub fn write_version_file(descriptor: &ReleaseDescriptor, output_dir: &Path) -> Result<()> {
    let path = output_dir.join(VERSION_FILE);
    fsutil::write_file_with_dirs(&path, &descriptor.product_version)
        .map_err(|e| PipelineError::Io(std::io::Error::other(format!("{e:#}"))))?;
    println!("Wrote resolved version to {}", path.display());
    Ok(())
}

fn run_repackage(
    config: &Config,
    arch: Arch,
    descriptor: &ReleaseDescriptor,
    engine: &dyn ArchiveEngine,
) -> Result<()> {
    fsutil::reset_dir(&config.work_dir)
        .map_err(|e| PipelineError::Io(std::io::Error::other(format!("{e:#}"))))?;
    fs::create_dir_all(&config.output_dir)?;
    let work = config.work_dir.as_path();

    let verified = fetch::download_and_verify(descriptor, &work.join(PACKAGE_FILE))?;
    let package = Intermediate::new(verified.path().to_path_buf());

    println!("Unwrapping installer package...");
    let setup = Intermediate::new(unwrap::extract_setup(engine, package.path(), work)?);
    package.retire();

    let blob = Intermediate::new(unwrap::extract_resource(engine, setup.path(), work)?);
    setup.retire();

    let agent_dir = work.join(AGENT_DIR);
    unwrap::decode_resource(blob.path(), &agent_dir)?;
    blob.retire();
    let agent_tree = Intermediate::new(agent_dir.clone());

    let installer = Intermediate::new(unwrap::relocate_installer(&agent_dir)?);

    let agent_version = pe_version::discover(&agent_dir.join(UPDATE_AGENT_EXE))?;
    println!("  Update agent version: {}", agent_version);
    let versions = ComponentVersionSet::new(descriptor.product_version.clone(), agent_version)?;

    println!("Extracting product payload...");
    let payload_archive =
        Intermediate::new(unwrap::extract_payload_archive(engine, installer.path(), work)?);
    // The relocated installer leaves the agent tree here so the remaining
    // files are exactly the agent file set the layout expects.
    installer.retire();

    let payload_dir = work.join(PAYLOAD_DIR);
    let product_dir = unwrap::expand_payload(engine, payload_archive.path(), &payload_dir)?;
    payload_archive.retire();
    let payload_tree = Intermediate::new(payload_dir.clone());

    println!("Composing deployment layout...");
    let staging = work.join(STAGING_DIR);
    layout::compose(&versions, &agent_dir, &product_dir, &staging)?;
    agent_tree.retire();
    payload_tree.retire();

    println!("Capturing image...");
    let image_path = config.output_dir.join(packager::image_file_name(arch));
    packager::capture(&staging, &image_path, &versions.product)?;
    Intermediate::new(staging).retire();

    println!("Image written to {}", image_path.display());
    Ok(())
}
