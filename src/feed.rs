//! Release feed model and resolution.
//!
//! The vendor feed is a JSON list of products; each product carries a channel
//! name and releases, each release carries platform/architecture/version and
//! artifacts, each artifact a type tag, download location, hash, and hash
//! algorithm. Resolution walks that shape with ordered first-match selection
//! at every level, kept as pure functions so the selection rules are testable
//! without a network.
//!
//! The feed shape is load-bearing: a missing match means the upstream changed
//! and a human has to look, so every miss is a fatal resolution error.

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::fetch;

/// Channel selected from the product list.
pub const STABLE_CHANNEL: &str = "stable";

/// Artifact type tag of the downloadable installer package.
pub const INSTALLER_ARTIFACT: &str = "installer-package";

/// The only platform the deployment tool consumes images for.
pub const PLATFORM: &str = "Windows";

/// CPU architectures the upstream feed publishes installers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Arch {
    X64,
    X86,
    Arm64,
}

impl Arch {
    /// Architecture tag as the feed spells it.
    pub fn feed_name(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.feed_name())
    }
}

/// Digest algorithm the feed publishes for an artifact.
///
/// The feed currently publishes SHA-256 only; an unrecognized tag fails the
/// whole resolution rather than being guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA256", alias = "sha256", alias = "Sha256")]
    Sha256,
}

/// One downloadable file published by the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub hash: String,
    pub hash_algorithm: HashAlgorithm,
}

/// One published release of a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub platform: String,
    pub architecture: String,
    pub product_version: String,
    pub artifacts: Vec<Artifact>,
}

/// One product line in the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub channel: String,
    pub releases: Vec<Release>,
}

/// Everything downstream stages need to know about the selected release.
#[derive(Debug, Clone)]
pub struct ReleaseDescriptor {
    pub product_version: String,
    pub platform: String,
    pub architecture: String,
    pub artifact_url: String,
    pub hash_algorithm: HashAlgorithm,
    pub expected_hash: String,
}

/// Fetch and parse the product list from the feed.
pub fn fetch_products(url: &str) -> Result<Vec<Product>> {
    let body = fetch::fetch_text(url)?;
    serde_json::from_str(&body).map_err(|e| PipelineError::Resolution {
        reason: format!("feed at {} is not the expected shape: {}", url, e),
    })
}

/// Resolve the release descriptor for the requested architecture.
///
/// Given identical feed content this is deterministic: duplicates at any
/// level resolve to the first match in feed order.
pub fn resolve(products: &[Product], arch: Arch) -> Result<ReleaseDescriptor> {
    let product = select_stable(products)?;
    let release = select_release(product, PLATFORM, arch.feed_name())?;
    let artifact = select_artifact(release)?;

    Ok(ReleaseDescriptor {
        product_version: release.product_version.clone(),
        platform: release.platform.clone(),
        architecture: release.architecture.clone(),
        artifact_url: artifact.location.clone(),
        hash_algorithm: artifact.hash_algorithm,
        expected_hash: artifact.hash.clone(),
    })
}

/// First product on the stable channel, in feed order.
fn select_stable(products: &[Product]) -> Result<&Product> {
    products
        .iter()
        .find(|p| p.channel == STABLE_CHANNEL)
        .ok_or_else(|| PipelineError::Resolution {
            reason: format!("no product on channel \"{}\"", STABLE_CHANNEL),
        })
}

/// First release matching the requested platform and architecture.
fn select_release<'a>(product: &'a Product, platform: &str, arch: &str) -> Result<&'a Release> {
    product
        .releases
        .iter()
        .find(|r| r.platform == platform && r.architecture == arch)
        .ok_or_else(|| PipelineError::Resolution {
            reason: format!("no {} release for architecture {}", platform, arch),
        })
}

/// First artifact of the installer-package type.
fn select_artifact(release: &Release) -> Result<&Artifact> {
    release
        .artifacts
        .iter()
        .find(|a| a.kind == INSTALLER_ARTIFACT)
        .ok_or_else(|| PipelineError::Resolution {
            reason: format!(
                "release {} has no \"{}\" artifact",
                release.product_version, INSTALLER_ARTIFACT
            ),
        })
}
