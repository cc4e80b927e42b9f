//! Artifact download and integrity gate.
//!
//! Downloads the installer package named by the release descriptor and
//! verifies its digest before anything else is allowed to touch it. The
//! [`VerifiedArtifact`] type is only constructible here, after the comparison
//! has passed, so downstream stages cannot accidentally consume an unverified
//! file.
//!
//! Nothing is retried: the tool runs one-shot under a scheduler with its own
//! retry policy, and a transient fetch failure should surface there.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::feed::{HashAlgorithm, ReleaseDescriptor};

/// Connect timeout for feed and artifact requests. No global timeout: the
/// installer package is large and download time varies with the mirror.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// A downloaded installer package whose digest matched the feed's.
#[derive(Debug)]
pub struct VerifiedArtifact {
    path: PathBuf,
    descriptor: ReleaseDescriptor,
}

impl VerifiedArtifact {
    /// Local path of the verified package.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The release descriptor the package was verified against.
    pub fn descriptor(&self) -> &ReleaseDescriptor {
        &self.descriptor
    }
}

/// Shared `ureq` agent with connect timeout configuration.
pub(crate) fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Download a URL and return the body as a string.
pub(crate) fn fetch_text(url: &str) -> Result<String> {
    let response = http_agent()
        .get(url)
        .call()
        .map_err(|e| transport(url, &e))?;
    response
        .into_body()
        .read_to_string()
        .map_err(|e| PipelineError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// Download the installer package to `dest` and verify its digest.
pub fn download_and_verify(descriptor: &ReleaseDescriptor, dest: &Path) -> Result<VerifiedArtifact> {
    let url = &descriptor.artifact_url;
    println!("Downloading installer package...");
    println!("  URL: {}", url);

    let response = http_agent()
        .get(url)
        .call()
        .map_err(|e| transport(url, &e))?;
    let mut file = File::create(dest)?;
    std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(|e| {
        PipelineError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })?;

    println!("Verifying digest...");
    verify(dest, descriptor.hash_algorithm, &descriptor.expected_hash)?;
    println!("  Digest OK");

    Ok(VerifiedArtifact {
        path: dest.to_path_buf(),
        descriptor: descriptor.clone(),
    })
}

/// Compare a file's digest against the expected hex string, case-insensitively.
fn verify(path: &Path, algorithm: HashAlgorithm, expected: &str) -> Result<()> {
    let actual = match algorithm {
        HashAlgorithm::Sha256 => hash_file(path)?,
    };

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(PipelineError::Integrity {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Streaming SHA-256 of a file, as lowercase hex.
fn hash_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn transport(url: &str, err: &ureq::Error) -> PipelineError {
    PipelineError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // SHA-256 of the ASCII bytes "abc".
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn hash_file_matches_known_digest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.bin");
        fs::write(&path, "abc").unwrap();
        assert_eq!(hash_file(&path).unwrap(), ABC_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_expected_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.bin");
        fs::write(&path, "abc").unwrap();
        verify(&path, HashAlgorithm::Sha256, &ABC_SHA256.to_uppercase()).unwrap();
    }

    #[test]
    fn verify_mismatch_is_integrity_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.bin");
        fs::write(&path, "not the expected bytes").unwrap();

        let err = verify(&path, HashAlgorithm::Sha256, ABC_SHA256).unwrap_err();
        match err {
            PipelineError::Integrity { expected, actual, .. } => {
                assert_eq!(expected, ABC_SHA256);
                assert_ne!(actual, ABC_SHA256);
            }
            other => panic!("expected Integrity error, got {other}"),
        }
    }

    #[test]
    fn verify_does_not_delete_the_mismatched_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.bin");
        fs::write(&path, "corrupted").unwrap();

        let _ = verify(&path, HashAlgorithm::Sha256, ABC_SHA256).unwrap_err();
        assert!(path.exists(), "failed artifact must stay on disk for inspection");
    }
}
