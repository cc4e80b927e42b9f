//! Shared test utilities for wimstage tests.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment with temporary directories for the staged trees and the
/// composed staging root.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Mock decoded update-agent tree
    pub agent_dir: PathBuf,
    /// Mock expanded product tree
    pub product_dir: PathBuf,
    /// Composition destination
    pub staging: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with populated mock trees.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let agent_dir = base.join("agent");
        let product_dir = base.join("product");
        let staging = base.join("staging");

        create_mock_agent_tree(&agent_dir);
        create_mock_product_tree(&product_dir);

        Self {
            _temp_dir: temp_dir,
            agent_dir,
            product_dir,
            staging,
        }
    }
}

/// Populate a mock update-agent file set, as hop 4 leaves it behind.
pub fn create_mock_agent_tree(dir: &Path) {
    let files = [
        "UpdateAgent.exe",
        "UpdateAgentOnDemand.exe",
        "UpdateAgentBroker.exe",
        "agent_resources.dll",
    ];
    fs::create_dir_all(dir).expect("Failed to create agent dir");
    for name in files {
        fs::write(dir.join(name), format!("agent:{name}")).expect("Failed to write agent file");
    }
}

/// Populate a mock expanded product tree, as the payload archive leaves it.
pub fn create_mock_product_tree(dir: &Path) {
    let files = [
        "initial_preferences",
        "app.exe",
        "app_proxy.exe",
        "security_policy.json",
        "Locales/en-US.pak",
        "VisualElements/Logo.png",
    ];
    fs::create_dir_all(dir).expect("Failed to create product dir");
    for name in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create product subdir");
        }
        fs::write(&path, format!("product:{name}")).expect("Failed to write product file");
    }
}

/// Build a synthetic setup-resource blob: the given files packed as a tar
/// stream, framed as unfiltered BCJ2 streams, compressed LZMA-alone.
///
/// Contents must stay free of branch opcode bytes (`E8`/`E9`/`0F 8x`) so the
/// filter reversal is a pass-through; ASCII content satisfies that.
pub fn build_resource_blob(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in entries {
        let mut header = tar::Header::new_ustar();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder
            .append_data(&mut header, name, *content)
            .expect("Failed to append tar entry");
    }
    let tar_bytes = builder.into_inner().expect("Failed to finish tar stream");

    // 20-byte framing header: output size, then main/call/jump/rc sizes.
    let mut framed = Vec::new();
    for word in [tar_bytes.len() as u32, tar_bytes.len() as u32, 0, 0, 5] {
        framed.extend_from_slice(&word.to_le_bytes());
    }
    framed.extend_from_slice(&tar_bytes);
    framed.extend_from_slice(&[0u8; 5]); // range coder init bytes, all-zero bits

    let options = xz2::stream::LzmaOptions::new_preset(6).expect("lzma preset");
    let stream = xz2::stream::Stream::new_lzma_encoder(&options).expect("lzma encoder");
    let mut encoder = xz2::read::XzEncoder::new_stream(std::io::Cursor::new(framed), stream);
    let mut blob = Vec::new();
    encoder.read_to_end(&mut blob).expect("lzma compression");
    blob
}

/// Snapshot a directory tree as relative path → content, for byte-identical
/// comparisons.
pub fn tree_snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut snapshot = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.expect("Failed to walk tree");
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .expect("path under root")
                .to_string_lossy()
                .into_owned();
            let content = fs::read(entry.path()).expect("Failed to read file");
            snapshot.insert(rel, content);
        }
    }
    snapshot
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file to exist: {}", path.display());
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    assert!(
        content.contains(expected),
        "File {} does not contain {:?}.\nActual content: {}",
        path.display(),
        expected,
        content
    );
}
