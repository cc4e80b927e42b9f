//! Pipeline error taxonomy.
//!
//! Every stage failure is fatal: the run aborts, intermediate files are left
//! on disk for inspection, and the error kind plus the offending identifier
//! surface in the process exit message. A structural mismatch here almost
//! always means the upstream packaging changed, which a human has to look at;
//! retrying would only mask that.

use std::path::PathBuf;
use thiserror::Error;

/// One step of the nested-container unwrap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// Installer package → embedded setup executable.
    Package,
    /// Setup executable → compressed resource blob.
    Resource,
    /// Resource blob → decoded update-agent file tree.
    FilterStream,
    /// Agent tree → relocated product installer.
    AgentTree,
    /// Product installer → expanded product payload.
    ProductPayload,
}

impl std::fmt::Display for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Hop::Package => "package",
            Hop::Resource => "resource",
            Hop::FilterStream => "filter-stream",
            Hop::AgentTree => "agent-tree",
            Hop::ProductPayload => "product-payload",
        };
        f.write_str(name)
    }
}

/// Errors that abort the repackaging pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The release feed had no matching product, release, or artifact.
    #[error("release resolution failed: {reason}")]
    Resolution {
        /// What was missing from the feed.
        reason: String,
    },

    /// Network failure talking to the feed or downloading the artifact.
    #[error("transport failure for {url}: {reason}")]
    Transport {
        /// The URL that was being fetched.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// Downloaded artifact hash does not match the feed's expected hash.
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    Integrity {
        /// The downloaded file.
        path: PathBuf,
        /// Hash the feed promised.
        expected: String,
        /// Hash actually computed.
        actual: String,
    },

    /// A container hop did not yield its expected entry.
    #[error("unwrap failed at {hop} hop: expected entry {entry}: {reason}")]
    Unwrap {
        /// Which hop of the chain failed.
        hop: Hop,
        /// The entry that should have been there.
        entry: String,
        /// Description of the failure.
        reason: String,
    },

    /// The update-agent executable carried no usable version metadata.
    #[error("no file-version metadata in {path}")]
    Metadata {
        /// The executable that was inspected.
        path: PathBuf,
    },

    /// A source file referenced by the layout plan was missing.
    #[error("layout source missing: {path}")]
    Layout {
        /// The missing source path.
        path: PathBuf,
    },

    /// The image capture tool exited non-zero.
    #[error("image packaging failed: {reason}")]
    Packaging {
        /// Description of the failure.
        reason: String,
    },

    /// An I/O operation failed outside any more specific stage contract.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
