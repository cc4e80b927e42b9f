//! wimstage library exports.
//!
//! The binary in `main.rs` is a thin wrapper; everything else lives here so
//! the integration tests can exercise the pipeline stages directly.

pub mod archive;
pub mod bcj2;
pub mod config;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod fsutil;
pub mod layout;
pub mod packager;
pub mod pe_version;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod unwrap;
