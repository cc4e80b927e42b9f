//! Configuration management for wimstage.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default URL of the vendor release feed.
///
/// The feed returns the product list JSON described in `feed.rs`. Override
/// with `FEED_URL` when pointing at a mirror or a capture of the feed.
pub const DEFAULT_FEED_URL: &str = "https://updates.vendor.example/api/products";

/// wimstage configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the release feed.
    pub feed_url: String,
    /// Directory for downloaded and intermediate files (default: work)
    pub work_dir: PathBuf,
    /// Directory for the final image and the check-only version file
    /// (default: output)
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from .env file and environment.
    ///
    /// Relative `WORK_DIR`/`OUTPUT_DIR` values are resolved against
    /// `base_dir`.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        // Try to load .env file
        let env_path = base_dir.join(".env");
        if env_path.exists() {
            if let Ok(content) = fs::read_to_string(&env_path) {
                for line in content.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((key, value)) = line.split_once('=') {
                        let key = key.trim();
                        let value = value.trim().trim_matches('"').trim_matches('\'');
                        env_vars.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        let resolve_dir = |key: &str, default: &str| -> PathBuf {
            env_vars
                .get(key)
                .map(|s| {
                    let path = PathBuf::from(s);
                    if path.is_absolute() {
                        path
                    } else {
                        base_dir.join(path)
                    }
                })
                .unwrap_or_else(|| base_dir.join(default))
        };

        Self {
            feed_url: env_vars
                .get("FEED_URL")
                .cloned()
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            work_dir: resolve_dir("WORK_DIR", "work"),
            output_dir: resolve_dir("OUTPUT_DIR", "output"),
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  FEED_URL: {}", self.feed_url);
        println!("  WORK_DIR: {}", self.work_dir.display());
        println!("  OUTPUT_DIR: {}", self.output_dir.display());
    }
}
