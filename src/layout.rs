//! Layout composition: staged trees → the directory structure the deployment
//! tool expects.
//!
//! The mapping from logical component to destination is a fixed table,
//! [`LAYOUT_PLAN`], parameterized only by the two component versions. Plan
//! resolution is pure; [`compose`] is the only function here that touches the
//! filesystem. Every path in the staging root is fully determined by the
//! version set and the plan, so composing the same inputs twice produces
//! identical trees.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::fsutil;
use crate::unwrap::UPDATE_AGENT_EXE;

/// Product and update-agent versions used as path segments in the plan.
///
/// Both are load-bearing: an empty segment would silently collapse a
/// directory level, so emptiness is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVersionSet {
    pub product: String,
    pub update_agent: String,
}

impl ComponentVersionSet {
    pub fn new(product: impl Into<String>, update_agent: impl Into<String>) -> Result<Self> {
        let product = product.into();
        let update_agent = update_agent.into();

        if product.is_empty() {
            return Err(PipelineError::Resolution {
                reason: "feed returned an empty product version".to_string(),
            });
        }
        if update_agent.is_empty() {
            return Err(PipelineError::Metadata {
                path: PathBuf::from(UPDATE_AGENT_EXE),
            });
        }
        Ok(Self {
            product,
            update_agent,
        })
    }
}

/// Where a planned copy reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRef {
    /// The whole update-agent tree from the decoded resource.
    AgentTree,
    /// One named file out of the agent tree.
    AgentFile(&'static str),
    /// The whole product tree from the expanded payload.
    ProductTree,
    /// One named file out of the product tree.
    ProductFile(&'static str),
    /// The descriptor synthesized from [`DESCRIPTOR_TEMPLATE`].
    Descriptor,
}

/// One row of the layout table: a source and the destination directory it
/// lands in, relative to the staging root. `{product}` and `{agent}` expand
/// to the respective versions; file sources keep their names.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub component: &'static str,
    pub source: SourceRef,
    pub dest: &'static str,
}

/// Agent files the external updater probes at a fixed path regardless of the
/// installed agent version.
pub const AGENT_CONVENIENCE_FILES: [&str; 3] = [
    "UpdateAgent.exe",
    "UpdateAgentOnDemand.exe",
    "UpdateAgentBroker.exe",
];

/// Product files the OS shell integration expects one level above the
/// versioned directory: the seed data file, the directly runnable entry
/// points, and the security policy.
pub const PRODUCT_SHELL_FILES: [&str; 4] = [
    "initial_preferences",
    "app.exe",
    "app_proxy.exe",
    "security_policy.json",
];

/// File name of the synthesized shell descriptor.
pub const DESCRIPTOR_NAME: &str = "app.VisualElementsManifest.xml";

/// The full layout table.
pub const LAYOUT_PLAN: &[Rule] = &[
    Rule {
        component: "update-agent",
        source: SourceRef::AgentTree,
        dest: "Update/{agent}",
    },
    Rule {
        component: "update-agent-probe",
        source: SourceRef::AgentFile("UpdateAgent.exe"),
        dest: "Update",
    },
    Rule {
        component: "update-agent-probe",
        source: SourceRef::AgentFile("UpdateAgentOnDemand.exe"),
        dest: "Update",
    },
    Rule {
        component: "update-agent-probe",
        source: SourceRef::AgentFile("UpdateAgentBroker.exe"),
        dest: "Update",
    },
    Rule {
        component: "product",
        source: SourceRef::ProductTree,
        dest: "Product/Application/{product}",
    },
    Rule {
        component: "product-shell",
        source: SourceRef::ProductFile("initial_preferences"),
        dest: "Product/Application",
    },
    Rule {
        component: "product-shell",
        source: SourceRef::ProductFile("app.exe"),
        dest: "Product/Application",
    },
    Rule {
        component: "product-shell",
        source: SourceRef::ProductFile("app_proxy.exe"),
        dest: "Product/Application",
    },
    Rule {
        component: "product-shell",
        source: SourceRef::ProductFile("security_policy.json"),
        dest: "Product/Application",
    },
    Rule {
        component: "webview",
        source: SourceRef::ProductTree,
        dest: "ProductWebView/Application/{product}",
    },
    Rule {
        component: "webview-data",
        source: SourceRef::ProductFile("initial_preferences"),
        dest: "ProductWebView/Application",
    },
    Rule {
        component: "shell-descriptor",
        source: SourceRef::Descriptor,
        dest: "Product/Application",
    },
];

/// Shell descriptor template. `{version}` is substituted with the product
/// version; the icon paths are backslash-separated because the descriptor is
/// read by the target OS shell, and the rendered file uses CRLF line endings
/// for the same reason.
pub const DESCRIPTOR_TEMPLATE: &str = r##"<Application xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <VisualElements
      ShowNameOnSquare150x150Logo="on"
      Square150x150Logo="{version}\VisualElements\Logo.png"
      Square70x70Logo="{version}\VisualElements\LogoSmall.png"
      ForegroundText="light"
      BackgroundColor="#323232" />
</Application>
"##;

/// A plan row with its destination resolved against concrete versions.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    pub component: &'static str,
    pub source: SourceRef,
    pub dest: PathBuf,
}

/// Resolve the layout table against a version set. Pure.
pub fn resolve_plan(versions: &ComponentVersionSet) -> Vec<PlannedEntry> {
    LAYOUT_PLAN
        .iter()
        .map(|rule| PlannedEntry {
            component: rule.component,
            source: rule.source,
            dest: PathBuf::from(expand(rule.dest, versions)),
        })
        .collect()
}

fn expand(template: &str, versions: &ComponentVersionSet) -> String {
    template
        .replace("{product}", &versions.product)
        .replace("{agent}", &versions.update_agent)
}

/// Render the shell descriptor for a product version.
pub fn render_descriptor(product_version: &str) -> String {
    DESCRIPTOR_TEMPLATE
        .replace("{version}", product_version)
        .replace('\n', "\r\n")
}

/// Execute the resolved plan, building the staging root from the two staged
/// trees.
pub fn compose(
    versions: &ComponentVersionSet,
    agent_dir: &Path,
    product_dir: &Path,
    staging_root: &Path,
) -> Result<()> {
    fs::create_dir_all(staging_root)?;

    for entry in resolve_plan(versions) {
        let dest = staging_root.join(&entry.dest);
        match entry.source {
            SourceRef::AgentTree => copy_tree(agent_dir, &dest)?,
            SourceRef::AgentFile(name) => copy_named(agent_dir, name, &dest)?,
            SourceRef::ProductTree => copy_tree(product_dir, &dest)?,
            SourceRef::ProductFile(name) => copy_named(product_dir, name, &dest)?,
            SourceRef::Descriptor => {
                fsutil::write_file_with_dirs(
                    dest.join(DESCRIPTOR_NAME),
                    render_descriptor(&versions.product),
                )
                .map_err(io_err)?;
            }
        }
    }
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(PipelineError::Layout {
            path: src.to_path_buf(),
        });
    }
    fsutil::copy_dir_recursive(src, dest).map_err(io_err)
}

fn copy_named(src_dir: &Path, name: &str, dest_dir: &Path) -> Result<()> {
    let src = src_dir.join(name);
    if !src.is_file() {
        return Err(PipelineError::Layout { path: src });
    }
    fsutil::copy_file(&src, &dest_dir.join(name)).map_err(io_err)
}

fn io_err(err: anyhow::Error) -> PipelineError {
    PipelineError::Io(std::io::Error::other(format!("{err:#}")))
}
