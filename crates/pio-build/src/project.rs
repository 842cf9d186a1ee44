//! PlatformIO project configuration discovery.
//!
//! The only thing the tooling needs from `platformio.ini` is the set of
//! declared build environments, read from `[env:<name>]` section headers.
//! When the file is missing the PlatformIO CLI itself is asked for the
//! resolved project configuration.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// File name of the PlatformIO project configuration.
pub const PROJECT_CONFIG: &str = "platformio.ini";

/// One `[section, entries]` pair from `platformio project config --json-output`.
#[derive(Debug, Deserialize)]
struct ConfigSection(String, serde_json::Value);

/// Declared build environments for a PlatformIO project.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Project root the configuration was discovered in.
    pub root: PathBuf,
    /// Environment names in declaration order.
    pub envs: Vec<String>,
}

impl ProjectConfig {
    /// Discover the build environments for the project rooted at `root`.
    ///
    /// Reads `platformio.ini` when present, otherwise queries the PlatformIO
    /// CLI at `pio_path`. A project with no declared environments is an
    /// error; the caller never sees an empty list.
    pub fn discover(root: &Path, pio_path: &Path) -> Result<Self> {
        let ini_path = root.join(PROJECT_CONFIG);

        let envs = if ini_path.is_file() {
            let content = std::fs::read_to_string(&ini_path)
                .with_context(|| format!("Failed to read {}", ini_path.display()))?;
            parse_env_sections(&content)
        } else {
            debug!(path = %ini_path.display(), "No project config file, querying PlatformIO");
            query_envs(root, pio_path)?
        };

        if envs.is_empty() {
            bail!(
                "No build environments found for {}.\n\
                 Declare an [env:<name>] section in {} or run from the project root.",
                root.display(),
                PROJECT_CONFIG
            );
        }

        Ok(Self {
            root: root.to_path_buf(),
            envs,
        })
    }

    /// Whether `env` is one of the declared environments.
    pub fn contains(&self, env: &str) -> bool {
        self.envs.iter().any(|name| name == env)
    }
}

/// Extract environment names from `[env:<name>]` headers, in file order.
pub fn parse_env_sections(content: &str) -> Vec<String> {
    let header = Regex::new(r"\[env:([^\]\n]+)\]").unwrap();
    header
        .captures_iter(content)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

/// Ask the PlatformIO CLI for the resolved project configuration and pick
/// out the `env:` sections.
fn query_envs(root: &Path, pio_path: &Path) -> Result<Vec<String>> {
    let output = Command::new(pio_path)
        .arg("project")
        .arg("config")
        .arg("--json-output")
        .current_dir(root)
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {} - is PlatformIO installed?",
                pio_path.display()
            )
        })?;

    if !output.status.success() {
        bail!(
            "'{} project config --json-output' failed with status: {}",
            pio_path.display(),
            output.status
        );
    }

    let sections: Vec<ConfigSection> = serde_json::from_slice(&output.stdout)
        .context("Failed to parse PlatformIO project config output")?;

    Ok(sections
        .into_iter()
        .filter_map(|ConfigSection(name, _)| name.strip_prefix("env:").map(str::to_string))
        .collect())
}
