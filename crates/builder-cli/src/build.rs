//! Subcommand implementations for the builder CLI.
//!
//! Each subcommand validates the requested target environment against the
//! project configuration before shelling out to the PlatformIO CLI.

use anyhow::{bail, Context, Result};
use clap::Args;
use pio_build::command;
use pio_build::project::ProjectConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Directory PlatformIO keeps cached build artifacts in.
const CACHE_DIR: &str = ".pio";

/// Configuration for building a target environment
#[derive(Args, Debug, Clone)]
pub struct BuildConfig {
    /// Target environment to build
    #[arg(short, long, required = true)]
    pub target: String,

    /// Deploy (upload) the firmware after a successful build
    #[arg(long)]
    pub deploy: bool,

    /// Remove the build cache before building
    #[arg(long)]
    pub clean: bool,

    /// Path to the PlatformIO executable
    #[arg(long, default_value = "platformio", env = "PLATFORMIO_BIN")]
    pub pio_path: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration for testing a target environment
#[derive(Args, Debug, Clone)]
pub struct TestConfig {
    /// Target environment to test
    #[arg(short, long, required = true)]
    pub target: String,

    /// Test suite to run
    #[arg(short, long)]
    pub suite: Option<String>,

    /// Path to the PlatformIO executable
    #[arg(long, default_value = "platformio", env = "PLATFORMIO_BIN")]
    pub pio_path: PathBuf,
}

/// Configuration for cleaning a target environment
#[derive(Args, Debug, Clone)]
pub struct CleanConfig {
    /// Target environment to clean
    #[arg(short, long, required = true)]
    pub target: String,

    /// Path to the PlatformIO executable
    #[arg(long, default_value = "platformio", env = "PLATFORMIO_BIN")]
    pub pio_path: PathBuf,
}

/// Configuration for listing target environments
#[derive(Args, Debug, Clone)]
pub struct ListConfig {
    /// Path to the PlatformIO executable
    #[arg(long, default_value = "platformio", env = "PLATFORMIO_BIN")]
    pub pio_path: PathBuf,
}

/// Build a target environment, optionally cleaning first and deploying after.
pub fn build(config: &BuildConfig) -> Result<()> {
    let project = load_project(&config.pio_path)?;
    validate_target(&project, &config.target)?;
    validate_pio(&config.pio_path)?;

    if config.clean {
        remove_cache_dir(&project.root)?;
    }

    info!(target = %config.target, deploy = config.deploy, "Building target environment");

    let mut cmd = pio_command(&config.pio_path, "run", &config.target);
    if config.deploy {
        cmd.arg("-t").arg("upload");
    }
    command::run(cmd)
}

/// Run the test suite for a target environment.
pub fn test(config: &TestConfig) -> Result<()> {
    let project = load_project(&config.pio_path)?;
    validate_target(&project, &config.target)?;
    validate_pio(&config.pio_path)?;

    info!(target = %config.target, suite = ?config.suite, "Testing target environment");

    let mut cmd = pio_command(&config.pio_path, "test", &config.target);
    if let Some(suite) = &config.suite {
        cmd.arg("-f").arg(suite);
    }
    command::run(cmd)
}

/// Clean build artifacts for a target environment.
pub fn clean(config: &CleanConfig) -> Result<()> {
    let project = load_project(&config.pio_path)?;
    validate_target(&project, &config.target)?;
    validate_pio(&config.pio_path)?;

    info!(target = %config.target, "Cleaning target environment");

    // TODO: clean currently maps to plain `run`; switch to `run -t clean`
    // once the mapping is confirmed with the firmware maintainers.
    let cmd = pio_command(&config.pio_path, "run", &config.target);
    command::run(cmd)
}

/// List all declared target environments.
pub fn list_targets(config: &ListConfig) -> Result<()> {
    let project = load_project(&config.pio_path)?;

    println!("Available target environments:");
    for env in &project.envs {
        println!("  - {env}");
    }

    Ok(())
}

/// Discover the project configuration in the current directory.
fn load_project(pio_path: &Path) -> Result<ProjectConfig> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    ProjectConfig::discover(&root, pio_path)
}

/// Reject targets that are not declared in the project configuration.
fn validate_target(project: &ProjectConfig, target: &str) -> Result<()> {
    if project.contains(target) {
        return Ok(());
    }

    bail!(
        "Target '{}' is not a valid environment. Available environments are: {}",
        target,
        project.envs.join(", ")
    );
}

/// Check the PlatformIO executable can be resolved before shelling out.
fn validate_pio(pio_path: &Path) -> Result<()> {
    let resolved = which::which(pio_path).with_context(|| {
        format!(
            "PlatformIO executable '{}' not found - is it installed?",
            pio_path.display()
        )
    })?;
    debug!(path = %resolved.display(), "Using PlatformIO");
    Ok(())
}

/// Remove the PlatformIO build cache, ahead of a clean build.
fn remove_cache_dir(root: &Path) -> Result<()> {
    let cache_dir = root.join(CACHE_DIR);
    if cache_dir.exists() {
        info!(path = %cache_dir.display(), "Removing build cache");
        std::fs::remove_dir_all(&cache_dir).with_context(|| {
            format!("Failed to remove cache directory: {}", cache_dir.display())
        })?;
    }
    Ok(())
}

fn pio_command(pio_path: &Path, action: &str, target: &str) -> Command {
    let mut cmd = Command::new(pio_path);
    cmd.arg(action).arg("-e").arg(target);
    cmd
}
