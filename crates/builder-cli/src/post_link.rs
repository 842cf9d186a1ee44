//! Post-link archive hook.
//!
//! This module implements the hidden `post-link` subcommand that the
//! one-line `extra_scripts` shim calls after PlatformIO links the firmware
//! image. It bundles the build's object files into a static library named
//! after the project.

use anyhow::Result;
use clap::Args;
use pio_build::archive::ArchiveSpec;
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for the post-link subcommand.
#[derive(Args, Debug, Clone)]
pub struct PostLinkArgs {
    /// PlatformIO project directory ($PROJECT_DIR)
    #[arg(long)]
    pub project_dir: PathBuf,

    /// Build output directory ($BUILD_DIR)
    #[arg(long)]
    pub build_dir: PathBuf,

    /// Linked program name ($PROGNAME); informational only
    #[arg(long)]
    pub prog_name: Option<String>,

    /// Archiver to use, may carry embedded arguments
    #[arg(long, default_value = "ar", env = "AR")]
    pub archiver: String,
}

/// Run the post-link archive hook.
///
/// A failing archiver fails this invocation, which aborts the surrounding
/// build.
pub fn run(args: PostLinkArgs) -> Result<()> {
    info!(
        project_dir = %args.project_dir.display(),
        build_dir = %args.build_dir.display(),
        prog_name = ?args.prog_name,
        "Building static library"
    );

    let spec = ArchiveSpec::for_build(&args.project_dir, &args.build_dir, &args.archiver)?;

    debug!(
        archive = %spec.archive_path.display(),
        objects = ?spec.objects,
        "Collected object files"
    );

    spec.execute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_link_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: PostLinkArgs,
        }

        let cli = TestCli::parse_from([
            "test",
            "--project-dir",
            "/work/fw",
            "--build-dir",
            "/work/fw/.pio/build/native",
        ]);

        assert_eq!(cli.args.project_dir, PathBuf::from("/work/fw"));
        assert_eq!(
            cli.args.build_dir,
            PathBuf::from("/work/fw/.pio/build/native")
        );
        assert!(cli.args.prog_name.is_none());
    }
}
