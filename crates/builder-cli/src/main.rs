mod build;
mod post_link;

use std::ffi::OsString;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// Setup logging based on verbose flag or RUST_LOG environment variable
fn setup_logging(verbose: bool) {
    // RUST_LOG env var takes precedence if set
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("builder=debug,pio_build=debug")
    } else {
        EnvFilter::new("builder=info,pio_build=info")
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

#[derive(Parser)]
#[command(name = "builder")]
#[command(bin_name = "builder")]
#[command(version, about = "Build, test and deploy PlatformIO target environments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project for a specific target environment
    #[command(alias = "b")]
    Build(build::BuildConfig),

    /// Run the test suite for a specific target environment
    Test(build::TestConfig),

    /// Clean build artifacts for a specific target environment
    Clean(build::CleanConfig),

    /// List all available target environments
    #[command(alias = "ls")]
    ListTargets(build::ListConfig),

    /// Print cli version
    Version,

    /// Internal: post-link archive hook (called from extra_scripts)
    #[command(hide = true)]
    PostLink(post_link::PostLinkArgs),

    /// Anything else falls through to usage help
    #[command(external_subcommand)]
    Unrecognized(Vec<OsString>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Some(Commands::Build(config)) if config.verbose);
    setup_logging(verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Build(config) => build::build(&config)?,
        Commands::Test(config) => build::test(&config)?,
        Commands::Clean(config) => build::clean(&config)?,
        Commands::ListTargets(config) => build::list_targets(&config)?,
        Commands::Version => {
            println!("builder cli: v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::PostLink(args) => post_link::run(args)?,
        Commands::Unrecognized(_) => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
