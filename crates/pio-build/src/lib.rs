//! Build support for the PlatformIO `builder` CLI.
//!
//! This crate holds the pieces of the tooling that do not depend on the CLI
//! surface: project configuration discovery, external command execution, and
//! static-library archiving for the post-link hook.

pub mod archive;
pub mod command;
pub mod project;
