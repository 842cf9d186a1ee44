//! Static library archiving for the post-link hook.
//!
//! After PlatformIO links the firmware image, every object file under the
//! build tree is bundled into `lib<project>.a` so other projects can link
//! against the library without rebuilding it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::command;

/// A fully-constructed archiver invocation.
///
/// Holds the archiver, destination and members; nothing runs until
/// [`ArchiveSpec::execute`].
#[derive(Debug)]
pub struct ArchiveSpec {
    /// Archiver executable.
    pub archiver: String,
    /// Arguments carried by an `AR`-style override, inserted before the
    /// operation flags.
    pub archiver_args: Vec<String>,
    /// Destination archive path.
    pub archive_path: PathBuf,
    /// Member object files in traversal order.
    pub objects: Vec<PathBuf>,
}

impl ArchiveSpec {
    /// Build the archiver invocation for a finished PlatformIO build.
    ///
    /// The archive is named `lib<project>.a` after the project directory's
    /// basename and written to the top-level build directory. Members are
    /// every `.o` file under `<build_dir>/src`.
    pub fn for_build(project_dir: &Path, build_dir: &Path, archiver: &str) -> Result<Self> {
        let project_name = project_dir
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| {
                format!("Cannot derive a project name from {}", project_dir.display())
            })?;

        let objects = collect_objects(&build_dir.join("src"))?;
        let (archiver, archiver_args) = resolve_archiver(archiver);

        Ok(Self {
            archiver,
            archiver_args,
            archive_path: build_dir.join(format!("lib{project_name}.a")),
            objects,
        })
    }

    /// The command this spec will execute.
    ///
    /// `rcs`: replace or insert members, create the archive if missing,
    /// write the symbol index.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.archiver);
        cmd.args(&self.archiver_args);
        cmd.arg("rcs");
        cmd.arg(&self.archive_path);
        cmd.args(&self.objects);
        cmd
    }

    /// Run the archiver, creating or replacing the archive on disk.
    pub fn execute(&self) -> Result<()> {
        debug!(
            archive = %self.archive_path.display(),
            objects = self.objects.len(),
            "Archiving object files"
        );
        command::run(self.to_command())
    }
}

/// Split an `AR`-style override into tool and leading arguments.
///
/// The override may carry embedded arguments (`"zig ar"`); an empty value
/// falls back to plain `ar`.
pub fn resolve_archiver(spec: &str) -> (String, Vec<String>) {
    let mut words = shellsplit(spec);
    if words.is_empty() {
        return ("ar".to_string(), Vec::new());
    }
    let args = words.split_off(1);
    (words.remove(0), args)
}

/// Recursively collect `.o` files under `dir`, in traversal order.
///
/// A missing directory yields an empty list; the archiver is still invoked
/// with no members and its behavior decides from there.
pub fn collect_objects(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut objects = Vec::new();
    if dir.is_dir() {
        collect_objects_into(dir, &mut objects)?;
    }
    Ok(objects)
}

fn collect_objects_into(dir: &Path, objects: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read build directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect_objects_into(&path, objects)?;
        } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "o") {
            objects.push(path);
        }
    }

    Ok(())
}

/// Splits shell words, falling back to whitespace on malformed input.
fn shellsplit(s: &str) -> Vec<String> {
    match shell_words::split(s) {
        Ok(words) => words,
        Err(err) => {
            warn!(input = %s, error = %err, "Malformed archiver override, splitting on whitespace");
            s.split_whitespace().map(str::to_string).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"\x7fELF").unwrap();
    }

    #[test]
    fn test_collect_objects_filters_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.o"));
        touch(&dir.path().join("b/c.o"));
        touch(&dir.path().join("readme.txt"));

        let mut objects = collect_objects(dir.path()).unwrap();
        objects.sort();

        assert_eq!(objects, vec![dir.path().join("a.o"), dir.path().join("b/c.o")]);
    }

    #[test]
    fn test_collect_objects_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let objects = collect_objects(&dir.path().join("nope")).unwrap();
        assert!(objects.is_empty());
    }

    #[test]
    fn test_resolve_archiver_default() {
        assert_eq!(resolve_archiver("ar"), ("ar".to_string(), vec![]));
        assert_eq!(resolve_archiver(""), ("ar".to_string(), vec![]));
    }

    #[test]
    fn test_resolve_archiver_with_embedded_args() {
        let (tool, args) = resolve_archiver("zig ar");
        assert_eq!(tool, "zig");
        assert_eq!(args, vec!["ar"]);
    }

    #[test]
    fn test_spec_names_archive_after_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("radio-fw");
        let build_dir = project_dir.join(".pio/build/native");
        touch(&build_dir.join("src/main.o"));
        touch(&build_dir.join("src/lib/util.o"));
        touch(&build_dir.join("src/notes.txt"));

        let spec = ArchiveSpec::for_build(&project_dir, &build_dir, "ar").unwrap();

        assert_eq!(spec.archive_path, build_dir.join("libradio-fw.a"));
        assert_eq!(spec.objects.len(), 2);

        let line = command::render(&spec.to_command());
        assert!(line.starts_with("ar rcs"));
        assert!(line.contains("main.o"));
        assert!(line.contains("util.o"));
        assert!(!line.contains("notes.txt"));
    }

    #[test]
    fn test_spec_with_no_objects_still_builds_command() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("empty-fw");
        let build_dir = project_dir.join("build");
        fs::create_dir_all(&build_dir).unwrap();

        let spec = ArchiveSpec::for_build(&project_dir, &build_dir, "ar").unwrap();
        assert!(spec.objects.is_empty());
        assert_eq!(command::render(&spec.to_command()), format!("ar rcs {}", spec.archive_path.display()));
    }

    #[test]
    fn test_execute_creates_archive() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("fw");
        let build_dir = project_dir.join("build");
        touch(&build_dir.join("src/a.o"));
        touch(&build_dir.join("src/sub/b.o"));

        let spec = ArchiveSpec::for_build(&project_dir, &build_dir, "ar").unwrap();
        spec.execute().unwrap();

        assert!(build_dir.join("libfw.a").is_file());
    }

    #[test]
    fn test_execute_fails_when_archiver_fails() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("fw");
        let build_dir = project_dir.join("build");
        touch(&build_dir.join("src/a.o"));

        let spec = ArchiveSpec::for_build(&project_dir, &build_dir, "false").unwrap();
        let err = spec.execute().unwrap_err();
        assert!(err.to_string().contains("failed with status"));
    }
}
