//! Writing build output to disk.
//!
//! Every path is validated to stay inside the output directory. Files are
//! first written next to their targets under a temporary name and only
//! renamed into place once all of them were written, so a failed build
//! never leaves a half-updated directory behind.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use super::OutputFile;
use crate::{Error, Result};

const TEMP_SUFFIX: &str = ".tote-tmp";

/// Write `files` under `dir`, removing its previous contents first when
/// `clean` is set.
pub fn write_files(files: &[OutputFile], dir: &Path, clean: bool) -> Result<()> {
    let dir = normalize_dir(dir)?;

    let mut operations = Vec::with_capacity(files.len());
    for file in files {
        let target = validate_output_path(&dir, &file.name)?;
        operations.push((target, file.contents.as_slice()));
    }

    if clean {
        clean_dir(&dir)?;
    }
    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    write_files_atomic(&operations)?;
    tracing::debug!(dir = %dir.display(), files = operations.len(), "wrote output");
    Ok(())
}

fn normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir().map_err(|e| {
        Error::InvalidOutputPath(format!("Failed to get current directory: {e}"))
    })?;
    Ok(cwd.join(cleaned).clean())
}

/// Resolve `filename` under `base_dir`, rejecting names that escape it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::InvalidOutputPath("empty file name".to_string()));
    }
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

/// Remove everything inside `dir`. Refuses filesystem roots and any
/// directory that contains the working directory.
fn clean_dir(dir: &Path) -> Result<()> {
    if dir.parent().is_none() {
        return Err(Error::InvalidOutputPath(format!(
            "refusing to clean '{}'",
            dir.display()
        )));
    }
    if let Ok(cwd) = std::env::current_dir() {
        if cwd.starts_with(dir) {
            return Err(Error::InvalidOutputPath(format!(
                "refusing to clean '{}': it contains the working directory",
                dir.display()
            )));
        }
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(Error::IoError {
                message: format!("Failed to read output directory '{}'", dir.display()),
                source: e,
            });
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| Error::IoError {
            message: format!("Failed to remove '{}'", path.display()),
            source: e,
        })?;
    }
    tracing::debug!(dir = %dir.display(), "cleaned output directory");
    Ok(())
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Phase one writes every file under a temporary name; phase two renames
/// them into place. Temporary files are removed if either phase fails.
fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::with_capacity(operations.len());

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp = temp_path(target_path);
        fs::write(&temp, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp.display(),
                e
            ))
        })?;
        temp_files.push((temp, target_path.clone()));
    }

    for (temp, target_path) in &temp_files {
        fs::rename(temp, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp, _) in temp_files {
        if temp.exists() {
            if let Err(e) = fs::remove_file(temp) {
                tracing::warn!(path = %temp.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::output::FileKind;

    #[test]
    fn validate_output_path_normal() {
        let base = Path::new("/tmp/output");
        assert_eq!(
            validate_output_path(base, "static/js/main.js").unwrap(),
            Path::new("/tmp/output/static/js/main.js")
        );
        assert_eq!(
            validate_output_path(base, "./index.html").unwrap(),
            Path::new("/tmp/output/index.html")
        );
    }

    #[test]
    fn validate_output_path_rejects_escapes() {
        let base = Path::new("/tmp/output");
        for name in ["../etc/passwd", "safe/../../../../etc/passwd", "file\0name.js", "", "."] {
            assert!(
                matches!(validate_output_path(base, name), Err(Error::InvalidOutputPath(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn writes_nested_files_without_temporaries() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            OutputFile::new("main.js", "js", FileKind::Script),
            OutputFile::new("main.css", "css", FileKind::Style),
            OutputFile::new("static/media/logo.png", vec![1u8, 2, 3], FileKind::Asset),
        ];
        write_files(&files, dir.path(), false).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("main.js")).unwrap(), "js");
        assert_eq!(fs::read_to_string(dir.path().join("main.css")).unwrap(), "css");
        assert_eq!(fs::read(dir.path().join("static/media/logo.png")).unwrap(), vec![1, 2, 3]);
        let leftovers = walk(dir.path())
            .into_iter()
            .filter(|p| p.to_string_lossy().ends_with(TEMP_SUFFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn clean_removes_previous_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        fs::create_dir_all(out.join("old")).unwrap();
        fs::write(out.join("old/stale.js"), "x").unwrap();
        fs::write(out.join("stale.css"), "x").unwrap();

        write_files(&[OutputFile::new("main.js", "js", FileKind::Script)], &out, true).unwrap();
        assert!(!out.join("old").exists());
        assert!(!out.join("stale.css").exists());
        assert!(out.join("main.js").exists());
    }

    #[test]
    fn invalid_name_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            OutputFile::new("ok.js", "js", FileKind::Script),
            OutputFile::new("../evil.js", "js", FileKind::Script),
        ];
        assert!(write_files(&files, dir.path(), false).is_err());
        assert!(!dir.path().join("ok.js").exists());
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                found.extend(walk(&path));
            } else {
                found.push(path);
            }
        }
        found
    }
}
