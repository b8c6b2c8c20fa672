//! Path helpers shared by the commands.

use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::error::{CliError, Result};

/// Resolve `path` against `cwd` unless it is already absolute.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf().clean()
    } else {
        cwd.join(path).clean()
    }
}

/// The current working directory.
pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(CliError::Io)
}

const DANGEROUS_PATHS: &[&str] = &[
    "/bin", "/boot", "/dev", "/etc", "/lib", "/lib64", "/proc", "/root", "/sbin", "/sys",
    "/usr/bin", "/usr/lib", "/usr/sbin", "/var/log",
];

/// Refuse output directories that are the project root itself, outside the
/// project (siblings excepted) or inside a system directory.
pub fn validate_output_dir(out_dir: &Path, root: &Path) -> Result<()> {
    let out_dir = resolve_path(out_dir, root);
    let root = root.to_path_buf().clean();

    if out_dir.parent().is_none() {
        return Err(CliError::OutputNotWritable(out_dir));
    }
    if DANGEROUS_PATHS
        .iter()
        .any(|dangerous| out_dir.starts_with(dangerous))
    {
        return Err(CliError::Custom(format!(
            "Refusing to write to system directory: {}",
            out_dir.display()
        )));
    }

    if out_dir == root {
        return Err(CliError::OutputNotWritable(out_dir));
    }
    let is_within_project = out_dir.starts_with(&root);
    let is_sibling = match (out_dir.parent(), root.parent()) {
        (Some(out_parent), Some(root_parent)) => out_parent == root_parent,
        _ => false,
    };
    if !is_within_project && !is_sibling {
        return Err(CliError::OutputNotWritable(out_dir));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        let cwd = Path::new("/project");
        assert_eq!(resolve_path(Path::new("dist"), cwd), PathBuf::from("/project/dist"));
        assert_eq!(resolve_path(Path::new("./a/../b"), cwd), PathBuf::from("/project/b"));
        assert_eq!(resolve_path(Path::new("/abs/out"), cwd), PathBuf::from("/abs/out"));
    }

    #[test]
    fn test_output_inside_project() {
        let root = Path::new("/home/me/app");
        assert!(validate_output_dir(Path::new("dist"), root).is_ok());
        assert!(validate_output_dir(Path::new("build/web"), root).is_ok());
    }

    #[test]
    fn test_output_sibling_allowed() {
        let root = Path::new("/home/me/app");
        assert!(validate_output_dir(Path::new("../app-dist"), root).is_ok());
    }

    #[test]
    fn test_output_outside_project_rejected() {
        let root = Path::new("/home/me/app");
        assert!(matches!(
            validate_output_dir(Path::new("../../elsewhere/out"), root),
            Err(CliError::OutputNotWritable(_))
        ));
        assert!(matches!(
            validate_output_dir(Path::new("."), root),
            Err(CliError::OutputNotWritable(_))
        ));
    }

    #[test]
    fn test_system_dirs_rejected() {
        let root = Path::new("/etc");
        assert!(validate_output_dir(Path::new("/etc/app"), root).is_err());
        assert!(validate_output_dir(Path::new("/"), Path::new("/")).is_err());
    }
}
