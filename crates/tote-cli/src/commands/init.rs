//! Init command implementation.
//!
//! Writes a starter web app into a directory.

use std::fs;
use std::path::Path;

use crate::cli::InitArgs;
use crate::commands::{templates, utils};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

/// Execute the init command.
///
/// 1. Resolve the target directory, creating it if missing
/// 2. Refuse to overwrite an existing `tote.toml` without `--force`
/// 3. Write the starter files and `package.json`
/// 4. Show next steps
pub async fn execute(args: InitArgs) -> Result<()> {
    let cwd = utils::get_cwd()?;
    let dir = utils::resolve_path(&args.dir, &cwd);

    let config_path = dir.join("tote.toml");
    if config_path.exists() && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    fs::create_dir_all(&dir).with_path(&dir)?;
    let name = package_name(&dir);
    ui::info(&format!("Creating project: {name}"));

    for (relative, contents) in templates::FILES {
        write_file(&dir, relative, contents)?;
    }
    let package = dir.join("package.json");
    if package.exists() && !args.force {
        ui::warning("  Kept existing package.json");
    } else {
        write_file(&dir, "package.json", &templates::package_json(&name))?;
    }

    print_next_steps(&dir, &cwd);
    ui::success("Project created successfully!");
    Ok(())
}

fn write_file(dir: &Path, relative: &str, contents: &str) -> Result<()> {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }
    fs::write(&path, contents).with_path(&path)?;
    ui::success(&format!("  Created {relative}"));
    Ok(())
}

/// A valid npm package name derived from the directory name.
fn package_name(dir: &Path) -> String {
    let raw = dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    sanitize_name(raw)
}

fn sanitize_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            name.push(c.to_ascii_lowercase());
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }
    let name = name.trim_matches(|c| c == '-' || c == '_');
    if name.is_empty() {
        "tote-app".to_string()
    } else {
        name.to_string()
    }
}

fn print_next_steps(dir: &Path, cwd: &Path) {
    eprintln!();
    ui::info("Next steps:");
    if let Ok(relative) = dir.strip_prefix(cwd) {
        if !relative.as_os_str().is_empty() {
            eprintln!("  cd {}", relative.display());
        }
    } else {
        eprintln!("  cd {}", dir.display());
    }
    eprintln!("  tote build");
    eprintln!("  tote dev");
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my-app"), "my-app");
        assert_eq!(sanitize_name("My App"), "my-app");
        assert_eq!(sanitize_name("  web  site!! "), "web-site");
        assert_eq!(sanitize_name("__x__"), "x");
        assert_eq!(sanitize_name("???"), "tote-app");
        assert_eq!(sanitize_name(""), "tote-app");
    }

    #[test]
    fn test_package_name_uses_last_component() {
        assert_eq!(package_name(&PathBuf::from("/work/Shop Front")), "shop-front");
        assert_eq!(package_name(Path::new("/")), "tote-app");
    }

    #[tokio::test]
    async fn test_init_writes_starter_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("site");
        execute(InitArgs {
            dir: dir.clone(),
            force: false,
        })
        .await
        .unwrap();

        for (relative, _) in templates::FILES {
            assert!(dir.join(relative).is_file(), "{relative}");
        }
        let package = fs::read_to_string(dir.join("package.json")).unwrap();
        assert!(package.contains("\"name\": \"site\""));
    }

    #[tokio::test]
    async fn test_init_refuses_existing_config_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("tote.toml"), "entry = \"./a.js\"").unwrap();

        let args = InitArgs {
            dir: tmp.path().to_path_buf(),
            force: false,
        };
        let err = execute(args.clone()).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
        assert_eq!(
            fs::read_to_string(tmp.path().join("tote.toml")).unwrap(),
            "entry = \"./a.js\""
        );

        execute(InitArgs { force: true, ..args }).await.unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("tote.toml")).unwrap(),
            templates::TOTE_TOML
        );
    }
}
