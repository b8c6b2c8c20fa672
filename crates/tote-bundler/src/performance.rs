//! Size limits on emitted files.

use tote_config::{HintLevel, PerformanceConfig};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
use crate::output::{FileKind, OutputFile};

/// An entry's initial files, by output name.
#[derive(Debug, Clone)]
pub struct Entrypoint<'a> {
    pub name: &'a str,
    pub files: Vec<&'a str>,
}

/// Check every considered file against `max_asset_size` and every entry's
/// initial files combined against `max_entrypoint_size`.
pub fn check(
    config: &PerformanceConfig,
    level: HintLevel,
    files: &[OutputFile],
    entrypoints: &[Entrypoint<'_>],
) -> Vec<Diagnostic> {
    let severity = match level {
        HintLevel::Off => return Vec::new(),
        HintLevel::Warning => DiagnosticSeverity::Warning,
        HintLevel::Error => DiagnosticSeverity::Error,
    };
    let mut found = Vec::new();

    for file in files {
        if matches!(file.kind, FileKind::Manifest | FileKind::SourceMap) || !config.considers(&file.name) {
            continue;
        }
        let size = file.size();
        if size > config.max_asset_size {
            found.push(
                Diagnostic::new(
                    DiagnosticKind::AssetSize,
                    severity,
                    format!(
                        "asset size {} exceeds the recommended limit of {}",
                        format_size(size),
                        format_size(config.max_asset_size)
                    ),
                )
                .with_file(file.name.clone())
                .with_help("Large files slow down page loads. Consider splitting with dynamic import()."),
            );
        }
    }

    for entry in entrypoints {
        let considered: Vec<&OutputFile> = entry
            .files
            .iter()
            .filter(|name| config.considers(name))
            .filter_map(|name| files.iter().find(|f| f.name == *name))
            .collect();
        let size: u64 = considered.iter().map(|f| f.size()).sum();
        if size > config.max_entrypoint_size {
            let names: Vec<&str> = considered.iter().map(|f| f.name.as_str()).collect();
            found.push(
                Diagnostic::new(
                    DiagnosticKind::EntrypointSize,
                    severity,
                    format!(
                        "entrypoint \"{}\" combined size {} exceeds the recommended limit of {} ({})",
                        entry.name,
                        format_size(size),
                        format_size(config.max_entrypoint_size),
                        names.join(", ")
                    ),
                )
                .with_help("Load less code up front by moving rarely used modules behind import()."),
            );
        }
    }

    for diagnostic in &found {
        match diagnostic.severity {
            DiagnosticSeverity::Warning => tracing::warn!("{diagnostic}"),
            DiagnosticSeverity::Error => tracing::debug!("{diagnostic}"),
        }
    }
    found
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: usize) -> OutputFile {
        OutputFile::new(name, vec![b'x'; size], FileKind::Script)
    }

    fn config() -> PerformanceConfig {
        PerformanceConfig {
            max_asset_size: 100,
            max_entrypoint_size: 150,
            ..PerformanceConfig::default()
        }
    }

    #[test]
    fn oversized_assets_and_entrypoints() {
        let files = vec![file("main.js", 120), file("vendors.js", 60), file("big.png", 1000)];
        let entries = [Entrypoint {
            name: "main",
            files: vec!["vendors.js", "main.js"],
        }];
        let found = check(&config(), HintLevel::Warning, &files, &entries);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, DiagnosticKind::AssetSize);
        assert_eq!(found[0].file.as_deref(), Some("main.js"));
        assert_eq!(found[1].kind, DiagnosticKind::EntrypointSize);
        assert!(found[1].message.contains("vendors.js, main.js"));
        assert!(found.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn levels() {
        let files = vec![file("main.js", 120)];
        assert!(check(&config(), HintLevel::Off, &files, &[]).is_empty());
        let found = check(&config(), HintLevel::Error, &files, &[]);
        assert!(found[0].is_error());
    }
}
