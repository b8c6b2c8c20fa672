//! Formatting utilities for sizes, durations, and build summaries.

use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;
use tote_bundler::{BuildOutput, FileKind};

use super::{colors_enabled, is_quiet};

/// Format file size in human-readable format.
///
/// ```
/// use tote_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use tote_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One summary line per emitted file: name, kind label and size.
pub fn summary_rows(output: &BuildOutput) -> Vec<(String, &'static str, u64)> {
    output
        .files
        .iter()
        .map(|file| (file.name.clone(), kind_label(file.kind), file.size()))
        .collect()
}

fn kind_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Script => "js",
        FileKind::Style => "css",
        FileKind::Asset => "asset",
        FileKind::Html => "html",
        FileKind::Manifest => "manifest",
        FileKind::SourceMap => "map",
    }
}

/// Print the emitted files, entrypoints and totals to stderr.
pub fn print_build_summary(output: &BuildOutput) {
    if is_quiet() {
        return;
    }
    let width = usize::from(Term::stderr().size().1).clamp(20, 80);
    let rule = "─".repeat(width);
    let colors = colors_enabled();

    if colors {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{rule}");

    let rows = summary_rows(output);
    let name_width = rows.iter().map(|(name, _, _)| name.len()).max().unwrap_or(0);
    for (name, kind, size) in &rows {
        let size = format_size(*size);
        if colors {
            eprintln!(
                "  {} {:<name_width$} {:>10} {}",
                "▸".blue(),
                name.bright_white().bold(),
                size.dimmed(),
                kind.dimmed()
            );
        } else {
            eprintln!("  ▸ {name:<name_width$} {size:>10} {kind}");
        }
    }

    for (entry, files) in &output.entrypoints {
        let line = format!("{entry}: {}", files.join(" "));
        if colors {
            eprintln!("  {} {}", "entry".dimmed(), line);
        } else {
            eprintln!("  entry {line}");
        }
    }

    eprintln!("{rule}");
    let total = format_size(output.total_size());
    let stats = &output.stats;
    let cache = format!("cache {}/{}", stats.cache_hits, stats.cache_hits + stats.cache_misses);
    if colors {
        eprintln!(
            "  {} {} in {} files, {} modules, {} chunks, {}",
            "Total:".bold(),
            total.green(),
            stats.files,
            stats.modules,
            stats.chunks,
            cache.dimmed()
        );
    } else {
        eprintln!(
            "  Total: {total} in {} files, {} modules, {} chunks, {cache}",
            stats.files, stats.modules, stats.chunks
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tote_bundler::OutputFile;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "61m 1s");
    }

    #[test]
    fn test_summary_rows_follow_output_order() {
        let output = BuildOutput {
            files: vec![
                OutputFile::new("main.js", "x".repeat(10), FileKind::Script),
                OutputFile::new("main.css", "y".repeat(4), FileKind::Style),
                OutputFile::new("index.html", "<html></html>", FileKind::Html),
            ],
            ..BuildOutput::default()
        };
        assert_eq!(
            summary_rows(&output),
            vec![
                ("main.js".to_string(), "js", 10),
                ("main.css".to_string(), "css", 4),
                ("index.html".to_string(), "html", 13),
            ]
        );
        print_build_summary(&output);
    }
}
