//! Terminal rendering for CLI results.

use console::{style, Term};
use mediatool::core::catalog::CatalogReport;
use mediatool::core::consolidate::ConsolidationReport;
use mediatool::core::duplicates::DuplicateSet;
use mediatool::core::index::IndexStats;
use mediatool::error::{MediaToolError, Result};
use serde::Serialize;
use std::path::Path;

pub fn print_catalog_report(term: &Term, report: &CatalogReport) {
    term.write_line(&format!(
        "{} Catalog complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line(&format!(
        "  {} media files seen in {:.1}s",
        style(report.files_seen).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} added, {} updated, {} unchanged",
        style(report.added).cyan(),
        style(report.updated).cyan(),
        style(report.unchanged).dim()
    ))
    .ok();

    if report.skipped > 0 {
        term.write_line(&format!(
            "  {} skipped",
            style(report.skipped).yellow()
        ))
        .ok();
        for error in &report.errors {
            term.write_line(&format!("    {} {}", style("○").dim(), error))
                .ok();
        }
    }
}

pub fn print_groups_pretty(term: &Term, groups: &[DuplicateSet]) {
    if groups.is_empty() {
        term.write_line(&format!("  {} No duplicates found", style("✓").green()))
            .ok();
        return;
    }

    let redundant: usize = groups.iter().map(|g| g.duplicate_count()).sum();
    let reclaimable: u64 = groups.iter().map(|g| g.reclaimable_bytes()).sum();

    term.write_line(&format!(
        "{} duplicate sets, {} redundant files, {} reclaimable",
        style(groups.len()).cyan(),
        style(redundant).cyan(),
        style(format_bytes(reclaimable)).yellow()
    ))
    .ok();
    term.write_line("").ok();

    for (i, group) in groups.iter().enumerate() {
        term.write_line(&format!(
            "  {} {} ({} files, {})",
            style(format!("Set {}:", i + 1)).bold(),
            style(&group.fingerprint[..12]).dim(),
            group.members.len(),
            format_bytes(group.members.first().map(|m| m.size).unwrap_or(0))
        ))
        .ok();

        for member in &group.members {
            term.write_line(&format!("    {} {}", style("○").dim(), display_path(&member.path)))
                .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("No files were deleted. Use `mediatool consolidate` to keep one copy per set.").dim()
    ))
    .ok();
}

/// Every member but the first of each set, one per line
pub fn print_groups_minimal(groups: &[DuplicateSet]) {
    for group in groups {
        for member in group.members.iter().skip(1) {
            println!("{}", member.path.display());
        }
    }
}

pub fn print_consolidation_report(term: &Term, report: &ConsolidationReport) {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    term.write_line(&format!(
        "{} {} {} duplicate(s); keeping {}",
        style("✓").green().bold(),
        verb,
        style(report.removed_count()).cyan(),
        display_path(&report.keeper)
    ))
    .ok();

    if report.dry_run {
        term.write_line(&format!("{}", style("Dry run: nothing was changed.").dim()))
            .ok();
    }
}

pub fn print_stats(term: &Term, stats: &IndexStats) {
    let rows = [
        ("Records", stats.total_records.to_string()),
        ("Total size", format_bytes(stats.total_bytes)),
        ("Distinct contents", stats.distinct_fingerprints.to_string()),
        ("Duplicate sets", stats.duplicate_sets.to_string()),
        ("Redundant files", stats.redundant_records.to_string()),
        ("Reclaimable", format_bytes(stats.reclaimable_bytes)),
    ];

    for (label, value) in rows {
        term.write_line(&format!("  {:<18} {}", style(label).bold(), style(value).cyan()))
            .ok();
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| MediaToolError::Config(format!("Failed to encode JSON output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
