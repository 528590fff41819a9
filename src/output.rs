//! CLI output formatting for `check` and `build`.
//!
//! # Information-First Display
//!
//! Every group is shown by its identity (positional index and name) with
//! files as indented context underneath, so the output reads as a gallery
//! inventory while still tracing each entry back to a file on disk.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Groups
//! 001 Aish (2 items)
//!     1 Bride_Aish_1.jpg → bride_aish_1.avif
//!     2 Bride_Aish_2.mp4 → bride_aish_2.mp4
//!
//! Collection (1 item)
//!     1 IMG_0007.jpg → bride_collection_1.avif
//!
//! Unused
//!     Bride_Aish_5.jpg (slot 5 above 3)
//!
//! Skipped
//!     .DS_Store (hidden)
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 Aish (2 items)
//!     001 /gallery/bride_aish_1.avif 1200x1800
//!     002 /gallery/bride_aish_2.mp4 720x1280 (poster)
//! 002 Collection 1 (1 item)
//!     001 /gallery/bride_collection_1.avif 1200x1800
//!
//! Failed
//!     Meera_1.mov: transcoding failed: ffmpeg exited with ...
//!
//! Wrote 3 items in 2 groups to src/data/gallery-processed.json
//! Cache: 2 cached, 1 transcoded (3 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::classify::{IngestPlan, MAX_SLOTS};
use crate::manifest::GalleryItem;
use crate::pipeline::BuildReport;
use crate::scan::ScanResult;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn items_label(n: usize) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{n} items")
    }
}

/// Positional index + group name + item count.
///
/// ```text
/// 001 Aish (2 items)
/// ```
fn group_header(index: usize, name: &str, count: usize) -> String {
    format!("{} {} ({})", format_index(index), name, items_label(count))
}

fn item_line(index: usize, item: &GalleryItem) -> String {
    let poster = if item.poster.is_some() { " (poster)" } else { "" };
    format!(
        "{} {} {}x{}{}",
        format_index(index),
        item.src,
        item.width,
        item.height,
        poster
    )
}

// ============================================================================
// check
// ============================================================================

/// Format the ingest plan: what would be transcoded, and what would not.
pub fn format_plan(scanned: &ScanResult, plan: &IngestPlan) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Groups".to_string());
    if plan.groups.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, group) in plan.groups.iter().enumerate() {
        let name = crate::manifest::display_name(&group.subject);
        lines.push(group_header(i + 1, &name, group.items.len()));
        for item in &group.items {
            lines.push(format!(
                "{}{} {} → {}",
                indent(1),
                item.slot,
                item.file.filename,
                item.derivative_name()
            ));
        }
    }

    if !plan.collection.is_empty() {
        lines.push(String::new());
        lines.push(format!("Collection ({})", items_label(plan.collection.len())));
        for item in &plan.collection {
            lines.push(format!(
                "{}{} {} → {}",
                indent(1),
                item.slot,
                item.file.filename,
                item.derivative_name()
            ));
        }
    }

    if !plan.over_cap.is_empty() || !plan.dropped.is_empty() {
        lines.push(String::new());
        lines.push("Unused".to_string());
        for item in &plan.over_cap {
            lines.push(format!(
                "{}{} (slot {} above {})",
                indent(1),
                item.file.filename,
                item.slot,
                MAX_SLOTS
            ));
        }
        for file in &plan.dropped {
            lines.push(format!("{}{} (no slot)", indent(1), file.filename));
        }
    }

    if !scanned.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for (name, reason) in &scanned.skipped {
            lines.push(format!("{}{} ({})", indent(1), name, reason));
        }
    }

    lines
}

/// Print the ingest plan to stdout.
pub fn print_plan(scanned: &ScanResult, plan: &IngestPlan) {
    for line in format_plan(scanned, plan) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format a finished build: the manifest as written, failures, totals.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, group) in report.manifest.iter().enumerate() {
        lines.push(group_header(i + 1, &group.group, group.items.len()));
        for (j, item) in group.items.iter().enumerate() {
            lines.push(format!("{}{}", indent(1), item_line(j + 1, item)));
        }
    }

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failure in &report.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.file, failure.error));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Wrote {} in {} group{} to {}",
        items_label(report.item_count()),
        report.manifest.len(),
        if report.manifest.len() == 1 { "" } else { "s" },
        report.manifest_path.display()
    ));
    if report.cache.total() > 0 {
        lines.push(format!("Cache: {}", report.cache));
    }

    lines
}

/// Print a build report to stdout.
pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}
