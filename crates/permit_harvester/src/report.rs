//! Operator-facing console output: banner, per-document progress lines and
//! the end-of-run summary.

use std::fmt::Write as _;

use permit_core::size_in_mb;
use permit_engine::{ProgressSink, RunEvent, RunReport};

use crate::config::AppConfig;

const RULE_WIDTH: usize = 60;
const TITLE_PREVIEW: usize = 10;

/// Prints each [`RunEvent`] as one stdout line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: RunEvent) {
        if let Some(line) = render_event(&event) {
            println!("{line}");
        }
    }
}

pub fn render_event(event: &RunEvent) -> Option<String> {
    let line = match event {
        RunEvent::ListingRequested { url } => format!("Scraping documents from: {url}"),
        RunEvent::ListingParsed { found, duplicates } => {
            if *duplicates > 0 {
                format!("Found {found} documents ({duplicates} duplicates removed)")
            } else {
                format!("Found {found} documents")
            }
        }
        RunEvent::DocumentStarted {
            index,
            total,
            title,
        } => format!("\n[{}/{total}] Processing: {title}", index + 1),
        RunEvent::DocumentDownloaded { bytes, .. } => {
            format!("  [OK] Downloaded ({:.2} MB)", size_in_mb(*bytes))
        }
        RunEvent::DocumentUploaded { s3_url, .. } => format!("  [OK] Uploaded to {s3_url}"),
        RunEvent::DocumentFailed { step, reason, .. } => {
            format!("  [FAILED] {step} failed: {reason}")
        }
        RunEvent::ManifestSaved { path } => {
            format!("\n[OK] Saved manifest to: {}", path.display())
        }
        RunEvent::ManifestPublished { s3_url } => format!("[OK] Uploaded manifest to {s3_url}"),
        RunEvent::ManifestFailed { reason } => format!("[WARN] Manifest: {reason}"),
        RunEvent::Aborted { reason } => format!("[ERROR] {reason}"),
        RunEvent::Finished => return None,
    };
    Some(line)
}

pub fn print_banner(config: &AppConfig) {
    print!("{}", render_banner(config));
}

pub fn render_banner(config: &AppConfig) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Permit Harvester: {}", config.jurisdiction);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Listing: {}", config.listing_url);
    let _ = writeln!(out, "S3 location: {}", config.s3_location());
    let _ = writeln!(out, "Local directory: {}", config.download_dir.display());
    if config.storage.credentials.is_none() {
        let _ = writeln!(out, "[WARN] No storage credentials configured; uploads will fail");
    }
    out
}

pub fn print_summary(config: &AppConfig, report: &RunReport) {
    print!("{}", render_summary(config, report));
}

pub fn render_summary(config: &AppConfig, report: &RunReport) -> String {
    let summary = &report.summary;
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Documents found: {}", summary.found);
    let _ = writeln!(out, "Downloaded: {}", summary.downloaded);
    let _ = writeln!(out, "Uploaded to S3: {}", summary.uploaded);
    let _ = writeln!(out, "Local directory: {}", config.download_dir.display());
    let _ = writeln!(out, "S3 location: {}", config.s3_location());
    let _ = writeln!(out, "Total size: {:.2} MB", summary.total_mb);

    let (shown, remaining) = summary.title_preview(TITLE_PREVIEW);
    if !shown.is_empty() {
        let _ = writeln!(out, "\nDocuments:");
        for title in shown {
            let _ = writeln!(out, "  - {title}");
        }
        if remaining > 0 {
            let _ = writeln!(out, "  ... and {remaining} more");
        }
    }

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "\nFailed ({}):", summary.failures.len());
        for failure in &summary.failures {
            let _ = writeln!(
                out,
                "  - {} ({} failed): {}",
                failure.title, failure.step, failure.reason
            );
        }
    }

    match (&report.manifest_path, &report.manifest_error) {
        (Some(path), None) => {
            let _ = writeln!(out, "\nManifest: {}", path.display());
        }
        (Some(path), Some(err)) => {
            let _ = writeln!(out, "\nManifest: {} ({err})", path.display());
        }
        (None, Some(err)) => {
            let _ = writeln!(out, "\nManifest: not written ({err})");
        }
        (None, None) => {}
    }
    out
}
