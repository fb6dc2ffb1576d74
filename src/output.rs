//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! photo.jpg (image/jpeg, 1000x800)
//!     Original: photo_original.jpg
//!     Primary 800xauto: 800x640 → photo.jpg
//!     001 300xauto: 300x240 → sizes/photo-300w.jpg
//!         compressed by 12.5% (24 kiB → 21 kiB)
//!     002 2000xauto: skipped (2000x1600 is not smaller than the source)
//!     003 (blank): skipped
//!
//! Wrote 1 derivative, 0 failed
//! ```
//!
//! ## Check
//!
//! ```text
//! Defaults
//!     Method: inside
//!     Quality: high
//!     Fill: none
//! Derivatives → sizes/
//!     001 300xauto (inside)
//!     002 150x150 suffix=thumb method=crop (crop)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::compress::CompressionOutcome;
use crate::pipeline::{DerivativeOutcome, DerivativeResult, PipelineReport, PipelineSettings, SkipReason};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Show `path` relative to `base` when possible.
fn display_path(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|b| path.strip_prefix(b).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// One result: header line plus indented compression lines.
fn result_lines(label: &str, result: &DerivativeResult, base: Option<&Path>) -> Vec<String> {
    let mut lines = Vec::new();
    let status = match &result.outcome {
        DerivativeOutcome::Written {
            path,
            width,
            height,
        } => format!("{width}x{height} → {}", display_path(path, base)),
        DerivativeOutcome::Skipped(SkipReason::BlankSpec) => "skipped".to_string(),
        DerivativeOutcome::Skipped(SkipReason::NotSmallerThanSource { width, height }) => {
            format!("skipped ({width}x{height} is not smaller than the source)")
        }
        DerivativeOutcome::Skipped(SkipReason::DuplicatePath { first }) => {
            format!("skipped (same file as {})", format_index(*first))
        }
        DerivativeOutcome::Failed(err) => format!("failed: {err}"),
    };
    lines.push(format!("{}{label}: {status}", indent(1)));

    match &result.compression {
        CompressionOutcome::NotAttempted => {}
        CompressionOutcome::Compressed {
            service,
            summary,
            failures,
        } => {
            for failure in failures {
                lines.push(format!(
                    "{}{} failed: {}",
                    indent(2),
                    failure.service,
                    failure.message
                ));
            }
            lines.push(format!("{}{summary} via {service}", indent(2)));
        }
        CompressionOutcome::AllFailed { failures } => {
            for failure in failures {
                lines.push(format!(
                    "{}{} failed: {}",
                    indent(2),
                    failure.service,
                    failure.message
                ));
            }
        }
    }
    lines
}

fn spec_label(result: &DerivativeResult) -> String {
    if result.spec.is_blank() {
        "(blank)".to_string()
    } else {
        result.spec.to_string()
    }
}

// ============================================================================
// Process
// ============================================================================

/// Format the report of one processed upload.
///
/// Paths are shown relative to the upload's directory.
pub fn format_report(report: &PipelineReport) -> Vec<String> {
    let base = report.source.parent();
    let (width, height) = report.source_dimensions;
    let name = report
        .source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut lines = vec![format!("{name} ({}, {width}x{height})", report.format)];

    if let Some(original) = &report.original_copy {
        lines.push(format!(
            "{}Original: {}",
            indent(1),
            display_path(original, base)
        ));
    }
    if let Some(primary) = &report.primary {
        lines.extend(result_lines(
            &format!("Primary {}", primary.spec),
            primary,
            base,
        ));
    }
    for (i, result) in report.derivatives.iter().enumerate() {
        let label = format!("{} {}", format_index(i + 1), spec_label(result));
        lines.extend(result_lines(&label, result, base));
    }

    lines.push(String::new());
    lines.push(format!(
        "Wrote {}, {} failed",
        plural(report.written_count(), "derivative"),
        report.failed_count()
    ));
    lines
}

pub fn print_report(report: &PipelineReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the effective settings and the derivative list.
pub fn format_settings(settings: &PipelineSettings) -> Vec<String> {
    let mut lines = vec!["Defaults".to_string()];
    lines.push(format!("{}Method: {}", indent(1), settings.default_method));
    lines.push(format!(
        "{}Quality: {}",
        indent(1),
        match settings.quality {
            crate::imaging::ResampleQuality::Fast => "fast",
            crate::imaging::ResampleQuality::High => "high",
        }
    ));
    let fill = match settings.fill {
        Some(color) => {
            let [r, g, b, a] = color.to_rgba();
            format!("#{r:02x}{g:02x}{b:02x} (alpha {a})")
        }
        None => "none".to_string(),
    };
    lines.push(format!("{}Fill: {fill}", indent(1)));
    if settings.allow_upscale {
        lines.push(format!("{}Upscaling allowed", indent(1)));
    }
    if settings.keep_original {
        lines.push(format!("{}Keeping originals", indent(1)));
    }
    if settings.primary_width.is_some() || settings.primary_height.is_some() {
        let dim = |d: Option<crate::imaging::Dimension>| {
            d.map_or_else(|| "auto".to_string(), |d| d.to_string())
        };
        lines.push(format!(
            "{}Primary: {}x{}",
            indent(1),
            dim(settings.primary_width),
            dim(settings.primary_height)
        ));
    }

    let target = if settings.derivative_directory.is_empty() {
        "./".to_string()
    } else {
        format!("{}/", settings.derivative_directory)
    };
    lines.push(format!("Derivatives → {target}"));
    if settings.specs.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, spec) in settings.specs.iter().enumerate() {
        if spec.is_blank() {
            lines.push(format!("{}{} (blank)", indent(1), format_index(i + 1)));
        } else {
            lines.push(format!(
                "{}{} {spec} ({})",
                indent(1),
                format_index(i + 1),
                spec.method_or(settings.default_method)
            ));
        }
    }
    lines
}

pub fn print_settings(settings: &PipelineSettings) {
    for line in format_settings(settings) {
        println!("{}", line);
    }
}
