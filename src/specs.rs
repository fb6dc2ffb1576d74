//! Parser for the derivative spec list.
//!
//! One derivative per line, four pipe-separated fields:
//!
//! ```text
//! width|height|suffix|method
//! 300|0                 → 300 wide, height from aspect ratio, suffix "300w"
//! 150|150|thumb|4       → 150x150 center crop, suffix "thumb"
//! 50%||half             → half the source width
//! ```
//!
//! Every field is trimmed and may be left empty. A width or height of zero,
//! a negative number or anything non-numeric counts as omitted. A method code
//! outside 1–6 is ignored and the configured default applies. Fields after
//! the fourth are ignored.

use crate::imaging::{Dimension, ScaleMethod};
use log::warn;
use serde::Serialize;
use std::fmt;

const MAX_FIELDS: usize = 4;

/// One requested derivative.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DerivativeSpec {
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub suffix: Option<String>,
    pub scale_method_override: Option<ScaleMethod>,
}

impl DerivativeSpec {
    /// Neither width nor height given; the pipeline skips these.
    pub fn is_blank(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    pub fn method_or(&self, default: ScaleMethod) -> ScaleMethod {
        self.scale_method_override.unwrap_or(default)
    }
}

impl fmt::Display for DerivativeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim = |d: Option<Dimension>| d.map_or_else(|| "auto".to_string(), |d| d.to_string());
        write!(f, "{}x{}", dim(self.width), dim(self.height))?;
        if let Some(suffix) = &self.suffix {
            write!(f, " suffix={suffix}")?;
        }
        if let Some(method) = self.scale_method_override {
            write!(f, " method={method}")?;
        }
        Ok(())
    }
}

/// Parse a whole spec list. Blank lines yield blank specs so line positions
/// and result positions stay aligned.
pub fn parse_spec_list(text: &str) -> Vec<DerivativeSpec> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let (spec, extra) = parse_spec_line(line);
            if extra > 0 {
                warn!("derivative spec line {}: ignoring {extra} extra field(s)", i + 1);
            }
            spec
        })
        .collect()
}

/// Parse one line. Also returns how many fields past the fourth were dropped.
fn parse_spec_line(line: &str) -> (DerivativeSpec, usize) {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let extra = fields.len().saturating_sub(MAX_FIELDS);
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let spec = DerivativeSpec {
        width: parse_dimension(field(0)),
        height: parse_dimension(field(1)),
        suffix: sanitize_suffix(field(2)),
        scale_method_override: parse_method(field(3)),
    };
    (spec, extra)
}

/// `"300"` → pixels, `"50%"` → percent. Zero, negative and garbage → `None`.
pub fn parse_dimension(raw: &str) -> Option<Dimension> {
    let raw = raw.trim();
    if let Some(pct) = raw.strip_suffix('%') {
        let pct: f64 = pct.trim().parse().ok()?;
        return (pct.is_finite() && pct > 0.0).then_some(Dimension::Percent(pct));
    }
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 1.0 {
        return None;
    }
    Some(Dimension::Pixels(value.trunc().min(u32::MAX as f64) as u32))
}

fn parse_method(raw: &str) -> Option<ScaleMethod> {
    raw.parse::<i64>().ok().and_then(ScaleMethod::from_code)
}

/// Keep only characters that are safe in a file name; empty → `None`.
pub fn sanitize_suffix(raw: &str) -> Option<String> {
    let safe: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let safe = safe.trim_matches('.');
    (!safe.is_empty()).then(|| safe.to_string())
}
