//! Upload formats the pipeline accepts, keyed by MIME type.

use image::ImageFormat;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// MIME type handled by the document compressor instead of the resizer.
pub const PDF_MIME: &str = "application/pdf";

/// A raster format the pipeline can decode and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
}

impl SourceFormat {
    /// Map a MIME type to a format. Parameters (`; charset=...`) and case are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceFormat::Jpeg),
            "image/png" => Some(SourceFormat::Png),
            "image/gif" => Some(SourceFormat::Gif),
            _ => None,
        }
    }

    /// Guess from a file extension, for callers that did not get a MIME type.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "jpe" => Some(SourceFormat::Jpeg),
            "png" => Some(SourceFormat::Png),
            "gif" => Some(SourceFormat::Gif),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "image/jpeg",
            SourceFormat::Png => "image/png",
            SourceFormat::Gif => "image/gif",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::Gif => ImageFormat::Gif,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Best-effort MIME type for a path; `application/octet-stream` when unknown.
pub fn guess_mime(path: &Path) -> &'static str {
    if let Some(format) = SourceFormat::from_path(path) {
        return format.mime();
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MIME,
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mime_accepts_the_three_upload_formats() {
        assert_eq!(SourceFormat::from_mime("image/jpeg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_mime("image/png"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_mime("image/gif"), Some(SourceFormat::Gif));
    }

    #[test]
    fn from_mime_ignores_case_and_parameters() {
        assert_eq!(
            SourceFormat::from_mime("Image/PNG; foo=bar"),
            Some(SourceFormat::Png)
        );
    }

    #[test]
    fn from_mime_rejects_other_types() {
        assert_eq!(SourceFormat::from_mime("image/webp"), None);
        assert_eq!(SourceFormat::from_mime("image/tiff"), None);
        assert_eq!(SourceFormat::from_mime(PDF_MIME), None);
        assert_eq!(SourceFormat::from_mime(""), None);
    }

    #[test]
    fn from_path_uses_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a/photo.JPG")),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(SourceFormat::from_path(Path::new("logo.gif")), Some(SourceFormat::Gif));
        assert_eq!(SourceFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn guess_mime_covers_pdf_and_unknown() {
        assert_eq!(guess_mime(Path::new("doc.pdf")), PDF_MIME);
        assert_eq!(guess_mime(Path::new("x.png")), "image/png");
        assert_eq!(guess_mime(Path::new("x.bin")), "application/octet-stream");
    }
}
