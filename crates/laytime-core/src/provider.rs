//! Text extraction providers: document bytes in, plain text out.
//!
//! PDF and DOCX parsing live outside this crate. [`PlainTextProvider`]
//! covers text exports; other formats are rejected with
//! [`ProviderError::UnsupportedFormat`] so a caller can route them to a
//! provider that understands them.

use std::path::Path;

use crate::domain::ProviderError;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_MARKDOWN: &str = "text/markdown";

/// Turns raw document bytes into text for the engine.
pub trait TextExtractionProvider: Send + Sync {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ProviderError>;
}

/// Accepts UTF-8 `text/plain` and `text/markdown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextProvider;

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl TextExtractionProvider for PlainTextProvider {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ProviderError> {
        match media_type(content_type).as_str() {
            TEXT_PLAIN | TEXT_MARKDOWN => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| ProviderError::ExtractionFailed(format!("invalid UTF-8: {e}")))?;
                Ok(text.trim_start_matches('\u{feff}').to_string())
            }
            other => Err(ProviderError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Content type guessed from a file extension.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("md" | "markdown") => TEXT_MARKDOWN,
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        _ => TEXT_PLAIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = PlainTextProvider
            .extract("\u{feff}Vessel berthed".as_bytes(), "text/plain; charset=utf-8")
            .expect("plain text");
        assert_eq!(text, "Vessel berthed");
    }

    #[test]
    fn invalid_utf8_fails_extraction() {
        let err = PlainTextProvider
            .extract(&[0xff, 0xfe, 0x00], TEXT_PLAIN)
            .expect_err("invalid utf-8");
        assert!(matches!(err, ProviderError::ExtractionFailed(_)));
    }

    #[test]
    fn pdf_is_unsupported() {
        let err = PlainTextProvider
            .extract(b"%PDF-1.7", "application/pdf")
            .expect_err("pdf unsupported");
        assert!(matches!(err, ProviderError::UnsupportedFormat(t) if t == "application/pdf"));
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_path(Path::new("sof.MD")), TEXT_MARKDOWN);
        assert_eq!(content_type_for_path(Path::new("sof.pdf")), "application/pdf");
        assert_eq!(content_type_for_path(Path::new("sof")), TEXT_PLAIN);
    }
}
