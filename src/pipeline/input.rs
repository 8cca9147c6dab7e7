//! Input resolution: normalise a user-supplied path or URL to a
//! [`DocumentSource`] the OCR service can consume.
//!
//! Local files are validated up front (existence, read permission, `%PDF`
//! magic bytes) so the user gets a clear error before anything is uploaded.
//! URLs are handed to the OCR service as-is; it fetches them itself.

use crate::error::TranslateError;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A validated local PDF, uploaded before OCR.
    Local(PathBuf),
    /// A public HTTP/HTTPS URL passed straight to the OCR service.
    Remote(String),
}

impl DocumentSource {
    /// File stem used to name output files ("paper" for `dir/paper.pdf`).
    pub fn stem(&self) -> String {
        let name = match self {
            DocumentSource::Local(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned()),
            DocumentSource::Remote(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|p| p.rsplit('/').next())
                .filter(|s| !s.is_empty())
                .map(|s| s.strip_suffix(".pdf").unwrap_or(s).to_string()),
        };
        name.unwrap_or_else(|| "document".to_string())
    }

    /// File name sent with the upload.
    pub fn file_name(&self) -> String {
        match self {
            DocumentSource::Local(path) => path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string()),
            DocumentSource::Remote(_) => format!("{}.pdf", self.stem()),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a document source.
pub fn resolve_input(input: &str) -> Result<DocumentSource, TranslateError> {
    if is_url(input) {
        reqwest::Url::parse(input).map_err(|_| TranslateError::InvalidInput {
            input: input.to_string(),
        })?;
        debug!("Resolved remote PDF: {}", input);
        Ok(DocumentSource::Remote(input.to_string()))
    } else if input.trim().is_empty() {
        Err(TranslateError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        resolve_local(input).map(DocumentSource::Local)
    }
}

/// Validate a local file path: it exists, is readable and starts with `%PDF`.
fn resolve_local(path_str: &str) -> Result<PathBuf, TranslateError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(TranslateError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(TranslateError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TranslateError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(TranslateError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://arxiv.org/pdf/1706.03762"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn missing_file() {
        let err = resolve_input("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, TranslateError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_non_pdf() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"PK\x03\x04zip").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap()).unwrap_err();
        match err {
            TranslateError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn accepts_pdf() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.7\n").unwrap();
        let source = resolve_input(tmp.path().to_str().unwrap()).unwrap();
        assert!(matches!(source, DocumentSource::Local(_)));
        assert!(source.file_name().ends_with(".pdf"));
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(matches!(
            resolve_input("  "),
            Err(TranslateError::InvalidInput { .. })
        ));
    }

    #[test]
    fn stems() {
        assert_eq!(DocumentSource::Local("data/attention.pdf".into()).stem(), "attention");
        assert_eq!(
            DocumentSource::Remote("https://arxiv.org/pdf/1706.03762v7.pdf?x=1".into()).stem(),
            "1706.03762v7"
        );
        assert_eq!(
            DocumentSource::Remote("https://arxiv.org/pdf/1706.03762".into()).stem(),
            "1706.03762"
        );
        assert_eq!(DocumentSource::Remote("https://example.com/".into()).stem(), "document");
    }
}
