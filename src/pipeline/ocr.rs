//! OCR collaborator: turn a PDF into per-page Markdown with embedded images.
//!
//! [`MistralOcr`] talks to the Mistral OCR API over plain HTTPS:
//!
//! ```text
//! local file ─▶ POST /files (purpose=ocr) ─▶ GET /files/{id}/url ─┐
//!                                                                  ├─▶ POST /ocr ─▶ pages
//! remote URL ──────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure here is fatal for the run: without OCR output there is
//! nothing to translate.

use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::pipeline::input::DocumentSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variables searched for the Mistral API key, in order.
pub const OCR_KEY_VARS: [&str; 2] = ["MISTRALAI_API_KEY", "MISTRAL_API_KEY"];

/// One OCR page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrPage {
    /// 0-based page index.
    #[serde(default)]
    pub index: usize,
    /// Page Markdown; images appear as `![id](id)`.
    pub markdown: String,
    #[serde(default)]
    pub images: Vec<OcrImage>,
}

/// An image cropped from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrImage {
    /// Identifier unique within the page, e.g. `img-0.jpeg`.
    pub id: String,
    /// `data:` URI with the base64 payload, when requested.
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Produces per-page Markdown for a document.
#[async_trait]
pub trait OcrService: Send + Sync {
    async fn recognise(&self, source: &DocumentSource) -> Result<Vec<OcrPage>, TranslateError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    url: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    pages: Vec<OcrPage>,
}

/// Mistral OCR HTTP client.
pub struct MistralOcr {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    include_images: bool,
}

impl std::fmt::Debug for MistralOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralOcr")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("include_images", &self.include_images)
            .finish()
    }
}

impl MistralOcr {
    /// Build a client from config, falling back to the environment for the key.
    ///
    /// # Errors
    /// [`TranslateError::MissingCredential`] when no key is configured.
    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslateError> {
        let api_key = resolve_ocr_key(config.ocr_api_key.as_deref())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| TranslateError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.ocr_base_url.trim_end_matches('/').to_string(),
            model: config.ocr_model.clone(),
            include_images: config.include_images,
        })
    }

    async fn upload(&self, path: &std::path::Path, file_name: String) -> Result<String, TranslateError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| TranslateError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Uploading {} ({} bytes) for OCR", file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| request_failed("upload", e))?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "ocr")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failed("upload", e))?;
        let upload: UploadResponse = read_json("upload", response).await?;
        debug!("Uploaded file id {}", upload.id);
        Ok(upload.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(format!("{}/files/{}/url", self.base_url, file_id))
            .query(&[("expiry", "24")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| request_failed("signed_url", e))?;
        let signed: SignedUrlResponse = read_json("signed_url", response).await?;
        Ok(signed.url)
    }

    async fn process(&self, document_url: &str) -> Result<Vec<OcrPage>, TranslateError> {
        let body = json!({
            "model": self.model,
            "document": {
                "type": "document_url",
                "document_url": document_url,
            },
            "include_image_base64": self.include_images,
        });
        let response = self
            .client
            .post(format!("{}/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed("ocr", e))?;
        let body = read_body("ocr", response).await?;
        parse_ocr_response(&body)
    }
}

#[async_trait]
impl OcrService for MistralOcr {
    async fn recognise(&self, source: &DocumentSource) -> Result<Vec<OcrPage>, TranslateError> {
        let document_url = match source {
            DocumentSource::Local(path) => {
                let file_id = self.upload(path, source.file_name()).await?;
                self.signed_url(&file_id).await?
            }
            DocumentSource::Remote(url) => url.clone(),
        };
        let pages = self.process(&document_url).await?;
        info!("OCR returned {} pages", pages.len());
        Ok(pages)
    }
}

/// The OCR API key: explicit value first, then [`OCR_KEY_VARS`].
pub fn resolve_ocr_key(explicit: Option<&str>) -> Result<String, TranslateError> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    OCR_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .ok_or_else(|| TranslateError::MissingCredential {
            var: OCR_KEY_VARS.join(" or "),
        })
}

/// Parse an OCR response body into pages.
fn parse_ocr_response(body: &str) -> Result<Vec<OcrPage>, TranslateError> {
    serde_json::from_str::<OcrResponse>(body)
        .map(|r| r.pages)
        .map_err(|e| TranslateError::OcrResponseInvalid {
            detail: e.to_string(),
        })
}

fn request_failed(stage: &str, err: reqwest::Error) -> TranslateError {
    TranslateError::OcrRequestFailed {
        stage: stage.to_string(),
        reason: err.to_string(),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    stage: &str,
    response: reqwest::Response,
) -> Result<T, TranslateError> {
    let body = read_body(stage, response).await?;
    serde_json::from_str(&body).map_err(|e| TranslateError::OcrResponseInvalid {
        detail: format!("{stage}: {e}"),
    })
}

/// Response body of a successful call; any non-2xx status is an error.
async fn read_body(stage: &str, response: reqwest::Response) -> Result<String, TranslateError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| request_failed(stage, e))?;
    if !status.is_success() {
        return Err(TranslateError::OcrRequestFailed {
            stage: stage.to_string(),
            reason: format!("HTTP {}: {}", status, truncate(&body, 300)),
        });
    }
    Ok(body)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r###"{
        "pages": [
            {
                "index": 0,
                "markdown": "# Attention Is All You Need\n\n![img-0.jpeg](img-0.jpeg)",
                "images": [
                    {"id": "img-0.jpeg", "top_left_x": 10, "image_base64": "data:image/jpeg;base64,/9j/4AAQ"}
                ],
                "dimensions": {"dpi": 200, "height": 2200, "width": 1700}
            },
            {"index": 1, "markdown": "## 1 Introduction", "images": []}
        ],
        "model": "mistral-ocr-2503-completion",
        "usage_info": {"pages_processed": 2, "doc_size_bytes": 2215244}
    }"###;

    #[test]
    fn parses_pages_and_images() {
        let pages = parse_ocr_response(FIXTURE).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].images[0].id, "img-0.jpeg");
        assert_eq!(
            pages[0].images[0].image_base64.as_deref(),
            Some("data:image/jpeg;base64,/9j/4AAQ")
        );
        assert_eq!(pages[1].index, 1);
        assert!(pages[1].images.is_empty());
    }

    #[test]
    fn image_without_payload() {
        let pages =
            parse_ocr_response(r#"{"pages":[{"index":0,"markdown":"x","images":[{"id":"a"}]}]}"#)
                .unwrap();
        assert!(pages[0].images[0].image_base64.is_none());
    }

    #[test]
    fn invalid_body_is_reported() {
        let err = parse_ocr_response("{\"detail\": \"Unauthorized\"}").unwrap_err();
        assert!(matches!(err, TranslateError::OcrResponseInvalid { .. }));
    }

    #[test]
    fn explicit_key_wins() {
        assert_eq!(resolve_ocr_key(Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("日本語テキスト", 3), "日本語");
        assert_eq!(truncate("short", 10), "short");
    }
}
