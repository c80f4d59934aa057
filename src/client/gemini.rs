//! Gemini (Google) generation client.

use crate::client::prompt::build_prompt;
use crate::client::provider::GenerationClient;
use crate::error::{parse_retry_after, sanitize_error_message, ProviderError, Result};
use crate::image::{decode_base64_lenient, ImageData, ImageFormat};
use crate::model::{Configuration, Resolution};
use crate::settings::{Settings, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image (fast, economical).
    Flash,
    /// Gemini 3 Pro Image (highest quality, supports output size).
    #[default]
    Pro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash-image",
            Self::Pro => "gemini-3-pro-image-preview",
        }
    }

    /// Whether the model accepts `imageConfig.imageSize`.
    fn supports_image_size(&self) -> bool {
        matches!(self, Self::Pro)
    }
}

impl std::str::FromStr for GeminiModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flash" | "nano-banana" | "gemini-2.5-flash-image" => Ok(Self::Flash),
            "pro" | "nano-banana-pro" | "gemini-3-pro-image-preview" => Ok(Self::Pro),
            other => Err(format!("unknown Gemini model '{other}'. Valid values: flash, pro")),
        }
    }
}

/// Builder for GeminiClient.
#[derive(Debug, Clone)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    timeout: Duration,
    base_url: String,
}

impl Default for GeminiClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            timeout: DEFAULT_TIMEOUT,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from resolved startup settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.api_key().map(str::to_string),
            model: settings.model(),
            timeout: settings.timeout(),
            ..Self::default()
        }
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the upper bound on one generation call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds the client. A missing key is reported when generating.
    pub fn build(self) -> GeminiClient {
        GeminiClient {
            client: reqwest::Client::new(),
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            model: self.model,
            timeout: self.timeout,
            base_url: self.base_url,
        }
    }
}

/// Gemini generation client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: GeminiModel,
    timeout: Duration,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Builds a client from startup settings.
    pub fn from_settings(settings: &Settings) -> Self {
        GeminiClientBuilder::from_settings(settings).build()
    }

    /// The model this client calls.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    fn api_key(&self) -> std::result::Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Auth("no Gemini API key configured".into()))
    }

    async fn generate_impl(
        &self,
        config: &Configuration,
    ) -> std::result::Result<ImageData, ProviderError> {
        let api_key = self.api_key()?;
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );
        let body = GeminiRequest::from_configuration(config, self.model)?;

        tracing::debug!(
            model = self.model.as_str(),
            ratio = %config.ratio(),
            resolution = %config.resolution(),
            "submitting Gemini generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let payload = response.bytes().await?;
        let gemini_response: GeminiResponse = serde_json::from_slice(&payload)?;
        let image = image_from_response(gemini_response)?;

        tracing::debug!(
            model = self.model.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            size = image.size(),
            "Gemini generation complete"
        );
        Ok(image)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, config: &Configuration) -> Result<ImageData> {
        match tokio::time::timeout(self.timeout, self.generate_impl(config)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProviderError::Timeout(self.timeout).into()),
        }
    }

    fn credential_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}", self.base_url, self.model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(ProviderError::from)?;

        match response.status().as_u16() {
            401 | 403 => Err(ProviderError::Auth("Invalid API key".into()).into()),
            404 => Err(ProviderError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )
            .into()),
            s if !(200..300).contains(&s) => Err(ProviderError::Api {
                status: s,
                message: "Health check failed".into(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> ProviderError {
    let text = sanitize_error_message(text);
    if status == 402 {
        return ProviderError::Billing(
            "Gemini billing issue: enable billing at https://aistudio.google.com".into(),
        );
    }
    if status == 404 {
        return ProviderError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return ProviderError::RateLimited { retry_after };
    }
    let lower = text.to_lowercase();
    if status == 401 || status == 403 || lower.contains("api key not valid") {
        return ProviderError::Auth(text);
    }
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return ProviderError::ContentBlocked(text);
    }
    ProviderError::Api {
        status,
        message: text,
    }
}

fn image_from_response(response: GeminiResponse) -> std::result::Result<ImageData, ProviderError> {
    // Blocks are reported with HTTP 200.
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
            return Err(ProviderError::ContentBlocked(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        ProviderError::UnexpectedResponse("No candidates in Gemini response".into())
    })?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(ProviderError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {finish_reason}"
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                return Err(ProviderError::UnexpectedResponse(format!(
                    "Generation failed: {finish_reason}. Try a different prompt."
                )));
            }
            _ => {} // STOP, MAX_TOKENS, etc. are normal
        }
    }

    let content = candidate.content.ok_or_else(|| {
        ProviderError::UnexpectedResponse("No content in Gemini candidate".into())
    })?;

    let inline_data = content
        .parts
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or_else(|| {
            ProviderError::UnexpectedResponse("No image data in Gemini response".into())
        })?;

    let data = decode_base64_lenient(&inline_data.data)
        .map_err(|e| ProviderError::Decode(e.to_string()))?;
    let format = ImageFormat::from_mime_type(&inline_data.mime_type)
        .or_else(|| ImageFormat::from_magic_bytes(&data))
        .unwrap_or_default();

    Ok(ImageData::new(data, format))
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

impl From<&ImageData> for GeminiRequestPart {
    fn from(image: &ImageData) -> Self {
        Self::InlineData {
            inline_data: GeminiInlineData {
                mime_type: image.mime_type().to_string(),
                data: image.to_base64(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

impl GeminiRequest {
    fn from_configuration(
        config: &Configuration,
        model: GeminiModel,
    ) -> std::result::Result<Self, ProviderError> {
        let product = config
            .product_image()
            .ok_or(ProviderError::MissingProductImage)?;

        let mut parts = vec![GeminiRequestPart::from(product)];
        if let Some(background) = config.background_image() {
            parts.push(GeminiRequestPart::from(background));
        }
        parts.push(GeminiRequestPart::Text {
            text: build_prompt(config),
        });

        let image_size = model.supports_image_size().then(|| {
            match config.resolution() {
                Resolution::Hd => "2K",
                Resolution::Standard => "1K",
            }
            .to_string()
        });

        Ok(Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: GeminiImageConfig {
                    aspect_ratio: config.ratio().as_str().to_string(),
                    image_size,
                },
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PixlyError;
    use crate::model::{AspectRatio, FieldEdit};

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn product_config() -> Configuration {
        Configuration::new().with(FieldEdit::ProductImage(Some(ImageData::new(
            PNG_MAGIC.to_vec(),
            ImageFormat::Png,
        ))))
    }

    fn parse_response(json: &str) -> std::result::Result<ImageData, ProviderError> {
        image_from_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_gemini_model_as_str_and_parse() {
        assert_eq!(GeminiModel::Flash.as_str(), "gemini-2.5-flash-image");
        assert_eq!(GeminiModel::Pro.as_str(), "gemini-3-pro-image-preview");
        assert_eq!("Flash".parse(), Ok(GeminiModel::Flash));
        assert_eq!("nano-banana-pro".parse(), Ok(GeminiModel::Pro));
        assert!("imagen".parse::<GeminiModel>().is_err());
        assert_eq!(GeminiModel::default(), GeminiModel::Pro);
    }

    #[test]
    fn test_builder_credentials() {
        let client = GeminiClient::builder()
            .api_key("test-key")
            .model(GeminiModel::Flash)
            .build();
        assert!(client.credential_configured());
        assert_eq!(client.model(), GeminiModel::Flash);

        assert!(!GeminiClient::builder().api_key("  ").build().credential_configured());

        let settings = Settings::default().with_timeout(Duration::from_secs(5));
        let client = GeminiClient::from_settings(&settings);
        assert!(!client.credential_configured());
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_trims_base_url() {
        let client = GeminiClient::builder().base_url("http://localhost:9/v1/").build();
        assert_eq!(client.base_url, "http://localhost:9/v1");
    }

    #[test]
    fn test_request_construction_basic() {
        let req = GeminiRequest::from_configuration(&product_config(), GeminiModel::Pro).unwrap();

        assert_eq!(req.contents.len(), 1);
        // Product image + text prompt
        assert_eq!(req.contents[0].parts.len(), 2);
        assert!(matches!(
            req.contents[0].parts[0],
            GeminiRequestPart::InlineData { .. }
        ));
        assert!(matches!(
            req.contents[0].parts[1],
            GeminiRequestPart::Text { .. }
        ));
        assert_eq!(req.generation_config.response_modalities, vec!["IMAGE"]);
        assert_eq!(req.generation_config.image_config.aspect_ratio, "1:1");
        assert_eq!(
            req.generation_config.image_config.image_size.as_deref(),
            Some("2K")
        );
    }

    #[test]
    fn test_request_construction_with_background_and_options() {
        let config = product_config()
            .with(FieldEdit::BackgroundImage(Some(ImageData::new(
                vec![0xFF, 0xD8, 0xFF, 0xE0],
                ImageFormat::Jpeg,
            ))))
            .with(FieldEdit::Ratio(AspectRatio::Landscape))
            .with(FieldEdit::Resolution(Resolution::Standard));
        let req = GeminiRequest::from_configuration(&config, GeminiModel::Pro).unwrap();

        assert_eq!(req.contents[0].parts.len(), 3);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert_eq!(json["generationConfig"]["imageConfig"]["imageSize"], "1K");
    }

    #[test]
    fn test_flash_model_omits_image_size() {
        let req = GeminiRequest::from_configuration(&product_config(), GeminiModel::Flash).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["generationConfig"]["imageConfig"].get("imageSize").is_none());
    }

    #[test]
    fn test_request_requires_product_image() {
        let err = GeminiRequest::from_configuration(&Configuration::new(), GeminiModel::Pro)
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingProductImage));
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let req = GeminiRequest::from_configuration(&product_config(), GeminiModel::Pro).unwrap();
        let json = serde_json::to_value(&req).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
        assert_eq!(
            json["contents"][0]["parts"][0]["inline_data"]["data"],
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, PNG_MAGIC)
        );
    }

    #[test]
    fn test_response_with_image() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your photo" },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgoAAAAA" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let image = parse_response(json).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(&image.bytes()[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_response_no_image_data() {
        let json = r#"{ "candidates": [{ "content": { "parts": [{}] } }] }"#;
        assert!(matches!(
            parse_response(json),
            Err(ProviderError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        match parse_response(json) {
            Err(ProviderError::ContentBlocked(msg)) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("expected ContentBlocked, got {other:?}"),
        }
    }

    #[test]
    fn test_response_safety_finish_reason() {
        let json = r#"{ "candidates": [{ "finishReason": "IMAGE_SAFETY" }] }"#;
        assert!(matches!(
            parse_response(json),
            Err(ProviderError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_response_without_candidates() {
        assert!(matches!(
            parse_response("{}"),
            Err(ProviderError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_error_classification() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(parse_error(401, "nope", &headers), ProviderError::Auth(_)));
        assert!(matches!(
            parse_error(400, "API key not valid. Please pass a valid API key.", &headers),
            ProviderError::Auth(_)
        ));
        assert!(matches!(parse_error(402, "", &headers), ProviderError::Billing(_)));
        assert!(matches!(
            parse_error(404, "", &headers),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_error(400, "Request blocked by safety settings", &headers),
            ProviderError::ContentBlocked(_)
        ));
        assert!(matches!(
            parse_error(500, "boom", &headers),
            ProviderError::Api { status: 500, .. }
        ));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        assert!(matches!(
            parse_error(429, "quota", &headers),
            ProviderError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(12)
        ));
    }

    /// Accepts connections and holds them open without ever answering.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    /// Answers one request with a 200 and the given body.
    async fn one_shot_server(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_generate_times_out_when_provider_never_answers() {
        let client = GeminiClient::builder()
            .api_key("test-key")
            .base_url(silent_server().await)
            .timeout(Duration::from_millis(200))
            .build();

        let started = Instant::now();
        let err = client.generate(&product_config()).await.unwrap_err();
        match err {
            PixlyError::Generation(ProviderError::Timeout(d)) => {
                assert_eq!(d, Duration::from_millis(200));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_generate_reports_malformed_response_body() {
        let client = GeminiClient::builder()
            .api_key("test-key")
            .base_url(one_shot_server("not json").await)
            .timeout(Duration::from_secs(10))
            .build();

        let err = client.generate(&product_config()).await.unwrap_err();
        assert!(matches!(err, PixlyError::Generation(ProviderError::Json(_))));
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_before_network() {
        let client = GeminiClient::builder().base_url("http://127.0.0.1:9").build();
        let err = client.generate(&product_config()).await.unwrap_err();
        assert!(matches!(err, PixlyError::Generation(ProviderError::Auth(_))));
    }

    #[tokio::test]
    async fn test_generate_without_product_fails_before_network() {
        let client = GeminiClient::builder()
            .api_key("test-key")
            .base_url("http://127.0.0.1:9")
            .build();
        let err = client.generate(&Configuration::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PixlyError::Generation(ProviderError::MissingProductImage)
        ));
    }
}
