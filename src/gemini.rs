use anyhow::{anyhow, Context};
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::codec::{envelope_mime, strip_envelope, wrap_envelope, DEFAULT_IMAGE_MIME};
use crate::error::{MockupError, MockupResult};
use crate::product::ProductType;
use crate::settings::Settings;

/// The image model seen by the orchestration layer. One call, one request;
/// no retries and no caching.
pub trait MockupModel: Send + Sync {
    fn generate<'a>(
        &'a self,
        logo_payload: &'a str,
        product: ProductType,
        custom_instruction: Option<&'a str>,
    ) -> BoxFuture<'a, MockupResult<String>>;

    fn edit<'a>(
        &'a self,
        image_payload: &'a str,
        instruction: &'a str,
    ) -> BoxFuture<'a, MockupResult<String>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineDataRequest {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineDataRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiContentRequest {
    role: String,
    parts: Vec<GeminiPartRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequestBody {
    contents: Vec<GeminiContentRequest>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineDataResponse {
    #[serde(alias = "mime_type")]
    mime_type: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<GeminiInlineDataResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseBody {
    candidates: Option<Vec<GeminiCandidate>>,
}

pub fn build_generate_prompt(product: ProductType, custom_instruction: Option<&str>) -> String {
    let mut prompt = format!(
        "Create a high-quality, photorealistic product shot of a {}.\n\
         Place the provided logo design onto the product naturally.\n\
         The product should be well-lit and look like a professional e-commerce photo.\n",
        product.label()
    );
    if let Some(extra) = custom_instruction.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("Additional instructions: {extra}\n"));
    }
    prompt.push_str(
        "Ensure the logo is clearly visible and centered where appropriate for the item.\n\
         Return only the image.",
    );
    prompt
}

pub fn build_edit_prompt(instruction: &str) -> String {
    format!(
        "Edit this image: {}. Maintain the core product and logo visibility, but apply the requested changes.",
        instruction.trim()
    )
}

fn build_request(image_payload: &str, prompt: String) -> GeminiRequestBody {
    let mime = envelope_mime(image_payload).unwrap_or(DEFAULT_IMAGE_MIME);
    GeminiRequestBody {
        contents: vec![GeminiContentRequest {
            role: "user".to_string(),
            parts: vec![
                GeminiPartRequest {
                    inline_data: Some(GeminiInlineDataRequest {
                        mime_type: mime.to_string(),
                        data: strip_envelope(image_payload).to_string(),
                    }),
                    text: None,
                },
                GeminiPartRequest {
                    inline_data: None,
                    text: Some(prompt),
                },
            ],
        }],
        generation_config: GeminiGenerationConfig {
            response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
        },
    }
}

/// First inline image of the first candidate, re-wrapped as a data URL.
fn extract_inline_image(body: &GeminiResponseBody) -> Option<String> {
    let parts = body
        .candidates
        .as_ref()?
        .first()?
        .content
        .as_ref()?
        .parts
        .as_ref()?;
    for p in parts {
        if let Some(inline) = &p.inline_data {
            if let Some(data) = inline.data.as_deref().filter(|d| !d.is_empty()) {
                let mime = inline.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME);
                return Some(wrap_envelope(mime, data));
            }
        }
        if let Some(t) = &p.text {
            debug!(text = %t, "gemini returned text part");
        }
    }
    None
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key,
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("build http client")?;
        Ok(Self::new(
            http,
            settings.api_key(),
            settings.model(),
            settings.base_url(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn call(&self, body: &GeminiRequestBody) -> anyhow::Result<GeminiResponseBody> {
        let api_key = self.api_key.as_deref().context("Gemini API key not set")?;

        let resp = self
            .http
            .post(self.endpoint())
            .header("X-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .context("gemini image request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let excerpt: String = text.chars().take(300).collect();
            return Err(anyhow!("gemini image error: HTTP {status}: {excerpt}"));
        }

        resp.json().await.context("gemini image parse error")
    }

    #[instrument(skip(self, logo_payload, custom_instruction), fields(model = %self.model, product = %product))]
    pub async fn generate_mockup(
        &self,
        logo_payload: &str,
        product: ProductType,
        custom_instruction: Option<&str>,
    ) -> MockupResult<String> {
        let body = build_request(logo_payload, build_generate_prompt(product, custom_instruction));
        let value = self.call(&body).await.map_err(|e| {
            warn!(error = %e, "mockup generation failed");
            MockupError::GenerationFailed(e)
        })?;
        let image = extract_inline_image(&value).ok_or_else(|| {
            warn!("gemini response carried no inline image");
            MockupError::NoImageReturned
        })?;
        info!("mockup image received");
        Ok(image)
    }

    #[instrument(skip(self, image_payload), fields(model = %self.model))]
    pub async fn edit_mockup(&self, image_payload: &str, instruction: &str) -> MockupResult<String> {
        let body = build_request(image_payload, build_edit_prompt(instruction));
        let value = self.call(&body).await.map_err(|e| {
            warn!(error = %e, "mockup edit failed");
            MockupError::EditFailed(e)
        })?;
        let image = extract_inline_image(&value).ok_or_else(|| {
            warn!("gemini response carried no inline image");
            MockupError::NoImageReturned
        })?;
        info!("edited image received");
        Ok(image)
    }
}

impl MockupModel for GeminiClient {
    fn generate<'a>(
        &'a self,
        logo_payload: &'a str,
        product: ProductType,
        custom_instruction: Option<&'a str>,
    ) -> BoxFuture<'a, MockupResult<String>> {
        self.generate_mockup(logo_payload, product, custom_instruction)
            .boxed()
    }

    fn edit<'a>(
        &'a self,
        image_payload: &'a str,
        instruction: &'a str,
    ) -> BoxFuture<'a, MockupResult<String>> {
        self.edit_mockup(image_payload, instruction).boxed()
    }
}
