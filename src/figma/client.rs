//! Figma API client for resolving frame dimensions and exporting reference images.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::api_types::{FigmaImageExport, FigmaNodesResponse, ImageFormat};
use super::reference::FrameReference;
use super::DesignSource;
use crate::{LayoutCheckError, Result, Viewport};

pub const DEFAULT_BASE_URL: &str = "https://api.figma.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum FigmaAuth {
    PersonalAccessToken(String),
}

impl FigmaAuth {
    pub fn token(&self) -> &str {
        match self {
            FigmaAuth::PersonalAccessToken(token) => token,
        }
    }

    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            FigmaAuth::PersonalAccessToken(token) => builder.header("X-FIGMA-TOKEN", token),
        }
    }
}

#[derive(Debug, Error)]
pub enum FigmaError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Figma API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected Figma response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Missing access token")]
    MissingToken,
}

impl FigmaError {
    fn status(&self) -> Option<u16> {
        match self {
            FigmaError::Api { status, .. } => Some(*status),
            FigmaError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// HTTP client for the Figma REST API. The token is supplied per call because
/// each check carries its own.
#[derive(Debug, Clone)]
pub struct FigmaClient {
    http: reqwest::Client,
    base_url: Url,
    scale: f32,
}

impl FigmaClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url_and_timeout(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url_and_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LayoutCheckError::Config(format!("Failed to build Figma client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            scale: 1.0,
        })
    }

    /// Export scale for reference images (defaults to 1 so the PNG matches the frame size).
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub async fn get_file_nodes(
        &self,
        auth: &FigmaAuth,
        file_key: &str,
        node_ids: &[&str],
    ) -> std::result::Result<FigmaNodesResponse, FigmaError> {
        let ids = node_ids.join(",");
        let url = self.endpoint(&format!("/v1/files/{file_key}/nodes"), &[("ids", ids.as_str())]);
        self.send_json(auth, self.http.get(url)).await
    }

    /// Ask Figma to render a node; returns the short-lived image URL.
    pub async fn export_image(
        &self,
        auth: &FigmaAuth,
        file_key: &str,
        node_id: &str,
        format: ImageFormat,
        scale: f32,
    ) -> std::result::Result<Option<String>, FigmaError> {
        let scale = scale.to_string();
        let url = self.endpoint(
            &format!("/v1/images/{file_key}"),
            &[
                ("ids", node_id),
                ("format", format.as_str()),
                ("scale", scale.as_str()),
            ],
        );
        let export: FigmaImageExport = self.send_json(auth, self.http.get(url)).await?;
        if let Some(err) = export.err.filter(|e| !e.is_empty()) {
            return Err(FigmaError::Api {
                status: 200,
                message: err,
            });
        }
        Ok(export.images.get(node_id).cloned().flatten())
    }

    pub async fn download_image(&self, url: &str) -> std::result::Result<Vec<u8>, FigmaError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FigmaError::Api {
                status: status.as_u16(),
                message: format!(
                    "failed to download image: {}",
                    response.text().await.unwrap_or_default()
                ),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}{path}"));
        url.query_pairs_mut().clear().extend_pairs(query.iter());
        url
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        auth: &FigmaAuth,
        request: RequestBuilder,
    ) -> std::result::Result<T, FigmaError> {
        if auth.token().is_empty() {
            return Err(FigmaError::MissingToken);
        }
        let response = auth.apply(request).send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        Err(FigmaError::Api {
            status: status.as_u16(),
            message: error_message(status, &body, retry_after.as_deref()),
        })
    }
}

#[async_trait]
impl DesignSource for FigmaClient {
    async fn frame_dimensions(&self, auth: &FigmaAuth, frame: &FrameReference) -> Result<Viewport> {
        debug!(
            file_key = %frame.file_key,
            node_id = %frame.frame_node_id,
            "fetching Figma frame node"
        );
        let response = self
            .get_file_nodes(auth, &frame.file_key, &[frame.frame_node_id.as_str()])
            .await
            .map_err(|e| match e.status() {
                Some(404) => LayoutCheckError::FrameNotFound(format!(
                    "file {} has no node {}: {e}",
                    frame.file_key, frame.frame_node_id
                )),
                _ => LayoutCheckError::FrameResolve(format!(
                    "failed to fetch frame {}: {e}",
                    frame.frame_node_id
                )),
            })?;

        let document = response
            .nodes
            .get(&frame.frame_node_id)
            .and_then(|wrapper| wrapper.as_ref())
            .and_then(|wrapper| wrapper.document.as_ref())
            .ok_or_else(|| {
                LayoutCheckError::FrameNotFound(format!(
                    "Figma returned no document for node {} in file {}",
                    frame.frame_node_id, frame.file_key
                ))
            })?;

        let bbox = document.absolute_bounding_box.ok_or_else(|| {
            LayoutCheckError::FrameNotFound(format!(
                "node {} ({}) has no absoluteBoundingBox",
                document.id, document.node_type
            ))
        })?;

        Viewport::from_frame_size(bbox.width, bbox.height).ok_or_else(|| {
            LayoutCheckError::FrameNotFound(format!(
                "node {} has a degenerate bounding box {}x{}",
                document.id, bbox.width, bbox.height
            ))
        })
    }

    async fn export_reference(&self, auth: &FigmaAuth, frame: &FrameReference) -> Result<Vec<u8>> {
        let image_url = self
            .export_image(
                auth,
                &frame.file_key,
                &frame.frame_node_id,
                ImageFormat::Png,
                self.scale,
            )
            .await
            .map_err(|e| LayoutCheckError::reference_export(e.to_string()))?
            .ok_or_else(|| {
                LayoutCheckError::reference_export(format!(
                    "Figma returned no image URL for node {}",
                    frame.frame_node_id
                ))
            })?;

        debug!(%image_url, "downloading reference export");
        self.download_image(&image_url)
            .await
            .map_err(|e| LayoutCheckError::reference_export(e.to_string()))
    }
}

fn error_message(status: StatusCode, body: &str, retry_after: Option<&str>) -> String {
    let fallback = format!("Figma API returned status {}", status.as_u16());
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_body = parsed
        .as_ref()
        .and_then(|value| value.get("err").or_else(|| value.get("error")))
        .and_then(Value::as_str)
        .map(str::to_owned);

    match (status, retry_after, from_body) {
        (StatusCode::TOO_MANY_REQUESTS, Some(retry), Some(msg)) => {
            format!("{msg} (rate limited, retry after {retry}s)")
        }
        (StatusCode::TOO_MANY_REQUESTS, Some(retry), None) => {
            format!("rate limited by Figma API, retry after {retry}s")
        }
        (_, _, Some(msg)) => msg,
        _ => fallback,
    }
}
