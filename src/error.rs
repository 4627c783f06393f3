use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

use crate::image_loader::ImageLoadError;

#[derive(Debug, Error)]
pub enum LayoutCheckError {
    #[error("Invalid Figma reference: {0}")]
    InvalidReference(String),

    #[error("Figma frame not found: {0}")]
    FrameNotFound(String),

    #[error("Figma frame lookup failed: {0}")]
    FrameResolve(String),

    #[error("Reference export failed: {0}")]
    ReferenceExport(String),

    #[error("Page capture failed: {0}")]
    PageCapture(String),

    #[error(
        "Dimension mismatch: reference is {reference_width}x{reference_height}, capture is {capture_width}x{capture_height}"
    )]
    DimensionMismatch {
        reference_width: u32,
        reference_height: u32,
        capture_width: u32,
        capture_height: u32,
    },

    #[error("Image comparison failed: {0}")]
    Comparison(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Result store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LayoutCheckError {
    pub fn reference_export(message: impl Into<String>) -> Self {
        LayoutCheckError::ReferenceExport(message.into())
    }

    pub fn page_capture(message: impl Into<String>) -> Self {
        LayoutCheckError::PageCapture(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        LayoutCheckError::Store(message.into())
    }

    pub fn stage(&self) -> CheckStage {
        match self {
            LayoutCheckError::InvalidReference(_)
            | LayoutCheckError::FrameNotFound(_)
            | LayoutCheckError::FrameResolve(_) => CheckStage::Figma,
            LayoutCheckError::ReferenceExport(_) => CheckStage::Export,
            LayoutCheckError::PageCapture(_) => CheckStage::Capture,
            LayoutCheckError::DimensionMismatch { .. }
            | LayoutCheckError::Image(_)
            | LayoutCheckError::Comparison(_)
            | LayoutCheckError::Task(_) => CheckStage::Diff,
            LayoutCheckError::Store(_) => CheckStage::Store,
            LayoutCheckError::Io(_)
            | LayoutCheckError::InvalidUrl(_)
            | LayoutCheckError::Serialization(_)
            | LayoutCheckError::Config(_) => CheckStage::Config,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let remediation = match self {
            LayoutCheckError::InvalidReference(_) => {
                "Use a Figma share URL like https://www.figma.com/design/<FILE_KEY>/<Title>?node-id=1-2."
            }
            LayoutCheckError::FrameNotFound(_) => {
                "Check that the node-id points at an existing frame and the token can read the file."
            }
            LayoutCheckError::FrameResolve(msg) | LayoutCheckError::ReferenceExport(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("403") || lower.contains("token") {
                    "Check the Figma token permissions for this file."
                } else if lower.contains("rate limit") || lower.contains("429") {
                    "Figma rate limit reached; retry after waiting."
                } else {
                    "Transient Figma export failure; retry the check."
                }
            }
            LayoutCheckError::PageCapture(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    "Install Playwright (`npm install playwright` and `npx playwright install chromium`)."
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    "Install Node.js and ensure the node binary is on PATH."
                } else if lower.contains("timeout") || lower.contains("timed out") {
                    "Increase the navigation/process timeouts or make sure the page finishes loading."
                } else {
                    "Verify the website URL is reachable from this host and retry."
                }
            }
            LayoutCheckError::DimensionMismatch { .. } => {
                "The capture did not match the frame size; check that the page honours the forced viewport."
            }
            LayoutCheckError::Comparison(_) | LayoutCheckError::Task(_) => {
                "Retry the check; run with --verbose for details."
            }
            LayoutCheckError::Store(_) => "Check the state file location and its permissions.",
            LayoutCheckError::Io(_) => "Check file paths/permissions.",
            LayoutCheckError::InvalidUrl(_) => "Verify URL/format (e.g., https://example.com).",
            LayoutCheckError::Image(_) => "Verify the image data is a readable PNG/JPEG/WebP.",
            LayoutCheckError::Serialization(_) => {
                "Check JSON inputs; run with --verbose for details."
            }
            LayoutCheckError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("figma token") || lower.contains("figma_token") {
                    "Pass --figma-token or set FIGMA_TOKEN."
                } else if lower.contains("threshold") {
                    "Threshold must be between 0.0 and 1.0."
                } else {
                    "Check flags and the config file (see --config)."
                }
            }
        };

        ErrorPayload::new(self.stage(), self.to_string(), remediation)
    }
}

impl From<ImageLoadError> for LayoutCheckError {
    fn from(err: ImageLoadError) -> Self {
        match err {
            ImageLoadError::Load(e) => LayoutCheckError::Image(e),
            ImageLoadError::NotFound(path) => LayoutCheckError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("image not found: {path}"),
            )),
            ImageLoadError::Empty => LayoutCheckError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "image is empty (0 bytes)",
            )),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutCheckError>;

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStage {
    Figma,
    Export,
    Capture,
    Diff,
    Store,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub stage: CheckStage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(stage: CheckStage, message: String, remediation: impl Into<String>) -> Self {
        Self {
            stage,
            message,
            remediation: Some(remediation.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_reports_both_sizes() {
        let err = LayoutCheckError::DimensionMismatch {
            reference_width: 800,
            reference_height: 600,
            capture_width: 800,
            capture_height: 400,
        };
        let payload = err.to_payload();
        assert_eq!(payload.stage, CheckStage::Diff);
        assert!(payload.message.contains("800x600"));
        assert!(payload.message.contains("800x400"));
    }

    #[test]
    fn capture_payload_includes_playwright_remediation() {
        let err = LayoutCheckError::page_capture(
            "Playwright npm package is missing; install with `npm install playwright`.",
        );
        let payload = err.to_payload();
        assert_eq!(payload.stage, CheckStage::Capture);
        let remediation = payload.remediation.unwrap_or_default();
        assert!(
            remediation.contains("npm install playwright"),
            "expected remediation to mention npm install playwright, got: {remediation}"
        );
    }

    #[test]
    fn capture_payload_includes_timeout_hint() {
        let err = LayoutCheckError::page_capture("Playwright timed out after 45s");
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.to_ascii_lowercase().contains("timeout"),
            "expected timeout remediation, got: {remediation}"
        );
    }

    #[test]
    fn invalid_reference_maps_to_figma_stage() {
        let err = LayoutCheckError::InvalidReference("missing node-id".into());
        let payload = err.to_payload();
        assert_eq!(payload.stage, CheckStage::Figma);
        assert!(payload
            .remediation
            .unwrap_or_default()
            .contains("node-id=1-2"));
    }

    #[test]
    fn config_payload_includes_figma_token_hint() {
        let err = LayoutCheckError::Config("Figma token is required".into());
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(remediation.contains("FIGMA_TOKEN"));
    }

    #[test]
    fn stage_serializes_lowercase() {
        let json = serde_json::to_string(&CheckStage::Capture).unwrap();
        assert_eq!(json, "\"capture\"");
    }
}
