use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::metrics::ComparisonResult;
use crate::semantic::SemanticAnalysis;
use crate::service::CheckOutcome;

/// Body returned for a completed check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckLayoutResponse {
    /// `1 - diffRatio` with two decimals.
    pub match_ratio: String,
    #[serde(rename = "analysisFromAI", skip_serializing_if = "Option::is_none")]
    pub analysis_from_ai: Option<SemanticAnalysis>,
    /// Base64-encoded diff PNG.
    pub diff_image: String,
    pub mssim: f64,
    pub diff_count: u64,
    pub diff_ratio: f64,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CheckLayoutResponse {
    pub fn from_comparison(comparison: &ComparisonResult) -> Self {
        Self {
            match_ratio: format_match_ratio(comparison.diff_ratio),
            analysis_from_ai: None,
            diff_image: STANDARD.encode(&comparison.diff_png),
            mssim: comparison.mssim,
            diff_count: comparison.diff_count,
            diff_ratio: comparison.diff_ratio,
            width: comparison.viewport.width,
            height: comparison.viewport.height,
            version: None,
        }
    }
}

impl From<&CheckOutcome> for CheckLayoutResponse {
    fn from(outcome: &CheckOutcome) -> Self {
        Self {
            analysis_from_ai: outcome.analysis.clone(),
            version: outcome.record.as_ref().map(|r| r.version.clone()),
            ..Self::from_comparison(&outcome.comparison)
        }
    }
}

pub fn format_match_ratio(diff_ratio: f64) -> String {
    format!("{:.2}", (1.0 - diff_ratio).clamp(0.0, 1.0))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub error: ErrorPayload,
}

impl ErrorOutput {
    pub fn new(error: ErrorPayload) -> Self {
        Self { error }
    }
}
