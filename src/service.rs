//! The check pipeline: resolve the frame, export and capture in parallel,
//! diff, ask the advisor, persist.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::GenericImageView;
use tracing::{debug, info, info_span, Instrument};
use url::Url;

use crate::browser::{BrowserManager, BrowserOptions, PageCapturer};
use crate::config::Config;
use crate::figma::{parse_figma_url, DesignSource, FigmaAuth, FigmaClient, FrameReference};
use crate::image_loader::decode_image;
use crate::metrics::{compare_images, ensure_same_dimensions, ComparisonResult};
use crate::semantic::{SemanticAnalysis, SemanticDiffAdvisor};
use crate::store::{CheckKey, CheckResultStore, RecordOutcome};
use crate::{LayoutCheckError, Result, Viewport};

#[derive(Debug, Clone)]
pub struct CheckLayoutRequest {
    pub figma_url: String,
    pub figma_token: String,
    pub website_url: String,
    /// Owning project; part of the stored check identity.
    pub project: String,
    /// Overrides the service threshold for this request.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub frame: FrameReference,
    /// Frame size reported by Figma; the capture viewport.
    pub frame_viewport: Viewport,
    pub comparison: ComparisonResult,
    pub analysis: Option<SemanticAnalysis>,
    pub record: Option<RecordOutcome>,
    pub elapsed: Duration,
}

impl CheckOutcome {
    pub fn match_ratio(&self) -> f64 {
        self.comparison.match_ratio()
    }
}

pub struct LayoutCheckerService {
    design: Arc<dyn DesignSource>,
    capturer: Arc<dyn PageCapturer>,
    advisor: Option<SemanticDiffAdvisor>,
    store: Option<CheckResultStore>,
    threshold: f64,
}

impl LayoutCheckerService {
    pub fn new(design: Arc<dyn DesignSource>, capturer: Arc<dyn PageCapturer>) -> Self {
        Self {
            design,
            capturer,
            advisor: None,
            store: None,
            threshold: crate::metrics::DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_advisor(mut self, advisor: Option<SemanticDiffAdvisor>) -> Self {
        self.advisor = advisor;
        self
    }

    pub fn with_store(mut self, store: Option<CheckResultStore>) -> Self {
        self.store = store;
        self
    }

    /// Wire the Figma client, Playwright manager, advisor and file-backed
    /// store described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| LayoutCheckError::Config(e.to_string()))?;

        let figma =
            FigmaClient::with_base_url_and_timeout(&config.figma.base_url, config.timeouts.figma)?
                .with_scale(config.figma.scale);
        let browser = BrowserManager::new(BrowserOptions::from_config(
            &config.browser,
            &config.timeouts,
        ));
        let advisor = SemanticDiffAdvisor::from_config(&config.semantic, config.timeouts.advisor)?;

        Ok(Self::new(Arc::new(figma), Arc::new(browser))
            .with_threshold(config.threshold)
            .with_advisor(advisor)
            .with_store(Some(CheckResultStore::from_config(&config.storage))))
    }

    pub async fn check_layout(&self, request: CheckLayoutRequest) -> Result<CheckOutcome> {
        let span = info_span!("check_layout", website = %request.website_url);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: CheckLayoutRequest) -> Result<CheckOutcome> {
        let start = Instant::now();
        let threshold = request.threshold.unwrap_or(self.threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LayoutCheckError::Config(format!(
                "threshold must be within 0.0..=1.0 (got {threshold})"
            )));
        }

        let frame = parse_figma_url(&request.figma_url)?;
        if request.figma_token.trim().is_empty() {
            return Err(LayoutCheckError::Config("Figma token is required".into()));
        }
        Url::parse(&request.website_url)?;
        let auth = FigmaAuth::PersonalAccessToken(request.figma_token.clone());

        info!(file_key = %frame.file_key, node_id = %frame.frame_node_id, "resolving Figma frame");
        let frame_viewport = self.design.frame_dimensions(&auth, &frame).await?;

        info!(viewport = %frame_viewport, "exporting reference and capturing page");
        let (reference_png, capture_png) = tokio::try_join!(
            self.design.export_reference(&auth, &frame),
            self.capturer.capture(&request.website_url, frame_viewport),
        )?;

        let reference = decode_image(&reference_png).map_err(|e| {
            LayoutCheckError::reference_export(format!("reference export is not an image: {e}"))
        })?;
        let capture = decode_image(&capture_png).map_err(|e| {
            LayoutCheckError::page_capture(format!("screenshot is not an image: {e}"))
        })?;
        debug!(
            reference = ?reference.dimensions(),
            capture = ?capture.dimensions(),
            "decoded images"
        );
        ensure_same_dimensions(&reference, &capture)?;

        info!(threshold, "computing pixel diff and SSIM");
        let comparison = tokio::task::spawn_blocking(move || {
            compare_images(&reference, &capture, threshold)
        })
        .await
        .map_err(|e| LayoutCheckError::Task(format!("diff worker failed: {e}")))??;

        let analysis = match &self.advisor {
            Some(advisor) => Some(
                advisor
                    .advise(
                        &reference_png,
                        &capture_png,
                        comparison.mssim,
                        comparison.diff_ratio,
                    )
                    .await,
            ),
            None => None,
        };

        let record = match &self.store {
            Some(store) => {
                let key = CheckKey {
                    website_url: request.website_url.clone(),
                    figma_url: request.figma_url.clone(),
                    figma_token: request.figma_token.clone(),
                    project: request.project.clone(),
                };
                Some(store.record_diff(&key, &comparison.diff_png).await?)
            }
            None => None,
        };

        let elapsed = start.elapsed();
        info!(
            diff_count = comparison.diff_count,
            diff_ratio = comparison.diff_ratio,
            mssim = comparison.mssim,
            version = record.as_ref().map(|r| r.version.as_str()),
            elapsed_ms = elapsed.as_millis() as u64,
            "layout check finished"
        );

        Ok(CheckOutcome {
            frame,
            frame_viewport,
            comparison,
            analysis,
            record,
            elapsed,
        })
    }
}
