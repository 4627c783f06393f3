//! Layout Checker
//!
//! Compares a Figma frame against the live web page that implements it.
//! A check resolves the frame size through the Figma API, exports the frame
//! as PNG, captures the page at exactly that viewport through Playwright,
//! and reports a pixel diff, a mean SSIM score and, when configured, a short
//! judgement from a vision-capable language model. Results can be persisted
//! so that repeated checks of the same page and frame bump a version counter.
//!
//! # Module Overview
//!
//! - [`figma`] - Figma URL parsing, frame lookup and PNG export
//! - [`browser`] - Page capture through a Playwright helper process
//! - [`metrics`] - Pixel diff (YIQ) and mean SSIM
//! - [`semantic`] - AI semantic diff advisor
//! - [`store`] - Check configurations, versions and diff artifacts
//! - [`service`] - The end-to-end check pipeline
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use layout_checker::{CheckLayoutRequest, Config, LayoutCheckerService};
//!
//! # async fn example() -> layout_checker::Result<()> {
//! let service = LayoutCheckerService::from_config(&Config::default())?;
//! let outcome = service
//!     .check_layout(CheckLayoutRequest {
//!         figma_url: "https://www.figma.com/design/ABC123/Landing?node-id=1-921".into(),
//!         figma_token: std::env::var("FIGMA_TOKEN").unwrap_or_default(),
//!         website_url: "https://example.com".into(),
//!         project: "default".into(),
//!         threshold: None,
//!     })
//!     .await?;
//! println!("match ratio {:.2}", outcome.match_ratio());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod figma;
pub mod image_loader;
pub mod metrics;
pub mod output;
pub mod semantic;
pub mod service;
pub mod store;
pub mod viewport;

pub use browser::{BrowserManager, BrowserOptions, PageCapturer};
pub use config::Config;
pub use error::{CheckStage, ErrorPayload, LayoutCheckError, Result};
pub use figma::{parse_figma_url, DesignSource, FigmaAuth, FigmaClient, FrameReference};
pub use image_loader::{decode_image, load_image};
pub use metrics::{
    compare_images, ComparisonResult, PerceptualSimilarityEstimator, PixelDiff, PixelDiffEngine,
};
pub use output::{CheckLayoutResponse, ErrorOutput};
pub use semantic::{SemanticAnalysis, SemanticDiffAdvisor};
pub use service::{CheckLayoutRequest, CheckOutcome, LayoutCheckerService};
pub use store::{CheckKey, CheckResultStore, RecordOutcome};
pub use viewport::Viewport;
