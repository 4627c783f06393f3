//! Figma integration: share-URL parsing, frame dimension lookup, and reference export.
//!
//! - [`FrameReference`] - file key + frame node id parsed from a share URL
//! - [`FigmaClient`] - HTTP client for the Figma REST API
//! - [`DesignSource`] - the seam the checker uses, so tests can swap in fakes

pub mod api_types;
pub mod client;
pub mod reference;


use async_trait::async_trait;

pub use client::{FigmaAuth, FigmaClient, FigmaError};
pub use reference::{parse_figma_url, FrameReference};

use crate::{Result, Viewport};

/// Where reference frames come from.
#[async_trait]
pub trait DesignSource: Send + Sync {
    /// Authoritative pixel size of the frame (`absoluteBoundingBox`).
    async fn frame_dimensions(&self, auth: &FigmaAuth, frame: &FrameReference) -> Result<Viewport>;

    /// PNG bytes of the frame rendered at the configured scale.
    async fn export_reference(&self, auth: &FigmaAuth, frame: &FrameReference) -> Result<Vec<u8>>;
}
