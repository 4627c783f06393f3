//! Live page capture through Playwright (driven by a Node.js helper).
//!
//! - [`manager`] - session limiting, helper process lifecycle, timeouts
//! - [`playwright`] - the helper script, error mapping, availability checks

mod manager;
mod playwright;

use async_trait::async_trait;

pub use manager::{
    BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
    DEFAULT_PROCESS_TIMEOUT,
};

use crate::{Result, Viewport};

/// Renders a live page to PNG bytes at a forced viewport.
#[async_trait]
pub trait PageCapturer: Send + Sync {
    async fn capture(&self, url: &str, viewport: Viewport) -> Result<Vec<u8>>;
}
