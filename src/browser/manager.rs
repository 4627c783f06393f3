//! Browser session management with semaphore-based concurrency limiting.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info};

use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_playwright_error,
    map_playwright_status_error, map_spawn_error, CaptureOutput, CAPTURE_SCRIPT,
};
use super::PageCapturer;
use crate::config::{BrowserConfig, Timeouts};
use crate::{LayoutCheckError, Result, Viewport};

pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for the whole helper process, including browser launch.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub node_command: String,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub process_timeout: Duration,
    pub max_concurrent_sessions: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            max_concurrent_sessions: 1,
        }
    }
}

impl BrowserOptions {
    pub fn from_config(browser: &BrowserConfig, timeouts: &Timeouts) -> Self {
        Self {
            node_command: browser.node_command.clone(),
            headless: browser.headless,
            navigation_timeout: timeouts.navigation,
            network_idle_timeout: timeouts.network_idle,
            process_timeout: timeouts.process,
            max_concurrent_sessions: browser.max_concurrent_sessions,
        }
    }
}

/// Runs Playwright captures, at most `max_concurrent_sessions` at a time.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
}

impl BrowserManager {
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Capture `url` at exactly `viewport` and return the PNG bytes.
    pub async fn screenshot(&self, url: &str, viewport: Viewport) -> Result<Vec<u8>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| LayoutCheckError::page_capture("Browser manager unavailable"))?;

        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;

        info!(%url, %viewport, "capturing live page");
        let start = Instant::now();
        let png = self.run_playwright(url, viewport).await?;
        debug!(
            bytes = png.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "capture finished"
        );
        Ok(png)
    }

    async fn run_playwright(&self, url: &str, viewport: Viewport) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(CAPTURE_SCRIPT)
            .arg(url)
            .arg(viewport.width.to_string())
            .arg(viewport.height.to_string())
            .arg(self.options.navigation_timeout.as_millis().to_string())
            .arg(self.options.network_idle_timeout.as_millis().to_string())
            .arg(if self.options.headless { "1" } else { "0" })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout_pipe {
                let _ = out.read_to_end(&mut buf).await;
            }
            buf
        });

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr_pipe {
                let _ = err.read_to_end(&mut buf).await;
            }
            buf
        });

        let status = match timeout(self.options.process_timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                return Err(LayoutCheckError::page_capture(format!(
                    "Failed waiting for Playwright: {err}"
                )))
            }
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                return Err(LayoutCheckError::page_capture(format!(
                    "Playwright timed out after {:?}",
                    self.options.process_timeout
                )));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(map_playwright_error(status.to_string(), &stderr));
        }

        decode_capture_output(&stdout)
    }
}

fn decode_capture_output(stdout: &[u8]) -> Result<Vec<u8>> {
    let stdout = String::from_utf8_lossy(stdout);
    let output: CaptureOutput = serde_json::from_str(stdout.trim()).map_err(|e| {
        LayoutCheckError::page_capture(format!(
            "Unexpected Playwright output ({e}): {}",
            truncate(stdout.trim(), 200)
        ))
    })?;

    if output.status != "ok" {
        return Err(map_playwright_status_error(
            &output.status,
            output
                .message
                .unwrap_or_else(|| "no additional details".to_string()),
        ));
    }

    let encoded = output.screenshot.ok_or_else(|| {
        LayoutCheckError::page_capture("Playwright returned ok status but no screenshot")
    })?;

    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| LayoutCheckError::page_capture(format!("Screenshot is not valid base64: {e}")))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl PageCapturer for BrowserManager {
    async fn capture(&self, url: &str, viewport: Viewport) -> Result<Vec<u8>> {
        self.screenshot(url, viewport).await
    }
}
