//! Playwright helper script, output parsing, and availability checks.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::{LayoutCheckError, Result};

/// Opens a page, forces the viewport to the frame size, and prints the PNG
/// screenshot as base64 JSON on stdout. Page and browser are closed in `finally`.
pub(crate) const CAPTURE_SCRIPT: &str = r#"
const [, url, width, height, navTimeout, idleTimeout, headlessFlag] = process.argv;

async function run() {
  let browser;
  let page;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    page = await browser.newPage();
    const navMs = parseInt(navTimeout, 10);
    const idleMs = parseInt(idleTimeout, 10);

    await page.goto(url, { waitUntil: 'load', timeout: navMs });
    await page.setViewportSize({
      width: parseInt(width, 10),
      height: parseInt(height, 10)
    });
    try {
      await page.waitForLoadState('networkidle', { timeout: idleMs });
    } catch (_) {
      // long-polling pages never go idle; capture what has rendered
    }

    const png = await page.screenshot({ type: 'png', fullPage: false });
    process.stdout.write(JSON.stringify({ status: 'ok', screenshot: png.toString('base64') }));
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (page) {
      await page.close().catch(() => {});
    }
    if (browser) {
      await browser.close();
    }
  }
}

run();
"#;

pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

const MISSING_PLAYWRIGHT: &str =
    "Playwright npm package is missing; install with `npm install playwright`.";

#[derive(Debug, Deserialize)]
pub(crate) struct CaptureOutput {
    pub status: String,
    pub screenshot: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScriptError {
    pub status: String,
    pub message: String,
}

pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> LayoutCheckError {
    if err.kind() == io::ErrorKind::NotFound {
        LayoutCheckError::page_capture(format!(
            "Unable to spawn Playwright helper; '{command}' was not found on PATH"
        ))
    } else {
        LayoutCheckError::page_capture(format!("Failed to spawn '{command}': {err}"))
    }
}

/// Turn a failed helper run (non-zero exit) into a capture error.
pub(crate) fn map_playwright_error(
    status_text: impl Into<String>,
    stderr: &str,
) -> LayoutCheckError {
    if let Ok(error) = serde_json::from_str::<ScriptError>(stderr.trim()) {
        return map_playwright_status_error(&error.status, error.message);
    }

    let lower = stderr.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        return LayoutCheckError::page_capture(MISSING_PLAYWRIGHT);
    }

    if lower.contains("timeout") {
        return LayoutCheckError::page_capture(format!(
            "Playwright timed out: {}",
            stderr.trim()
        ));
    }

    LayoutCheckError::page_capture(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

pub(crate) fn map_playwright_status_error(status: &str, message: String) -> LayoutCheckError {
    if message
        .to_ascii_lowercase()
        .contains("cannot find module 'playwright'")
    {
        LayoutCheckError::page_capture(MISSING_PLAYWRIGHT)
    } else {
        LayoutCheckError::page_capture(format!("Playwright error (status {status}): {message}"))
    }
}

pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            LayoutCheckError::page_capture(format!(
                "Timed out checking node availability after {NODE_CHECK_TIMEOUT:?}"
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(LayoutCheckError::page_capture(format!(
            "Node command {node_command:?} is not available (exit {status})"
        )));
    }

    Ok(())
}

pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            LayoutCheckError::page_capture(format!(
                "Timed out checking Playwright availability after {NODE_CHECK_TIMEOUT:?}"
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(output.status.to_string(), &stderr));
    }

    Ok(())
}
