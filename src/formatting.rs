use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use layout_checker::{CheckLayoutResponse, ErrorOutput, LayoutCheckError};
use serde::Serialize;

use crate::cli::OutputFormat;

/// Exit code for any failed check or command.
pub const EXIT_ERROR: u8 = 2;

/// Write the response in the requested format.
pub fn write_output(
    body: &CheckLayoutResponse,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json(body, output.as_deref())?,
        OutputFormat::Pretty => {
            write_pretty(body, output.as_deref(), |colorize| format_pretty(body, colorize))?
        }
    };
    Ok(())
}

/// Render an error and return the fatal exit code.
pub fn render_error(
    err: LayoutCheckError,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let payload = ErrorOutput::new(err.to_payload());

    let result = match format {
        OutputFormat::Json => write_json(&payload, output.as_deref()),
        OutputFormat::Pretty => write_pretty(&payload, output.as_deref(), |colorize| {
            format_error(&payload, colorize)
        }),
    };
    if let Err(write_err) = result {
        eprintln!("Failed to write error output: {write_err}");
        eprintln!("{}", payload.error.message);
    }

    ExitCode::from(EXIT_ERROR)
}

fn write_json<T: Serialize>(
    body: &T,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

fn write_pretty<T: Serialize>(
    body: &T,
    output: Option<&Path>,
    human: impl FnOnce(bool) -> String,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_human = output.is_none() && io::stdout().is_terminal();
    if use_human {
        println!("{}", human(true));
        return Ok(());
    }

    // Files and pipes keep the JSON shape.
    let content = serde_json::to_string_pretty(body)?;
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Terminal rendering of a check result.
pub fn format_pretty(body: &CheckLayoutResponse, colorize: bool) -> String {
    let mut buf = String::new();
    let ratio: f64 = body.match_ratio.parse().unwrap_or(0.0);
    let code = if ratio >= 0.99 {
        "32"
    } else if ratio >= 0.9 {
        "33"
    } else {
        "31"
    };

    writeln!(
        buf,
        "{} Layout check ({}x{})",
        color(&format!("Match {}", body.match_ratio), code, colorize),
        body.width,
        body.height
    )
    .ok();
    writeln!(
        buf,
        "Differing pixels: {} ({:.2}%)",
        body.diff_count,
        body.diff_ratio * 100.0
    )
    .ok();
    writeln!(buf, "MSSIM: {:.4}", body.mssim).ok();
    if let Some(analysis) = &body.analysis_from_ai {
        writeln!(
            buf,
            "AI analysis (match rate {:.2}): {}",
            analysis.match_rate, analysis.diff
        )
        .ok();
    }
    if let Some(version) = &body.version {
        writeln!(buf, "Stored as version {version}").ok();
    }
    buf
}

pub fn format_error(body: &ErrorOutput, colorize: bool) -> String {
    let mut buf = String::new();
    let header = color("[ERROR]", "31", colorize);
    writeln!(buf, "{header} ({:?}) {}", body.error.stage, body.error.message).ok();
    if let Some(remediation) = &body.error.remediation {
        writeln!(buf, "Hint: {remediation}").ok();
    }
    buf
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_checker::error::{CheckStage, ErrorPayload};
    use layout_checker::semantic::SemanticAnalysis;

    fn response() -> CheckLayoutResponse {
        CheckLayoutResponse {
            match_ratio: "0.97".into(),
            analysis_from_ai: Some(SemanticAnalysis {
                diff: "CTA button is wider".into(),
                match_rate: 0.9,
            }),
            diff_image: String::new(),
            mssim: 0.98765,
            diff_count: 14_400,
            diff_ratio: 0.03,
            width: 800,
            height: 600,
            version: Some("4".into()),
        }
    }

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("err.json");
        let code = render_error(
            LayoutCheckError::Config("boom".to_string()),
            OutputFormat::Json,
            Some(out.clone()),
        );
        assert_eq!(code, ExitCode::from(2));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(written["error"]["stage"], "config");
    }

    #[test]
    fn format_pretty_includes_ratio_ssim_and_analysis() {
        let pretty = format_pretty(&response(), false);
        assert!(pretty.contains("Match 0.97 Layout check (800x600)"));
        assert!(pretty.contains("Differing pixels: 14400 (3.00%)"));
        assert!(pretty.contains("MSSIM: 0.9877"));
        assert!(pretty.contains("CTA button is wider"));
        assert!(pretty.contains("version 4"));
    }

    #[test]
    fn format_error_includes_hint() {
        let body = ErrorOutput::new(ErrorPayload::new(
            CheckStage::Figma,
            "bad input".to_string(),
            "check flags",
        ));
        let pretty = format_error(&body, false);
        assert!(pretty.contains("[ERROR] (Figma) bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }

    #[test]
    fn write_output_json_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_output(&response(), OutputFormat::Json, Some(path.clone())).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["matchRatio"], "0.97");
        assert_eq!(json["analysisFromAI"]["matchRate"], 0.9);
    }
}
