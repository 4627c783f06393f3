use std::path::PathBuf;
use std::process::ExitCode;

use layout_checker::{
    CheckLayoutRequest, CheckLayoutResponse, LayoutCheckError, LayoutCheckerService,
};
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{format_effective_config, load_config, resolve_threshold};

pub struct CheckArgs {
    pub figma_url: String,
    pub website_url: String,
    pub figma_token: Option<String>,
    pub project: String,
    pub threshold: Option<f64>,
    pub no_ai: bool,
    pub no_store: bool,
    pub diff_out: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the check command.
pub async fn run_check(config_path: Option<PathBuf>, args: CheckArgs) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();
    match execute(config_path, args).await {
        Ok(response) => match write_output(&response, format, output.clone()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => render_error(
                LayoutCheckError::Config(format!("Failed to write output: {e}")),
                format,
                output,
            ),
        },
        Err(err) => render_error(err, format, output),
    }
}

async fn execute(
    config_path: Option<PathBuf>,
    args: CheckArgs,
) -> Result<CheckLayoutResponse, LayoutCheckError> {
    let mut config = load_config(config_path.as_deref())?;
    config.threshold = resolve_threshold(args.threshold, &config)?;
    if args.no_ai {
        config.semantic.enabled = false;
    }
    debug!(
        "{}",
        format_effective_config(&config, config.threshold, config_path.as_deref())
    );

    let figma_token = args
        .figma_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            LayoutCheckError::Config(
                "Figma token is required (--figma-token or FIGMA_TOKEN)".to_string(),
            )
        })?;

    let mut service = LayoutCheckerService::from_config(&config)?;
    if args.no_store {
        service = service.with_store(None);
    }

    let outcome = service
        .check_layout(CheckLayoutRequest {
            figma_url: args.figma_url,
            figma_token,
            website_url: args.website_url,
            project: args.project,
            threshold: None,
        })
        .await?;

    if let Some(path) = &args.diff_out {
        std::fs::write(path, &outcome.comparison.diff_png)?;
        info!(path = %path.display(), "wrote diff image");
    }

    Ok(CheckLayoutResponse::from(&outcome))
}
