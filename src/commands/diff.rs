use std::path::PathBuf;
use std::process::ExitCode;

use layout_checker::image_loader::load_image;
use layout_checker::metrics::compare_images;
use layout_checker::{CheckLayoutResponse, LayoutCheckError};
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{load_config, resolve_threshold};

pub struct DiffArgs {
    pub reference: PathBuf,
    pub capture: PathBuf,
    pub threshold: Option<f64>,
    pub diff_out: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the offline diff command.
pub async fn run_diff(config_path: Option<PathBuf>, args: DiffArgs) -> ExitCode {
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
    args: DiffArgs,
) -> Result<CheckLayoutResponse, LayoutCheckError> {
    let config = load_config(config_path.as_deref())?;
    let threshold = resolve_threshold(args.threshold, &config)?;

    let reference = load_image(&args.reference)?;
    let capture = load_image(&args.capture)?;
    debug!(
        reference = %args.reference.display(),
        capture = %args.capture.display(),
        threshold,
        "comparing local images"
    );

    let comparison =
        tokio::task::spawn_blocking(move || compare_images(&reference, &capture, threshold))
            .await
            .map_err(|e| LayoutCheckError::Task(format!("diff worker failed: {e}")))??;

    if let Some(path) = &args.diff_out {
        std::fs::write(path, &comparison.diff_png)?;
        info!(path = %path.display(), "wrote diff image");
    }

    Ok(CheckLayoutResponse::from_comparison(&comparison))
}
