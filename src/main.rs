mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use cli::Commands;
use commands::{run_check, run_diff, CheckArgs, DiffArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Check {
            figma_url,
            website_url,
            figma_token,
            project,
            threshold,
            no_ai,
            no_store,
            diff_out,
            format,
            output,
        } => {
            run_check(
                args.config,
                CheckArgs {
                    figma_url,
                    website_url,
                    figma_token,
                    project,
                    threshold,
                    no_ai,
                    no_store,
                    diff_out,
                    format,
                    output,
                },
            )
            .await
        }
        Commands::Diff {
            reference,
            capture,
            threshold,
            diff_out,
            format,
            output,
        } => {
            run_diff(
                args.config,
                DiffArgs {
                    reference,
                    capture,
                    threshold,
                    diff_out,
                    format,
                    output,
                },
            )
            .await
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "layout_checker=debug"
    } else {
        "layout_checker=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
