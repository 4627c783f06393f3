use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "layout-checker")]
#[command(
    version,
    about = "Layout Checker - compare a Figma frame against the live page that implements it",
    long_about = "Layout Checker\n\nCommands:\n- check: resolve a Figma frame, capture the website at the frame size, and report pixel diff, SSIM and an optional AI judgement.\n- diff: pixel diff + SSIM for two local images (no network).\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable debug logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file (TOML); defaults to ~/.config/layout-checker/config.toml when present. CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare a Figma frame against a live website
    Check {
        #[arg(long, help = "Figma share URL including ?node-id=")]
        figma_url: String,

        #[arg(long, help = "URL of the page implementing the frame")]
        website_url: String,

        #[arg(
            long,
            env = "FIGMA_TOKEN",
            hide_env_values = true,
            help = "Figma personal access token"
        )]
        figma_token: Option<String>,

        #[arg(
            long,
            default_value = "default",
            help = "Project the check belongs to (part of the stored identity)"
        )]
        project: String,

        #[arg(long, help = "Per-pixel colour threshold 0.0-1.0 (default from config, 0.1)")]
        threshold: Option<f64>,

        #[arg(long, help = "Skip the AI semantic analysis")]
        no_ai: bool,

        #[arg(long, help = "Do not persist the result or the diff artifact")]
        no_store: bool,

        #[arg(long, value_name = "PATH", help = "Also write the diff PNG to this path")]
        diff_out: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Pixel diff + SSIM for two local images of equal size
    Diff {
        #[arg(long, value_name = "PATH", help = "Reference (design) image")]
        reference: PathBuf,

        #[arg(long, value_name = "PATH", help = "Captured (implementation) image")]
        capture: PathBuf,

        #[arg(long, help = "Per-pixel colour threshold 0.0-1.0 (default from config, 0.1)")]
        threshold: Option<f64>,

        #[arg(long, value_name = "PATH", help = "Write the diff PNG to this path")]
        diff_out: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
