use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod report;
mod run;

#[derive(Parser, Debug)]
#[command(
    name = "droidloc",
    version,
    about = "Generate Android strings.xml files from a translation spreadsheet",
    after_help = "Private Google Sheets need an OAuth access token in DROIDLOC_ACCESS_TOKEN \
(or the variable named by sheet.token_env in droidloc.toml), for example:\n\n  \
export DROIDLOC_ACCESS_TOKEN=\"$(gcloud auth print-access-token)\"\n\n\
With a service account: gcloud auth activate-service-account --key-file=key.json first."
)]
pub struct Cli {
    /// CSV/TSV file, `-` for stdin, or a Google Sheets spreadsheet id
    pub source: String,

    /// Read settings from this file instead of the default search path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Android res/ directory receiving values*/ folders
    #[arg(long)]
    pub res_dir: Option<PathBuf>,

    #[arg(long)]
    pub file_name: Option<String>,

    /// Language written to plain values/
    #[arg(long)]
    pub default_lang: Option<String>,

    /// Language column to generate (repeatable or comma separated)
    #[arg(long = "lang", value_name = "CODE", value_delimiter = ',')]
    pub langs: Vec<String>,

    /// Process languages one by one and stop at the first failure
    #[arg(long, default_value_t = false)]
    pub sequential: bool,

    /// Render everything but write nothing
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Commit the generated files with git
    #[arg(long, default_value_t = false)]
    pub commit: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write debug logs to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn init_tracing(quiet: bool, ansi: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = if quiet { "warn" } else { "info" };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = rolling::daily(dir, "droidloc.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(file_writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let no_color = cli.no_color || std::env::var_os("NO_COLOR").is_some();
    let use_color = !no_color && std::io::stdout().is_terminal();
    let ansi_logs = !no_color && std::io::stderr().is_terminal();

    let _guard = init_tracing(cli.quiet, ansi_logs, cli.log_dir.as_deref());

    run::run(cli, use_color)
}
