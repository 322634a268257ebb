//! The `resizer convert` command for one-shot conversions.

use clap::{Args, ValueEnum};
use resizer_core::{Config, ConvertMode, OutputFormat, OutputWriter, ResizerUnit};
use std::path::PathBuf;

use super::host::process_file;

/// Transform to apply.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Downscale each dimension by the configured divisor (default 10)
    Resize,
    /// Replace every pixel by its luminance
    Grayscale,
}

impl From<ModeArg> for ConvertMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Resize => ConvertMode::Resize,
            ModeArg::Grayscale => ConvertMode::Grayscale,
        }
    }
}

/// Report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Pretty-printed JSON object
    Json,
    /// Single-line JSON object
    Jsonl,
}

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image file to convert (png, jpeg or gif)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Transform to apply
    #[arg(short, long, value_enum, default_value = "resize")]
    pub mode: ModeArg,

    /// Output file (defaults to <stem>-<mode>.<ext> next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormat,
}

/// Execute the convert command.
pub async fn execute(args: ConvertArgs, config: &Config) -> anyhow::Result<()> {
    let unit = ResizerUnit::new(config);
    let output_dir = config.output_dir();

    let outcome = process_file(
        &unit,
        &args.input,
        args.mode.into(),
        args.output.as_deref(),
        output_dir.as_deref(),
    );

    let mut writer = match args.format {
        ReportFormat::Json => OutputWriter::new(std::io::stdout(), OutputFormat::Json, true),
        ReportFormat::Jsonl => OutputWriter::new(std::io::stdout(), OutputFormat::JsonLines, false),
    };
    writer.write(&outcome)?;

    unit.shutdown();
    unit.close()?;

    if let Some(error) = outcome.error {
        anyhow::bail!("{} ({})", error.message, error.kind);
    }
    Ok(())
}
