//! The `resizer session` command: a long-running host fed from stdin.
//!
//! Each input line is one request; each request is answered with one JSON
//! line on stdout. The session ends on `shutdown`, end of input, or an
//! interrupt, whichever comes first.

use clap::Args;
use resizer_core::{
    Config, ConvertMode, Lifecycle, OutputFormat, OutputWriter, RequestOutcome, ResizerUnit,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;

use super::host::process_file;

const REQUEST_BUFFER: usize = 16;

const USAGE: &str = "expected `convert <path> <resize|grayscale> [output]` or `shutdown`";

/// Arguments for the `session` command.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Directory for results without an explicit output path
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// One parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Convert {
        input: PathBuf,
        mode: ConvertMode,
        output: Option<PathBuf>,
    },
    Shutdown,
}

impl SessionCommand {
    /// Parse a request line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        if verb.starts_with('#') {
            return Ok(None);
        }

        match verb.to_lowercase().as_str() {
            "shutdown" | "quit" | "exit" => {
                if words.next().is_some() {
                    return Err(format!("`{verb}` takes no arguments"));
                }
                Ok(Some(Self::Shutdown))
            }
            "convert" => {
                let input = words.next().ok_or_else(|| USAGE.to_string())?;
                let mode = words
                    .next()
                    .ok_or_else(|| USAGE.to_string())?
                    .parse::<ConvertMode>()
                    .map_err(|e| e.to_string())?;
                let output = words.next().map(expand_path);
                if words.next().is_some() {
                    return Err(USAGE.to_string());
                }
                Ok(Some(Self::Convert {
                    input: expand_path(input),
                    mode,
                    output,
                }))
            }
            _ => Err(format!("unknown command `{verb}`; {USAGE}")),
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Execute the session command.
pub async fn execute(args: SessionArgs, config: &Config) -> anyhow::Result<()> {
    let lifecycle = Lifecycle::new();
    let unit = Arc::new(ResizerUnit::with_lifecycle(config, lifecycle.clone()));
    let output_dir = args.output_dir.or_else(|| config.output_dir());

    let watcher = lifecycle.clone();
    let signals = tokio::spawn(async move { watcher.watch_signals().await });

    let requests = spawn_stdin_reader()?;
    let mut writer = OutputWriter::new(io::stdout(), OutputFormat::JsonLines, false);

    tracing::info!("Session ready, reading requests from stdin");
    serve(&unit, requests, &mut writer, output_dir).await?;

    let reason = signals.await?;
    unit.close()?;
    tracing::info!(
        "Session ended ({:?}) after {} responses",
        reason,
        writer.items_written()
    );

    Ok(())
}

/// Forward stdin lines from a plain thread.
///
/// The blocking read never sits on the runtime, so shutdown does not wait
/// for the next line.
fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
    thread::Builder::new()
        .name("resizer-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Answer request lines until `shutdown`, end of input, or cancellation.
///
/// Each request gets exactly one JSON line on `writer`.
pub async fn serve<W: Write>(
    unit: &Arc<ResizerUnit>,
    mut requests: mpsc::Receiver<io::Result<String>>,
    writer: &mut OutputWriter<W>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    loop {
        let line = tokio::select! {
            _ = unit.lifecycle().cancelled() => break,
            line = requests.recv() => line,
        };

        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                unit.shutdown();
                return Err(e.into());
            }
            None => {
                tracing::debug!("End of input");
                unit.shutdown();
                break;
            }
        };

        match SessionCommand::parse(&line) {
            Ok(None) => {}
            Ok(Some(SessionCommand::Shutdown)) => {
                unit.shutdown();
                break;
            }
            Ok(Some(SessionCommand::Convert {
                input,
                mode,
                output,
            })) => {
                let unit = Arc::clone(unit);
                let output_dir = output_dir.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_file(
                        &unit,
                        &input,
                        mode,
                        output.as_deref(),
                        output_dir.as_deref(),
                    )
                })
                .await?;
                writer.write(&outcome)?;
            }
            Err(message) => {
                writer.write(&RequestOutcome::failed(None, "usage", message))?;
            }
        }
    }

    Ok(())
}
