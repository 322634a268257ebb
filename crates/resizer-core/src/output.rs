//! JSON and JSONL reporting of conversion outcomes.
//!
//! Hosts answer each request with one [`RequestOutcome`]. A one-shot host
//! usually prints it as pretty JSON; a long-running session writes one JSON
//! object per line so the peer can read answers as they arrive.

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::error::ConvertError;
use crate::unit::ConvertReport;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object per write
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Error half of a [`RequestOutcome`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Stable code from [`ConvertError::kind`] or a host-side code
    pub kind: String,
    pub message: String,
}

/// Answer to one host request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Where the host saved the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(flatten)]
    pub report: Option<ConvertReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl RequestOutcome {
    /// A converted request and where its result was written.
    pub fn converted(input: &Path, output: &Path, report: ConvertReport) -> Self {
        Self {
            ok: true,
            input: Some(input.display().to_string()),
            output: Some(output.display().to_string()),
            report: Some(report),
            error: None,
        }
    }

    /// A request the unit rejected.
    pub fn rejected(input: Option<&Path>, error: &ConvertError) -> Self {
        Self::failed(input, error.kind(), error.to_string())
    }

    /// A request that failed on the host side or was malformed.
    pub fn failed(input: Option<&Path>, kind: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            input: input.map(|p| p.display().to_string()),
            output: None,
            report: None,
            error: Some(ErrorRecord {
                kind: kind.to_string(),
                message: message.into(),
            }),
        }
    }
}

/// A writer that serializes outcomes to JSON or JSONL.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item and flush, so interactive peers see it at once.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        self.items_written += 1;
        Ok(())
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ConvertMode, FormatTag};
    use std::path::PathBuf;

    fn report() -> ConvertReport {
        ConvertReport {
            mode: ConvertMode::Resize,
            format: FormatTag::Png,
            source_len: 2048,
            result_offset: 4096,
            result_len: 512,
            source_width: 1000,
            source_height: 500,
            width: 100,
            height: 50,
        }
    }

    #[test]
    fn test_converted_outcome_flattens_report() {
        let outcome = RequestOutcome::converted(
            &PathBuf::from("in.png"),
            &PathBuf::from("out.png"),
            report(),
        );
        let json = serde_json::to_string(&outcome).unwrap();

        assert!(json.contains("\"ok\":true"));
        assert!(json.contains("\"format\":\"png\""));
        assert!(json.contains("\"mode\":\"resize\""));
        assert!(json.contains("\"width\":100"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_rejected_outcome_carries_kind() {
        let err = ConvertError::Decode {
            message: "not an image".to_string(),
        };
        let outcome = RequestOutcome::rejected(Some(&PathBuf::from("noise.bin")), &err);
        let json = serde_json::to_string(&outcome).unwrap();

        assert!(json.contains("\"ok\":false"));
        assert!(json.contains("\"kind\":\"decode\""));
        assert!(!json.contains("\"width\""));
    }

    #[test]
    fn test_jsonl_one_line_per_item() {
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines, true);
        writer
            .write(&RequestOutcome::failed(None, "usage", "empty command"))
            .unwrap();
        writer
            .write(&RequestOutcome::rejected(None, &ConvertError::Busy))
            .unwrap();

        assert_eq!(writer.items_written(), 2);
        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"kind\":\"busy\""));
    }

    #[test]
    fn test_pretty_json_spans_lines() {
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::Json, true);
        writer.write(&report()).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("jsonl"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("xml"), None);
    }
}
