//! File-backed host for the conversion unit.
//!
//! The host reads a source file into memory, copies it into the region the
//! unit announces, and keeps a copy of the published result so it can be
//! written to disk once the unit returns.

use resizer_core::{
    ConvertMode, FormatTag, Host, PublishedResult, Region, RequestOutcome, ResizerUnit,
};
use std::io;
use std::path::{Path, PathBuf};

/// Host serving one source file per request.
pub struct FileHost {
    bytes: Vec<u8>,
    result: Option<(PublishedResult, Vec<u8>)>,
}

impl FileHost {
    /// Read the whole source file.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            bytes: std::fs::read(path)?,
            result: None,
        })
    }

    /// Length the host will ask the unit to allocate.
    pub fn source_len(&self) -> usize {
        self.bytes.len()
    }

    /// The result copied out during the last `set_result` notification.
    pub fn take_result(&mut self) -> Option<(PublishedResult, Vec<u8>)> {
        self.result.take()
    }
}

impl Host for FileHost {
    fn set_file_bytes_to_mem(&mut self, region: &Region, dest: &mut [u8]) -> io::Result<()> {
        if dest.len() != self.bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "source region holds {} bytes, file has {}",
                    dest.len(),
                    self.bytes.len()
                ),
            ));
        }
        tracing::debug!("Writing {} bytes at {:#x}", dest.len(), region.offset);
        dest.copy_from_slice(&self.bytes);
        Ok(())
    }

    fn set_result(&mut self, result: &PublishedResult, bytes: &[u8]) {
        tracing::debug!(
            "Result ready at {:#x} ({} bytes, {})",
            result.offset(),
            result.len(),
            result.format_name()
        );
        self.result = Some((*result, bytes.to_vec()));
    }
}

/// Default result path: `<dir>/<stem>-<mode>.<ext>`.
///
/// `dir` falls back to the directory holding the input.
pub fn default_output_path(
    input: &Path,
    mode: ConvertMode,
    format: FormatTag,
    dir: Option<&Path>,
) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let file_name = format!("{}-{}.{}", stem, mode, format.extension());

    match dir.or_else(|| input.parent()) {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Run one file through the unit and save the result.
///
/// Every failure is folded into the returned outcome so callers can report
/// it to their peer and keep going.
pub fn process_file(
    unit: &ResizerUnit,
    input: &Path,
    mode: ConvertMode,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> RequestOutcome {
    let mut host = match FileHost::open(input) {
        Ok(host) => host,
        Err(e) => return RequestOutcome::failed(Some(input), "io", e.to_string()),
    };

    let len = host.source_len();
    let report = match unit.convert_image(&mut host, len, mode.tag()) {
        Ok(report) => report,
        Err(e) => return RequestOutcome::rejected(Some(input), &e),
    };

    let Some((published, bytes)) = host.take_result() else {
        return RequestOutcome::failed(Some(input), "host", "unit did not announce a result");
    };

    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input, mode, published.format, output_dir));

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return RequestOutcome::failed(Some(input), "io", e.to_string());
        }
    }
    if let Err(e) = std::fs::write(&target, &bytes) {
        return RequestOutcome::failed(Some(input), "io", e.to_string());
    }

    tracing::info!(
        "{} → {} ({}x{} {})",
        input.display(),
        target.display(),
        report.width,
        report.height,
        report.format
    );
    RequestOutcome::converted(input, &target, report)
}
