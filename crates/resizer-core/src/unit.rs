//! The conversion unit: host entry points over the bridge and the pipeline.
//!
//! A request runs entirely inside [`ResizerUnit::convert_image`]:
//!
//! ```text
//! allocate source → host fills it → decode → transform → encode → publish → host reads
//! ```
//!
//! Only one request may be in flight. Overlapping calls, including a host
//! calling back into the unit from one of its own callbacks, are rejected
//! with [`ConvertError::Busy`] instead of being queued. The same goes for
//! the buffer accessors while the host is filling the source region. The
//! result notification runs with the buffers unlocked, so a host may read
//! the result back from inside [`Host::set_result`].

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use crate::bridge::{BufferBridge, Host, PublishedResult, Region};
use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::lifecycle::{Lifecycle, ShutdownReason};
use crate::pipeline::{ConvertMode, Converter, FormatTag};

/// Summary of one successful request, suitable for reporting to a host.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub mode: ConvertMode,
    pub format: FormatTag,
    pub source_len: usize,
    pub result_offset: usize,
    pub result_len: usize,
    pub source_width: u32,
    pub source_height: u32,
    pub width: u32,
    pub height: u32,
}

/// A single conversion unit instance.
pub struct ResizerUnit {
    bridge: Mutex<BufferBridge>,
    converter: Converter,
    lifecycle: Lifecycle,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the request ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ResizerUnit {
    /// Create a running unit with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_lifecycle(config, Lifecycle::new())
    }

    /// Create a unit sharing an existing lifecycle.
    pub fn with_lifecycle(config: &Config, lifecycle: Lifecycle) -> Self {
        Self {
            bridge: Mutex::new(BufferBridge::new(config.limits.max_source_bytes)),
            converter: Converter::new(config),
            lifecycle,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Handle on the unit's lifecycle.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Convert `length` host bytes with the mode named by `mode_tag`.
    ///
    /// The host is asked to fill the source region, then told where the
    /// result lives. On failure nothing is published and the previous result
    /// stays readable.
    pub fn convert_image<H: Host + ?Sized>(
        &self,
        host: &mut H,
        length: usize,
        mode_tag: i64,
    ) -> ConvertResult<ConvertReport> {
        if !self.lifecycle.is_running() {
            return Err(ConvertError::ShutDown);
        }
        let mode = ConvertMode::try_from(mode_tag)?;
        let _guard = self.begin()?;

        let result = self.run(host, length, mode);
        if let Err(e) = &result {
            tracing::warn!("Conversion failed ({}): {}", e.kind(), e);
        }
        result
    }

    fn run<H: Host + ?Sized>(
        &self,
        host: &mut H,
        length: usize,
        mode: ConvertMode,
    ) -> ConvertResult<ConvertReport> {
        let (published, bytes, report) = {
            let mut bridge = self.lock_bridge();

            let source = bridge.allocate_source(length)?;
            host.set_file_bytes_to_mem(&source, bridge.source_mut(&source)?)?;

            let converted = self.converter.convert(bridge.source(&source)?, mode)?;

            let published = bridge.publish_result(converted.bytes, converted.format);
            let bytes = bridge.shared_result(&published.region)?;
            let report = ConvertReport {
                mode,
                format: published.format,
                source_len: length,
                result_offset: published.offset(),
                result_len: published.len(),
                source_width: converted.source_width,
                source_height: converted.source_height,
                width: converted.width,
                height: converted.height,
            };
            (published, bytes, report)
        };

        host.set_result(&published, &bytes);
        Ok(report)
    }

    /// Copy the bytes of a published result out of the unit.
    pub fn read_result(&self, region: &Region) -> ConvertResult<Vec<u8>> {
        Ok(self.try_lock_bridge()?.result(region)?.to_vec())
    }

    /// The currently published result, if any.
    pub fn last_result(&self) -> ConvertResult<Option<PublishedResult>> {
        Ok(self.try_lock_bridge()?.last_result())
    }

    /// Host-triggered shutdown. Returns `true` if this call performed it.
    pub fn shutdown(&self) -> bool {
        self.lifecycle.shutdown(ShutdownReason::HostRequest)
    }

    /// Release both buffers. Pending results are abandoned.
    pub fn close(&self) -> ConvertResult<()> {
        self.try_lock_bridge()?.release();
        tracing::info!("Closed");
        Ok(())
    }

    fn begin(&self) -> ConvertResult<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| ConvertError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    fn lock_bridge(&self) -> MutexGuard<'_, BufferBridge> {
        self.bridge.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bridge access for the public accessors; never waits on a request.
    fn try_lock_bridge(&self) -> ConvertResult<MutexGuard<'_, BufferBridge>> {
        match self.bridge.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(ConvertError::Busy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RegionKind;
    use crate::testing::{encode_fixture, gradient_rgb, gradient_rgba};
    use image::GenericImageView;
    use std::io;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    /// Host serving one in-memory source and recording every result.
    #[derive(Default)]
    struct MemoryHost {
        source: Vec<u8>,
        announced: Vec<Region>,
        results: Vec<(PublishedResult, Vec<u8>)>,
    }

    impl MemoryHost {
        fn with_source(source: Vec<u8>) -> Self {
            Self {
                source,
                ..Self::default()
            }
        }
    }

    impl Host for MemoryHost {
        fn set_file_bytes_to_mem(&mut self, region: &Region, dest: &mut [u8]) -> io::Result<()> {
            self.announced.push(*region);
            dest.copy_from_slice(&self.source);
            Ok(())
        }

        fn set_result(&mut self, result: &PublishedResult, bytes: &[u8]) {
            self.results.push((*result, bytes.to_vec()));
        }
    }

    fn unit() -> ResizerUnit {
        ResizerUnit::new(&Config::default())
    }

    fn convert(
        unit: &ResizerUnit,
        source: Vec<u8>,
        mode: ConvertMode,
    ) -> (ConvertResult<ConvertReport>, MemoryHost) {
        let mut host = MemoryHost::with_source(source);
        let len = host.source.len();
        let result = unit.convert_image(&mut host, len, mode.tag());
        (result, host)
    }

    #[test]
    fn test_png_resize_round_trip() {
        let unit = unit();
        let (result, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(1000, 500), FormatTag::Png),
            ConvertMode::Resize,
        );
        let report = result.unwrap();

        assert_eq!((report.width, report.height), (100, 50));
        assert_eq!(report.format, FormatTag::Png);

        let (published, bytes) = &host.results[0];
        assert_eq!(published.format_name(), "png");
        assert_eq!(published.len(), bytes.len());
        assert_eq!(report.result_len, bytes.len());

        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_host_sees_exact_length_source_region() {
        let unit = unit();
        let source = encode_fixture(&gradient_rgb(20, 20), FormatTag::Png);
        let len = source.len();
        let (result, host) = convert(&unit, source, ConvertMode::Grayscale);
        result.unwrap();

        assert_eq!(host.announced.len(), 1);
        assert_eq!(host.announced[0].kind, RegionKind::Source);
        assert_eq!(host.announced[0].len, len);
    }

    #[test]
    fn test_gif_grayscale_example() {
        let unit = unit();
        let (result, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(64, 64), FormatTag::Gif),
            ConvertMode::Grayscale,
        );
        result.unwrap();

        let (published, bytes) = &host.results[0];
        assert_eq!(published.format_name(), "gif");
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 64));
        assert!(decoded
            .to_rgba8()
            .pixels()
            .all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn test_result_is_readable_after_notification() {
        let unit = unit();
        let (result, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(30, 30), FormatTag::Jpeg),
            ConvertMode::Resize,
        );
        result.unwrap();

        let (published, bytes) = &host.results[0];
        assert_eq!(&unit.read_result(&published.region).unwrap(), bytes);
        assert_eq!(unit.last_result().unwrap(), Some(*published));
    }

    #[test]
    fn test_decode_failure_keeps_previous_result() {
        let unit = unit();
        let (first, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(40, 40), FormatTag::Png),
            ConvertMode::Resize,
        );
        first.unwrap();
        let (published, bytes) = host.results[0].clone();

        let (second, failed_host) = convert(&unit, vec![0x13; 64], ConvertMode::Resize);
        assert!(matches!(second, Err(ConvertError::Decode { .. })));
        assert!(failed_host.results.is_empty());

        assert_eq!(unit.last_result().unwrap(), Some(published));
        assert_eq!(unit.read_result(&published.region).unwrap(), bytes);
    }

    #[test]
    fn test_degenerate_resize_publishes_nothing() {
        let unit = unit();
        let (result, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(9, 120), FormatTag::Png),
            ConvertMode::Resize,
        );

        assert!(matches!(
            result,
            Err(ConvertError::EmptyResizeTarget {
                width: 0,
                height: 12
            })
        ));
        assert!(host.results.is_empty());
        assert!(unit.last_result().unwrap().is_none());
    }

    #[test]
    fn test_sequential_requests_do_not_leak() {
        let unit = unit();
        let first_source = encode_fixture(&gradient_rgba(50, 30), FormatTag::Png);
        let second_source = encode_fixture(&gradient_rgb(20, 20), FormatTag::Png);

        let (first, first_host) = convert(&unit, first_source.clone(), ConvertMode::Grayscale);
        first.unwrap();
        let (second, second_host) = convert(&unit, second_source.clone(), ConvertMode::Grayscale);
        second.unwrap();

        let converter = Converter::new(&Config::default());
        let expected_first = converter
            .convert(&first_source, ConvertMode::Grayscale)
            .unwrap();
        let expected_second = converter
            .convert(&second_source, ConvertMode::Grayscale)
            .unwrap();

        assert_eq!(first_host.results[0].1, expected_first.bytes);
        assert_eq!(second_host.results[0].1, expected_second.bytes);
        assert!(matches!(
            unit.read_result(&first_host.results[0].0.region),
            Err(ConvertError::StaleRegion)
        ));
    }

    #[test]
    fn test_invalid_mode_tag_is_rejected() {
        let unit = unit();
        let mut host = MemoryHost::with_source(vec![1, 2, 3]);
        let err = unit.convert_image(&mut host, 3, 5).unwrap_err();

        assert!(matches!(err, ConvertError::InvalidMode(5)));
        assert!(host.announced.is_empty());
    }

    #[test]
    fn test_oversized_source_is_allocation_error() {
        let mut config = Config::default();
        config.limits.max_source_bytes = 8;
        let unit = ResizerUnit::new(&config);

        let mut host = MemoryHost::with_source(vec![0; 9]);
        let err = unit.convert_image(&mut host, 9, 0).unwrap_err();
        assert!(matches!(err, ConvertError::Allocation { requested: 9, .. }));
    }

    #[test]
    fn test_host_failure_aborts_request() {
        struct FailingHost;

        impl Host for FailingHost {
            fn set_file_bytes_to_mem(&mut self, _: &Region, _: &mut [u8]) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "source vanished"))
            }

            fn set_result(&mut self, _: &PublishedResult, _: &[u8]) {
                panic!("no result expected");
            }
        }

        let unit = unit();
        let err = unit.convert_image(&mut FailingHost, 16, 0).unwrap_err();
        assert_eq!(err.kind(), "host");
    }

    #[test]
    fn test_reentrant_call_is_busy() {
        struct ReentrantHost<'a> {
            unit: &'a ResizerUnit,
            nested: Option<ConvertResult<ConvertReport>>,
        }

        impl Host for ReentrantHost<'_> {
            fn set_file_bytes_to_mem(&mut self, _: &Region, _: &mut [u8]) -> io::Result<()> {
                let mut inner = MemoryHost::with_source(vec![0; 4]);
                self.nested = Some(self.unit.convert_image(&mut inner, 4, 0));
                Ok(())
            }

            fn set_result(&mut self, _: &PublishedResult, _: &[u8]) {}
        }

        let unit = unit();
        let mut host = ReentrantHost {
            unit: &unit,
            nested: None,
        };
        // Outer request fails on the zeroed source; what matters is the nested call
        let _ = unit.convert_image(&mut host, 4, 0);
        assert!(matches!(host.nested, Some(Err(ConvertError::Busy))));

        // The guard is released once the outer request returns
        let (result, _) = convert(
            &unit,
            encode_fixture(&gradient_rgb(20, 20), FormatTag::Png),
            ConvertMode::Resize,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_host_reads_result_back_from_notification() {
        struct ReadBackHost {
            unit: Arc<ResizerUnit>,
            source: Vec<u8>,
            notified: Vec<u8>,
            read_back: Option<ConvertResult<Vec<u8>>>,
            last: Option<ConvertResult<Option<PublishedResult>>>,
        }

        impl Host for ReadBackHost {
            fn set_file_bytes_to_mem(&mut self, _: &Region, dest: &mut [u8]) -> io::Result<()> {
                dest.copy_from_slice(&self.source);
                Ok(())
            }

            fn set_result(&mut self, result: &PublishedResult, bytes: &[u8]) {
                self.notified = bytes.to_vec();
                self.read_back = Some(self.unit.read_result(&result.region));
                self.last = Some(self.unit.last_result());
            }
        }

        let unit = Arc::new(unit());
        let mut host = ReadBackHost {
            unit: Arc::clone(&unit),
            source: encode_fixture(&gradient_rgb(40, 20), FormatTag::Png),
            notified: Vec::new(),
            read_back: None,
            last: None,
        };

        // Run on a worker so a lock-up fails the test instead of hanging it
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&unit);
        thread::spawn(move || {
            let len = host.source.len();
            let result = worker.convert_image(&mut host, len, ConvertMode::Resize.tag());
            let _ = tx.send((result, host));
        });
        let (result, host) = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("convert_image returned");

        let report = result.unwrap();
        assert_eq!(host.read_back.unwrap().unwrap(), host.notified);
        let last = host.last.unwrap().unwrap().unwrap();
        assert_eq!(last.len(), report.result_len);

        // The unit stays usable afterwards
        assert!(unit.close().is_ok());
    }

    #[test]
    fn test_accessors_are_busy_while_source_is_filled() {
        struct PeekingHost<'a> {
            unit: &'a ResizerUnit,
            source: Vec<u8>,
            earlier: Region,
            seen: Vec<ConvertResult<()>>,
        }

        impl Host for PeekingHost<'_> {
            fn set_file_bytes_to_mem(&mut self, _: &Region, dest: &mut [u8]) -> io::Result<()> {
                self.seen.push(self.unit.read_result(&self.earlier).map(|_| ()));
                self.seen.push(self.unit.last_result().map(|_| ()));
                self.seen.push(self.unit.close());
                dest.copy_from_slice(&self.source);
                Ok(())
            }

            fn set_result(&mut self, _: &PublishedResult, _: &[u8]) {}
        }

        let unit = unit();
        let (first, first_host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(20, 20), FormatTag::Png),
            ConvertMode::Resize,
        );
        first.unwrap();

        let mut host = PeekingHost {
            unit: &unit,
            source: encode_fixture(&gradient_rgb(30, 30), FormatTag::Png),
            earlier: first_host.results[0].0.region,
            seen: Vec::new(),
        };
        let len = host.source.len();
        let report = unit
            .convert_image(&mut host, len, ConvertMode::Resize.tag())
            .unwrap();

        assert_eq!(host.seen.len(), 3);
        assert!(host
            .seen
            .iter()
            .all(|seen| matches!(seen, Err(ConvertError::Busy))));
        assert_eq!((report.width, report.height), (3, 3));
        assert!(unit.last_result().unwrap().is_some());
    }

    #[test]
    fn test_shutdown_rejects_further_calls() {
        let unit = unit();
        assert!(unit.shutdown());
        assert!(!unit.shutdown());

        let (result, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(20, 20), FormatTag::Png),
            ConvertMode::Resize,
        );
        assert!(matches!(result, Err(ConvertError::ShutDown)));
        assert!(host.announced.is_empty());
    }

    #[test]
    fn test_close_abandons_result() {
        let unit = unit();
        let (result, host) = convert(
            &unit,
            encode_fixture(&gradient_rgb(20, 20), FormatTag::Png),
            ConvertMode::Resize,
        );
        result.unwrap();

        unit.close().unwrap();
        assert!(unit.last_result().unwrap().is_none());
        assert!(unit.read_result(&host.results[0].0.region).is_err());
    }
}
