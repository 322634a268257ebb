//! Buffer bridge between the unit and its host.
//!
//! The host and the unit agree on where bytes live by exchanging [`Region`]
//! handles instead of serializing payloads. A region names one live buffer
//! by kind and generation; the host copies bytes in or out through a
//! borrowed slice while the unit holds the announced checkpoint open.
//!
//! At most one source buffer and one result buffer are live at a time.
//! Allocating a new buffer of a kind invalidates every region previously
//! handed out for that kind.

use serde::Serialize;
use std::io;
use std::sync::Arc;

use crate::error::ConvertError;
use crate::pipeline::FormatTag;

/// Which of the two bridge buffers a [`Region`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Source,
    Result,
}

/// Capability naming a live bridge buffer.
///
/// `offset` is the buffer's address inside the unit and is only
/// informational; access always goes through the bridge, which checks the
/// generation first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub kind: RegionKind,
    pub generation: u64,
    pub offset: usize,
    pub len: usize,
}

/// A result announced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishedResult {
    pub region: Region,
    pub format: FormatTag,
}

impl PublishedResult {
    /// Lowercase container name ("png", "jpeg" or "gif").
    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    pub fn offset(&self) -> usize {
        self.region.offset
    }

    pub fn len(&self) -> usize {
        self.region.len
    }

    pub fn is_empty(&self) -> bool {
        self.region.len == 0
    }
}

/// The host side of the boundary.
///
/// The unit calls these synchronously from inside a conversion request.
pub trait Host {
    /// The source region for the current request is ready.
    ///
    /// The host must fill all of `dest` before returning; the unit decodes
    /// it right after this call.
    fn set_file_bytes_to_mem(&mut self, region: &Region, dest: &mut [u8]) -> io::Result<()>;

    /// A result has been published.
    ///
    /// Called after the unit has released its buffers, so the host may read
    /// the result back through the unit from here. `bytes` stays readable
    /// that way until the next successful conversion or shutdown.
    fn set_result(&mut self, result: &PublishedResult, bytes: &[u8]);
}

struct SourceBuffer {
    bytes: Vec<u8>,
    generation: u64,
}

struct ResultBuffer {
    bytes: Arc<Vec<u8>>,
    format: FormatTag,
    generation: u64,
}

/// Owner of the source and result buffers.
pub struct BufferBridge {
    source: Option<SourceBuffer>,
    result: Option<ResultBuffer>,
    next_generation: u64,
    max_source_bytes: usize,
}

impl BufferBridge {
    /// Create an empty bridge refusing sources larger than `max_source_bytes`.
    pub fn new(max_source_bytes: usize) -> Self {
        Self {
            source: None,
            result: None,
            next_generation: 1,
            max_source_bytes,
        }
    }

    /// Allocate a zeroed source buffer of exactly `length` bytes.
    ///
    /// The previous source buffer is dropped first, so its regions go stale
    /// even when this allocation fails.
    pub fn allocate_source(&mut self, length: usize) -> Result<Region, ConvertError> {
        self.source = None;

        if length > self.max_source_bytes {
            return Err(ConvertError::Allocation {
                requested: length,
                message: format!("exceeds limit of {} bytes", self.max_source_bytes),
            });
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(length)
            .map_err(|e| ConvertError::Allocation {
                requested: length,
                message: e.to_string(),
            })?;
        bytes.resize(length, 0);

        let generation = self.bump_generation();
        let region = Region {
            kind: RegionKind::Source,
            generation,
            offset: bytes.as_ptr() as usize,
            len: length,
        };
        self.source = Some(SourceBuffer { bytes, generation });

        tracing::debug!("Source region at {:#x} ({} bytes)", region.offset, length);
        Ok(region)
    }

    /// Writable view of the live source buffer.
    pub fn source_mut(&mut self, region: &Region) -> Result<&mut [u8], ConvertError> {
        match &mut self.source {
            Some(source)
                if region.kind == RegionKind::Source && region.generation == source.generation =>
            {
                Ok(source.bytes.as_mut_slice())
            }
            _ => Err(ConvertError::StaleRegion),
        }
    }

    /// Read-only view of the live source buffer.
    pub fn source(&self, region: &Region) -> Result<&[u8], ConvertError> {
        match &self.source {
            Some(source)
                if region.kind == RegionKind::Source && region.generation == source.generation =>
            {
                Ok(source.bytes.as_slice())
            }
            _ => Err(ConvertError::StaleRegion),
        }
    }

    /// Take ownership of encoded bytes as the new result buffer.
    pub fn publish_result(&mut self, bytes: Vec<u8>, format: FormatTag) -> PublishedResult {
        let generation = self.bump_generation();
        let region = Region {
            kind: RegionKind::Result,
            generation,
            offset: bytes.as_ptr() as usize,
            len: bytes.len(),
        };
        self.result = Some(ResultBuffer {
            bytes: Arc::new(bytes),
            format,
            generation,
        });

        tracing::debug!(
            "Result region at {:#x} ({} bytes, {})",
            region.offset,
            region.len,
            format
        );
        PublishedResult { region, format }
    }

    /// Read-only view of the live result buffer.
    pub fn result(&self, region: &Region) -> Result<&[u8], ConvertError> {
        match &self.result {
            Some(result)
                if region.kind == RegionKind::Result && region.generation == result.generation =>
            {
                Ok(result.bytes.as_slice())
            }
            _ => Err(ConvertError::StaleRegion),
        }
    }

    /// Shared handle on the live result buffer.
    ///
    /// The handle outlives the borrow of the bridge, so the result can be
    /// handed to the host after the bridge is unlocked.
    pub fn shared_result(&self, region: &Region) -> Result<Arc<Vec<u8>>, ConvertError> {
        match &self.result {
            Some(result)
                if region.kind == RegionKind::Result && region.generation == result.generation =>
            {
                Ok(Arc::clone(&result.bytes))
            }
            _ => Err(ConvertError::StaleRegion),
        }
    }

    /// The currently published result, if any.
    pub fn last_result(&self) -> Option<PublishedResult> {
        self.result.as_ref().map(|result| PublishedResult {
            region: Region {
                kind: RegionKind::Result,
                generation: result.generation,
                offset: result.bytes.as_ptr() as usize,
                len: result.bytes.len(),
            },
            format: result.format,
        })
    }

    /// Drop both buffers. Every outstanding region becomes stale.
    pub fn release(&mut self) {
        self.source = None;
        self.result = None;
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}
