//! Archive packaging.
//!
//! An archive accepts each path once and is finalized exactly once, with the
//! manifest written as the last entry.

use std::collections::BTreeSet;
use std::io::{Seek, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{ExportError, Result};
use crate::manifest::{MANIFEST_PATH, Manifest};

/// Destination of generated files.
pub trait ArchiveSink {
    /// Store `bytes` under `path`.
    ///
    /// Fails with [`ExportError::DuplicatePath`] when the path was already
    /// written and with [`ExportError::ArchiveClosed`] after finalization.
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Write the manifest and close the archive.
    fn finalize(&mut self, manifest: &Manifest) -> Result<()>;
}

/// Bookkeeping shared by the sink implementations.
#[derive(Debug, Default)]
struct PathRegistry {
    written: BTreeSet<String>,
    closed: bool,
}

impl PathRegistry {
    fn claim(&mut self, path: &str) -> Result<()> {
        if self.closed {
            return Err(ExportError::ArchiveClosed {
                path: path.to_string(),
            });
        }
        if !self.written.insert(path.to_string()) {
            return Err(ExportError::DuplicatePath {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.claim(MANIFEST_PATH)?;
        self.closed = true;
        Ok(())
    }
}

/// Archive kept in memory, in write order.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    registry: PathRegistry,
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn is_finalized(&self) -> bool {
        self.registry.closed
    }
}

impl ArchiveSink for MemoryArchive {
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        self.registry.claim(path)?;
        self.entries.push((path.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn finalize(&mut self, manifest: &Manifest) -> Result<()> {
        let xml = manifest.to_xml()?;
        self.registry.close()?;
        self.entries.push((MANIFEST_PATH.to_string(), xml));
        Ok(())
    }
}

/// Deflate-compressed zip archive.
///
/// Entries carry a fixed timestamp so identical input gives identical bytes.
pub struct ZipArchive<W: Write + Seek> {
    registry: PathRegistry,
    writer: Option<ZipWriter<W>>,
    finished: Option<W>,
}

impl<W: Write + Seek> ZipArchive<W> {
    pub fn new(inner: W) -> Self {
        Self {
            registry: PathRegistry::default(),
            writer: Some(ZipWriter::new(inner)),
            finished: None,
        }
    }

    /// The underlying writer, once the archive is finalized.
    pub fn into_inner(self) -> Option<W> {
        self.finished
    }

    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| ExportError::ArchiveClosed {
            path: path.to_string(),
        })?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        writer.start_file(path, options)?;
        writer.write_all(bytes)?;
        debug!(path, size = bytes.len(), "archived");
        Ok(())
    }
}

impl<W: Write + Seek> ArchiveSink for ZipArchive<W> {
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        self.registry.claim(path)?;
        self.write_entry(path, bytes)
    }

    fn finalize(&mut self, manifest: &Manifest) -> Result<()> {
        let xml = manifest.to_xml()?;
        self.registry.close()?;
        self.write_entry(MANIFEST_PATH, &xml)?;
        if let Some(writer) = self.writer.take() {
            self.finished = Some(writer.finish()?);
        }
        Ok(())
    }
}
