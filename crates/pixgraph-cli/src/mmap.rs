//! Memory-mapped raw files.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result, bail};
use memmap2::{Mmap, MmapMut};
use tracing::debug;

/// Read-only map of an existing file.
pub struct MappedInput {
    map: Mmap,
}

impl MappedInput {
    /// Maps `path`, which must hold exactly `expected` bytes.
    pub fn open(path: &Path, expected: usize) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let len = file.metadata()?.len();
        if len != expected as u64 {
            bail!("{}: bad file size: expected {expected} bytes, found {len}", path.display());
        }
        // SAFETY: the file is not modified by this process while mapped.
        let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map: {}", path.display()))?;
        debug!(path = %path.display(), len, "mapped input");
        Ok(Self { map })
    }

    /// Mapped file contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }
}

/// Writable map of a file created or resized to an exact size.
pub struct MappedOutput {
    map: MmapMut,
}

impl MappedOutput {
    /// Creates or resizes `path` to exactly `size` bytes and maps it.
    pub fn create(path: &Path, size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to create: {}", path.display()))?;
        file.set_len(size as u64)
            .with_context(|| format!("Failed to resize: {}", path.display()))?;
        // SAFETY: the map is private to this process for its lifetime.
        let map = unsafe { MmapMut::map_mut(&file) }.with_context(|| format!("Failed to map: {}", path.display()))?;
        debug!(path = %path.display(), size, "mapped output");
        Ok(Self { map })
    }

    /// Mapped bytes, written back on [`MappedOutput::flush`] or drop.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }

    /// Writes dirty pages back to the file.
    pub fn flush(&self) -> Result<()> {
        self.map.flush().context("Failed to flush output")
    }
}
