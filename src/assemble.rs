//! Chunk Assembler: concatenates a track's samples, in table order, into a
//! single contiguous buffer.
//!
//! Grounded on the original tool's `_extract_chunks`/`_append_metadata`
//! (`examples/original_source/src/pyosmogps/mp4_manager.py`). That source
//! has two variants of `_append_metadata`: one silently drops every chunk
//! after the first (never writes the concatenation back to `self.metadata`),
//! the other appends in reverse chunk order. Both are bugs; see the design
//! notes. This assembler always appends forward, in ascending table order.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::track::SampleTable;

/// Read every sample referenced by `table` from `file` and concatenate them
/// in table order.
pub fn assemble_from_file(file: &mut File, table: &SampleTable) -> Result<Vec<u8>> {
    let total: u64 = table.sizes.iter().map(|&s| s as u64).sum();
    let mut buf = Vec::with_capacity(total as usize);
    for (offset, size) in table.offsets.iter().zip(table.sizes.iter()) {
        file.seek(SeekFrom::Start(*offset))
            .map_err(|e| Error::CorruptSampleTable(format!("seek to {offset}: {e}")))?;
        let mut chunk = vec![0u8; *size as usize];
        file.read_exact(&mut chunk)
            .map_err(|e| Error::CorruptSampleTable(format!("read {size} bytes at {offset}: {e}")))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Same as [`assemble_from_file`], but reads from an in-memory buffer
/// (e.g. a memory-mapped file) instead of seeking a `File`.
pub fn assemble_from_bytes(data: &[u8], table: &SampleTable) -> Result<Vec<u8>> {
    let total: u64 = table.sizes.iter().map(|&s| s as u64).sum();
    let mut buf = Vec::with_capacity(total as usize);
    for (offset, size) in table.offsets.iter().zip(table.sizes.iter()) {
        let start = *offset as usize;
        let end = start
            .checked_add(*size as usize)
            .ok_or(Error::Overflow)?;
        if end > data.len() {
            return Err(Error::CorruptSampleTable(format!(
                "sample at offset {offset} size {size} runs past end of file ({} bytes)",
                data.len()
            )));
        }
        buf.extend_from_slice(&data[start..end]);
    }
    Ok(buf)
}

/// Write an assembled payload to a file in one call, mirroring the original
/// tool's `save_metadata`.
pub fn write_payload_to_file(payload: &[u8], dest: impl AsRef<Path>) -> Result<()> {
    let mut f = File::create(dest)?;
    f.write_all(payload)?;
    Ok(())
}
