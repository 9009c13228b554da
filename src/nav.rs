//! Tree Navigator: walks child boxes of a container, locating named
//! descendants by path.
//!
//! This collapses what the original tool did as one hand-written
//! `_parse_X_for_Y` function per box level (`moov` -> `trak` -> `mdia` ->
//! `minf` -> `stbl` -> `stco`/`stsz`, repeated for every target box) into a
//! single table-driven walk keyed by a slice of fourccs.

use crate::cursor::{iter_boxes, BoxHeader};
use crate::error::Result;

/// Find the first top-level box of the given type in `data`.
pub fn find_top(data: &[u8], fourcc: &[u8; 4]) -> Result<Option<BoxHeader>> {
    for hdr in iter_boxes(data) {
        let hdr = hdr?;
        if &hdr.fourcc == fourcc {
            return Ok(Some(hdr));
        }
    }
    Ok(None)
}

/// Find the first direct child of a container (given by its payload range)
/// that has the given type.
pub fn find_child(data: &[u8], container: &BoxHeader, fourcc: &[u8; 4]) -> Result<Option<BoxHeader>> {
    for hdr in crate::cursor::BoxIter::new(data, container.payload_start(), container.end()) {
        let hdr = hdr?;
        if &hdr.fourcc == fourcc {
            return Ok(Some(hdr));
        }
    }
    Ok(None)
}

/// Collect every direct child of a container.
pub fn children(data: &[u8], container: &BoxHeader) -> Result<Vec<BoxHeader>> {
    crate::cursor::BoxIter::new(data, container.payload_start(), container.end()).collect()
}

/// Descend a `/`-separated path of fourccs from `start` (a container),
/// returning the header of the box at the end of the path if every segment
/// resolves to exactly one direct child of the previous one.
///
/// Example: `descend(data, moov_hdr, &[b"udta", b"meta"])`.
pub fn descend(data: &[u8], start: &BoxHeader, path: &[&[u8; 4]]) -> Result<Option<BoxHeader>> {
    let mut current = *start;
    for fourcc in path {
        match find_child(data, &current, fourcc)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Ordinal (1-based) selection among a container's `trak` children, in
/// file order. This is the policy object described in §4.2: which track is
/// "the video track" or "the telemetry track" is a caller decision, not an
/// inherent property of the file.
pub fn nth_trak(data: &[u8], moov: &BoxHeader, ordinal: u32) -> Result<Option<BoxHeader>> {
    if ordinal == 0 {
        return Ok(None);
    }
    let mut count = 0u32;
    for hdr in crate::cursor::BoxIter::new(data, moov.payload_start(), moov.end()) {
        let hdr = hdr?;
        if &hdr.fourcc == b"trak" {
            count += 1;
            if count == ordinal {
                return Ok(Some(hdr));
            }
        }
    }
    Ok(None)
}
