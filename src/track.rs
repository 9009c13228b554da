//! Track Table Decoder: `mvhd`, `tkhd`, `stts`, `stco`/`co64`, `stsz`.
//!
//! Byte offsets here are lifted directly from the original tool's
//! `_parse_mvhd`/`_parse_tkhd`/`_parse_stts`/`_parse_stco`/`_parse_co64`/
//! `_parse_stsz` (see `examples/original_source/src/pyosmogps/mp4_manager.py`),
//! including the `stsz` quirk documented in the design notes.

use byteorder::{BigEndian, ByteOrder};

use crate::config::StszMode;
use crate::cursor::BoxHeader;
use crate::error::{Error, Result};
use crate::nav;

/// Movie Header (`mvhd`): timescale and duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovieHeader {
    pub timescale: u32,
    pub duration: u64,
}

impl MovieHeader {
    pub fn duration_seconds(&self) -> f64 {
        self.duration as f64 / self.timescale as f64
    }

    pub fn parse(payload: &[u8]) -> Result<MovieHeader> {
        require_len("mvhd", payload, 28)?;
        let version = payload[0];
        let timescale = BigEndian::read_u32(&payload[12..16]);
        let duration = if version == 1 {
            require_len("mvhd", payload, 32)?;
            BigEndian::read_u64(&payload[20..28])
        } else {
            BigEndian::read_u32(&payload[16..20]) as u64
        };
        Ok(MovieHeader {
            timescale,
            duration,
        })
    }
}

/// Track Header (`tkhd`): display width/height as 16.16 fixed-point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackHeader {
    pub width: f64,
    pub height: f64,
}

impl TrackHeader {
    pub fn parse(payload: &[u8]) -> Result<TrackHeader> {
        require_len("tkhd", payload, 84)?;
        let width = BigEndian::read_u32(&payload[76..80]) as f64 / 65536.0;
        let height = BigEndian::read_u32(&payload[80..84]) as f64 / 65536.0;
        Ok(TrackHeader { width, height })
    }
}

/// Time-to-Sample (`stts`): only the first entry is consumed, matching the
/// original tool's uniform-cadence assumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeToSample {
    pub sample_count: u32,
    pub sample_delta: u32,
}

impl TimeToSample {
    pub fn parse(payload: &[u8]) -> Result<TimeToSample> {
        require_len("stts", payload, 16)?;
        Ok(TimeToSample {
            sample_count: BigEndian::read_u32(&payload[8..12]),
            sample_delta: BigEndian::read_u32(&payload[12..16]),
        })
    }
}

/// One track's sample table: chunk offsets and per-sample sizes, in table
/// order. Built once during parsing, consumed once by the Chunk Assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub offsets: Vec<u64>,
    pub sizes: Vec<u32>,
}

impl SampleTable {
    fn parse_stco(payload: &[u8]) -> Result<Vec<u64>> {
        require_len("stco", payload, 8)?;
        let entry_count = BigEndian::read_u32(&payload[4..8]) as usize;
        let needed = 8 + entry_count * 4;
        if payload.len() < needed {
            return Err(Error::TruncatedTable {
                which: "stco",
                expected: needed as u64,
                actual: payload.len() as u64,
            });
        }
        let mut offsets = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let off = 8 + i * 4;
            offsets.push(BigEndian::read_u32(&payload[off..off + 4]) as u64);
        }
        Ok(offsets)
    }

    fn parse_co64(payload: &[u8]) -> Result<Vec<u64>> {
        require_len("co64", payload, 8)?;
        let entry_count = BigEndian::read_u32(&payload[4..8]) as usize;
        let needed = 8 + entry_count * 8;
        if payload.len() < needed {
            return Err(Error::TruncatedTable {
                which: "co64",
                expected: needed as u64,
                actual: payload.len() as u64,
            });
        }
        let mut offsets = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let off = 8 + i * 8;
            offsets.push(BigEndian::read_u64(&payload[off..off + 8]));
        }
        Ok(offsets)
    }

    /// Reproduces the original tool's (spec-incorrect) `stsz` read
    /// pattern: three u32s (flags, version, entry_count) from payload
    /// start, then `entry_count` u32 sizes starting at payload+12. See §9.
    fn parse_stsz_legacy(payload: &[u8]) -> Result<Vec<u32>> {
        require_len("stsz", payload, 12)?;
        let entry_count = BigEndian::read_u32(&payload[8..12]) as usize;
        let needed = 12 + entry_count * 4;
        if payload.len() < needed {
            return Err(Error::TruncatedTable {
                which: "stsz",
                expected: needed as u64,
                actual: payload.len() as u64,
            });
        }
        let mut sizes = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let off = 12 + i * 4;
            sizes.push(BigEndian::read_u32(&payload[off..off + 4]));
        }
        Ok(sizes)
    }

    /// ISO/IEC 14496-12-correct `stsz`: FullBox header, then
    /// `sample_size`/`sample_count`, then per-entry sizes only when
    /// `sample_size == 0`.
    fn parse_stsz_spec(payload: &[u8]) -> Result<Vec<u32>> {
        require_len("stsz", payload, 12)?;
        let sample_size = BigEndian::read_u32(&payload[4..8]);
        let sample_count = BigEndian::read_u32(&payload[8..12]) as usize;
        if sample_size != 0 {
            return Ok(vec![sample_size; sample_count]);
        }
        let needed = 12 + sample_count * 4;
        if payload.len() < needed {
            return Err(Error::TruncatedTable {
                which: "stsz",
                expected: needed as u64,
                actual: payload.len() as u64,
            });
        }
        let mut sizes = Vec::with_capacity(sample_count);
        for i in 0..sample_count {
            let off = 12 + i * 4;
            sizes.push(BigEndian::read_u32(&payload[off..off + 4]));
        }
        Ok(sizes)
    }

    /// Decode the sample table for a `trak` box: walks down to
    /// `mdia/minf/stbl`, then reads whichever of `stco`/`co64` is present
    /// (`co64` wins if both are, matching the target drone files) plus
    /// `stsz`.
    pub fn decode(data: &[u8], trak: &BoxHeader, stsz_mode: StszMode) -> Result<SampleTable> {
        let mdia = nav::find_child(data, trak, b"mdia")?
            .ok_or(Error::MissingBox { fourcc: "mdia" })?;
        let minf = nav::find_child(data, &mdia, b"minf")?
            .ok_or(Error::MissingBox { fourcc: "minf" })?;
        let stbl = nav::find_child(data, &minf, b"stbl")?
            .ok_or(Error::MissingBox { fourcc: "stbl" })?;

        let mut offsets = None;
        if let Some(stco) = nav::find_child(data, &stbl, b"stco")? {
            offsets = Some(Self::parse_stco(box_payload(data, &stco))?);
        }
        if let Some(co64) = nav::find_child(data, &stbl, b"co64")? {
            offsets = Some(Self::parse_co64(box_payload(data, &co64))?);
        }
        let offsets = offsets.ok_or(Error::MissingBox { fourcc: "stco/co64" })?;

        let stsz = nav::find_child(data, &stbl, b"stsz")?
            .ok_or(Error::MissingBox { fourcc: "stsz" })?;
        let sizes = match stsz_mode {
            StszMode::Legacy => Self::parse_stsz_legacy(box_payload(data, &stsz))?,
            StszMode::SpecCompliant => Self::parse_stsz_spec(box_payload(data, &stsz))?,
        };

        if offsets.len() != sizes.len() {
            return Err(Error::CorruptSampleTable(format!(
                "offset count {} != size count {}",
                offsets.len(),
                sizes.len()
            )));
        }

        Ok(SampleTable { offsets, sizes })
    }

    /// Look up the first `stts` entry inside a `trak`'s sample table, for
    /// frame-rate computation.
    pub fn time_to_sample(data: &[u8], trak: &BoxHeader) -> Result<TimeToSample> {
        let mdia = nav::find_child(data, trak, b"mdia")?
            .ok_or(Error::MissingBox { fourcc: "mdia" })?;
        let minf = nav::find_child(data, &mdia, b"minf")?
            .ok_or(Error::MissingBox { fourcc: "minf" })?;
        let stbl = nav::find_child(data, &minf, b"stbl")?
            .ok_or(Error::MissingBox { fourcc: "stbl" })?;
        let stts = nav::find_child(data, &stbl, b"stts")?
            .ok_or(Error::MissingBox { fourcc: "stts" })?;
        TimeToSample::parse(box_payload(data, &stts))
    }
}

fn box_payload<'a>(data: &'a [u8], hdr: &BoxHeader) -> &'a [u8] {
    &data[hdr.payload_start() as usize..hdr.end() as usize]
}

fn require_len(which: &'static str, payload: &[u8], min: usize) -> Result<()> {
    if payload.len() < min {
        return Err(Error::TruncatedTable {
            which,
            expected: min as u64,
            actual: payload.len() as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mvhd_v0() {
        let mut payload = vec![0u8; 28];
        payload[0] = 0; // version 0
        BigEndian::write_u32(&mut payload[12..16], 1000); // timescale
        BigEndian::write_u32(&mut payload[16..20], 5000); // duration
        let mvhd = MovieHeader::parse(&payload).unwrap();
        assert_eq!(mvhd.timescale, 1000);
        assert_eq!(mvhd.duration, 5000);
        assert_eq!(mvhd.duration_seconds(), 5.0);
    }

    #[test]
    fn parses_mvhd_v1_64bit_duration() {
        let mut payload = vec![0u8; 32];
        payload[0] = 1;
        BigEndian::write_u32(&mut payload[12..16], 90000);
        BigEndian::write_u64(&mut payload[20..28], 180000);
        let mvhd = MovieHeader::parse(&payload).unwrap();
        assert_eq!(mvhd.timescale, 90000);
        assert_eq!(mvhd.duration, 180000);
    }

    #[test]
    fn parses_tkhd_fixed_point_dims() {
        let mut payload = vec![0u8; 84];
        BigEndian::write_u32(&mut payload[76..80], 1920 << 16);
        BigEndian::write_u32(&mut payload[80..84], 1080 << 16);
        let tkhd = TrackHeader::parse(&payload).unwrap();
        assert_eq!(tkhd.width, 1920.0);
        assert_eq!(tkhd.height, 1080.0);
    }

    #[test]
    fn parses_stco_offsets() {
        let mut payload = vec![0u8; 8 + 2 * 4];
        BigEndian::write_u32(&mut payload[4..8], 2);
        BigEndian::write_u32(&mut payload[8..12], 100);
        BigEndian::write_u32(&mut payload[12..16], 200);
        let offsets = SampleTable::parse_stco(&payload).unwrap();
        assert_eq!(offsets, vec![100, 200]);
    }

    #[test]
    fn parses_co64_offsets() {
        let mut payload = vec![0u8; 8 + 2 * 8];
        BigEndian::write_u32(&mut payload[4..8], 2);
        BigEndian::write_u64(&mut payload[8..16], 1_000_000_000);
        BigEndian::write_u64(&mut payload[16..24], 2_000_000_000);
        let offsets = SampleTable::parse_co64(&payload).unwrap();
        assert_eq!(offsets, vec![1_000_000_000, 2_000_000_000]);
    }

    #[test]
    fn parses_stsz_legacy_quirk() {
        // flags(4) version(4) entry_count(4) then sizes at +12.
        let mut payload = vec![0u8; 12 + 2 * 4];
        BigEndian::write_u32(&mut payload[8..12], 2);
        BigEndian::write_u32(&mut payload[12..16], 40);
        BigEndian::write_u32(&mut payload[16..20], 50);
        let sizes = SampleTable::parse_stsz_legacy(&payload).unwrap();
        assert_eq!(sizes, vec![40, 50]);
    }

    #[test]
    fn parses_stsz_spec_compliant_uniform_size() {
        let mut payload = vec![0u8; 12];
        BigEndian::write_u32(&mut payload[4..8], 64); // sample_size != 0
        BigEndian::write_u32(&mut payload[8..12], 3); // sample_count
        let sizes = SampleTable::parse_stsz_spec(&payload).unwrap();
        assert_eq!(sizes, vec![64, 64, 64]);
    }

    #[test]
    fn truncated_table_is_an_error_not_a_panic() {
        let payload = vec![0u8; 8 + 2 * 4 - 1];
        let mut p = payload.clone();
        BigEndian::write_u32(&mut p[4..8], 2);
        assert!(matches!(
            SampleTable::parse_stco(&p),
            Err(Error::TruncatedTable { which: "stco", .. })
        ));
    }
}
