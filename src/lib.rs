//! Extracts a drone's opaque telemetry track out of an MP4 container, and
//! injects Apple-style `mdta` geolocation metadata back into one.
//!
//! The box-tree layer (`cursor`, `nav`, `track`) only ever reads; the two
//! write paths (`meta`, `rewrite`) only ever append a fresh `udta/meta` and
//! patch `moov`'s own size - sample data in `mdat` is never touched or
//! renumbered.

#[macro_use]
extern crate log;

pub mod assemble;
pub mod config;
pub mod creationdate;
pub mod cursor;
pub mod error;
pub mod iso6709;
pub mod meta;
pub mod nav;
pub mod rewrite;
pub mod telemetry;
pub mod track;

pub use error::{Error, Result};

use config::ExtractionConfig;

/// Coarse per-file facts a caller typically wants before deciding whether
/// (and how) to process a video: display dimensions, duration, and the
/// nominal frame rate implied by the video track's first `stts` entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderSummary {
    pub width: f64,
    pub height: f64,
    pub duration_seconds: f64,
    pub frame_rate: f64,
}

fn box_payload<'a>(data: &'a [u8], hdr: &cursor::BoxHeader) -> &'a [u8] {
    &data[hdr.payload_start() as usize..hdr.end() as usize]
}

/// Summarize the header info of `data`'s video track, per `config`.
pub fn header_summary(data: &[u8], config: &ExtractionConfig) -> Result<HeaderSummary> {
    let moov = nav::find_top(data, b"moov")?.ok_or(Error::MissingBox { fourcc: "moov" })?;
    let mvhd = nav::find_child(data, &moov, b"mvhd")?.ok_or(Error::MissingBox { fourcc: "mvhd" })?;
    let movie_header = track::MovieHeader::parse(box_payload(data, &mvhd))?;

    let video_trak = nav::nth_trak(data, &moov, config.video_trak_index)?
        .ok_or(Error::MissingBox { fourcc: "trak" })?;
    let tkhd = nav::find_child(data, &video_trak, b"tkhd")?
        .ok_or(Error::MissingBox { fourcc: "tkhd" })?;
    let track_header = track::TrackHeader::parse(box_payload(data, &tkhd))?;

    let tts = track::SampleTable::time_to_sample(data, &video_trak)?;
    let duration_seconds = movie_header.duration_seconds();
    let frame_rate = if duration_seconds == 0.0 {
        0.0
    } else {
        tts.sample_count as f64 / duration_seconds
    };

    Ok(HeaderSummary {
        width: track_header.width,
        height: track_header.height,
        duration_seconds,
        frame_rate,
    })
}

/// Assemble the raw byte payload of `data`'s metadata track, per `config`.
/// The returned bytes are opaque to this crate; decoding them into
/// [`telemetry::TelemetryRecord`]s is a downstream concern.
pub fn extract_metadata_payload(data: &[u8], config: &ExtractionConfig) -> Result<Vec<u8>> {
    let moov = nav::find_top(data, b"moov")?.ok_or(Error::MissingBox { fourcc: "moov" })?;
    let trak = nav::nth_trak(data, &moov, config.metadata_trak_index)?
        .ok_or(Error::MissingBox { fourcc: "trak" })?;
    let table = track::SampleTable::decode(data, &trak, config.stsz_mode)?;
    assemble::assemble_from_bytes(data, &table)
}

/// Inject `fields` into `data`, returning the rewritten file bytes. See
/// [`rewrite::inject`] for the precondition on `mdat`/`moov` ordering.
pub fn inject_geo(data: &[u8], fields: &meta::MetadataFields) -> Result<Vec<u8>> {
    rewrite::inject(data, fields)
}
