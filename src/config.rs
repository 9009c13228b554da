//! Configuration objects.
//!
//! The original tool kept `video_trak_index`/`metadata_track_index` as
//! class-level mutable attributes on `MP4Manager`. Here they're just
//! fields on a plain, `Default`-able struct passed in by the caller - no
//! state survives a single extraction call.

/// Which `stsz` layout to trust. See §9 of the design notes: the drone
/// files this crate targets are misread by the spec-correct layout, so
/// `Legacy` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StszMode {
    /// Reproduces the original tool's (technically incorrect) read
    /// pattern: three u32s (flags, version, entry_count) from payload
    /// start, then `entry_count` u32 sizes starting at payload+12.
    Legacy,
    /// ISO/IEC 14496-12-correct: FullBox version/flags (4 bytes),
    /// `sample_size` (u32), `sample_count` (u32), then per-entry sizes
    /// only if `sample_size == 0`.
    SpecCompliant,
}

impl Default for StszMode {
    fn default() -> Self {
        StszMode::Legacy
    }
}

/// Configures which tracks the extractor treats as "video" and
/// "telemetry", and whether the metadata payload is actually extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// 1-based ordinal of the video track among a file's `trak` children.
    pub video_trak_index: u32,
    /// 1-based ordinal of the opaque metadata track.
    pub metadata_trak_index: u32,
    /// If `false`, only header/timing info is produced; the metadata
    /// payload is not assembled.
    pub extract_metadata: bool,
    pub stsz_mode: StszMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            video_trak_index: 1,
            metadata_trak_index: 3,
            extract_metadata: true,
            stsz_mode: StszMode::default(),
        }
    }
}

/// Decimal-place knobs for the ISO-6709 formatter (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iso6709Precision {
    pub lat_dec: u32,
    pub lon_dec: u32,
    pub alt_dec: u32,
}

impl Default for Iso6709Precision {
    fn default() -> Self {
        Iso6709Precision {
            lat_dec: 4,
            lon_dec: 4,
            alt_dec: 3,
        }
    }
}
