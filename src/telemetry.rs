//! Telemetry boundary contract.
//!
//! `TelemetryRecord` is the shape a downstream decoder for the opaque
//! metadata track is expected to produce; this crate only extracts the raw
//! sample bytes (see `assemble`) and hands them off as-is - decoding the
//! per-frame layout is out of scope (§OVERVIEW Non-goals). The struct lives
//! here so extractor and decoder agree on one Rust type for it.
//!
//! Field layout mirrors `examples/original_source/src/pyosmogps/metadata_manager.py`'s
//! `extract_gps_info`, whose per-entry dict keys a timezone-adjusted
//! `datetime` (`"timeinfo": homedate`), not an elapsed-seconds float.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A right-handed XYZ vector, reused for both accelerometer readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One decoded telemetry sample. Nothing in this crate constructs one of
/// these; it documents what a separate decoder crate is expected to
/// produce from the bytes `assemble::assemble_from_bytes` returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Timezone-aware instant the sample was recorded at.
    pub timestamp: DateTime<FixedOffset>,
    pub altitude_m: f64,
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub camera_accel_1: Vector3,
    pub camera_accel_2: Vector3,
    pub remote_derivatives: Vector3,
}
