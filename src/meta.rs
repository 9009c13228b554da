//! mdta Meta Builder: constructs (and, for round-trip testing, parses) the
//! Apple `meta` box: `hdlr=mdta` + `keys` + `ilst`.
//!
//! Grounded on `examples/miquels-mp4/src/boxes/ilst.rs` (the
//! `AppleItemListBox`/`IDataBox` shape) and confirmed against real
//! `com.apple.quicktime.*` key/value pairs read back out in
//! `examples/onkoe-nom-exif/src/mov.rs`.

use byteorder::{BigEndian, ByteOrder};

use crate::cursor::{read_header, BoxIter};
use crate::error::{Error, Result};
use crate::nav;

/// The enumerated set of keys this system writes, in the order they are
/// emitted when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFields {
    pub accuracy_horizontal: Option<f64>,
    pub iso6709: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    /// Already normalized via `creationdate::normalize_str`.
    pub creationdate: Option<String>,
}

impl MetadataFields {
    /// The ordered (key, value) pairs this struct contributes, skipping
    /// absent optional fields. `ISO6709` is always present.
    pub fn ordered_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(acc) = self.accuracy_horizontal {
            pairs.push((
                "com.apple.quicktime.location.accuracy.horizontal".to_string(),
                format!("{acc:.6}"),
            ));
        }
        pairs.push((
            "com.apple.quicktime.location.ISO6709".to_string(),
            self.iso6709.clone(),
        ));
        if let Some(ref make) = self.make {
            pairs.push(("com.apple.quicktime.make".to_string(), make.clone()));
        }
        if let Some(ref model) = self.model {
            pairs.push(("com.apple.quicktime.model".to_string(), model.clone()));
        }
        if let Some(ref software) = self.software {
            pairs.push(("com.apple.quicktime.software".to_string(), software.clone()));
        }
        if let Some(ref cd) = self.creationdate {
            pairs.push(("com.apple.quicktime.creationdate".to_string(), cd.clone()));
        }
        pairs
    }
}

/// Write a complete box: header (32-bit, or 64-bit-extended when the total
/// size would not fit in 32 bits) followed by `payload`. Shared with the
/// moov Rewriter, which needs the same size-promotion logic for `udta`
/// and `moov` itself.
pub(crate) fn write_box(fourcc: [u8; 4], payload: &[u8]) -> Result<Vec<u8>> {
    let payload_len = payload.len() as u64;
    let total = payload_len.checked_add(8).ok_or(Error::Overflow)?;
    let mut out = Vec::with_capacity(total as usize + 8);
    if total >= (1u64 << 32) {
        let total_ext = payload_len.checked_add(16).ok_or(Error::Overflow)?;
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&fourcc);
        out.extend_from_slice(&total_ext.to_be_bytes());
    } else {
        out.extend_from_slice(&(total as u32).to_be_bytes());
        out.extend_from_slice(&fourcc);
    }
    out.extend_from_slice(payload);
    Ok(out)
}

fn build_hdlr() -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(25);
    payload.extend_from_slice(&0u32.to_be_bytes()); // version/flags
    payload.extend_from_slice(&0u32.to_be_bytes()); // predefined
    payload.extend_from_slice(b"mdta"); // handler_type
    payload.extend_from_slice(&[0u8; 12]); // reserved
    payload.push(0u8); // name (empty, NUL-terminated)
    write_box(*b"hdlr", &payload)
}

fn build_keys(pairs: &[(String, String)]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes()); // version/flags
    payload.extend_from_slice(&(pairs.len() as u32).to_be_bytes());
    for (key, _value) in pairs {
        let kbytes = key.as_bytes();
        let key_size = 8u64
            .checked_add(kbytes.len() as u64)
            .ok_or(Error::Overflow)?;
        if key_size > u32::MAX as u64 {
            return Err(Error::Overflow);
        }
        payload.extend_from_slice(&(key_size as u32).to_be_bytes());
        payload.extend_from_slice(b"mdta");
        payload.extend_from_slice(kbytes);
    }
    write_box(*b"keys", &payload)
}

fn build_data(value: &str) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(8 + value.len());
    payload.extend_from_slice(&1u32.to_be_bytes()); // type indicator: UTF-8
    payload.extend_from_slice(&0u32.to_be_bytes()); // locale
    payload.extend_from_slice(value.as_bytes());
    write_box(*b"data", &payload)
}

fn build_ilst(pairs: &[(String, String)]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    for (i, (_key, value)) in pairs.iter().enumerate() {
        let idx = (i + 1) as u32;
        let data_box = build_data(value)?;
        let item_box = write_box(idx.to_be_bytes(), &data_box)?;
        payload.extend_from_slice(&item_box);
    }
    write_box(*b"ilst", &payload)
}

/// Build the complete `meta` box (including its own header) from an
/// ordered list of (key, value) pairs.
pub fn build_meta_box(pairs: &[(String, String)]) -> Result<Vec<u8>> {
    let hdlr = build_hdlr()?;
    let keys = build_keys(pairs)?;
    let ilst = build_ilst(pairs)?;

    let mut payload = Vec::with_capacity(4 + hdlr.len() + keys.len() + ilst.len());
    payload.extend_from_slice(&0u32.to_be_bytes()); // meta is a FullBox
    payload.extend_from_slice(&hdlr);
    payload.extend_from_slice(&keys);
    payload.extend_from_slice(&ilst);
    write_box(*b"meta", &payload)
}

/// Parse a standalone `meta` box (as produced by [`build_meta_box`]) back
/// into its ordered (key, value) pairs. Used to verify the round-trip
/// property in §8; not needed by the rewriter itself, which only ever
/// writes `meta` boxes.
pub fn parse_meta_box(data: &[u8]) -> Result<Vec<(String, String)>> {
    let meta_hdr = read_header(data, 0, data.len() as u64)?
        .ok_or(Error::MissingBox { fourcc: "meta" })?;
    if &meta_hdr.fourcc != b"meta" {
        return Err(Error::MissingBox { fourcc: "meta" });
    }
    // Skip the 4-byte FullBox version/flags field.
    let children_start = meta_hdr.payload_start() + 4;

    let mut keys_list: Vec<String> = Vec::new();
    let mut values: Vec<(u32, String)> = Vec::new();

    for child in BoxIter::new(data, children_start, meta_hdr.end()) {
        let child = child?;
        match &child.fourcc {
            b"keys" => {
                let payload = &data[child.payload_start() as usize..child.end() as usize];
                if payload.len() < 8 {
                    return Err(Error::TruncatedTable {
                        which: "keys",
                        expected: 8,
                        actual: payload.len() as u64,
                    });
                }
                let count = BigEndian::read_u32(&payload[4..8]) as usize;
                let mut off = 8usize;
                for _ in 0..count {
                    if payload.len() < off + 8 {
                        return Err(Error::TruncatedTable {
                            which: "keys",
                            expected: (off + 8) as u64,
                            actual: payload.len() as u64,
                        });
                    }
                    let key_size = BigEndian::read_u32(&payload[off..off + 4]) as usize;
                    let key_str = std::str::from_utf8(&payload[off + 8..off + key_size])
                        .map_err(|_| Error::CorruptSampleTable("non-UTF-8 mdta key".to_string()))?
                        .to_string();
                    keys_list.push(key_str);
                    off += key_size;
                }
            }
            b"ilst" => {
                for item in BoxIter::new(data, child.payload_start(), child.end()) {
                    let item = item?;
                    let idx = BigEndian::read_u32(&item.fourcc);
                    if let Some(data_box) = nav::find_child(data, &item, b"data")? {
                        let dp = &data[data_box.payload_start() as usize..data_box.end() as usize];
                        if dp.len() < 8 {
                            return Err(Error::TruncatedTable {
                                which: "data",
                                expected: 8,
                                actual: dp.len() as u64,
                            });
                        }
                        let value = std::str::from_utf8(&dp[8..])
                            .map_err(|_| Error::CorruptSampleTable("non-UTF-8 mdta value".to_string()))?
                            .to_string();
                        values.push((idx, value));
                    }
                }
            }
            _ => {}
        }
    }

    values.sort_by_key(|(idx, _)| *idx);
    let mut result = Vec::with_capacity(values.len());
    for (idx, value) in values {
        let key = keys_list
            .get((idx.saturating_sub(1)) as usize)
            .cloned()
            .unwrap_or_default();
        result.push((key, value));
    }
    Ok(result)
}

/// Does this `meta` box (given its full bytes, header included) have
/// handler_type `mdta`?
pub fn is_mdta_meta(data: &[u8], meta: &crate::cursor::BoxHeader) -> Result<bool> {
    let hdlr = match nav::find_child(data, meta, b"hdlr")? {
        Some(h) => h,
        None => return Ok(false),
    };
    let payload = &data[hdlr.payload_start() as usize..hdlr.end() as usize];
    Ok(payload.len() >= 12 && &payload[8..12] == b"mdta")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ordered_pairs() {
        let fields = MetadataFields {
            accuracy_horizontal: Some(14.235563),
            iso6709: "+22.5797+113.9380+028.396/".to_string(),
            make: Some("Apple".to_string()),
            model: Some("iPhone 15 Pro".to_string()),
            software: Some("17.1".to_string()),
            creationdate: Some("2023-11-02T19:58:34+0800".to_string()),
        };
        let pairs = fields.ordered_pairs();
        assert_eq!(pairs.len(), 6);

        let meta = build_meta_box(&pairs).unwrap();
        let parsed = parse_meta_box(&meta).unwrap();
        assert_eq!(parsed, pairs);
    }

    #[test]
    fn round_trips_minimal_iso6709_only() {
        let fields = MetadataFields {
            iso6709: "+00.0000+000.0000/".to_string(),
            ..Default::default()
        };
        let pairs = fields.ordered_pairs();
        assert_eq!(pairs.len(), 1);
        let meta = build_meta_box(&pairs).unwrap();
        let parsed = parse_meta_box(&meta).unwrap();
        assert_eq!(parsed, pairs);
    }

    #[test]
    fn accuracy_is_formatted_with_six_decimals() {
        let fields = MetadataFields {
            accuracy_horizontal: Some(3.0),
            iso6709: "+00.0000+000.0000/".to_string(),
            ..Default::default()
        };
        let pairs = fields.ordered_pairs();
        assert_eq!(pairs[0].1, "3.000000");
    }

    #[test]
    fn detects_mdta_handler() {
        let fields = MetadataFields {
            iso6709: "+00.0000+000.0000/".to_string(),
            ..Default::default()
        };
        let meta_bytes = build_meta_box(&fields.ordered_pairs()).unwrap();
        let hdr = read_header(&meta_bytes, 0, meta_bytes.len() as u64).unwrap().unwrap();
        assert!(is_mdta_meta(&meta_bytes, &hdr).unwrap());
    }
}
