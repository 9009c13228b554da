//! moov Rewriter: splices a freshly-built `udta/meta` (mdta) box into an
//! existing `moov`, in place, without touching `mdat` or any sample offset.
//!
//! Grounded on `examples/miquels-mp4/src/mp4box.rs`'s header-patch-on-write
//! pattern (recompute a box's size from its rebuilt payload, promote to a
//! 64-bit size if needed) and on the original tool's `inject_metadata`
//! (`examples/original_source/src/pyosmogps/mp4_manager.py`), which only
//! works when `mdat` precedes `moov` - the "faststart" (moov-first) layout
//! is explicitly out of scope; see §4.6 of the design notes.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::cursor::BoxHeader;
use crate::error::{Error, Result};
use crate::meta::{self, MetadataFields};
use crate::nav;

/// Rebuild the `udta` box found at `moov`'s children, folding in a fresh
/// mdta `meta` box. Any existing mdta `meta` under `udta` is dropped; every
/// other child (a non-mdta `meta`, `cprt`, vendor boxes, ...) is kept
/// verbatim and in its original relative order.
fn rebuild_udta(data: &[u8], existing_udta: Option<&BoxHeader>, new_meta: &[u8]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    if let Some(udta) = existing_udta {
        for child in nav::children(data, udta)? {
            if &child.fourcc == b"meta" && meta::is_mdta_meta(data, &child)? {
                debug!("dropping existing mdta meta box at offset {}", child.pos);
                continue;
            }
            payload.extend_from_slice(&data[child.pos as usize..child.end() as usize]);
        }
    }
    payload.extend_from_slice(new_meta);
    meta::write_box(*b"udta", &payload)
}

/// Rebuild `moov`'s payload, replacing its `udta` child (or appending one,
/// if it had none) with the result of [`rebuild_udta`]. Every other direct
/// child of `moov` (`mvhd`, every `trak`, ...) passes through unchanged.
fn rebuild_moov(data: &[u8], moov: &BoxHeader, pairs: &[(String, String)]) -> Result<Vec<u8>> {
    let children = nav::children(data, moov)?;
    let existing_udta = children.iter().find(|c| &c.fourcc == b"udta").copied();
    let new_meta = meta::build_meta_box(pairs)?;
    let new_udta = rebuild_udta(data, existing_udta.as_ref(), &new_meta)?;

    let mut payload = Vec::new();
    let mut replaced = false;
    for child in &children {
        if &child.fourcc == b"udta" {
            payload.extend_from_slice(&new_udta);
            replaced = true;
        } else if &child.fourcc == b"meta" && meta::is_mdta_meta(data, child)? {
            // A direct mdta `meta` child of `moov` itself (not nested under
            // `udta`) is dropped per the rewrite contract; the fresh one
            // always lives under `udta`.
            debug!("dropping existing direct mdta meta box at offset {}", child.pos);
        } else {
            payload.extend_from_slice(&data[child.pos as usize..child.end() as usize]);
        }
    }
    if !replaced {
        payload.extend_from_slice(&new_udta);
    }

    meta::write_box(*b"moov", &payload)
}

/// Inject `fields` into `source`, returning the rewritten file bytes.
/// `source` must contain a top-level `mdat` that precedes the top-level
/// `moov`; this is the layout every file this crate targets already has,
/// and rewriting a faststart (`moov`-first) file would require
/// renumbering every sample offset, which is out of scope.
pub fn inject(source: &[u8], fields: &MetadataFields) -> Result<Vec<u8>> {
    let mdat = nav::find_top(source, b"mdat")?.ok_or(Error::MissingBox { fourcc: "mdat" })?;
    let moov = nav::find_top(source, b"moov")?.ok_or(Error::MissingBox { fourcc: "moov" })?;
    if moov.pos < mdat.pos {
        return Err(Error::FaststartUnsupported);
    }

    let pairs = fields.ordered_pairs();
    let new_moov = rebuild_moov(source, &moov, &pairs)?;
    trace!(
        "rebuilt moov: {} bytes -> {} bytes ({} metadata pairs)",
        moov.total_size,
        new_moov.len(),
        pairs.len()
    );

    let mut out = Vec::with_capacity(source.len() - moov.total_size as usize + new_moov.len());
    out.extend_from_slice(&source[..moov.pos as usize]);
    out.extend_from_slice(&new_moov);
    out.extend_from_slice(&source[moov.end() as usize..]);
    Ok(out)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".dronemeta.tmp");
    path.with_file_name(name)
}

/// Read `source_path`, inject `fields`, and write the result to
/// `dest_path` via a same-directory temp file plus rename, so a crash or
/// interrupted write never leaves `dest_path` half-written. `source_path`
/// and `dest_path` may be the same file.
pub fn inject_into_file(
    source_path: impl AsRef<Path>,
    dest_path: impl AsRef<Path>,
    fields: &MetadataFields,
) -> Result<()> {
    let file = File::open(source_path.as_ref())?;
    let mmap = unsafe { Mmap::map(&file) }?;
    let new_bytes = inject(&mmap, fields)?;
    drop(mmap);
    drop(file);

    let dest_path = dest_path.as_ref();
    let tmp_path = tmp_sibling(dest_path);
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&new_bytes)?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, dest_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::read_header;

    fn box32(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
        v.extend_from_slice(fourcc);
        v.extend_from_slice(payload);
        v
    }

    fn container(fourcc: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = Vec::new();
        for c in children {
            payload.extend_from_slice(c);
        }
        box32(fourcc, &payload)
    }

    fn sample_fields() -> MetadataFields {
        MetadataFields {
            accuracy_horizontal: Some(5.0),
            iso6709: "+45.4642+009.1900+120.000/".to_string(),
            make: Some("DJI".to_string()),
            model: Some("Mavic 3".to_string()),
            software: None,
            creationdate: Some("2024-05-01T10:00:00+0200".to_string()),
        }
    }

    fn moov_meta_pairs(out: &[u8]) -> Vec<(String, String)> {
        let moov = nav::find_top(out, b"moov").unwrap().unwrap();
        let udta = nav::find_child(out, &moov, b"udta").unwrap().unwrap();
        let meta = nav::find_child(out, &udta, b"meta").unwrap().unwrap();
        let meta_bytes = &out[meta.pos as usize..meta.end() as usize];
        meta::parse_meta_box(meta_bytes).unwrap()
    }

    #[test]
    fn injects_fresh_udta_meta_when_none_exists() {
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(mdat);
        source.extend(moov);

        let fields = sample_fields();
        let out = inject(&source, &fields).unwrap();

        let pairs = moov_meta_pairs(&out);
        assert_eq!(pairs, fields.ordered_pairs());
    }

    #[test]
    fn faststart_layout_is_rejected() {
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(moov);
        source.extend(mdat);

        let err = inject(&source, &sample_fields()).unwrap_err();
        assert!(matches!(err, Error::FaststartUnsupported));
    }

    #[test]
    fn missing_moov_is_an_error() {
        let mdat = box32(b"mdat", &[0; 4]);
        let source = mdat;
        let err = inject(&source, &sample_fields()).unwrap_err();
        assert!(matches!(err, Error::MissingBox { fourcc: "moov" }));
    }

    #[test]
    fn missing_mdat_is_an_error() {
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak]);
        let source = moov;
        let err = inject(&source, &sample_fields()).unwrap_err();
        assert!(matches!(err, Error::MissingBox { fourcc: "mdat" }));
    }

    #[test]
    fn preserves_non_mdta_udta_siblings() {
        let cprt = box32(b"cprt", b"(c) test");
        let udta = container(b"udta", &[cprt]);
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak, udta]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(mdat);
        source.extend(moov);

        let out = inject(&source, &sample_fields()).unwrap();

        let moov_hdr = nav::find_top(&out, b"moov").unwrap().unwrap();
        let udta_hdr = nav::find_child(&out, &moov_hdr, b"udta").unwrap().unwrap();
        let cprt_hdr = nav::find_child(&out, &udta_hdr, b"cprt").unwrap();
        assert!(cprt_hdr.is_some());
        let meta_hdr = nav::find_child(&out, &udta_hdr, b"meta").unwrap().unwrap();
        assert!(meta::is_mdta_meta(&out, &meta_hdr).unwrap());
    }

    #[test]
    fn replaces_existing_mdta_meta_instead_of_duplicating() {
        let old_meta = meta::build_meta_box(&[(
            "com.apple.quicktime.location.ISO6709".to_string(),
            "+00.0000+000.0000/".to_string(),
        )])
        .unwrap();
        let udta = container(b"udta", &[old_meta]);
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak, udta]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(mdat);
        source.extend(moov);

        let fields = sample_fields();
        let out = inject(&source, &fields).unwrap();

        let moov_hdr = nav::find_top(&out, b"moov").unwrap().unwrap();
        let udta_hdr = nav::find_child(&out, &moov_hdr, b"udta").unwrap().unwrap();
        let meta_children: Vec<_> = nav::children(&out, &udta_hdr)
            .unwrap()
            .into_iter()
            .filter(|c| &c.fourcc == b"meta")
            .collect();
        assert_eq!(meta_children.len(), 1);

        let pairs = moov_meta_pairs(&out);
        assert_eq!(pairs, fields.ordered_pairs());
    }

    #[test]
    fn drops_direct_mdta_meta_child_of_moov_itself() {
        let old_meta = meta::build_meta_box(&[(
            "com.apple.quicktime.location.ISO6709".to_string(),
            "+00.0000+000.0000/".to_string(),
        )])
        .unwrap();
        let trak = box32(b"trak", &[9; 4]);
        // mdta meta as a direct child of moov, not nested under udta.
        let moov = container(b"moov", &[trak, old_meta]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(mdat);
        source.extend(moov);

        let fields = sample_fields();
        let out = inject(&source, &fields).unwrap();

        let moov_hdr = nav::find_top(&out, b"moov").unwrap().unwrap();
        let direct_meta_children: Vec<_> = nav::children(&out, &moov_hdr)
            .unwrap()
            .into_iter()
            .filter(|c| &c.fourcc == b"meta")
            .collect();
        assert!(direct_meta_children.is_empty());

        let pairs = moov_meta_pairs(&out);
        assert_eq!(pairs, fields.ordered_pairs());
    }

    #[test]
    fn preserves_non_mdta_direct_meta_child_of_moov() {
        // A non-mdta meta box directly under moov (e.g. a different
        // handler type) is not this system's concern and must survive.
        let hdlr = box32(b"hdlr", &[0, 0, 0, 0, 0, 0, 0, 0, b'o', b't', b'h', b'r', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let other_meta_payload = {
            let mut p = vec![0u8; 4];
            p.extend_from_slice(&hdlr);
            p
        };
        let other_meta = box32(b"meta", &other_meta_payload);
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak, other_meta]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(mdat);
        source.extend(moov);

        let out = inject(&source, &sample_fields()).unwrap();

        let moov_hdr = nav::find_top(&out, b"moov").unwrap().unwrap();
        let direct_meta_children: Vec<_> = nav::children(&out, &moov_hdr)
            .unwrap()
            .into_iter()
            .filter(|c| &c.fourcc == b"meta")
            .collect();
        assert_eq!(direct_meta_children.len(), 1);
        assert!(!meta::is_mdta_meta(&out, &direct_meta_children[0]).unwrap());
    }

    #[test]
    fn moov_header_still_parses_after_rewrite() {
        let trak = box32(b"trak", &[9; 4]);
        let moov = container(b"moov", &[trak]);
        let mdat = box32(b"mdat", &[0; 16]);
        let mut source = box32(b"ftyp", &[0; 4]);
        source.extend(mdat);
        source.extend(moov);

        let out = inject(&source, &sample_fields()).unwrap();
        let hdr = nav::find_top(&out, b"moov").unwrap().unwrap();
        assert_eq!(hdr.end(), out.len() as u64);
        // sanity: header itself still round-trips through read_header.
        let reread = read_header(&out, hdr.pos, out.len() as u64).unwrap().unwrap();
        assert_eq!(reread.total_size, hdr.total_size);
    }
}
