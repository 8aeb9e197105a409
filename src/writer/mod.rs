//! The writer (spec §4.8): serializes a [`Document`] back to bytes, either as a full rewrite
//! or, for an [`IncrementalDocument`], as a single appended revision.

pub mod serialize;

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Document, IncrementalDocument, DEFAULT_BINARY_MARK};
use crate::encryption::{self, EncryptionState};
use crate::error::{Error, Result, SignatureError};
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::object_stream::{ObjectStreamBuilder, ObjectStreamConfig};
use crate::xref::{encode_stream_entry, Xref, XrefEntry, XrefStreamWidths};

/// Tunables for [`Document::save`] / [`IncrementalDocument::save`] (spec §4.8, §3 "Supplemented
/// Features").
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub use_xref_streams: bool,
    pub use_object_streams: bool,
    pub object_stream_config: ObjectStreamConfig,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            use_xref_streams: false,
            use_object_streams: false,
            object_stream_config: ObjectStreamConfig::default(),
        }
    }
}

impl SaveOptions {
    pub fn builder() -> SaveOptionsBuilder {
        SaveOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptionsBuilder {
    opts: SaveOptions,
}

impl SaveOptionsBuilder {
    pub fn use_xref_streams(mut self, value: bool) -> Self {
        self.opts.use_xref_streams = value;
        self
    }

    pub fn use_object_streams(mut self, value: bool) -> Self {
        self.opts.use_object_streams = value;
        self
    }

    pub fn object_stream_config(mut self, config: ObjectStreamConfig) -> Self {
        self.opts.object_stream_config = config;
        self
    }

    /// Classic xref tables have no encoding for a compressed (object-stream-member) entry, so
    /// packing into object streams without xref streams would silently drop those objects on
    /// read-back. Object streams always imply xref streams (spec §4.8).
    pub fn build(mut self) -> SaveOptions {
        if self.opts.use_object_streams {
            self.opts.use_xref_streams = true;
        }
        self.opts
    }
}

/// The table format a save actually uses, after enforcing that object streams require an xref
/// stream (classic tables cannot represent [`XrefEntry::Compressed`]).
fn use_xref_streams(options: &SaveOptions) -> bool {
    options.use_xref_streams || options.use_object_streams
}

impl Document {
    /// Serializes the whole document as a single revision (spec §4.8 steps 1-3): header, every
    /// live object, then a classic xref table or an xref stream, and the trailer.
    pub fn save(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        if let Some(state) = &self.encryption_state {
            verify_file_key_is_current(state)?;
        }

        let mut out = Vec::new();
        write_header(&self.version, &self.binary_mark, &mut out);

        let mut entries: Vec<(ObjectId, Object)> = self.objects.iter().map(|(id, o)| (*id, o.clone())).collect();
        entries.sort_by_key(|(id, _)| *id);

        if let Some(state) = &self.encryption_state {
            for (id, object) in entries.iter_mut() {
                let encrypt_ref = self.trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());
                if Some(*id) != encrypt_ref {
                    encryption::encrypt_object(state, *id, object).map_err(Error::Decryption)?;
                }
            }
        }

        let (packed, object_stream_entries) = if options.use_object_streams {
            pack_into_object_streams(&entries, &options.object_stream_config, &self.trailer)?
        } else {
            (entries, BTreeMap::new())
        };

        let mut xref_table = BTreeMap::new();
        for (id, object) in &packed {
            let offset = out.len() as u32;
            serialize::write_indirect_object(*id, object, &mut out)?;
            xref_table.insert(id.0, XrefEntry::Normal { offset, generation: id.1 });
        }
        for (id, entry) in object_stream_entries {
            xref_table.insert(id.0, entry);
        }
        for oid in free_oids(self, &xref_table) {
            xref_table.insert(oid, XrefEntry::Free { next_free: 0, next_gen: 0 });
        }
        link_free_list(&mut xref_table);

        let max_id = xref_table.keys().copied().max().unwrap_or(0);
        let size = max_id + 1;

        if use_xref_streams(options) {
            write_xref_stream(&xref_table, size, &self.trailer, None, &mut out)?;
        } else {
            write_classic_xref(&xref_table, size, &self.trailer, None, &mut out);
        }

        Ok(out)
    }
}

impl IncrementalDocument {
    /// Appends one revision containing only the objects that changed since load (spec §4.8
    /// "Incremental writes"): the original bytes are emitted verbatim, followed by the new
    /// objects, a fresh xref section chained via `/Prev`, and the new trailer.
    pub fn save(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        if let Some(state) = &self.document.encryption_state {
            verify_file_key_is_current(state)?;
        }

        let mut out = self.original_bytes.clone();
        let prev_start = self.document.xref_start;

        let mut changed: Vec<(ObjectId, Object)> = self
            .changed_since_load()
            .into_iter()
            .filter_map(|id| self.document.objects.get(&id).map(|o| (id, o.clone())))
            .collect();
        changed.sort_by_key(|(id, _)| *id);

        if let Some(state) = &self.document.encryption_state {
            for (id, object) in changed.iter_mut() {
                encryption::encrypt_object(state, *id, object).map_err(Error::Decryption)?;
            }
        }

        let mut xref_table = BTreeMap::new();
        for (id, object) in &changed {
            let offset = out.len() as u32;
            serialize::write_indirect_object(*id, object, &mut out)?;
            xref_table.insert(id.0, XrefEntry::Normal { offset, generation: id.1 });
        }
        for id in self.deleted_since_load() {
            xref_table.insert(id.0, XrefEntry::Free { next_free: 0, next_gen: id.1.saturating_add(1) });
        }

        let size = self.document.max_id + 1;
        if use_xref_streams(options) {
            write_xref_stream(&xref_table, size, &self.document.trailer, Some(prev_start as i64), &mut out)?;
        } else {
            write_classic_xref(&xref_table, size, &self.document.trailer, Some(prev_start as i64), &mut out);
        }

        Ok(out)
    }
}

fn verify_file_key_is_current(state: &EncryptionState) -> Result<()> {
    if state.file_key.is_empty() {
        return Err(Error::Encryption(crate::error::EncryptionError::InvalidPassword));
    }
    Ok(())
}

fn write_header(version: &str, binary_mark: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(b"%PDF-");
    out.extend_from_slice(version.as_bytes());
    out.push(b'\n');
    out.push(b'%');
    if binary_mark.is_empty() {
        out.extend_from_slice(&DEFAULT_BINARY_MARK);
    } else {
        out.extend_from_slice(binary_mark);
    }
    out.push(b'\n');
}

/// Packs eligible objects into `/ObjStm` containers (spec §4.6, §4.8 step 1), returning the
/// surviving plain objects plus a compressed xref entry for each packed object.
fn pack_into_object_streams(
    entries: &[(ObjectId, Object)], config: &ObjectStreamConfig, trailer: &Dictionary,
) -> Result<(Vec<(ObjectId, Object)>, BTreeMap<ObjectId, XrefEntry>)> {
    let encrypt_ref = trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());
    let mut candidates = Vec::new();
    let mut passthrough = Vec::new();
    for (id, object) in entries {
        if config.is_eligible(*id, object, encrypt_ref) {
            candidates.push((*id, object.clone()));
        } else {
            passthrough.push((*id, object.clone()));
        }
    }

    let builder = ObjectStreamBuilder::new(config.clone());
    let packed_streams = builder.pack(&candidates)?;

    let mut compressed_entries = BTreeMap::new();
    let mut next_container_id = passthrough.iter().map(|(id, _)| id.0).max().unwrap_or(0) + 1;
    for (member_ids, stream) in packed_streams {
        let container_id = (next_container_id, 0);
        next_container_id += 1;
        for (index, member_id) in member_ids.iter().enumerate() {
            compressed_entries.insert(
                *member_id,
                XrefEntry::Compressed {
                    container: container_id.0,
                    index: index as u16,
                },
            );
        }
        passthrough.push((container_id, Object::Stream(stream)));
    }

    Ok((passthrough, compressed_entries))
}

fn free_oids(document: &Document, already_assigned: &BTreeMap<u32, XrefEntry>) -> Vec<u32> {
    let live: BTreeSet<u32> = document.objects.keys().map(|id| id.0).collect();
    (1..=document.max_id).filter(|oid| !live.contains(oid) && !already_assigned.contains_key(oid)).collect()
}

/// Rebuilds the free-list cycle (spec §3 invariant I3): oid 0 heads the chain, each free oid
/// points at the next, the last points back to 0.
fn link_free_list(table: &mut BTreeMap<u32, XrefEntry>) {
    let mut free_oids: Vec<u32> = table
        .iter()
        .filter_map(|(oid, entry)| if entry.is_free() { Some(*oid) } else { None })
        .filter(|oid| *oid != 0)
        .collect();
    free_oids.sort_unstable();

    let mut sequence = vec![0u32];
    sequence.extend(free_oids.iter().copied());

    for (i, &oid) in sequence.iter().enumerate() {
        let next_free = sequence.get(i + 1).copied().unwrap_or(0);
        let next_gen = match table.get(&oid) {
            Some(XrefEntry::Free { next_gen, .. }) => *next_gen,
            _ if oid == 0 => 65535,
            _ => 0,
        };
        table.insert(oid, XrefEntry::Free { next_free, next_gen });
    }
}

fn build_trailer(base: &Dictionary, size: u32, prev: Option<i64>) -> Dictionary {
    let mut trailer = base.clone();
    trailer.set("Size", Object::Integer(size as i64));
    trailer.remove(b"Prev");
    if let Some(prev) = prev {
        trailer.set("Prev", Object::Integer(prev));
    }
    trailer
}

fn write_classic_xref(table: &BTreeMap<u32, XrefEntry>, size: u32, base_trailer: &Dictionary, prev: Option<i64>, out: &mut Vec<u8>) {
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n");

    let mut oids: Vec<u32> = table.keys().copied().collect();
    oids.sort_unstable();
    if !oids.contains(&0) {
        oids.insert(0, 0);
    }

    let mut i = 0;
    while i < oids.len() {
        let first = oids[i];
        let mut count = 1;
        while i + count < oids.len() && oids[i + count] == first + count as u32 {
            count += 1;
        }
        out.extend_from_slice(format!("{first} {count}\n").as_bytes());
        for oid in &oids[i..i + count] {
            let entry = table.get(oid).copied().unwrap_or(XrefEntry::Free { next_free: 0, next_gen: 65535 });
            let line = match entry {
                XrefEntry::Normal { offset, generation } => format!("{offset:010} {generation:05} n \n"),
                XrefEntry::Free { next_free, next_gen } => format!("{next_free:010} {next_gen:05} f \n"),
                XrefEntry::UnusableFree => "0000000000 65535 f \n".to_string(),
                XrefEntry::Compressed { .. } => "0000000000 00000 f \n".to_string(),
            };
            out.extend_from_slice(line.as_bytes());
        }
        i += count;
    }

    let trailer = build_trailer(base_trailer, size, prev);
    out.extend_from_slice(b"trailer\n");
    serialize::write_dictionary(&trailer, out);
    out.extend_from_slice(format!("\nstartxref\n{xref_start}\n%%EOF\n").as_bytes());
}

fn write_xref_stream(
    table: &BTreeMap<u32, XrefEntry>, size: u32, base_trailer: &Dictionary, prev: Option<i64>, out: &mut Vec<u8>,
) -> Result<()> {
    let widths = XrefStreamWidths { type_field: 1, field2: 4, field3: 2 };

    // The xref stream is itself an indirect object one past every oid already in `table`; it
    // needs its own self-pointing entry, and /Size must cover it.
    let xref_oid = size;
    let xref_start = out.len() as u32;
    let mut table = table.clone();
    table.insert(xref_oid, XrefEntry::Normal { offset: xref_start, generation: 0 });

    let mut body = Vec::new();
    let mut oids: Vec<u32> = table.keys().copied().collect();
    oids.sort_unstable();
    if !oids.contains(&0) {
        oids.insert(0, 0);
    }
    for oid in &oids {
        let entry = table.get(oid).copied().unwrap_or(XrefEntry::Free { next_free: 0, next_gen: 65535 });
        encode_stream_entry(&entry, &widths, &mut body);
    }

    let compressed = crate::filters::encode_chain(body, &[b"FlateDecode".to_vec()])?;

    let mut dict = build_trailer(base_trailer, xref_oid + 1, prev);
    dict.set("Type", Object::Name(b"XRef".to_vec()));
    dict.set(
        "W",
        Object::Array(vec![
            Object::Integer(widths.type_field as i64),
            Object::Integer(widths.field2 as i64),
            Object::Integer(widths.field3 as i64),
        ]),
    );
    dict.set("Index", Object::Array(vec![Object::Integer(0), Object::Integer(oids.len() as i64)]));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

    let stream = Stream::new(dict, compressed);
    serialize::write_indirect_object((xref_oid, 0), &Object::Stream(stream), out)?;
    out.extend_from_slice(format!("startxref\n{xref_start}\n%%EOF\n").as_bytes());
    Ok(())
}

/// Returns an error unless `reserved` bytes are enough to hold a `size`-byte signature,
/// mirroring the placeholder-reservation check the signature orchestrator performs before
/// patching bytes in place (spec §4.9).
pub fn check_signature_reservation(reserved: usize, required: usize) -> Result<()> {
    if required > reserved {
        return Err(Error::Signature(SignatureError::SignatureTooLarge { reserved, required }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn save_round_trips_a_minimal_document() {
        let mut doc = Document::new();
        let catalog_id = doc.add_object(Dictionary::new());
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let bytes = doc.save(&SaveOptions::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.7\n"));
        assert!(text.contains("1 0 obj"));
        assert!(text.contains("trailer"));
        assert!(text.contains("startxref"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn incremental_save_appends_only_changed_objects() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        doc.trailer.set("Root", Object::Reference(a));
        let original = doc.save(&SaveOptions::default()).unwrap();
        doc.xref_start = original.len();

        let mut inc = IncrementalDocument::create_from(original.clone(), doc);
        inc.document.set_object(b, Object::Integer(99));

        let saved = inc.save(&SaveOptions::default()).unwrap();
        assert!(saved.len() > original.len());
        assert!(saved.starts_with(&original));
        let appended = String::from_utf8_lossy(&saved[original.len()..]);
        assert!(appended.contains("2 0 obj"));
        assert!(appended.contains("/Prev"));
    }

    #[test]
    fn link_free_list_forms_a_single_cycle_back_to_zero() {
        let mut table = BTreeMap::new();
        table.insert(3u32, XrefEntry::Free { next_free: 0, next_gen: 0 });
        table.insert(5u32, XrefEntry::Free { next_free: 0, next_gen: 0 });
        link_free_list(&mut table);
        let mut xref = Xref::new(6);
        xref.entries = table;
        xref.validate_free_list().unwrap();
    }
}
