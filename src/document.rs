//! The object store (spec §3 "Revision", §4.3): a fully-materialized, newest-wins merged view
//! of every revision the reader walked. Loading flattens the `/Prev` chain into one
//! `BTreeMap<ObjectId, Object>` (first definition wins, see `reader/mod.rs`), so lookups here
//! are plain map operations rather than a per-call revision walk.

use std::collections::BTreeMap;

use crate::config::{Config, IdSource};
use crate::encryption::EncryptionState;
use crate::error::{EncryptionError, Error, Result};
use crate::object::{Dictionary, Object, ObjectId};
use crate::xref::{Xref, XrefEntry};

/// A loaded (or freshly created) PDF document: every live object, the xref table it was loaded
/// from (or is being built for), and the trailer dictionary.
#[derive(Debug, Clone)]
pub struct Document {
    /// `%PDF-M.N` version string, e.g. `"1.7"`.
    pub version: String,
    pub objects: BTreeMap<ObjectId, Object>,
    pub reference_table: Xref,
    pub trailer: Dictionary,
    /// One past the highest object number in use (spec §3 "Trailer" `/Size`).
    pub max_id: u32,
    /// Bytes of the binary-marker comment line, not including the leading `%` (spec §4.1).
    pub binary_mark: Vec<u8>,
    /// Byte offset of this document's newest xref section, as found by `startxref`.
    pub xref_start: usize,
    pub encryption_state: Option<EncryptionState>,
    /// Per-document knobs (spec §9): `/ID` generation, AES padding strictness, written PDF
    /// version. Carried on the document so the reader and writer can both see it.
    pub config: Config,
}

/// The conventional binary marker bytes (spec §4.8 step 2), used when a document has none yet
/// (freshly created, or the source omitted it).
pub const DEFAULT_BINARY_MARK: [u8; 7] = [0xCF, 0xEC, 0xFF, 0xE8, 0xD7, 0xCB, 0xCD];

impl Document {
    /// An empty, unencrypted document at PDF 1.7 with no objects and no trailer entries.
    /// Building a minimal viewable PDF (a Catalog and a zero-page Pages node) is the caller's
    /// job — that page-tree shape lives outside this core (spec §1 Non-goals).
    pub fn new() -> Self {
        Document {
            version: "1.7".to_string(),
            objects: BTreeMap::new(),
            reference_table: Xref::new(1),
            trailer: Dictionary::new(),
            max_id: 0,
            binary_mark: DEFAULT_BINARY_MARK.to_vec(),
            xref_start: 0,
            encryption_state: None,
            config: Config::default(),
        }
    }

    /// An empty document with explicit [`Config`] (spec §9: `/ID` source, AES padding
    /// strictness, written version) instead of the defaults.
    pub fn new_with_config(config: Config) -> Self {
        let mut document = Document::new();
        document.version = config.version.clone();
        document.config = config;
        document
    }

    /// Assigns the next free object number (spec §4.3 `add`): one past every oid currently
    /// tracked, generation 0. Attaches the object to this revision immediately.
    pub fn add_object<O: Into<Object>>(&mut self, value: O) -> ObjectId {
        let oid = self.max_id + 1;
        let id = (oid, 0);
        self.objects.insert(id, value.into());
        self.reference_table.insert(oid, XrefEntry::Normal { offset: 0, generation: 0 });
        self.max_id = oid;
        id
    }

    /// Inserts (or replaces) an object at an explicit id, used when rebuilding a specific
    /// reference (e.g. updating a page's `/Contents`).
    pub fn set_object<O: Into<Object>>(&mut self, id: ObjectId, value: O) {
        self.objects.insert(id, value.into());
        self.max_id = self.max_id.max(id.0);
    }

    /// Marks `id` free (spec §4.3 `delete`): the entry is removed from the live object map and
    /// the free-list bump (I3) is left to the writer, which rebuilds the free-list chain from
    /// the surviving gaps on each save.
    pub fn delete_object(&mut self, id: ObjectId) -> Option<Object> {
        self.reference_table.insert(
            id.0,
            XrefEntry::Free {
                next_free: 0,
                next_gen: id.1.saturating_add(1),
            },
        );
        self.objects.remove(&id)
    }

    pub fn object_exists(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id).and_then(Object::as_dict)
    }

    /// Resolves one level of indirection: a [`Object::Reference`] becomes the object it points
    /// at (id preserved), anything else passes through unchanged under a `(0, 0)` sentinel id —
    /// callers that only need the value (e.g. a stream's possibly-indirect `/Length`) don't have
    /// to branch on whether the dictionary held a reference or a direct value.
    pub fn dereference<'a>(&'a self, object: &'a Object) -> Result<(ObjectId, &'a Object)> {
        match object {
            Object::Reference(id) => {
                let target = self.get_object(*id)?;
                Ok((*id, target))
            }
            other => Ok(((0, 0), other)),
        }
    }

    /// Yields every live object, newest (i.e. only) revision first — revisions are already
    /// flattened at load time, so this is just an in-order walk (spec §4.3 `iterate`).
    pub fn iterate(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    /// Checks whether `password` unlocks this document, without mutating any state. Used both
    /// to probe the empty user password and to validate caller-supplied passwords before
    /// committing to an [`EncryptionState`] (spec §4.7).
    pub fn authenticate_password(&self, password: &str) -> Result<()> {
        if self.trailer.get(b"Encrypt").is_err() {
            return Err(Error::Encryption(EncryptionError::NotEncrypted));
        }
        crate::encryption::verify_password(self, password).map(|_| ())
    }

    /// Sets up fresh Standard Security Handler state on this document (spec §4.7, §4.8 step 5):
    /// derives `/O`, `/U` (and, for R=6, `/OE`/`/UE`/`/Perms`), installs the `/Encrypt` dictionary
    /// as a direct indirect object, and records the resulting [`EncryptionState`] so a subsequent
    /// `save` encrypts every object on the way out.
    pub fn encrypt(
        &mut self, user_password: &str, owner_password: &str, permissions: i32, encrypt_metadata: bool, r: u8,
        key_len_bytes: usize,
    ) -> Result<()> {
        let existing_id0 = self
            .trailer
            .get(b"ID")
            .and_then(|o| o.as_array())
            .ok()
            .and_then(|arr| arr.first())
            .and_then(|o| o.as_str().ok())
            .map(|s| s.to_vec());

        let (id0, id1) = match existing_id0 {
            Some(id0) => (id0.clone(), id0),
            None => match self.config.id_source {
                IdSource::Fixed(first, second) => (first.to_vec(), second.to_vec()),
                IdSource::Random => {
                    let mut id = vec![0u8; 16];
                    crate::crypto::fill_random(&mut id);
                    (id.clone(), id)
                }
            },
        };
        self.trailer.set(
            "ID",
            Object::Array(vec![Object::string_literal(id0.clone()), Object::string_literal(id1)]),
        );

        let (file_key, encrypt_dict) =
            crate::encryption::set_up_encryption(user_password, owner_password, permissions, encrypt_metadata, r, key_len_bytes, &id0)?;

        // `set_up_encryption` only ever produces RC4-derived /O and /U for R in 2..=4, or an
        // AESV3 /CF for R=6 (spec §4.7) — the cipher choice follows the revision directly.
        let stm_method = if r == 6 {
            crate::encryption::CryptMethod::Aes256
        } else {
            crate::encryption::CryptMethod::Rc4
        };

        let encrypt_id = self.add_object(encrypt_dict);
        self.trailer.set("Encrypt", Object::Reference(encrypt_id));
        self.encryption_state = Some(EncryptionState {
            file_key,
            r,
            stm_method,
            str_method: stm_method,
            encrypt_metadata,
            strict_aes_padding: self.config.strict_aes_padding,
        });
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

/// Pairs a loaded document with the raw bytes it was parsed from, plus a snapshot of the
/// object map as it stood right after loading, so a later incremental save can diff against it
/// and emit only the objects that actually changed (spec §4.8 "Incremental writes").
#[derive(Debug, Clone)]
pub struct IncrementalDocument {
    pub original_bytes: Vec<u8>,
    pub document: Document,
    pub(crate) loaded_objects: BTreeMap<ObjectId, Object>,
}

impl IncrementalDocument {
    pub fn create_from(buffer: Vec<u8>, document: Document) -> Self {
        let loaded_objects = document.objects.clone();
        IncrementalDocument {
            original_bytes: buffer,
            document,
            loaded_objects,
        }
    }

    /// Object ids present at load time but absent now (spec §4.3 `delete`, physical removal).
    pub(crate) fn deleted_since_load(&self) -> Vec<ObjectId> {
        self.loaded_objects
            .keys()
            .filter(|id| !self.document.objects.contains_key(id))
            .copied()
            .collect()
    }

    /// Object ids that are new or whose value differs from the load-time snapshot.
    pub(crate) fn changed_since_load(&self) -> Vec<ObjectId> {
        self.document
            .objects
            .iter()
            .filter(|(id, obj)| self.loaded_objects.get(id) != Some(*obj))
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn add_object_assigns_increasing_generation_zero_ids() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        assert_eq!(a, (1, 0));
        assert_eq!(b, (2, 0));
    }

    #[test]
    fn delete_object_removes_from_live_map() {
        let mut doc = Document::new();
        let id = doc.add_object(Object::Integer(7));
        assert!(doc.object_exists(id));
        doc.delete_object(id);
        assert!(!doc.object_exists(id));
    }

    #[test]
    fn dereference_passes_through_direct_values() {
        let doc = Document::new();
        let direct = Object::Integer(42);
        let (id, resolved) = doc.dereference(&direct).unwrap();
        assert_eq!(id, (0, 0));
        assert_eq!(resolved.as_i64().unwrap(), 42);
    }

    #[test]
    fn incremental_document_tracks_changes_and_deletions() {
        let mut doc = Document::new();
        let kept = doc.add_object(Object::Integer(1));
        let removed = doc.add_object(Object::Integer(2));
        let mut inc = IncrementalDocument::create_from(Vec::new(), doc);

        inc.document.delete_object(removed);
        let added = inc.document.add_object(Object::Integer(3));
        inc.document.set_object(kept, Object::Integer(99));

        let mut changed = inc.changed_since_load();
        changed.sort();
        assert_eq!(changed, vec![kept, added]);
        assert_eq!(inc.deleted_since_load(), vec![removed]);
    }
}
