//! Cross-reference table: free/in-use/compressed entries, one per revision, merged
//! newest-wins across the `/Prev` chain (spec §3 "Xref entry" / §4.2).

use std::collections::BTreeMap;

use crate::error::{Result, XrefError};
use crate::object::Dictionary;

/// One slot in the cross-reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free: not in use. `next_free` is the oid of the next entry in the free-list cycle;
    /// `next_gen` is the generation the oid will carry if reused.
    Free { next_free: u32, next_gen: u16 },
    /// In use at a byte offset within the file.
    Normal { offset: u32, generation: u16 },
    /// Stored inside an object-stream container; generation is implicitly 0.
    Compressed { container: u32, index: u16 },
    /// A free entry with no well-formed link (e.g. malformed source xref); materializes as
    /// Null but is excluded from free-list-integrity checks.
    UnusableFree,
}

impl XrefEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. } | XrefEntry::UnusableFree)
    }
}

/// One revision's cross-reference table plus the `/Size` declared for it.
#[derive(Debug, Clone, Default)]
pub struct Xref {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub size: u32,
}

impl Xref {
    pub fn new(size: u32) -> Self {
        Xref {
            entries: BTreeMap::new(),
            size,
        }
    }

    pub fn get(&self, oid: u32) -> Option<&XrefEntry> {
        self.entries.get(&oid)
    }

    pub fn insert(&mut self, oid: u32, entry: XrefEntry) {
        self.entries.insert(oid, entry);
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// Merges an older revision's entries underneath this one: entries already present in
    /// `self` (the newer revision) win, matching the "first definition wins" rule the reader
    /// applies when walking `/Prev` chains (newest first, spec §4.3).
    pub fn merge(&mut self, older: Xref) {
        for (oid, entry) in older.entries {
            self.entries.entry(oid).or_insert(entry);
        }
        self.size = self.size.max(older.size);
    }

    /// Overwrites entries from a hybrid `/XRefStm` stream: those entries take priority over
    /// the classic table entries for the same revision (spec §4.2 "Hybrid").
    pub fn overlay(&mut self, hybrid: Xref) {
        for (oid, entry) in hybrid.entries {
            self.entries.insert(oid, entry);
        }
        self.size = self.size.max(hybrid.size);
    }

    /// Validates the free-list forms a single cycle rooted at oid 0 (spec §8 property 7).
    pub fn validate_free_list(&self) -> Result<()> {
        let mut current = 0u32;
        let mut visited = std::collections::HashSet::new();
        loop {
            if !visited.insert(current) {
                return Err(XrefError::Loop.into());
            }
            match self.entries.get(&current) {
                Some(XrefEntry::Free { next_free, .. }) => {
                    if *next_free == 0 {
                        break;
                    }
                    current = *next_free;
                }
                Some(XrefEntry::UnusableFree) | None if current == 0 => break,
                _ => return Err(XrefError::Loop.into()),
            }
        }
        Ok(())
    }
}

/// Field widths for an xref stream's `/W` array (spec §4.2 "Xref stream").
#[derive(Debug, Clone, Copy)]
pub struct XrefStreamWidths {
    pub type_field: usize,
    pub field2: usize,
    pub field3: usize,
}

impl XrefStreamWidths {
    pub fn entry_width(&self) -> usize {
        self.type_field + self.field2 + self.field3
    }

    pub fn from_array(widths: &[i64]) -> Result<Self> {
        if widths.len() != 3 {
            return Err(XrefError::StreamWidth.into());
        }
        Ok(XrefStreamWidths {
            type_field: widths[0] as usize,
            field2: widths[1] as usize,
            field3: widths[2] as usize,
        })
    }
}

/// Decodes one fixed-width entry from an xref stream body per spec §4.2: field 1 selects the
/// entry type (0=free,1=in-use,2=compressed; defaulting to 1 when `w1 == 0`); missing trailing
/// fields default to zero.
pub fn decode_stream_entry(raw: &[u8], widths: &XrefStreamWidths) -> XrefEntry {
    let mut pos = 0;
    let read_field = |raw: &[u8], pos: &mut usize, width: usize| -> u64 {
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 8) | raw[*pos] as u64;
            *pos += 1;
        }
        value
    };

    let field_type = if widths.type_field == 0 {
        1
    } else {
        read_field(raw, &mut pos, widths.type_field)
    };
    let field2 = read_field(raw, &mut pos, widths.field2);
    let field3 = read_field(raw, &mut pos, widths.field3);

    match field_type {
        0 => XrefEntry::Free {
            next_free: field2 as u32,
            next_gen: field3 as u16,
        },
        1 => XrefEntry::Normal {
            offset: field2 as u32,
            generation: field3 as u16,
        },
        2 => XrefEntry::Compressed {
            container: field2 as u32,
            index: field3 as u16,
        },
        _ => XrefEntry::UnusableFree,
    }
}

/// Encodes one fixed-width entry for writing an xref stream, mirroring [`decode_stream_entry`].
pub fn encode_stream_entry(entry: &XrefEntry, widths: &XrefStreamWidths, out: &mut Vec<u8>) {
    let write_field = |out: &mut Vec<u8>, value: u64, width: usize| {
        let bytes = value.to_be_bytes();
        out.extend_from_slice(&bytes[8 - width..]);
    };

    let (field_type, field2, field3) = match *entry {
        XrefEntry::Free { next_free, next_gen } => (0u64, next_free as u64, next_gen as u64),
        XrefEntry::Normal { offset, generation } => (1u64, offset as u64, generation as u64),
        XrefEntry::Compressed { container, index } => (2u64, container as u64, index as u64),
        XrefEntry::UnusableFree => (0u64, 0u64, 65535u64),
    };

    if widths.type_field > 0 {
        write_field(out, field_type, widths.type_field);
    }
    write_field(out, field2, widths.field2);
    write_field(out, field3, widths.field3);
}

/// `/Index` subsection layout: pairs of `(first_oid, count)`.
pub fn parse_index(dict: &Dictionary, xref_size: i64) -> Vec<(i64, i64)> {
    match dict.get(b"Index").and_then(|o| o.as_array().map(|a| a.to_vec())) {
        Ok(arr) => arr
            .chunks(2)
            .filter_map(|pair| match pair {
                [first, count] => Some((first.as_i64().ok()?, count.as_i64().ok()?)),
                _ => None,
            })
            .collect(),
        Err(_) => vec![(0, xref_size)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_newer_entry() {
        let mut newer = Xref::new(2);
        newer.insert(1, XrefEntry::Normal { offset: 100, generation: 0 });
        let mut older = Xref::new(2);
        older.insert(1, XrefEntry::Normal { offset: 10, generation: 0 });
        older.insert(0, XrefEntry::Free { next_free: 0, next_gen: 65535 });
        newer.merge(older);
        assert_eq!(newer.get(1), Some(&XrefEntry::Normal { offset: 100, generation: 0 }));
        assert_eq!(newer.get(0), Some(&XrefEntry::Free { next_free: 0, next_gen: 65535 }));
    }

    #[test]
    fn overlay_prefers_hybrid_entries() {
        let mut classic = Xref::new(2);
        classic.insert(1, XrefEntry::Normal { offset: 10, generation: 0 });
        let mut stream = Xref::new(2);
        stream.insert(1, XrefEntry::Normal { offset: 200, generation: 0 });
        classic.overlay(stream);
        assert_eq!(classic.get(1), Some(&XrefEntry::Normal { offset: 200, generation: 0 }));
    }

    #[test]
    fn stream_entry_round_trips() {
        let widths = XrefStreamWidths { type_field: 1, field2: 2, field3: 1 };
        let entry = XrefEntry::Compressed { container: 300, index: 5 };
        let mut buf = Vec::new();
        encode_stream_entry(&entry, &widths, &mut buf);
        assert_eq!(buf.len(), widths.entry_width());
        let decoded = decode_stream_entry(&buf, &widths);
        assert_eq!(decoded, entry);
    }

    #[test]
    fn free_list_single_cycle_validates() {
        let mut xref = Xref::new(3);
        xref.insert(0, XrefEntry::Free { next_free: 2, next_gen: 0 });
        xref.insert(2, XrefEntry::Free { next_free: 0, next_gen: 1 });
        xref.insert(1, XrefEntry::Normal { offset: 9, generation: 0 });
        xref.validate_free_list().unwrap();
    }

    #[test]
    fn free_list_loop_is_rejected() {
        let mut xref = Xref::new(3);
        xref.insert(0, XrefEntry::Free { next_free: 2, next_gen: 0 });
        xref.insert(2, XrefEntry::Free { next_free: 2, next_gen: 0 });
        assert!(xref.validate_free_list().is_err());
    }
}
