//! Per-document configuration (spec §9 "Global state": explicit fields on a struct passed
//! into every component constructor, rather than process-wide mutable toggles).

/// Where a document's `/ID` entries come from when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// Draw 16 random bytes per entry from the document's RNG (default).
    Random,
    /// Pin both `/ID` array entries — needed for reproducible golden-file tests (spec §9 Open
    /// Question "/ID generation").
    Fixed([u8; 16], [u8; 16]),
}

impl Default for IdSource {
    fn default() -> Self {
        IdSource::Random
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Decision for spec §9 Open Question "padding leniency": when `false` (default), a
    /// malformed PKCS#5 block is treated as unpadded rather than rejected, matching PDF
    /// writers observed in the wild. When `true`, malformed padding is an `IntegrityError`.
    pub strict_aes_padding: bool,
    pub id_source: IdSource,
    /// PDF version written into the header, e.g. `"1.7"`.
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strict_aes_padding: false,
            id_source: IdSource::Random,
            version: "1.7".to_string(),
        }
    }
}
