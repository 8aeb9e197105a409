use super::{Filter, Producer};
use crate::error::Result;

/// `/Crypt`: a pass-through filter entry. Per-object decryption happens as a separate pass
/// driven by the security handler (spec §4.4/§4.7), not inside the filter chain itself — a
/// stream carrying an explicit `Crypt` filter entry is simply skipped here.
pub struct CryptFilter;

impl Filter for CryptFilter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        Ok(source)
    }

    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        Ok(source)
    }
}
