//! The `/P` permission bits (spec §6 "Permission bits"): named flags over the bare `i32` that
//! [`crate::document::Document::encrypt`] and the Standard Security Handler pass around.

use bitflags::bitflags;

bitflags! {
    /// User-access permission bits as they sit in `/P` (ISO 32000-1 Table 22). Bit numbering is
    /// 1-based in the spec; the constants below hold the already-shifted bit values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: i32 {
        /// Bit 3 — print the document (possibly in low-resolution if `PRINT_HIGH_RES` is unset).
        const PRINT = 1 << 2;
        /// Bit 4 — modify the document's contents by means other than those controlled by
        /// `ANNOTATE`, `FILL_FORMS` and `ASSEMBLE`.
        const MODIFY = 1 << 3;
        /// Bit 5 — copy or otherwise extract text and graphics.
        const COPY = 1 << 4;
        /// Bit 6 — add or modify text annotations and fill in interactive form fields.
        const ANNOTATE = 1 << 5;
        /// Bit 9 — fill in existing interactive form fields, even if `ANNOTATE` is unset.
        const FILL_FORMS = 1 << 8;
        /// Bit 10 — extract text and graphics for accessibility (screen readers).
        const EXTRACT_ACCESSIBILITY = 1 << 9;
        /// Bit 11 — assemble the document: insert, rotate, delete pages, create bookmarks.
        const ASSEMBLE = 1 << 10;
        /// Bit 12 — print at full fidelity rather than the degraded form `PRINT` alone allows.
        const PRINT_HIGH_RES = 1 << 11;
    }
}

/// Bits 1, 2, 7 and 8 and every bit above 12 are reserved and must be 1 (ISO 32000-1 7.6.3.2).
const RESERVED_ONE_BITS: i32 = !0xFFF | 0xC3;

impl Permissions {
    /// The `/P` integer to write into the `/Encrypt` dictionary: the granted flags with every
    /// reserved bit forced to 1, which is also why `/P` is always negative as a signed 32-bit
    /// value.
    pub fn to_p_value(self) -> i32 {
        self.bits() | RESERVED_ONE_BITS
    }

    /// Recovers the granted flags from a `/P` value read back from a document, ignoring the
    /// reserved bits.
    pub fn from_p_value(p: i32) -> Self {
        Permissions::from_bits_truncate(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_p_value_sets_reserved_bits() {
        let p = Permissions::PRINT.to_p_value();
        assert_eq!(p & 0xC3, 0xC3);
        assert!(p < 0);
    }

    #[test]
    fn round_trips_through_p_value() {
        let granted = Permissions::PRINT | Permissions::COPY | Permissions::ASSEMBLE;
        let recovered = Permissions::from_p_value(granted.to_p_value());
        assert_eq!(recovered, granted);
    }
}
