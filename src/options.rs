//! Strict/lenient parse policy.
//!
//! Strict parsing checks every magic tag, reserved field and documented
//! count invariant as soon as the field is read. Lenient parsing skips
//! those checks; truncation and UTF-8 failures are never downgraded.

use crate::codec::ByteReader;
use crate::error::{MeshError, Result};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl ParseOptions {
    pub const fn strict() -> Self {
        Self { strict: true }
    }

    pub const fn lenient() -> Self {
        Self { strict: false }
    }

    /// Fails with a format violation when strict and `ok` is false.
    pub fn check(&self, field: &'static str, ok: bool, expected: impl Display, actual: impl Display) -> Result<()> {
        if self.strict && !ok {
            return Err(violation(field, expected, actual));
        }
        Ok(())
    }

    pub fn check_eq<T: PartialEq + Display>(&self, field: &'static str, expected: T, actual: T) -> Result<()> {
        let ok = expected == actual;
        self.check(field, ok, expected, actual)
    }

    /// Consumes a four byte tag, comparing it only in strict mode.
    pub fn expect_magic(&self, reader: &mut ByteReader<'_>, magic: &[u8; 4]) -> Result<()> {
        let found = reader.read_bytes("magic", magic.len())?;
        self.check(
            "magic",
            found == magic,
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(found),
        )
    }
}

pub(crate) fn violation(field: &'static str, expected: impl Display, actual: impl Display) -> MeshError {
    MeshError::FormatViolation {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
