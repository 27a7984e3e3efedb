//! Validation of the WebAssembly modules backing lenses.

use crate::Error;

/// The first four bytes of every WebAssembly binary.
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

/// Checks that the given bytes start with the WebAssembly magic number.
///
/// Only the header is inspected; the rest of the module is not parsed.
pub fn validate_module<B: AsRef<[u8]>>(bytes: B) -> Result<(), Error> {
    let bytes = bytes.as_ref();
    match bytes.get(..WASM_MAGIC.len()) {
        None => Err(Error::InvalidModule(format!(
            "expected at least {} bytes, got {}",
            WASM_MAGIC.len(),
            bytes.len()
        ))),
        Some(header) if header != WASM_MAGIC => Err(Error::InvalidModule(format!(
            "unexpected header {:02x?}",
            header
        ))),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_minimal_module_header() {
        validate_module([0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]).unwrap();
    }

    #[test]
    fn rejects_short_or_foreign_input() {
        assert!(matches!(validate_module(b"\0as"), Err(Error::InvalidModule(_))));
        assert!(matches!(validate_module(b"\x7fELF...."), Err(Error::InvalidModule(_))));
        assert!(matches!(validate_module(b""), Err(Error::InvalidModule(_))));
    }
}
