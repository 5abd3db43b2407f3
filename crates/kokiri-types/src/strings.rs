use std::collections::HashMap;

use thiserror::Error;

use crate::packed::{Packed, StrDesc, MAX_STR_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StringsError {
    #[error("string of {len} bytes exceeds the {max}-byte limit")]
    TooLong { len: usize, max: usize },
    #[error("string heap is full")]
    HeapFull,
}

/// Interned string heap.
///
/// All strings live back to back in one buffer and are addressed by a
/// [`StrDesc`]. Interning the same text twice yields the same descriptor,
/// so string equality between packed values is plain bit equality.
#[derive(Debug, Clone, Default)]
pub struct Strings {
    heap: String,
    index: HashMap<String, StrDesc>,
}

impl Strings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Result<StrDesc, StringsError> {
        if let Some(&desc) = self.index.get(text) {
            return Ok(desc);
        }
        if text.len() > MAX_STR_LEN {
            return Err(StringsError::TooLong {
                len: text.len(),
                max: MAX_STR_LEN,
            });
        }
        let offset = u32::try_from(self.heap.len()).map_err(|_| StringsError::HeapFull)?;
        if u32::try_from(self.heap.len() + text.len()).is_err() {
            return Err(StringsError::HeapFull);
        }
        let desc = StrDesc {
            offset,
            len: text.len() as u16,
        };
        self.heap.push_str(text);
        self.index.insert(text.to_owned(), desc);
        Ok(desc)
    }

    /// Intern `text` and box the descriptor.
    pub fn pack(&mut self, text: &str) -> Result<Packed, StringsError> {
        self.intern(text).map(Packed::pack_str)
    }

    /// The text behind a descriptor produced by this heap.
    pub fn resolve(&self, desc: StrDesc) -> Option<&str> {
        let start = desc.offset as usize;
        self.heap.get(start..start + desc.len as usize)
    }

    /// Resolve a packed value, if it is a string.
    pub fn text_of(&self, value: Packed) -> Option<&str> {
        self.resolve(value.unpack_str()?)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut strings = Strings::new();
        let a = strings.intern("ohko").unwrap();
        let b = strings.intern("normal").unwrap();
        let c = strings.intern("ohko").unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.resolve(a), Some("ohko"));
        assert_eq!(strings.resolve(b), Some("normal"));
    }

    #[test]
    fn packed_strings_compare_by_bits() {
        let mut strings = Strings::new();
        let x = strings.pack("glitchless").unwrap();
        let y = strings.pack("glitchless").unwrap();
        assert_eq!(x, y);
        assert_eq!(strings.text_of(x), Some("glitchless"));
        assert_eq!(strings.text_of(Packed::TRUE), None);
    }

    #[test]
    fn empty_string_is_valid() {
        let mut strings = Strings::new();
        let d = strings.intern("").unwrap();
        assert_eq!(strings.resolve(d), Some(""));
    }

    #[test]
    fn overlong_string_rejected() {
        let mut strings = Strings::new();
        let long = "x".repeat(MAX_STR_LEN + 1);
        assert_eq!(
            strings.intern(&long),
            Err(StringsError::TooLong {
                len: MAX_STR_LEN + 1,
                max: MAX_STR_LEN
            })
        );
        assert!(strings.is_empty());
    }

    #[test]
    fn foreign_descriptor_does_not_resolve() {
        let strings = Strings::new();
        assert_eq!(strings.resolve(StrDesc { offset: 10, len: 3 }), None);
    }
}
