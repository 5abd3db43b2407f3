//! NaN-boxed 64-bit values.
//!
//! A [`Packed`] is either a plain `f64` or a quiet-NaN pattern whose payload
//! carries a tagged 32-bit value. The VM stack and every constant pool are
//! flat arrays of these, so evaluating a rule never allocates per scalar.
//!
//! Layout of a boxed value:
//!
//! ```text
//!  63      48 47  44 43        32 31                 0
//! [ 0x7FFC  ][ tag ][ str length ][      payload      ]
//! ```
//!
//! Any bit pattern that does not carry the `0x7FFC` box header is a float.
//! Tags are compared by equality on the whole nibble, so no two tags can
//! both match one pattern.

use serde::{Deserialize, Serialize};
use std::fmt;

const BOX: u64 = 0x7FFC_0000_0000_0000;
const TAG_SHIFT: u32 = 44;
const TAG_MASK: u64 = 0xF << TAG_SHIFT;
const HEADER_MASK: u64 = BOX | TAG_MASK;
const LEN_SHIFT: u32 = 32;
const LEN_MASK: u64 = 0xFFF << LEN_SHIFT;
const LOW_MASK: u64 = 0xFFFF_FFFF;

/// Longest string a [`StrDesc`] can describe.
pub const MAX_STR_LEN: usize = 0xFFF;

/// The type carried by a [`Packed`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    F64,
    Bool,
    Ptr32,
    Str32,
    U32,
    I32,
}

impl Tag {
    /// Header nibble for boxed tags; `None` for plain floats.
    const fn code(self) -> Option<u64> {
        match self {
            Tag::F64 => None,
            Tag::Bool => Some(0xB),
            Tag::Ptr32 => Some(0xC),
            Tag::Str32 => Some(0xD),
            Tag::U32 => Some(0xE),
            Tag::I32 => Some(0xF),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Tag::F64 | Tag::U32 | Tag::I32)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::F64 => "f64",
            Tag::Bool => "bool",
            Tag::Ptr32 => "ptr32",
            Tag::Str32 => "str32",
            Tag::U32 => "u32",
            Tag::I32 => "i32",
        };
        f.write_str(name)
    }
}

/// Location of a string inside a [`crate::Strings`] heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrDesc {
    pub offset: u32,
    /// At most [`MAX_STR_LEN`].
    pub len: u16,
}

/// A tagged 64-bit value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Packed(u64);

impl Packed {
    pub const TRUE: Packed = Packed::pack_bool(true);
    pub const FALSE: Packed = Packed::pack_bool(false);

    pub const fn from_bits(bits: u64) -> Self {
        Packed(bits)
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    const fn boxed(tag: Tag, payload: u64) -> Self {
        let code = match tag.code() {
            Some(code) => code,
            None => 0,
        };
        Packed(BOX | (code << TAG_SHIFT) | payload)
    }

    // ── Packing ──────────────────────────────────────────────────

    /// Pack a float. Every NaN is folded onto the canonical quiet NaN,
    /// which sits outside the box header.
    pub fn pack_f64(value: f64) -> Self {
        if value.is_nan() {
            Packed(f64::NAN.to_bits())
        } else {
            Packed(value.to_bits())
        }
    }

    pub const fn pack_bool(value: bool) -> Self {
        Self::boxed(Tag::Bool, value as u64)
    }

    pub const fn pack_ptr32(value: u32) -> Self {
        Self::boxed(Tag::Ptr32, value as u64)
    }

    pub const fn pack_u32(value: u32) -> Self {
        Self::boxed(Tag::U32, value as u64)
    }

    pub const fn pack_i32(value: i32) -> Self {
        Self::boxed(Tag::I32, value as u32 as u64)
    }

    pub const fn pack_str(desc: StrDesc) -> Self {
        let len = (desc.len as u64 & 0xFFF) << LEN_SHIFT;
        Self::boxed(Tag::Str32, len | desc.offset as u64)
    }

    // ── Classification ───────────────────────────────────────────

    /// Tag test. The float check comes first since every boxed value is
    /// itself a NaN.
    pub fn is(self, tag: Tag) -> bool {
        let is_float = self.0 & BOX != BOX;
        match tag.code() {
            None => is_float,
            Some(code) => !is_float && self.0 & HEADER_MASK == BOX | (code << TAG_SHIFT),
        }
    }

    /// The tag of this value, or `None` for a boxed pattern with an
    /// unassigned tag nibble (only reachable through [`Packed::from_bits`]).
    pub fn tag(self) -> Option<Tag> {
        [
            Tag::F64,
            Tag::Bool,
            Tag::Ptr32,
            Tag::Str32,
            Tag::U32,
            Tag::I32,
        ]
        .into_iter()
        .find(|&tag| self.is(tag))
    }

    // ── Unpacking ────────────────────────────────────────────────

    pub fn unpack_f64(self) -> Option<f64> {
        self.is(Tag::F64).then(|| f64::from_bits(self.0))
    }

    pub fn unpack_bool(self) -> Option<bool> {
        self.is(Tag::Bool).then(|| self.0 & 1 == 1)
    }

    pub fn unpack_ptr32(self) -> Option<u32> {
        self.is(Tag::Ptr32).then(|| (self.0 & LOW_MASK) as u32)
    }

    pub fn unpack_u32(self) -> Option<u32> {
        self.is(Tag::U32).then(|| (self.0 & LOW_MASK) as u32)
    }

    pub fn unpack_i32(self) -> Option<i32> {
        self.is(Tag::I32).then(|| (self.0 & LOW_MASK) as u32 as i32)
    }

    pub fn unpack_str(self) -> Option<StrDesc> {
        self.is(Tag::Str32).then(|| StrDesc {
            offset: (self.0 & LOW_MASK) as u32,
            len: ((self.0 & LEN_MASK) >> LEN_SHIFT) as u16,
        })
    }

    /// Numeric view across the three number tags.
    pub fn as_number(self) -> Option<f64> {
        match self.tag()? {
            Tag::F64 => self.unpack_f64(),
            Tag::U32 => self.unpack_u32().map(f64::from),
            Tag::I32 => self.unpack_i32().map(f64::from),
            _ => None,
        }
    }
}

impl From<bool> for Packed {
    fn from(value: bool) -> Self {
        Packed::pack_bool(value)
    }
}

impl From<f64> for Packed {
    fn from(value: f64) -> Self {
        Packed::pack_f64(value)
    }
}

impl From<u32> for Packed {
    fn from(value: u32) -> Self {
        Packed::pack_u32(value)
    }
}

impl From<i32> for Packed {
    fn from(value: i32) -> Self {
        Packed::pack_i32(value)
    }
}

impl fmt::Debug for Packed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(Tag::F64) => write!(f, "F64({})", f64::from_bits(self.0)),
            Some(Tag::Bool) => write!(f, "Bool({})", self.0 & 1 == 1),
            Some(Tag::Ptr32) => write!(f, "Ptr32({:#x})", self.0 & LOW_MASK),
            Some(Tag::U32) => write!(f, "U32({})", self.0 & LOW_MASK),
            Some(Tag::I32) => write!(f, "I32({})", (self.0 & LOW_MASK) as u32 as i32),
            Some(Tag::Str32) => {
                let len = (self.0 & LEN_MASK) >> LEN_SHIFT;
                write!(f, "Str32(@{}+{})", self.0 & LOW_MASK, len)
            }
            None => write!(f, "Packed({:#018x})", self.0),
        }
    }
}
