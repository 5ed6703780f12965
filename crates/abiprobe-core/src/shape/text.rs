//! String-bearing shapes: fixed embedded buffers and owned string pointers.
//!
//! A small string lives in a fixed buffer inside the shape; a large string is
//! referenced by pointer and stays owned by the side that allocated it. The
//! core codec carries pointers as addresses only.

use std::ffi::c_char;

use super::{
    field, layout, Differ, FieldKind, FieldMismatch, ImageReader, ImageWriter, Shape, ShapeLayout,
};
use crate::error::AbiError;

/// Fixed-size, NUL-terminated byte buffer (`char[N]`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAnsi<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for FixedAnsi<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> FixedAnsi<N> {
    /// Copy at most `N - 1` bytes and terminate.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut buf = [0u8; N];
        let take = text.len().min(N.saturating_sub(1));
        buf[..take].copy_from_slice(&text.as_bytes()[..take]);
        Self(buf)
    }

    /// Bytes before the first NUL.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(N);
        &self.0[..end]
    }

    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

/// Fixed-size, NUL-terminated UTF-16 buffer (`char16_t[N]`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedUtf16<const N: usize>(pub [u16; N]);

impl<const N: usize> Default for FixedUtf16<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> FixedUtf16<N> {
    /// Copy at most `N - 1` code units and terminate.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut buf = [0u16; N];
        for (slot, unit) in buf
            .iter_mut()
            .take(N.saturating_sub(1))
            .zip(text.encode_utf16())
        {
            *slot = unit;
        }
        Self(buf)
    }

    #[must_use]
    pub fn as_units(&self) -> &[u16] {
        let end = self.0.iter().position(|u| *u == 0).unwrap_or(N);
        &self.0[..end]
    }

    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_units())
    }
}

const fn ascii_to_utf16<const N: usize>(text: &[u8]) -> [u16; N] {
    let mut out = [0u16; N];
    let mut i = 0;
    while i < text.len() && i < N {
        out[i] = text[i] as u16;
        i += 1;
    }
    out
}

/// Owned string referenced by the canonical `AsciiTest`.
pub static LARGE_ANSI: &std::ffi::CStr = c"A string too long for the embedded buffer";
/// Owned string referenced by the canonical `Utf16Test`, NUL-terminated.
pub static LARGE_UTF16: [u16; 42] = ascii_to_utf16(b"A string too long for the embedded buffer");

/// `struct { char small_string[10]; const char* large_string; }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsciiTest {
    pub small_string: FixedAnsi<10>,
    pub large_string: *const c_char,
}

impl AsciiTest {
    #[must_use]
    pub fn new(small: &str, large: *const c_char) -> Self {
        Self {
            small_string: FixedAnsi::new(small),
            large_string: large,
        }
    }
}

impl Shape for AsciiTest {
    const LAYOUT: ShapeLayout = layout!(
        AsciiTest,
        Struct,
        [
            field!(AsciiTest, small_string: [u8; 10], FieldKind::CharBuffer),
            field!(AsciiTest, large_string: *const c_char, FieldKind::StringPointer),
        ],
    );

    fn canonical() -> Self {
        Self::new("Small", LARGE_ANSI.as_ptr())
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .bytes(0, &self.small_string.0)
            .usize(
                std::mem::offset_of!(Self, large_string),
                self.large_string as usize,
            )
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        let mut small = [0u8; 10];
        small.copy_from_slice(r.slice(0, 10));
        Ok(Self {
            small_string: FixedAnsi(small),
            large_string: r.usize(std::mem::offset_of!(Self, large_string)) as *const c_char,
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .code_units(
                "small_string",
                self.small_string.as_bytes(),
                other.small_string.as_bytes(),
                |b| String::from_utf8_lossy(b).into_owned(),
            )
            .field(
                "large_string",
                &(self.large_string as usize),
                &(other.large_string as usize),
            )
            .finish()
    }
}

/// `struct { char16_t small_string[10]; const char16_t* large_string; }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf16Test {
    pub small_string: FixedUtf16<10>,
    pub large_string: *const u16,
}

impl Utf16Test {
    #[must_use]
    pub fn new(small: &str, large: *const u16) -> Self {
        Self {
            small_string: FixedUtf16::new(small),
            large_string: large,
        }
    }
}

impl Shape for Utf16Test {
    const LAYOUT: ShapeLayout = layout!(
        Utf16Test,
        Struct,
        [
            field!(Utf16Test, small_string: [u16; 10], FieldKind::CharBuffer),
            field!(Utf16Test, large_string: *const u16, FieldKind::StringPointer),
        ],
    );

    fn canonical() -> Self {
        Self::new("Small", LARGE_UTF16.as_ptr())
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = ImageWriter::new(&Self::LAYOUT);
        for (i, unit) in self.small_string.0.iter().enumerate() {
            w.u16(i * 2, *unit);
        }
        w.usize(
            std::mem::offset_of!(Self, large_string),
            self.large_string as usize,
        )
        .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        let small: [u16; 10] = std::array::from_fn(|i| r.u16(i * 2));
        Ok(Self {
            small_string: FixedUtf16(small),
            large_string: r.usize(std::mem::offset_of!(Self, large_string)) as *const u16,
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .code_units(
                "small_string",
                self.small_string.as_units(),
                other.small_string.as_units(),
                String::from_utf16_lossy,
            )
            .field(
                "large_string",
                &(self.large_string as usize),
                &(other.large_string as usize),
            )
            .finish()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedTest {
    pub ascii: AsciiTest,
    pub utf: Utf16Test,
}

impl Shape for NestedTest {
    const LAYOUT: ShapeLayout = layout!(
        NestedTest,
        Struct,
        [
            field!(NestedTest, ascii: AsciiTest, FieldKind::Nested("AsciiTest")),
            field!(NestedTest, utf: Utf16Test, FieldKind::Nested("Utf16Test")),
        ],
    );

    fn canonical() -> Self {
        Self {
            ascii: AsciiTest::canonical(),
            utf: Utf16Test::canonical(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .nested(0, &self.ascii)
            .nested(std::mem::offset_of!(Self, utf), &self.utf)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            ascii: r.nested(0)?,
            utf: r.nested(std::mem::offset_of!(Self, utf))?,
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .nested("ascii", &self.ascii, &other.ascii)
            .nested("utf", &self.utf, &other.utf)
            .finish()
    }
}
