//! Canonical Shape Library.
//!
//! Every shape is a `#[repr(C)]` value type whose field order, sizes and
//! alignment match the native declaration exactly, including interior and
//! trailing padding. Each shape carries a [`ShapeLayout`] descriptor built
//! from `offset_of!`/`size_of`, a deterministic [`Shape::canonical`] instance,
//! and an explicit native byte image codec. The codec writes every field at
//! its declared offset with native endianness and zeroes padding, so
//! `decode(encode(s))` is lossless and the image can be compared against raw
//! memory on the other side of the boundary.
//!
//! Bit-fields and unions never rely on a host-language feature: bit-fields are
//! explicit masks on an integer storage unit and unions are raw storage with
//! typed accessors (see [`bitfield`] and [`union`]).

/// Build a [`FieldLayout`] from the `#[repr(C)]` definition.
macro_rules! field {
    ($shape:ty, $name:ident : [$elem:ty; $n:expr], $kind:expr) => {
        $crate::shape::FieldLayout::array(
            stringify!($name),
            ::core::mem::offset_of!($shape, $name),
            ::core::mem::size_of::<[$elem; $n]>(),
            $n,
            $kind,
        )
    };
    ($shape:ty, $name:ident : $ty:ty, $kind:expr) => {
        $crate::shape::FieldLayout::scalar(
            stringify!($name),
            ::core::mem::offset_of!($shape, $name),
            ::core::mem::size_of::<$ty>(),
            $kind,
        )
    };
}
pub(crate) use field;

/// Build a [`ShapeLayout`] whose size and alignment come from the type.
macro_rules! layout {
    ($shape:ident, $composite:ident, [$($field:expr),* $(,)?] $(,)?) => {
        $crate::shape::ShapeLayout {
            name: stringify!($shape),
            size: ::core::mem::size_of::<$shape>(),
            align: ::core::mem::align_of::<$shape>(),
            composite: $crate::shape::Composite::$composite,
            fields: &[$($field),*],
        }
    };
}
pub(crate) use layout;

pub mod bitfield;
pub mod plain;
pub mod text;
pub mod union;

use std::fmt;

use crate::error::AbiError;

/// Semantic type of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Signed,
    Unsigned,
    Float,
    /// Boolean carried in an integer of the field's size.
    Boolean,
    /// Pointer-sized integer.
    PointerSized,
    /// Embedded fixed-size character buffer (`size / count` bytes per unit).
    CharBuffer,
    /// Owned string pointer.
    StringPointer,
    /// Interface pointer.
    InterfacePointer,
    /// Nested shape.
    Nested(&'static str),
    /// Bit-field inside an integer storage unit at `offset`.
    BitField { bit_offset: u8, width: u8 },
    /// Union member overlaying the storage at `offset`.
    UnionMember,
}

/// Layout of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    /// Byte offset from the start of the shape.
    pub offset: usize,
    /// Total byte size (all elements for arrays; storage unit for bit-fields).
    pub size: usize,
    /// Element count (1 for scalars).
    pub count: usize,
    pub kind: FieldKind,
}

impl FieldLayout {
    #[must_use]
    pub const fn scalar(name: &'static str, offset: usize, size: usize, kind: FieldKind) -> Self {
        Self {
            name,
            offset,
            size,
            count: 1,
            kind,
        }
    }

    #[must_use]
    pub const fn array(
        name: &'static str,
        offset: usize,
        size: usize,
        count: usize,
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            offset,
            size,
            count,
            kind,
        }
    }

    #[must_use]
    pub const fn bits(name: &'static str, offset: usize, size: usize, bit_offset: u8, width: u8) -> Self {
        Self::scalar(name, offset, size, FieldKind::BitField { bit_offset, width })
    }

    /// One past the last byte this field occupies.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Whether the shape is a struct or a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    Struct,
    Union,
}

/// Complete layout descriptor of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeLayout {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub composite: Composite,
    pub fields: &'static [FieldLayout],
}

impl ShapeLayout {
    /// Bytes not covered by any field (interior plus trailing padding).
    #[must_use]
    pub fn padding_bytes(&self) -> usize {
        let mut covered = vec![false; self.size];
        for field in self.fields {
            for byte in covered.iter_mut().take(field.end()).skip(field.offset) {
                *byte = true;
            }
        }
        covered.iter().filter(|c| !**c).count()
    }

    /// Bytes after the last field up to `size`.
    #[must_use]
    pub fn trailing_padding(&self) -> usize {
        let end = self.fields.iter().map(FieldLayout::end).max().unwrap_or(0);
        self.size.saturating_sub(end)
    }

    /// Structural problems: fields out of declaration order, overlapping
    /// struct fields, fields past the end, or a size that is not a multiple of
    /// the alignment.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.align == 0 || !self.align.is_power_of_two() {
            problems.push(format!("alignment {} is not a power of two", self.align));
        } else if self.size % self.align != 0 {
            problems.push(format!(
                "size {} is not a multiple of alignment {}",
                self.size, self.align
            ));
        }
        let mut prev_end = 0usize;
        let mut prev_offset = 0usize;
        for field in self.fields {
            if field.end() > self.size {
                problems.push(format!("{} ends past the shape", field.name));
            }
            match (self.composite, field.kind) {
                (Composite::Union, _) => {
                    if field.offset != 0 {
                        problems.push(format!("union member {} not at offset 0", field.name));
                    }
                }
                (Composite::Struct, FieldKind::BitField { .. }) => {
                    // Adjacent bit-fields share their storage unit.
                    if field.offset < prev_offset {
                        problems.push(format!("{} declared out of order", field.name));
                    }
                    prev_offset = field.offset;
                    prev_end = prev_end.max(field.end());
                }
                (Composite::Struct, _) => {
                    if field.offset < prev_end {
                        problems.push(format!("{} overlaps the previous field", field.name));
                    }
                    prev_offset = field.offset;
                    prev_end = field.end();
                }
            }
        }
        problems.extend(bitfield::packing_problems(self));
        problems
    }
}

/// One field that differs between two instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Accumulates field mismatches.
#[derive(Debug, Default)]
pub struct Differ {
    prefix: String,
    mismatches: Vec<FieldMismatch>,
}

impl Differ {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare two values by `PartialEq`.
    pub fn field<T: PartialEq + fmt::Debug>(&mut self, name: &str, expected: &T, actual: &T) -> &mut Self {
        if expected != actual {
            self.push(name, format!("{expected:?}"), format!("{actual:?}"));
        }
        self
    }

    /// Compare floats by bit pattern (NaN payloads and signed zero included).
    pub fn float64(&mut self, name: &str, expected: f64, actual: f64) -> &mut Self {
        if expected.to_bits() != actual.to_bits() {
            self.push(name, format!("{expected:?}"), format!("{actual:?}"));
        }
        self
    }

    pub fn float32(&mut self, name: &str, expected: f32, actual: f32) -> &mut Self {
        if expected.to_bits() != actual.to_bits() {
            self.push(name, format!("{expected:?}"), format!("{actual:?}"));
        }
        self
    }

    /// Compare text by its raw code units. A mismatch shows the lossy
    /// rendering followed by the units in hex.
    pub fn code_units<T: PartialEq + fmt::Debug>(
        &mut self,
        name: &str,
        expected: &[T],
        actual: &[T],
        lossy: impl Fn(&[T]) -> String,
    ) -> &mut Self {
        if expected != actual {
            self.push(
                name,
                format!("{:?} {expected:02x?}", lossy(expected)),
                format!("{:?} {actual:02x?}", lossy(actual)),
            );
        }
        self
    }

    /// Compare a nested shape, prefixing its field names.
    pub fn nested<S: Shape>(&mut self, name: &str, expected: &S, actual: &S) -> &mut Self {
        for mismatch in expected.diff(actual) {
            self.push(
                &format!("{name}.{}", mismatch.field),
                mismatch.expected,
                mismatch.actual,
            );
        }
        self
    }

    fn push(&mut self, name: &str, expected: String, actual: String) {
        let field = if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        };
        self.mismatches.push(FieldMismatch {
            field,
            expected,
            actual,
        });
    }

    #[must_use]
    pub fn finish(&mut self) -> Vec<FieldMismatch> {
        std::mem::take(&mut self.mismatches)
    }
}

/// A layout-significant native value type.
pub trait Shape: Copy + Sized {
    /// Layout descriptor matching the `#[repr(C)]` definition.
    const LAYOUT: ShapeLayout;

    /// Deterministic, fully-initialized instance.
    fn canonical() -> Self;

    /// Native byte image (padding zeroed).
    fn encode(&self) -> Vec<u8>;

    /// Rebuild from a native byte image of exactly `LAYOUT.size` bytes.
    fn decode(bytes: &[u8]) -> Result<Self, AbiError>;

    /// Field-by-field comparison; empty when equal.
    fn diff(&self, other: &Self) -> Vec<FieldMismatch>;

    fn round_trip_eq(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

/// Writes fields into a zeroed native image.
#[derive(Debug)]
pub struct ImageWriter {
    buf: Vec<u8>,
}

impl ImageWriter {
    #[must_use]
    pub fn new(layout: &ShapeLayout) -> Self {
        Self {
            buf: vec![0; layout.size],
        }
    }

    pub fn bytes(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, offset: usize, v: u8) -> &mut Self {
        self.bytes(offset, &[v])
    }

    pub fn u16(&mut self, offset: usize, v: u16) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn i32(&mut self, offset: usize, v: i32) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn u32(&mut self, offset: usize, v: u32) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn i64(&mut self, offset: usize, v: i64) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn u64(&mut self, offset: usize, v: u64) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn f32(&mut self, offset: usize, v: f32) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn f64(&mut self, offset: usize, v: f64) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn isize(&mut self, offset: usize, v: isize) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn usize(&mut self, offset: usize, v: usize) -> &mut Self {
        self.bytes(offset, &v.to_ne_bytes())
    }

    pub fn i32s(&mut self, offset: usize, vs: &[i32]) -> &mut Self {
        for (i, v) in vs.iter().enumerate() {
            self.i32(offset + i * 4, *v);
        }
        self
    }

    pub fn i64s(&mut self, offset: usize, vs: &[i64]) -> &mut Self {
        for (i, v) in vs.iter().enumerate() {
            self.i64(offset + i * 8, *v);
        }
        self
    }

    /// Embed a nested shape's image.
    pub fn nested<S: Shape>(&mut self, offset: usize, value: &S) -> &mut Self {
        let image = value.encode();
        self.bytes(offset, &image)
    }

    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Reads fields from a native image whose length was checked up front.
#[derive(Debug, Clone, Copy)]
pub struct ImageReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ImageReader<'a> {
    /// Accept an image of exactly `layout.size` bytes.
    pub fn new(layout: &ShapeLayout, bytes: &'a [u8]) -> Result<Self, AbiError> {
        if bytes.len() != layout.size {
            return Err(AbiError::Layout {
                shape: layout.name,
                detail: format!("image is {} bytes, expected {}", bytes.len(), layout.size),
            });
        }
        Ok(Self { bytes })
    }

    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[offset..offset + N]);
        out
    }

    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> &'a [u8] {
        &self.bytes[offset..offset + len]
    }

    #[must_use]
    pub fn u8(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    #[must_use]
    pub fn u16(&self, offset: usize) -> u16 {
        u16::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn i32(&self, offset: usize) -> i32 {
        i32::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn u32(&self, offset: usize) -> u32 {
        u32::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn i64(&self, offset: usize) -> i64 {
        i64::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn u64(&self, offset: usize) -> u64 {
        u64::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn f32(&self, offset: usize) -> f32 {
        f32::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn f64(&self, offset: usize) -> f64 {
        f64::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn isize(&self, offset: usize) -> isize {
        isize::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn usize(&self, offset: usize) -> usize {
        usize::from_ne_bytes(self.array(offset))
    }

    #[must_use]
    pub fn i32s<const N: usize>(&self, offset: usize) -> [i32; N] {
        std::array::from_fn(|i| self.i32(offset + i * 4))
    }

    #[must_use]
    pub fn i64s<const N: usize>(&self, offset: usize) -> [i64; N] {
        std::array::from_fn(|i| self.i64(offset + i * 8))
    }

    /// Decode a nested shape at `offset`.
    pub fn nested<S: Shape>(&self, offset: usize) -> Result<S, AbiError> {
        S::decode(self.slice(offset, S::LAYOUT.size))
    }
}

/// Layout descriptors of every shape defined in this crate.
#[must_use]
pub fn all_layouts() -> Vec<ShapeLayout> {
    use plain::*;
    vec![
        SimpleStruct::LAYOUT,
        SimplePair::LAYOUT,
        IntToBoolArray::LAYOUT,
        StructWithMarshal::LAYOUT,
        StructWithStaticMarshal::LAYOUT,
        LargeStruct::LAYOUT,
        PointerSize::LAYOUT,
        StructAsClass::LAYOUT,
        StructAsClassWrapper::LAYOUT,
        StructWithArray::LAYOUT,
        MyValue::LAYOUT,
        TaggedWide::LAYOUT,
        LargeStructWithMarshalling::LAYOUT,
        CallbackLargeStruct::LAYOUT,
        BoolToInt::LAYOUT,
        BoolArray::LAYOUT,
        PointerSizeMember::LAYOUT,
        StructSizeRelation::LAYOUT,
        ReservedRelation::LAYOUT,
        crate::capability::Guid::LAYOUT,
        union::TestUnion::LAYOUT,
        union::UnionWithArray::LAYOUT,
        bitfield::BitField::LAYOUT,
        bitfield::BitField2::LAYOUT,
        text::AsciiTest::LAYOUT,
        text::Utf16Test::LAYOUT,
        text::NestedTest::LAYOUT,
    ]
}
