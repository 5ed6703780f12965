//! Union shapes as raw storage with typed member accessors.
//!
//! Only one member is meaningful per call. A round-trip check names the member
//! that was written (`diff_as`) instead of assuming one; `Shape::diff` compares
//! the raw storage, which is member-agnostic.

use super::{
    layout, Differ, FieldKind, FieldLayout, FieldMismatch, ImageReader, ImageWriter, Shape,
    ShapeLayout,
};
use crate::error::AbiError;

/// `union { int integer; float decimal; }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestUnion {
    pub raw: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestUnionMember {
    Integer,
    Decimal,
}

impl TestUnion {
    #[must_use]
    pub const fn from_integer(value: i32) -> Self {
        Self { raw: value as u32 }
    }

    #[must_use]
    pub fn from_decimal(value: f32) -> Self {
        Self {
            raw: value.to_bits(),
        }
    }

    #[must_use]
    pub const fn integer(self) -> i32 {
        self.raw as i32
    }

    #[must_use]
    pub fn decimal(self) -> f32 {
        f32::from_bits(self.raw)
    }

    /// Compare the member that was written.
    #[must_use]
    pub fn diff_as(&self, member: TestUnionMember, other: &Self) -> Vec<FieldMismatch> {
        let mut d = Differ::new();
        match member {
            TestUnionMember::Integer => d.field("integer", &self.integer(), &other.integer()),
            TestUnionMember::Decimal => d.float32("decimal", self.decimal(), other.decimal()),
        };
        d.finish()
    }
}

impl Shape for TestUnion {
    const LAYOUT: ShapeLayout = layout!(
        TestUnion,
        Union,
        [
            FieldLayout::scalar("integer", 0, 4, FieldKind::UnionMember),
            FieldLayout::scalar("decimal", 0, 4, FieldKind::UnionMember),
        ],
    );

    fn canonical() -> Self {
        Self::from_decimal(1.5)
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).u32(0, self.raw).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { raw: r.u32(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new().field("raw", &self.raw, &other.raw).finish()
    }
}

/// `union { unsigned parts[2]; unsigned long long whole; }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnionWithArray {
    pub raw: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionWithArrayMember {
    Parts,
    Whole,
}

impl UnionWithArray {
    #[must_use]
    pub fn from_parts(parts: [u32; 2]) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&parts[0].to_ne_bytes());
        bytes[4..].copy_from_slice(&parts[1].to_ne_bytes());
        Self {
            raw: u64::from_ne_bytes(bytes),
        }
    }

    #[must_use]
    pub const fn from_whole(whole: u64) -> Self {
        Self { raw: whole }
    }

    /// Array member in memory order.
    #[must_use]
    pub fn parts(self) -> [u32; 2] {
        let bytes = self.raw.to_ne_bytes();
        let mut lo = [0u8; 4];
        let mut hi = [0u8; 4];
        lo.copy_from_slice(&bytes[..4]);
        hi.copy_from_slice(&bytes[4..]);
        [u32::from_ne_bytes(lo), u32::from_ne_bytes(hi)]
    }

    #[must_use]
    pub const fn whole(self) -> u64 {
        self.raw
    }

    #[must_use]
    pub fn diff_as(&self, member: UnionWithArrayMember, other: &Self) -> Vec<FieldMismatch> {
        let mut d = Differ::new();
        match member {
            UnionWithArrayMember::Parts => d.field("parts", &self.parts(), &other.parts()),
            UnionWithArrayMember::Whole => d.field("whole", &self.whole(), &other.whole()),
        };
        d.finish()
    }
}

impl Shape for UnionWithArray {
    const LAYOUT: ShapeLayout = layout!(
        UnionWithArray,
        Union,
        [
            FieldLayout::array("parts", 0, 8, 2, FieldKind::UnionMember),
            FieldLayout::scalar("whole", 0, 8, FieldKind::UnionMember),
        ],
    );

    fn canonical() -> Self {
        Self::from_parts([0x0102_0304, 0x0506_0708])
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).u64(0, self.raw).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { raw: r.u64(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new().field("raw", &self.raw, &other.raw).finish()
    }
}
