//! Bit-field shapes as explicit masks over a `u32` storage unit.
//!
//! Adjacent same-type bit-fields pack from the least-significant bit of the
//! storage unit in declaration order with no gaps. This is the rule GCC,
//! Clang and MSVC document for little-endian targets; `packing_problems`
//! checks each descriptor against it.

use super::{
    layout, Composite, Differ, FieldKind, FieldLayout, FieldMismatch, ImageReader, ImageWriter,
    Shape, ShapeLayout,
};
use crate::error::AbiError;

#[must_use]
const fn mask(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Extract `width` bits starting at `offset`.
#[must_use]
pub const fn get_bits(storage: u32, offset: u8, width: u8) -> u32 {
    (storage >> offset) & mask(width)
}

/// Replace `width` bits at `offset`; bits of `value` above `width` are dropped
/// so they never bleed into a neighbour.
#[must_use]
pub const fn set_bits(storage: u32, offset: u8, width: u8, value: u32) -> u32 {
    let m = mask(width) << offset;
    (storage & !m) | ((value << offset) & m)
}

/// Packing violations for the bit-fields of one storage unit.
#[must_use]
pub fn packing_problems(layout: &ShapeLayout) -> Vec<String> {
    let mut problems = Vec::new();
    if layout.composite != Composite::Struct {
        return problems;
    }
    let mut current: Option<(usize, u32)> = None;
    for field in layout.fields {
        let FieldKind::BitField { bit_offset, width } = field.kind else {
            current = None;
            continue;
        };
        let unit_bits = (field.size * 8) as u32;
        if u32::from(bit_offset) + u32::from(width) > unit_bits {
            problems.push(format!("{} overflows its storage unit", field.name));
        }
        let expected = match current {
            Some((offset, next_bit)) if offset == field.offset => next_bit,
            _ => 0,
        };
        if u32::from(bit_offset) != expected {
            problems.push(format!(
                "{} packed at bit {bit_offset}, expected bit {expected}",
                field.name
            ));
        }
        current = Some((field.offset, u32::from(bit_offset) + u32::from(width)));
    }
    problems
}

/// `struct { unsigned first_bit : 1; unsigned last_bits : 31; }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitField {
    pub raw: u32,
}

impl BitField {
    const FIRST_BIT: (u8, u8) = (0, 1);
    const LAST_BITS: (u8, u8) = (1, 31);

    #[must_use]
    pub const fn new(first_bit: u32, last_bits: u32) -> Self {
        let raw = set_bits(0, Self::FIRST_BIT.0, Self::FIRST_BIT.1, first_bit);
        Self {
            raw: set_bits(raw, Self::LAST_BITS.0, Self::LAST_BITS.1, last_bits),
        }
    }

    #[must_use]
    pub const fn first_bit(self) -> u32 {
        get_bits(self.raw, Self::FIRST_BIT.0, Self::FIRST_BIT.1)
    }

    pub fn set_first_bit(&mut self, value: u32) {
        self.raw = set_bits(self.raw, Self::FIRST_BIT.0, Self::FIRST_BIT.1, value);
    }

    #[must_use]
    pub const fn last_bits(self) -> u32 {
        get_bits(self.raw, Self::LAST_BITS.0, Self::LAST_BITS.1)
    }

    pub fn set_last_bits(&mut self, value: u32) {
        self.raw = set_bits(self.raw, Self::LAST_BITS.0, Self::LAST_BITS.1, value);
    }
}

impl Shape for BitField {
    const LAYOUT: ShapeLayout = layout!(
        BitField,
        Struct,
        [
            FieldLayout::bits("first_bit", 0, 4, 0, 1),
            FieldLayout::bits("last_bits", 0, 4, 1, 31),
        ],
    );

    fn canonical() -> Self {
        Self::new(1, 1234)
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).u32(0, self.raw).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { raw: r.u32(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("first_bit", &self.first_bit(), &other.first_bit())
            .field("last_bits", &self.last_bits(), &other.last_bits())
            .finish()
    }
}

/// `struct { unsigned lower_bits : 8; unsigned reserved_bits : 8; unsigned upper_bits : 16; }`
///
/// `reserved_bits` carries a sentinel that must survive every crossing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitField2 {
    pub raw: u32,
}

impl BitField2 {
    pub const RESERVED_SENTINEL: u32 = 20;

    const LOWER: (u8, u8) = (0, 8);
    const RESERVED: (u8, u8) = (8, 8);
    const UPPER: (u8, u8) = (16, 16);

    #[must_use]
    pub const fn new(lower_bits: u32, reserved_bits: u32, upper_bits: u32) -> Self {
        let raw = set_bits(0, Self::LOWER.0, Self::LOWER.1, lower_bits);
        let raw = set_bits(raw, Self::RESERVED.0, Self::RESERVED.1, reserved_bits);
        Self {
            raw: set_bits(raw, Self::UPPER.0, Self::UPPER.1, upper_bits),
        }
    }

    #[must_use]
    pub const fn lower_bits(self) -> u32 {
        get_bits(self.raw, Self::LOWER.0, Self::LOWER.1)
    }

    pub fn set_lower_bits(&mut self, value: u32) {
        self.raw = set_bits(self.raw, Self::LOWER.0, Self::LOWER.1, value);
    }

    #[must_use]
    pub const fn reserved_bits(self) -> u32 {
        get_bits(self.raw, Self::RESERVED.0, Self::RESERVED.1)
    }

    pub fn set_reserved_bits(&mut self, value: u32) {
        self.raw = set_bits(self.raw, Self::RESERVED.0, Self::RESERVED.1, value);
    }

    #[must_use]
    pub const fn upper_bits(self) -> u32 {
        get_bits(self.raw, Self::UPPER.0, Self::UPPER.1)
    }

    pub fn set_upper_bits(&mut self, value: u32) {
        self.raw = set_bits(self.raw, Self::UPPER.0, Self::UPPER.1, value);
    }

    #[must_use]
    pub const fn is_reserved_intact(self) -> bool {
        self.reserved_bits() == Self::RESERVED_SENTINEL
    }
}

impl Shape for BitField2 {
    const LAYOUT: ShapeLayout = layout!(
        BitField2,
        Struct,
        [
            FieldLayout::bits("lower_bits", 0, 4, 0, 8),
            FieldLayout::bits("reserved_bits", 0, 4, 8, 8),
            FieldLayout::bits("upper_bits", 0, 4, 16, 16),
        ],
    );

    fn canonical() -> Self {
        Self::new(0xAB, Self::RESERVED_SENTINEL, 0xBEEF)
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).u32(0, self.raw).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { raw: r.u32(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("lower_bits", &self.lower_bits(), &other.lower_bits())
            .field("reserved_bits", &self.reserved_bits(), &other.reserved_bits())
            .field("upper_bits", &self.upper_bits(), &other.upper_bits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_lsb_first_in_declaration_order() {
        let b = BitField::new(1, 0);
        assert_eq!(b.raw, 1);
        let b = BitField::new(0, 1);
        assert_eq!(b.raw, 2);
        let b2 = BitField2::new(0x01, 0x02, 0x0003);
        assert_eq!(b2.raw, 0x0003_0201);
    }

    #[test]
    fn oversized_writes_do_not_bleed() {
        let mut b = BitField::new(0, 0x7FFF_FFFF);
        b.set_first_bit(0xFF);
        assert_eq!(b.first_bit(), 1);
        assert_eq!(b.last_bits(), 0x7FFF_FFFF);

        let mut b2 = BitField2::canonical();
        b2.set_lower_bits(0x1FF);
        assert_eq!(b2.lower_bits(), 0xFF);
        assert_eq!(b2.reserved_bits(), BitField2::RESERVED_SENTINEL);
        assert_eq!(b2.upper_bits(), 0xBEEF);
    }

    #[test]
    fn accessors_round_trip() {
        let b = BitField::canonical();
        assert_eq!(b.first_bit(), 1);
        assert_eq!(b.last_bits(), 1234);
        let back = BitField::decode(&b.encode()).unwrap();
        assert!(b.round_trip_eq(&back));

        let b2 = BitField2::canonical();
        assert!(b2.is_reserved_intact());
        let back = BitField2::decode(&b2.encode()).unwrap();
        assert!(b2.round_trip_eq(&back));
    }

    #[test]
    fn diff_names_the_bit_field() {
        let a = BitField2::canonical();
        let mut b = a;
        b.set_reserved_bits(21);
        let diff = a.diff(&b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].field, "reserved_bits");
        assert!(!b.is_reserved_intact());
    }

    #[test]
    fn field_extremes_round_trip_and_diff_singly() {
        for (first, last) in [(0, 0), (1, 0x7FFF_FFFF), (0, 0x7FFF_FFFF), (1, 0)] {
            let b = BitField::new(first, last);
            let back = BitField::decode(&b.encode()).unwrap();
            assert!(b.round_trip_eq(&back));
            assert_eq!((back.first_bit(), back.last_bits()), (first, last));
        }
        let b2 = BitField2::new(0xFF, 0xFF, 0xFFFF);
        assert_eq!(b2.raw, u32::MAX);
        assert!(b2.round_trip_eq(&BitField2::decode(&b2.encode()).unwrap()));

        let a = BitField::new(0, 0x7FFF_FFFF);
        let mut b = a;
        b.set_first_bit(1);
        let diff = a.diff(&b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].field, "first_bit");
        b = a;
        b.set_last_bits(0x7FFF_FFFE);
        assert_eq!(a.diff(&b)[0].field, "last_bits");
        assert_eq!(a.diff(&b).len(), 1);

        let a = BitField2::canonical();
        for (field, changed) in [
            ("lower_bits", BitField2::new(0xAC, BitField2::RESERVED_SENTINEL, 0xBEEF)),
            ("upper_bits", BitField2::new(0xAB, BitField2::RESERVED_SENTINEL, 0xBEEE)),
        ] {
            let diff = a.diff(&changed);
            assert_eq!(diff.len(), 1);
            assert_eq!(diff[0].field, field);
        }
    }

    #[test]
    fn descriptors_pack_without_gaps() {
        assert!(packing_problems(&BitField::LAYOUT).is_empty());
        assert!(packing_problems(&BitField2::LAYOUT).is_empty());
        assert_eq!(BitField::LAYOUT.size, 4);
        assert_eq!(BitField2::LAYOUT.align, 4);
    }

    #[test]
    fn gapped_descriptor_is_reported() {
        const GAPPED: ShapeLayout = ShapeLayout {
            name: "Gapped",
            size: 4,
            align: 4,
            composite: Composite::Struct,
            fields: &[
                FieldLayout::bits("a", 0, 4, 0, 3),
                FieldLayout::bits("b", 0, 4, 4, 4),
            ],
        };
        let problems = packing_problems(&GAPPED);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("expected bit 3"));
    }
}
