//! Plain and nested struct shapes.

use super::{
    field, layout, Differ, FieldKind, FieldMismatch, ImageReader, ImageWriter, Shape, ShapeLayout,
};
use crate::capability::Guid;
use crate::error::AbiError;

use FieldKind::{Boolean, Float, PointerSized, Signed, Unsigned};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimpleStruct {
    pub i: i32,
}

impl Shape for SimpleStruct {
    const LAYOUT: ShapeLayout = layout!(
        SimpleStruct,
        Struct,
        [field!(SimpleStruct, i: i32, Signed)],
    );

    fn canonical() -> Self {
        Self { i: 1 }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).i32(0, self.i).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { i: r.i32(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new().field("i", &self.i, &other.i).finish()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimplePair {
    pub i: i32,
    pub j: i32,
}

impl Shape for SimplePair {
    const LAYOUT: ShapeLayout = layout!(
        SimplePair,
        Struct,
        [
            field!(SimplePair, i: i32, Signed),
            field!(SimplePair, j: i32, Signed),
        ],
    );

    fn canonical() -> Self {
        Self { i: 1, j: 2 }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .i32(0, self.i)
            .i32(4, self.j)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            i: r.i32(0),
            j: r.i32(4),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("i", &self.i, &other.i)
            .field("j", &self.j, &other.j)
            .finish()
    }
}

/// Three ints that a generator may surface as booleans.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntToBoolArray {
    pub i: [i32; 3],
}

impl IntToBoolArray {
    #[must_use]
    pub fn from_bools(values: [bool; 3]) -> Self {
        Self {
            i: values.map(i32::from),
        }
    }

    #[must_use]
    pub fn as_bools(&self) -> [bool; 3] {
        self.i.map(|v| v != 0)
    }
}

/// Shared codec for the three-int array shapes.
macro_rules! int_triple_shape {
    ($ty:ident, $canonical:expr) => {
        impl Shape for $ty {
            const LAYOUT: ShapeLayout = layout!($ty, Struct, [field!($ty, i: [i32; 3], Signed)]);

            fn canonical() -> Self {
                Self { i: $canonical }
            }

            fn encode(&self) -> Vec<u8> {
                ImageWriter::new(&Self::LAYOUT).i32s(0, &self.i).finish()
            }

            fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
                let r = ImageReader::new(&Self::LAYOUT, bytes)?;
                Ok(Self { i: r.i32s(0) })
            }

            fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
                Differ::new().field("i", &self.i, &other.i).finish()
            }
        }
    };
}

int_triple_shape!(IntToBoolArray, [1, 0, 1]);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructWithMarshal {
    pub i: [i32; 3],
}

int_triple_shape!(StructWithMarshal, [1, 2, 3]);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructWithStaticMarshal {
    pub i: [i32; 3],
}

int_triple_shape!(StructWithStaticMarshal, [4, 5, 6]);

macro_rules! long_triple_shape {
    ($ty:ident, $canonical:expr) => {
        impl Shape for $ty {
            const LAYOUT: ShapeLayout = layout!($ty, Struct, [field!($ty, i: [i64; 3], Signed)]);

            fn canonical() -> Self {
                Self { i: $canonical }
            }

            fn encode(&self) -> Vec<u8> {
                ImageWriter::new(&Self::LAYOUT).i64s(0, &self.i).finish()
            }

            fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
                let r = ImageReader::new(&Self::LAYOUT, bytes)?;
                Ok(Self { i: r.i64s(0) })
            }

            fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
                Differ::new().field("i", &self.i, &other.i).finish()
            }
        }
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LargeStruct {
    pub i: [i64; 3],
}

long_triple_shape!(LargeStruct, [0x1_0000_0001, -2, 3]);

impl LargeStruct {
    #[must_use]
    pub fn sum(&self) -> i64 {
        self.i.iter().copied().fold(0i64, i64::wrapping_add)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LargeStructWithMarshalling {
    pub i: [i64; 3],
}

long_triple_shape!(LargeStructWithMarshalling, [3, 2, 1]);

/// A pointer-sized signed integer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerSize {
    pub value: isize,
}

impl Shape for PointerSize {
    const LAYOUT: ShapeLayout = layout!(
        PointerSize,
        Struct,
        [field!(PointerSize, value: isize, PointerSized)],
    );

    fn canonical() -> Self {
        Self { value: 0x1234_5678 }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).isize(0, self.value).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { value: r.isize(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("value", &self.value, &other.value)
            .finish()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerSizeMember {
    pub pointer_size: PointerSize,
}

impl Shape for PointerSizeMember {
    const LAYOUT: ShapeLayout = layout!(
        PointerSizeMember,
        Struct,
        [field!(
            PointerSizeMember,
            pointer_size: PointerSize,
            FieldKind::Nested("PointerSize")
        )],
    );

    fn canonical() -> Self {
        Self {
            pointer_size: PointerSize { value: -0x0765_4321 },
        }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .nested(0, &self.pointer_size)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            pointer_size: r.nested(0)?,
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .nested("pointer_size", &self.pointer_size, &other.pointer_size)
            .finish()
    }
}

/// Marshalled as a reference type by some generators; natively a struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructAsClass {
    pub i: i32,
}

impl Shape for StructAsClass {
    const LAYOUT: ShapeLayout = layout!(
        StructAsClass,
        Struct,
        [field!(StructAsClass, i: i32, Signed)],
    );

    fn canonical() -> Self {
        Self { i: 1 }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).i32(0, self.i).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { i: r.i32(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new().field("i", &self.i, &other.i).finish()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructAsClassWrapper {
    pub wrapped: StructAsClass,
}

impl Shape for StructAsClassWrapper {
    const LAYOUT: ShapeLayout = layout!(
        StructAsClassWrapper,
        Struct,
        [field!(
            StructAsClassWrapper,
            wrapped: StructAsClass,
            FieldKind::Nested("StructAsClass")
        )],
    );

    fn canonical() -> Self {
        Self {
            wrapped: StructAsClass::canonical(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).nested(0, &self.wrapped).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            wrapped: r.nested(0)?,
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .nested("wrapped", &self.wrapped, &other.wrapped)
            .finish()
    }
}

/// Int array followed by a double; four bytes of interior padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StructWithArray {
    pub i: [i32; 3],
    pub j: f64,
}

impl Shape for StructWithArray {
    const LAYOUT: ShapeLayout = layout!(
        StructWithArray,
        Struct,
        [
            field!(StructWithArray, i: [i32; 3], Signed),
            field!(StructWithArray, j: f64, Float),
        ],
    );

    fn canonical() -> Self {
        Self {
            i: [1, 2, 3],
            j: 4.5,
        }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .i32s(0, &self.i)
            .f64(std::mem::offset_of!(Self, j), self.j)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            i: r.i32s(0),
            j: r.f64(std::mem::offset_of!(Self, j)),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("i", &self.i, &other.i)
            .float64("j", self.j, other.j)
            .finish()
    }
}

/// Value reported by `IInterface::GetValue`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MyValue {
    pub i: i32,
    pub j: f64,
}

impl Shape for MyValue {
    const LAYOUT: ShapeLayout = layout!(
        MyValue,
        Struct,
        [
            field!(MyValue, i: i32, Signed),
            field!(MyValue, j: f64, Float),
        ],
    );

    fn canonical() -> Self {
        Self { i: 1, j: 3.0 }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .i32(0, self.i)
            .f64(std::mem::offset_of!(Self, j), self.j)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            i: r.i32(0),
            j: r.f64(std::mem::offset_of!(Self, j)),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("i", &self.i, &other.i)
            .float64("j", self.j, other.j)
            .finish()
    }
}

/// Wide field then a byte; seven bytes of trailing padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaggedWide {
    pub wide: i64,
    pub narrow: u8,
}

impl Shape for TaggedWide {
    const LAYOUT: ShapeLayout = layout!(
        TaggedWide,
        Struct,
        [
            field!(TaggedWide, wide: i64, Signed),
            field!(TaggedWide, narrow: u8, Unsigned),
        ],
    );

    fn canonical() -> Self {
        Self {
            wide: -5_000_000_000,
            narrow: 0xA5,
        }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .i64(0, self.wide)
            .u8(std::mem::offset_of!(Self, narrow), self.narrow)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            wide: r.i64(0),
            narrow: r.u8(std::mem::offset_of!(Self, narrow)),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("wide", &self.wide, &other.wide)
            .field("narrow", &self.narrow, &other.narrow)
            .finish()
    }
}

/// Returned by `ICallback::GetLargeStruct`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallbackLargeStruct {
    pub a: i64,
    pub b: i64,
}

impl Shape for CallbackLargeStruct {
    const LAYOUT: ShapeLayout = layout!(
        CallbackLargeStruct,
        Struct,
        [
            field!(CallbackLargeStruct, a: i64, Signed),
            field!(CallbackLargeStruct, b: i64, Signed),
        ],
    );

    fn canonical() -> Self {
        Self { a: 4, b: 10 }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .i64(0, self.a)
            .i64(8, self.b)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            a: r.i64(0),
            b: r.i64(8),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("a", &self.a, &other.a)
            .field("b", &self.b, &other.b)
            .finish()
    }
}

/// Boolean carried in a 32-bit int.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoolToInt {
    pub test: i32,
}

impl BoolToInt {
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self {
            test: i32::from(value),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> bool {
        self.test != 0
    }
}

impl Shape for BoolToInt {
    const LAYOUT: ShapeLayout = layout!(
        BoolToInt,
        Struct,
        [field!(BoolToInt, test: i32, Boolean)],
    );

    fn canonical() -> Self {
        Self::from_bool(true)
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT).i32(0, self.test).finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self { test: r.i32(0) })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("test", &self.test, &other.test)
            .finish()
    }
}

/// Three booleans as 0/1 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoolArray {
    pub elements: [u8; 3],
}

impl BoolArray {
    #[must_use]
    pub fn from_bools(values: [bool; 3]) -> Self {
        Self {
            elements: values.map(u8::from),
        }
    }

    #[must_use]
    pub fn as_bools(&self) -> [bool; 3] {
        self.elements.map(|b| b != 0)
    }
}

impl Shape for BoolArray {
    const LAYOUT: ShapeLayout = layout!(
        BoolArray,
        Struct,
        [field!(BoolArray, elements: [u8; 3], Boolean)],
    );

    fn canonical() -> Self {
        Self::from_bools([true, false, true])
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .bytes(0, &self.elements)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        let mut elements = [0u8; 3];
        elements.copy_from_slice(r.slice(0, 3));
        Ok(Self { elements })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("elements", &self.elements, &other.elements)
            .finish()
    }
}

/// Struct whose first field must carry its own native size.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StructSizeRelation {
    pub cb_size: u32,
    pub flags: u32,
    pub value: f64,
}

impl StructSizeRelation {
    pub const NATIVE_SIZE: u32 = std::mem::size_of::<Self>() as u32;

    #[must_use]
    pub fn new(flags: u32, value: f64) -> Self {
        Self {
            cb_size: Self::NATIVE_SIZE,
            flags,
            value,
        }
    }

    #[must_use]
    pub fn is_size_valid(&self) -> bool {
        self.cb_size == Self::NATIVE_SIZE
    }
}

impl Shape for StructSizeRelation {
    const LAYOUT: ShapeLayout = layout!(
        StructSizeRelation,
        Struct,
        [
            field!(StructSizeRelation, cb_size: u32, Unsigned),
            field!(StructSizeRelation, flags: u32, Unsigned),
            field!(StructSizeRelation, value: f64, Float),
        ],
    );

    fn canonical() -> Self {
        Self::new(0x5, 2.5)
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .u32(0, self.cb_size)
            .u32(4, self.flags)
            .f64(8, self.value)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            cb_size: r.u32(0),
            flags: r.u32(4),
            value: r.f64(8),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("cb_size", &self.cb_size, &other.cb_size)
            .field("flags", &self.flags, &other.flags)
            .float64("value", self.value, other.value)
            .finish()
    }
}

/// Struct with a reserved field that must read back its sentinel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReservedRelation {
    pub reserved: i32,
    pub value: i32,
}

impl ReservedRelation {
    pub const RESERVED: i32 = 42;

    #[must_use]
    pub fn new(value: i32) -> Self {
        Self {
            reserved: Self::RESERVED,
            value,
        }
    }

    #[must_use]
    pub fn is_reserved_intact(&self) -> bool {
        self.reserved == Self::RESERVED
    }
}

impl Shape for ReservedRelation {
    const LAYOUT: ShapeLayout = layout!(
        ReservedRelation,
        Struct,
        [
            field!(ReservedRelation, reserved: i32, Signed),
            field!(ReservedRelation, value: i32, Signed),
        ],
    );

    fn canonical() -> Self {
        Self::new(7)
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .i32(0, self.reserved)
            .i32(4, self.value)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            reserved: r.i32(0),
            value: r.i32(4),
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("reserved", &self.reserved, &other.reserved)
            .field("value", &self.value, &other.value)
            .finish()
    }
}

impl Shape for Guid {
    const LAYOUT: ShapeLayout = layout!(
        Guid,
        Struct,
        [
            field!(Guid, data1: u32, Unsigned),
            field!(Guid, data2: u16, Unsigned),
            field!(Guid, data3: u16, Unsigned),
            field!(Guid, data4: [u8; 8], Unsigned),
        ],
    );

    fn canonical() -> Self {
        crate::capability::IID_IINTERFACE_WITH_GUID
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .u32(0, self.data1)
            .u16(4, self.data2)
            .u16(6, self.data3)
            .bytes(8, &self.data4)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(r.slice(8, 8));
        Ok(Self::new(r.u32(0), r.u16(4), r.u16(6), data4))
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("data1", &self.data1, &other.data1)
            .field("data2", &self.data2, &other.data2)
            .field("data3", &self.data3, &other.data3)
            .field("data4", &self.data4, &other.data4)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip<S: Shape + std::fmt::Debug>() {
        let value = S::canonical();
        let image = value.encode();
        assert_eq!(image.len(), S::LAYOUT.size, "{}", S::LAYOUT.name);
        let back = S::decode(&image).unwrap();
        assert!(
            value.round_trip_eq(&back),
            "{}: {:?}",
            S::LAYOUT.name,
            value.diff(&back)
        );
    }

    #[test]
    fn canonical_instances_round_trip() {
        assert_round_trip::<SimpleStruct>();
        assert_round_trip::<SimplePair>();
        assert_round_trip::<IntToBoolArray>();
        assert_round_trip::<StructWithMarshal>();
        assert_round_trip::<StructWithStaticMarshal>();
        assert_round_trip::<LargeStruct>();
        assert_round_trip::<LargeStructWithMarshalling>();
        assert_round_trip::<PointerSize>();
        assert_round_trip::<PointerSizeMember>();
        assert_round_trip::<StructAsClass>();
        assert_round_trip::<StructAsClassWrapper>();
        assert_round_trip::<StructWithArray>();
        assert_round_trip::<MyValue>();
        assert_round_trip::<TaggedWide>();
        assert_round_trip::<CallbackLargeStruct>();
        assert_round_trip::<BoolToInt>();
        assert_round_trip::<BoolArray>();
        assert_round_trip::<StructSizeRelation>();
        assert_round_trip::<ReservedRelation>();
        assert_round_trip::<Guid>();
    }

    /// Round trip a specific value and check the re-encoded image is byte-exact.
    fn assert_value_round_trips<S: Shape + std::fmt::Debug>(value: S) {
        let image = value.encode();
        assert_eq!(image.len(), S::LAYOUT.size, "{}", S::LAYOUT.name);
        let back = S::decode(&image).unwrap();
        assert!(
            value.round_trip_eq(&back),
            "{}: {:?}",
            S::LAYOUT.name,
            value.diff(&back)
        );
        assert_eq!(back.encode(), image, "{}", S::LAYOUT.name);
    }

    fn assert_single_change<S: Shape>(base: &S, changed: &S, field: &str) {
        let diff = base.diff(changed);
        assert_eq!(diff.len(), 1, "{}: {diff:?}", S::LAYOUT.name);
        assert_eq!(diff[0].field, field, "{}", S::LAYOUT.name);
    }

    const QUIET_NAN_WITH_PAYLOAD: u64 = 0x7ff8_0000_0000_1234;

    #[test]
    fn extreme_values_round_trip() {
        assert_value_round_trips(SimpleStruct { i: i32::MIN });
        assert_value_round_trips(SimplePair { i: i32::MIN, j: i32::MAX });
        assert_value_round_trips(IntToBoolArray { i: [i32::MIN, 0, i32::MAX] });
        assert_value_round_trips(StructWithMarshal { i: [i32::MAX, -1, i32::MIN] });
        assert_value_round_trips(StructWithStaticMarshal { i: [-1, i32::MIN, i32::MAX] });
        assert_value_round_trips(LargeStruct { i: [i64::MIN, -1, i64::MAX] });
        assert_value_round_trips(LargeStructWithMarshalling { i: [i64::MAX, 0, i64::MIN] });
        assert_value_round_trips(PointerSize { value: isize::MIN });
        assert_value_round_trips(PointerSizeMember {
            pointer_size: PointerSize { value: isize::MAX },
        });
        assert_value_round_trips(StructAsClass { i: i32::MIN });
        assert_value_round_trips(StructAsClassWrapper {
            wrapped: StructAsClass { i: i32::MAX },
        });
        assert_value_round_trips(StructWithArray {
            i: [i32::MIN, -1, i32::MAX],
            j: f64::NAN,
        });
        assert_value_round_trips(MyValue { i: i32::MAX, j: -0.0 });
        assert_value_round_trips(MyValue {
            i: i32::MIN,
            j: f64::from_bits(QUIET_NAN_WITH_PAYLOAD),
        });
        assert_value_round_trips(MyValue { i: 0, j: f64::NEG_INFINITY });
        assert_value_round_trips(TaggedWide { wide: i64::MIN, narrow: 0xff });
        assert_value_round_trips(CallbackLargeStruct { a: i64::MIN, b: i64::MAX });
        assert_value_round_trips(BoolToInt { test: i32::MIN });
        assert_value_round_trips(BoolArray { elements: [0xff, 0x80, 2] });
        assert_value_round_trips(StructSizeRelation {
            cb_size: u32::MAX,
            flags: u32::MAX,
            value: -0.0,
        });
        assert_value_round_trips(ReservedRelation { reserved: i32::MIN, value: i32::MAX });
        assert_value_round_trips(Guid::new(u32::MAX, u16::MAX, 0, [0xff, 0x80, 0, 1, 2, 3, 4, 0xfe]));
    }

    #[test]
    fn nan_payloads_are_distinguished() {
        let a = MyValue { i: 0, j: f64::NAN };
        let b = MyValue {
            i: 0,
            j: f64::from_bits(QUIET_NAN_WITH_PAYLOAD),
        };
        assert_single_change(&a, &b, "j");
    }

    #[test]
    fn diff_names_a_single_changed_field() {
        assert_single_change(&SimpleStruct { i: 0 }, &SimpleStruct { i: i32::MIN }, "i");
        assert_single_change(&SimplePair { i: 1, j: 2 }, &SimplePair { i: 1, j: i32::MAX }, "j");
        assert_single_change(&IntToBoolArray { i: [1, 0, 1] }, &IntToBoolArray { i: [1, 0, 2] }, "i");
        assert_single_change(&StructWithMarshal { i: [1, 2, 3] }, &StructWithMarshal { i: [1, 2, -3] }, "i");
        assert_single_change(
            &StructWithStaticMarshal { i: [4, 5, 6] },
            &StructWithStaticMarshal { i: [i32::MIN, 5, 6] },
            "i",
        );
        assert_single_change(&LargeStruct { i: [1, 2, 3] }, &LargeStruct { i: [1, i64::MAX, 3] }, "i");
        assert_single_change(
            &LargeStructWithMarshalling { i: [3, 2, 1] },
            &LargeStructWithMarshalling { i: [3, 2, i64::MIN] },
            "i",
        );
        assert_single_change(&PointerSize { value: 1 }, &PointerSize { value: -1 }, "value");
        assert_single_change(
            &PointerSizeMember { pointer_size: PointerSize { value: 0 } },
            &PointerSizeMember { pointer_size: PointerSize { value: isize::MIN } },
            "pointer_size.value",
        );
        assert_single_change(&StructAsClass { i: 1 }, &StructAsClass { i: 2 }, "i");
        assert_single_change(
            &StructAsClassWrapper { wrapped: StructAsClass { i: 1 } },
            &StructAsClassWrapper { wrapped: StructAsClass { i: -1 } },
            "wrapped.i",
        );
        assert_single_change(
            &StructWithArray { i: [1, 2, 3], j: 0.0 },
            &StructWithArray { i: [1, 2, 3], j: -0.0 },
            "j",
        );
        assert_single_change(&MyValue { i: 1, j: 1.0 }, &MyValue { i: 2, j: 1.0 }, "i");
        assert_single_change(
            &TaggedWide { wide: 1, narrow: 0x7f },
            &TaggedWide { wide: 1, narrow: 0x80 },
            "narrow",
        );
        assert_single_change(
            &CallbackLargeStruct { a: 1, b: 2 },
            &CallbackLargeStruct { a: i64::MIN, b: 2 },
            "a",
        );
        assert_single_change(&BoolToInt { test: 1 }, &BoolToInt { test: 2 }, "test");
        assert_single_change(
            &BoolArray { elements: [1, 0, 1] },
            &BoolArray { elements: [1, 0, 0xff] },
            "elements",
        );
        assert_single_change(
            &StructSizeRelation { cb_size: 16, flags: 0, value: 1.0 },
            &StructSizeRelation { cb_size: 16, flags: 1, value: 1.0 },
            "flags",
        );
        assert_single_change(
            &ReservedRelation { reserved: 42, value: 0 },
            &ReservedRelation { reserved: 41, value: 0 },
            "reserved",
        );
        assert_single_change(
            &Guid::new(1, 2, 3, [0; 8]),
            &Guid::new(1, 2, 3, [0, 0, 0, 0, 0, 0, 0, 0x80]),
            "data4",
        );
    }

    #[test]
    fn padding_is_zeroed_in_images() {
        let image = StructWithArray::canonical().encode();
        assert_eq!(&image[12..16], &[0, 0, 0, 0]);
        let image = TaggedWide::canonical().encode();
        assert!(image[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn padding_accounting() {
        assert_eq!(StructWithArray::LAYOUT.padding_bytes(), 4);
        assert_eq!(TaggedWide::LAYOUT.trailing_padding(), 7);
        assert_eq!(MyValue::LAYOUT.padding_bytes(), 4);
        assert_eq!(SimplePair::LAYOUT.padding_bytes(), 0);
    }

    #[test]
    fn float_diff_uses_bits() {
        let a = MyValue { i: 1, j: 0.0 };
        let b = MyValue { i: 1, j: -0.0 };
        assert_eq!(a.diff(&b).len(), 1);
        let nan = MyValue { i: 1, j: f64::NAN };
        assert!(nan.round_trip_eq(&nan));
    }

    #[test]
    fn fixed_layouts() {
        assert_eq!(SimpleStruct::LAYOUT.size, 4);
        assert_eq!(IntToBoolArray::LAYOUT.size, 12);
        assert_eq!(LargeStruct::LAYOUT.size, 24);
        assert_eq!(LargeStruct::LAYOUT.align, 8);
        assert_eq!(StructWithArray::LAYOUT.size, 24);
        assert_eq!(StructWithArray::LAYOUT.fields[1].offset, 16);
        assert_eq!(MyValue::LAYOUT.size, 16);
        assert_eq!(TaggedWide::LAYOUT.size, 16);
        assert_eq!(BoolArray::LAYOUT.size, 3);
        assert_eq!(BoolArray::LAYOUT.align, 1);
        assert_eq!(StructSizeRelation::NATIVE_SIZE, 16);
        assert_eq!(Guid::LAYOUT.size, 16);
        assert_eq!(
            PointerSize::LAYOUT.size,
            std::mem::size_of::<usize>()
        );
    }

    #[test]
    fn sentinel_helpers() {
        assert!(ReservedRelation::canonical().is_reserved_intact());
        assert!(!ReservedRelation { reserved: 41, value: 0 }.is_reserved_intact());
        assert!(StructSizeRelation::canonical().is_size_valid());
        assert!(!StructSizeRelation::default().is_size_valid());
    }

    #[test]
    fn bool_helpers() {
        assert_eq!(IntToBoolArray::canonical().as_bools(), [true, false, true]);
        assert_eq!(BoolArray::from_bools([false, true, false]).elements, [0, 1, 0]);
        assert!(BoolToInt::canonical().as_bool());
    }

    #[test]
    fn guid_image_is_native_order() {
        let image = Guid::canonical().encode();
        assert_eq!(&image[0..4], &0x1641_0F4Eu32.to_ne_bytes());
        assert_eq!(&image[8..16], &[0xB9, 0xA3, 0x7F, 0xC8, 0xFA, 0x15, 0xF4, 0xF4]);
    }
}
