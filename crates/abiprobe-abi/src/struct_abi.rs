//! Shape pass-through entry points.
//!
//! Every canonical shape crosses the boundary by value and comes back
//! unchanged; a verifier compares the returned image field by field. The
//! relation shapes (`StructSizeRelation`, `ReservedRelation`) are initialized
//! through status-returning entry points that write only on success.

use std::ffi::c_void;
use std::mem::{align_of, offset_of, size_of};

use abiprobe_core::functions as reference;
use abiprobe_core::shape::bitfield::{BitField, BitField2};
use abiprobe_core::shape::plain::{
    BoolArray, BoolToInt, PointerSizeMember, ReservedRelation, StructSizeRelation, StructWithArray,
    TaggedWide,
};
use abiprobe_core::shape::text::{AsciiTest, NestedTest, Utf16Test};
use abiprobe_core::shape::union::{TestUnion, UnionWithArray};
use abiprobe_core::shape::{
    Composite, Differ, FieldKind, FieldLayout, FieldMismatch, ImageReader, ImageWriter, Shape,
    ShapeLayout,
};
use abiprobe_core::{AbiError, Status};
use abiprobe_membrane::view::{self, Site};

use crate::interface_abi::new_element;
use crate::macros::abi_fn;
use crate::runtime_policy::check;

/// A struct whose only field is an `IElement*`.
///
/// A value returned by `GetStructWithInterface` owns one reference on `test`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructWithInterface {
    pub test: *mut c_void,
}

impl Shape for StructWithInterface {
    const LAYOUT: ShapeLayout = ShapeLayout {
        name: "StructWithInterface",
        size: size_of::<StructWithInterface>(),
        align: align_of::<StructWithInterface>(),
        composite: Composite::Struct,
        fields: &[FieldLayout::scalar(
            "test",
            offset_of!(StructWithInterface, test),
            size_of::<*mut c_void>(),
            FieldKind::InterfacePointer,
        )],
    };

    /// Null: a canonical value never owns an object.
    fn canonical() -> Self {
        Self {
            test: std::ptr::null_mut(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        ImageWriter::new(&Self::LAYOUT)
            .usize(0, self.test as usize)
            .finish()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        let r = ImageReader::new(&Self::LAYOUT, bytes)?;
        Ok(Self {
            test: r.usize(0) as *mut c_void,
        })
    }

    fn diff(&self, other: &Self) -> Vec<FieldMismatch> {
        Differ::new()
            .field("test", &(self.test as usize), &(other.test as usize))
            .finish()
    }
}

/// Layouts of the shapes defined at the boundary rather than in the core.
#[must_use]
pub fn boundary_layouts() -> Vec<ShapeLayout> {
    vec![StructWithInterface::LAYOUT]
}

macro_rules! pass_through {
    ($($name:ident as $symbol:literal : $shape:ty;)*) => {
        $(
            abi_fn! {
                fn $name as $symbol(value: $shape) -> $shape {
                    value
                }
            }
        )*
    };
}

pass_through! {
    pass_through_struct_with_array as "PassThroughStructWithArray": StructWithArray;
    pass_through_test_union as "PassThroughTestUnion": TestUnion;
    pass_through_union_with_array as "PassThroughUnionWithArray": UnionWithArray;
    pass_through_bit_field as "PassThroughBitField": BitField;
    pass_through_ascii_test as "PassThroughAsciiTest": AsciiTest;
    pass_through_utf16_test as "PassThroughUtf16Test": Utf16Test;
    pass_through_nested_test as "PassThroughNestedTest": NestedTest;
    pass_through_bool_to_int as "PassThroughBoolToInt": BoolToInt;
    pass_through_bool_array as "PassThroughBoolArray": BoolArray;
    pass_through_tagged_wide as "PassThroughTaggedWide": TaggedWide;
    pass_through_struct_with_interface as "PassThroughStructWithInterface": StructWithInterface;
}

abi_fn! {
    fn pass_through_pointer_size_member as "PassThroughPointerSizeMember"(value: PointerSizeMember) -> PointerSizeMember {
        reference::pass_through_pointer_size_member(value)
    }
}

abi_fn! {
    /// True when the reserved bit-field still holds its sentinel.
    fn verify_reserved_bits as "VerifyReservedBits"(value: BitField2) -> bool {
        reference::verify_reserved_bits(value)
    }
}

abi_fn! {
    /// Fresh `IElement` inside the struct; the caller owns its reference.
    fn get_struct_with_interface as "GetStructWithInterface"() -> StructWithInterface {
        StructWithInterface { test: new_element() }
    }
}

abi_fn! {
    /// `INVALID_ARGUMENT` and no write when `cb_size` is not the native size.
    fn init_struct_size_relation as "InitStructSizeRelation"(target: *mut StructSizeRelation) -> Status {
        check(view::value_mut(Site::new("InitStructSizeRelation", "target"), target))
            .map_or(Status::INVALID_POINTER, reference::init_struct_size_relation)
    }
}

abi_fn! {
    fn init_reserved_relation as "InitReservedRelation"(target: *mut ReservedRelation) -> Status {
        check(view::value_mut(Site::new("InitReservedRelation", "target"), target))
            .map_or(Status::INVALID_POINTER, reference::init_reserved_relation)
    }
}

abi_fn! {
    fn verify_reserved_relation as "VerifyReservedRelation"(value: ReservedRelation) -> bool {
        reference::verify_reserved_relation(&value)
    }
}
