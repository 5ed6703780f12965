//! Registry of every exported entry point and interface table.
//!
//! Built once on first use and never mutated afterwards. A verifier walks it
//! to know which symbols to probe, what marshalling rule each one exercises
//! and which slots an interface table must have, in order.

use std::collections::BTreeMap;
use std::mem::size_of;
use std::sync::OnceLock;

use abiprobe_core::Guid;

use crate::callback_abi::{self, ICallback};
use crate::functions_abi;
use crate::interface_abi::{self, IElement, IInterface, IInterface2, IInterfaceWithGuid, ILargeInterface};
use crate::object::{IObject, Interface};
use crate::properties_abi::{self, IFastOutInterface, IInterfaceWithProperties, IPassThroughMethodTest};
use crate::struct_abi;

/// Which part of the system an entry point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Functions,
    Shapes,
    Interfaces,
    Callback,
    Diagnostics,
}

impl Component {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Functions => "functions",
            Self::Shapes => "shapes",
            Self::Interfaces => "interfaces",
            Self::Callback => "callback",
            Self::Diagnostics => "diagnostics",
        }
    }
}

/// The marshalling rule an entry point exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarshalRule {
    PassThrough,
    ExplicitLength,
    ImplicitLength,
    OptionalPointer,
    InOutScalar,
    ReservedValue,
    ObjectCreation,
    StatusReturning,
    StructByValue,
    StructReturn,
    Callback,
}

impl MarshalRule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::ExplicitLength => "explicit_length",
            Self::ImplicitLength => "implicit_length",
            Self::OptionalPointer => "optional_pointer",
            Self::InOutScalar => "in_out_scalar",
            Self::ReservedValue => "reserved_value",
            Self::ObjectCreation => "object_creation",
            Self::StatusReturning => "status_returning",
            Self::StructByValue => "struct_by_value",
            Self::StructReturn => "struct_return",
            Self::Callback => "callback",
        }
    }
}

/// One exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    pub symbol: &'static str,
    pub component: Component,
    pub rule: MarshalRule,
    /// Address of the Rust function behind the symbol.
    pub address: usize,
}

/// One interface table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEntry {
    pub name: &'static str,
    pub iid: Guid,
    pub parent: Option<&'static str>,
    /// Slots declared by this interface, after its parent's.
    pub own_slots: &'static [&'static str],
    /// Size of the `#[repr(C)]` table.
    pub vtable_size: usize,
}

impl InterfaceEntry {
    fn of<I: Interface>(parent: Option<&'static str>, own_slots: &'static [&'static str]) -> Self {
        Self {
            name: I::NAME,
            iid: I::IID,
            parent,
            own_slots,
            vtable_size: size_of::<I::Vtbl>(),
        }
    }
}

/// The complete catalog.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<EntryPoint>,
    by_symbol: BTreeMap<&'static str, usize>,
    interfaces: Vec<InterfaceEntry>,
}

impl Registry {
    /// Entry points in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    #[must_use]
    pub fn lookup(&self, symbol: &str) -> Option<&EntryPoint> {
        self.by_symbol.get(symbol).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn interfaces(&self) -> &[InterfaceEntry] {
        &self.interfaces
    }

    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&InterfaceEntry> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Every slot of `name` in table order, base slots first.
    #[must_use]
    pub fn slots(&self, name: &str) -> Vec<&'static str> {
        let mut chain = Vec::new();
        let mut current = self.interface(name);
        while let Some(entry) = current {
            chain.push(entry);
            current = entry.parent.and_then(|p| self.interface(p));
        }
        chain
            .iter()
            .rev()
            .flat_map(|e| e.own_slots.iter().copied())
            .collect()
    }

    #[must_use]
    pub fn by_component(&self, component: Component) -> Vec<&EntryPoint> {
        self.entries
            .iter()
            .filter(|e| e.component == component)
            .collect()
    }
}

/// The process-wide registry.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(build)
}

macro_rules! entries {
    ($($component:ident, $rule:ident => $($path:ident)::+ as $symbol:literal;)*) => {
        vec![$(EntryPoint {
            symbol: $symbol,
            component: Component::$component,
            rule: MarshalRule::$rule,
            address: $($path)::+ as usize,
        }),*]
    };
}

fn build() -> Registry {
    let entries = entries! {
        Functions, ExplicitLength => functions_abi::get_interfaces as "GetInterfaces";
        Functions, OptionalPointer => functions_abi::get_interfaces_optional as "GetInterfacesOptional";
        Functions, ExplicitLength => functions_abi::get_int_array as "GetIntArray";
        Functions, PassThrough => functions_abi::get_first_character as "GetFirstCharacter";
        Functions, PassThrough => functions_abi::get_first_ansi_character as "GetFirstAnsiCharacter";
        Functions, InOutScalar => functions_abi::bool_to_int_test as "BoolToIntTest";
        Functions, ExplicitLength => functions_abi::bool_array_test as "BoolArrayTest";
        Functions, StructByValue => functions_abi::struct_marshalling as "StructMarshalling";
        Functions, ImplicitLength => functions_abi::struct_array_marshalling as "StructArrayMarshalling";
        Functions, ImplicitLength => functions_abi::sum_of_last_elements as "SumOfLastElements";
        Functions, InOutScalar => functions_abi::set_all_elements as "SetAllElements";
        Functions, OptionalPointer => functions_abi::first_element_or_zero as "FirstElementOrZero";
        Functions, ObjectCreation => functions_abi::fast_out_test as "FastOutTest";
        Functions, PassThrough => functions_abi::pass_through_enum as "PassThroughEnum";
        Functions, InOutScalar => functions_abi::increment as "Increment";
        Functions, OptionalPointer => functions_abi::add as "Add";
        Functions, PassThrough => functions_abi::get_name as "GetName";
        Functions, OptionalPointer => functions_abi::sum as "Sum";
        Functions, OptionalPointer => functions_abi::product as "Product";
        Functions, StructByValue => functions_abi::sum_values as "SumValues";
        Functions, PassThrough => functions_abi::pass_through_pointer_size as "PassThroughPointerSize";
        Functions, ImplicitLength => functions_abi::struct_array_out as "StructArrayOut";
        Functions, ExplicitLength => functions_abi::sum_inner as "SumInner";
        Functions, OptionalPointer => functions_abi::add_one as "AddOne";
        Functions, InOutScalar => functions_abi::enum_out as "EnumOut";
        Functions, ImplicitLength => functions_abi::first_enum_element as "FirstEnumElement";
        Functions, ExplicitLength => functions_abi::array_relation_sum as "ArrayRelationSum";
        Functions, ExplicitLength => functions_abi::array_relation_out_init_bool_array as "ArrayRelationOutInitBoolArray";
        Functions, ExplicitLength => functions_abi::array_relation_out_get_interfaces_with_relation as "ArrayRelationOutGetInterfacesWithRelation";
        Functions, ExplicitLength => functions_abi::array_relation_in_interface_array as "ArrayRelationInInterfaceArray";
        Functions, ExplicitLength => functions_abi::array_relation_sum_struct_with_marshal as "ArrayRelationSumStructWithMarshal";
        Functions, ReservedValue => functions_abi::verify_reserved_param as "VerifyReservedParam";
        Functions, StructReturn => functions_abi::get_wrapper as "GetWrapper";
        Functions, StructReturn => functions_abi::get_simple_struct as "GetSimpleStruct";
        Functions, StructReturn => functions_abi::get_int_to_bool_array as "GetIntToBoolArray";
        Functions, StructByValue => functions_abi::and as "And";
        Shapes, StructByValue => struct_abi::pass_through_struct_with_array as "PassThroughStructWithArray";
        Shapes, StructByValue => struct_abi::pass_through_test_union as "PassThroughTestUnion";
        Shapes, StructByValue => struct_abi::pass_through_union_with_array as "PassThroughUnionWithArray";
        Shapes, StructByValue => struct_abi::pass_through_bit_field as "PassThroughBitField";
        Shapes, StructByValue => struct_abi::pass_through_ascii_test as "PassThroughAsciiTest";
        Shapes, StructByValue => struct_abi::pass_through_utf16_test as "PassThroughUtf16Test";
        Shapes, StructByValue => struct_abi::pass_through_nested_test as "PassThroughNestedTest";
        Shapes, ReservedValue => struct_abi::verify_reserved_bits as "VerifyReservedBits";
        Shapes, StructByValue => struct_abi::pass_through_bool_to_int as "PassThroughBoolToInt";
        Shapes, StructByValue => struct_abi::pass_through_bool_array as "PassThroughBoolArray";
        Shapes, StructByValue => struct_abi::pass_through_pointer_size_member as "PassThroughPointerSizeMember";
        Shapes, StructByValue => struct_abi::pass_through_tagged_wide as "PassThroughTaggedWide";
        Shapes, StructReturn => struct_abi::get_struct_with_interface as "GetStructWithInterface";
        Shapes, StructByValue => struct_abi::pass_through_struct_with_interface as "PassThroughStructWithInterface";
        Shapes, StatusReturning => struct_abi::init_struct_size_relation as "InitStructSizeRelation";
        Shapes, StatusReturning => struct_abi::init_reserved_relation as "InitReservedRelation";
        Shapes, ReservedValue => struct_abi::verify_reserved_relation as "VerifyReservedRelation";
        Interfaces, ObjectCreation => interface_abi::create_instance as "CreateInstance";
        Interfaces, ObjectCreation => interface_abi::create_instance2 as "CreateInstance2";
        Interfaces, ObjectCreation => interface_abi::clone_instance as "CloneInstance";
        Interfaces, ObjectCreation => interface_abi::create_com_instance as "CreateComInstance";
        Interfaces, ObjectCreation => interface_abi::create_interface_with_guid as "CreateInterfaceWithGuid";
        Interfaces, ObjectCreation => interface_abi::create_large_interface as "CreateLargeInterface";
        Interfaces, ObjectCreation => properties_abi::create_property_test as "CreatePropertyTest";
        Interfaces, ObjectCreation => properties_abi::fast_out_interface_test as "FastOutInterfaceTest";
        Interfaces, ObjectCreation => properties_abi::get_pass_through_method_test as "GetPassThroughMethodTest";
        Callback, Callback => callback_abi::run_callback_probe as "RunCallbackProbe";
        Callback, ObjectCreation => callback_abi::create_reference_callback as "CreateReferenceCallback";
        Diagnostics, PassThrough => interface_abi::live_objects as "AbiProbeLiveObjects";
    };

    let by_symbol = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.symbol, i))
        .collect();

    let interfaces = vec![
        InterfaceEntry::of::<IObject>(None, &["QueryCapability", "Acquire", "Release"]),
        InterfaceEntry::of::<IInterface>(Some("IObject"), &["GetValue"]),
        InterfaceEntry::of::<IInterface2>(Some("IInterface"), &["GetValue2", "AddToThis"]),
        InterfaceEntry::of::<IInterfaceWithGuid>(Some("IObject"), &["Method"]),
        InterfaceEntry::of::<ILargeInterface>(Some("IObject"), &["Method1", "Method2", "Method3"]),
        InterfaceEntry::of::<IInterfaceWithProperties>(
            Some("IObject"),
            &[
                "IsTrue",
                "IsTrueOutProp",
                "GetValue",
                "SetValue",
                "GetValue2",
                "SetValue2",
                "GetValuePersistent",
                "GetValue2Persistent",
                "GetSelfPersistent",
                "GetSelfOutPersistent",
            ],
        ),
        InterfaceEntry::of::<IFastOutInterface>(Some("IObject"), &["DoNothing"]),
        InterfaceEntry::of::<IPassThroughMethodTest>(Some("IObject"), &["PassThrough", "PassThroughLong"]),
        InterfaceEntry::of::<IElement>(Some("IObject"), &["Method", "One"]),
        InterfaceEntry::of::<ICallback>(
            Some("IObject"),
            &[
                "Add",
                "AreEqual",
                "CloneInstance",
                "GetFirstAnsiCharacter",
                "GetFirstCharacter",
                "GetLargeMarshalledStruct",
                "GetLargeStruct",
                "GetZero",
                "Increment",
                "MappedTypeTest",
                "ModifyPointer",
                "ArrayRelationAnd",
                "ArrayRelationSum",
                "ArrayRelationSumStruct",
                "GetName",
            ],
        ),
    ];

    Registry {
        entries,
        by_symbol,
        interfaces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abiprobe_core::capability::KNOWN_CAPABILITIES;

    #[test]
    fn symbols_are_unique() {
        let reg = registry();
        assert_eq!(reg.by_symbol.len(), reg.entries().len());
    }

    #[test]
    fn addresses_are_distinct_functions() {
        let reg = registry();
        for e in reg.entries() {
            assert_ne!(e.address, 0, "{}", e.symbol);
        }
    }

    #[test]
    fn vtable_sizes_match_slot_counts() {
        let reg = registry();
        for iface in reg.interfaces() {
            assert_eq!(
                iface.vtable_size,
                reg.slots(iface.name).len() * size_of::<usize>(),
                "{}",
                iface.name
            );
        }
    }

    #[test]
    fn derived_slots_follow_base() {
        let slots = registry().slots("IInterface2");
        assert_eq!(
            slots,
            ["QueryCapability", "Acquire", "Release", "GetValue", "GetValue2", "AddToThis"]
        );
    }

    #[test]
    fn every_known_capability_has_a_table() {
        let reg = registry();
        for (name, iid) in KNOWN_CAPABILITIES {
            let entry = reg.interface(name).unwrap_or_else(|| panic!("{name} missing"));
            assert_eq!(&entry.iid, iid);
        }
    }

    #[test]
    fn lookup_and_components() {
        let reg = registry();
        let sum = reg.lookup("Sum").unwrap();
        assert_eq!(sum.rule, MarshalRule::OptionalPointer);
        assert_eq!(sum.component, Component::Functions);
        assert!(reg.lookup("NoSuchSymbol").is_none());
        assert_eq!(reg.by_component(Component::Callback).len(), 2);
    }
}
