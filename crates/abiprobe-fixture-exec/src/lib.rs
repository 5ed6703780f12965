//! Fixture execution adapter shared by harness tooling.
//!
//! Runs one fixture case twice: through the exported entry point (the
//! implementation side) and through the pure reference model in
//! `abiprobe-core`. Outputs are rendered to strings so the harness can diff
//! them against the captured expectation without knowing any native type.
//!
//! A case whose inputs break the entry point's contract (null required
//! pointer, negative length) is executed only when the active mode answers
//! violations with a safe default. Under strict mode the violation would
//! abort the process, so the case reports `UB` without calling. A length
//! larger than the backing buffer is undefined in every mode: the boundary
//! cannot see where a caller's buffer ends.
//!
//! The contract mode is process-wide. Cases are serialized and each one sets
//! the mode it runs under.

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

use abiprobe_abi::callback_abi::{create_reference_callback, run_callback_probe, ICallback};
use abiprobe_abi::interface_abi::IElement;
use abiprobe_abi::object::ComPtr;
use abiprobe_abi::{functions_abi as abi, runtime_policy, struct_abi};
use abiprobe_core::callback::{CallbackProbeReport, HANDLER_NAME};
use abiprobe_core::functions as reference;
use abiprobe_core::shape::bitfield::{BitField, BitField2};
use abiprobe_core::shape::plain::{
    IntToBoolArray, LargeStruct, ReservedRelation, SimpleStruct, StructAsClass, StructSizeRelation,
    StructWithMarshal, TaggedWide,
};
use abiprobe_core::{MyEnum, Status};
use abiprobe_membrane::config::{ContractMode, set_contract_mode};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod lifecycle;

pub use lifecycle::{LifecycleCheck, LifecycleRun, run_lifecycle_scenarios};

/// Output reported when a case is not executed because its behavior is undefined.
pub const UNDEFINED: &str = "UB";

/// Output of an out-parameter entry point called with a null target.
pub const NO_OP: &str = "no-op";

/// Entry points the executor can drive from JSON inputs.
pub const SUPPORTED_FUNCTIONS: &[&str] = &[
    "Add",
    "Increment",
    "Sum",
    "Product",
    "SumInner",
    "ArrayRelationSum",
    "ArrayRelationSumStructWithMarshal",
    "GetIntArray",
    "ArrayRelationOutInitBoolArray",
    "BoolArrayTest",
    "GetFirstCharacter",
    "GetFirstAnsiCharacter",
    "BoolToIntTest",
    "SetAllElements",
    "FirstElementOrZero",
    "AddOne",
    "PassThroughEnum",
    "EnumOut",
    "SumValues",
    "VerifyReservedParam",
    "VerifyReservedBits",
    "And",
    "GetSimpleStruct",
    "GetWrapper",
    "GetIntToBoolArray",
    "GetName",
    "PassThroughBitField",
    "PassThroughTaggedWide",
    "InitStructSizeRelation",
    "InitReservedRelation",
    "ArrayRelationInInterfaceArray",
    "RunCallbackProbe",
];

static EXEC_LOCK: Mutex<()> = Mutex::new(());

/// Both sides of one fixture execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferentialExecution {
    /// Rendered result of the exported entry point.
    pub impl_output: String,
    /// Rendered result of the reference model.
    pub reference_output: String,
    /// `impl_output == reference_output`.
    pub parity: bool,
    /// Contract violations the entry point recorded during the call.
    pub violations: u64,
    /// Mode the case ran under.
    pub mode: ContractMode,
    pub note: Option<String>,
}

/// Why a case could not be executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("unsupported function `{0}`")]
    UnsupportedFunction(String),
    #[error("unknown mode `{0}`")]
    UnknownMode(String),
    #[error("{function}: missing input `{field}`")]
    MissingInput { function: String, field: String },
    #[error("{function}: input `{field}` {detail}")]
    InvalidInput {
        function: String,
        field: String,
        detail: String,
    },
}

/// Returns true if `function` can be executed.
#[must_use]
pub fn supports(function: &str) -> bool {
    SUPPORTED_FUNCTIONS.contains(&function)
}

/// Parse a fixture mode label. `both` is resolved by the runner before it
/// reaches the executor.
pub fn parse_mode(mode: &str) -> Result<ContractMode, ExecError> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(ContractMode::Strict),
        "hardened" => Ok(ContractMode::Hardened),
        "off" => Ok(ContractMode::Off),
        other => Err(ExecError::UnknownMode(other.to_string())),
    }
}

/// Execute `function` with `inputs` under `mode`.
pub fn execute_fixture_case(
    function: &str,
    inputs: &Value,
    mode: &str,
) -> Result<DifferentialExecution, ExecError> {
    let mode = parse_mode(mode)?;
    let Some(symbol) = SUPPORTED_FUNCTIONS.iter().copied().find(|f| *f == function) else {
        return Err(ExecError::UnsupportedFunction(function.to_string()));
    };
    let _guard = EXEC_LOCK.lock();
    set_contract_mode(mode);
    let before = recorded_violations(symbol);
    let inputs = Inputs {
        function: symbol,
        value: inputs,
    };
    let outcome = dispatch(&inputs, mode)?;
    let violations = recorded_violations(symbol).saturating_sub(before);

    Ok(DifferentialExecution {
        parity: outcome.impl_output == outcome.reference_output,
        impl_output: outcome.impl_output,
        reference_output: outcome.reference_output,
        violations,
        mode,
        note: outcome.note,
    })
}

fn recorded_violations(symbol: &str) -> u64 {
    runtime_policy::entry_stats(symbol).map_or(0, |s| s.violations)
}

// ---------------------------------------------------------------------------
// Input decoding
// ---------------------------------------------------------------------------

struct Inputs<'a> {
    function: &'static str,
    value: &'a Value,
}

impl Inputs<'_> {
    fn missing(&self, field: &str) -> ExecError {
        ExecError::MissingInput {
            function: self.function.to_string(),
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, detail: impl Into<String>) -> ExecError {
        ExecError::InvalidInput {
            function: self.function.to_string(),
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    fn parse<T: DeserializeOwned>(&self, field: &str, v: &Value) -> Result<T, ExecError> {
        serde_json::from_value(v.clone()).map_err(|e| self.invalid(field, e.to_string()))
    }

    /// Required, non-null value.
    fn scalar<T: DeserializeOwned>(&self, field: &str) -> Result<T, ExecError> {
        match self.value.get(field) {
            None | Some(Value::Null) => Err(self.missing(field)),
            Some(v) => self.parse(field, v),
        }
    }

    /// Required key whose `null` means a null pointer.
    fn pointer<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, ExecError> {
        match self.value.get(field) {
            None => Err(self.missing(field)),
            Some(Value::Null) => Ok(None),
            Some(v) => self.parse(field, v).map(Some),
        }
    }

    /// Optional key with a default.
    fn or<T: DeserializeOwned>(&self, field: &str, default: T) -> Result<T, ExecError> {
        match self.value.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => self.parse(field, v),
        }
    }

    /// Length argument; defaults to the backing buffer's length.
    fn count(&self, backing: usize) -> Result<c_int, ExecError> {
        let default = c_int::try_from(backing).map_err(|_| self.invalid("count", "backing buffer too large"))?;
        self.or("count", default)
    }

    /// Out-buffer capacity: absent means `count` elements, `null` a null pointer.
    fn out_capacity(&self, field: &str, count: c_int) -> Result<Option<usize>, ExecError> {
        match self.value.get(field) {
            None => Ok(Some(usize::try_from(count).unwrap_or(0))),
            Some(Value::Null) => Ok(None),
            Some(v) => self.parse(field, v).map(Some),
        }
    }

    fn text(&self, field: &str) -> Result<Option<String>, ExecError> {
        self.pointer(field)
    }

    /// NUL-terminated narrow string; `null` is a null pointer.
    fn ansi(&self, field: &str) -> Result<Option<Vec<c_char>>, ExecError> {
        let Some(text) = self.text(field)? else {
            return Ok(None);
        };
        if text.bytes().any(|b| b == 0) {
            return Err(self.invalid(field, "contains an interior NUL"));
        }
        Ok(Some(
            text.bytes()
                .map(|b| b as c_char)
                .chain(std::iter::once(0))
                .collect(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Outcome assembly
// ---------------------------------------------------------------------------

struct Outcome {
    impl_output: String,
    reference_output: String,
    note: Option<String>,
}

impl Outcome {
    fn undefined(reason: &str) -> Self {
        Self {
            impl_output: UNDEFINED.to_string(),
            reference_output: UNDEFINED.to_string(),
            note: Some(reason.to_string()),
        }
    }
}

/// Run a case whose contract status is known up front.
///
/// `violation` names the broken precondition, if any. Strict mode never calls
/// into a violating case; the safe-default modes call and compare against the
/// documented default.
fn guarded(
    mode: ContractMode,
    violation: Option<&str>,
    safe_default: impl Into<String>,
    reference: impl FnOnce() -> String,
    call: impl FnOnce() -> String,
) -> Outcome {
    match violation {
        Some(reason) if mode.is_fatal() => {
            Outcome::undefined(&format!("contract violation ({reason}) is fatal in strict mode"))
        }
        Some(reason) => Outcome {
            impl_output: call(),
            reference_output: safe_default.into(),
            note: Some(format!("contract violation ({reason}) answered with safe default")),
        },
        None => Outcome {
            impl_output: call(),
            reference_output: reference(),
            note: None,
        },
    }
}

fn negative(count: c_int) -> Option<&'static str> {
    (count < 0).then_some("negative length")
}

/// `count` elements would read past a buffer of `backing` elements.
fn overruns(count: c_int, backing: usize) -> bool {
    usize::try_from(count).is_ok_and(|n| n > backing)
}

fn opt_ptr<T>(value: Option<&T>) -> *const T {
    value.map_or(ptr::null(), ptr::from_ref)
}

fn opt_mut<T>(value: Option<&mut T>) -> *mut T {
    value.map_or(ptr::null_mut(), ptr::from_mut)
}

fn slice_ptr<T>(values: Option<&[T]>) -> *const T {
    values.map_or(ptr::null(), <[T]>::as_ptr)
}

fn utf16_nul(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn simple_structs(values: &[i32]) -> Vec<SimpleStruct> {
    values.iter().map(|&i| SimpleStruct { i }).collect()
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn dispatch(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    match inputs.function {
        "Add" => exec_add(inputs, mode),
        "Increment" => exec_increment(inputs, mode),
        "Sum" | "Product" => exec_sum_or_product(inputs, mode),
        "SumInner" => exec_sum_inner(inputs, mode),
        "ArrayRelationSum" => exec_array_relation_sum(inputs, mode),
        "ArrayRelationSumStructWithMarshal" => exec_sum_struct_with_marshal(inputs, mode),
        "GetIntArray" => exec_get_int_array(inputs, mode),
        "ArrayRelationOutInitBoolArray" => exec_init_bool_array(inputs, mode),
        "BoolArrayTest" => exec_bool_array(inputs, mode),
        "GetFirstCharacter" => exec_first_character(inputs, mode),
        "GetFirstAnsiCharacter" => exec_first_ansi_character(inputs, mode),
        "BoolToIntTest" => exec_bool_to_int(inputs, mode),
        "SetAllElements" => exec_set_all_elements(inputs, mode),
        "FirstElementOrZero" => exec_first_element_or_zero(inputs),
        "AddOne" => exec_add_one(inputs),
        "PassThroughEnum" => exec_pass_through_enum(inputs),
        "EnumOut" => exec_enum_out(inputs, mode),
        "SumValues" => exec_sum_values(inputs),
        "VerifyReservedParam" => exec_verify_reserved_param(inputs),
        "VerifyReservedBits" => exec_verify_reserved_bits(inputs),
        "And" => exec_and(inputs),
        "GetSimpleStruct" => Ok(same(
            || format!("{:?}", reference::get_simple_struct()),
            || format!("{:?}", unsafe { abi::get_simple_struct() }),
        )),
        "GetWrapper" => Ok(same(
            || format!("{:?}", reference::get_wrapper()),
            || format!("{:?}", unsafe { abi::get_wrapper() }),
        )),
        "GetIntToBoolArray" => Ok(same(
            || format!("{:?}", reference::get_int_to_bool_array()),
            || format!("{:?}", unsafe { abi::get_int_to_bool_array() }),
        )),
        "GetName" => Ok(same(
            || reference::NAME.to_string_lossy().into_owned(),
            || {
                let name = unsafe { abi::get_name() };
                if name.is_null() {
                    return "null".to_string();
                }
                unsafe { std::ffi::CStr::from_ptr(name) }
                    .to_string_lossy()
                    .into_owned()
            },
        )),
        "PassThroughBitField" => exec_pass_through_bit_field(inputs),
        "PassThroughTaggedWide" => exec_pass_through_tagged_wide(inputs),
        "InitStructSizeRelation" => exec_init_struct_size_relation(inputs, mode),
        "InitReservedRelation" => exec_init_reserved_relation(inputs, mode),
        "ArrayRelationInInterfaceArray" => exec_interface_array(inputs, mode),
        "RunCallbackProbe" => exec_callback_probe(inputs, mode),
        other => Err(ExecError::UnsupportedFunction(other.to_string())),
    }
}

/// A case with no contract preconditions.
fn same(reference: impl FnOnce() -> String, call: impl FnOnce() -> String) -> Outcome {
    Outcome {
        impl_output: call(),
        reference_output: reference(),
        note: None,
    }
}

fn exec_add(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let lhs: Option<i32> = inputs.pointer("lhs")?;
    let rhs: Option<i32> = inputs.pointer("rhs")?;
    Ok(guarded(
        mode,
        lhs.is_none().then_some("null lhs"),
        "0",
        || lhs.map_or(0, |l| reference::add(l, rhs)).to_string(),
        || unsafe { abi::add(opt_ptr(lhs.as_ref()), opt_ptr(rhs.as_ref())) }.to_string(),
    ))
}

fn exec_increment(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let mut cell: Option<i32> = inputs.pointer("value")?;
    let initial = cell;
    Ok(guarded(
        mode,
        cell.is_none().then_some("null cell"),
        NO_OP,
        || {
            let mut v = initial.unwrap_or_default();
            reference::increment(&mut v);
            v.to_string()
        },
        || {
            unsafe { abi::increment(opt_mut(cell.as_mut())) };
            cell.map_or_else(|| NO_OP.to_string(), |v| v.to_string())
        },
    ))
}

fn exec_sum_or_product(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let is_sum = inputs.function == "Sum";
    let values: Option<Vec<i32>> = inputs.pointer("elements")?;
    let elements = values.as_deref().map(simple_structs);
    let count = inputs.count(elements.as_ref().map_or(0, Vec::len))?;
    if elements.as_ref().is_some_and(|e| overruns(count, e.len())) {
        return Ok(Outcome::undefined("count exceeds backing buffer"));
    }
    let empty = if is_sum { "0" } else { "1" };
    Ok(guarded(
        mode,
        negative(count),
        empty,
        || {
            let slice = elements
                .as_deref()
                .map_or(&[][..], |e| &e[..usize::try_from(count).unwrap_or(0)]);
            if is_sum {
                reference::sum(slice).to_string()
            } else {
                reference::product(slice).to_string()
            }
        },
        || {
            let p = slice_ptr(elements.as_deref());
            let result = unsafe { if is_sum { abi::sum(count, p) } else { abi::product(count, p) } };
            result.to_string()
        },
    ))
}

fn exec_sum_inner(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let values: Option<Vec<i32>> = inputs.pointer("elements")?;
    let elements: Option<Vec<StructAsClass>> =
        values.map(|v| v.into_iter().map(|i| StructAsClass { i }).collect());
    let backing = elements.as_ref().map_or(0, Vec::len);
    let count = inputs.count(backing)?;
    if overruns(count, backing) {
        return Ok(Outcome::undefined("count exceeds backing buffer"));
    }
    let violation = negative(count).or((count > 0 && elements.is_none()).then_some("null elements"));
    Ok(guarded(
        mode,
        violation,
        "0",
        || {
            let n = usize::try_from(count).unwrap_or(0);
            reference::sum_inner(elements.as_deref().map_or(&[][..], |e| &e[..n])).to_string()
        },
        || unsafe { abi::sum_inner(slice_ptr(elements.as_deref()), count) }.to_string(),
    ))
}

fn exec_array_relation_sum(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let values: Option<Vec<i32>> = inputs.pointer("elements")?;
    let elements = values.as_deref().map(simple_structs);
    let backing = elements.as_ref().map_or(0, Vec::len);
    let count = inputs.count(backing)?;
    if overruns(count, backing) {
        return Ok(Outcome::undefined("count exceeds backing buffer"));
    }
    let violation = negative(count).or((count > 0 && elements.is_none()).then_some("null elements"));
    Ok(guarded(
        mode,
        violation,
        "0",
        || {
            let n = usize::try_from(count).unwrap_or(0);
            reference::array_relation_sum(elements.as_deref().map_or(&[][..], |e| &e[..n])).to_string()
        },
        || unsafe { abi::array_relation_sum(count, slice_ptr(elements.as_deref())) }.to_string(),
    ))
}

fn exec_sum_struct_with_marshal(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let values: Option<Vec<[i32; 3]>> = inputs.pointer("elements")?;
    let elements: Option<Vec<StructWithMarshal>> =
        values.map(|v| v.into_iter().map(|i| StructWithMarshal { i }).collect());
    let backing = elements.as_ref().map_or(0, Vec::len);
    let count = inputs.count(backing)?;
    if overruns(count, backing) {
        return Ok(Outcome::undefined("count exceeds backing buffer"));
    }
    let violation = negative(count).or((count > 0 && elements.is_none()).then_some("null elements"));
    Ok(guarded(
        mode,
        violation,
        "0",
        || {
            let n = usize::try_from(count).unwrap_or(0);
            reference::sum_struct_with_marshal(elements.as_deref().map_or(&[][..], |e| &e[..n])).to_string()
        },
        || unsafe { abi::array_relation_sum_struct_with_marshal(count, slice_ptr(elements.as_deref())) }.to_string(),
    ))
}

/// Shared shape of the out-buffer entry points: a `count` and a buffer of
/// `out` elements pre-filled with `fill`. The output is the buffer after the
/// call.
fn out_buffer<T: Copy + std::fmt::Debug>(
    inputs: &Inputs<'_>,
    mode: ContractMode,
    fill: T,
    reference_fill: impl FnOnce(&mut [T]),
    call: impl FnOnce(c_int, *mut T),
) -> Result<Outcome, ExecError> {
    let count: c_int = inputs.scalar("count")?;
    let capacity = inputs.out_capacity("out", count)?;
    if capacity.is_some_and(|cap| overruns(count, cap)) {
        return Ok(Outcome::undefined("count exceeds backing buffer"));
    }
    let mut buffer = capacity.map(|cap| vec![fill; cap]);
    let untouched = buffer
        .as_ref()
        .map_or_else(|| NO_OP.to_string(), |b| format!("{b:?}"));
    let violation = negative(count).or((count > 0 && buffer.is_none()).then_some("null out"));
    let expected = buffer.clone();
    Ok(guarded(
        mode,
        violation,
        untouched,
        || match expected {
            Some(mut b) => {
                let n = usize::try_from(count).unwrap_or(0);
                reference_fill(&mut b[..n]);
                format!("{b:?}")
            }
            None => NO_OP.to_string(),
        },
        || {
            let p = buffer.as_mut().map_or(ptr::null_mut(), |b| b.as_mut_ptr());
            call(count, p);
            buffer.map_or_else(|| NO_OP.to_string(), |b| format!("{b:?}"))
        },
    ))
}

fn exec_get_int_array(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    out_buffer(inputs, mode, -1i32, reference::get_int_array, |count, p| unsafe {
        abi::get_int_array(count, p);
    })
}

fn exec_init_bool_array(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    out_buffer(inputs, mode, 0u8, reference::init_bool_array, |count, p| unsafe {
        abi::array_relation_out_init_bool_array(p, count);
    })
}

fn exec_bool_array(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let input: Vec<u8> = inputs.scalar("input")?;
    let count = inputs.count(input.len())?;
    if overruns(count, input.len()) {
        return Ok(Outcome::undefined("count exceeds backing buffer"));
    }
    let source = input.clone();
    out_buffer(
        inputs,
        mode,
        0xFFu8,
        |out| reference::bool_array(&source, out),
        |count, p| unsafe { abi::bool_array_test(input.as_ptr(), p, count) },
    )
}

fn exec_first_character(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let text = inputs.text("text")?.map(|t| utf16_nul(&t));
    Ok(guarded(
        mode,
        text.is_none().then_some("null text"),
        "0",
        || {
            let units = text.as_deref().unwrap_or_default();
            let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
            reference::first_unit(&units[..end]).to_string()
        },
        || unsafe { abi::get_first_character(slice_ptr(text.as_deref())) }.to_string(),
    ))
}

fn exec_first_ansi_character(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let text = inputs.ansi("text")?;
    Ok(guarded(
        mode,
        text.is_none().then_some("null text"),
        "0",
        || {
            let bytes: Vec<u8> = text
                .iter()
                .flatten()
                .take_while(|&&c| c != 0)
                .map(|&c| c as u8)
                .collect();
            reference::first_unit(&bytes).to_string()
        },
        || (unsafe { abi::get_first_ansi_character(slice_ptr(text.as_deref())) } as u8).to_string(),
    ))
}

fn exec_bool_to_int(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let value: i32 = inputs.scalar("value")?;
    let null_out: bool = inputs.or("null_out", false)?;
    let mut out = (!null_out).then_some(-1i32);
    Ok(guarded(
        mode,
        null_out.then_some("null out"),
        NO_OP,
        || reference::bool_to_int(value).to_string(),
        || {
            unsafe { abi::bool_to_int_test(value, opt_mut(out.as_mut())) };
            out.map_or_else(|| NO_OP.to_string(), |v| v.to_string())
        },
    ))
}

fn exec_set_all_elements(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let mut target: Option<StructWithMarshal> =
        inputs.pointer::<[i32; 3]>("target")?.map(|i| StructWithMarshal { i });
    let initial = target;
    Ok(guarded(
        mode,
        target.is_none().then_some("null target"),
        NO_OP,
        || {
            let mut t = initial.unwrap_or_default();
            reference::set_all_elements(&mut t);
            format!("{:?}", t.i)
        },
        || {
            unsafe { abi::set_all_elements(opt_mut(target.as_mut())) };
            target.map_or_else(|| NO_OP.to_string(), |t| format!("{:?}", t.i))
        },
    ))
}

fn exec_first_element_or_zero(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value: Option<StructWithMarshal> = inputs.pointer::<[i32; 3]>("value")?.map(|i| StructWithMarshal { i });
    Ok(same(
        || reference::first_element_or_zero(value.as_ref()).to_string(),
        || unsafe { abi::first_element_or_zero(opt_ptr(value.as_ref())) }.to_string(),
    ))
}

fn exec_add_one(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let mut value: Option<SimpleStruct> = inputs.pointer::<i32>("value")?.map(|i| SimpleStruct { i });
    let mut expected = value;
    Ok(same(
        || {
            reference::add_one(expected.as_mut());
            expected.map_or_else(|| NO_OP.to_string(), |v| v.i.to_string())
        },
        || {
            unsafe { abi::add_one(opt_mut(value.as_mut())) };
            value.map_or_else(|| NO_OP.to_string(), |v| v.i.to_string())
        },
    ))
}

fn exec_pass_through_enum(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value = MyEnum(inputs.scalar("value")?);
    Ok(same(
        || reference::pass_through_enum(value).0.to_string(),
        || unsafe { abi::pass_through_enum(value) }.0.to_string(),
    ))
}

fn exec_enum_out(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let null_out: bool = inputs.or("null_out", false)?;
    let mut out = (!null_out).then_some(MyEnum(0));
    Ok(guarded(
        mode,
        null_out.then_some("null out"),
        NO_OP,
        || reference::enum_out().0.to_string(),
        || {
            unsafe { abi::enum_out(opt_mut(out.as_mut())) };
            out.map_or_else(|| NO_OP.to_string(), |v| v.0.to_string())
        },
    ))
}

fn exec_sum_values(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value = LargeStruct { i: inputs.scalar("value")? };
    Ok(same(
        || reference::sum_values(&value).to_string(),
        || unsafe { abi::sum_values(value) }.to_string(),
    ))
}

fn exec_verify_reserved_param(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value: i32 = inputs.scalar("value")?;
    Ok(same(
        || reference::verify_reserved_param(value).to_string(),
        || unsafe { abi::verify_reserved_param(value) }.to_string(),
    ))
}

fn exec_verify_reserved_bits(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value = BitField2::new(
        inputs.or("lower_bits", 0)?,
        inputs.scalar("reserved_bits")?,
        inputs.or("upper_bits", 0)?,
    );
    Ok(same(
        || reference::verify_reserved_bits(value).to_string(),
        || unsafe { struct_abi::verify_reserved_bits(value) }.to_string(),
    ))
}

fn exec_and(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value = IntToBoolArray { i: inputs.scalar("value")? };
    Ok(same(
        || reference::and(&value).to_string(),
        || unsafe { abi::and(value) }.to_string(),
    ))
}

fn exec_pass_through_bit_field(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value = BitField::new(inputs.scalar("first_bit")?, inputs.scalar("last_bits")?);
    let render = |v: BitField| format!("first_bit={} last_bits={}", v.first_bit(), v.last_bits());
    Ok(same(
        || render(value),
        || render(unsafe { struct_abi::pass_through_bit_field(value) }),
    ))
}

fn exec_pass_through_tagged_wide(inputs: &Inputs<'_>) -> Result<Outcome, ExecError> {
    let value = TaggedWide {
        wide: inputs.scalar("wide")?,
        narrow: inputs.scalar("narrow")?,
    };
    Ok(same(
        || format!("{value:?}"),
        || format!("{:?}", unsafe { struct_abi::pass_through_tagged_wide(value) }),
    ))
}

fn exec_init_struct_size_relation(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let null_target: bool = inputs.or("null_target", false)?;
    let mut initial = StructSizeRelation::new(inputs.or("flags", 0)?, inputs.or("value", 0.0)?);
    initial.cb_size = inputs.or("cb_size", StructSizeRelation::NATIVE_SIZE)?;
    let mut target = (!null_target).then_some(initial);
    let render = |status: Status, t: &StructSizeRelation| {
        format!("{status}; flags={} value={:?}", t.flags, t.value)
    };
    Ok(guarded(
        mode,
        null_target.then_some("null target"),
        Status::INVALID_POINTER.to_string(),
        || {
            let mut t = initial;
            let status = reference::init_struct_size_relation(&mut t);
            render(status, &t)
        },
        || {
            let status = unsafe { struct_abi::init_struct_size_relation(opt_mut(target.as_mut())) };
            match target {
                Some(t) => render(status, &t),
                None => status.to_string(),
            }
        },
    ))
}

fn exec_init_reserved_relation(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let null_target: bool = inputs.or("null_target", false)?;
    let mut target = (!null_target).then_some(ReservedRelation { reserved: 0, value: 0 });
    let render = |status: Status, t: &ReservedRelation| {
        format!("{status}; reserved={} value={}", t.reserved, t.value)
    };
    Ok(guarded(
        mode,
        null_target.then_some("null target"),
        Status::INVALID_POINTER.to_string(),
        || {
            let mut t = ReservedRelation { reserved: 0, value: 0 };
            let status = reference::init_reserved_relation(&mut t);
            render(status, &t)
        },
        || {
            let status = unsafe { struct_abi::init_reserved_relation(opt_mut(target.as_mut())) };
            match target {
                Some(t) => render(status, &t),
                None => status.to_string(),
            }
        },
    ))
}

/// `count` elements from `GetInterfaces`, with the indices in `nulls`
/// replaced by null pointers.
fn exec_interface_array(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let count: c_int = inputs.scalar("count")?;
    let nulls: Vec<usize> = inputs.or("nulls", Vec::new())?;
    let n = usize::try_from(count).unwrap_or(0);
    if let Some(bad) = nulls.iter().find(|&&i| i >= n) {
        return Err(inputs.invalid("nulls", format!("index {bad} outside {n} elements")));
    }
    let violation = negative(count).or((!nulls.is_empty()).then_some("null element"));
    Ok(guarded(
        mode,
        violation,
        "0",
        || reference::sum_of_ones(std::iter::repeat_n(1, n)).to_string(),
        || {
            let mut slots = vec![ptr::null_mut::<c_void>(); n];
            unsafe { abi::get_interfaces(count.max(0), slots.as_mut_ptr()) };
            let owned: Vec<ComPtr<IElement>> = slots
                .iter()
                .filter_map(|&raw| unsafe { ComPtr::from_raw(raw) })
                .collect();
            for &i in &nulls {
                slots[i] = ptr::null_mut();
            }
            let result = unsafe { abi::array_relation_in_interface_array(count, slots.as_ptr()) };
            drop(owned);
            result.to_string()
        },
    ))
}

/// Probe the native reference callback; the output lists mismatching report
/// fields, `[]` when the callback conforms.
fn exec_callback_probe(inputs: &Inputs<'_>, mode: ContractMode) -> Result<Outcome, ExecError> {
    let callback: Option<String> = inputs.pointer("callback")?;
    if let Some(kind) = callback.as_deref().filter(|k| *k != "reference") {
        return Err(inputs.invalid("callback", format!("unknown callback `{kind}`")));
    }
    let expected = CallbackProbeReport::expected(HANDLER_NAME);
    Ok(guarded(
        mode,
        callback.is_none().then_some("null callback"),
        Status::INVALID_POINTER.to_string(),
        || format!("{}; {:?}", Status::OK, Vec::<&str>::new()),
        || {
            let raw = if callback.is_some() {
                unsafe { create_reference_callback() }
            } else {
                ptr::null_mut()
            };
            let mut report = CallbackProbeReport::default();
            let status = unsafe { run_callback_probe(raw, &mut report) };
            drop(unsafe { ComPtr::<ICallback>::from_raw(raw) });
            if status.is_ok() {
                format!("{status}; {:?}", report.mismatches(&expected))
            } else {
                status.to_string()
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(function: &str, inputs: Value, mode: &str) -> DifferentialExecution {
        execute_fixture_case(function, &inputs, mode).unwrap()
    }

    #[test]
    fn every_supported_function_dispatches() {
        for function in SUPPORTED_FUNCTIONS {
            let err = execute_fixture_case(function, &json!({}), "hardened").err();
            assert!(
                !matches!(err, Some(ExecError::UnsupportedFunction(_))),
                "{function} is listed but not dispatched"
            );
        }
    }

    #[test]
    fn add_with_and_without_optional_rhs() {
        let both = run("Add", json!({"lhs": 2, "rhs": 3}), "strict");
        assert_eq!(both.impl_output, "5");
        assert!(both.parity);
        let lhs_only = run("Add", json!({"lhs": 2, "rhs": null}), "strict");
        assert_eq!(lhs_only.impl_output, "2");
    }

    #[test]
    fn strict_violation_is_not_executed() {
        let run = run("Add", json!({"lhs": null, "rhs": 1}), "strict");
        assert_eq!(run.impl_output, UNDEFINED);
        assert_eq!(run.violations, 0);
        assert!(run.note.unwrap().contains("null lhs"));
    }

    #[test]
    fn hardened_violation_returns_safe_default() {
        let run = run("Sum", json!({"elements": [1, 2], "count": -1}), "hardened");
        assert_eq!(run.impl_output, "0");
        assert!(run.parity);
        assert_eq!(run.violations, 1);
        assert_eq!(run.mode, ContractMode::Hardened);
    }

    #[test]
    fn product_of_nothing_is_one() {
        let run = run("Product", json!({"elements": null, "count": 4}), "strict");
        assert_eq!((run.impl_output.as_str(), run.parity), ("1", true));
    }

    #[test]
    fn count_past_buffer_is_undefined_in_every_mode() {
        for mode in ["strict", "hardened"] {
            let run = run("ArrayRelationSum", json!({"elements": [1], "count": 3}), mode);
            assert_eq!(run.impl_output, UNDEFINED);
        }
    }

    #[test]
    fn out_buffers_render_whole_buffer() {
        let run = run("GetIntArray", json!({"count": 3, "out": 5}), "strict");
        assert_eq!(run.impl_output, "[0, 1, 2, -1, -1]");
        assert!(run.parity);
        let hardened = run_hardened_null_out();
        assert_eq!(hardened.impl_output, NO_OP);
        assert!(hardened.parity);
    }

    fn run_hardened_null_out() -> DifferentialExecution {
        run("ArrayRelationOutInitBoolArray", json!({"count": 2, "out": null}), "hardened")
    }

    #[test]
    fn characters_and_strings() {
        assert_eq!(run("GetFirstCharacter", json!({"text": "\u{263A}x"}), "strict").impl_output, "9786");
        assert_eq!(run("GetFirstAnsiCharacter", json!({"text": "ABC"}), "strict").impl_output, "65");
        assert_eq!(run("GetFirstAnsiCharacter", json!({"text": ""}), "strict").impl_output, "0");
        assert_eq!(run("GetName", json!({}), "strict").impl_output, "Functions");
    }

    #[test]
    fn size_relation_rejects_bad_size() {
        let run = run("InitStructSizeRelation", json!({"cb_size": 3, "flags": 7, "value": 2.5}), "strict");
        assert!(run.impl_output.starts_with("invalid_argument"));
        assert!(run.impl_output.ends_with("flags=7 value=2.5"));
        assert!(run.parity);
    }

    #[test]
    fn interface_array_with_null_member() {
        let clean = run("ArrayRelationInInterfaceArray", json!({"count": 3}), "strict");
        assert_eq!(clean.impl_output, "3");
        let holed = run("ArrayRelationInInterfaceArray", json!({"count": 3, "nulls": [1]}), "hardened");
        assert_eq!(holed.impl_output, "0");
        assert!(holed.parity);
    }

    #[test]
    fn reference_callback_probes_clean() {
        let run = run("RunCallbackProbe", json!({"callback": "reference"}), "strict");
        assert_eq!(run.impl_output, "ok; []");
        assert!(run.parity);
    }

    #[test]
    fn bad_inputs_are_errors() {
        assert_eq!(
            execute_fixture_case("Add", &json!({"rhs": 1}), "strict"),
            Err(ExecError::MissingInput {
                function: "Add".into(),
                field: "lhs".into()
            })
        );
        assert!(matches!(
            execute_fixture_case("Nope", &json!({}), "strict"),
            Err(ExecError::UnsupportedFunction(_))
        ));
        assert!(matches!(
            execute_fixture_case("Add", &json!({}), "lenient"),
            Err(ExecError::UnknownMode(_))
        ));
    }
}
