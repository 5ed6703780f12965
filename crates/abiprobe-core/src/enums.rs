//! Native enums as raw integer newtypes.
//!
//! A Rust `enum` cannot hold a discriminant outside its declared set, but a
//! native caller can pass one. These newtypes keep the raw bit pattern so a
//! pass-through never rewrites an undeclared value.

use std::fmt;

/// `enum MyEnum { TestValue = 1 }`, 32-bit underlying type.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MyEnum(pub i32);

impl MyEnum {
    pub const TEST_VALUE: Self = Self(1);

    /// Declared name, or `None` for a value outside the declared set.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("TestValue"),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_declared(self) -> bool {
        self.name().is_some()
    }
}

impl fmt::Display for MyEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "MyEnum({})", self.0),
        }
    }
}

/// Operation selector for `ICallback::ModifyPointer`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodOperation(pub i32);

impl MethodOperation {
    pub const INCREMENT: Self = Self(0);
    pub const PASS_THROUGH: Self = Self(1);

    /// Reference semantics: pass-through returns the pointer unchanged, any
    /// other operation advances it by one byte.
    #[must_use]
    pub const fn apply(self, ptr: isize) -> isize {
        if self.0 == Self::PASS_THROUGH.0 {
            ptr
        } else {
            ptr.wrapping_add(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_values_keep_bits() {
        let raw = MyEnum(-7);
        assert!(!raw.is_declared());
        assert_eq!(raw.0, -7);
        assert_eq!(raw.to_string(), "MyEnum(-7)");
        assert_eq!(MyEnum::TEST_VALUE.to_string(), "TestValue");
    }

    #[test]
    fn method_operation_semantics() {
        assert_eq!(MethodOperation::PASS_THROUGH.apply(5), 5);
        assert_eq!(MethodOperation::INCREMENT.apply(5), 6);
        assert_eq!(MethodOperation(0).apply(5), 6);
        assert_eq!(MethodOperation(99).apply(isize::MAX), isize::MIN);
    }
}
