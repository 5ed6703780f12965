//! Helper macros for entry point generation.
//!
//! Provides the `abi_fn!` macro that generates
//! `#[unsafe(export_name = ...)] pub unsafe extern "system" fn` wrappers with
//! a call-accounting hookpoint.

/// Generate an exported entry point under a fixed native symbol name.
///
/// # Usage
///
/// ```ignore
/// abi_fn! {
///     /// Doc comment for the function.
///     fn sum as "Sum"(num: c_int, elements: *const SimpleStruct) -> c_int {
///         // implementation body
///     }
/// }
/// ```
///
/// This expands to a `pub unsafe extern "system" fn sum` exported as `Sum`.
/// The body runs inside an `unsafe` block and performs its own boundary
/// validation through the membrane views.
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident as $symbol:literal ( $($arg:ident : $argty:ty),* $(,)? ) $(-> $ret:ty)?
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(export_name = $symbol)]
        #[allow(unused_unsafe)]
        pub unsafe extern "system" fn $name( $($arg : $argty),* ) $(-> $ret)? {
            $crate::runtime_policy::enter($symbol);
            unsafe { $body }
        }
    };
}

pub(crate) use abi_fn;
