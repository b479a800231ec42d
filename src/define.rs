//! Declarative registration surface.
//!
//! `test_case!` (and the four helper-phase macros) define an ordinary
//! function and, next to it, a load-time registration entry in the
//! matching [`linkme`] distributed slice. Declarations can live in any
//! compilation unit; linking collects them with no central list.
//!
//! ```ignore
//! attest::test_case! {
//!     fn arithmetic_still_works() {
//!         attest::check!(2 + 2 == 4);
//!     }
//! }
//! ```

/// Declares a named test case and registers it at load time.
#[macro_export]
macro_rules! test_case {
    (fn $name:ident() $body:block) => {
        fn $name() $body

        const _: () = {
            #[$crate::linkme::distributed_slice($crate::registry::TEST_CASES)]
            #[linkme(crate = $crate::linkme)]
            static REGISTER: $crate::registry::TestCaseEntry = $crate::registry::TestCaseEntry {
                name: ::core::stringify!($name),
                file: ::core::file!(),
                line: ::core::line!(),
                run: $name,
            };
        };
    };
}

/// Declares a helper run before each test, outside the capture of the
/// test's nesting window.
#[macro_export]
macro_rules! test_setup {
    (fn $name:ident() $body:block) => {
        $crate::__register_helper! { Setup, fn $name() $body }
    };
}

/// Declares a helper run after each test completes.
#[macro_export]
macro_rules! test_teardown {
    (fn $name:ident() $body:block) => {
        $crate::__register_helper! { Teardown, fn $name() $body }
    };
}

/// Declares a helper run just before each test body, inside the test's
/// nesting window.
#[macro_export]
macro_rules! test_start {
    (fn $name:ident() $body:block) => {
        $crate::__register_helper! { Start, fn $name() $body }
    };
}

/// Declares a helper run just after each test body returns normally.
#[macro_export]
macro_rules! test_finish {
    (fn $name:ident() $body:block) => {
        $crate::__register_helper! { Finish, fn $name() $body }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __register_helper {
    ($phase:ident, fn $name:ident() $body:block) => {
        fn $name() $body

        const _: () = {
            #[$crate::linkme::distributed_slice($crate::registry::TEST_HELPERS)]
            #[linkme(crate = $crate::linkme)]
            static REGISTER: $crate::registry::HelperEntry = $crate::registry::HelperEntry {
                phase: $crate::registry::HelperPhase::$phase,
                run: $name,
            };
        };
    };
}
