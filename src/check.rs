//! Assertion surface.
//!
//! Four forms, mirroring the classic unconditional / explicit-true /
//! explicit-false / must-panic quartet. Each failing form renders the
//! guarded expression, forwards it with its call site and enclosing
//! function to the failure classifier, and raises the abort signal only
//! when the classifier says it is safe to do so.

/// Asserts that an expression is true.
#[macro_export]
macro_rules! check {
    ($cond:expr) => {
        if !($cond) {
            $crate::__check_failed!(::core::stringify!($cond));
        }
    };
}

/// Asserts that an expression is true. Spelled out for call sites that
/// want the intent explicit.
#[macro_export]
macro_rules! check_true {
    ($cond:expr) => {
        if !($cond) {
            $crate::__check_failed!(::core::stringify!($cond));
        }
    };
}

/// Asserts that an expression is false.
#[macro_export]
macro_rules! check_false {
    ($cond:expr) => {
        if $cond {
            $crate::__check_failed!(::core::concat!("!(", ::core::stringify!($cond), ")"));
        }
    };
}

/// Asserts that evaluating an expression panics. Completing without a
/// panic is an ordinary assertion failure.
#[macro_export]
macro_rules! check_panics {
    ($body:expr) => {{
        let panicked = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
            let _ = $body;
        }))
        .is_err();
        if !panicked {
            $crate::__check_failed!(::core::concat!(
                "panics(",
                ::core::stringify!($body),
                ")"
            ));
        }
    }};
}

/// Shared failure tail of the assertion macros: classify, then raise the
/// abort signal if the classifier allows it.
#[doc(hidden)]
#[macro_export]
macro_rules! __check_failed {
    ($message:expr) => {
        if $crate::failure::on_assertion_failed(
            ::core::file!(),
            ::core::line!(),
            $crate::function_path!(),
            $message,
        )
        .raise
        {
            ::std::panic::panic_any($crate::failure::TestAbort);
        }
    };
}
