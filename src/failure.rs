//! Central assertion-failure handler.
//!
//! Every assertion macro funnels into [`on_assertion_failed`], which
//! prints the diagnostic line and decides whether the failure may abort
//! the running test with a non-local exit. The decision is a cascade of
//! checks evaluated last-match-wins: each later condition, if it holds,
//! overrides both the label and the raise decision of earlier ones. Only
//! the base case actually raises; every other matched condition degrades
//! to latching the sticky failure flag: unwinding out of a foreign
//! thread, an in-flight unwind, or a destructor is unsafe, yet the
//! failure must still fail the owning test.

use std::panic;
use std::sync::Once;

use crate::context;

/// Panic payload used as the "abort this test" signal. Recognized only at
/// the runner boundary; never treated as an ordinary error.
pub struct TestAbort;

/// Execution context a failing assertion was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Ordinary failure in the body of the running test.
    Failed,
    /// No test is executing anywhere in the process.
    OutsideTests,
    /// A test triggered nested test execution.
    Nested,
    /// The calling thread never entered the runner.
    SecondaryThread,
    /// A panic is already propagating on this thread.
    DuringUnwind,
    /// The reporting function is a destructor.
    InDestructor,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::Failed => "ASSERT FAILED",
            Classification::OutsideTests => "ASSERT FAILED OUTSIDE TESTS",
            Classification::Nested => "NESTED ASSERT FAILED",
            Classification::SecondaryThread => "ASSERT FAILED IN SECONDARY THREAD",
            Classification::DuringUnwind => "ASSERT FAILED IN EXCEPTION PROCESSING",
            Classification::InDestructor => "ASSERT FAILED IN DESTRUCTOR",
        }
    }
}

/// What the failing assertion site should do next.
#[derive(Debug, Clone, Copy)]
pub struct Disposition {
    pub classification: Classification,
    /// When true the assertion site raises [`TestAbort`].
    pub raise: bool,
}

/// Records an assertion failure, prints its diagnostic line, and returns
/// the raise decision for the assertion site.
pub fn on_assertion_failed(file: &str, line: u32, function: &str, message: &str) -> Disposition {
    let mut classification = Classification::Failed;
    let mut raise = true;

    if context::global_depth() == 0 {
        // Nothing to unwind into, and no test to attribute this to.
        classification = Classification::OutsideTests;
        raise = false;
    }

    if context::global_depth() > 1 {
        classification = Classification::Nested;
    }

    if context::thread_depth() == 0 && context::global_depth() > 0 {
        classification = Classification::SecondaryThread;
        context::set_sticky_failure();
        raise = false;
    }

    if std::thread::panicking() {
        classification = Classification::DuringUnwind;
        context::set_sticky_failure();
        raise = false;
    }

    if is_destructor(function) {
        classification = Classification::InDestructor;
        context::set_sticky_failure();
        raise = false;
    }

    println!(
        "{}:{}: assert: '{}' {} in {}",
        file,
        line,
        message,
        classification.label(),
        function
    );

    Disposition {
        classification,
        raise,
    }
}

/// A Rust destructor is `Drop::drop`; the function path of an assertion
/// inside one ends with `::drop`.
fn is_destructor(function: &str) -> bool {
    function.ends_with("::drop")
}

#[doc(hidden)]
pub fn trim_path_probe(raw: &'static str) -> &'static str {
    raw.strip_suffix("::__f").unwrap_or(raw)
}

/// Expands to the path of the enclosing function.
#[macro_export]
macro_rules! function_path {
    () => {{
        fn __f() {}
        $crate::failure::trim_path_probe(::core::any::type_name_of_val(&__f))
    }};
}

/// Installs, once per process, a panic-hook filter that keeps the default
/// hook quiet for [`TestAbort`] signals and for panics inside a test
/// body. The runner reprints in-test panics itself at the boundary, so
/// delegating them to the default hook would report every failure twice.
pub(crate) fn install_panic_filter() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().is::<TestAbort>() || context::thread_depth() > 0 {
                return;
            }
            previous(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestGuard;
    use crate::test_util::serial;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::mpsc;

    fn fail_here(function: &str) -> Disposition {
        on_assertion_failed("probe.rs", 1, function, "probe")
    }

    #[test]
    fn base_case_raises_without_latching() {
        let _serial = serial();
        let _guard = TestGuard::enter();
        let disposition = fail_here("attest::case_body");
        assert_eq!(disposition.classification, Classification::Failed);
        assert!(disposition.raise);
        assert!(!context::sticky_failure());
    }

    #[test]
    fn outside_tests_never_raises() {
        let _serial = serial();
        let disposition = fail_here("attest::free_function");
        assert_eq!(disposition.classification, Classification::OutsideTests);
        assert!(!disposition.raise);
        assert!(!context::sticky_failure());
    }

    #[test]
    fn nested_execution_still_raises() {
        let _serial = serial();
        let _outer = TestGuard::enter();
        let _inner = TestGuard::enter();
        let disposition = fail_here("attest::case_body");
        assert_eq!(disposition.classification, Classification::Nested);
        assert!(disposition.raise);
    }

    #[test]
    fn secondary_thread_latches_instead_of_raising() {
        let _serial = serial();
        let _guard = TestGuard::enter();
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            sender
                .send(fail_here("attest::worker"))
                .expect("send disposition");
        })
        .join()
        .expect("worker thread");
        let disposition = receiver.recv().expect("recv disposition");
        assert_eq!(disposition.classification, Classification::SecondaryThread);
        assert!(!disposition.raise);
        assert!(context::sticky_failure());
    }

    #[test]
    fn destructor_context_latches_instead_of_raising() {
        let _serial = serial();
        let _guard = TestGuard::enter();
        let disposition = fail_here("attest::<impl Drop for Thing>::drop");
        assert_eq!(disposition.classification, Classification::InDestructor);
        assert!(!disposition.raise);
        assert!(context::sticky_failure());
    }

    #[test]
    fn unwind_context_latches_instead_of_raising() {
        let _serial = serial();
        let _guard = TestGuard::enter();
        let (sender, receiver) = mpsc::channel();

        struct Probe(mpsc::Sender<Disposition>);
        impl Drop for Probe {
            fn drop(&mut self) {
                // Reported from a plain function, not the destructor
                // itself, so only the unwind check can match.
                let _ = self.0.send(fail_here("attest::report_helper"));
            }
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _probe = Probe(sender);
            panic::panic_any(TestAbort);
        }));
        assert!(result.is_err());
        let disposition = receiver.recv().expect("recv disposition");
        assert_eq!(disposition.classification, Classification::DuringUnwind);
        assert!(!disposition.raise);
        assert!(context::sticky_failure());
    }

    // Pins the last-match-wins precedence: a destructor running while a
    // panic is already propagating is labeled as destructor context.
    #[test]
    fn destructor_overrides_unwind_classification() {
        let _serial = serial();
        let _guard = TestGuard::enter();
        let (sender, receiver) = mpsc::channel();

        struct Probe(mpsc::Sender<Disposition>);
        impl Drop for Probe {
            fn drop(&mut self) {
                let _ = self
                    .0
                    .send(fail_here("attest::<impl Drop for Probe>::drop"));
            }
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _probe = Probe(sender);
            panic::panic_any(TestAbort);
        }));
        assert!(result.is_err());
        let disposition = receiver.recv().expect("recv disposition");
        assert_eq!(disposition.classification, Classification::InDestructor);
        assert!(!disposition.raise);
    }

    #[test]
    fn function_path_names_the_enclosing_function() {
        let path = function_path!();
        assert!(
            path.ends_with("::function_path_names_the_enclosing_function"),
            "unexpected path: {path}"
        );
    }

    #[test]
    fn function_path_inside_drop_reads_as_destructor() {
        let (sender, receiver) = mpsc::channel();

        struct Probe(mpsc::Sender<&'static str>);
        impl Drop for Probe {
            fn drop(&mut self) {
                let _ = self.0.send(function_path!());
            }
        }

        drop(Probe(sender));
        let path = receiver.recv().expect("recv path");
        assert!(is_destructor(path), "unexpected path: {path}");
    }
}
