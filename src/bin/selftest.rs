// The harness testing itself with itself: each registered test drives
// run_single on an ad-hoc entry and asserts on the reported outcome.
// Usage: cargo run --bin selftest

use std::process::ExitCode;

use attest::runner::run_single;
use attest::{check, check_false, check_panics, check_true, test_case, TestCaseEntry};

fn entry(name: &'static str, run: fn()) -> TestCaseEntry {
    TestCaseEntry {
        name,
        file: file!(),
        line: line!(),
        run,
    }
}

attest::test_case! {
    fn run_single_happy_case() {
        check!(run_single(&entry("inner_noop", || {})));
    }
}

test_case! {
    fn run_single_reports_failure() {
        check!(!run_single(&entry("inner_fails", || check!(false))));
    }
}

test_case! {
    fn check_passes() {
        check!(run_single(&entry("inner", || check!(true))));
    }
}

test_case! {
    fn check_fails() {
        check!(!run_single(&entry("inner", || check!(false))));
    }
}

test_case! {
    fn check_true_passes() {
        check!(run_single(&entry("inner", || check_true!(true))));
    }
}

test_case! {
    fn check_true_fails() {
        check!(!run_single(&entry("inner", || check_true!(false))));
    }
}

test_case! {
    fn check_false_passes() {
        check!(run_single(&entry("inner", || check_false!(false))));
    }
}

test_case! {
    fn check_false_fails() {
        check!(!run_single(&entry("inner", || check_false!(true))));
    }
}

test_case! {
    fn check_panics_passes() {
        check!(run_single(&entry("inner", || {
            check_panics!(panic!("expected"));
        })));
    }
}

test_case! {
    fn check_panics_fails() {
        check!(!run_single(&entry("inner", || {
            check_panics!((0, "no panic here"));
        })));
    }
}

test_case! {
    fn check_fails_on_secondary_thread() {
        check!(!run_single(&entry("inner", || {
            let worker = std::thread::spawn(|| check!(false));
            worker.join().expect("worker thread");
        })));
    }
}

test_case! {
    fn check_fails_in_destructor() {
        struct FailsOnDrop;
        impl Drop for FailsOnDrop {
            fn drop(&mut self) {
                check!(false);
            }
        }

        check!(!run_single(&entry("inner", || {
            let _guard = FailsOnDrop;
        })));
    }
}

test_case! {
    fn check_fails_in_destructor_during_unwind() {
        struct FailsOnDrop;
        impl Drop for FailsOnDrop {
            fn drop(&mut self) {
                check!(false);
            }
        }

        check!(!run_single(&entry("inner", || {
            let _guard = FailsOnDrop;
            check!(false);
        })));
    }
}

test_case! {
    fn foreign_panic_is_contained() {
        check!(!run_single(&entry("inner", || panic!("unrelated"))));
        check!(run_single(&entry("inner_clean", || {})));
    }
}

fn main() -> ExitCode {
    attest::harness_main()
}
