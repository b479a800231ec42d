//! Test runner: drives the registry, wraps each test in output capture,
//! aggregates outcomes, prints the summary report, and maps the result
//! to a process exit status.
//!
//! Exactly one test executes at a time, on the runner's own thread. A
//! test body is free to spawn worker threads; the runner does not manage
//! them beyond the failure classifier's secondary-thread handling.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::time::Instant;

use crate::capture::OutputCapture;
use crate::context::{self, TestGuard};
use crate::errors::HarnessError;
use crate::failure::{self, TestAbort};
use crate::registry::{self, HelperPhase, TestCaseEntry};

/// Aggregate outcome of one [`run_all`] pass.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    pub fn all_passed(&self) -> bool {
        self.total == self.passed
    }
}

fn run_phase(phase: HelperPhase) {
    for helper in registry::helpers_for(phase) {
        (helper.run)();
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Runs one test case through its full lifecycle and reports whether it
/// passed.
///
/// Setup helpers run first, outside the nesting window. Inside the
/// window (depths bumped, sticky flag cleared) the guarded region runs
/// Start helpers, the body, and Finish helpers; an abort signal from the
/// classifier or a foreign panic is caught here and fails the test, and
/// Finish helpers are skipped in that case. A body that returns normally
/// passes only if the sticky flag stayed clear. Teardown helpers run
/// last, after the window closes.
pub fn run_single(entry: &TestCaseEntry) -> bool {
    failure::install_panic_filter();
    run_phase(HelperPhase::Setup);
    let passed = {
        let _guard = TestGuard::enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_phase(HelperPhase::Start);
            (entry.run)();
            run_phase(HelperPhase::Finish);
        }));
        match outcome {
            Ok(()) => !context::sticky_failure(),
            Err(payload) => {
                if !payload.is::<TestAbort>() {
                    println!(
                        "FAILED - Test failed with panic.  Error: {}",
                        describe_panic(payload.as_ref())
                    );
                }
                false
            }
        }
    };
    run_phase(HelperPhase::Teardown);
    passed
}

/// Runs every registered test in registration order and prints the
/// aggregate report.
///
/// The start marker is printed before capture begins, so it stays
/// visible live; body output is mirrored to the console through the
/// capture tee and replayed in the failure report for failing tests.
pub fn run_all() -> Result<RunSummary, HarnessError> {
    println!("== RUNNING TEST CASES ==");

    let tests = registry::snapshot_tests();
    let mut failed_output = String::new();
    let mut total = 0usize;
    let mut passed = 0usize;
    let started = Instant::now();

    for entry in &tests {
        println!("=== TEST: {} ===", entry.name);

        let mut capture = OutputCapture::start()?;

        total += 1;
        if run_single(entry) {
            passed += 1;
        } else {
            failed_output.push_str(&format!(
                "=== Failed Test: {} ===\n{}",
                entry.name,
                capture.stop()
            ));
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    let summary = RunSummary { total, passed };

    if !summary.all_passed() {
        println!("== Failed Tests ==");
        print!("{failed_output}");
        println!("== End Failed Tests ==");
    }

    println!("== TEST SUMMARY ==");
    println!("{:3} Total Tests", summary.total);
    println!("{:3} Tests Passed", summary.passed);
    if summary.all_passed() {
        println!("== TESTS PASSED in {elapsed:.3}s ==");
    } else {
        println!("{:3} Failed Tests", summary.failed());
        println!("== TESTS FAILED in {elapsed:.3}s ==");
    }

    Ok(summary)
}

/// Entry point for harness binaries: runs everything and maps the result
/// to the process exit status (zero iff every test passed).
pub fn harness_main() -> ExitCode {
    match run_all() {
        Ok(summary) if summary.all_passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
