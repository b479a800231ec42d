//! Attest: a minimal self-registering unit-test harness.
//!
//! Test cases and lifecycle helpers declare themselves at load time from
//! any compilation unit ([`test_case!`], [`test_setup!`] and friends);
//! the runner executes them serially in registration order, captures the
//! process's standard output per test through a background listener, and
//! classifies every assertion failure by execution context (main body,
//! secondary thread, mid-unwind, destructor) so that a failure is raised
//! as a non-local exit only where doing so is safe, and latched otherwise.
//!
//! A harness binary is one line:
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     attest::harness_main()
//! }
//! ```
//!
//! The exit status is zero iff every registered test passed. The console
//! report format is a fixed plain-text contract (see [`runner`]).

pub mod capture;
pub mod check;
pub mod context;
pub mod define;
pub mod errors;
pub mod failure;
pub mod registry;
pub mod runner;

pub use capture::OutputCapture;
pub use errors::HarnessError;
pub use failure::{on_assertion_failed, Classification, Disposition, TestAbort};
pub use registry::{
    register_helper, register_test, HelperEntry, HelperPhase, HelperRegistration,
    OrderedRegistry, TestCaseEntry, TestRegistration,
};
pub use runner::{harness_main, run_all, run_single, RunSummary};

// The registration macros expand to linkme slice elements at the call
// site, so callers need a stable path to the linkme crate.
#[doc(hidden)]
pub use linkme;

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Depth counters, the sticky flag, registries, and fd 1 are process
    // globals; tests that touch them take this lock to keep libtest's
    // parallelism from interleaving them.
    static SERIAL: Mutex<()> = Mutex::new(());

    pub(crate) fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
