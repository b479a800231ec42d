//! Harness error type.
//!
//! The only errors the harness itself can produce are infrastructure
//! failures while wiring up output capture. Assertion failures are not
//! errors in this sense; they flow through the classifier in
//! [`crate::failure`] and are contained at the single-test boundary.

use std::io;

use thiserror::Error;

/// Fatal harness failures. Any of these aborts the whole run: once the
/// capture channel cannot be established, no subsequent test's report can
/// be trusted.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unable to duplicate the standard output descriptor: {0}")]
    CaptureDup(#[source] io::Error),

    #[error("unable to create pipe to capture test output: {0}")]
    CapturePipe(#[source] io::Error),
}
