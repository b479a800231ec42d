//! Scoped capture of the process's standard-output channel.
//!
//! [`OutputCapture::start`] saves a duplicate of fd 1, swaps in the write
//! end of a fresh pipe, and spawns a listener thread that forwards every
//! byte read from the pipe to both the saved descriptor (so output stays
//! visible on the live console) and an in-memory buffer. [`stop`]
//! restores the original descriptor (closing the only write end, which
//! ends the listener with EOF), joins the listener, and returns the
//! accumulated text.
//!
//! One listener exists per active capture. Only one capture is active at
//! a time in current usage, but nesting is mechanically safe: an inner
//! capture's saved descriptor is simply the outer capture's pipe, so the
//! inner text is replayed into the outer buffer when the inner capture
//! stops.
//!
//! [`stop`]: OutputCapture::stop

use std::io::{self, Write};
use std::os::unix::io::RawFd;
use std::thread::{self, JoinHandle};

use crate::errors::HarnessError;

/// A live redirection of fd 1, released on [`stop`] or drop.
///
/// [`stop`]: OutputCapture::stop
pub struct OutputCapture {
    saved_stdout: RawFd,
    listener: Option<JoinHandle<Vec<u8>>>,
    captured: String,
}

impl OutputCapture {
    /// Redirects fd 1 into the capture pipe and starts the listener.
    ///
    /// Failure here is fatal to the run, not to one test: without the
    /// pipe, observability of every subsequent test is lost.
    pub fn start() -> Result<Self, HarnessError> {
        // Anything sitting in Rust's userspace stdout buffer belongs to
        // the pre-capture world; push it out through the old descriptor.
        let _ = io::stdout().flush();

        let saved_stdout = unsafe { libc::dup(libc::STDOUT_FILENO) };
        if saved_stdout < 0 {
            return Err(HarnessError::CaptureDup(io::Error::last_os_error()));
        }

        let mut pipe_fds = [0 as RawFd; 2];
        if unsafe { libc::pipe(pipe_fds.as_mut_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(saved_stdout) };
            return Err(HarnessError::CapturePipe(err));
        }
        let (pipe_read, pipe_write) = (pipe_fds[0], pipe_fds[1]);

        unsafe {
            libc::dup2(pipe_write, libc::STDOUT_FILENO);
            libc::close(pipe_write);
        }

        let listener = thread::spawn(move || forward_until_eof(pipe_read, saved_stdout));

        Ok(OutputCapture {
            saved_stdout,
            listener: Some(listener),
            captured: String::new(),
        })
    }

    /// Undoes the redirection and returns the captured text.
    ///
    /// Idempotent: the first call restores fd 1, drains the listener, and
    /// records the text; later calls return the same text with no
    /// further side effect. Output written to the standard channel before
    /// this call is included.
    pub fn stop(&mut self) -> String {
        if let Some(listener) = self.listener.take() {
            let _ = io::stdout().flush();
            unsafe {
                // Restoring fd 1 closes the pipe's last write end, which
                // is what lets the listener observe EOF.
                libc::dup2(self.saved_stdout, libc::STDOUT_FILENO);
            }
            let bytes = listener.join().unwrap_or_else(|_| {
                log::warn!("capture listener thread panicked; captured output lost");
                Vec::new()
            });
            unsafe { libc::close(self.saved_stdout) };
            self.captured = String::from_utf8_lossy(&bytes).into_owned();
        }
        self.captured.clone()
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tees bytes from the pipe to the saved descriptor and a buffer until
/// the write side closes.
fn forward_until_eof(pipe_read: RawFd, saved_stdout: RawFd) -> Vec<u8> {
    let mut chunk = [0u8; 1024];
    let mut buffer = Vec::new();
    loop {
        let count = unsafe {
            libc::read(
                pipe_read,
                chunk.as_mut_ptr() as *mut libc::c_void,
                chunk.len(),
            )
        };
        if count <= 0 {
            break;
        }
        let count = count as usize;
        let echoed = unsafe {
            libc::write(
                saved_stdout,
                chunk.as_ptr() as *const libc::c_void,
                count,
            )
        };
        if echoed < 0 {
            log::warn!("console echo failed; stopping capture listener");
            break;
        }
        buffer.extend_from_slice(&chunk[..count]);
    }
    unsafe { libc::close(pipe_read) };
    buffer
}
