//! Process-wide run context: nesting depth counters and the sticky
//! failure flag.
//!
//! The runner is the only normal writer of the counters; the sticky flag
//! may additionally be set from any thread by the failure classifier, so
//! it uses release/acquire ordering (release on the failing thread's
//! store, acquire on the runner's read before the pass/fail decision).

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Number of test executions currently active anywhere in the process.
static GLOBAL_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Latched when a failure occurs somewhere control flow cannot safely be
/// interrupted (secondary thread, unwinding, destructor).
static STICKY_FAILURE: AtomicBool = AtomicBool::new(false);

thread_local! {
    /// Number of test executions active on the calling thread. Zero on
    /// any thread that never entered the runner.
    static THREAD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

pub fn global_depth() -> usize {
    GLOBAL_DEPTH.load(Ordering::SeqCst)
}

pub fn thread_depth() -> usize {
    THREAD_DEPTH.with(Cell::get)
}

pub(crate) fn set_sticky_failure() {
    STICKY_FAILURE.store(true, Ordering::Release);
}

pub fn sticky_failure() -> bool {
    STICKY_FAILURE.load(Ordering::Acquire)
}

fn clear_sticky_failure() {
    STICKY_FAILURE.store(false, Ordering::Release);
}

/// RAII wrapper around one test execution on the current thread.
///
/// Entering bumps both depth counters and clears the sticky flag so the
/// new test starts from a clean slate; dropping undoes the counters and
/// clears the flag again so a latched failure cannot leak into the next
/// test.
pub struct TestGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl TestGuard {
    pub fn enter() -> Self {
        GLOBAL_DEPTH.fetch_add(1, Ordering::SeqCst);
        THREAD_DEPTH.with(|d| d.set(d.get() + 1));
        clear_sticky_failure();
        TestGuard {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        GLOBAL_DEPTH.fetch_sub(1, Ordering::SeqCst);
        THREAD_DEPTH.with(|d| d.set(d.get() - 1));
        clear_sticky_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::serial;

    #[test]
    fn guard_tracks_depth_on_both_axes() {
        let _serial = serial();
        assert_eq!(global_depth(), 0);
        assert_eq!(thread_depth(), 0);
        {
            let _outer = TestGuard::enter();
            assert_eq!(global_depth(), 1);
            assert_eq!(thread_depth(), 1);
            let _inner = TestGuard::enter();
            assert_eq!(global_depth(), 2);
            assert_eq!(thread_depth(), 2);
        }
        assert_eq!(global_depth(), 0);
        assert_eq!(thread_depth(), 0);
    }

    #[test]
    fn guard_clears_sticky_flag_on_entry_and_exit() {
        let _serial = serial();
        set_sticky_failure();
        let guard = TestGuard::enter();
        assert!(!sticky_failure());
        set_sticky_failure();
        drop(guard);
        assert!(!sticky_failure());
    }

    #[test]
    fn spawned_thread_has_zero_thread_depth() {
        let _serial = serial();
        let _guard = TestGuard::enter();
        let depths = std::thread::spawn(|| (global_depth(), thread_depth()))
            .join()
            .expect("probe thread panicked");
        assert_eq!(depths, (1, 0));
    }
}
