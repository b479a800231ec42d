//! Test and helper registries.
//!
//! Test cases and lifecycle helpers are declared anywhere in the program
//! with the macros in [`crate::define`]; each declaration drops an entry
//! into a [`linkme`] distributed slice, so no central list-building step
//! exists. On first access the process-wide registries seed themselves
//! from those slices, preserving slice order as registration order, and
//! from then on expose an explicit register/unregister/iterate surface.
//!
//! Registration order is the execution order. The registries never hold
//! their lock while user code runs; the runner takes snapshots instead.

use std::sync::{Mutex, MutexGuard, PoisonError};

use linkme::distributed_slice;
use once_cell::sync::Lazy;

/// Load-time collection of every `test_case!` in the linked program.
#[distributed_slice]
pub static TEST_CASES: [TestCaseEntry];

/// Load-time collection of every helper declaration in the linked program.
#[distributed_slice]
pub static TEST_HELPERS: [HelperEntry];

/// A registered test case: a name, its source location, and a
/// zero-argument body.
#[derive(Debug, Clone, Copy)]
pub struct TestCaseEntry {
    pub name: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub run: fn(),
}

/// Lifecycle phase a helper is bound to. Setup/Teardown bracket the whole
/// test (outside the nesting-depth window); Start/Finish run inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperPhase {
    Setup,
    Teardown,
    Start,
    Finish,
}

/// A registered lifecycle helper.
#[derive(Debug, Clone, Copy)]
pub struct HelperEntry {
    pub phase: HelperPhase,
    pub run: fn(),
}

/// Identifies a live entry in an [`OrderedRegistry`]. Not `Copy`:
/// removal consumes the id, so a stale id cannot unlink a reused slot.
#[derive(Debug, PartialEq, Eq)]
pub struct EntryId(usize);

struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// An order-preserving collection with O(1) append and O(1) removal of
/// any live entry.
///
/// Entries live in an arena; removed slots are recycled. Traversal from
/// the head visits every live entry exactly once, in registration order,
/// regardless of interleaved removals.
pub struct OrderedRegistry<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> OrderedRegistry<T> {
    pub fn new() -> Self {
        OrderedRegistry {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an entry, making it the new tail.
    pub fn push(&mut self, value: T) -> EntryId {
        let node = Node {
            value,
            prev: self.tail,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                index
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        match self.tail {
            Some(tail) => {
                if let Some(tail_node) = self.nodes[tail].as_mut() {
                    tail_node.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        EntryId(index)
    }

    /// Unlinks a live entry. The patching is uniform for sole, head,
    /// tail, and interior entries: whichever slot pointed at the entry
    /// (a neighbour's link or the head) is redirected past it.
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        let node = self.nodes[id.0].take()?;
        match node.prev {
            Some(prev) => {
                if let Some(prev_node) = self.nodes[prev].as_mut() {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(next_node) = self.nodes[next].as_mut() {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Walks the live entries head to tail, in registration order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            registry: self,
            cursor: self.head,
        }
    }
}

impl<T> Default for OrderedRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    registry: &'a OrderedRegistry<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let index = self.cursor?;
        let node = self.registry.nodes[index].as_ref()?;
        self.cursor = node.next;
        Some(&node.value)
    }
}

static TESTS: Lazy<Mutex<OrderedRegistry<TestCaseEntry>>> = Lazy::new(|| {
    let mut registry = OrderedRegistry::new();
    for entry in TEST_CASES.iter() {
        registry.push(*entry);
    }
    log::debug!("seeded {} load-time test cases", registry.len());
    Mutex::new(registry)
});

static HELPERS: Lazy<Mutex<OrderedRegistry<HelperEntry>>> = Lazy::new(|| {
    let mut registry = OrderedRegistry::new();
    for entry in TEST_HELPERS.iter() {
        registry.push(*entry);
    }
    Mutex::new(registry)
});

// A poisoned lock only means some test panicked while another thread was
// touching the registry; the data itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registers a test case dynamically. Dropping the returned guard
/// unregisters it, mirroring the load-time entries' program lifetime.
pub fn register_test(entry: TestCaseEntry) -> TestRegistration {
    TestRegistration {
        id: Some(lock(&TESTS).push(entry)),
    }
}

/// Registers a lifecycle helper dynamically; unregistered on drop.
pub fn register_helper(entry: HelperEntry) -> HelperRegistration {
    HelperRegistration {
        id: Some(lock(&HELPERS).push(entry)),
    }
}

pub struct TestRegistration {
    id: Option<EntryId>,
}

impl Drop for TestRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            lock(&TESTS).remove(id);
        }
    }
}

pub struct HelperRegistration {
    id: Option<EntryId>,
}

impl Drop for HelperRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            lock(&HELPERS).remove(id);
        }
    }
}

/// All registered tests, in registration order, copied out so the runner
/// never holds the registry lock across a test body.
pub(crate) fn snapshot_tests() -> Vec<TestCaseEntry> {
    lock(&TESTS).iter().copied().collect()
}

/// Helpers for one phase, in registration order.
pub(crate) fn helpers_for(phase: HelperPhase) -> Vec<HelperEntry> {
    lock(&HELPERS)
        .iter()
        .filter(|helper| helper.phase == phase)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(registry: &OrderedRegistry<u32>) -> Vec<u32> {
        registry.iter().copied().collect()
    }

    #[test]
    fn traversal_is_empty_for_empty_registry() {
        let registry: OrderedRegistry<u32> = OrderedRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(collect(&registry), Vec::<u32>::new());
    }

    #[test]
    fn traversal_visits_entries_in_registration_order() {
        let mut registry = OrderedRegistry::new();
        for value in 0..5 {
            registry.push(value);
        }
        assert_eq!(registry.len(), 5);
        assert_eq!(collect(&registry), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn removing_sole_entry_leaves_empty_registry() {
        let mut registry = OrderedRegistry::new();
        let id = registry.push(7);
        assert_eq!(registry.remove(id), Some(7));
        assert!(registry.is_empty());
        assert_eq!(collect(&registry), Vec::<u32>::new());
    }

    #[test]
    fn removing_head_preserves_remaining_order() {
        let mut registry = OrderedRegistry::new();
        let head = registry.push(1);
        registry.push(2);
        registry.push(3);
        assert_eq!(registry.remove(head), Some(1));
        assert_eq!(collect(&registry), vec![2, 3]);
    }

    #[test]
    fn removing_tail_preserves_remaining_order() {
        let mut registry = OrderedRegistry::new();
        registry.push(1);
        registry.push(2);
        let tail = registry.push(3);
        assert_eq!(registry.remove(tail), Some(3));
        assert_eq!(collect(&registry), vec![1, 2]);
    }

    #[test]
    fn removing_middle_entry_relinks_neighbours() {
        let mut registry = OrderedRegistry::new();
        registry.push(1);
        let middle = registry.push(2);
        registry.push(3);
        assert_eq!(registry.remove(middle), Some(2));
        assert_eq!(collect(&registry), vec![1, 3]);
    }

    #[test]
    fn appending_after_removal_keeps_relative_order() {
        let mut registry = OrderedRegistry::new();
        registry.push(1);
        let middle = registry.push(2);
        let tail = registry.push(3);
        registry.remove(middle);
        registry.remove(tail);
        // Recycled slots must not disturb traversal order.
        registry.push(4);
        registry.push(5);
        assert_eq!(collect(&registry), vec![1, 4, 5]);
    }

    #[test]
    fn removing_tail_then_pushing_updates_links() {
        let mut registry = OrderedRegistry::new();
        registry.push(1);
        let tail = registry.push(2);
        registry.remove(tail);
        registry.push(3);
        let new_tail = registry.push(4);
        assert_eq!(collect(&registry), vec![1, 3, 4]);
        assert_eq!(registry.remove(new_tail), Some(4));
        assert_eq!(collect(&registry), vec![1, 3]);
    }

    #[test]
    fn dynamic_registration_unlinks_on_drop() {
        let _serial = crate::test_util::serial();
        fn noop() {}
        let before = snapshot_tests().len();
        let registration = register_test(TestCaseEntry {
            name: "ephemeral",
            file: file!(),
            line: line!(),
            run: noop,
        });
        assert_eq!(snapshot_tests().len(), before + 1);
        drop(registration);
        assert_eq!(snapshot_tests().len(), before);
    }

    #[test]
    fn helpers_are_filtered_by_phase_in_order() {
        let _serial = crate::test_util::serial();
        fn noop() {}
        let _setup = register_helper(HelperEntry {
            phase: HelperPhase::Setup,
            run: noop,
        });
        let _teardown = register_helper(HelperEntry {
            phase: HelperPhase::Teardown,
            run: noop,
        });
        let setup = helpers_for(HelperPhase::Setup);
        assert!(setup.iter().all(|h| h.phase == HelperPhase::Setup));
        assert!(!setup.is_empty());
    }
}
