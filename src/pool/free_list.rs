//! Lock-Free Free-List
//!
//! A Treiber stack holding idle pooled items. Pushing and popping are single
//! CAS operations on the head pointer; popped nodes are reclaimed through
//! `crossbeam-epoch`, so a thread that read a node just before it was popped
//! elsewhere never touches freed memory and the ABA problem cannot occur.

use crate::util::CachePadded;
use core::mem::ManuallyDrop;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};
use crossbeam_epoch::{self as epoch, Atomic, Owned};

struct Node<T> {
    // Moved out by `pop`; the node itself is freed later by the collector
    data: ManuallyDrop<T>,
    next: Atomic<Node<T>>,
}

/// An unordered, lock-free bag of items
///
/// Items come back out in LIFO order, which keeps recently used (and likely
/// cache-warm) items in circulation, but callers must not rely on it.
///
/// # Examples
///
/// ```rust
/// use syncgen::pool::FreeList;
///
/// let list = FreeList::new();
/// list.push(1);
/// list.push(2);
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.pop(), Some(2));
/// assert_eq!(list.pop(), Some(1));
/// assert_eq!(list.pop(), None);
/// ```
pub struct FreeList<T> {
    head: CachePadded<Atomic<Node<T>>>,
    len: CachePadded<AtomicUsize>,
}

// SAFETY: items are only ever moved into and out of the list, never shared by
// reference between threads, so `T: Send` is enough.
unsafe impl<T: Send> Send for FreeList<T> {}
unsafe impl<T: Send> Sync for FreeList<T> {}

/// Outcome of a push or pop attempt sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attempts {
    /// Number of failed CAS attempts before the operation completed
    pub retries: usize,
}

impl<T> FreeList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            head: CachePadded::new(Atomic::null()),
            len: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Push an item
    pub fn push(&self, value: T) {
        self.push_counted(value);
    }

    pub(crate) fn push_counted(&self, value: T) -> Attempts {
        let mut node = Owned::new(Node {
            data: ManuallyDrop::new(value),
            next: Atomic::null(),
        });
        let guard = epoch::pin();
        let mut retries = 0;

        // Count the node before it becomes visible. The release CAS below
        // orders this increment before any pop's decrement of the same node,
        // so `len` may briefly over-count but never wraps below zero.
        self.len.fetch_add(1, Ordering::Relaxed);

        loop {
            let head = self.head.load(Ordering::Relaxed, &guard);
            node.next.store(head, Ordering::Relaxed);

            match self
                .head
                .compare_exchange(head, node, Ordering::Release, Ordering::Relaxed, &guard)
            {
                Ok(_) => return Attempts { retries },
                Err(err) => {
                    node = err.new;
                    retries += 1;
                }
            }
        }
    }

    /// Pop an item, or `None` if the list is empty
    pub fn pop(&self) -> Option<T> {
        self.pop_counted().0
    }

    pub(crate) fn pop_counted(&self) -> (Option<T>, Attempts) {
        let guard = epoch::pin();
        let mut retries = 0;

        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            // SAFETY: `head` was loaded under `guard`, so the node cannot be
            // freed before the guard is dropped.
            let node = match unsafe { head.as_ref() } {
                Some(node) => node,
                None => return (None, Attempts { retries }),
            };
            let next = node.next.load(Ordering::Relaxed, &guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::Relaxed, Ordering::Relaxed, &guard)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);
                // SAFETY: the successful CAS unlinked `head`, so this thread is
                // the only one that will read `data` out of it. The node is
                // destroyed once no pinned thread can still observe it, and
                // `ManuallyDrop` keeps the destructor from dropping `data` again.
                unsafe {
                    let data = ManuallyDrop::into_inner(ptr::read(&node.data));
                    guard.defer_destroy(head);
                    return (Some(data), Attempts { retries });
                }
            }
            retries += 1;
        }
    }

    /// Approximate number of items
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the list looked empty at the time of the call
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire, &epoch::pin()).is_null()
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for FreeList<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` guarantees no other thread can reach the list.
        unsafe {
            let guard = epoch::unprotected();
            let mut current = self.head.load(Ordering::Relaxed, guard);
            while let Some(node) = current.as_ref() {
                let next = node.next.load(Ordering::Relaxed, guard);
                let mut owned = current.into_owned();
                ManuallyDrop::drop(&mut owned.data);
                current = next;
            }
        }
    }
}

impl<T> core::fmt::Debug for FreeList<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FreeList").field("len", &self.len()).finish()
    }
}
